//! Boundary to the remote analysis/chat service.

pub mod client;
pub mod types;

pub use client::{ServiceClient, ServiceError, DEFAULT_SERVICE_URL};
pub use types::{
    Analysis, ChatMessage, ChatReply, ChatRequest, Health, HintQuery, HintReply, ProblemContext,
    Role,
};
