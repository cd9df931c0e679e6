pub mod gui;
pub mod logging;
pub mod overlay;
pub mod service;
pub mod settings;
pub mod text;
pub mod tutor;
