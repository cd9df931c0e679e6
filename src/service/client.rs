use crate::service::types::{Analysis, ChatReply, ChatRequest, Health, HintQuery, HintReply};
use reqwest::blocking::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000";
pub const UPLOAD_FILE_NAME: &str = "homework.jpg";

/// Failures talking to the tutoring backend. The variants separate "could
/// not reach the service" from "the service answered with an error".
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The configured base URL is not a valid http(s) URL
    #[error("invalid service URL '{0}'")]
    InvalidUrl(String),

    /// Connection refused, DNS failure, timeout
    #[error("Cannot connect to backend. Make sure the server is running on {url}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("{detail}")]
    Status { status: u16, detail: String },

    /// The body did not match the expected shape
    #[error("unexpected response from backend: {0}")]
    Malformed(String),

    /// The HTTP client could not be set up or the request could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl ServiceError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ServiceError::Unreachable { .. })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Blocking client for the analysis/chat service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    base: Url,
    http: Client,
}

impl ServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let base = Url::parse(base_url.trim())
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| ServiceError::InvalidUrl(base_url.to_string()))?;
        let http = Client::builder()
            .user_agent(concat!("socratic-lens/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { base, http })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// `true` only when the service answers and reports itself online.
    pub fn health(&self) -> bool {
        match self.get_health() {
            Ok(health) => health.is_online(),
            Err(err) => {
                tracing::debug!(error = %err, "health check failed");
                false
            }
        }
    }

    pub fn get_health(&self) -> Result<Health, ServiceError> {
        let url = self.endpoint("")?;
        let response = self.send(self.http.get(url))?;
        decode(response)
    }

    /// Uploads an encoded image for problem extraction.
    pub fn analyze(&self, jpeg: Vec<u8>) -> Result<Analysis, ServiceError> {
        let part = multipart::Part::bytes(jpeg)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new().part("file", part);
        let url = self.endpoint("analyze")?;
        tracing::info!(%url, "uploading image for analysis");
        let response = self.send(self.http.post(url).multipart(form))?;
        decode(response)
    }

    pub fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ServiceError> {
        let url = self.endpoint("chat")?;
        tracing::debug!(history = request.messages.len(), "sending chat turn");
        let response = self.send(self.http.post(url).json(request))?;
        decode(response)
    }

    /// Older single-shot endpoint taking everything as query parameters.
    pub fn hint(&self, query: &HintQuery) -> Result<HintReply, ServiceError> {
        let mut url = self.endpoint("hint")?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.query_pairs() {
                pairs.append_pair(key, value);
            }
        }
        let response = self.send(self.http.post(url))?;
        decode(response)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        let joined = format!("{}/{}", self.base_url(), path);
        Url::parse(&joined).map_err(|_| ServiceError::InvalidUrl(joined))
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Response, ServiceError> {
        request.send().map_err(|source| {
            tracing::warn!(error = %source, "backend request failed");
            ServiceError::Unreachable {
                url: self.base_url().to_string(),
                source,
            }
        })
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|err| ServiceError::Malformed(err.to_string()))?;

    if !status.is_success() {
        let detail = error_detail(&body).unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
        tracing::warn!(status = status.as_u16(), %detail, "backend returned an error");
        return Err(ServiceError::Status {
            status: status.as_u16(),
            detail,
        });
    }

    serde_json::from_str(&body).map_err(|err| ServiceError::Malformed(err.to_string()))
}

/// FastAPI-style `detail`, which is either a message or a list of
/// validation errors.
fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(message) if !message.is_empty() => Some(message),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
