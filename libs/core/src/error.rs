use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of a Telnyx `{"errors": [...]}` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ApiErrors {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

impl ApiErrors {
    /// Parses a provider error body; bodies that are not the documented shape
    /// are kept as a single entry carrying the raw text.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<ApiErrors>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => parsed,
            _ => ApiErrors {
                errors: vec![ApiError {
                    code: "unknown".into(),
                    title: String::new(),
                    detail: truncate_body(body),
                }],
            },
        }
    }

    pub fn codes(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.code.as_str()).collect()
    }
}

impl fmt::Display for ApiErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|err| {
                let text = if err.detail.is_empty() {
                    &err.title
                } else {
                    &err.detail
                };
                format!("{}: {}", err.code, text)
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "telnyx: {joined}")
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > 512 {
        body.chars().take(512).collect()
    } else {
        body.to_string()
    }
}

/// Failures of an outbound send. Retry policy is the caller's; see
/// [`DispatchError::is_retryable`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("telnyx transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("{errors} (status {status})")]
    Provider { status: StatusCode, errors: ApiErrors },
    #[error("telnyx response could not be decoded: {0}")]
    Decode(String),
    #[error("telnyx configuration error: {0}")]
    Config(String),
}

impl DispatchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            DispatchError::Transport(_) => true,
            DispatchError::Provider { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            DispatchError::Decode(_) | DispatchError::Config(_) => false,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Transport(_) => "transport",
            DispatchError::Provider { .. } => "provider",
            DispatchError::Decode(_) => "decode",
            DispatchError::Config(_) => "config",
        }
    }
}

/// Rejection reasons for an inbound webhook.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing signature or timestamp header")]
    MissingHeaders,
    #[error("public key or signature is not valid base64 ed25519 material")]
    BadEncoding,
    #[error("signature does not match payload")]
    Invalid,
    #[error("timestamp outside the accepted window")]
    Stale,
}

impl AuthError {
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingHeaders => "missing_headers",
            AuthError::BadEncoding => "bad_encoding",
            AuthError::Invalid => "invalid",
            AuthError::Stale => "stale",
        }
    }
}

/// Upstream alert/verification data could not be produced.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("alert {0} not found")]
    NotFound(i64),
    #[error("lookup timed out")]
    Timeout,
    #[error("lookup backend error: {0}")]
    Backend(String),
}

/// The host rejected or could not receive an action/status signal.
#[derive(Debug, Error)]
#[error("action sink error: {0}")]
pub struct SinkError(pub String);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },
}
