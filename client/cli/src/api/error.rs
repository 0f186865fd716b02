use std::path::PathBuf;
use thiserror::Error;

use crate::upload::ALLOWED_EXTENSIONS;

#[derive(Debug, Error)]
pub enum TransferError {
    /// Rejected on the client before any request was made.
    #[error("File type not supported. Allowed types: {}", ALLOWED_EXTENSIONS.join(", "))]
    Validation { extension: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("not found: {}", .message.as_deref().unwrap_or("no details"))]
    NotFound { message: Option<String> },

    #[error("server error ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Server { status: u16, message: Option<String> },

    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl TransferError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| TransferError::Io { path, source }
    }

    /// Text shown inline to the user. Server-provided messages pass through
    /// unchanged; failures without one fall back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            TransferError::NotFound { message: Some(message) }
            | TransferError::Server {
                message: Some(message),
                ..
            } => message.clone(),
            TransferError::Validation { .. } | TransferError::Io { .. } => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// Pull a user-facing message out of an error body.
///
/// JSON objects contribute their `error` or `message` string, JSON strings
/// their value; anything else is used as-is.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => {
            let field = map
                .get("error")
                .or_else(|| map.get("message"))
                .and_then(|v| v.as_str());
            Some(field.unwrap_or(body).to_string())
        }
        Ok(serde_json::Value::String(message)) => Some(message),
        _ => Some(body.to_string()),
    }
}
