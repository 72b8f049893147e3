use serde::Deserialize;
use thiserror::Error;

/// Shown when a failed response carries no usable `message`.
pub const FALLBACK_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// No response could be obtained from the server.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request could not be built (e.g. a token with control characters).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    /// Build a `Status` error, taking the message from a `{"message": ...}`
    /// body when there is one.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());

        ApiError::Status {
            status: status.as_u16(),
            message,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
