//! Relay failures and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use digitai::relay::RelayErrorBody;
use thiserror::Error;

/// Why `POST /api/chat` could not produce a reply.
///
/// The `Display` text of each variant is exactly the `error` string sent to
/// the browser; details stay in the server log.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Body missing, not JSON, or lacking `messages` / `systemPrompt`.
    #[error("Messages and systemPrompt are required")]
    BadRequest,

    /// The server was started without an upstream API key.
    #[error("API key not configured")]
    MissingApiKey,

    /// The upstream answered with a non-success status.
    #[error("Failed to generate response")]
    Upstream { status: u16, body: String },

    /// Transport or decode failure talking to the upstream.
    #[error("Internal server error")]
    Internal(#[source] digitai::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::MissingApiKey | Self::Upstream { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<digitai::Error> for RelayError {
    fn from(err: digitai::Error) -> Self {
        match err {
            digitai::Error::Status { status, body } => Self::Upstream { status, body },
            other => Self::Internal(other),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = RelayErrorBody {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_is_separated_from_other_failures() {
        let err = RelayError::from(digitai::Error::Status {
            status: 429,
            body: "quota".into(),
        });
        assert!(matches!(err, RelayError::Upstream { status: 429, .. }));
        assert_eq!(err.to_string(), "Failed to generate response");

        let err = RelayError::from(digitai::Error::Client("boom".into()));
        assert!(matches!(err, RelayError::Internal(_)));
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn status_codes() {
        assert_eq!(RelayError::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::MissingApiKey.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
