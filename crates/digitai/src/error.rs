//! Error type shared by the Gemini client, the relay client and the
//! session controller.

use thiserror::Error;

/// Errors produced by `digitai`.
#[derive(Error, Debug)]
pub enum Error {
    /// `start_chat` was called before the required profile fields were filled in.
    #[error("business profile is incomplete: missing {}", .missing.join(", "))]
    IncompleteProfile { missing: Vec<&'static str> },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Network-level failure (connect, timeout, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The remote answered 2xx but the body did not have the expected shape.
    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An asset template could not be rasterised.
    #[error("failed to render image: {0}")]
    Render(String),

    /// A push application-server key is not valid url-safe base64.
    #[error("invalid VAPID key: {0}")]
    Vapid(#[from] base64::DecodeError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_profile_lists_missing_fields() {
        let err = Error::IncompleteProfile {
            missing: vec!["name", "services"],
        };
        assert_eq!(
            err.to_string(),
            "business profile is incomplete: missing name, services"
        );
    }

    #[test]
    fn status_error_carries_code_and_body() {
        let err = Error::Status {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "HTTP 503: overloaded");
    }
}
