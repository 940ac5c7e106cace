//! Error types for render generation and material persistence.

use std::time::Duration;

/// Maximum length of a provider error message kept in an error.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while composing, submitting, or persisting renders.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No usable API token was available.
    #[error("Missing API Key. {0}")]
    MissingCredential(String),

    /// Provider returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status returned by the provider.
        status: u16,
        /// Sanitized error body.
        message: String,
    },

    /// Provider answered with a shape we could not use.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Generation did not finish in time.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode image data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g. reading an image or writing the store).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    /// Returns true if the caller should prompt for a (new) API key.
    pub fn is_credential_error(&self) -> bool {
        match self {
            Self::MissingCredential(_) => true,
            Self::Api { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// Returns true if the failure came from talking to the remote provider.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::Api { .. }
                | Self::UnexpectedResponse(_)
                | Self::Timeout(_)
                | Self::Network(_)
                | Self::Json(_)
        )
    }

    /// HTTP status used when this error is reported to a client.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingCredential(_) => 401,
            Self::InvalidRequest(_) | Self::Decode(_) => 400,
            _ => 500,
        }
    }
}

/// Redacts bearer tokens and truncates provider error bodies.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(MAX_ERROR_MESSAGE_LEN));
    let mut redact_next = false;

    for (i, word) in text.split(' ').enumerate() {
        if i > 0 {
            out.push(' ');
        }
        if redact_next || word.starts_with("r8_") {
            out.push_str("[REDACTED]");
        } else {
            out.push_str(word);
        }
        redact_next = word.eq_ignore_ascii_case("bearer") || word.eq_ignore_ascii_case("token");
    }

    if out.chars().count() > MAX_ERROR_MESSAGE_LEN {
        out = out.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        out.push_str("...");
    }
    out
}

/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_credential_error() {
        assert!(RenderError::MissingCredential("set one".into()).is_credential_error());
        assert!(RenderError::Api {
            status: 401,
            message: "Unauthenticated".into()
        }
        .is_credential_error());

        assert!(!RenderError::Api {
            status: 500,
            message: "boom".into()
        }
        .is_credential_error());
        assert!(!RenderError::Timeout(Duration::from_secs(5)).is_credential_error());
    }

    #[test]
    fn test_is_provider_error() {
        assert!(RenderError::UnexpectedResponse("no output".into()).is_provider_error());
        assert!(RenderError::Timeout(Duration::from_secs(5)).is_provider_error());
        assert!(!RenderError::MissingCredential("x".into()).is_provider_error());
        assert!(!RenderError::Decode("bad".into()).is_provider_error());
    }

    #[test]
    fn test_status_code() {
        assert_eq!(RenderError::MissingCredential("x".into()).status_code(), 401);
        assert_eq!(RenderError::Decode("x".into()).status_code(), 400);
        assert_eq!(
            RenderError::Api {
                status: 422,
                message: "bad input".into()
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn test_error_display() {
        let err = RenderError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = RenderError::MissingCredential("Provide one in the settings.".into());
        assert!(err.to_string().contains("API Key"));
    }

    #[test]
    fn test_sanitize_redacts_tokens() {
        let msg = sanitize_error_message("invalid Bearer r8_secret for token abc123 here");
        assert!(!msg.contains("r8_secret"));
        assert!(!msg.contains("abc123"));
        assert!(msg.contains("invalid"));
        assert!(msg.contains("here"));
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(2000);
        let msg = sanitize_error_message(&long);
        assert_eq!(msg.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(msg.ends_with("..."));
    }
}
