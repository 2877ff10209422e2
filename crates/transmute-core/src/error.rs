//! Error types module
//!
//! Every failure a Transmute client can observe is expressed as a `ClientError`.
//! Transport problems and non-success responses are the two failures that reach
//! the presentation layer; `EmptyInput` is produced client-side and is swallowed
//! by the tracker rather than surfaced.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected conditions like empty input
    Debug,
    /// Warning level - for rejections the server reported
    Warn,
    /// Error level - for transport failures and malformed responses
    Error,
}

/// Metadata describing how an error should be presented to a user
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSPORT_FAILURE")
    fn error_code(&self) -> &'static str;

    /// Whether repeating the same request could succeed
    fn is_recoverable(&self) -> bool;

    /// Human-readable message suitable for display
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("API request failed with status {status}: {body}")]
    RequestRejected { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("No file provided")]
    EmptyInput,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// Build a rejection from a status code and a (possibly empty) response body.
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        ClientError::RequestRejected {
            status,
            body: body.into(),
        }
    }

    /// HTTP status of a rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::RequestRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::MalformedResponse(format!("JSON parsing error: {}", err))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::InvalidInput(format!("IO error: {}", err))
    }
}

impl ErrorMetadata for ClientError {
    fn error_code(&self) -> &'static str {
        match self {
            ClientError::TransportFailure(_) => "TRANSPORT_FAILURE",
            ClientError::RequestRejected { .. } => "REQUEST_REJECTED",
            ClientError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            ClientError::EmptyInput => "EMPTY_INPUT",
            ClientError::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            ClientError::TransportFailure(_) => true,
            ClientError::RequestRejected { status, .. } => *status >= 500 || *status == 429,
            ClientError::MalformedResponse(_)
            | ClientError::EmptyInput
            | ClientError::InvalidInput(_) => false,
        }
    }

    fn client_message(&self) -> String {
        match self {
            ClientError::TransportFailure(_) => {
                "Could not reach the conversion service".to_string()
            }
            ClientError::RequestRejected { status, body } => match rejection_summary(body) {
                Some(summary) => format!("Request failed ({}): {}", status, summary),
                None => format!("Request failed ({})", status),
            },
            ClientError::MalformedResponse(_) => {
                "The conversion service returned an unexpected response".to_string()
            }
            ClientError::EmptyInput => "No file selected".to_string(),
            ClientError::InvalidInput(ref msg) => msg.clone(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ClientError::EmptyInput | ClientError::InvalidInput(_) => LogLevel::Debug,
            ClientError::RequestRejected { status, .. } if *status < 500 => LogLevel::Warn,
            ClientError::RequestRejected { .. }
            | ClientError::TransportFailure(_)
            | ClientError::MalformedResponse(_) => LogLevel::Error,
        }
    }
}

/// Longest rejection text surfaced to a user, in characters.
const MAX_SURFACED_BODY: usize = 200;

/// Human-readable part of a rejection body.
///
/// A JSON body carrying a string `detail` (or `error`) field yields that
/// field; anything else is used as is. The result is capped at
/// [`MAX_SURFACED_BODY`] characters.
fn rejection_summary(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let text = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["detail", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string());
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.chars().count() <= MAX_SURFACED_BODY {
        Some(text.to_string())
    } else {
        let kept: String = text.chars().take(MAX_SURFACED_BODY).collect();
        Some(format!("{}...", kept))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_transport_failure() {
        let err = ClientError::TransportFailure("connection refused".to_string());
        assert_eq!(err.error_code(), "TRANSPORT_FAILURE");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Could not reach the conversion service");
        assert_eq!(err.log_level(), LogLevel::Error);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_error_metadata_rejected_client_error() {
        let err = ClientError::rejected(404, "File not found");
        assert_eq!(err.error_code(), "REQUEST_REJECTED");
        assert!(!err.is_recoverable());
        assert!(err.is_not_found());
        assert_eq!(err.client_message(), "Request failed (404): File not found");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_rejected_server_error() {
        let err = ClientError::rejected(503, "  ");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Request failed (503)");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_display_includes_status() {
        let err = ClientError::rejected(500, "Upload failed: disk full");
        assert_eq!(
            err.to_string(),
            "API request failed with status 500: Upload failed: disk full"
        );
    }

    #[test]
    fn test_json_error_is_malformed_response() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = ClientError::from(json_err);
        assert_eq!(err.error_code(), "MALFORMED_RESPONSE");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_empty_input_is_debug_level() {
        assert_eq!(ClientError::EmptyInput.log_level(), LogLevel::Debug);
        assert_eq!(ClientError::EmptyInput.client_message(), "No file selected");
    }

    #[test]
    fn test_client_message_extracts_json_detail() {
        let err = ClientError::rejected(404, r#"{"detail":"File not found"}"#);
        assert_eq!(err.client_message(), "Request failed (404): File not found");

        let err = ClientError::rejected(422, r#"{"error":"No converter for .xyz"}"#);
        assert_eq!(err.client_message(), "Request failed (422): No converter for .xyz");
    }

    #[test]
    fn test_client_message_keeps_structured_detail_body() {
        let body = r#"{"detail":[{"loc":["body","file"],"msg":"field required"}]}"#;
        let err = ClientError::rejected(422, body);
        assert_eq!(err.client_message(), format!("Request failed (422): {}", body));
    }

    #[test]
    fn test_client_message_caps_long_bodies() {
        let page = format!("<html><body>{}</body></html>", "x".repeat(500));
        let message = ClientError::rejected(502, page).client_message();

        assert!(message.starts_with("Request failed (502): <html><body>xxx"));
        assert!(message.ends_with("..."));
        assert_eq!(
            message.chars().count(),
            "Request failed (502): ".len() + MAX_SURFACED_BODY + 3
        );
    }
}
