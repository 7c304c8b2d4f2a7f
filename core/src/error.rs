//! Error types for web-client calls.
//!
//! # Design
//! The response pipeline has exactly three outcomes besides success, and
//! they never overlap:
//! - `ParseFailure`: the raw text is not JSON at all.
//! - `CallFailure`: the service decoded fine but reported `success: false`.
//! - `ValidationFailure`: the service accepted the call but the response no
//!   longer matches the descriptor's contract.
//!
//! `CallError` is their closed union. `ApiError` wraps it together with the
//! concerns the client adds around the pipeline (status codes, transport,
//! body encoding).

use thiserror::Error;

/// Explanation attached to every `CallFailure` raised by the success check.
pub const SERVER_REPORTED_FAILURE: &str = "the server reported failure. This is usually \
     caused by bad arguments, but can also happen if requests are made too quickly \
     (eg creating a playlist then modifying it before the server has created it)";

/// The raw response text could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse response: {reason}")]
pub struct ParseFailure {
    pub reason: String,
}

/// The service explicitly rejected the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{call_name}: {message}")]
pub struct CallFailure {
    pub call_name: String,
    pub message: String,
}

impl CallFailure {
    pub fn server_reported(call_name: &str) -> Self {
        Self {
            call_name: call_name.to_string(),
            message: SERVER_REPORTED_FAILURE.to_string(),
        }
    }
}

/// The response does not match the declared shape.
///
/// `path` locates the first mismatch (`$` is the response root); literal
/// mismatches always report `$`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct ValidationFailure {
    pub path: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Terminal failure of the response pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error(transparent)]
    Parse(#[from] ParseFailure),

    #[error(transparent)]
    Call(#[from] CallFailure),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

/// Errors returned by `WebClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a status other than 200.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The transport could not complete the round-trip.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The request could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response was received but rejected by the pipeline.
    #[error(transparent)]
    Call(#[from] CallError),
}

impl ApiError {
    /// The pipeline failure behind this error, if any.
    pub fn call_error(&self) -> Option<&CallError> {
        match self {
            ApiError::Call(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_failure_display_names_the_call() {
        let err = CallFailure::server_reported("AddPlaylist");
        let text = err.to_string();
        assert!(text.starts_with("AddPlaylist: the server reported failure."));
        assert!(text.contains("bad arguments"));
    }

    #[test]
    fn call_error_is_transparent() {
        let err: CallError = ValidationFailure::new("$.id", "expected string, found integer").into();
        assert_eq!(err.to_string(), "$.id: expected string, found integer");
    }

    #[test]
    fn api_error_exposes_call_error() {
        let err: ApiError = CallError::from(ParseFailure {
            reason: "eof".to_string(),
        })
        .into();
        assert!(matches!(err.call_error(), Some(CallError::Parse(_))));
        assert!(ApiError::Transport("refused".into()).call_error().is_none());
    }
}
