// # Remote call conventions
//
// Every client operation returns the decoded entity together with the
// transport metadata of the response, or an `ApiError` that carries the
// same metadata when the server answered at all.
//
// Controllers only ever look at the status code, to recognise "not found".

use std::fmt;

/// HTTP "Not Found"
pub const STATUS_NOT_FOUND: u16 = 404;

/// Result of a remote call: entity plus response metadata
pub type ApiResult<T> = std::result::Result<(T, Response), ApiError>;

/// Transport metadata of a remote response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
}

impl Response {
    /// Create response metadata with the given status code
    pub fn new(status: u16) -> Self {
        Self { status }
    }

    /// Whether the remote reported "not found"
    pub fn is_not_found(&self) -> bool {
        self.status == STATUS_NOT_FOUND
    }
}

/// Failure returned by a remote client
///
/// `response` is `None` when no response was received (connection refused,
/// timeout, malformed body before status was known).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Response metadata, if the server answered
    pub response: Option<Response>,
    /// Error description
    pub message: String,
}

impl ApiError {
    /// Create an error for a response with the given status code
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            response: Some(Response::new(status)),
            message: message.into(),
        }
    }

    /// Create an error for a call that never received a response
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            response: None,
            message: message.into(),
        }
    }

    /// HTTP status code, if any
    pub fn status(&self) -> Option<u16> {
        self.response.map(|r| r.status)
    }

    /// Whether the remote reported "not found"
    pub fn is_not_found(&self) -> bool {
        self.response.is_some_and(|r| r.is_not_found())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.response {
            Some(response) => write!(
                f,
                "remote API error (status {}): {}",
                response.status, self.message
            ),
            None => write!(f, "remote API error: {}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}
