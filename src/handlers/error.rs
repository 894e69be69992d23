// src/handlers/error.rs
use std::fmt;
use warp::reject::Reject;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiErrorKind {
    /// The request itself is malformed (unknown method, negative amount).
    BadRequest,
    /// The data store fetch or decode failed.
    Upstream,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            kind: ApiErrorKind::BadRequest,
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        ApiError {
            kind: ApiErrorKind::Upstream,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
impl Reject for ApiError {}
