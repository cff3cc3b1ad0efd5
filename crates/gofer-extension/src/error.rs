//! Error types at the harness boundary.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gofer_core::Error;
use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::{error, warn};

/// Body returned for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub request_id: String,
}

/// An error returned to the host.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub request_id: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            request_id: String::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            Error::InvalidSignature | Error::Unsupported(_) => StatusCode::BAD_REQUEST,
            Error::SubscriptionExists(_) => StatusCode::CONFLICT,
            Error::SubscriptionNotFound(_) => StatusCode::NOT_FOUND,
            Error::Transport(_) | Error::Http { .. } | Error::Decode(_) => StatusCode::BAD_GATEWAY,
            Error::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), request_id = %self.request_id, message = %self.message, "Request failed");
        } else {
            warn!(status = self.status.as_u16(), request_id = %self.request_id, message = %self.message, "Request rejected");
        }

        let body = ErrorBody {
            message: self.message,
            request_id: self.request_id,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Fatal harness failures. Any of these ends the process.
#[derive(Debug, ThisError)]
pub enum HarnessError {
    #[error("Could not bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TLS material: {0}")]
    Tls(String),

    #[error("Subscription restore failed: {0}")]
    Restore(#[source] Error),

    #[error("Event source failed: {0}")]
    Source(#[source] Error),

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}
