use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced by the bridge endpoints.
///
/// The parameter variants are caller mistakes and map to 400. The upstream
/// variants carry whatever the scheduling backend answered; their body is
/// passed through untouched so the add-in sees the backend's own failure
/// text, under a 502.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{operation} query failed: {message}")]
    UpstreamQuery {
        operation: &'static str,
        status: Option<StatusCode>,
        message: String,
    },

    #[error("reservation submission failed: {message}")]
    UpstreamWrite {
        status: Option<StatusCode>,
        message: String,
    },
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// A query request that never produced an HTTP response.
    pub fn query_transport(operation: &'static str, err: reqwest::Error) -> Self {
        BridgeError::UpstreamQuery {
            operation,
            status: None,
            message: err.to_string(),
        }
    }

    /// A query answered with a non-success status; `body` is echoed as-is.
    pub fn query_status(operation: &'static str, status: StatusCode, body: String) -> Self {
        BridgeError::UpstreamQuery {
            operation,
            status: Some(status),
            message: body,
        }
    }

    /// A query that succeeded but returned no usable row for a required value.
    pub fn query_empty(operation: &'static str) -> Self {
        BridgeError::UpstreamQuery {
            operation,
            status: None,
            message: format!("{} lookup returned no matching row", operation),
        }
    }

    pub fn write_transport(err: reqwest::Error) -> Self {
        BridgeError::UpstreamWrite {
            status: None,
            message: err.to_string(),
        }
    }

    pub fn write_status(status: StatusCode, body: String) -> Self {
        BridgeError::UpstreamWrite {
            status: Some(status),
            message: body,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        match self {
            BridgeError::MissingParameter(_) | BridgeError::InvalidParameter { .. } => {
                warn!("rejecting request: {}", self);
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            BridgeError::UpstreamQuery {
                operation,
                status,
                message,
            } => {
                error!(
                    "{} query failed ({}): {}",
                    operation,
                    describe_status(status),
                    message
                );
                (StatusCode::BAD_GATEWAY, message).into_response()
            }
            BridgeError::UpstreamWrite { status, message } => {
                error!(
                    "reservation submission failed ({}): {}",
                    describe_status(status),
                    message
                );
                (StatusCode::BAD_GATEWAY, message).into_response()
            }
        }
    }
}

fn describe_status(status: Option<StatusCode>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "no response".to_string(),
    }
}
