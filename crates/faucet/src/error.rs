//! Error types for the faucet service

use crate::encoding::AddressError;
use crate::graylist::format_remaining;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// `425 Too Early`, used for graylisted addresses.
pub const TOO_EARLY: u16 = 425;

/// Errors raised by the node client
#[derive(Error, Debug)]
pub enum NodeError {
    /// The node could not be reached or did not answer in time
    #[error("node unavailable: {0}")]
    Unavailable(String),

    /// The node answered with an error status
    #[error("node rejected request ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// The node answered with something we could not read
    #[error("unexpected node response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for NodeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            NodeError::Unavailable(err.to_string())
        } else if err.is_decode() {
            NodeError::Decode(err.to_string())
        } else {
            NodeError::Rejected {
                status: err.status().map(|s| s.as_u16()).unwrap_or(0),
                reason: err.to_string(),
            }
        }
    }
}

/// Faucet service errors
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("The provided address is not valid: {address}")]
    InvalidAddress {
        address: String,
        #[source]
        reason: AddressError,
    },

    #[error("The address {address} is graylisted for another {}", format_remaining(.remaining))]
    Graylisted { address: String, remaining: Duration },

    #[error("transfer failed: {0}")]
    TransferFailed(#[source] NodeError),

    #[error("node unavailable: {0}")]
    NodeUnavailable(#[source] NodeError),
}

impl From<NodeError> for FaucetError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::Unavailable(_) => FaucetError::NodeUnavailable(err),
            other => FaucetError::TransferFailed(other),
        }
    }
}

impl FaucetError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FaucetError::InvalidAddress { .. } => StatusCode::BAD_REQUEST,
            FaucetError::Graylisted { .. } => {
                StatusCode::from_u16(TOO_EARLY).unwrap_or(StatusCode::TOO_MANY_REQUESTS)
            }
            FaucetError::TransferFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FaucetError::NodeUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to show to the requester. Node failures never leak their details.
    pub fn public_message(&self, support_email: &str) -> String {
        match self {
            FaucetError::InvalidAddress { .. } | FaucetError::Graylisted { .. } => self.to_string(),
            FaucetError::NodeUnavailable(_) => {
                "The node is temporarily unavailable, please try again later".to_string()
            }
            FaucetError::TransferFailed(_) => format!(
                r#"Unknown error, please contact <a href="mailto:{0}" class="hover:text-pink-lighter">{0}</a>"#,
                support_email
            ),
        }
    }

    /// Response with `{"message": ...}` body
    pub fn into_reply(self, support_email: &str) -> Response {
        let body = Json(json!({ "message": self.public_message(support_email) }));
        (self.status_code(), body).into_response()
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;
