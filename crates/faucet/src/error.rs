//! Error types for the faucet service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use obx_common::types::Hash;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Faucet service errors
///
/// Every per-call failure is surfaced to the caller; the only fatal condition
/// is `Initialization`, and only the binary turns that into a process exit.
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("unable to connect with the node: {0}")]
    Initialization(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("token {0:?} is not fundable")]
    UnsupportedToken(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unable to fetch account nonce: {0}")]
    NonceFetch(String),

    #[error("unable to sign transaction: {0}")]
    Signing(String),

    #[error("node did not accept transaction: {0}")]
    Submission(String),

    #[error("could not retrieve transaction receipt: {0}")]
    ReceiptQuery(String),

    #[error("transaction {hash} reverted with status {status}")]
    TransactionReverted { hash: Hash, status: String },

    #[error("no receipt for transaction {hash} after {waited:?}")]
    ConfirmationTimeout { hash: Hash, waited: Duration },
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> Response {
        let (status, error_code) = match self {
            FaucetError::Initialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INITIALIZATION")
            }
            FaucetError::InvalidConfig(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_CONFIG")
            }
            FaucetError::UnsupportedToken(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_TOKEN"),
            FaucetError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "INVALID_ADDRESS"),
            FaucetError::NonceFetch(_) => (StatusCode::BAD_GATEWAY, "NONCE_FETCH"),
            FaucetError::Signing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SIGNING"),
            FaucetError::Submission(_) => (StatusCode::BAD_GATEWAY, "SUBMISSION"),
            FaucetError::ReceiptQuery(_) => (StatusCode::BAD_GATEWAY, "RECEIPT_QUERY"),
            FaucetError::TransactionReverted { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "TRANSACTION_REVERTED")
            }
            FaucetError::ConfirmationTimeout { .. } => {
                (StatusCode::GATEWAY_TIMEOUT, "CONFIRMATION_TIMEOUT")
            }
        };

        let body = Json(json!({
            "error": error_code,
            "message": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));

        (status, body).into_response()
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;
