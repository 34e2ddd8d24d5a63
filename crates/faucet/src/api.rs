//! HTTP API for the faucet service

use crate::config::NATIVE_TOKEN;
use crate::error::FaucetError;
use crate::service::Faucet;
use axum::{extract::State, response::IntoResponse, Json};
use obx_common::types::Address;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Funding request
#[derive(Debug, Deserialize)]
pub struct FundRequest {
    pub address: String,
    #[serde(default = "native_token")]
    pub token: String,
}

fn native_token() -> String {
    NATIVE_TOKEN.to_string()
}

/// Success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub data: T,
    pub timestamp: String,
}

/// Funding result returned to the caller
#[derive(Debug, Serialize)]
pub struct FundResponse {
    pub address: String,
    pub tx_hash: String,
    pub block_number: String,
}

/// Fund handler
pub async fn fund_handler(
    State(faucet): State<Arc<Faucet>>,
    Json(request): Json<FundRequest>,
) -> impl IntoResponse {
    info!(address = %request.address, token = %request.token, "funding request");

    let address = match Address::from_hex(&request.address) {
        Ok(address) => address,
        Err(e) => return FaucetError::InvalidAddress(e.to_string()).into_response(),
    };

    match faucet.fund(&address, &request.token).await {
        Ok(receipt) => Json(SuccessResponse {
            data: FundResponse {
                address: address.to_string(),
                tx_hash: receipt.transaction_hash.to_string(),
                block_number: receipt.block_number,
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
        .into_response(),
        Err(e) => {
            error!(address = %address, error = %e, "funding failed");
            e.into_response()
        }
    }
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Root handler with service info
pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "OBX Faucet",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /fund": "Request native-token funding",
            "GET /health": "Health check"
        }
    }))
}
