//! Faucet configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifier of the chain's native token. The faucet funds nothing else.
pub const NATIVE_TOKEN: &str = "obx";

/// Faucet service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetConfig {
    /// Address the HTTP endpoint binds to
    pub server_addr: String,

    /// RPC endpoint of the chain node
    pub node_url: String,

    /// Chain identifier used for transaction signing (EIP-155)
    pub chain_id: u64,

    /// Prefunded account private key. Required, the service refuses to start
    /// without it.
    pub private_key: String,

    /// Amount transferred per funding request (in wei)
    pub fund_amount_wei: String,

    /// Gas price for funding transactions (in wei)
    pub gas_price: u64,

    /// Gas limit for funding transactions
    pub gas_limit: u64,

    /// How long to wait for a transaction receipt (seconds)
    pub confirmation_timeout_secs: u64,

    /// Interval between receipt queries (milliseconds)
    pub poll_interval_millis: u64,

    /// Enable CORS on the HTTP endpoint
    pub cors_enabled: bool,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:80".to_string(),
            node_url: "http://testnet.obscu.ro:13000".to_string(),
            chain_id: 777,
            private_key: String::new(),
            fund_amount_wei: "100000000000000000000000".to_string(), // 100,000 OBX
            gas_price: 225,
            gas_limit: 21000,
            confirmation_timeout_secs: 30,
            poll_interval_millis: 1000,
            cors_enabled: true,
        }
    }
}

impl FaucetConfig {
    /// Load from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("FAUCET_SERVER_ADDR") {
            config.server_addr = addr;
        }

        if let Ok(node_url) = std::env::var("FAUCET_NODE_URL") {
            config.node_url = node_url;
        }

        if let Ok(chain_id) = std::env::var("FAUCET_CHAIN_ID") {
            config.chain_id = chain_id.parse().unwrap_or(config.chain_id);
        }

        if let Ok(key) = std::env::var("FAUCET_PRIVATE_KEY") {
            config.private_key = key;
        }

        if let Ok(amount) = std::env::var("FAUCET_FUND_AMOUNT_WEI") {
            config.fund_amount_wei = amount;
        }

        if let Ok(gas_price) = std::env::var("FAUCET_GAS_PRICE") {
            config.gas_price = gas_price.parse().unwrap_or(config.gas_price);
        }

        if let Ok(gas_limit) = std::env::var("FAUCET_GAS_LIMIT") {
            config.gas_limit = gas_limit.parse().unwrap_or(config.gas_limit);
        }

        if let Ok(timeout) = std::env::var("FAUCET_CONFIRMATION_TIMEOUT") {
            config.confirmation_timeout_secs =
                timeout.parse().unwrap_or(config.confirmation_timeout_secs);
        }

        if let Ok(interval) = std::env::var("FAUCET_POLL_INTERVAL_MS") {
            config.poll_interval_millis =
                interval.parse().unwrap_or(config.poll_interval_millis);
        }

        config
    }

    /// Bound on the confirmation wait
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    /// Delay between receipt queries
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }
}
