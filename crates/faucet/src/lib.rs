//! Testnet faucet for the OBX native token
//!
//! Issues signed native-token transfers from a single prefunded account and
//! confirms each transfer landed on-chain. Concurrent funding requests are
//! serialized at the nonce level; confirmation polling runs outside that
//! critical section.

pub mod api;
pub mod config;
pub mod error;
pub mod node;
pub mod service;
pub mod tx;
pub mod wallet;

pub use config::{FaucetConfig, NATIVE_TOKEN};
pub use error::{FaucetError, FaucetResult};
pub use node::{HttpNodeClient, NodeClient, NodeError, TransactionReceipt};
pub use service::Faucet;
pub use tx::{LegacyTransaction, SignedTransaction};
pub use wallet::Wallet;
