//! Shared types for the OBX faucet service.

pub mod types;

pub use types::{Address, Hash, ADDRESS_LENGTH, HASH_LENGTH};
