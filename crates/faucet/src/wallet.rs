//! Signing identity for the faucet account
//!
//! Owns the private key; nothing outside this module sees it. The wallet
//! derives the account address and turns unsigned transfers into submittable
//! raw transactions.

use crate::error::{FaucetError, FaucetResult};
use crate::tx::{LegacyTransaction, SignedTransaction, TxSignature};
use k256::ecdsa::{SigningKey, VerifyingKey};
use keccak_hash::keccak;
use obx_common::types::{Address, Hash};

pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
    chain_id: u64,
}

impl Wallet {
    /// Build the signing identity from hex-encoded key material (with or
    /// without a `0x` prefix).
    pub fn from_private_key_hex(private_key: &str, chain_id: u64) -> FaucetResult<Self> {
        let stripped = private_key.strip_prefix("0x").unwrap_or(private_key);
        let bytes = hex::decode(stripped)
            .map_err(|e| FaucetError::InvalidConfig(format!("invalid private key: {e}")))?;

        if bytes.len() != 32 {
            return Err(FaucetError::InvalidConfig(format!(
                "invalid private key: expected 32 bytes, got {}",
                bytes.len()
            )));
        }

        let mut key_array = [0u8; 32];
        key_array.copy_from_slice(&bytes);

        let signing_key = SigningKey::from_bytes(&key_array.into())
            .map_err(|e| FaucetError::InvalidConfig(format!("invalid signing key: {e}")))?;

        let address = derive_address(signing_key.verifying_key());

        Ok(Self {
            signing_key,
            address,
            chain_id,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign a transfer with EIP-155 replay protection.
    pub fn sign_transaction(&self, tx: &LegacyTransaction) -> FaucetResult<SignedTransaction> {
        let digest = tx.signing_hash(self.chain_id);

        let (signature, recovery) = self
            .signing_key
            .sign_prehash_recoverable(&digest.0)
            .map_err(|e| FaucetError::Signing(e.to_string()))?;

        let signature = TxSignature {
            v: self.chain_id * 2 + 35 + u64::from(recovery.to_byte()),
            r: signature.r().to_bytes().into(),
            s: signature.s().to_bytes().into(),
        };

        let raw = tx.encode_signed(&signature);
        let hash = Hash(keccak(&raw).0);

        Ok(SignedTransaction {
            hash,
            nonce: tx.nonce,
            to: tx.to,
            value: tx.value,
            raw,
        })
    }
}

/// Ethereum address: last 20 bytes of the keccak of the uncompressed public
/// key (tag byte skipped).
fn derive_address(public_key: &VerifyingKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    let digest = keccak(&encoded.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest.0[12..]);
    Address(addr)
}
