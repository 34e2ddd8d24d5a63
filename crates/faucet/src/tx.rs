//! Legacy transaction construction and RLP encoding

use keccak_hash::keccak;
use obx_common::types::{Address, Hash};
use rlp::RlpStream;
use serde::Serialize;

/// Unsigned legacy (pre-EIP-2718) transfer
#[derive(Debug, Clone)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

/// ECDSA signature in Ethereum transaction form
#[derive(Debug, Clone)]
pub struct TxSignature {
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

/// Signed transaction ready for submission. `raw` is the RLP-encoded wire
/// form, `hash` the keccak over it (the identifier receipts are queried by).
#[derive(Debug, Clone, Serialize)]
pub struct SignedTransaction {
    pub hash: Hash,
    pub nonce: u64,
    pub to: Address,
    #[serde(serialize_with = "as_decimal_string")]
    pub value: u128,
    #[serde(serialize_with = "as_hex_string")]
    pub raw: Vec<u8>,
}

fn as_decimal_string<S: serde::Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&value.to_string())
}

fn as_hex_string<S: serde::Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("0x{}", hex::encode(bytes)))
}

impl LegacyTransaction {
    /// Digest signed for an EIP-155 replay-protected transaction: the keccak
    /// of the 9-item list with `(chain_id, 0, 0)` in the signature slots.
    pub fn signing_hash(&self, chain_id: u64) -> Hash {
        let mut stream = RlpStream::new();
        stream.begin_list(9);
        self.append_fields(&mut stream);
        stream.append(&chain_id);
        stream.append(&0u8);
        stream.append(&0u8);

        Hash(keccak(stream.out()).0)
    }

    /// Wire encoding of the signed transaction
    pub fn encode_signed(&self, signature: &TxSignature) -> Vec<u8> {
        let mut stream = RlpStream::new();
        stream.begin_list(9);
        self.append_fields(&mut stream);
        stream.append(&signature.v);
        stream.append(&trimmed_be(&signature.r));
        stream.append(&trimmed_be(&signature.s));

        stream.out().to_vec()
    }

    fn append_fields(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        stream.append(&self.to.0.to_vec());
        stream.append(&trimmed_be(&self.value.to_be_bytes()));
        stream.append(&self.data);
    }
}

/// RLP represents integers as minimal big-endian byte strings; leading zeros
/// are invalid.
fn trimmed_be(bytes: &[u8]) -> Vec<u8> {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}
