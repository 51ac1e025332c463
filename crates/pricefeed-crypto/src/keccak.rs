//! Keccak-256 hashing.
//!
//! Symbols are keyed by the keccak-256 of their uppercase ticker, so
//! `"eth"` and `"ETH"` name the same asset.

use alloy_primitives::B256;

/// Prefix of an Ethereum personal message carrying a 32-byte payload.
pub const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Compute the keccak-256 hash of the input data.
pub fn hash(data: &[u8]) -> B256 {
    alloy_primitives::keccak256(data)
}

/// Hash a ticker into its canonical lookup key.
pub fn symbol_hash(symbol: &str) -> B256 {
    hash(symbol.to_uppercase().as_bytes())
}

/// EIP-191 digest signed for `message`:
/// `keccak256(PREFIX || keccak256(message))`.
pub fn personal_digest(message: &[u8]) -> B256 {
    let inner = hash(message);
    let mut buf = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 32);
    buf.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    buf.extend_from_slice(inner.as_slice());
    hash(&buf)
}
