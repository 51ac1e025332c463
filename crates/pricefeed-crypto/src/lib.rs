//! # pricefeed-crypto
//!
//! Cryptographic primitives for signed price reports.
//!
//! Reports are signed the way Ethereum wallets sign personal messages:
//! secp256k1 ECDSA over the EIP-191 digest of the keccak-256 hash of the
//! encoded message. Signers are identified by their 20-byte address.
//!
//! ## Modules
//!
//! - [`keccak`]: Keccak-256, symbol hashing and the EIP-191 digest
//! - [`secp256k1`]: Reporter keys, signature encoding and signer recovery

pub mod keccak;
pub mod secp256k1;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The encoded signature is shorter than `(bytes32, bytes32, uint8)`.
    #[error("invalid signature length: expected at least {expected}, got {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },

    /// The `v` word is not 27 or 28, or has dirty high bytes.
    #[error("invalid recovery id")]
    InvalidRecoveryId,

    /// `r` or `s` is zero or not below the curve order.
    #[error("signature component out of range")]
    SignatureOutOfRange,

    /// No public key could be recovered from the signature.
    #[error("signer recovery failed")]
    RecoveryFailed,

    /// Invalid secret key material.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
