//! secp256k1 reporter keys and signer recovery.
//!
//! A signature travels as the ABI encoding of `(bytes32 r, bytes32 s, uint8 v)`
//! with `v` in `{27, 28}`, over [`personal_digest`](crate::keccak::personal_digest)
//! of the message. Recovery accepts high-S signatures by normalising them,
//! matching the EVM `ecrecover` precompile that reporters already target.

use alloy_primitives::{Address, U256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::keccak::{self, personal_digest};
use crate::{CryptoError, Result};

/// Length of an ABI-encoded `(bytes32, bytes32, uint8)` signature.
pub const SIGNATURE_LENGTH: usize = 96;

/// Order of the secp256k1 group.
const CURVE_ORDER: U256 = U256::from_be_bytes([
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
]);

/// A reporter's signing key.
#[derive(Clone)]
pub struct ReporterKey {
    inner: SigningKey,
}

impl ReporterKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        Self {
            inner: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Create a key from a raw 32-byte secret scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let inner =
            SigningKey::from_slice(bytes).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// The 20-byte address other parties know this reporter by.
    pub fn address(&self) -> Address {
        address_of(self.inner.verifying_key())
    }

    /// Sign `message`, returning the 96-byte ABI-encoded signature.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let digest = personal_digest(message);
        let (signature, recovery_id) = self
            .inner
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| CryptoError::Signing(e.to_string()))?;

        let mut encoded = vec![0u8; SIGNATURE_LENGTH];
        encoded[..64].copy_from_slice(&signature.to_bytes());
        encoded[SIGNATURE_LENGTH - 1] = 27 + u8::from(recovery_id.is_y_odd());
        Ok(encoded)
    }
}

impl std::fmt::Debug for ReporterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterKey")
            .field("address", &self.address())
            .finish()
    }
}

/// Recover the address that signed `message`.
///
/// Trailing bytes beyond [`SIGNATURE_LENGTH`] are ignored, as an ABI decoder
/// would.
///
/// # Errors
///
/// - [`CryptoError::InvalidSignatureLength`] if fewer than 96 bytes are given
/// - [`CryptoError::InvalidRecoveryId`] if `v` is not a clean 27 or 28
/// - [`CryptoError::SignatureOutOfRange`] if `r` or `s` is zero or `>= n`
/// - [`CryptoError::RecoveryFailed`] if no key corresponds to the signature
pub fn recover_signer(message: &[u8], signature: &[u8]) -> Result<Address> {
    if signature.len() < SIGNATURE_LENGTH {
        return Err(CryptoError::InvalidSignatureLength {
            expected: SIGNATURE_LENGTH,
            actual: signature.len(),
        });
    }

    let v_word = &signature[64..SIGNATURE_LENGTH];
    if v_word[..31].iter().any(|b| *b != 0) {
        return Err(CryptoError::InvalidRecoveryId);
    }
    let mut parity = match v_word[31] {
        27 => 0u8,
        28 => 1u8,
        _ => return Err(CryptoError::InvalidRecoveryId),
    };

    // (r, s, v) and (r, n - s, v ^ 1) recover the same key.
    let mut s = U256::from_be_slice(&signature[32..64]);
    if s.is_zero() || s >= CURVE_ORDER {
        return Err(CryptoError::SignatureOutOfRange);
    }
    if s > CURVE_ORDER >> 1 {
        s = CURVE_ORDER - s;
        parity ^= 1;
    }

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&signature[..32]);
    compact[32..].copy_from_slice(&s.to_be_bytes::<32>());
    let signature =
        Signature::from_slice(&compact).map_err(|_| CryptoError::SignatureOutOfRange)?;
    let recovery_id = RecoveryId::from_byte(parity).ok_or(CryptoError::InvalidRecoveryId)?;

    let digest = personal_digest(message);
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(address_of(&key))
}

/// Address of a public key: the last 20 bytes of the keccak-256 of its
/// uncompressed coordinates.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak::hash(&point.as_bytes()[1..]);
    Address::from_slice(&digest[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const TEST_SECRET: [u8; 32] =
        hex!("177ee777e72b8c042e05ef41d1db0f17f1fcb0e8150b37cfad6993e4373bdf10");

    #[test]
    fn test_address_from_known_secret() {
        let key = ReporterKey::from_bytes(&TEST_SECRET).expect("valid secret");
        assert_eq!(
            key.address(),
            Address::from(hex!("1826265c3156c3b9b9e751dc4635376f3cd6ee06"))
        );
    }

    #[test]
    fn test_sign_recover_roundtrip() {
        let key = ReporterKey::generate();
        let signature = key.sign(b"price report").expect("sign");
        assert_eq!(signature.len(), SIGNATURE_LENGTH);
        assert!(matches!(signature[95], 27 | 28));
        let signer = recover_signer(b"price report", &signature).expect("recover");
        assert_eq!(signer, key.address());
    }

    #[test]
    fn test_other_message_recovers_other_signer() {
        let key = ReporterKey::from_bytes(&TEST_SECRET).expect("valid secret");
        let signature = key.sign(b"correct message").expect("sign");
        let signer = recover_signer(b"wrong message", &signature).expect("recover");
        assert_ne!(signer, key.address());
    }

    #[test]
    fn test_high_s_signature_recovers_like_ecrecover() {
        // Published by the Coinbase price reporter; s is above n/2.
        let message = hex!(
            "0000000000000000000000000000000000000000000000000000000000000080"
            "000000000000000000000000000000000000000000000000000000005efebe98"
            "00000000000000000000000000000000000000000000000000000000000000c0"
            "000000000000000000000000000000000000000000000000000000000d84ec18"
            "0000000000000000000000000000000000000000000000000000000000000006"
            "7072696365730000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000003"
            "4554480000000000000000000000000000000000000000000000000000000000"
        );
        let signature = hex!(
            "b8ba87c37228468f9d107a97eeb92ebd49a50993669cab1737fea77e5b884f25"
            "91affbf4058bcfa29e38756021deeafaeeab7a5c4f5ce584c7d1e12346c88d4e"
            "000000000000000000000000000000000000000000000000000000000000001b"
        );
        let signer = recover_signer(&message, &signature).expect("recover");
        assert_eq!(
            signer,
            Address::from(hex!("fceadafab14d46e20144f48824d0c09b1a03f2bc"))
        );
    }

    #[test]
    fn test_short_signature_rejected() {
        let err = recover_signer(b"msg", &[0u8; 65]).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidSignatureLength { expected: 96, actual: 65 }
        ));
    }

    #[test]
    fn test_bad_v_rejected() {
        let key = ReporterKey::generate();
        let mut signature = key.sign(b"msg").expect("sign");
        signature[95] = 29;
        assert!(matches!(
            recover_signer(b"msg", &signature).unwrap_err(),
            CryptoError::InvalidRecoveryId
        ));

        let mut dirty = key.sign(b"msg").expect("sign");
        dirty[80] = 1;
        assert!(matches!(
            recover_signer(b"msg", &dirty).unwrap_err(),
            CryptoError::InvalidRecoveryId
        ));
    }

    #[test]
    fn test_zero_components_rejected() {
        let mut signature = [0u8; SIGNATURE_LENGTH];
        signature[95] = 27;
        assert!(matches!(
            recover_signer(b"msg", &signature).unwrap_err(),
            CryptoError::SignatureOutOfRange
        ));

        signature[31] = 1; // r = 1, s = 0
        assert!(matches!(
            recover_signer(b"msg", &signature).unwrap_err(),
            CryptoError::SignatureOutOfRange
        ));
    }

    #[test]
    fn test_s_above_curve_order_rejected() {
        let mut signature = [0xffu8; SIGNATURE_LENGTH];
        signature[64..].fill(0);
        signature[95] = 28;
        assert!(matches!(
            recover_signer(b"msg", &signature).unwrap_err(),
            CryptoError::SignatureOutOfRange
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = ReporterKey::from_bytes(&TEST_SECRET).expect("valid secret");
        let debug = format!("{key:?}");
        assert!(debug.contains("address"));
        assert!(!debug.contains(&hex::encode(TEST_SECRET)));
    }
}
