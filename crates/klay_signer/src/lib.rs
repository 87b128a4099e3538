// Part of this code was adapted from ethers-rs and is distributed under their
// licenss:
// - https://github.com/gakonst/ethers-rs/blob/cba6f071aedafb766e82e4c2f469ed5e4638337d/LICENSE-APACHE
// - https://github.com/gakonst/ethers-rs/blob/cba6f071aedafb766e82e4c2f469ed5e4638337d/LICENSE-MIT
// For the original context see: https://github.com/gakonst/ethers-rs/blob/cba6f071aedafb766e82e4c2f469ed5e4638337d/ethers-core/src/types/signature.rs

//! secp256k1 signing and public key recovery

mod recoverable;

use k256::{FieldBytes, elliptic_curve::sec1::ToEncodedPoint};
pub use k256::{PublicKey, SecretKey};
use klay_primitives::{Address, B256, U256};
use sha3::{Digest, Keccak256};

pub use self::recoverable::{RecoverableSignature, recover_public_key};

/// The order of the secp256k1 curve.
pub const SECP256K1_N: U256 = U256::from_limbs([
    0xbfd2_5e8c_d036_4141,
    0xbaae_dce6_af48_a03b,
    0xffff_ffff_ffff_fffe,
    0xffff_ffff_ffff_ffff,
]);

/// An error involving a signature.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// Invalid length, ECDSA secp256k1 signatures with recovery are 65 bytes
    #[error("invalid signature length, got {0}, expected 65")]
    InvalidLength(usize),
    /// Invalid secret key.
    #[error("Expected 32 byte secret key")]
    InvalidSecretKeyLength,
    /// When parsing a secret key from string to hex
    #[error("Invalid hex")]
    InvalidSecretKeyHex,
    /// The recovery ID is not 0 or 1.
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),
    /// The public key bytes are not a valid point on the curve.
    #[error("invalid public key")]
    InvalidPublicKey,
    /// ECDSA error
    #[error(transparent)]
    ECDSAError(#[from] k256::ecdsa::signature::Error),
    /// Elliptic curve error
    #[error(transparent)]
    EllipticCurveError(#[from] k256::elliptic_curve::Error),
}

/// Returns whether the signature values are well-formed. `v` must be the
/// normalised recovery ID (0 or 1). With `homestead` set, `s` must be in the
/// lower half of the curve order.
pub fn validate_signature_values(v: u8, r: &U256, s: &U256, homestead: bool) -> bool {
    if r.is_zero() || s.is_zero() {
        return false;
    }

    if homestead && *s > SECP256K1_N >> 1 {
        return false;
    }

    *r < SECP256K1_N && *s < SECP256K1_N && (v == 0 || v == 1)
}

/// Converts a [`PublicKey`] to an [`Address`].
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let public_key = public_key.to_encoded_point(/* compress = */ false);
    // First byte is header value
    let pk_bytes = public_key
        .as_bytes()
        .get(1..)
        .expect("uncompressed public key is 65 bytes");
    let hash = Keccak256::digest(pk_bytes);
    // Only take the lower 160 bits of the hash
    Address::from_word(B256::from_slice(&hash))
}

/// Returns the 33-byte SEC1 compressed encoding of the public key.
pub fn compress_public_key(public_key: &PublicKey) -> Vec<u8> {
    public_key.to_encoded_point(/* compress = */ true).as_bytes().to_vec()
}

/// Parses a SEC1-encoded public key, either compressed or uncompressed.
pub fn public_key_from_sec1(bytes: &[u8]) -> Result<PublicKey, SignatureError> {
    PublicKey::from_sec1_bytes(bytes).map_err(|_error| SignatureError::InvalidPublicKey)
}

/// It's dangerous to represent secret keys as native string types, because the
/// native string types have debug, display and serialization implementations
/// that can result in the secrets accidentally leaking to logs. It's marked as
/// deprecated, because it should be only created in exactly one place in the
/// production code.
#[deprecated]
pub struct DangerousSecretKeyStr<'a>(pub &'a str);

// It's marked as deprecated to be thoughtful abouts its usage.
#[allow(deprecated)]
/// Converts a hex string to a secret key.
pub fn secret_key_from_str(
    secret_key: DangerousSecretKeyStr<'_>,
) -> Result<SecretKey, SignatureError> {
    #[allow(deprecated)]
    let str_key = secret_key.0;
    let secret_key = hex::decode(str_key.strip_prefix("0x").unwrap_or(str_key))
        // Hex error can leak character, so use opaque one.
        .map_err(|_err| SignatureError::InvalidSecretKeyHex)?;
    let secret_key = FieldBytes::from_exact_iter(secret_key.into_iter())
        .ok_or(SignatureError::InvalidSecretKeyLength)?;
    SecretKey::from_bytes(&secret_key).map_err(SignatureError::EllipticCurveError)
}

#[cfg(test)]
mod tests {
    use klay_primitives::address;
    use klay_test_utils::secret_key::secret_key_from_str;

    use super::*;

    #[test]
    fn secret_key_to_address() -> anyhow::Result<()> {
        // A well-known development account
        let secret_key =
            secret_key_from_str("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")?;

        assert_eq!(
            public_key_to_address(&secret_key.public_key()),
            address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );

        Ok(())
    }

    #[test]
    fn compressed_public_key_round_trip() -> anyhow::Result<()> {
        let secret_key =
            secret_key_from_str("45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8")?;
        let public_key = secret_key.public_key();

        let compressed = compress_public_key(&public_key);
        assert_eq!(compressed.len(), 33);
        assert_eq!(public_key_from_sec1(&compressed)?, public_key);

        Ok(())
    }

    #[test]
    fn signature_value_bounds() {
        let one = U256::from(1);

        assert!(validate_signature_values(0, &one, &one, false));
        assert!(validate_signature_values(1, &one, &one, true));
        assert!(!validate_signature_values(2, &one, &one, false));
        assert!(!validate_signature_values(0, &U256::ZERO, &one, false));
        assert!(!validate_signature_values(0, &one, &SECP256K1_N, false));

        let high_s = SECP256K1_N - one;
        assert!(validate_signature_values(0, &one, &high_s, false));
        assert!(!validate_signature_values(0, &one, &high_s, true));
    }
}
