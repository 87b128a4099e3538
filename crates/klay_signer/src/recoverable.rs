use core::fmt;

use k256::{
    FieldBytes, PublicKey, SecretKey,
    ecdsa::{
        RecoveryId, Signature as ECDSASignature, SigningKey, VerifyingKey,
        signature::hazmat::PrehashSigner,
    },
};
use klay_primitives::{B256, U256};

use crate::SignatureError;

/// A raw ECDSA signature over a prehashed message, as produced by a signer
/// before any chain-specific `v` encoding is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecoverableSignature {
    /// R value
    pub r: U256,
    /// S value
    pub s: U256,
    /// Recovery ID (0 or 1)
    pub recovery_id: u8,
}

impl fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl RecoverableSignature {
    /// Signs the prehashed message with the provided secret key.
    pub fn sign_prehash(hash: &B256, secret_key: &SecretKey) -> Result<Self, SignatureError> {
        let signing_key: SigningKey = secret_key.into();
        let (signature, recovery_id) =
            PrehashSigner::<(ECDSASignature, RecoveryId)>::sign_prehash(&signing_key, hash.as_slice())
                .map_err(SignatureError::ECDSAError)?;

        let r = U256::from_be_slice(Into::<FieldBytes>::into(signature.r()).as_slice());
        let s = U256::from_be_slice(Into::<FieldBytes>::into(signature.s()).as_slice());

        Ok(Self {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        })
    }

    /// Recovers the public key that produced this signature over the
    /// prehashed message.
    pub fn recover(&self, hash: &B256) -> Result<PublicKey, SignatureError> {
        recover_public_key(hash, &self.r, &self.s, self.recovery_id)
    }

    /// Serializes the signature as `r || s || recovery_id`.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        let (r_bytes, remainder) = bytes.split_at_mut(32);
        r_bytes.copy_from_slice(&self.r.to_be_bytes::<32>());

        let (s_bytes, v_byte) = remainder.split_at_mut(32);
        s_bytes.copy_from_slice(&self.s.to_be_bytes::<32>());
        v_byte.fill(self.recovery_id);

        bytes
    }
}

impl TryFrom<&[u8]> for RecoverableSignature {
    type Error = SignatureError;

    /// Parses a raw signature which is expected to be 65 bytes long where
    /// the first 32 bytes is the `r` value, the second 32 bytes the `s` value
    /// and the final byte is the recovery ID.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: &[u8; 65] = bytes
            .try_into()
            .map_err(|_error| SignatureError::InvalidLength(bytes.len()))?;

        let (r_bytes, remainder) = bytes.split_at(32);
        let (s_bytes, _) = remainder.split_at(32);

        Ok(Self {
            r: U256::from_be_slice(r_bytes),
            s: U256::from_be_slice(s_bytes),
            recovery_id: bytes[64],
        })
    }
}

/// Recovers the public key from a signature over a prehashed message.
pub fn recover_public_key(
    hash: &B256,
    r: &U256,
    s: &U256,
    recovery_id: u8,
) -> Result<PublicKey, SignatureError> {
    let recovery_id =
        RecoveryId::from_byte(recovery_id).ok_or(SignatureError::InvalidRecoveryId(recovery_id))?;

    let mut bytes = [0u8; 64];
    let (r_bytes, s_bytes) = bytes.split_at_mut(32);
    r_bytes.copy_from_slice(&r.to_be_bytes::<32>());
    s_bytes.copy_from_slice(&s.to_be_bytes::<32>());
    let signature = ECDSASignature::from_slice(&bytes).map_err(SignatureError::ECDSAError)?;

    let verifying_key = VerifyingKey::recover_from_prehash(hash.as_slice(), &signature, recovery_id)
        .map_err(SignatureError::ECDSAError)?;

    Ok(verifying_key.into())
}
