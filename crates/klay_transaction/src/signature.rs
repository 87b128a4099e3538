use alloy_rlp::{RlpDecodable, RlpEncodable};
use klay_defaults::MAX_NUM_KEYS_FOR_MULTI_SIG;
use klay_primitives::{B256, U256};
use klay_signer::{PublicKey, RecoverableSignature, recover_public_key, validate_signature_values};

use crate::TxError;

/// A `[v, r, s]` signature as it appears on the wire.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    RlpDecodable,
    RlpEncodable,
    serde::Deserialize,
    serde::Serialize,
)]
pub struct TxSignature {
    // The order of these fields determines encoding order.
    /// V value
    #[serde(rename = "V", alias = "v")]
    pub v: U256,
    /// R value
    #[serde(rename = "R", alias = "r")]
    pub r: U256,
    /// S value
    #[serde(rename = "S", alias = "s")]
    pub s: U256,
}

impl TxSignature {
    /// Combines a raw signature with a chain-specific `v`.
    pub fn with_v(signature: &RecoverableSignature, v: U256) -> Self {
        Self {
            v,
            r: signature.r,
            s: signature.s,
        }
    }

    /// Writes `v`, `r` and `s` as separate items, without a list header.
    pub(crate) fn encode_fields(&self, out: &mut dyn alloy_rlp::BufMut) {
        use alloy_rlp::Encodable as _;

        self.v.encode(out);
        self.r.encode(out);
        self.s.encode(out);
    }

    /// Derives the chain id from `v`. Pre-EIP-155 values of 27 and 28 map to
    /// chain id 0.
    pub fn chain_id(&self) -> U256 {
        if self.v == U256::from(27) || self.v == U256::from(28) {
            return U256::ZERO;
        }

        self.v.saturating_sub(U256::from(35)) / U256::from(2)
    }

    /// Returns the recovery id encoded by `v`, accepting y-parity values,
    /// pre-EIP-155 values and EIP-155 values.
    fn recovery_id(&self) -> Option<u8> {
        let v = u64::try_from(self.v).ok()?;
        match v {
            0 | 1 => Some(v as u8),
            27 | 28 => Some((v - 27) as u8),
            35.. => Some(((v - 35) % 2) as u8),
            _ => None,
        }
    }

    /// Whether the signature values are well-formed. Does not verify the
    /// signature against any message.
    pub fn validate_signature(&self) -> bool {
        self.recovery_id()
            .is_some_and(|recovery_id| validate_signature_values(recovery_id, &self.r, &self.s, false))
    }

    /// Recovers the public key that signed `hash`. `normalize_v` maps `v` to
    /// `27 + recovery_id`, or fails.
    pub(crate) fn recover_public_key(
        &self,
        hash: &B256,
        normalize_v: impl Fn(U256) -> Option<U256>,
    ) -> Result<PublicKey, TxError> {
        let recovery_id = normalize_v(self.v)
            .and_then(|v| u8::try_from(v).ok())
            .and_then(|v| v.checked_sub(27))
            .ok_or(TxError::InvalidSignature)?;

        if !validate_signature_values(recovery_id, &self.r, &self.s, true) {
            return Err(TxError::InvalidSignature);
        }

        let public_key = recover_public_key(hash, &self.r, &self.s, recovery_id)?;
        Ok(public_key)
    }
}

/// The non-empty set of signatures of a sender or fee payer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "Vec<TxSignature>", into = "Vec<TxSignature>")]
pub struct TxSignatures(Vec<TxSignature>);

impl TxSignatures {
    /// Constructs a signature set, rejecting empty sets and sets with more
    /// signatures than a multi-sig key may have keys.
    pub fn new(signatures: Vec<TxSignature>) -> Result<Self, TxError> {
        if signatures.is_empty() {
            return Err(TxError::EmptySignatureSet);
        }
        if signatures.len() > MAX_NUM_KEYS_FOR_MULTI_SIG {
            return Err(TxError::TooManySignatures(signatures.len()));
        }

        Ok(Self(signatures))
    }

    /// Constructs a set holding a single signature.
    pub fn single(signature: TxSignature) -> Self {
        Self(vec![signature])
    }

    /// Returns the signatures.
    pub fn as_slice(&self) -> &[TxSignature] {
        &self.0
    }

    /// Returns the first signature.
    pub fn first(&self) -> TxSignature {
        self.0.first().copied().unwrap_or_default()
    }

    /// Returns the chain id derived from the first signature.
    pub fn chain_id(&self) -> U256 {
        self.first().chain_id()
    }

    /// Whether every signature is well-formed and all signatures derive the
    /// same chain id.
    pub fn validate_signature(&self) -> bool {
        let chain_id = self.chain_id();

        self.0
            .iter()
            .all(|signature| signature.validate_signature() && signature.chain_id() == chain_id)
    }

    /// Recovers the public key of every signature, in order.
    pub(crate) fn recover_public_keys(
        &self,
        hash: &B256,
        normalize_v: impl Fn(U256) -> Option<U256>,
    ) -> Result<Vec<PublicKey>, TxError> {
        self.0
            .iter()
            .map(|signature| signature.recover_public_key(hash, &normalize_v))
            .collect()
    }
}

impl Default for TxSignatures {
    /// A single zero signature, as carried by unsigned transactions.
    fn default() -> Self {
        Self::single(TxSignature::default())
    }
}

impl From<TxSignatures> for Vec<TxSignature> {
    fn from(value: TxSignatures) -> Self {
        value.0
    }
}

impl TryFrom<Vec<TxSignature>> for TxSignatures {
    type Error = TxError;

    fn try_from(value: Vec<TxSignature>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl alloy_rlp::Encodable for TxSignatures {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.encode(out);
    }

    fn length(&self) -> usize {
        self.0.length()
    }
}

impl alloy_rlp::Decodable for TxSignatures {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let signatures = Vec::<TxSignature>::decode(buf)?;
        Self::new(signatures).map_err(alloy_rlp::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use klay_signer::SECP256K1_N;

    use super::*;

    fn signature(v: u64) -> TxSignature {
        TxSignature {
            v: U256::from(v),
            r: U256::from(1),
            s: U256::from(1),
        }
    }

    #[test]
    fn chain_id_from_v() {
        assert_eq!(signature(27).chain_id(), U256::ZERO);
        assert_eq!(signature(28).chain_id(), U256::ZERO);
        assert_eq!(signature(37).chain_id(), U256::from(1));
        assert_eq!(signature(38).chain_id(), U256::from(1));
        assert_eq!(signature(2019 * 2 + 36).chain_id(), U256::from(2019));
        assert_eq!(signature(0).chain_id(), U256::ZERO);
    }

    #[test]
    fn signature_value_ranges() {
        for v in [0, 1, 27, 28, 35, 36, 37, 38] {
            assert!(signature(v).validate_signature(), "v = {v}");
        }
        for v in [2, 26, 29, 34] {
            assert!(!signature(v).validate_signature(), "v = {v}");
        }

        let mut zero_r = signature(37);
        zero_r.r = U256::ZERO;
        assert!(!zero_r.validate_signature());

        let mut large_s = signature(37);
        large_s.s = SECP256K1_N;
        assert!(!large_s.validate_signature());

        // Upper-half `s` values are only rejected during recovery
        let mut high_s = signature(37);
        high_s.s = SECP256K1_N - U256::from(1);
        assert!(high_s.validate_signature());
    }

    #[test]
    fn signature_sets() {
        assert!(matches!(
            TxSignatures::new(Vec::new()),
            Err(TxError::EmptySignatureSet)
        ));
        assert!(matches!(
            TxSignatures::new(vec![signature(37); MAX_NUM_KEYS_FOR_MULTI_SIG + 1]),
            Err(TxError::TooManySignatures(11))
        ));

        let mixed_chains = TxSignatures(vec![signature(37), signature(39)]);
        assert!(!mixed_chains.validate_signature());

        let same_chain = TxSignatures(vec![signature(37), signature(38)]);
        assert!(same_chain.validate_signature());

        let unsigned = TxSignatures::default();
        assert_eq!(unsigned.as_slice(), &[TxSignature::default()]);
        assert!(!unsigned.validate_signature());
    }

    #[test]
    fn json_field_names() -> anyhow::Result<()> {
        let signatures = TxSignatures::single(signature(37));
        let json = serde_json::to_value(&signatures)?;
        assert_eq!(
            json,
            serde_json::json!([{ "V": "0x25", "R": "0x1", "S": "0x1" }])
        );

        let lowercase: TxSignatures =
            serde_json::from_value(serde_json::json!([{ "v": "0x25", "r": "0x1", "s": "0x1" }]))?;
        assert_eq!(lowercase, signatures);

        assert!(serde_json::from_value::<TxSignatures>(serde_json::json!([])).is_err());

        Ok(())
    }
}
