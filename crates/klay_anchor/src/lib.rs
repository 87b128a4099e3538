#![warn(missing_docs)]

//! Chain data anchoring payloads
//!
//! Child chains periodically anchor a digest of their blocks on the parent
//! chain. The digest is carried opaquely in the payload of chain data
//! anchoring transactions; this crate encodes and decodes it.

use alloy_rlp::{RlpDecodable, RlpEncodable};
use klay_primitives::{B256, Bytes, U256};

/// Errors that can occur when decoding an anchoring payload.
#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    /// The payload is not a valid RLP encoding of any known shape.
    #[error(transparent)]
    Encoding(#[from] alloy_rlp::Error),
    /// The payload is wrapped with an unknown data type.
    #[error("unknown anchoring data type: {0}")]
    UnknownDataType(u8),
    /// The JSON body is malformed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Tag of the wrapped data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AnchoringDataType {
    /// [`AnchoringDataType0`]
    Type0 = 0,
    /// An arbitrary JSON object.
    Json = 1,
}

impl From<AnchoringDataType> for u8 {
    fn from(value: AnchoringDataType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for AnchoringDataType {
    type Error = AnchorError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Type0),
            1 => Ok(Self::Json),
            value => Err(AnchorError::UnknownDataType(value)),
        }
    }
}

/// The original, untagged anchoring record.
#[derive(Clone, Debug, PartialEq, Eq, RlpDecodable, RlpEncodable, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchoringDataLegacy {
    // The order of these fields determines encoding order.
    /// Hash of the anchored block
    pub block_hash: B256,
    /// Transactions root of the anchored block
    #[serde(rename = "transactionsRoot")]
    pub tx_hash: B256,
    /// Parent hash of the anchored block
    pub parent_hash: B256,
    /// Receipts root of the anchored block
    #[serde(rename = "receiptsRoot")]
    pub receipt_hash: B256,
    /// State root of the anchored block
    #[serde(rename = "stateRoot")]
    pub state_root_hash: B256,
    /// Number of the anchored block
    pub block_number: U256,
}

/// An anchoring record that also summarizes the blocks since the previous
/// anchor.
#[derive(Clone, Debug, PartialEq, Eq, RlpDecodable, RlpEncodable, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchoringDataType0 {
    // The order of these fields determines encoding order.
    /// Hash of the anchored block
    pub block_hash: B256,
    /// Transactions root of the anchored block
    #[serde(rename = "transactionsRoot")]
    pub tx_hash: B256,
    /// Parent hash of the anchored block
    pub parent_hash: B256,
    /// Receipts root of the anchored block
    #[serde(rename = "receiptsRoot")]
    pub receipt_hash: B256,
    /// State root of the anchored block
    #[serde(rename = "stateRoot")]
    pub state_root_hash: B256,
    /// Number of the anchored block
    pub block_number: U256,
    /// Number of blocks covered by the anchor
    pub block_count: U256,
    /// Number of transactions in the covered blocks
    pub tx_count: U256,
}

/// The `[type, data]` wrapper of tagged payloads.
#[derive(RlpDecodable, RlpEncodable)]
struct AnchoringData {
    data_type: u8,
    data: Bytes,
}

/// A decoded anchoring payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnchorPayload {
    /// Untagged legacy record
    Legacy(AnchoringDataLegacy),
    /// Tagged type-0 record
    Type0(AnchoringDataType0),
    /// Tagged JSON object
    Json(serde_json::Map<String, serde_json::Value>),
}

impl AnchorPayload {
    /// Encodes the payload for inclusion in an anchoring transaction.
    pub fn encode(&self) -> Result<Vec<u8>, AnchorError> {
        let wrapped = match self {
            AnchorPayload::Legacy(data) => return Ok(alloy_rlp::encode(data)),
            AnchorPayload::Type0(data) => AnchoringData {
                data_type: AnchoringDataType::Type0.into(),
                data: alloy_rlp::encode(data).into(),
            },
            AnchorPayload::Json(object) => AnchoringData {
                data_type: AnchoringDataType::Json.into(),
                data: serde_json::to_vec(object)?.into(),
            },
        };

        Ok(alloy_rlp::encode(wrapped))
    }

    /// Returns the JSON representation of the payload.
    pub fn to_json(&self) -> Result<serde_json::Value, AnchorError> {
        let json = match self {
            AnchorPayload::Legacy(data) => serde_json::to_value(data)?,
            AnchorPayload::Type0(data) => serde_json::to_value(data)?,
            AnchorPayload::Json(object) => serde_json::Value::Object(object.clone()),
        };

        Ok(json)
    }
}

/// Decodes an anchoring payload. Legacy records are tried first; anything
/// else must be a `[type, data]` wrapper.
pub fn decode(bytes: &[u8]) -> Result<AnchorPayload, AnchorError> {
    if let Ok(legacy) = alloy_rlp::decode_exact::<AnchoringDataLegacy>(bytes) {
        return Ok(AnchorPayload::Legacy(legacy));
    }

    let wrapped = alloy_rlp::decode_exact::<AnchoringData>(bytes)?;
    match AnchoringDataType::try_from(wrapped.data_type)? {
        AnchoringDataType::Type0 => {
            let data = alloy_rlp::decode_exact::<AnchoringDataType0>(&wrapped.data)?;
            Ok(AnchorPayload::Type0(data))
        }
        AnchoringDataType::Json => {
            let object = serde_json::from_slice(&wrapped.data)?;
            Ok(AnchorPayload::Json(object))
        }
    }
}

/// Decodes an anchoring payload into its JSON representation, regardless of
/// its wire shape.
pub fn decode_to_json(bytes: &[u8]) -> Result<serde_json::Value, AnchorError> {
    decode(bytes)?.to_json()
}
