use alloy_rlp::{RlpDecodable, RlpDecodableWrapper, RlpEncodable, RlpEncodableWrapper};
use klay_primitives::{Address, B256};

/// Storage keys of an address that a transaction plans to access.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    RlpDecodable,
    RlpEncodable,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    /// Accessed address
    pub address: Address,
    /// Accessed storage keys
    pub storage_keys: Vec<B256>,
}

/// EIP-2930 access list.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    RlpDecodableWrapper,
    RlpEncodableWrapper,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(transparent)]
pub struct AccessList(pub Vec<AccessListItem>);

impl AccessList {
    /// Returns the items.
    pub fn as_slice(&self) -> &[AccessListItem] {
        &self.0
    }

    /// Returns the number of storage keys across all items.
    pub fn storage_key_count(&self) -> usize {
        self.0.iter().map(|item| item.storage_keys.len()).sum()
    }
}

impl From<Vec<AccessListItem>> for AccessList {
    fn from(value: Vec<AccessListItem>) -> Self {
        Self(value)
    }
}
