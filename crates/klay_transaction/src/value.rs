use std::collections::HashMap;

use klay_account_key::AccountKey;
use klay_primitives::{Address, Bytes, TxKind, U256};

use crate::{AccessList, CodeFormat, FeeRatio, TxError};

/// Names of the values a transaction can be constructed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TxValueKey {
    /// `u64`
    Nonce,
    /// [`Address`], or [`TxKind`] for types whose recipient may be absent
    To,
    /// [`U256`]
    Amount,
    /// `u64`
    GasLimit,
    /// [`U256`]
    GasPrice,
    /// [`Bytes`]
    Data,
    /// [`Address`]
    From,
    /// [`Bytes`]
    AnchoredData,
    /// `bool`
    HumanReadable,
    /// [`AccountKey`]
    AccountKey,
    /// [`Address`]
    FeePayer,
    /// [`FeeRatio`]
    FeeRatioOfFeePayer,
    /// [`CodeFormat`]
    CodeFormat,
    /// [`AccessList`]
    AccessList,
    /// [`U256`]
    ChainId,
    /// [`U256`]
    GasTipCap,
    /// [`U256`]
    GasFeeCap,
}

/// A value a transaction can be constructed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxValue {
    /// An unsigned 64-bit integer
    Uint64(u64),
    /// An unsigned 256-bit integer
    BigInt(U256),
    /// A mandatory address
    Address(Address),
    /// A recipient that is absent for contract creations
    AddressPointer(TxKind),
    /// A byte string
    Bytes(Bytes),
    /// A flag
    Bool(bool),
    /// An account key
    AccountKey(AccountKey),
    /// A raw fee ratio. Checked against `[1, 99]` when read.
    FeeRatio(u8),
    /// A code format
    CodeFormat(CodeFormat),
    /// An access list
    AccessList(AccessList),
}

/// Values keyed by name, used to construct transactions generically.
pub type TxValueMap = HashMap<TxValueKey, TxValue>;

/// Takes values out of a [`TxValueMap`], requiring that every value is
/// consumed.
pub struct TxValueReader {
    values: TxValueMap,
}

macro_rules! read_value {
    ($name:ident, $variant:ident, $ty:ty, $expected:literal) => {
        #[doc = concat!("Takes the `", $expected, "` value of the key.")]
        pub fn $name(&mut self, key: TxValueKey) -> Result<$ty, TxError> {
            match self.values.remove(&key) {
                Some(TxValue::$variant(value)) => Ok(value),
                _ => Err(TxError::ValueKindMismatch {
                    key,
                    expected: $expected,
                }),
            }
        }
    };
}

impl TxValueReader {
    /// Constructs a reader of the provided values.
    pub fn new(values: TxValueMap) -> Self {
        Self { values }
    }

    read_value!(uint64, Uint64, u64, "u64");
    read_value!(big_int, BigInt, U256, "U256");
    read_value!(address, Address, Address, "Address");
    read_value!(address_pointer, AddressPointer, TxKind, "TxKind");
    read_value!(bytes, Bytes, Bytes, "Bytes");
    read_value!(bool, Bool, bool, "bool");
    read_value!(account_key, AccountKey, AccountKey, "AccountKey");
    read_value!(code_format, CodeFormat, CodeFormat, "CodeFormat");
    read_value!(access_list, AccessList, AccessList, "AccessList");

    /// Reads the fee ratio, checking its range.
    pub fn fee_ratio(&mut self) -> Result<FeeRatio, TxError> {
        let key = TxValueKey::FeeRatioOfFeePayer;
        match self.values.remove(&key) {
            Some(TxValue::FeeRatio(ratio)) => FeeRatio::try_from(ratio),
            _ => Err(TxError::ValueKindMismatch {
                key,
                expected: "FeeRatio",
            }),
        }
    }

    /// Ensures that every value has been read.
    pub fn finish(self) -> Result<(), TxError> {
        if self.values.is_empty() {
            return Ok(());
        }

        let mut keys = self.values.into_keys().collect::<Vec<_>>();
        keys.sort_unstable();
        for key in keys {
            log::warn!("unnecessary key {key:?}");
        }

        Err(TxError::UndefinedKey)
    }
}
