use alloy_rlp::{BufMut, Decodable as _, Encodable as _};
use klay_account_key::{AccountKey, RoleType, check_replacable};
use klay_chain_config::Rules;
use klay_defaults::TX_GAS_ACCOUNT_UPDATE;
use klay_primitives::{Address, Bytes, U256};

use super::{TypedFields, decode_fee_ratio};
use crate::{
    ExecutionError, ExecutionOutput, FeeRatio, StateDb, TransactionJson, TxError, TxType,
    TxValueKey, Vm, state::key_or_legacy, value::TxValueReader,
};

/// Decodes an account key that is embedded as a byte string.
pub(super) fn decode_account_key(buf: &mut &[u8]) -> Result<AccountKey, TxError> {
    let serialized = Bytes::decode(buf)?;

    AccountKey::from_serialized_bytes(&serialized).map_err(|error| {
        log::warn!("Failed to decode an account key: {error}");
        TxError::UnserializableKey
    })
}

/// Replaces the key of the sender's account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountUpdate {
    // The order of these fields determines encoding order.
    /// Sender
    pub from: Address,
    /// The key to install
    pub key: AccountKey,
}

impl Default for AccountUpdate {
    fn default() -> Self {
        Self {
            from: Address::ZERO,
            key: AccountKey::Legacy,
        }
    }
}

impl TypedFields for AccountUpdate {
    const TX_TYPE: TxType = TxType::AccountUpdate;
    const FEE_DELEGATED_TX_TYPES: Option<(TxType, TxType)> = Some((
        TxType::FeeDelegatedAccountUpdate,
        TxType::FeeDelegatedAccountUpdateWithRatio,
    ));

    fn from(&self) -> &Address {
        &self.from
    }

    fn role(&self) -> RoleType {
        RoleType::AccountUpdate
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.from.encode(out);
        self.key.to_serialized_bytes().as_slice().encode(out);

        if let Some(fee_ratio) = fee_ratio {
            fee_ratio.encode(out);
        }
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> Result<(Self, Option<FeeRatio>), TxError> {
        let fields = Self {
            from: Address::decode(buf)?,
            key: decode_account_key(buf)?,
        };

        Ok((fields, decode_fee_ratio(buf, with_fee_ratio)?))
    }

    fn from_values(values: &mut TxValueReader) -> Result<Self, TxError> {
        Ok(Self {
            from: values.address(TxValueKey::From)?,
            key: values.account_key(TxValueKey::AccountKey)?,
        })
    }

    fn write_json(&self, json: &mut TransactionJson) {
        json.from = Some(self.from);
        json.key = Some(self.key.to_serialized_bytes().into());
    }

    fn intrinsic_gas(&self) -> Result<u64, TxError> {
        TX_GAS_ACCOUNT_UPDATE
            .checked_add(self.key.creation_gas()?)
            .ok_or(TxError::OutOfGas)
    }

    fn validate_mutable_value(&self, state: &impl StateDb) -> Result<(), TxError> {
        let old_key = key_or_legacy(state, &self.from);
        check_replacable(&old_key, &self.key)?;

        Ok(())
    }

    fn execute<StateT: StateDb, VmT: Vm>(
        &self,
        sender: &Address,
        _vm: &mut VmT,
        state: &mut StateT,
        rules: &Rules,
        gas: u64,
        _value: U256,
    ) -> Result<ExecutionOutput, ExecutionError<VmT::Error>> {
        state.inc_nonce(sender);
        state.update_key(sender, &self.key, rules)?;

        Ok(ExecutionOutput {
            output: Bytes::new(),
            leftover_gas: gas,
        })
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use self::creation::AccountCreation;

#[cfg(any(test, feature = "test-utils"))]
mod creation {
    use klay_defaults::{TX_GAS_ACCOUNT_CREATION, TX_GAS_HUMAN_READABLE};
    use klay_primitives::TxKind;

    use super::*;

    /// Creates an externally owned account with an explicit key.
    ///
    /// The type is disabled on the network; it is only constructible through
    /// [`crate::TxData::new_account_creation_with_map`] and never decoded
    /// from the wire.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct AccountCreation {
        // The order of these fields determines encoding order.
        /// The account to create
        pub to: Address,
        /// Transferred amount
        pub value: U256,
        /// Sender
        pub from: Address,
        /// Whether the address is human-readable
        pub human_readable: bool,
        /// The key to install
        pub key: AccountKey,
    }

    impl Default for AccountCreation {
        fn default() -> Self {
            Self {
                to: Address::ZERO,
                value: U256::ZERO,
                from: Address::ZERO,
                human_readable: false,
                key: AccountKey::Legacy,
            }
        }
    }

    impl TypedFields for AccountCreation {
        const TX_TYPE: TxType = TxType::AccountCreation;
        const FEE_DELEGATED_TX_TYPES: Option<(TxType, TxType)> = None;

        fn from(&self) -> &Address {
            &self.from
        }

        fn to(&self) -> Option<Address> {
            Some(self.to)
        }

        fn value(&self) -> U256 {
            self.value
        }

        fn encode_fields(&self, _fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
            self.to.encode(out);
            self.value.encode(out);
            self.from.encode(out);
            self.human_readable.encode(out);
            self.key.to_serialized_bytes().as_slice().encode(out);
        }

        fn decode_fields(
            buf: &mut &[u8],
            _with_fee_ratio: bool,
        ) -> Result<(Self, Option<FeeRatio>), TxError> {
            let fields = Self {
                to: Address::decode(buf)?,
                value: U256::decode(buf)?,
                from: Address::decode(buf)?,
                human_readable: bool::decode(buf)?,
                key: decode_account_key(buf)?,
            };

            Ok((fields, None))
        }

        fn from_values(values: &mut TxValueReader) -> Result<Self, TxError> {
            Ok(Self {
                to: values.address(TxValueKey::To)?,
                value: values.big_int(TxValueKey::Amount)?,
                from: values.address(TxValueKey::From)?,
                human_readable: values.bool(TxValueKey::HumanReadable)?,
                key: values.account_key(TxValueKey::AccountKey)?,
            })
        }

        fn write_json(&self, json: &mut TransactionJson) {
            json.to = Some(TxKind::Call(self.to));
            json.value = Some(self.value);
            json.from = Some(self.from);
            json.human_readable = Some(self.human_readable);
            json.key = Some(self.key.to_serialized_bytes().into());
        }

        fn intrinsic_gas(&self) -> Result<u64, TxError> {
            let human_readable_gas = if self.human_readable {
                TX_GAS_HUMAN_READABLE
            } else {
                0
            };

            TX_GAS_ACCOUNT_CREATION
                .checked_add(self.key.creation_gas()?)
                .and_then(|gas| gas.checked_add(human_readable_gas))
                .ok_or(TxError::OutOfGas)
        }

        fn validate(&self, _nonce: u64, _state: &impl StateDb) -> Result<(), TxError> {
            Err(TxError::UndefinedTxType)
        }

        fn execute<StateT: StateDb, VmT: Vm>(
            &self,
            sender: &Address,
            vm: &mut VmT,
            state: &mut StateT,
            _rules: &Rules,
            gas: u64,
            value: U256,
        ) -> Result<ExecutionOutput, ExecutionError<VmT::Error>> {
            state.inc_nonce(sender);
            state.create_eoa(&self.to, self.human_readable, self.key.clone());

            vm.call(sender, &self.to, &[], gas, value)
                .map(ExecutionOutput::from)
                .map_err(ExecutionError::Vm)
        }
    }
}
