use alloy_rlp::{BufMut, Decodable as _, Encodable as _};
use klay_chain_config::Rules;
use klay_defaults::TX_GAS_VALUE_TRANSFER;
use klay_primitives::{Address, Bytes, TxKind, U256, is_precompiled_contract_address};

use super::{TypedFields, decode_fee_ratio};
use crate::{
    ExecutionError, ExecutionOutput, FeeRatio, StateDb, TransactionJson, TxError, TxType,
    TxValueKey, Vm, gas::intrinsic_gas_payload, value::TxValueReader,
};

fn validate_recipient(to: &Address) -> Result<(), TxError> {
    if is_precompiled_contract_address(to) {
        Err(TxError::PrecompiledContractRecipient)
    } else {
        Ok(())
    }
}

fn validate_not_program_account(to: &Address, state: &impl StateDb) -> Result<(), TxError> {
    if state.is_program_account(to) {
        Err(TxError::NotForProgramAccount)
    } else {
        Ok(())
    }
}

/// Transfers klay to an externally owned account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueTransfer {
    // The order of these fields determines encoding order.
    /// Recipient
    pub to: Address,
    /// Transferred amount
    pub value: U256,
    /// Sender
    pub from: Address,
}

impl TypedFields for ValueTransfer {
    const TX_TYPE: TxType = TxType::ValueTransfer;
    const FEE_DELEGATED_TX_TYPES: Option<(TxType, TxType)> = Some((
        TxType::FeeDelegatedValueTransfer,
        TxType::FeeDelegatedValueTransferWithRatio,
    ));

    fn from(&self) -> &Address {
        &self.from
    }

    fn to(&self) -> Option<Address> {
        Some(self.to)
    }

    fn value(&self) -> U256 {
        self.value
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.to.encode(out);
        self.value.encode(out);
        self.from.encode(out);

        if let Some(fee_ratio) = fee_ratio {
            fee_ratio.encode(out);
        }
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> Result<(Self, Option<FeeRatio>), TxError> {
        let fields = Self {
            to: Address::decode(buf)?,
            value: U256::decode(buf)?,
            from: Address::decode(buf)?,
        };

        Ok((fields, decode_fee_ratio(buf, with_fee_ratio)?))
    }

    fn from_values(values: &mut TxValueReader) -> Result<Self, TxError> {
        Ok(Self {
            to: values.address(TxValueKey::To)?,
            value: values.big_int(TxValueKey::Amount)?,
            from: values.address(TxValueKey::From)?,
        })
    }

    fn write_json(&self, json: &mut TransactionJson) {
        json.to = Some(TxKind::Call(self.to));
        json.value = Some(self.value);
        json.from = Some(self.from);
    }

    fn intrinsic_gas(&self) -> Result<u64, TxError> {
        Ok(TX_GAS_VALUE_TRANSFER)
    }

    fn validate(&self, _nonce: u64, _state: &impl StateDb) -> Result<(), TxError> {
        validate_recipient(&self.to)
    }

    fn validate_mutable_value(&self, state: &impl StateDb) -> Result<(), TxError> {
        validate_not_program_account(&self.to, state)
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

        vm.call(sender, &self.to, &[], gas, value)
            .map(ExecutionOutput::from)
            .map_err(ExecutionError::Vm)
    }
}

/// Transfers klay to an externally owned account, attaching a memo.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueTransferMemo {
    // The order of these fields determines encoding order.
    /// Recipient
    pub to: Address,
    /// Transferred amount
    pub value: U256,
    /// Sender
    pub from: Address,
    /// Memo
    pub input: Bytes,
}

impl TypedFields for ValueTransferMemo {
    const TX_TYPE: TxType = TxType::ValueTransferMemo;
    const FEE_DELEGATED_TX_TYPES: Option<(TxType, TxType)> = Some((
        TxType::FeeDelegatedValueTransferMemo,
        TxType::FeeDelegatedValueTransferMemoWithRatio,
    ));

    fn from(&self) -> &Address {
        &self.from
    }

    fn to(&self) -> Option<Address> {
        Some(self.to)
    }

    fn value(&self) -> U256 {
        self.value
    }

    fn data(&self) -> &[u8] {
        &self.input
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.to.encode(out);
        self.value.encode(out);
        self.from.encode(out);
        self.input.encode(out);

        if let Some(fee_ratio) = fee_ratio {
            fee_ratio.encode(out);
        }
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> Result<(Self, Option<FeeRatio>), TxError> {
        let fields = Self {
            to: Address::decode(buf)?,
            value: U256::decode(buf)?,
            from: Address::decode(buf)?,
            input: Bytes::decode(buf)?,
        };

        Ok((fields, decode_fee_ratio(buf, with_fee_ratio)?))
    }

    fn from_values(values: &mut TxValueReader) -> Result<Self, TxError> {
        Ok(Self {
            to: values.address(TxValueKey::To)?,
            value: values.big_int(TxValueKey::Amount)?,
            from: values.address(TxValueKey::From)?,
            input: values.bytes(TxValueKey::Data)?,
        })
    }

    fn write_json(&self, json: &mut TransactionJson) {
        json.to = Some(TxKind::Call(self.to));
        json.value = Some(self.value);
        json.from = Some(self.from);
        json.input = Some(self.input.clone());
    }

    fn intrinsic_gas(&self) -> Result<u64, TxError> {
        intrinsic_gas_payload(TX_GAS_VALUE_TRANSFER, &self.input)
    }

    fn validate(&self, _nonce: u64, _state: &impl StateDb) -> Result<(), TxError> {
        validate_recipient(&self.to)
    }

    fn validate_mutable_value(&self, state: &impl StateDb) -> Result<(), TxError> {
        validate_not_program_account(&self.to, state)
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

        vm.call(sender, &self.to, &self.input, gas, value)
            .map(ExecutionOutput::from)
            .map_err(ExecutionError::Vm)
    }
}
