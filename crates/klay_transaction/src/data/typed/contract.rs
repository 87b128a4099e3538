use alloy_rlp::{BufMut, Decodable as _, Encodable as _};
use klay_chain_config::Rules;
use klay_defaults::{TX_GAS_CONTRACT_CREATION, TX_GAS_CONTRACT_EXECUTION, TX_GAS_HUMAN_READABLE};
use klay_primitives::{
    Address, Bytes, TxKind, U256, create_address, is_precompiled_contract_address,
};

use super::{TypedFields, decode_fee_ratio};
use crate::{
    CodeFormat, ExecutionError, ExecutionOutput, FeeRatio, StateDb, TransactionJson, TxError,
    TxType, TxValueKey, Vm, gas::intrinsic_gas_payload, value::TxValueReader,
};

/// Deploys a smart contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmartContractDeploy {
    // The order of these fields determines encoding order.
    /// Must be [`TxKind::Create`]; explicit contract addresses are rejected
    /// during validation.
    pub kind: TxKind,
    /// Transferred amount
    pub value: U256,
    /// Sender
    pub from: Address,
    /// Init code
    pub input: Bytes,
    /// Whether the contract address is human-readable
    pub human_readable: bool,
    /// Format of the code
    pub code_format: CodeFormat,
}

impl TypedFields for SmartContractDeploy {
    const TX_TYPE: TxType = TxType::SmartContractDeploy;
    const FEE_DELEGATED_TX_TYPES: Option<(TxType, TxType)> = Some((
        TxType::FeeDelegatedSmartContractDeploy,
        TxType::FeeDelegatedSmartContractDeployWithRatio,
    ));

    fn from(&self) -> &Address {
        &self.from
    }

    fn to(&self) -> Option<Address> {
        self.kind.to().copied()
    }

    fn value(&self) -> U256 {
        self.value
    }

    fn data(&self) -> &[u8] {
        &self.input
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.kind.encode(out);
        self.value.encode(out);
        self.from.encode(out);
        self.input.encode(out);
        self.human_readable.encode(out);

        // The fee ratio precedes the code format
        if let Some(fee_ratio) = fee_ratio {
            fee_ratio.encode(out);
        }

        self.code_format.encode(out);
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> Result<(Self, Option<FeeRatio>), TxError> {
        let kind = TxKind::decode(buf)?;
        let value = U256::decode(buf)?;
        let from = Address::decode(buf)?;
        let input = Bytes::decode(buf)?;
        let human_readable = bool::decode(buf)?;
        let fee_ratio = decode_fee_ratio(buf, with_fee_ratio)?;
        let code_format = CodeFormat::decode(buf)?;

        let fields = Self {
            kind,
            value,
            from,
            input,
            human_readable,
            code_format,
        };

        Ok((fields, fee_ratio))
    }

    fn from_values(values: &mut TxValueReader) -> Result<Self, TxError> {
        Ok(Self {
            kind: values.address_pointer(TxValueKey::To)?,
            value: values.big_int(TxValueKey::Amount)?,
            from: values.address(TxValueKey::From)?,
            input: values.bytes(TxValueKey::Data)?,
            human_readable: values.bool(TxValueKey::HumanReadable)?,
            code_format: values.code_format(TxValueKey::CodeFormat)?,
        })
    }

    fn write_json(&self, json: &mut TransactionJson) {
        json.to = Some(self.kind);
        json.value = Some(self.value);
        json.from = Some(self.from);
        json.input = Some(self.input.clone());
        json.human_readable = Some(self.human_readable);
        json.code_format = Some(self.code_format.into());
    }

    fn intrinsic_gas(&self) -> Result<u64, TxError> {
        let mut gas = TX_GAS_CONTRACT_CREATION;
        if self.human_readable {
            gas = gas
                .checked_add(TX_GAS_HUMAN_READABLE)
                .ok_or(TxError::OutOfGas)?;
        }

        intrinsic_gas_payload(gas, &self.input)
    }

    fn validate(&self, nonce: u64, _state: &impl StateDb) -> Result<(), TxError> {
        if self.kind.is_call() {
            return Err(TxError::InvalidContractAddress);
        }

        if is_precompiled_contract_address(&create_address(&self.from, nonce)) {
            return Err(TxError::PrecompiledContractRecipient);
        }

        if self.human_readable {
            return Err(TxError::HumanReadableNotSupported);
        }

        if !self.code_format.is_valid() {
            return Err(TxError::InvalidCodeFormat);
        }

        Ok(())
    }

    fn validate_mutable_value(&self, state: &impl StateDb) -> Result<(), TxError> {
        if let TxKind::Call(to) = &self.kind
            && state.exist(to)
        {
            return Err(TxError::AccountAlreadyExists);
        }

        Ok(())
    }

    fn execute<StateT: StateDb, VmT: Vm>(
        &self,
        sender: &Address,
        vm: &mut VmT,
        _state: &mut StateT,
        _rules: &Rules,
        gas: u64,
        value: U256,
    ) -> Result<ExecutionOutput, ExecutionError<VmT::Error>> {
        let result = match &self.kind {
            TxKind::Create => vm.create(sender, &self.input, gas, value, self.code_format),
            TxKind::Call(to) => vm.create_with_address(
                sender,
                &self.input,
                gas,
                value,
                to,
                self.human_readable,
                self.code_format,
            ),
        };

        result
            .map(ExecutionOutput::from)
            .map_err(ExecutionError::Vm)
    }
}

/// Calls a deployed smart contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmartContractExecution {
    // The order of these fields determines encoding order.
    /// The contract
    pub to: Address,
    /// Transferred amount
    pub value: U256,
    /// Sender
    pub from: Address,
    /// Call data
    pub input: Bytes,
}

impl TypedFields for SmartContractExecution {
    const TX_TYPE: TxType = TxType::SmartContractExecution;
    const FEE_DELEGATED_TX_TYPES: Option<(TxType, TxType)> = Some((
        TxType::FeeDelegatedSmartContractExecution,
        TxType::FeeDelegatedSmartContractExecutionWithRatio,
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
        intrinsic_gas_payload(TX_GAS_CONTRACT_EXECUTION, &self.input)
    }

    fn validate_mutable_value(&self, state: &impl StateDb) -> Result<(), TxError> {
        if state.is_contract_available(&self.to) {
            Ok(())
        } else {
            Err(TxError::NotProgramAccount)
        }
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
