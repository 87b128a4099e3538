use alloy_rlp::{BufMut, Encodable as _, RlpDecodable};
use klay_chain_config::Rules;
use klay_primitives::{
    Address, B256, Bytes, TxKind, U256, is_precompiled_contract_address, keccak256,
};

use crate::{
    CodeFormat, ExecutionError, ExecutionOutput, StateDb, TransactionJson, TransactionVariant,
    TxError, TxSignature, TxSignatures, TxType, TxValueKey, Vm,
    gas::intrinsic_gas,
    rlp::{encode_list, list},
    value::TxValueReader,
};

/// A pre-typed Ethereum transaction, signed according to EIP-155.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Legacy {
    // The order of these fields determines encoding order.
    /// Sender's nonce
    pub nonce: u64,
    /// Gas price
    pub gas_price: U256,
    /// Gas limit
    pub gas_limit: u64,
    /// Recipient, or contract creation
    pub kind: TxKind,
    /// Transferred amount
    pub value: U256,
    /// Call data or init code
    pub input: Bytes,
    /// Sender's signature, with an EIP-155 `v`
    pub signature: TxSignature,
}

impl Legacy {
    pub(crate) fn from_values(values: &mut TxValueReader) -> Result<Self, TxError> {
        Ok(Self {
            nonce: values.uint64(TxValueKey::Nonce)?,
            gas_price: values.big_int(TxValueKey::GasPrice)?,
            gas_limit: values.uint64(TxValueKey::GasLimit)?,
            kind: values.address_pointer(TxValueKey::To)?,
            value: values.big_int(TxValueKey::Amount)?,
            input: values.bytes(TxValueKey::Data)?,
            signature: TxSignature::default(),
        })
    }

    fn encode_unsigned_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.kind.encode(out);
        self.value.encode(out);
        self.input.encode(out);
    }
}

impl TransactionVariant for Legacy {
    fn tx_type(&self) -> TxType {
        TxType::Legacy
    }

    fn nonce(&self) -> u64 {
        self.nonce
    }

    fn gas_price(&self) -> U256 {
        self.gas_price
    }

    fn gas_limit(&self) -> u64 {
        self.gas_limit
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

    fn chain_id(&self) -> U256 {
        self.signature.chain_id()
    }

    fn raw_signature_values(&self) -> TxSignatures {
        TxSignatures::single(self.signature)
    }

    fn set_signatures(&mut self, signatures: TxSignatures) -> Result<(), TxError> {
        let [signature] = signatures.as_slice() else {
            return Err(TxError::MultipleSignaturesNotSupported);
        };

        self.signature = *signature;
        Ok(())
    }

    fn validate_signature(&self) -> bool {
        self.signature.validate_signature()
    }

    fn intrinsic_gas(&self, rules: &Rules) -> Result<u64, TxError> {
        intrinsic_gas(&self.input, None, self.kind.is_create(), rules)
    }

    fn sign_hash(&self, chain_id: &U256) -> B256 {
        let mut payload = Vec::new();
        self.encode_unsigned_fields(&mut payload);
        chain_id.encode(&mut payload);
        0u8.encode(&mut payload);
        0u8.encode(&mut payload);

        keccak256(list(&payload))
    }

    fn tx_hash(&self) -> B256 {
        let mut out = Vec::new();
        self.encode_wire(&mut out);
        keccak256(out)
    }

    fn sender_tx_hash(&self) -> B256 {
        self.tx_hash()
    }

    fn encode_wire(&self, out: &mut dyn BufMut) {
        let mut payload = Vec::new();
        self.encode_unsigned_fields(&mut payload);
        self.signature.encode_fields(&mut payload);

        encode_list(&payload, out);
    }

    fn validate(&self, state: &impl StateDb) -> Result<(), TxError> {
        if let TxKind::Call(to) = &self.kind
            && is_precompiled_contract_address(to)
        {
            return Err(TxError::PrecompiledContractRecipient);
        }

        self.validate_mutable_value(state)
    }

    fn validate_mutable_value(&self, _state: &impl StateDb) -> Result<(), TxError> {
        Ok(())
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
        execute_ethereum(&self.kind, &self.input, sender, vm, state, gas, value)
    }

    fn to_json(&self) -> TransactionJson {
        let mut json = TransactionJson::new(TxType::Legacy, self.nonce, self.gas_limit);
        json.gas_price = Some(self.gas_price);
        json.to = Some(self.kind);
        json.value = Some(self.value);
        json.input = Some(self.input.clone());
        json.signatures = TxSignatures::single(self.signature);

        json
    }
}

/// Executes a transaction of the Ethereum family: contract creations go
/// through the virtual machine, which consumes the nonce itself.
pub(super) fn execute_ethereum<StateT: StateDb, VmT: Vm>(
    kind: &TxKind,
    input: &[u8],
    sender: &Address,
    vm: &mut VmT,
    state: &mut StateT,
    gas: u64,
    value: U256,
) -> Result<ExecutionOutput, ExecutionError<VmT::Error>> {
    let result = match kind {
        TxKind::Create => vm
            .create(sender, input, gas, value, CodeFormat::EVM)
            .map(ExecutionOutput::from),
        TxKind::Call(to) => {
            state.inc_nonce(sender);
            vm.call(sender, to, input, gas, value)
                .map(ExecutionOutput::from)
        }
    };

    result.map_err(ExecutionError::Vm)
}

#[derive(RlpDecodable)]
struct Decodable {
    // The order of these fields determines decoding order.
    nonce: u64,
    gas_price: U256,
    gas_limit: u64,
    kind: TxKind,
    value: U256,
    input: Bytes,
    v: U256,
    r: U256,
    s: U256,
}

impl alloy_rlp::Decodable for Legacy {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let transaction = Decodable::decode(buf)?;

        Ok(Self {
            nonce: transaction.nonce,
            gas_price: transaction.gas_price,
            gas_limit: transaction.gas_limit,
            kind: transaction.kind,
            value: transaction.value,
            input: transaction.input,
            signature: TxSignature {
                v: transaction.v,
                r: transaction.r,
                s: transaction.s,
            },
        })
    }
}
