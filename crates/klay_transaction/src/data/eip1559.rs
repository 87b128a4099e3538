use alloy_rlp::{BufMut, Encodable as _, RlpDecodable};
use klay_chain_config::Rules;
use klay_primitives::{Address, B256, Bytes, TxKind, U256};

use super::{
    eip2930::{set_single_signature, validate_ethereum_recipient, validate_y_parity_signature},
    legacy::execute_ethereum,
};
use crate::{
    AccessList, ExecutionError, ExecutionOutput, StateDb, TransactionJson, TransactionVariant,
    TxError, TxSignature, TxSignatures, TxType, TxValueKey, Vm,
    gas::intrinsic_gas,
    rlp::{encode_ethereum_typed, ethereum_typed_hash},
    value::TxValueReader,
};

/// An EIP-1559 transaction with a dynamic fee.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Eip1559 {
    // The order of these fields determines encoding order.
    /// Chain id
    pub chain_id: U256,
    /// Sender's nonce
    pub nonce: u64,
    /// Maximum priority fee per gas
    pub max_priority_fee_per_gas: U256,
    /// Maximum fee per gas
    pub max_fee_per_gas: U256,
    /// Gas limit
    pub gas_limit: u64,
    /// Recipient, or contract creation
    pub kind: TxKind,
    /// Transferred amount
    pub value: U256,
    /// Call data or init code
    pub input: Bytes,
    /// Accessed addresses and storage keys
    pub access_list: AccessList,
    /// Sender's signature, with a y-parity `v`
    pub signature: TxSignature,
}

impl Eip1559 {
    /// The EIP-2718 type of an EIP-1559 transaction.
    pub const TYPE: u8 = 2;

    pub(crate) fn from_values(values: &mut TxValueReader) -> Result<Self, TxError> {
        Ok(Self {
            chain_id: values.big_int(TxValueKey::ChainId)?,
            nonce: values.uint64(TxValueKey::Nonce)?,
            max_priority_fee_per_gas: values.big_int(TxValueKey::GasTipCap)?,
            max_fee_per_gas: values.big_int(TxValueKey::GasFeeCap)?,
            gas_limit: values.uint64(TxValueKey::GasLimit)?,
            kind: values.address_pointer(TxValueKey::To)?,
            value: values.big_int(TxValueKey::Amount)?,
            input: values.bytes(TxValueKey::Data)?,
            access_list: values.access_list(TxValueKey::AccessList)?,
            signature: TxSignature::default(),
        })
    }

    fn encode_unsigned_fields(&self, chain_id: &U256, out: &mut dyn BufMut) {
        chain_id.encode(out);
        self.nonce.encode(out);
        self.max_priority_fee_per_gas.encode(out);
        self.max_fee_per_gas.encode(out);
        self.gas_limit.encode(out);
        self.kind.encode(out);
        self.value.encode(out);
        self.input.encode(out);
        self.access_list.encode(out);
    }

    fn signed_payload(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        self.encode_unsigned_fields(&self.chain_id, &mut payload);
        self.signature.encode_fields(&mut payload);
        payload
    }
}

impl TransactionVariant for Eip1559 {
    fn tx_type(&self) -> TxType {
        TxType::EthereumDynamicFee
    }

    fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Returns the maximum fee per gas.
    fn gas_price(&self) -> U256 {
        self.max_fee_per_gas
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
        self.chain_id
    }

    fn access_list(&self) -> Option<&AccessList> {
        Some(&self.access_list)
    }

    fn gas_tip_cap(&self) -> U256 {
        self.max_priority_fee_per_gas
    }

    fn gas_fee_cap(&self) -> U256 {
        self.max_fee_per_gas
    }

    fn raw_signature_values(&self) -> TxSignatures {
        TxSignatures::single(self.signature)
    }

    fn set_signatures(&mut self, signatures: TxSignatures) -> Result<(), TxError> {
        set_single_signature(&mut self.signature, &signatures)
    }

    fn validate_signature(&self) -> bool {
        validate_y_parity_signature(&self.signature)
    }

    fn intrinsic_gas(&self, rules: &Rules) -> Result<u64, TxError> {
        intrinsic_gas(
            &self.input,
            Some(&self.access_list),
            self.kind.is_create(),
            rules,
        )
    }

    fn sign_hash(&self, chain_id: &U256) -> B256 {
        let chain_id = if self.chain_id.is_zero() {
            chain_id
        } else {
            &self.chain_id
        };

        let mut payload = Vec::new();
        self.encode_unsigned_fields(chain_id, &mut payload);
        ethereum_typed_hash(Self::TYPE, &payload)
    }

    fn tx_hash(&self) -> B256 {
        ethereum_typed_hash(Self::TYPE, &self.signed_payload())
    }

    fn sender_tx_hash(&self) -> B256 {
        self.tx_hash()
    }

    fn encode_wire(&self, out: &mut dyn BufMut) {
        encode_ethereum_typed(Self::TYPE, &self.signed_payload(), out);
    }

    fn validate(&self, state: &impl StateDb) -> Result<(), TxError> {
        validate_ethereum_recipient(&self.kind)?;
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
        let mut json = TransactionJson::new(self.tx_type(), self.nonce, self.gas_limit);
        json.chain_id = Some(self.chain_id);
        json.max_priority_fee_per_gas = Some(self.max_priority_fee_per_gas);
        json.max_fee_per_gas = Some(self.max_fee_per_gas);
        json.to = Some(self.kind);
        json.value = Some(self.value);
        json.input = Some(self.input.clone());
        json.access_list = Some(self.access_list.clone());
        json.signatures = TxSignatures::single(self.signature);

        json
    }
}

#[derive(RlpDecodable)]
struct Decodable {
    // The order of these fields determines decoding order.
    chain_id: U256,
    nonce: u64,
    max_priority_fee_per_gas: U256,
    max_fee_per_gas: U256,
    gas_limit: u64,
    kind: TxKind,
    value: U256,
    input: Bytes,
    access_list: AccessList,
    v: U256,
    r: U256,
    s: U256,
}

impl alloy_rlp::Decodable for Eip1559 {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let transaction = Decodable::decode(buf)?;

        Ok(Self {
            chain_id: transaction.chain_id,
            nonce: transaction.nonce,
            max_priority_fee_per_gas: transaction.max_priority_fee_per_gas,
            max_fee_per_gas: transaction.max_fee_per_gas,
            gas_limit: transaction.gas_limit,
            kind: transaction.kind,
            value: transaction.value,
            input: transaction.input,
            access_list: transaction.access_list,
            signature: TxSignature {
                v: transaction.v,
                r: transaction.r,
                s: transaction.s,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy_rlp::Decodable as _;
    use klay_chain_config::Hardfork;
    use klay_primitives::{address, b256, hex};
    use klay_signer::RecoverableSignature;

    use super::*;
    use crate::AccessListItem;

    fn signed() -> anyhow::Result<Eip1559> {
        let raw = hex::decode(
            "c9519f4f2b30335884581971573fadf60c6204f59a911df35ee8a540456b266032f1e8e2c5dd761f9e4f88f41c8310aeaba26a8bfcdacfedfa12ec3862d3752101",
        )?;
        let signature = RecoverableSignature::try_from(raw.as_slice())?;

        Ok(Eip1559 {
            chain_id: U256::from(1),
            nonce: 3,
            max_priority_fee_per_gas: U256::from(1),
            max_fee_per_gas: U256::from(1),
            gas_limit: 25_000,
            kind: TxKind::Call(address!("0xb94f5374fce5edbc8e2a8697c15331677e6ebf0b")),
            value: U256::from(10),
            input: Bytes::from_static(&[0x55, 0x44]),
            access_list: AccessList(vec![AccessListItem {
                address: address!("0x0000000000000000000000000000000000000001"),
                storage_keys: vec![B256::ZERO],
            }]),
            signature: TxSignature::with_v(&signature, U256::from(signature.recovery_id)),
        })
    }

    #[test]
    fn encoding() -> anyhow::Result<()> {
        let transaction = signed()?;

        assert_eq!(
            transaction.sign_hash(&U256::from(1)),
            b256!("0xa52ce25a7d108740bce8fbb2dfa1f26793b2e8eea94a7700bedbae13cbdd8a0f")
        );

        let expected = hex::decode(
            "7802f89d010301018261a894b94f5374fce5edbc8e2a8697c15331677e6ebf0b0a825544f838f7940000000000000000000000000000000000000001e1a0000000000000000000000000000000000000000000000000000000000000000001a0c9519f4f2b30335884581971573fadf60c6204f59a911df35ee8a540456b2660a032f1e8e2c5dd761f9e4f88f41c8310aeaba26a8bfcdacfedfa12ec3862d37521",
        )?;
        let mut encoded = Vec::new();
        transaction.encode_wire(&mut encoded);
        assert_eq!(encoded, expected);

        let mut body = expected.get(2..).unwrap_or_default();
        assert_eq!(Eip1559::decode(&mut body)?, transaction);

        Ok(())
    }

    #[test]
    fn fee_caps() -> anyhow::Result<()> {
        let transaction = Eip1559 {
            max_priority_fee_per_gas: U256::from(1_000),
            max_fee_per_gas: U256::from(4_000),
            ..signed()?
        };

        assert_eq!(transaction.gas_price(), U256::from(4_000));
        assert_eq!(transaction.gas_tip_cap(), U256::from(1_000));
        assert_eq!(transaction.gas_fee_cap(), U256::from(4_000));

        Ok(())
    }

    #[test]
    fn access_list_gas() -> anyhow::Result<()> {
        let transaction = signed()?;

        // 21000 + 2 * 100 payload + 2400 address + 1900 storage key
        let istanbul = Rules::new(0, Hardfork::Istanbul);
        assert_eq!(transaction.intrinsic_gas(&istanbul)?, 25_500);

        Ok(())
    }
}
