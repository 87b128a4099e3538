use alloy_rlp::{BufMut, Encodable as _, RlpDecodable};
use klay_chain_config::Rules;
use klay_primitives::{Address, B256, Bytes, TxKind, U256, is_precompiled_contract_address};
use klay_signer::validate_signature_values;

use super::legacy::execute_ethereum;
use crate::{
    AccessList, ExecutionError, ExecutionOutput, StateDb, TransactionJson, TransactionVariant,
    TxError, TxSignature, TxSignatures, TxType, TxValueKey, Vm,
    gas::intrinsic_gas,
    rlp::{encode_ethereum_typed, ethereum_typed_hash},
    value::TxValueReader,
};

/// Whether the signature of an Ethereum typed transaction is well-formed. Its
/// `v` is the y-parity.
pub(super) fn validate_y_parity_signature(signature: &TxSignature) -> bool {
    u8::try_from(signature.v)
        .is_ok_and(|v| validate_signature_values(v, &signature.r, &signature.s, false))
}

/// Replaces the single signature of an Ethereum typed transaction.
pub(super) fn set_single_signature(
    signature: &mut TxSignature,
    signatures: &TxSignatures,
) -> Result<(), TxError> {
    let [new_signature] = signatures.as_slice() else {
        return Err(TxError::MultipleSignaturesNotSupported);
    };

    *signature = *new_signature;
    Ok(())
}

/// Rejects calls to precompiled contracts.
pub(super) fn validate_ethereum_recipient(kind: &TxKind) -> Result<(), TxError> {
    match kind {
        TxKind::Call(to) if is_precompiled_contract_address(to) => {
            Err(TxError::PrecompiledContractRecipient)
        }
        _ => Ok(()),
    }
}

/// An EIP-2930 transaction with an access list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Eip2930 {
    // The order of these fields determines encoding order.
    /// Chain id
    pub chain_id: U256,
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
    /// Accessed addresses and storage keys
    pub access_list: AccessList,
    /// Sender's signature, with a y-parity `v`
    pub signature: TxSignature,
}

impl Eip2930 {
    /// The EIP-2718 type of an EIP-2930 transaction.
    pub const TYPE: u8 = 1;

    pub(crate) fn from_values(values: &mut TxValueReader) -> Result<Self, TxError> {
        Ok(Self {
            chain_id: values.big_int(TxValueKey::ChainId)?,
            nonce: values.uint64(TxValueKey::Nonce)?,
            gas_price: values.big_int(TxValueKey::GasPrice)?,
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
        self.gas_price.encode(out);
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

impl TransactionVariant for Eip2930 {
    fn tx_type(&self) -> TxType {
        TxType::EthereumAccessList
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
        self.chain_id
    }

    fn access_list(&self) -> Option<&AccessList> {
        Some(&self.access_list)
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
        // Unsigned transactions without a chain id are signed for the signer's
        // chain
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
        json.gas_price = Some(self.gas_price);
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
    gas_price: U256,
    gas_limit: u64,
    kind: TxKind,
    value: U256,
    input: Bytes,
    access_list: AccessList,
    v: U256,
    r: U256,
    s: U256,
}

impl alloy_rlp::Decodable for Eip2930 {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let transaction = Decodable::decode(buf)?;

        Ok(Self {
            chain_id: transaction.chain_id,
            nonce: transaction.nonce,
            gas_price: transaction.gas_price,
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
    use klay_primitives::{address, b256, hex};
    use klay_signer::RecoverableSignature;

    use super::*;
    use crate::r#type::ETHEREUM_TX_TYPE_ENVELOPE;

    fn unsigned() -> Eip2930 {
        Eip2930 {
            chain_id: U256::from(1),
            nonce: 3,
            gas_price: U256::from(1),
            gas_limit: 25_000,
            kind: TxKind::Call(address!("0xb94f5374fce5edbc8e2a8697c15331677e6ebf0b")),
            value: U256::from(10),
            input: Bytes::from_static(&[0x55, 0x44]),
            access_list: AccessList::default(),
            signature: TxSignature::default(),
        }
    }

    #[test]
    fn sign_hash_ignores_signature() -> anyhow::Result<()> {
        let expected = b256!("0x49b486f0ec0a60dfbbca2d30cb07c9e8ffb2a2ff41f29a1ab6737475f6ff69f3");

        let mut transaction = unsigned();
        assert_eq!(transaction.sign_hash(&U256::from(1)), expected);

        let raw = hex::decode(
            "c9519f4f2b30335884581971573fadf60c6204f59a911df35ee8a540456b266032f1e8e2c5dd761f9e4f88f41c8310aeaba26a8bfcdacfedfa12ec3862d3752101",
        )?;
        let signature = RecoverableSignature::try_from(raw.as_slice())?;
        transaction.signature =
            TxSignature::with_v(&signature, U256::from(signature.recovery_id));
        assert_eq!(transaction.sign_hash(&U256::from(1)), expected);

        let mut encoded = Vec::new();
        transaction.encode_wire(&mut encoded);
        assert_eq!(
            encoded,
            hex::decode(
                "7801f8630103018261a894b94f5374fce5edbc8e2a8697c15331677e6ebf0b0a825544c001a0c9519f4f2b30335884581971573fadf60c6204f59a911df35ee8a540456b2660a032f1e8e2c5dd761f9e4f88f41c8310aeaba26a8bfcdacfedfa12ec3862d37521"
            )?
        );

        // Hashed without the envelope byte
        let hashed = encoded.get(1..).unwrap_or_default();
        assert_eq!(transaction.tx_hash(), klay_primitives::keccak256(hashed));

        let mut body = encoded.get(2..).unwrap_or_default();
        assert_eq!(encoded.first(), Some(&ETHEREUM_TX_TYPE_ENVELOPE));
        assert_eq!(Eip2930::decode(&mut body)?, transaction);

        Ok(())
    }

    #[test]
    fn y_parity_signatures() {
        let mut transaction = unsigned();
        transaction.signature = TxSignature {
            v: U256::from(1),
            r: U256::from(1),
            s: U256::from(1),
        };
        assert!(transaction.validate_signature());

        transaction.signature.v = U256::from(27);
        assert!(!transaction.validate_signature());
    }
}
