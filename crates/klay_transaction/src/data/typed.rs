mod account;
mod anchoring;
mod cancel;
mod contract;
mod value_transfer;

use core::fmt::Debug;

use alloy_rlp::{BufMut, Decodable as _, Encodable as _};
use klay_account_key::RoleType;
use klay_chain_config::Rules;
use klay_defaults::{TX_GAS_FEE_DELEGATED, TX_GAS_FEE_DELEGATED_WITH_RATIO};
use klay_primitives::{Address, B256, U256, keccak256};

#[cfg(any(test, feature = "test-utils"))]
pub use self::account::AccountCreation;
pub use self::{
    account::AccountUpdate,
    anchoring::ChainDataAnchoring,
    cancel::Cancel,
    contract::{SmartContractDeploy, SmartContractExecution},
    value_transfer::{ValueTransfer, ValueTransferMemo},
};
use crate::{
    ExecutionError, ExecutionOutput, FeeRatio, StateDb, TransactionJson, TransactionVariant,
    TxError, TxSignatures, TxType, TxValueKey, Vm,
    rlp::{decode_list, encode_list, finish_list, list},
    value::TxValueReader,
};

/// The variant-specific fields of a Klaytn-typed transaction.
///
/// Every Klaytn-typed transaction starts with a nonce, gas price and gas
/// limit, followed by these fields, the sender's signatures and, if
/// fee-delegated, the fee payer and their signatures.
pub trait TypedFields: Clone + Debug + Default + PartialEq + Eq {
    /// Type of the basic transaction.
    const TX_TYPE: TxType;

    /// Types of the fee-delegated transaction without and with a fee ratio,
    /// if fee delegation is supported.
    const FEE_DELEGATED_TX_TYPES: Option<(TxType, TxType)>;

    /// Returns the sender.
    fn from(&self) -> &Address;

    /// Returns the recipient, if any.
    fn to(&self) -> Option<Address> {
        None
    }

    /// Returns the transferred amount.
    fn value(&self) -> U256 {
        U256::ZERO
    }

    /// Returns the payload.
    fn data(&self) -> &[u8] {
        &[]
    }

    /// Returns the account key role that signs the transaction.
    fn role(&self) -> RoleType {
        RoleType::Transaction
    }

    /// Writes the fields, inserting the fee ratio where the type places it.
    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut);

    /// Reads the fields, and the fee ratio if `with_fee_ratio` is set.
    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> Result<(Self, Option<FeeRatio>), TxError>;

    /// Takes the fields out of a value map.
    fn from_values(values: &mut TxValueReader) -> Result<Self, TxError>;

    /// Writes the fields into the JSON representation.
    fn write_json(&self, json: &mut TransactionJson);

    /// Computes the intrinsic gas, excluding fee delegation surcharges.
    fn intrinsic_gas(&self) -> Result<u64, TxError>;

    /// Checks the preconditions that do not change until execution.
    fn validate(&self, _nonce: u64, _state: &impl StateDb) -> Result<(), TxError> {
        Ok(())
    }

    /// Checks the preconditions that can change between blocks.
    fn validate_mutable_value(&self, _state: &impl StateDb) -> Result<(), TxError> {
        Ok(())
    }

    /// Applies the transaction.
    fn execute<StateT: StateDb, VmT: Vm>(
        &self,
        sender: &Address,
        vm: &mut VmT,
        state: &mut StateT,
        rules: &Rules,
        gas: u64,
        value: U256,
    ) -> Result<ExecutionOutput, ExecutionError<VmT::Error>>;
}

/// Reads the trailing fee ratio of a fee-delegated transaction with a fee
/// ratio.
pub(crate) fn decode_fee_ratio(
    buf: &mut &[u8],
    with_fee_ratio: bool,
) -> Result<Option<FeeRatio>, TxError> {
    if with_fee_ratio {
        Ok(Some(FeeRatio::decode(buf)?))
    } else {
        Ok(None)
    }
}

/// The fee payer of a fee-delegated transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeeDelegation {
    /// Account that pays the fee
    pub fee_payer: Address,
    /// Signatures of the fee payer
    pub fee_payer_signatures: TxSignatures,
    /// Share of the fee paid by the fee payer. The fee payer pays the
    /// entire fee if absent.
    pub fee_ratio: Option<FeeRatio>,
}

impl FeeDelegation {
    fn unsigned(fee_payer: Address, fee_ratio: Option<FeeRatio>) -> Self {
        Self {
            fee_payer,
            fee_payer_signatures: TxSignatures::default(),
            fee_ratio,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SubType {
    Basic,
    FeeDelegated,
    FeeDelegatedWithRatio,
}

/// A Klaytn-typed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Typed<FieldsT> {
    // The order of these fields determines encoding order.
    /// Sender's nonce
    pub nonce: u64,
    /// Gas price
    pub gas_price: U256,
    /// Gas limit
    pub gas_limit: u64,
    /// Variant-specific fields
    pub fields: FieldsT,
    /// Sender's signatures
    pub signatures: TxSignatures,
    fee_delegation: Option<FeeDelegation>,
}

impl<FieldsT: TypedFields> Typed<FieldsT> {
    /// Constructs an unsigned transaction that is not fee-delegated.
    pub fn new(nonce: u64, gas_price: U256, gas_limit: u64, fields: FieldsT) -> Self {
        Self {
            nonce,
            gas_price,
            gas_limit,
            fields,
            signatures: TxSignatures::default(),
            fee_delegation: None,
        }
    }

    /// Constructs an unsigned fee-delegated transaction. The fee payer pays
    /// the entire fee unless a fee ratio is provided.
    pub fn fee_delegated(
        nonce: u64,
        gas_price: U256,
        gas_limit: u64,
        fields: FieldsT,
        fee_payer: Address,
        fee_ratio: Option<FeeRatio>,
    ) -> Result<Self, TxError> {
        if FieldsT::FEE_DELEGATED_TX_TYPES.is_none() {
            return Err(TxError::UndefinedTxType);
        }

        Ok(Self {
            fee_delegation: Some(FeeDelegation::unsigned(fee_payer, fee_ratio)),
            ..Self::new(nonce, gas_price, gas_limit, fields)
        })
    }

    fn sub_type(tx_type: TxType) -> Result<SubType, TxError> {
        if tx_type == FieldsT::TX_TYPE {
            return Ok(SubType::Basic);
        }

        match FieldsT::FEE_DELEGATED_TX_TYPES {
            Some((fee_delegated, _)) if fee_delegated == tx_type => Ok(SubType::FeeDelegated),
            Some((_, with_ratio)) if with_ratio == tx_type => Ok(SubType::FeeDelegatedWithRatio),
            _ => Err(TxError::UndefinedTxType),
        }
    }

    pub(crate) fn zeroed(tx_type: TxType) -> Result<Self, TxError> {
        let fee_delegation = match Self::sub_type(tx_type)? {
            SubType::Basic => None,
            SubType::FeeDelegated => Some(FeeDelegation::unsigned(Address::ZERO, None)),
            // Zero is not a valid ratio
            SubType::FeeDelegatedWithRatio => {
                Some(FeeDelegation::unsigned(Address::ZERO, Some(FeeRatio::MIN)))
            }
        };

        Ok(Self {
            fee_delegation,
            ..Self::new(0, U256::ZERO, 0, FieldsT::default())
        })
    }

    pub(crate) fn from_values(
        tx_type: TxType,
        values: &mut TxValueReader,
    ) -> Result<Self, TxError> {
        let sub_type = Self::sub_type(tx_type)?;

        let nonce = values.uint64(TxValueKey::Nonce)?;
        let gas_price = values.big_int(TxValueKey::GasPrice)?;
        let gas_limit = values.uint64(TxValueKey::GasLimit)?;
        let fields = FieldsT::from_values(values)?;

        let fee_delegation = match sub_type {
            SubType::Basic => None,
            SubType::FeeDelegated => Some(FeeDelegation::unsigned(
                values.address(TxValueKey::FeePayer)?,
                None,
            )),
            SubType::FeeDelegatedWithRatio => {
                let fee_payer = values.address(TxValueKey::FeePayer)?;
                let fee_ratio = values.fee_ratio()?;
                Some(FeeDelegation::unsigned(fee_payer, Some(fee_ratio)))
            }
        };

        Ok(Self {
            fee_delegation,
            ..Self::new(nonce, gas_price, gas_limit, fields)
        })
    }

    pub(crate) fn decode_body(tx_type: TxType, buf: &mut &[u8]) -> Result<Self, TxError> {
        let sub_type = Self::sub_type(tx_type)?;

        let mut payload = decode_list(buf)?;
        let payload_length = payload.len();

        let nonce = u64::decode(&mut payload)?;
        let gas_price = U256::decode(&mut payload)?;
        let gas_limit = u64::decode(&mut payload)?;
        let (fields, fee_ratio) =
            FieldsT::decode_fields(&mut payload, sub_type == SubType::FeeDelegatedWithRatio)?;
        let signatures = TxSignatures::decode(&mut payload)?;

        let fee_delegation = if sub_type == SubType::Basic {
            None
        } else {
            Some(FeeDelegation {
                fee_payer: Address::decode(&mut payload)?,
                fee_payer_signatures: TxSignatures::decode(&mut payload)?,
                fee_ratio,
            })
        };

        finish_list(payload, payload_length)?;

        Ok(Self {
            nonce,
            gas_price,
            gas_limit,
            fields,
            signatures,
            fee_delegation,
        })
    }

    /// Returns the fee delegation, if the transaction is fee-delegated.
    pub fn fee_delegation(&self) -> Option<&FeeDelegation> {
        self.fee_delegation.as_ref()
    }

    pub(crate) fn set_fee_payer_signatures(
        &mut self,
        signatures: TxSignatures,
    ) -> Result<(), TxError> {
        let fee_delegation = self
            .fee_delegation
            .as_mut()
            .ok_or(TxError::NotFeeDelegated)?;

        fee_delegation.fee_payer_signatures = signatures;
        Ok(())
    }

    fn fee_ratio(&self) -> Option<FeeRatio> {
        self.fee_delegation
            .as_ref()
            .and_then(|fee_delegation| fee_delegation.fee_ratio)
    }

    /// Encodes the type tag followed by the fields the sender signs.
    pub fn presign_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        u16::from(self.tx_type()).encode(&mut payload);
        self.nonce.encode(&mut payload);
        self.gas_price.encode(&mut payload);
        self.gas_limit.encode(&mut payload);
        self.fields.encode_fields(self.fee_ratio(), &mut payload);

        list(&payload)
    }

    pub(crate) fn fee_payer_sign_hash(&self, chain_id: &U256) -> Result<B256, TxError> {
        let fee_delegation = self
            .fee_delegation
            .as_ref()
            .ok_or(TxError::NotFeeDelegated)?;

        let mut payload = Vec::new();
        self.presign_bytes().as_slice().encode(&mut payload);
        fee_delegation.fee_payer.encode(&mut payload);
        chain_id.encode(&mut payload);
        0u8.encode(&mut payload);
        0u8.encode(&mut payload);

        Ok(keccak256(list(&payload)))
    }

    /// Encodes the tagged body, with or without the fee payer.
    fn encode_tagged(&self, with_fee_payer: bool, out: &mut dyn BufMut) {
        let mut payload = Vec::new();
        self.nonce.encode(&mut payload);
        self.gas_price.encode(&mut payload);
        self.gas_limit.encode(&mut payload);
        self.fields.encode_fields(self.fee_ratio(), &mut payload);
        self.signatures.encode(&mut payload);

        if with_fee_payer && let Some(fee_delegation) = &self.fee_delegation {
            fee_delegation.fee_payer.encode(&mut payload);
            fee_delegation.fee_payer_signatures.encode(&mut payload);
        }

        u16::from(self.tx_type()).encode(out);
        encode_list(&payload, out);
    }
}

impl<FieldsT: TypedFields> TransactionVariant for Typed<FieldsT> {
    fn tx_type(&self) -> TxType {
        match (&self.fee_delegation, FieldsT::FEE_DELEGATED_TX_TYPES) {
            (Some(fee_delegation), Some((fee_delegated, with_ratio))) => {
                if fee_delegation.fee_ratio.is_some() {
                    with_ratio
                } else {
                    fee_delegated
                }
            }
            _ => FieldsT::TX_TYPE,
        }
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
        self.fields.to()
    }

    fn value(&self) -> U256 {
        self.fields.value()
    }

    fn data(&self) -> &[u8] {
        self.fields.data()
    }

    fn chain_id(&self) -> U256 {
        self.signatures.chain_id()
    }

    fn role(&self) -> RoleType {
        self.fields.role()
    }

    fn raw_signature_values(&self) -> TxSignatures {
        self.signatures.clone()
    }

    fn set_signatures(&mut self, signatures: TxSignatures) -> Result<(), TxError> {
        self.signatures = signatures;
        Ok(())
    }

    fn validate_signature(&self) -> bool {
        self.signatures.validate_signature()
    }

    fn intrinsic_gas(&self, _rules: &Rules) -> Result<u64, TxError> {
        let surcharge = match &self.fee_delegation {
            None => 0,
            Some(FeeDelegation {
                fee_ratio: Some(_), ..
            }) => TX_GAS_FEE_DELEGATED_WITH_RATIO,
            Some(_) => TX_GAS_FEE_DELEGATED,
        };

        self.fields
            .intrinsic_gas()?
            .checked_add(surcharge)
            .ok_or(TxError::OutOfGas)
    }

    fn sign_hash(&self, chain_id: &U256) -> B256 {
        let mut payload = Vec::new();
        self.presign_bytes().as_slice().encode(&mut payload);
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
        let mut out = Vec::new();
        self.encode_tagged(/* with_fee_payer */ false, &mut out);
        keccak256(out)
    }

    fn encode_wire(&self, out: &mut dyn BufMut) {
        self.encode_tagged(/* with_fee_payer */ true, out);
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn validate(&self, state: &impl StateDb) -> Result<(), TxError> {
        self.fields.validate(self.nonce, state)?;
        self.fields.validate_mutable_value(state)
    }

    fn validate_mutable_value(&self, state: &impl StateDb) -> Result<(), TxError> {
        self.fields.validate_mutable_value(state)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn execute<StateT: StateDb, VmT: Vm>(
        &self,
        sender: &Address,
        vm: &mut VmT,
        state: &mut StateT,
        rules: &Rules,
        gas: u64,
        value: U256,
    ) -> Result<ExecutionOutput, ExecutionError<VmT::Error>> {
        self.fields.execute(sender, vm, state, rules, gas, value)
    }

    fn to_json(&self) -> TransactionJson {
        let mut json = TransactionJson::new(self.tx_type(), self.nonce, self.gas_limit);
        json.gas_price = Some(self.gas_price);
        json.signatures = self.signatures.clone();

        self.fields.write_json(&mut json);

        if let Some(fee_delegation) = &self.fee_delegation {
            json.fee_payer = Some(fee_delegation.fee_payer);
            json.fee_payer_signatures = Some(fee_delegation.fee_payer_signatures.clone());
            json.fee_ratio = fee_delegation.fee_ratio.map(u8::from);
        }

        json
    }
}

#[cfg(test)]
mod tests {
    use alloy_rlp::RlpEncodable;
    use klay_primitives::{Bytes, TxKind, address};

    use super::*;
    use crate::{CodeFormat, TxSignature};

    const FROM: Address = address!("0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b");
    const TO: Address = address!("0x7b65b75d204abed71587c9e519a89277766ee1d0");
    const FEE_PAYER: Address = address!("0x5a0043070275d9f6054307ee7348bd660849d90f");

    #[derive(RlpEncodable)]
    struct ValueTransferPresign {
        tx_type: u16,
        nonce: u64,
        gas_price: U256,
        gas_limit: u64,
        to: Address,
        value: U256,
        from: Address,
    }

    #[derive(RlpEncodable)]
    struct SignHashInput {
        presign: Bytes,
        chain_id: U256,
        zero_r: u8,
        zero_s: u8,
    }

    #[derive(RlpEncodable)]
    struct FeePayerSignHashInput {
        presign: Bytes,
        fee_payer: Address,
        chain_id: U256,
        zero_r: u8,
        zero_s: u8,
    }

    fn value_transfer() -> ValueTransfer {
        ValueTransfer {
            to: TO,
            value: U256::from(10),
            from: FROM,
        }
    }

    fn signature(v: u64) -> TxSignature {
        TxSignature {
            v: U256::from(v),
            r: U256::from(1),
            s: U256::from(2),
        }
    }

    fn presign(tx_type: TxType) -> Vec<u8> {
        alloy_rlp::encode(ValueTransferPresign {
            tx_type: tx_type.into(),
            nonce: 1234,
            gas_price: U256::from(25_000_000_000u64),
            gas_limit: 30_000,
            to: TO,
            value: U256::from(10),
            from: FROM,
        })
    }

    #[test]
    fn sign_hash_layout() {
        let transaction = Typed::new(
            1234,
            U256::from(25_000_000_000u64),
            30_000,
            value_transfer(),
        );

        let presign = presign(TxType::ValueTransfer);
        assert_eq!(transaction.presign_bytes(), presign);

        let chain_id = U256::from(1001);
        let expected = keccak256(alloy_rlp::encode(SignHashInput {
            presign: presign.into(),
            chain_id,
            zero_r: 0,
            zero_s: 0,
        }));
        assert_eq!(transaction.sign_hash(&chain_id), expected);
        assert_ne!(transaction.sign_hash(&U256::from(8217)), expected);

        assert!(matches!(
            transaction.fee_payer_sign_hash(&chain_id),
            Err(TxError::NotFeeDelegated)
        ));
    }

    #[test]
    fn fee_payer_sign_hash_layout() -> anyhow::Result<()> {
        let mut transaction = Typed::fee_delegated(
            1234,
            U256::from(25_000_000_000u64),
            30_000,
            value_transfer(),
            FEE_PAYER,
            None,
        )?;
        assert_eq!(transaction.tx_type(), TxType::FeeDelegatedValueTransfer);

        let chain_id = U256::from(1001);
        let expected = keccak256(alloy_rlp::encode(FeePayerSignHashInput {
            presign: presign(TxType::FeeDelegatedValueTransfer).into(),
            fee_payer: FEE_PAYER,
            chain_id,
            zero_r: 0,
            zero_s: 0,
        }));
        assert_eq!(transaction.fee_payer_sign_hash(&chain_id)?, expected);

        // Neither party's signatures are covered
        transaction.signatures = TxSignatures::single(signature(2037));
        transaction.set_fee_payer_signatures(TxSignatures::single(signature(2038)))?;
        assert_eq!(transaction.fee_payer_sign_hash(&chain_id)?, expected);

        Ok(())
    }

    #[test]
    fn sender_hash_excludes_fee_payer() -> anyhow::Result<()> {
        #[derive(RlpEncodable)]
        struct SenderBody {
            nonce: u64,
            gas_price: U256,
            gas_limit: u64,
            to: Address,
            value: U256,
            from: Address,
            signatures: TxSignatures,
        }

        let mut transaction = Typed::fee_delegated(
            7,
            U256::from(25),
            30_000,
            value_transfer(),
            FEE_PAYER,
            None,
        )?;
        transaction.signatures = TxSignatures::single(signature(2037));

        let mut stripped = vec![0x09];
        SenderBody {
            nonce: 7,
            gas_price: U256::from(25),
            gas_limit: 30_000,
            to: TO,
            value: U256::from(10),
            from: FROM,
            signatures: transaction.signatures.clone(),
        }
        .encode(&mut stripped);

        let sender_hash = transaction.sender_tx_hash();
        assert_eq!(sender_hash, keccak256(&stripped));

        transaction.set_fee_payer_signatures(TxSignatures::single(signature(2038)))?;
        let hash = transaction.tx_hash();
        assert_eq!(transaction.sender_tx_hash(), sender_hash);
        assert_ne!(hash, sender_hash);

        transaction.set_fee_payer_signatures(TxSignatures::single(signature(2037)))?;
        assert_eq!(transaction.sender_tx_hash(), sender_hash);
        assert_ne!(transaction.tx_hash(), hash);

        Ok(())
    }

    #[test]
    fn deploy_with_ratio_places_ratio_before_code_format() -> anyhow::Result<()> {
        #[derive(RlpEncodable)]
        struct DeployWithRatioPresign {
            tx_type: u16,
            nonce: u64,
            gas_price: U256,
            gas_limit: u64,
            kind: TxKind,
            value: U256,
            from: Address,
            input: Bytes,
            human_readable: bool,
            fee_ratio: u8,
            code_format: u8,
        }

        let deploy = SmartContractDeploy {
            kind: TxKind::Create,
            value: U256::ZERO,
            from: FROM,
            input: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]),
            human_readable: false,
            code_format: CodeFormat::EVM,
        };
        let fee_ratio = FeeRatio::try_from(30)?;
        let transaction = Typed::fee_delegated(
            3,
            U256::from(25),
            100_000,
            deploy.clone(),
            FEE_PAYER,
            Some(fee_ratio),
        )?;
        assert_eq!(
            transaction.tx_type(),
            TxType::FeeDelegatedSmartContractDeployWithRatio
        );

        let expected = alloy_rlp::encode(DeployWithRatioPresign {
            tx_type: 0x2a,
            nonce: 3,
            gas_price: U256::from(25),
            gas_limit: 100_000,
            kind: TxKind::Create,
            value: U256::ZERO,
            from: FROM,
            input: deploy.input.clone(),
            human_readable: false,
            fee_ratio: 30,
            code_format: 0,
        });
        assert_eq!(transaction.presign_bytes(), expected);

        let mut encoded = Vec::new();
        transaction.encode_wire(&mut encoded);
        let decoded = crate::TxData::decode(&mut encoded.as_slice())?;
        assert_eq!(decoded, crate::TxData::SmartContractDeploy(transaction));
        assert_eq!(decoded.fee_ratio(), Some(fee_ratio));

        Ok(())
    }

    #[test]
    fn decoding_rejects_trailing_fields() {
        let transaction = Typed::new(0, U256::from(25), 21_000, Cancel { from: FROM });

        let mut payload = Vec::new();
        transaction.nonce.encode(&mut payload);
        transaction.gas_price.encode(&mut payload);
        transaction.gas_limit.encode(&mut payload);
        FROM.encode(&mut payload);
        transaction.signatures.encode(&mut payload);
        // A fee payer on a basic transaction
        FEE_PAYER.encode(&mut payload);

        let mut body = Vec::new();
        encode_list(&payload, &mut body);

        assert!(matches!(
            Typed::<Cancel>::decode_body(TxType::Cancel, &mut body.as_slice()),
            Err(TxError::Encoding(_))
        ));
    }

    #[test]
    fn fee_delegation_surcharges() -> anyhow::Result<()> {
        let rules = Rules::new(0, klay_chain_config::Hardfork::Istanbul);

        let basic = Typed::new(0, U256::from(25), 50_000, value_transfer());
        assert_eq!(basic.intrinsic_gas(&rules)?, 21_000);

        let fee_delegated =
            Typed::fee_delegated(0, U256::from(25), 50_000, value_transfer(), FEE_PAYER, None)?;
        assert_eq!(fee_delegated.intrinsic_gas(&rules)?, 31_000);

        let with_ratio = Typed::fee_delegated(
            0,
            U256::from(25),
            50_000,
            value_transfer(),
            FEE_PAYER,
            Some(FeeRatio::MAX),
        )?;
        assert_eq!(with_ratio.tx_type(), TxType::FeeDelegatedValueTransferWithRatio);
        assert_eq!(with_ratio.intrinsic_gas(&rules)?, 36_000);

        let anchoring = Typed::new(
            0,
            U256::from(25),
            50_000,
            ChainDataAnchoring {
                from: FROM,
                anchored_data: Bytes::from_static(&[0x00, 0x01, 0x02, 0x03]),
            },
        );
        // Every payload byte costs the same, whatever the hardfork
        assert_eq!(anchoring.intrinsic_gas(&rules)?, 21_400);
        assert_eq!(
            anchoring.intrinsic_gas(&Rules::new(0, klay_chain_config::Hardfork::Genesis))?,
            21_400
        );

        Ok(())
    }

    #[test]
    fn account_creation_is_never_fee_delegated() {
        assert!(matches!(
            Typed::fee_delegated(
                0,
                U256::ZERO,
                0,
                AccountCreation::default(),
                FEE_PAYER,
                None
            ),
            Err(TxError::UndefinedTxType)
        ));
        assert!(matches!(
            crate::TxData::new(TxType::AccountCreation),
            Err(TxError::UndefinedTxType)
        ));
    }

    #[test]
    fn zeroed_with_ratio_has_minimum_ratio() -> anyhow::Result<()> {
        let transaction =
            Typed::<Cancel>::zeroed(TxType::FeeDelegatedCancelWithRatio)?;
        assert_eq!(transaction.tx_type(), TxType::FeeDelegatedCancelWithRatio);
        assert_eq!(transaction.fee_ratio(), Some(FeeRatio::MIN));

        assert!(matches!(
            Typed::<Cancel>::zeroed(TxType::ValueTransfer),
            Err(TxError::UndefinedTxType)
        ));

        Ok(())
    }
}
