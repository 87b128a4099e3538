mod eip1559;
mod eip2930;
mod legacy;
mod typed;

use alloy_rlp::BufMut;
use klay_account_key::RoleType;
use klay_chain_config::Rules;
use klay_primitives::{Address, B256, U256};

#[cfg(any(test, feature = "test-utils"))]
pub use self::typed::AccountCreation;
pub use self::{
    eip1559::Eip1559,
    eip2930::Eip2930,
    legacy::Legacy,
    typed::{
        AccountUpdate, Cancel, ChainDataAnchoring, FeeDelegation, SmartContractDeploy,
        SmartContractExecution, Typed, TypedFields, ValueTransfer, ValueTransferMemo,
    },
};
use crate::{
    AccessList, ExecutionError, ExecutionOutput, StateDb, TransactionJson, TxError, TxSignatures,
    TxType, Vm,
    r#type::ETHEREUM_TX_TYPE_ENVELOPE,
    value::{TxValueMap, TxValueReader},
};

/// Behaviour shared by every transaction variant.
pub trait TransactionVariant {
    /// Returns the type tag.
    fn tx_type(&self) -> TxType;

    /// Returns the sender's nonce.
    fn nonce(&self) -> u64;

    /// Returns the gas price. Dynamic fee transactions return their fee cap.
    fn gas_price(&self) -> U256;

    /// Returns the gas limit.
    fn gas_limit(&self) -> u64;

    /// Returns the recipient, if any.
    fn to(&self) -> Option<Address>;

    /// Returns the transferred amount.
    fn value(&self) -> U256;

    /// Returns the payload.
    fn data(&self) -> &[u8];

    /// Returns the chain id: explicit for Ethereum typed transactions and
    /// derived from the first signature otherwise.
    fn chain_id(&self) -> U256;

    /// Returns the access list of Ethereum typed transactions.
    fn access_list(&self) -> Option<&AccessList> {
        None
    }

    /// Returns the maximum priority fee per gas.
    fn gas_tip_cap(&self) -> U256 {
        self.gas_price()
    }

    /// Returns the maximum fee per gas.
    fn gas_fee_cap(&self) -> U256 {
        self.gas_price()
    }

    /// Returns the account key role that signs the transaction.
    fn role(&self) -> RoleType {
        RoleType::Transaction
    }

    /// Returns the sender's signatures.
    fn raw_signature_values(&self) -> TxSignatures;

    /// Replaces the sender's signatures.
    fn set_signatures(&mut self, signatures: TxSignatures) -> Result<(), TxError>;

    /// Whether the sender's signatures are well-formed.
    fn validate_signature(&self) -> bool;

    /// Computes the intrinsic gas.
    fn intrinsic_gas(&self, rules: &Rules) -> Result<u64, TxError>;

    /// Computes the hash the sender signs, for the provided chain id.
    fn sign_hash(&self, chain_id: &U256) -> B256;

    /// Computes the transaction hash.
    fn tx_hash(&self) -> B256;

    /// Computes the hash of the transaction without its fee payer.
    fn sender_tx_hash(&self) -> B256;

    /// Writes the wire encoding, including the type tag.
    fn encode_wire(&self, out: &mut dyn BufMut);

    /// Checks the stateless and state-dependent preconditions of the
    /// transaction that cannot change until it is executed.
    fn validate(&self, state: &impl StateDb) -> Result<(), TxError>;

    /// Checks the state-dependent preconditions that can change between
    /// blocks.
    fn validate_mutable_value(&self, state: &impl StateDb) -> Result<(), TxError>;

    /// Applies the transaction to the state, using the virtual machine for
    /// calls and contract creations.
    fn execute<StateT: StateDb, VmT: Vm>(
        &self,
        sender: &Address,
        vm: &mut VmT,
        state: &mut StateT,
        rules: &Rules,
        gas: u64,
        value: U256,
    ) -> Result<ExecutionOutput, ExecutionError<VmT::Error>>;

    /// Returns the JSON representation, without the transaction hash.
    fn to_json(&self) -> TransactionJson;
}

/// The record of a transaction, by variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxData {
    /// Pre-typed Ethereum transaction
    Legacy(Legacy),
    /// EIP-2930 transaction
    EthereumAccessList(Eip2930),
    /// EIP-1559 transaction
    EthereumDynamicFee(Eip1559),
    /// Klay transfer
    ValueTransfer(Typed<ValueTransfer>),
    /// Klay transfer with a memo
    ValueTransferMemo(Typed<ValueTransferMemo>),
    /// Account creation
    #[cfg(any(test, feature = "test-utils"))]
    AccountCreation(Typed<AccountCreation>),
    /// Account key update
    AccountUpdate(Typed<AccountUpdate>),
    /// Smart contract deployment
    SmartContractDeploy(Typed<SmartContractDeploy>),
    /// Smart contract call
    SmartContractExecution(Typed<SmartContractExecution>),
    /// Nonce consumption
    Cancel(Typed<Cancel>),
    /// Child chain data anchoring
    ChainDataAnchoring(Typed<ChainDataAnchoring>),
}

/// Evaluates the expression with the variant's record bound to the
/// identifier.
macro_rules! dispatch {
    ($data:expr, $tx:ident => $body:expr) => {
        match $data {
            TxData::Legacy($tx) => $body,
            TxData::EthereumAccessList($tx) => $body,
            TxData::EthereumDynamicFee($tx) => $body,
            TxData::ValueTransfer($tx) => $body,
            TxData::ValueTransferMemo($tx) => $body,
            #[cfg(any(test, feature = "test-utils"))]
            TxData::AccountCreation($tx) => $body,
            TxData::AccountUpdate($tx) => $body,
            TxData::SmartContractDeploy($tx) => $body,
            TxData::SmartContractExecution($tx) => $body,
            TxData::Cancel($tx) => $body,
            TxData::ChainDataAnchoring($tx) => $body,
        }
    };
}

/// Like [`dispatch`], but only for Klaytn-typed records. Ethereum records
/// evaluate the fallback.
macro_rules! dispatch_typed {
    ($data:expr, $tx:ident => $body:expr, _ => $fallback:expr) => {
        match $data {
            TxData::ValueTransfer($tx) => $body,
            TxData::ValueTransferMemo($tx) => $body,
            #[cfg(any(test, feature = "test-utils"))]
            TxData::AccountCreation($tx) => $body,
            TxData::AccountUpdate($tx) => $body,
            TxData::SmartContractDeploy($tx) => $body,
            TxData::SmartContractExecution($tx) => $body,
            TxData::Cancel($tx) => $body,
            TxData::ChainDataAnchoring($tx) => $body,
            TxData::Legacy(_) | TxData::EthereumAccessList(_) | TxData::EthereumDynamicFee(_) => {
                $fallback
            }
        }
    };
}

pub(crate) use {dispatch, dispatch_typed};

/// Builds the record of each variant.
trait Construct {
    fn legacy(self) -> Result<Legacy, TxError>;

    fn eip2930(self) -> Result<Eip2930, TxError>;

    fn eip1559(self) -> Result<Eip1559, TxError>;

    fn typed<FieldsT: TypedFields>(self, tx_type: TxType) -> Result<Typed<FieldsT>, TxError>;
}

fn construct(tx_type: TxType, constructor: impl Construct) -> Result<TxData, TxError> {
    let data = match tx_type {
        TxType::Legacy => TxData::Legacy(constructor.legacy()?),
        TxType::EthereumAccessList => TxData::EthereumAccessList(constructor.eip2930()?),
        TxType::EthereumDynamicFee => TxData::EthereumDynamicFee(constructor.eip1559()?),
        TxType::ValueTransfer
        | TxType::FeeDelegatedValueTransfer
        | TxType::FeeDelegatedValueTransferWithRatio => {
            TxData::ValueTransfer(constructor.typed(tx_type)?)
        }
        TxType::ValueTransferMemo
        | TxType::FeeDelegatedValueTransferMemo
        | TxType::FeeDelegatedValueTransferMemoWithRatio => {
            TxData::ValueTransferMemo(constructor.typed(tx_type)?)
        }
        TxType::AccountUpdate
        | TxType::FeeDelegatedAccountUpdate
        | TxType::FeeDelegatedAccountUpdateWithRatio => {
            TxData::AccountUpdate(constructor.typed(tx_type)?)
        }
        TxType::SmartContractDeploy
        | TxType::FeeDelegatedSmartContractDeploy
        | TxType::FeeDelegatedSmartContractDeployWithRatio => {
            TxData::SmartContractDeploy(constructor.typed(tx_type)?)
        }
        TxType::SmartContractExecution
        | TxType::FeeDelegatedSmartContractExecution
        | TxType::FeeDelegatedSmartContractExecutionWithRatio => {
            TxData::SmartContractExecution(constructor.typed(tx_type)?)
        }
        TxType::Cancel | TxType::FeeDelegatedCancel | TxType::FeeDelegatedCancelWithRatio => {
            TxData::Cancel(constructor.typed(tx_type)?)
        }
        TxType::ChainDataAnchoring
        | TxType::FeeDelegatedChainDataAnchoring
        | TxType::FeeDelegatedChainDataAnchoringWithRatio => {
            TxData::ChainDataAnchoring(constructor.typed(tx_type)?)
        }
        // Only constructible through `TxData::new_account_creation_with_map`
        TxType::AccountCreation => return Err(TxError::UndefinedTxType),
    };

    Ok(data)
}

struct Zeroed;

impl Construct for Zeroed {
    fn legacy(self) -> Result<Legacy, TxError> {
        Ok(Legacy::default())
    }

    fn eip2930(self) -> Result<Eip2930, TxError> {
        Ok(Eip2930::default())
    }

    fn eip1559(self) -> Result<Eip1559, TxError> {
        Ok(Eip1559::default())
    }

    fn typed<FieldsT: TypedFields>(self, tx_type: TxType) -> Result<Typed<FieldsT>, TxError> {
        Typed::zeroed(tx_type)
    }
}

struct FromValues(TxValueReader);

impl Construct for FromValues {
    fn legacy(mut self) -> Result<Legacy, TxError> {
        let transaction = Legacy::from_values(&mut self.0)?;
        self.0.finish()?;
        Ok(transaction)
    }

    fn eip2930(mut self) -> Result<Eip2930, TxError> {
        let transaction = Eip2930::from_values(&mut self.0)?;
        self.0.finish()?;
        Ok(transaction)
    }

    fn eip1559(mut self) -> Result<Eip1559, TxError> {
        let transaction = Eip1559::from_values(&mut self.0)?;
        self.0.finish()?;
        Ok(transaction)
    }

    fn typed<FieldsT: TypedFields>(
        mut self,
        tx_type: TxType,
    ) -> Result<Typed<FieldsT>, TxError> {
        let transaction = Typed::from_values(tx_type, &mut self.0)?;
        self.0.finish()?;
        Ok(transaction)
    }
}

struct Decoder<'a, 'b>(&'a mut &'b [u8]);

impl Construct for Decoder<'_, '_> {
    fn legacy(self) -> Result<Legacy, TxError> {
        Ok(alloy_rlp::Decodable::decode(self.0)?)
    }

    fn eip2930(self) -> Result<Eip2930, TxError> {
        Ok(alloy_rlp::Decodable::decode(self.0)?)
    }

    fn eip1559(self) -> Result<Eip1559, TxError> {
        Ok(alloy_rlp::Decodable::decode(self.0)?)
    }

    fn typed<FieldsT: TypedFields>(self, tx_type: TxType) -> Result<Typed<FieldsT>, TxError> {
        Typed::decode_body(tx_type, self.0)
    }
}

impl TxData {
    /// Constructs an unsigned record of the provided type with zeroed
    /// fields.
    pub fn new(tx_type: TxType) -> Result<Self, TxError> {
        construct(tx_type, Zeroed)
    }

    /// Constructs an unsigned record of the provided type from the values.
    /// Every value the type requires must be present with the correct kind,
    /// and no other values may be present.
    pub fn new_with_map(tx_type: TxType, values: TxValueMap) -> Result<Self, TxError> {
        construct(tx_type, FromValues(TxValueReader::new(values)))
    }

    /// Constructs an unsigned account creation record from the values.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_account_creation_with_map(values: TxValueMap) -> Result<Self, TxError> {
        FromValues(TxValueReader::new(values))
            .typed(TxType::AccountCreation)
            .map(TxData::AccountCreation)
    }

    /// Decodes a record from its wire encoding. Bytes that do not start with
    /// a type tag are decoded as a legacy transaction.
    pub fn decode(buf: &mut &[u8]) -> Result<Self, TxError> {
        let first = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;

        if first == ETHEREUM_TX_TYPE_ENVELOPE {
            let ethereum_type = *buf.get(1).ok_or(alloy_rlp::Error::InputTooShort)?;
            let tx_type = TxType::try_from(u16::from_be_bytes([first, ethereum_type]))
                .map_err(|_tag| TxError::UndefinedTxType)?;

            // Consume the envelope
            *buf = buf.get(2..).ok_or(alloy_rlp::Error::InputTooShort)?;
            return construct(tx_type, Decoder(buf));
        }

        let mut tag_buf = *buf;
        let Ok(tag) = <u16 as alloy_rlp::Decodable>::decode(&mut tag_buf) else {
            log::debug!("No type tag, decoding as a legacy transaction");
            return construct(TxType::Legacy, Decoder(buf));
        };
        *buf = tag_buf;

        let tx_type = TxType::try_from(tag).map_err(|tag| {
            log::debug!("Undefined transaction type tag: {tag:#x}");
            TxError::UndefinedTxType
        })?;
        construct(tx_type, Decoder(buf))
    }

    /// Returns the fee delegation of fee-delegated Klaytn-typed records.
    pub fn fee_delegation(&self) -> Option<&FeeDelegation> {
        dispatch_typed!(self, tx => tx.fee_delegation(), _ => None)
    }

    /// Returns the sender of Klaytn-typed records. The sender of Ethereum
    /// records is only known through signature recovery.
    pub fn from(&self) -> Option<Address> {
        dispatch_typed!(self, tx => Some(*tx.fields.from()), _ => None)
    }

    /// Returns the fee payer of fee-delegated records.
    pub fn fee_payer(&self) -> Option<Address> {
        self.fee_delegation().map(|delegation| delegation.fee_payer)
    }

    /// Returns the fee ratio of fee-delegated records with a ratio.
    pub fn fee_ratio(&self) -> Option<crate::FeeRatio> {
        self.fee_delegation()
            .and_then(|delegation| delegation.fee_ratio)
    }

    /// Replaces the fee payer's signatures.
    pub fn set_fee_payer_signatures(&mut self, signatures: TxSignatures) -> Result<(), TxError> {
        dispatch_typed!(
            self,
            tx => tx.set_fee_payer_signatures(signatures),
            _ => Err(TxError::NotFeeDelegated)
        )
    }

    /// Computes the hash the fee payer signs, for the provided chain id.
    pub fn fee_payer_sign_hash(&self, chain_id: &U256) -> Result<B256, TxError> {
        dispatch_typed!(
            self,
            tx => tx.fee_payer_sign_hash(chain_id),
            _ => Err(TxError::NotFeeDelegated)
        )
    }

    /// Returns the anchored payload of chain data anchoring records.
    pub fn anchored_data(&self) -> Result<&[u8], TxError> {
        match self {
            TxData::ChainDataAnchoring(tx) => Ok(&tx.fields.anchored_data),
            _ => Err(TxError::InvalidTxTypeForAnchoredData),
        }
    }

    /// Binds an Ethereum typed record to the chain id. Other records derive
    /// their chain id from their signatures and are left unchanged.
    pub(crate) fn set_ethereum_chain_id(&mut self, chain_id: U256) {
        match self {
            TxData::EthereumAccessList(tx) => tx.chain_id = chain_id,
            TxData::EthereumDynamicFee(tx) => tx.chain_id = chain_id,
            _ => {}
        }
    }

    /// Whether the record is a legacy transaction or an Ethereum typed
    /// transaction.
    pub fn is_ethereum(&self) -> bool {
        self.tx_type().is_ethereum()
    }
}

impl TransactionVariant for TxData {
    fn tx_type(&self) -> TxType {
        dispatch!(self, tx => tx.tx_type())
    }

    fn nonce(&self) -> u64 {
        dispatch!(self, tx => tx.nonce())
    }

    fn gas_price(&self) -> U256 {
        dispatch!(self, tx => tx.gas_price())
    }

    fn gas_limit(&self) -> u64 {
        dispatch!(self, tx => tx.gas_limit())
    }

    fn to(&self) -> Option<Address> {
        dispatch!(self, tx => tx.to())
    }

    fn value(&self) -> U256 {
        dispatch!(self, tx => tx.value())
    }

    fn data(&self) -> &[u8] {
        dispatch!(self, tx => TransactionVariant::data(tx))
    }

    fn chain_id(&self) -> U256 {
        dispatch!(self, tx => tx.chain_id())
    }

    fn access_list(&self) -> Option<&AccessList> {
        dispatch!(self, tx => tx.access_list())
    }

    fn gas_tip_cap(&self) -> U256 {
        dispatch!(self, tx => tx.gas_tip_cap())
    }

    fn gas_fee_cap(&self) -> U256 {
        dispatch!(self, tx => tx.gas_fee_cap())
    }

    fn role(&self) -> RoleType {
        dispatch!(self, tx => tx.role())
    }

    fn raw_signature_values(&self) -> TxSignatures {
        dispatch!(self, tx => tx.raw_signature_values())
    }

    fn set_signatures(&mut self, signatures: TxSignatures) -> Result<(), TxError> {
        dispatch!(self, tx => tx.set_signatures(signatures))
    }

    fn validate_signature(&self) -> bool {
        dispatch!(self, tx => tx.validate_signature())
    }

    fn intrinsic_gas(&self, rules: &Rules) -> Result<u64, TxError> {
        dispatch!(self, tx => tx.intrinsic_gas(rules))
    }

    fn sign_hash(&self, chain_id: &U256) -> B256 {
        dispatch!(self, tx => tx.sign_hash(chain_id))
    }

    fn tx_hash(&self) -> B256 {
        dispatch!(self, tx => tx.tx_hash())
    }

    fn sender_tx_hash(&self) -> B256 {
        dispatch!(self, tx => tx.sender_tx_hash())
    }

    fn encode_wire(&self, out: &mut dyn BufMut) {
        dispatch!(self, tx => tx.encode_wire(out));
    }

    fn validate(&self, state: &impl StateDb) -> Result<(), TxError> {
        dispatch!(self, tx => tx.validate(state))
    }

    fn validate_mutable_value(&self, state: &impl StateDb) -> Result<(), TxError> {
        dispatch!(self, tx => tx.validate_mutable_value(state))
    }

    fn execute<StateT: StateDb, VmT: Vm>(
        &self,
        sender: &Address,
        vm: &mut VmT,
        state: &mut StateT,
        rules: &Rules,
        gas: u64,
        value: U256,
    ) -> Result<ExecutionOutput, ExecutionError<VmT::Error>> {
        dispatch!(self, tx => tx.execute(sender, vm, state, rules, gas, value))
    }

    fn to_json(&self) -> TransactionJson {
        dispatch!(self, tx => tx.to_json())
    }
}

impl alloy_rlp::Encodable for TxData {
    fn encode(&self, out: &mut dyn BufMut) {
        self.encode_wire(out);
    }

    fn length(&self) -> usize {
        let mut out = Vec::new();
        self.encode_wire(&mut out);
        out.len()
    }
}
