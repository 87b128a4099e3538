use std::sync::OnceLock;

use alloy_rlp::BufMut;
use klay_account_key::{AccountKeyPicker, RoleType, validate_account_key};
use klay_chain_config::Rules;
use klay_primitives::{Address, B256, Bytes, U256};
use klay_signer::{RecoverableSignature, SecretKey};

use crate::{
    AccessList, AccessListItem, ExecutionError, ExecutionOutput, FeeRatio, StateDb, TransactionJson,
    TransactionVariant as _, TxData, TxError, TxSignature, TxSignatures, TxType, Vm,
    signer::Signer, state::key_or_legacy,
};

/// An account whose signatures were validated against its account key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatedSender {
    /// The validated account
    pub address: Address,
    /// Gas charged for validating the account's signatures
    pub validation_gas: u64,
}

/// A transaction record, with memoized hashes and the accounts that were
/// validated as its sender and fee payer.
#[derive(Clone, Debug)]
pub struct Transaction {
    data: TxData,
    hash: OnceLock<B256>,
    sender_tx_hash: OnceLock<B256>,
    size: OnceLock<usize>,
    validated_sender: OnceLock<Address>,
    validated_fee_payer: OnceLock<Address>,
}

impl Transaction {
    /// Wraps a transaction record.
    pub fn new(data: TxData) -> Self {
        Self {
            data,
            hash: OnceLock::new(),
            sender_tx_hash: OnceLock::new(),
            size: OnceLock::new(),
            validated_sender: OnceLock::new(),
            validated_fee_payer: OnceLock::new(),
        }
    }

    /// Decodes a transaction from its wire encoding, rejecting trailing
    /// bytes and malformed sender signatures.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        let mut buf = bytes;
        let data = TxData::decode(&mut buf)?;

        if !buf.is_empty() {
            return Err(alloy_rlp::Error::UnexpectedLength.into());
        }

        Self::with_valid_signatures(data)
    }

    fn with_valid_signatures(data: TxData) -> Result<Self, TxError> {
        if !data.validate_signature() {
            log::debug!("Rejected a {} with malformed signatures", data.tx_type());
            return Err(TxError::InvalidSignature);
        }

        Ok(Self::new(data))
    }

    /// Returns the wire encoding.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = Vec::new();
        self.data.encode_wire(&mut out);
        out.into()
    }

    /// Returns the record.
    pub fn internal_data(&self) -> &TxData {
        &self.data
    }

    /// Consumes the transaction, returning the record.
    pub fn into_internal_data(self) -> TxData {
        self.data
    }

    /// Returns the record for modification, discarding everything derived
    /// from it.
    fn data_mut(&mut self) -> &mut TxData {
        self.hash = OnceLock::new();
        self.sender_tx_hash = OnceLock::new();
        self.size = OnceLock::new();
        self.validated_sender = OnceLock::new();
        self.validated_fee_payer = OnceLock::new();

        &mut self.data
    }

    /// Returns the type tag.
    pub fn tx_type(&self) -> TxType {
        self.data.tx_type()
    }

    /// Returns the transaction hash.
    pub fn hash(&self) -> B256 {
        *self.hash.get_or_init(|| self.data.tx_hash())
    }

    /// Returns the hash of the transaction without its fee payer, for
    /// fee-delegated transactions only.
    pub fn sender_tx_hash(&self) -> Option<B256> {
        self.tx_type()
            .is_fee_delegated()
            .then(|| self.sender_tx_hash_all())
    }

    /// Returns the hash of the transaction without its fee payer. Equals
    /// [`Transaction::hash`] for transactions that are not fee-delegated.
    pub fn sender_tx_hash_all(&self) -> B256 {
        *self
            .sender_tx_hash
            .get_or_init(|| self.data.sender_tx_hash())
    }

    /// Returns the length of the wire encoding.
    pub fn size(&self) -> usize {
        *self.size.get_or_init(|| self.to_bytes().len())
    }

    /// Returns the sender's nonce.
    pub fn nonce(&self) -> u64 {
        self.data.nonce()
    }

    /// Returns the gas limit.
    pub fn gas_limit(&self) -> u64 {
        self.data.gas_limit()
    }

    /// Returns the gas price. Dynamic fee transactions return their fee cap.
    pub fn gas_price(&self) -> U256 {
        self.data.gas_price()
    }

    /// Returns the maximum priority fee per gas.
    pub fn gas_tip_cap(&self) -> U256 {
        self.data.gas_tip_cap()
    }

    /// Returns the maximum fee per gas.
    pub fn gas_fee_cap(&self) -> U256 {
        self.data.gas_fee_cap()
    }

    /// Returns the priority fee per gas paid on top of the base fee.
    pub fn effective_gas_tip(&self, base_fee: U256) -> U256 {
        if self.tx_type() == TxType::EthereumDynamicFee {
            self.gas_tip_cap()
                .min(self.gas_fee_cap().saturating_sub(base_fee))
        } else {
            self.gas_price()
        }
    }

    /// Returns the price per gas paid, including the base fee.
    pub fn effective_gas_price(&self, base_fee: U256) -> U256 {
        if self.tx_type() == TxType::EthereumDynamicFee {
            self.gas_tip_cap()
                .saturating_add(base_fee)
                .min(self.gas_fee_cap())
        } else {
            self.gas_price()
        }
    }

    /// Returns `gas_price * gas_limit`.
    pub fn fee(&self) -> U256 {
        self.gas_price()
            .saturating_mul(U256::from(self.gas_limit()))
    }

    /// Returns the fee plus the transferred amount.
    pub fn cost(&self) -> U256 {
        self.fee().saturating_add(self.value())
    }

    /// Returns the recipient, if any.
    pub fn to(&self) -> Option<Address> {
        self.data.to()
    }

    /// Returns the transferred amount.
    pub fn value(&self) -> U256 {
        self.data.value()
    }

    /// Returns the payload.
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns the chain id.
    pub fn chain_id(&self) -> U256 {
        self.data.chain_id()
    }

    /// Returns the access list. Empty for transaction types without one.
    pub fn access_list(&self) -> &[AccessListItem] {
        self.data
            .access_list()
            .map(AccessList::as_slice)
            .unwrap_or_default()
    }

    /// Returns the anchored payload of chain data anchoring transactions.
    pub fn anchored_data(&self) -> Result<&[u8], TxError> {
        self.data.anchored_data()
    }

    /// Returns the sender named by Klaytn-typed transactions.
    pub fn from(&self) -> Result<Address, TxError> {
        self.data.from().ok_or(TxError::NoSender)
    }

    /// Returns the fee payer of fee-delegated transactions, or the sender
    /// otherwise.
    pub fn fee_payer(&self) -> Result<Address, TxError> {
        match self.data.fee_payer() {
            Some(fee_payer) => Ok(fee_payer),
            None => self.from(),
        }
    }

    /// Returns the fee payer's share of the fee, if the transaction
    /// specifies one. Fee payers of other fee-delegated transactions pay the
    /// entire fee.
    pub fn fee_ratio(&self) -> Option<FeeRatio> {
        self.data.fee_ratio()
    }

    /// Returns the sender's signatures.
    pub fn raw_signature_values(&self) -> TxSignatures {
        self.data.raw_signature_values()
    }

    /// Returns the fee payer's signatures of fee-delegated transactions.
    pub fn fee_payer_signatures(&self) -> Option<&TxSignatures> {
        self.data
            .fee_delegation()
            .map(|fee_delegation| &fee_delegation.fee_payer_signatures)
    }

    /// Replaces the sender's signatures.
    pub fn set_signatures(&mut self, signatures: TxSignatures) -> Result<(), TxError> {
        self.data_mut().set_signatures(signatures)
    }

    /// Replaces the fee payer's signatures.
    pub fn set_fee_payer_signatures(&mut self, signatures: TxSignatures) -> Result<(), TxError> {
        self.data_mut().set_fee_payer_signatures(signatures)
    }

    /// Signs the transaction as its sender.
    pub fn sign(&mut self, signer: &impl Signer, secret_key: &SecretKey) -> Result<(), TxError> {
        let hash = signer.hash(&self.data);
        let signature = RecoverableSignature::sign_prehash(&hash, secret_key)?;

        self.apply_signature(signer, &signature)
    }

    /// Signs the transaction as its sender with each of the keys, in order.
    pub fn sign_with_keys(
        &mut self,
        signer: &impl Signer,
        secret_keys: &[SecretKey],
    ) -> Result<(), TxError> {
        let hash = signer.hash(&self.data);
        let signatures = self.signature_values_with_keys(signer, &hash, secret_keys)?;

        self.set_signatures(signatures)
    }

    /// Signs the transaction as its fee payer.
    pub fn sign_fee_payer(
        &mut self,
        signer: &impl Signer,
        secret_key: &SecretKey,
    ) -> Result<(), TxError> {
        self.sign_fee_payer_with_keys(signer, core::slice::from_ref(secret_key))
    }

    /// Signs the transaction as its fee payer with each of the keys, in
    /// order.
    pub fn sign_fee_payer_with_keys(
        &mut self,
        signer: &impl Signer,
        secret_keys: &[SecretKey],
    ) -> Result<(), TxError> {
        let hash = signer.hash_fee_payer(&self.data)?;
        let signatures = self.signature_values_with_keys(signer, &hash, secret_keys)?;

        self.set_fee_payer_signatures(signatures)
    }

    fn signature_values_with_keys(
        &self,
        signer: &impl Signer,
        hash: &B256,
        secret_keys: &[SecretKey],
    ) -> Result<TxSignatures, TxError> {
        let signatures = secret_keys
            .iter()
            .map(|secret_key| {
                let signature = RecoverableSignature::sign_prehash(hash, secret_key)?;
                signer.signature_values(&self.data, &signature)
            })
            .collect::<Result<Vec<TxSignature>, TxError>>()?;

        TxSignatures::new(signatures)
    }

    /// Returns a copy of the transaction signed by the sender with the
    /// 65-byte `r || s || recovery_id` signature.
    pub fn with_signature(&self, signer: &impl Signer, signature: &[u8]) -> Result<Self, TxError> {
        let signature = parse_raw_signature(signature)?;

        let mut transaction = Self::new(self.data.clone());
        transaction.apply_signature(signer, &signature)?;
        Ok(transaction)
    }

    /// Returns a copy of the transaction signed by the fee payer with the
    /// 65-byte `r || s || recovery_id` signature.
    pub fn with_fee_payer_signature(
        &self,
        signer: &impl Signer,
        signature: &[u8],
    ) -> Result<Self, TxError> {
        let signature = parse_raw_signature(signature)?;
        let signature = signer.signature_values(&self.data, &signature)?;

        let mut transaction = Self::new(self.data.clone());
        transaction.set_fee_payer_signatures(TxSignatures::single(signature))?;
        Ok(transaction)
    }

    /// Sets the sender's signature. Ethereum typed transactions become
    /// bound to the signer's chain.
    fn apply_signature(
        &mut self,
        signer: &impl Signer,
        signature: &RecoverableSignature,
    ) -> Result<(), TxError> {
        let signature = signer.signature_values(&self.data, signature)?;

        let data = self.data_mut();
        if data.tx_type().is_ethereum_typed() {
            data.set_ethereum_chain_id(signer.chain_id());
        }
        data.set_signatures(TxSignatures::single(signature))
    }

    /// Recovers the sender and validates its signatures against the
    /// sender's account key. Ethereum transactions require the sender to
    /// hold a legacy key and are charged no validation gas.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn validate_sender(
        &self,
        signer: &impl Signer,
        picker: &impl AccountKeyPicker,
        rules: &Rules,
    ) -> Result<ValidatedSender, TxError> {
        if self.data.is_ethereum() {
            let address = signer.sender(&self.data)?;
            if !key_or_legacy(picker, &address).is_legacy() {
                return Err(TxError::LegacyTransactionMustBeWithLegacyKey);
            }

            let _ = self.validated_sender.set(address);
            return Ok(ValidatedSender {
                address,
                validation_gas: 0,
            });
        }

        let public_keys = signer.sender_public_keys(&self.data)?;
        let from = self.from()?;
        let role = self.data.role();

        let account_key = key_or_legacy(picker, &from);
        let validation_gas = account_key.validation_gas(rules, role, public_keys.len())?;

        validate_account_key(rules, &from, &account_key, &public_keys, role).map_err(|error| {
            log::debug!("Sender {from} failed validation: {error}");
            TxError::InvalidSenderSignature
        })?;

        let _ = self.validated_sender.set(from);
        Ok(ValidatedSender {
            address: from,
            validation_gas,
        })
    }

    /// Recovers the fee payer's public keys and validates them against the
    /// fee payer's account key.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn validate_fee_payer(
        &self,
        signer: &impl Signer,
        picker: &impl AccountKeyPicker,
        rules: &Rules,
    ) -> Result<ValidatedSender, TxError> {
        let fee_payer = self.data.fee_payer().ok_or(TxError::NotFeeDelegated)?;
        let public_keys = signer.fee_payer_public_keys(&self.data)?;

        let account_key = key_or_legacy(picker, &fee_payer);
        let validation_gas =
            account_key.validation_gas(rules, RoleType::FeePayer, public_keys.len())?;

        validate_account_key(
            rules,
            &fee_payer,
            &account_key,
            &public_keys,
            RoleType::FeePayer,
        )
        .map_err(|error| {
            log::debug!("Fee payer {fee_payer} failed validation: {error}");
            TxError::InvalidFeePayerSignature
        })?;

        let _ = self.validated_fee_payer.set(fee_payer);
        Ok(ValidatedSender {
            address: fee_payer,
            validation_gas,
        })
    }

    /// Returns the sender recorded by [`Transaction::validate_sender`].
    pub fn validated_sender(&self) -> Option<Address> {
        self.validated_sender.get().copied()
    }

    /// Returns the fee payer recorded by [`Transaction::validate_fee_payer`],
    /// or the validated sender if the transaction is not fee-delegated.
    pub fn validated_fee_payer(&self) -> Option<Address> {
        self.validated_fee_payer
            .get()
            .copied()
            .or_else(|| self.validated_sender())
    }

    /// Computes the intrinsic gas.
    pub fn intrinsic_gas(&self, rules: &Rules) -> Result<u64, TxError> {
        self.data.intrinsic_gas(rules)
    }

    /// Checks the preconditions that do not change until the transaction is
    /// executed.
    pub fn validate(&self, state: &impl StateDb) -> Result<(), TxError> {
        self.data.validate(state)
    }

    /// Re-validates the validated sender and fee payer against their current
    /// account keys, then checks the preconditions that can change between
    /// blocks.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn validate_mutable_value(
        &self,
        state: &impl StateDb,
        signer: &impl Signer,
        rules: &Rules,
    ) -> Result<(), TxError> {
        let sender = self.validated_sender().ok_or(TxError::NoSender)?;
        let account_key = key_or_legacy(state, &sender);

        if self.data.is_ethereum() {
            if !account_key.is_legacy() {
                return Err(TxError::InvalidSenderSignature);
            }
        } else {
            let role = self.data.role();
            let valid = signer
                .sender_public_keys(&self.data)
                .is_ok_and(|public_keys| {
                    validate_account_key(rules, &sender, &account_key, &public_keys, role).is_ok()
                });
            if !valid {
                return Err(TxError::InvalidSenderSignature);
            }
        }

        if self.tx_type().is_fee_delegated() {
            let fee_payer = self.validated_fee_payer().ok_or(TxError::NoSender)?;
            let account_key = key_or_legacy(state, &fee_payer);

            let valid = signer
                .fee_payer_public_keys(&self.data)
                .is_ok_and(|public_keys| {
                    validate_account_key(
                        rules,
                        &fee_payer,
                        &account_key,
                        &public_keys,
                        RoleType::FeePayer,
                    )
                    .is_ok()
                });
            if !valid {
                return Err(TxError::InvalidFeePayerSignature);
            }
        }

        self.data.validate_mutable_value(state)
    }

    /// Applies the transaction on behalf of the validated sender.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn execute<StateT: StateDb, VmT: Vm>(
        &self,
        vm: &mut VmT,
        state: &mut StateT,
        rules: &Rules,
        gas: u64,
        value: U256,
    ) -> Result<ExecutionOutput, ExecutionError<VmT::Error>> {
        let sender = self
            .validated_sender()
            .ok_or(ExecutionError::SenderNotValidated)?;

        self.data.execute(&sender, vm, state, rules, gas, value)
    }

    /// Returns the JSON representation, including the hash.
    pub fn to_json(&self) -> TransactionJson {
        let mut json = self.data.to_json();
        json.hash = Some(self.hash());
        json
    }
}

fn parse_raw_signature(bytes: &[u8]) -> Result<RecoverableSignature, TxError> {
    let signature = RecoverableSignature::try_from(bytes)?;
    if signature.recovery_id > 1 {
        return Err(TxError::InvalidRecoveryId(signature.recovery_id));
    }

    Ok(signature)
}

impl From<TxData> for Transaction {
    fn from(value: TxData) -> Self {
        Self::new(value)
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Transaction {}

impl alloy_rlp::Encodable for Transaction {
    fn encode(&self, out: &mut dyn BufMut) {
        self.data.encode_wire(out);
    }

    fn length(&self) -> usize {
        self.size()
    }
}

impl alloy_rlp::Decodable for Transaction {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let data = TxData::decode(buf)?;
        Self::with_valid_signatures(data).map_err(alloy_rlp::Error::from)
    }
}

impl serde::Serialize for Transaction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Transaction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let json = TransactionJson::deserialize(deserializer)?;
        let data = TxData::try_from(json).map_err(serde::de::Error::custom)?;

        Self::with_valid_signatures(data).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use klay_account_key::{AccountKey, WeightedMultiSig, WeightedPublicKey};
    use klay_chain_config::Hardfork;
    use klay_primitives::{TxKind, address};
    use klay_test_utils::secret_key::{
        SIGNING_VECTOR_SECRET_KEY, TYPED_SIGNER_SECRET_KEY, secret_key_from_str,
        secret_key_to_address,
    };

    use super::*;
    use crate::{
        Eip1559, Legacy, Typed, ValueTransfer,
        signer::latest_signer_for_chain_id,
        test_utils::{Account, InMemoryState, RecordingVm},
    };

    const THIRD_SECRET_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn secret_keys() -> anyhow::Result<Vec<SecretKey>> {
        [
            SIGNING_VECTOR_SECRET_KEY,
            TYPED_SIGNER_SECRET_KEY,
            THIRD_SECRET_KEY,
        ]
        .into_iter()
        .map(|secret_key| secret_key_from_str(secret_key).map_err(anyhow::Error::from))
        .collect()
    }

    fn value_transfer(from: Address) -> TxData {
        TxData::ValueTransfer(Typed::new(
            0,
            U256::from(25_000_000_000u64),
            50_000,
            ValueTransfer {
                to: address!("0x7b65b75d204abed71587c9e519a89277766ee1d0"),
                value: U256::from(1),
                from,
            },
        ))
    }

    #[test]
    fn effective_gas_price() {
        let legacy = Transaction::new(TxData::Legacy(Legacy {
            gas_price: U256::from(1_000),
            ..Legacy::default()
        }));
        let dynamic_fee = Transaction::new(TxData::EthereumDynamicFee(Eip1559 {
            max_priority_fee_per_gas: U256::from(1_000),
            max_fee_per_gas: U256::from(4_000),
            ..Eip1559::default()
        }));

        for base_fee in [U256::from(2_000), U256::ZERO] {
            assert_eq!(legacy.effective_gas_price(base_fee), U256::from(1_000));
            assert_eq!(legacy.effective_gas_tip(base_fee), U256::from(1_000));
            assert_eq!(dynamic_fee.effective_gas_tip(base_fee), U256::from(1_000));
        }

        assert_eq!(
            dynamic_fee.effective_gas_price(U256::from(2_000)),
            U256::from(3_000)
        );
        assert_eq!(
            dynamic_fee.effective_gas_price(U256::ZERO),
            U256::from(1_000)
        );
        // The tip is bounded by what remains of the fee cap
        assert_eq!(
            dynamic_fee.effective_gas_tip(U256::from(3_500)),
            U256::from(500)
        );
    }

    #[test]
    fn fee_and_cost() {
        let transaction = Transaction::new(TxData::Legacy(Legacy {
            gas_price: U256::from(25),
            gas_limit: 21_000,
            value: U256::from(7),
            ..Legacy::default()
        }));

        assert_eq!(transaction.fee(), U256::from(525_000));
        assert_eq!(transaction.cost(), U256::from(525_007));
    }

    #[test]
    fn signing_resets_memoized_hashes() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(SIGNING_VECTOR_SECRET_KEY)?;
        let signer = latest_signer_for_chain_id(U256::from(1));

        let mut transaction = Transaction::new(TxData::Legacy(Legacy {
            kind: address!("0x0000000000000000000000000000000000000000").into(),
            input: Bytes::from_static(&[0x01]),
            ..Legacy::default()
        }));
        let unsigned_hash = transaction.hash();
        let unsigned_size = transaction.size();

        transaction.sign(&signer, &secret_key)?;
        assert_ne!(transaction.hash(), unsigned_hash);
        assert_ne!(transaction.size(), unsigned_size);
        assert_eq!(transaction.size(), transaction.to_bytes().len());
        assert_eq!(transaction.sender_tx_hash(), None);
        assert_eq!(transaction.sender_tx_hash_all(), transaction.hash());

        assert_eq!(
            signer.sender(transaction.internal_data())?,
            secret_key_to_address(SIGNING_VECTOR_SECRET_KEY)?
        );

        Ok(())
    }

    #[test]
    fn raw_signatures() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(SIGNING_VECTOR_SECRET_KEY)?;
        let signer = latest_signer_for_chain_id(U256::from(1));

        let transaction = Transaction::new(TxData::Legacy(Legacy::default()));
        let hash = signer.hash(transaction.internal_data());
        let signature = RecoverableSignature::sign_prehash(&hash, &secret_key)?;

        let signed = transaction.with_signature(&signer, &signature.to_bytes())?;
        assert_eq!(
            signer.sender(signed.internal_data())?,
            secret_key_to_address(SIGNING_VECTOR_SECRET_KEY)?
        );
        // The original is left unsigned
        assert_eq!(transaction.raw_signature_values(), TxSignatures::default());

        let mut invalid_recovery_id = signature.to_bytes();
        invalid_recovery_id[64] = 2;
        assert!(matches!(
            transaction.with_signature(&signer, &invalid_recovery_id),
            Err(TxError::InvalidRecoveryId(2))
        ));
        assert!(matches!(
            transaction.with_signature(&signer, &[0u8; 64]),
            Err(TxError::Signature(_))
        ));
        assert!(matches!(
            transaction.with_fee_payer_signature(&signer, &signature.to_bytes()),
            Err(TxError::NotFeeDelegated)
        ));

        Ok(())
    }

    #[test]
    fn ethereum_transactions_do_not_name_their_sender() {
        let transaction = Transaction::new(TxData::Legacy(Legacy::default()));

        assert!(matches!(transaction.from(), Err(TxError::NoSender)));
        assert!(matches!(transaction.fee_payer(), Err(TxError::NoSender)));
        assert_eq!(transaction.fee_ratio(), None);
        assert!(matches!(
            transaction.anchored_data(),
            Err(TxError::InvalidTxTypeForAnchoredData)
        ));
    }

    #[test]
    fn multi_sig_sender() -> anyhow::Result<()> {
        let secret_keys = secret_keys()?;
        let from = address!("0x000000000000000000000000000000000000abcd");
        let signer = latest_signer_for_chain_id(U256::from(1001));
        let rules = Rules::new(0, Hardfork::Istanbul);

        let mut state = InMemoryState::default();
        state.insert(
            from,
            Account::eoa(AccountKey::WeightedMultiSig(WeightedMultiSig {
                threshold: 3,
                keys: secret_keys
                    .iter()
                    .map(|secret_key| WeightedPublicKey {
                        weight: 1,
                        key: secret_key.public_key(),
                    })
                    .collect(),
            })),
        );

        let mut transaction = Transaction::new(value_transfer(from));
        transaction.sign_with_keys(&signer, &secret_keys)?;
        assert_eq!(transaction.raw_signature_values().as_slice().len(), 3);

        // Recovered in signature order
        let recovered = signer.sender_public_keys(transaction.internal_data())?;
        let expected: Vec<_> = secret_keys.iter().map(SecretKey::public_key).collect();
        assert_eq!(recovered, expected);

        assert_eq!(
            transaction.validate_sender(&signer, &state, &rules)?,
            ValidatedSender {
                address: from,
                validation_gas: 30_000,
            }
        );
        assert_eq!(transaction.validated_sender(), Some(from));
        assert_eq!(transaction.validated_fee_payer(), Some(from));
        transaction.validate_mutable_value(&state, &signer, &rules)?;

        let reordered_keys = [
            secret_keys[2].clone(),
            secret_keys[0].clone(),
            secret_keys[1].clone(),
        ];
        let mut reordered = Transaction::new(value_transfer(from));
        reordered.sign_with_keys(&signer, &reordered_keys)?;
        assert_ne!(reordered.hash(), transaction.hash());
        reordered.validate_sender(&signer, &state, &rules)?;

        // Two of three signatures do not meet the threshold
        let mut partial = Transaction::new(value_transfer(from));
        partial.sign_with_keys(&signer, &secret_keys[..2])?;
        assert!(matches!(
            partial.validate_sender(&signer, &state, &rules),
            Err(TxError::InvalidSenderSignature)
        ));
        assert_eq!(partial.validated_sender(), None);

        Ok(())
    }

    #[test]
    fn fee_delegated_validation() -> anyhow::Result<()> {
        let secret_keys = secret_keys()?;
        let from = secret_key_to_address(SIGNING_VECTOR_SECRET_KEY)?;
        let fee_payer = secret_key_to_address(TYPED_SIGNER_SECRET_KEY)?;
        let signer = latest_signer_for_chain_id(U256::from(1001));
        let rules = Rules::new(0, Hardfork::Istanbul);

        let fields = ValueTransfer {
            to: address!("0x7b65b75d204abed71587c9e519a89277766ee1d0"),
            value: U256::from(1),
            from,
        };
        let mut transaction = Transaction::new(TxData::ValueTransfer(Typed::fee_delegated(
            0,
            U256::from(25_000_000_000u64),
            50_000,
            fields,
            fee_payer,
            Some(FeeRatio::try_from(30)?),
        )?));
        transaction.sign(&signer, &secret_keys[0])?;
        transaction.sign_fee_payer(&signer, &secret_keys[1])?;

        let mut state = InMemoryState::default();
        transaction.validate_sender(&signer, &state, &rules)?;
        assert_eq!(transaction.validated_fee_payer(), Some(from));

        let validated = transaction.validate_fee_payer(&signer, &state, &rules)?;
        assert_eq!(validated.address, fee_payer);
        assert_eq!(transaction.validated_fee_payer(), Some(fee_payer));
        assert_eq!(transaction.fee_payer()?, fee_payer);
        transaction.validate_mutable_value(&state, &signer, &rules)?;

        // The fee payer's key changed after validation
        state.insert(
            fee_payer,
            Account::eoa(AccountKey::Public(secret_keys[2].public_key())),
        );
        assert!(matches!(
            transaction.validate_mutable_value(&state, &signer, &rules),
            Err(TxError::InvalidFeePayerSignature)
        ));

        transaction.sign_fee_payer(&signer, &secret_keys[2])?;
        assert_eq!(transaction.validated_sender(), None);
        assert!(matches!(
            transaction.validate_fee_payer(&signer, &InMemoryState::default(), &rules),
            Err(TxError::InvalidFeePayerSignature)
        ));
        assert!(matches!(
            Transaction::new(value_transfer(from)).validate_fee_payer(&signer, &state, &rules),
            Err(TxError::NotFeeDelegated)
        ));

        Ok(())
    }

    #[test]
    fn ethereum_senders_need_legacy_keys() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(SIGNING_VECTOR_SECRET_KEY)?;
        let sender = secret_key_to_address(SIGNING_VECTOR_SECRET_KEY)?;
        let signer = latest_signer_for_chain_id(U256::from(1001));
        let rules = Rules::new(0, Hardfork::Istanbul);

        let mut transaction = Transaction::new(TxData::Legacy(Legacy {
            kind: TxKind::Call(address!("0x7b65b75d204abed71587c9e519a89277766ee1d0")),
            gas_limit: 21_000,
            ..Legacy::default()
        }));
        transaction.sign(&signer, &secret_key)?;

        let mut state = InMemoryState::default();
        assert_eq!(
            transaction.validate_sender(&signer, &state, &rules)?,
            ValidatedSender {
                address: sender,
                validation_gas: 0,
            }
        );
        transaction.validate_mutable_value(&state, &signer, &rules)?;

        state.insert(
            sender,
            Account::eoa(AccountKey::Public(secret_key.public_key())),
        );
        assert!(matches!(
            transaction.validate_mutable_value(&state, &signer, &rules),
            Err(TxError::InvalidSenderSignature)
        ));
        assert!(matches!(
            transaction.validate_sender(&signer, &state, &rules),
            Err(TxError::LegacyTransactionMustBeWithLegacyKey)
        ));

        Ok(())
    }

    #[test]
    fn execution_requires_a_validated_sender() -> anyhow::Result<()> {
        let secret_key = secret_key_from_str(SIGNING_VECTOR_SECRET_KEY)?;
        let from = secret_key_to_address(SIGNING_VECTOR_SECRET_KEY)?;
        let signer = latest_signer_for_chain_id(U256::from(1001));
        let rules = Rules::new(0, Hardfork::Istanbul);

        let mut state = InMemoryState::default();
        let mut vm = RecordingVm::default();

        let mut transaction = Transaction::new(value_transfer(from));
        assert!(matches!(
            transaction.execute(&mut vm, &mut state, &rules, 29_000, U256::from(1)),
            Err(ExecutionError::SenderNotValidated)
        ));
        assert!(matches!(
            transaction.validate_mutable_value(&state, &signer, &rules),
            Err(TxError::NoSender)
        ));

        transaction.sign(&signer, &secret_key)?;
        transaction.validate_sender(&signer, &state, &rules)?;
        transaction.execute(&mut vm, &mut state, &rules, 29_000, U256::from(1))?;

        assert_eq!(state.nonce(&from), 1);
        assert_eq!(vm.calls.len(), 1);

        Ok(())
    }
}
