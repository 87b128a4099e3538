use klay_account_key::AccountKey;
use klay_primitives::{Address, B256, Bytes, TxKind, U256};

use crate::{
    AccessList, CodeFormat, TransactionVariant as _, TxData, TxError, TxSignatures, TxType,
    TxValue, TxValueKey, TxValueMap,
};

/// The JSON representation shared by all transaction variants. Fields a
/// variant does not carry are absent.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionJson {
    /// Type tag. Absent for legacy transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_int: Option<TxType>,
    /// Name of the type. Absent for legacy transactions.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Chain id of Ethereum typed transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U256>,
    /// Sender's nonce
    #[serde(with = "alloy_serde::quantity")]
    pub nonce: u64,
    /// Gas price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    /// Maximum priority fee per gas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    /// Maximum fee per gas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    /// Gas limit
    #[serde(rename = "gas", with = "alloy_serde::quantity")]
    pub gas_limit: u64,
    /// Recipient. Contract creations serialize as `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<TxKind>,
    /// Transferred amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// Sender of Klaytn-typed transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Payload, or the anchored data of anchoring transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Bytes>,
    /// Whether the address is human-readable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_readable: Option<bool>,
    /// Fee payer's share of the fee, in percent
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub fee_ratio: Option<u8>,
    /// Format of deployed code
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub code_format: Option<u8>,
    /// Serialized account key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Bytes>,
    /// Access list of Ethereum typed transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<AccessList>,
    /// Sender's signatures
    pub signatures: TxSignatures,
    /// Fee payer of fee-delegated transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payer: Option<Address>,
    /// Fee payer's signatures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payer_signatures: Option<TxSignatures>,
    /// Transaction hash. Ignored when deserializing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<B256>,
}

impl TransactionJson {
    /// Constructs the representation of a transaction of the provided type,
    /// without any variant-specific fields.
    pub fn new(tx_type: TxType, nonce: u64, gas_limit: u64) -> Self {
        let (type_int, type_name) = if tx_type == TxType::Legacy {
            (None, None)
        } else {
            (Some(tx_type), Some(tx_type.name().to_string()))
        };

        Self {
            type_int,
            type_name,
            chain_id: None,
            nonce,
            gas_price: None,
            max_priority_fee_per_gas: None,
            max_fee_per_gas: None,
            gas_limit,
            to: None,
            value: None,
            from: None,
            input: None,
            human_readable: None,
            fee_ratio: None,
            code_format: None,
            key: None,
            access_list: None,
            signatures: TxSignatures::default(),
            fee_payer: None,
            fee_payer_signatures: None,
            hash: None,
        }
    }

    /// Returns the type, treating an absent tag as legacy.
    pub fn tx_type(&self) -> TxType {
        self.type_int.unwrap_or(TxType::Legacy)
    }

    fn into_values(self, tx_type: TxType) -> Result<TxValueMap, TxError> {
        let mut values = TxValueMap::from([
            (TxValueKey::Nonce, TxValue::Uint64(self.nonce)),
            (TxValueKey::GasLimit, TxValue::Uint64(self.gas_limit)),
        ]);

        let mut insert = |key, value: Option<TxValue>| {
            if let Some(value) = value {
                values.insert(key, value);
            }
        };

        insert(TxValueKey::ChainId, self.chain_id.map(TxValue::BigInt));
        insert(TxValueKey::GasPrice, self.gas_price.map(TxValue::BigInt));
        insert(
            TxValueKey::GasTipCap,
            self.max_priority_fee_per_gas.map(TxValue::BigInt),
        );
        insert(
            TxValueKey::GasFeeCap,
            self.max_fee_per_gas.map(TxValue::BigInt),
        );

        let to = if tx_type.has_nullable_recipient() {
            Some(TxValue::AddressPointer(self.to.unwrap_or(TxKind::Create)))
        } else {
            self.to
                .and_then(|kind| kind.to().copied())
                .map(TxValue::Address)
        };
        insert(TxValueKey::To, to);

        insert(TxValueKey::Amount, self.value.map(TxValue::BigInt));
        insert(TxValueKey::From, self.from.map(TxValue::Address));

        let input_key = if tx_type.is_chain_data_anchoring() {
            TxValueKey::AnchoredData
        } else {
            TxValueKey::Data
        };
        insert(input_key, self.input.map(TxValue::Bytes));

        insert(
            TxValueKey::HumanReadable,
            self.human_readable.map(TxValue::Bool),
        );
        insert(
            TxValueKey::FeeRatioOfFeePayer,
            self.fee_ratio.map(TxValue::FeeRatio),
        );
        insert(
            TxValueKey::CodeFormat,
            self.code_format
                .map(|code_format| TxValue::CodeFormat(CodeFormat::from(code_format))),
        );

        let key = self
            .key
            .map(|key| {
                AccountKey::from_serialized_bytes(&key).map_err(|error| {
                    log::warn!("Failed to deserialize the account key of a transaction: {error}");
                    TxError::UnserializableKey
                })
            })
            .transpose()?;
        insert(TxValueKey::AccountKey, key.map(TxValue::AccountKey));

        insert(
            TxValueKey::AccessList,
            self.access_list.map(TxValue::AccessList),
        );
        insert(TxValueKey::FeePayer, self.fee_payer.map(TxValue::Address));

        Ok(values)
    }
}

impl TryFrom<TransactionJson> for TxData {
    type Error = TxError;

    fn try_from(value: TransactionJson) -> Result<Self, Self::Error> {
        let tx_type = value.tx_type();
        let signatures = value.signatures.clone();
        let fee_payer_signatures = value.fee_payer_signatures.clone();

        let values = value.into_values(tx_type)?;
        let mut data = match tx_type {
            #[cfg(any(test, feature = "test-utils"))]
            TxType::AccountCreation => TxData::new_account_creation_with_map(values)?,
            tx_type => TxData::new_with_map(tx_type, values)?,
        };

        data.set_signatures(signatures)?;
        if let Some(fee_payer_signatures) = fee_payer_signatures {
            data.set_fee_payer_signatures(fee_payer_signatures)?;
        }

        Ok(data)
    }
}

impl From<&TxData> for TransactionJson {
    fn from(value: &TxData) -> Self {
        value.to_json()
    }
}

#[cfg(test)]
mod tests {
    use klay_primitives::address;

    use super::*;

    #[test]
    fn legacy_omits_type() -> anyhow::Result<()> {
        let json = serde_json::to_value(TransactionJson::new(TxType::Legacy, 1, 21_000))?;

        assert_eq!(json.get("typeInt"), None);
        assert_eq!(json.get("type"), None);
        assert_eq!(json["nonce"], "0x1");
        assert_eq!(json["gas"], "0x5208");

        Ok(())
    }

    #[test]
    fn contract_creation_is_null() -> anyhow::Result<()> {
        let mut json = TransactionJson::new(TxType::SmartContractDeploy, 0, 0);
        json.to = Some(TxKind::Create);
        json.fee_ratio = Some(30);

        let value = serde_json::to_value(&json)?;
        assert_eq!(value["typeInt"], 40);
        assert_eq!(value["type"], "TxTypeSmartContractDeploy");
        assert_eq!(value["to"], serde_json::Value::Null);
        assert_eq!(value["feeRatio"], "0x1e");

        let decoded: TransactionJson = serde_json::from_value(value)?;
        assert_eq!(decoded.to, None);
        assert_eq!(decoded.fee_ratio, Some(30));

        Ok(())
    }

    #[test]
    fn unsupported_fields_are_rejected() {
        let mut json = TransactionJson::new(TxType::Cancel, 0, 0);
        json.gas_price = Some(U256::from(1));
        json.from = Some(address!("0x0000000000000000000000000000000000000123"));
        json.value = Some(U256::from(1));

        assert!(matches!(
            TxData::try_from(json),
            Err(TxError::UndefinedKey)
        ));
    }

    #[test]
    fn unserializable_key() {
        let mut json = TransactionJson::new(TxType::AccountUpdate, 0, 0);
        json.gas_price = Some(U256::from(1));
        json.from = Some(address!("0x0000000000000000000000000000000000000123"));
        json.key = Some(Bytes::from_static(&[0x07, 0xc0]));

        assert!(matches!(
            TxData::try_from(json),
            Err(TxError::UnserializableKey)
        ));
    }
}
