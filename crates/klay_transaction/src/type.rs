use core::fmt;

use crate::TxError;

/// Leading byte of Ethereum typed transaction envelopes.
pub const ETHEREUM_TX_TYPE_ENVELOPE: u8 = 0x78;

const SUB_TYPE_BITS: u16 = 3;
const FEE_DELEGATED_MASK: u16 = 0b11;
const WITH_RATIO_MASK: u16 = 0b10;
const ETHEREUM_TYPED_MASK: u16 = 0xff00;
const ETHEREUM_TYPED_PREFIX: u16 = (ETHEREUM_TX_TYPE_ENVELOPE as u16) << 8;

/// The type tag of a transaction.
///
/// Klaytn-typed tags are composed as `base << 3 | sub`, where the sub-type
/// is `0` for a basic transaction, `1` for a fee-delegated transaction and
/// `2` for a fee-delegated transaction with a fee ratio. Ethereum typed tags
/// are `0x78 << 8 | ethereum_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum TxType {
    /// Pre-typed Ethereum transaction
    Legacy = 0x00,
    /// Klay transfer
    ValueTransfer = 0x08,
    /// Fee-delegated klay transfer
    FeeDelegatedValueTransfer = 0x09,
    /// Fee-delegated klay transfer with a fee ratio
    FeeDelegatedValueTransferWithRatio = 0x0a,
    /// Klay transfer with a memo
    ValueTransferMemo = 0x10,
    /// Fee-delegated klay transfer with a memo
    FeeDelegatedValueTransferMemo = 0x11,
    /// Fee-delegated klay transfer with a memo and a fee ratio
    FeeDelegatedValueTransferMemoWithRatio = 0x12,
    /// Account creation. Only constructible in tests.
    AccountCreation = 0x18,
    /// Account key update
    AccountUpdate = 0x20,
    /// Fee-delegated account key update
    FeeDelegatedAccountUpdate = 0x21,
    /// Fee-delegated account key update with a fee ratio
    FeeDelegatedAccountUpdateWithRatio = 0x22,
    /// Smart contract deployment
    SmartContractDeploy = 0x28,
    /// Fee-delegated smart contract deployment
    FeeDelegatedSmartContractDeploy = 0x29,
    /// Fee-delegated smart contract deployment with a fee ratio
    FeeDelegatedSmartContractDeployWithRatio = 0x2a,
    /// Smart contract call
    SmartContractExecution = 0x30,
    /// Fee-delegated smart contract call
    FeeDelegatedSmartContractExecution = 0x31,
    /// Fee-delegated smart contract call with a fee ratio
    FeeDelegatedSmartContractExecutionWithRatio = 0x32,
    /// Nonce consumption without any other effect
    Cancel = 0x38,
    /// Fee-delegated cancel
    FeeDelegatedCancel = 0x39,
    /// Fee-delegated cancel with a fee ratio
    FeeDelegatedCancelWithRatio = 0x3a,
    /// Child chain data anchoring
    ChainDataAnchoring = 0x48,
    /// Fee-delegated child chain data anchoring
    FeeDelegatedChainDataAnchoring = 0x49,
    /// Fee-delegated child chain data anchoring with a fee ratio
    FeeDelegatedChainDataAnchoringWithRatio = 0x4a,
    /// EIP-2930 transaction
    EthereumAccessList = 0x7801,
    /// EIP-1559 transaction
    EthereumDynamicFee = 0x7802,
}

impl TxType {
    /// Every defined type, in ascending tag order.
    pub const ALL: [TxType; 25] = [
        TxType::Legacy,
        TxType::ValueTransfer,
        TxType::FeeDelegatedValueTransfer,
        TxType::FeeDelegatedValueTransferWithRatio,
        TxType::ValueTransferMemo,
        TxType::FeeDelegatedValueTransferMemo,
        TxType::FeeDelegatedValueTransferMemoWithRatio,
        TxType::AccountCreation,
        TxType::AccountUpdate,
        TxType::FeeDelegatedAccountUpdate,
        TxType::FeeDelegatedAccountUpdateWithRatio,
        TxType::SmartContractDeploy,
        TxType::FeeDelegatedSmartContractDeploy,
        TxType::FeeDelegatedSmartContractDeployWithRatio,
        TxType::SmartContractExecution,
        TxType::FeeDelegatedSmartContractExecution,
        TxType::FeeDelegatedSmartContractExecutionWithRatio,
        TxType::Cancel,
        TxType::FeeDelegatedCancel,
        TxType::FeeDelegatedCancelWithRatio,
        TxType::ChainDataAnchoring,
        TxType::FeeDelegatedChainDataAnchoring,
        TxType::FeeDelegatedChainDataAnchoringWithRatio,
        TxType::EthereumAccessList,
        TxType::EthereumDynamicFee,
    ];

    /// Returns the canonical name of the type.
    pub fn name(self) -> &'static str {
        match self {
            TxType::Legacy => "TxTypeLegacyTransaction",
            TxType::ValueTransfer => "TxTypeValueTransfer",
            TxType::FeeDelegatedValueTransfer => "TxTypeFeeDelegatedValueTransfer",
            TxType::FeeDelegatedValueTransferWithRatio => {
                "TxTypeFeeDelegatedValueTransferWithRatio"
            }
            TxType::ValueTransferMemo => "TxTypeValueTransferMemo",
            TxType::FeeDelegatedValueTransferMemo => "TxTypeFeeDelegatedValueTransferMemo",
            TxType::FeeDelegatedValueTransferMemoWithRatio => {
                "TxTypeFeeDelegatedValueTransferMemoWithRatio"
            }
            TxType::AccountCreation => "TxTypeAccountCreation",
            TxType::AccountUpdate => "TxTypeAccountUpdate",
            TxType::FeeDelegatedAccountUpdate => "TxTypeFeeDelegatedAccountUpdate",
            TxType::FeeDelegatedAccountUpdateWithRatio => {
                "TxTypeFeeDelegatedAccountUpdateWithRatio"
            }
            TxType::SmartContractDeploy => "TxTypeSmartContractDeploy",
            TxType::FeeDelegatedSmartContractDeploy => "TxTypeFeeDelegatedSmartContractDeploy",
            TxType::FeeDelegatedSmartContractDeployWithRatio => {
                "TxTypeFeeDelegatedSmartContractDeployWithRatio"
            }
            TxType::SmartContractExecution => "TxTypeSmartContractExecution",
            TxType::FeeDelegatedSmartContractExecution => {
                "TxTypeFeeDelegatedSmartContractExecution"
            }
            TxType::FeeDelegatedSmartContractExecutionWithRatio => {
                "TxTypeFeeDelegatedSmartContractExecutionWithRatio"
            }
            TxType::Cancel => "TxTypeCancel",
            TxType::FeeDelegatedCancel => "TxTypeFeeDelegatedCancel",
            TxType::FeeDelegatedCancelWithRatio => "TxTypeFeeDelegatedCancelWithRatio",
            TxType::ChainDataAnchoring => "TxTypeChainDataAnchoring",
            TxType::FeeDelegatedChainDataAnchoring => "TxTypeFeeDelegatedChainDataAnchoring",
            TxType::FeeDelegatedChainDataAnchoringWithRatio => {
                "TxTypeFeeDelegatedChainDataAnchoringWithRatio"
            }
            TxType::EthereumAccessList => "TxTypeEthereumAccessList",
            TxType::EthereumDynamicFee => "TxTypeEthereumDynamicFee",
        }
    }

    /// Whether the type is a legacy or Ethereum typed transaction.
    pub fn is_ethereum(self) -> bool {
        self == TxType::Legacy || self.is_ethereum_typed()
    }

    /// Whether the type uses the `0x78 || ethereum_type` envelope.
    pub fn is_ethereum_typed(self) -> bool {
        u16::from(self) & ETHEREUM_TYPED_MASK == ETHEREUM_TYPED_PREFIX
    }

    /// Whether a fee payer signs the transaction.
    pub fn is_fee_delegated(self) -> bool {
        !self.is_ethereum() && u16::from(self) & FEE_DELEGATED_MASK != 0
    }

    /// Whether the fee payer only pays a share of the fee.
    pub fn is_fee_delegated_with_ratio(self) -> bool {
        !self.is_ethereum() && u16::from(self) & WITH_RATIO_MASK != 0
    }

    /// Whether the type anchors child chain data, regardless of fee
    /// delegation.
    pub fn is_chain_data_anchoring(self) -> bool {
        u16::from(self) & !((1 << SUB_TYPE_BITS) - 1) == u16::from(TxType::ChainDataAnchoring)
    }

    /// Whether the recipient of the type may be absent, as for contract
    /// creations.
    pub(crate) fn has_nullable_recipient(self) -> bool {
        matches!(
            self,
            TxType::Legacy
                | TxType::SmartContractDeploy
                | TxType::FeeDelegatedSmartContractDeploy
                | TxType::FeeDelegatedSmartContractDeployWithRatio
                | TxType::EthereumAccessList
                | TxType::EthereumDynamicFee
        )
    }

    /// Returns the single-byte Ethereum type, if the type is Ethereum typed.
    pub fn ethereum_type(self) -> Option<u8> {
        self.is_ethereum_typed().then(|| u16::from(self).to_be_bytes()[1])
    }
}

impl From<TxType> for u16 {
    fn from(value: TxType) -> Self {
        value as u16
    }
}

impl TryFrom<u16> for TxType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Legacy),
            0x08 => Ok(Self::ValueTransfer),
            0x09 => Ok(Self::FeeDelegatedValueTransfer),
            0x0a => Ok(Self::FeeDelegatedValueTransferWithRatio),
            0x10 => Ok(Self::ValueTransferMemo),
            0x11 => Ok(Self::FeeDelegatedValueTransferMemo),
            0x12 => Ok(Self::FeeDelegatedValueTransferMemoWithRatio),
            0x18 => Ok(Self::AccountCreation),
            0x20 => Ok(Self::AccountUpdate),
            0x21 => Ok(Self::FeeDelegatedAccountUpdate),
            0x22 => Ok(Self::FeeDelegatedAccountUpdateWithRatio),
            0x28 => Ok(Self::SmartContractDeploy),
            0x29 => Ok(Self::FeeDelegatedSmartContractDeploy),
            0x2a => Ok(Self::FeeDelegatedSmartContractDeployWithRatio),
            0x30 => Ok(Self::SmartContractExecution),
            0x31 => Ok(Self::FeeDelegatedSmartContractExecution),
            0x32 => Ok(Self::FeeDelegatedSmartContractExecutionWithRatio),
            0x38 => Ok(Self::Cancel),
            0x39 => Ok(Self::FeeDelegatedCancel),
            0x3a => Ok(Self::FeeDelegatedCancelWithRatio),
            0x48 => Ok(Self::ChainDataAnchoring),
            0x49 => Ok(Self::FeeDelegatedChainDataAnchoring),
            0x4a => Ok(Self::FeeDelegatedChainDataAnchoringWithRatio),
            0x7801 => Ok(Self::EthereumAccessList),
            0x7802 => Ok(Self::EthereumDynamicFee),
            value => Err(value),
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the canonical name of a raw type tag, or `"UndefinedTxType"` if
/// the tag is not defined.
pub fn tx_type_name(tag: u16) -> &'static str {
    TxType::try_from(tag).map_or("UndefinedTxType", TxType::name)
}

impl serde::Serialize for TxType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u16(u16::from(*self))
    }
}

impl<'de> serde::Deserialize<'de> for TxType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = u16::deserialize(deserializer)?;
        TxType::try_from(tag).map_err(|tag| {
            serde::de::Error::custom(format!("{}: {tag:#x}", TxError::UndefinedTxType))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for tx_type in TxType::ALL {
            assert_eq!(TxType::try_from(u16::from(tx_type)), Ok(tx_type));
        }

        assert_eq!(TxType::try_from(0x40), Err(0x40));
        assert_eq!(TxType::try_from(0x7803), Err(0x7803));
        assert_eq!(tx_type_name(0x40), "UndefinedTxType");
        assert_eq!(tx_type_name(0x0a), "TxTypeFeeDelegatedValueTransferWithRatio");
    }

    #[test]
    fn family_predicates() {
        for tx_type in TxType::ALL {
            let tag = u16::from(tx_type);

            assert_eq!(tx_type.is_ethereum_typed(), tag >= 0x7800, "{tx_type}");
            assert_eq!(
                tx_type.is_ethereum(),
                tag == 0 || tag >= 0x7800,
                "{tx_type}"
            );
            assert_eq!(
                tx_type.is_fee_delegated(),
                !tx_type.is_ethereum() && tag & 0b11 != 0,
                "{tx_type}"
            );
            assert_eq!(
                tx_type.is_fee_delegated_with_ratio(),
                !tx_type.is_ethereum() && tag & 0b11 == 0b10,
                "{tx_type}"
            );
        }

        assert!(TxType::ChainDataAnchoring.is_chain_data_anchoring());
        assert!(TxType::FeeDelegatedChainDataAnchoring.is_chain_data_anchoring());
        assert!(TxType::FeeDelegatedChainDataAnchoringWithRatio.is_chain_data_anchoring());
        assert!(!TxType::Cancel.is_chain_data_anchoring());
        assert!(!TxType::FeeDelegatedCancelWithRatio.is_chain_data_anchoring());

        assert_eq!(TxType::EthereumAccessList.ethereum_type(), Some(1));
        assert_eq!(TxType::EthereumDynamicFee.ethereum_type(), Some(2));
        assert_eq!(TxType::Legacy.ethereum_type(), None);
    }
}
