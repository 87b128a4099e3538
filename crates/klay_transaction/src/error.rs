use klay_account_key::AccountKeyError;
use klay_defaults::MAX_NUM_KEYS_FOR_MULTI_SIG;
use klay_signer::SignatureError;

use crate::TxValueKey;

/// Errors raised while constructing, decoding, signing or validating
/// transactions.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    /// The type tag is not defined, or the type cannot be constructed.
    #[error("undefined tx type")]
    UndefinedTxType,
    /// A value map holds keys the transaction type does not use.
    #[error("undefined key remains")]
    UndefinedKey,
    /// A value is missing from a value map or holds the wrong kind.
    #[error("{key:?} must be a type of {expected}")]
    ValueKindMismatch {
        /// The offending key
        key: TxValueKey,
        /// Name of the expected kind
        expected: &'static str,
    },
    /// A fee ratio outside of `[1, 99]`.
    #[error("fee ratio is out of range [1, 99]: {0}")]
    FeeRatioOutOfRange(u8),
    /// A signature set without any signatures.
    #[error("empty signature set")]
    EmptySignatureSet,
    /// A signature set with more signatures than keys a multi-sig key may
    /// hold.
    #[error("the number of signatures exceeds the limit ({MAX_NUM_KEYS_FOR_MULTI_SIG}): {0}")]
    TooManySignatures(usize),
    /// More than one signature for a transaction type that holds a single
    /// signature.
    #[error("the transaction type only supports a single signature")]
    MultipleSignaturesNotSupported,
    /// Signature values are out of range, or recovery failed.
    #[error("invalid transaction v, r, s values")]
    InvalidSignature,
    /// The chain id of the transaction does not match the signer's.
    #[error("invalid chain id for signer")]
    InvalidChainId,
    /// The signer cannot handle the transaction type.
    #[error("transaction type not supported")]
    TxTypeNotSupported,
    /// A recovery id other than 0 or 1 in a raw signature.
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),
    /// The anchored payload was requested from a transaction that does not
    /// anchor data.
    #[error("invalid tx type for anchored data")]
    InvalidTxTypeForAnchoredData,
    /// The sender was requested from a transaction that does not name it.
    /// Ethereum transactions only reveal their sender through signature
    /// recovery.
    #[error("the transaction does not name its sender")]
    NoSender,
    /// An account key that cannot be parsed.
    #[error("unserializable key")]
    UnserializableKey,
    /// A fee payer operation on a transaction that is not fee-delegated.
    #[error("not a fee delegated transaction")]
    NotFeeDelegated,
    /// The sender's signatures do not satisfy the sender's account key.
    #[error("invalid sender signature")]
    InvalidSenderSignature,
    /// The fee payer's signatures do not satisfy the fee payer's account key.
    #[error("invalid fee payer signature")]
    InvalidFeePayerSignature,
    /// An Ethereum transaction sent from an account with a non-legacy key.
    #[error("a legacy transaction must be with a legacy account key")]
    LegacyTransactionMustBeWithLegacyKey,
    /// A transaction sent to a precompiled contract.
    #[error("the recipient cannot be a precompiled contract address")]
    PrecompiledContractRecipient,
    /// A value transfer sent to a program account.
    #[error("not allowed for a program account (e.g., a smart contract account)")]
    NotForProgramAccount,
    /// A contract call sent to an account without callable code.
    #[error("not a program account (e.g., an account having code and storage)")]
    NotProgramAccount,
    /// A contract deployment whose address is malformed or reserved.
    #[error("invalid contract address")]
    InvalidContractAddress,
    /// Human-readable addresses are inactive.
    #[error("human-readable address is not supported now")]
    HumanReadableNotSupported,
    /// A code format other than EVM.
    #[error("smart contract code format is invalid")]
    InvalidCodeFormat,
    /// A contract deployment to an account that already exists.
    #[error("account already exists")]
    AccountAlreadyExists,
    /// Intrinsic gas overflows a `u64`.
    #[error("out of gas")]
    OutOfGas,
    /// Malformed RLP.
    #[error(transparent)]
    Encoding(#[from] alloy_rlp::Error),
    /// Malformed JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// An account key error.
    #[error(transparent)]
    AccountKey(#[from] AccountKeyError),
    /// A signing or recovery error.
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl From<TxError> for alloy_rlp::Error {
    fn from(value: TxError) -> Self {
        match value {
            TxError::Encoding(error) => error,
            TxError::UndefinedTxType => alloy_rlp::Error::Custom("undefined tx type"),
            TxError::InvalidSignature => alloy_rlp::Error::Custom("Invalid Signature"),
            TxError::FeeRatioOutOfRange(_) => alloy_rlp::Error::Custom("fee ratio out of range"),
            TxError::UnserializableKey => alloy_rlp::Error::Custom("unserializable key"),
            _ => alloy_rlp::Error::Custom("invalid transaction"),
        }
    }
}
