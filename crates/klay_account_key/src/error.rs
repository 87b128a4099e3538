use klay_defaults::MAX_NUM_KEYS_FOR_MULTI_SIG;

/// Errors raised when installing, updating or validating account keys.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AccountKeyError {
    /// A composite key without any entries.
    #[error("zero length")]
    ZeroLength,
    /// A role-based key with more roles than are defined.
    #[error("length too long")]
    LengthTooLong,
    /// A role-based key containing another composite key.
    #[error("nested composite type")]
    NestedCompositeType,
    /// A multi-sig key with too many keys.
    #[error("the number of keys exceeds the limit ({MAX_NUM_KEYS_FOR_MULTI_SIG})")]
    MaxKeysExceeded,
    /// A multi-sig entry with a weight of zero.
    #[error("zero key weight")]
    ZeroKeyWeight,
    /// A multi-sig key containing the same public key twice.
    #[error("duplicated key")]
    DuplicatedKey,
    /// The weights of a multi-sig key overflow when summed.
    #[error("weighted sum overflow")]
    WeightedSumOverflow,
    /// The weights of a multi-sig key can never reach its threshold.
    #[error("unsatisfiable threshold")]
    UnsatisfiableThreshold,
    /// An update to a key of a different kind.
    #[error("different account key type")]
    DifferentAccountKeyType,
    /// A nil key cannot be installed.
    #[error("AccountKeyNil cannot be initialized to an account")]
    AccountKeyNilUninitializable,
    /// A fail key cannot be updated.
    #[error("AccountKeyFail is not updatable")]
    AccountKeyFailNotUpdatable,
    /// The gas charged for the key overflows.
    #[error("gas uint64 overflow")]
    GasOverflow,
    /// The recovered public keys do not satisfy the account key.
    #[error("invalid signature")]
    InvalidSignature,
}
