//! Protocol constants for transaction gas accounting and account keys.

/// Per transaction not creating a contract.
pub const TX_GAS: u64 = 21_000;
/// Per transaction that creates a contract.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;
/// Per zero byte of payload, before Istanbul.
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Per non-zero byte of payload, before Istanbul.
pub const TX_DATA_NON_ZERO_GAS: u64 = 68;
/// Per byte of payload, from Istanbul onwards and for all Klaytn-typed
/// transactions.
pub const TX_DATA_GAS: u64 = 100;

/// Per address in an EIP-2930 access list.
pub const TX_ACCESS_LIST_ADDRESS_GAS: u64 = 2_400;
/// Per storage key in an EIP-2930 access list.
pub const TX_ACCESS_LIST_STORAGE_KEY_GAS: u64 = 1_900;

/// Base fee of a value transfer.
pub const TX_GAS_VALUE_TRANSFER: u64 = 21_000;
/// Base fee of a smart contract execution.
pub const TX_GAS_CONTRACT_EXECUTION: u64 = 21_000;
/// Base fee of an account creation.
pub const TX_GAS_ACCOUNT_CREATION: u64 = 21_000;
/// Base fee of an account update.
pub const TX_GAS_ACCOUNT_UPDATE: u64 = 21_000;
/// Base fee of a cancel transaction.
pub const TX_GAS_CANCEL: u64 = 21_000;
/// Base fee of a chain data anchoring transaction.
pub const TX_CHAIN_DATA_ANCHORING_GAS: u64 = 21_000;
/// Surcharge for fee-delegated transactions.
pub const TX_GAS_FEE_DELEGATED: u64 = 10_000;
/// Surcharge for fee-delegated transactions with a fee ratio.
pub const TX_GAS_FEE_DELEGATED_WITH_RATIO: u64 = 15_000;
/// Surcharge for human-readable addresses. The feature is inactive.
pub const TX_GAS_HUMAN_READABLE: u64 = 4_000_000_000;

/// Account creation gas charged for keys without public keys.
pub const TX_ACCOUNT_CREATION_GAS_DEFAULT: u64 = 0;
/// Signature validation gas charged for keys without public keys.
pub const TX_VALIDATION_GAS_DEFAULT: u64 = 0;
/// Account creation gas per public key.
pub const TX_ACCOUNT_CREATION_GAS_PER_KEY: u64 = 20_000;
/// Signature validation gas per additional public key.
pub const TX_VALIDATION_GAS_PER_KEY: u64 = 15_000;

/// Maximum number of keys in a weighted multi-sig key. Also bounds the number
/// of signatures attached to a single transaction.
pub const MAX_NUM_KEYS_FOR_MULTI_SIG: usize = 10;

/// Denominator of fee ratios.
pub const MAX_FEE_RATIO: u8 = 100;
