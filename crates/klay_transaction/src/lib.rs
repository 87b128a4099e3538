#![warn(missing_docs)]

//! Klaytn transaction types
//!
//! A transaction is one of a closed set of variants, identified by a numeric
//! type tag. Ethereum-compatible variants keep their Ethereum wire formats,
//! while Klaytn-typed variants add multi-signature senders, fee delegation
//! and account key management.

mod access_list;
mod code_format;
mod data;
mod error;
mod fee;
/// Intrinsic gas calculation
pub mod gas;
mod json;
mod rlp;
mod rpc;
mod signature;
/// Signers that hash, sign and recover transactions
pub mod signer;
mod state;
/// In-memory collaborators for exercising validation and execution.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
mod transaction;
mod r#type;
mod value;

pub use klay_account_key::{AccountKey, RoleType};
pub use klay_primitives::{Address, B256, Bytes, TxKind, U256};

pub use self::{
    access_list::{AccessList, AccessListItem},
    code_format::CodeFormat,
    data::{
        AccountUpdate, Cancel, ChainDataAnchoring, Eip1559, Eip2930, FeeDelegation, Legacy,
        SmartContractDeploy, SmartContractExecution, TransactionVariant, TxData, Typed,
        TypedFields, ValueTransfer, ValueTransferMemo,
    },
    error::TxError,
    fee::{FeeRatio, calc_fee_with_ratio},
    json::TransactionJson,
    signature::{TxSignature, TxSignatures},
    state::{CallOutput, CreateOutput, ExecutionError, ExecutionOutput, StateDb, Vm},
    transaction::{Transaction, ValidatedSender},
    r#type::{TxType, tx_type_name},
    value::{TxValue, TxValueKey, TxValueMap, TxValueReader},
};
#[cfg(any(test, feature = "test-utils"))]
pub use self::data::AccountCreation;
