use auto_impl::auto_impl;
use klay_account_key::{AccountKey, AccountKeyError, AccountKeyPicker};
use klay_chain_config::Rules;
use klay_primitives::{Address, Bytes, U256};

use crate::CodeFormat;

/// The account state a transaction is validated against and applied to.
///
/// Missing accounts report a legacy key through [`AccountKeyPicker`].
#[auto_impl(&mut, Box)]
pub trait StateDb: AccountKeyPicker {
    /// Increments the nonce of the account.
    fn inc_nonce(&mut self, address: &Address);

    /// Whether the account exists.
    fn exist(&self, address: &Address) -> bool;

    /// Replaces the key of the account.
    fn update_key(
        &mut self,
        address: &Address,
        key: &AccountKey,
        rules: &Rules,
    ) -> Result<(), AccountKeyError>;

    /// Creates an externally owned account with the provided key.
    fn create_eoa(&mut self, address: &Address, human_readable: bool, key: AccountKey);

    /// Creates a smart contract account.
    fn create_smart_contract_account(
        &mut self,
        address: &Address,
        code_format: CodeFormat,
        rules: &Rules,
    );

    /// Creates a smart contract account with the provided key.
    fn create_smart_contract_account_with_key(
        &mut self,
        address: &Address,
        human_readable: bool,
        key: AccountKey,
        code_format: CodeFormat,
        rules: &Rules,
    );

    /// Whether the account holds code.
    fn is_program_account(&self, address: &Address) -> bool;

    /// Whether the account holds code that can be called.
    fn is_contract_available(&self, address: &Address) -> bool;

    /// Whether the code format of the account is supported.
    fn is_valid_code_format(&self, address: &Address) -> bool;
}

/// Returns the key of the account, treating missing accounts as having a
/// legacy key.
pub(crate) fn key_or_legacy(picker: &impl AccountKeyPicker, address: &Address) -> AccountKey {
    picker.get_key(address).unwrap_or(AccountKey::Legacy)
}

/// Result of a message call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallOutput {
    /// Returned data
    pub output: Bytes,
    /// Gas left after the call
    pub leftover_gas: u64,
}

/// Result of a contract creation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateOutput {
    /// Returned data
    pub output: Bytes,
    /// Address of the created contract
    pub address: Address,
    /// Gas left after the creation
    pub leftover_gas: u64,
}

/// The virtual machine a transaction is executed by.
pub trait Vm {
    /// Error raised by the virtual machine
    type Error;

    /// Executes a message call.
    fn call(
        &mut self,
        caller: &Address,
        to: &Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> Result<CallOutput, Self::Error>;

    /// Creates a contract at the address derived from the caller's nonce.
    fn create(
        &mut self,
        caller: &Address,
        code: &[u8],
        gas: u64,
        value: U256,
        code_format: CodeFormat,
    ) -> Result<CreateOutput, Self::Error>;

    /// Creates a contract at the provided address.
    #[allow(clippy::too_many_arguments)]
    fn create_with_address(
        &mut self,
        caller: &Address,
        code: &[u8],
        gas: u64,
        value: U256,
        address: &Address,
        human_readable: bool,
        code_format: CodeFormat,
    ) -> Result<CreateOutput, Self::Error>;
}

/// Result of executing a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// Returned data
    pub output: Bytes,
    /// Gas left after execution
    pub leftover_gas: u64,
}

impl From<CallOutput> for ExecutionOutput {
    fn from(value: CallOutput) -> Self {
        Self {
            output: value.output,
            leftover_gas: value.leftover_gas,
        }
    }
}

impl From<CreateOutput> for ExecutionOutput {
    fn from(value: CreateOutput) -> Self {
        Self {
            output: value.output,
            leftover_gas: value.leftover_gas,
        }
    }
}

/// Errors that can occur while executing a transaction.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError<VmErrorT> {
    /// The virtual machine failed.
    #[error(transparent)]
    Vm(VmErrorT),
    /// The account key could not be updated.
    #[error(transparent)]
    AccountKey(#[from] AccountKeyError),
    /// The transaction was executed before its sender was validated.
    #[error("the sender of the transaction has not been validated")]
    SenderNotValidated,
}
