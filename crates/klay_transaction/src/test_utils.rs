use std::collections::HashMap;

use klay_account_key::{AccountKey, AccountKeyError, AccountKeyPicker};
use klay_chain_config::Rules;
use klay_primitives::{Address, Bytes, U256, create_address};

use crate::{CallOutput, CodeFormat, CreateOutput, StateDb, Vm};

/// An account held by [`InMemoryState`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Nonce
    pub nonce: u64,
    /// Account key
    pub key: AccountKey,
    /// Whether the address is human-readable
    pub human_readable: bool,
    /// Code format of smart contract accounts
    pub code_format: Option<CodeFormat>,
    /// Whether the account holds code that can be called
    pub has_code: bool,
}

impl Account {
    /// An externally owned account with the provided key.
    pub fn eoa(key: AccountKey) -> Self {
        Self {
            nonce: 0,
            key,
            human_readable: false,
            code_format: None,
            has_code: false,
        }
    }

    /// A smart contract account holding callable code.
    pub fn contract(code_format: CodeFormat) -> Self {
        Self {
            code_format: Some(code_format),
            has_code: true,
            ..Self::eoa(AccountKey::Fail)
        }
    }
}

/// Account state backed by a hash map.
#[derive(Clone, Debug, Default)]
pub struct InMemoryState {
    accounts: HashMap<Address, Account>,
}

impl InMemoryState {
    /// Inserts or replaces an account.
    pub fn insert(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    /// Returns the account, if it exists.
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Returns the nonce of the account, or zero if it does not exist.
    pub fn nonce(&self, address: &Address) -> u64 {
        self.account(address).map_or(0, |account| account.nonce)
    }

    fn account_mut(&mut self, address: &Address) -> &mut Account {
        self.accounts
            .entry(*address)
            .or_insert_with(|| Account::eoa(AccountKey::Legacy))
    }
}

impl AccountKeyPicker for InMemoryState {
    fn get_key(&self, address: &Address) -> Option<AccountKey> {
        self.accounts.get(address).map(|account| account.key.clone())
    }
}

impl StateDb for InMemoryState {
    fn inc_nonce(&mut self, address: &Address) {
        let account = self.account_mut(address);
        account.nonce += 1;
    }

    fn exist(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn update_key(
        &mut self,
        address: &Address,
        key: &AccountKey,
        _rules: &Rules,
    ) -> Result<(), AccountKeyError> {
        let account = self.account_mut(address);

        if account.key.key_type() == key.key_type() {
            account.key.update(key)
        } else {
            key.check_installable()?;
            account.key = key.clone();
            Ok(())
        }
    }

    fn create_eoa(&mut self, address: &Address, human_readable: bool, key: AccountKey) {
        self.accounts.insert(
            *address,
            Account {
                human_readable,
                ..Account::eoa(key)
            },
        );
    }

    fn create_smart_contract_account(
        &mut self,
        address: &Address,
        code_format: CodeFormat,
        _rules: &Rules,
    ) {
        self.accounts
            .insert(*address, Account::contract(code_format));
    }

    fn create_smart_contract_account_with_key(
        &mut self,
        address: &Address,
        human_readable: bool,
        key: AccountKey,
        code_format: CodeFormat,
        _rules: &Rules,
    ) {
        self.accounts.insert(
            *address,
            Account {
                key,
                human_readable,
                ..Account::contract(code_format)
            },
        );
    }

    fn is_program_account(&self, address: &Address) -> bool {
        self.account(address)
            .is_some_and(|account| account.code_format.is_some())
    }

    fn is_contract_available(&self, address: &Address) -> bool {
        self.account(address).is_some_and(|account| account.has_code)
    }

    fn is_valid_code_format(&self, address: &Address) -> bool {
        self.account(address)
            .and_then(|account| account.code_format)
            .is_some_and(CodeFormat::is_valid)
    }
}

/// A call made to [`RecordingVm`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VmCall {
    /// [`Vm::call`]
    Call {
        /// Caller
        caller: Address,
        /// Callee
        to: Address,
        /// Call data
        input: Bytes,
        /// Gas limit
        gas: u64,
        /// Transferred amount
        value: U256,
    },
    /// [`Vm::create`] and [`Vm::create_with_address`]
    Create {
        /// Creator
        caller: Address,
        /// Init code
        code: Bytes,
        /// Gas limit
        gas: u64,
        /// Transferred amount
        value: U256,
        /// Address of the contract
        address: Address,
        /// Whether the address was provided by the transaction
        explicit_address: bool,
        /// Format of the code
        code_format: CodeFormat,
    },
}

/// Error returned by a failing [`RecordingVm`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("virtual machine failure")]
pub struct VmFailure;

/// A virtual machine that records its calls and returns all gas unused.
#[derive(Debug, Default)]
pub struct RecordingVm {
    /// Calls, in order
    pub calls: Vec<VmCall>,
    /// Fail every call
    pub fail: bool,
    /// Leftover gas reported by every call. The provided gas if absent.
    pub leftover_gas: Option<u64>,
}

impl RecordingVm {
    fn record(&mut self, call: VmCall, gas: u64) -> Result<u64, VmFailure> {
        self.calls.push(call);

        if self.fail {
            Err(VmFailure)
        } else {
            Ok(self.leftover_gas.unwrap_or(gas))
        }
    }
}

impl Vm for RecordingVm {
    type Error = VmFailure;

    fn call(
        &mut self,
        caller: &Address,
        to: &Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> Result<CallOutput, Self::Error> {
        let call = VmCall::Call {
            caller: *caller,
            to: *to,
            input: Bytes::copy_from_slice(input),
            gas,
            value,
        };

        Ok(CallOutput {
            output: Bytes::new(),
            leftover_gas: self.record(call, gas)?,
        })
    }

    fn create(
        &mut self,
        caller: &Address,
        code: &[u8],
        gas: u64,
        value: U256,
        code_format: CodeFormat,
    ) -> Result<CreateOutput, Self::Error> {
        let address = create_address(caller, self.calls.len() as u64);
        let call = VmCall::Create {
            caller: *caller,
            code: Bytes::copy_from_slice(code),
            gas,
            value,
            address,
            explicit_address: false,
            code_format,
        };

        Ok(CreateOutput {
            output: Bytes::new(),
            address,
            leftover_gas: self.record(call, gas)?,
        })
    }

    fn create_with_address(
        &mut self,
        caller: &Address,
        code: &[u8],
        gas: u64,
        value: U256,
        address: &Address,
        _human_readable: bool,
        code_format: CodeFormat,
    ) -> Result<CreateOutput, Self::Error> {
        let call = VmCall::Create {
            caller: *caller,
            code: Bytes::copy_from_slice(code),
            gas,
            value,
            address: *address,
            explicit_address: true,
            code_format,
        };

        Ok(CreateOutput {
            output: Bytes::new(),
            address: *address,
            leftover_gas: self.record(call, gas)?,
        })
    }
}
