#![warn(missing_docs)]

//! Account keys
//!
//! An account key decides which signatures may authorize transactions sent
//! from, or paid for by, an account. Keys are installed by account update
//! transactions and consulted when validating the recovered public keys of a
//! transaction's signatures.

mod error;
mod json;
mod multi_sig;
mod rlp;

use auto_impl::auto_impl;
use klay_chain_config::Rules;
use klay_defaults::{
    TX_ACCOUNT_CREATION_GAS_DEFAULT, TX_ACCOUNT_CREATION_GAS_PER_KEY, TX_VALIDATION_GAS_DEFAULT,
};
use klay_primitives::Address;
pub use klay_signer::PublicKey;
use klay_signer::public_key_to_address;

pub use self::{
    error::AccountKeyError,
    multi_sig::{WeightedMultiSig, WeightedPublicKey},
};

/// The serialized tag of each account key kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AccountKeyType {
    /// [`AccountKey::Nil`]
    Nil = 0,
    /// [`AccountKey::Legacy`]
    Legacy = 1,
    /// [`AccountKey::Public`]
    Public = 2,
    /// [`AccountKey::Fail`]
    Fail = 3,
    /// [`AccountKey::WeightedMultiSig`]
    WeightedMultiSig = 4,
    /// [`AccountKey::RoleBased`]
    RoleBased = 5,
}

impl From<AccountKeyType> for u8 {
    fn from(value: AccountKeyType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for AccountKeyType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Nil),
            1 => Ok(Self::Legacy),
            2 => Ok(Self::Public),
            3 => Ok(Self::Fail),
            4 => Ok(Self::WeightedMultiSig),
            5 => Ok(Self::RoleBased),
            value => Err(value),
        }
    }
}

/// The role a key plays within a role-based key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RoleType {
    /// Signs ordinary transactions. Also the fallback for missing roles.
    Transaction = 0,
    /// Signs account update transactions.
    AccountUpdate = 1,
    /// Signs as fee payer of fee-delegated transactions.
    FeePayer = 2,
}

impl RoleType {
    /// The number of defined roles.
    pub const COUNT: usize = 3;

    fn index(self) -> usize {
        self as usize
    }
}

/// A key installed on an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountKey {
    /// Placeholder meaning "keep the current key". Cannot be installed.
    Nil,
    /// The account is controlled by the secret key its address was derived
    /// from.
    Legacy,
    /// The account is controlled by a single, explicit public key.
    Public(PublicKey),
    /// No signature is ever valid.
    Fail,
    /// A weighted threshold multi-signature key.
    WeightedMultiSig(WeightedMultiSig),
    /// A distinct key per [`RoleType`], indexed by role.
    RoleBased(Vec<AccountKey>),
}

impl AccountKey {
    /// Returns the kind of the key.
    pub fn key_type(&self) -> AccountKeyType {
        match self {
            AccountKey::Nil => AccountKeyType::Nil,
            AccountKey::Legacy => AccountKeyType::Legacy,
            AccountKey::Public(_) => AccountKeyType::Public,
            AccountKey::Fail => AccountKeyType::Fail,
            AccountKey::WeightedMultiSig(_) => AccountKeyType::WeightedMultiSig,
            AccountKey::RoleBased(_) => AccountKeyType::RoleBased,
        }
    }

    /// Whether the key is a legacy key.
    pub fn is_legacy(&self) -> bool {
        matches!(self, AccountKey::Legacy)
    }

    /// Whether the key contains other keys.
    pub fn is_composite(&self) -> bool {
        matches!(self, AccountKey::RoleBased(_))
    }

    /// Gas charged for installing the key on an account.
    pub fn creation_gas(&self) -> Result<u64, AccountKeyError> {
        match self {
            AccountKey::Nil | AccountKey::Legacy | AccountKey::Fail => {
                Ok(TX_ACCOUNT_CREATION_GAS_DEFAULT)
            }
            AccountKey::Public(_) => Ok(TX_ACCOUNT_CREATION_GAS_PER_KEY),
            AccountKey::WeightedMultiSig(multi_sig) => multi_sig.creation_gas(),
            AccountKey::RoleBased(keys) => keys
                .iter()
                .try_fold(0u64, |gas, key| {
                    gas.checked_add(key.creation_gas()?)
                        .ok_or(AccountKeyError::GasOverflow)
                }),
        }
    }

    /// Gas charged for validating `num_signatures` signatures against the key
    /// of the provided role.
    pub fn validation_gas(
        &self,
        rules: &Rules,
        role: RoleType,
        num_signatures: usize,
    ) -> Result<u64, AccountKeyError> {
        match self {
            AccountKey::Nil | AccountKey::Legacy | AccountKey::Public(_) | AccountKey::Fail => {
                Ok(TX_VALIDATION_GAS_DEFAULT)
            }
            AccountKey::WeightedMultiSig(multi_sig) => {
                multi_sig.validation_gas(rules, num_signatures)
            }
            AccountKey::RoleBased(keys) => role_key(keys, role)
                .ok_or(AccountKeyError::ZeroLength)?
                .validation_gas(rules, role, num_signatures),
        }
    }

    /// Checks whether the key can be installed on an account that currently
    /// has a key of a different kind.
    pub fn check_installable(&self) -> Result<(), AccountKeyError> {
        match self {
            AccountKey::Nil => Err(AccountKeyError::AccountKeyNilUninitializable),
            AccountKey::Legacy | AccountKey::Public(_) | AccountKey::Fail => Ok(()),
            AccountKey::WeightedMultiSig(multi_sig) => multi_sig.check_installable(),
            AccountKey::RoleBased(keys) => {
                check_role_count(keys)?;

                keys.iter().try_for_each(|key| {
                    if key.is_composite() {
                        return Err(AccountKeyError::NestedCompositeType);
                    }

                    key.check_installable()
                })
            }
        }
    }

    /// Checks whether the key can be replaced by `new_key` of the same kind.
    pub fn check_updatable(&self, new_key: &AccountKey) -> Result<(), AccountKeyError> {
        match (self, new_key) {
            (AccountKey::Nil, _) => Err(AccountKeyError::AccountKeyNilUninitializable),
            (AccountKey::Fail, _) => Err(AccountKeyError::AccountKeyFailNotUpdatable),
            (AccountKey::Legacy, AccountKey::Legacy)
            | (AccountKey::Public(_), AccountKey::Public(_)) => Ok(()),
            (AccountKey::WeightedMultiSig(_), AccountKey::WeightedMultiSig(new_key)) => {
                new_key.check_installable()
            }
            (AccountKey::RoleBased(old_keys), AccountKey::RoleBased(new_keys)) => {
                check_role_count(new_keys)?;

                new_keys
                    .iter()
                    .enumerate()
                    .try_for_each(|(index, new_key)| {
                        if new_key.is_composite() {
                            return Err(AccountKeyError::NestedCompositeType);
                        }

                        match old_keys.get(index) {
                            None => new_key.check_installable(),
                            // A nil role keeps the existing key
                            Some(_) if matches!(new_key, AccountKey::Nil) => Ok(()),
                            Some(old_key) => check_replacable(old_key, new_key),
                        }
                    })
            }
            _ => Err(AccountKeyError::DifferentAccountKeyType),
        }
    }

    /// Replaces the key with `new_key`, keeping existing roles for nil
    /// entries of a role-based key.
    pub fn update(&mut self, new_key: &AccountKey) -> Result<(), AccountKeyError> {
        self.check_updatable(new_key)?;

        match (self, new_key) {
            (AccountKey::RoleBased(old_keys), AccountKey::RoleBased(new_keys)) => {
                for (index, new_key) in new_keys.iter().enumerate() {
                    if let Some(old_key) = old_keys.get_mut(index) {
                        if !matches!(new_key, AccountKey::Nil) {
                            *old_key = new_key.clone();
                        }
                    } else {
                        old_keys.push(new_key.clone());
                    }
                }
            }
            (old_key, new_key) => *old_key = new_key.clone(),
        }

        Ok(())
    }

    /// Validates the public keys recovered from a transaction's signatures
    /// against the key of the provided role.
    pub fn validate(
        &self,
        rules: &Rules,
        role: RoleType,
        recovered_keys: &[PublicKey],
        from: &Address,
    ) -> bool {
        match self {
            AccountKey::Nil => {
                log::error!("A nil account key cannot validate signatures");
                false
            }
            AccountKey::Fail => false,
            AccountKey::Legacy => match recovered_keys {
                [public_key] => public_key_to_address(public_key) == *from,
                _ => false,
            },
            AccountKey::Public(expected) => match recovered_keys {
                [public_key] => public_key == expected,
                _ => false,
            },
            AccountKey::WeightedMultiSig(multi_sig) => multi_sig.validate(rules, recovered_keys),
            AccountKey::RoleBased(keys) => role_key(keys, role)
                .is_some_and(|key| key.validate(rules, role, recovered_keys, from)),
        }
    }
}

/// Returns the key of the provided role, falling back to the transaction
/// role's key.
fn role_key(keys: &[AccountKey], role: RoleType) -> Option<&AccountKey> {
    keys.get(role.index())
        .or_else(|| keys.get(RoleType::Transaction.index()))
}

fn check_role_count(keys: &[AccountKey]) -> Result<(), AccountKeyError> {
    if keys.is_empty() {
        Err(AccountKeyError::ZeroLength)
    } else if keys.len() > RoleType::COUNT {
        Err(AccountKeyError::LengthTooLong)
    } else {
        Ok(())
    }
}

/// Checks whether `old_key` can be replaced by `new_key`. Keys of the same
/// kind must be updatable; otherwise the new key must be installable.
pub fn check_replacable(old_key: &AccountKey, new_key: &AccountKey) -> Result<(), AccountKeyError> {
    if old_key.key_type() == new_key.key_type() {
        old_key.check_updatable(new_key)
    } else {
        new_key.check_installable()
    }
}

/// Validates that the recovered public keys satisfy the account's key for the
/// provided role.
pub fn validate_account_key(
    rules: &Rules,
    from: &Address,
    account_key: &AccountKey,
    recovered_keys: &[PublicKey],
    role: RoleType,
) -> Result<(), AccountKeyError> {
    if account_key.validate(rules, role, recovered_keys, from) {
        Ok(())
    } else {
        Err(AccountKeyError::InvalidSignature)
    }
}

/// Looks up the key installed on an account.
#[auto_impl(&, &mut, Box)]
pub trait AccountKeyPicker {
    /// Returns the key of the account, or `None` if the account does not
    /// exist. Callers treat missing accounts as having a legacy key.
    fn get_key(&self, address: &Address) -> Option<AccountKey>;
}

#[cfg(test)]
mod tests {
    use klay_chain_config::Hardfork;
    use klay_test_utils::secret_key::secret_key_from_str;

    use super::*;

    fn public_key(secret_key: &str) -> anyhow::Result<PublicKey> {
        Ok(secret_key_from_str(secret_key)?.public_key())
    }

    fn public_keys() -> anyhow::Result<[PublicKey; 3]> {
        Ok([
            public_key("45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8")?,
            public_key("b71c71a67e1177ad4e901695e1b4b9ee17ae16c6668d313eac2f96dbcda3f291")?,
            public_key("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")?,
        ])
    }

    fn multi_sig(threshold: u64, keys: &[PublicKey]) -> AccountKey {
        AccountKey::WeightedMultiSig(WeightedMultiSig {
            threshold,
            keys: keys
                .iter()
                .map(|key| WeightedPublicKey {
                    weight: 1,
                    key: *key,
                })
                .collect(),
        })
    }

    #[test]
    fn creation_gas() -> anyhow::Result<()> {
        let keys = public_keys()?;

        assert_eq!(AccountKey::Legacy.creation_gas()?, 0);
        assert_eq!(AccountKey::Public(keys[0]).creation_gas()?, 20_000);
        assert_eq!(multi_sig(2, &keys).creation_gas()?, 60_000);

        let role_based = AccountKey::RoleBased(vec![
            AccountKey::Public(keys[0]),
            AccountKey::Legacy,
            multi_sig(1, &keys[1..]),
        ]);
        assert_eq!(role_based.creation_gas()?, 60_000);

        let role_based = AccountKey::RoleBased(vec![
            multi_sig(3, &keys),
            multi_sig(2, &keys[1..]),
            AccountKey::Public(keys[2]),
        ]);
        assert_eq!(role_based.creation_gas()?, 120_000);

        Ok(())
    }

    #[test]
    fn role_based_falls_back_to_transaction_role() -> anyhow::Result<()> {
        let keys = public_keys()?;
        let rules = Rules::new(0, Hardfork::Istanbul);
        let role_based = AccountKey::RoleBased(vec![AccountKey::Public(keys[0])]);

        assert!(role_based.validate(&rules, RoleType::FeePayer, &keys[..1], &Address::ZERO));
        assert!(!role_based.validate(&rules, RoleType::FeePayer, &keys[1..2], &Address::ZERO));

        Ok(())
    }

    #[test]
    fn legacy_key_matches_sender_address() -> anyhow::Result<()> {
        let keys = public_keys()?;
        let rules = Rules::new(0, Hardfork::Genesis);
        let from = public_key_to_address(&keys[0]);

        assert!(validate_account_key(&rules, &from, &AccountKey::Legacy, &keys[..1], RoleType::Transaction).is_ok());
        assert_eq!(
            validate_account_key(&rules, &from, &AccountKey::Legacy, &keys[..2], RoleType::Transaction),
            Err(AccountKeyError::InvalidSignature)
        );
        assert!(!AccountKey::Fail.validate(&rules, RoleType::Transaction, &keys[..1], &from));

        Ok(())
    }

    #[test]
    fn replacement_rules() -> anyhow::Result<()> {
        let keys = public_keys()?;

        assert_eq!(
            check_replacable(&AccountKey::Legacy, &AccountKey::Nil),
            Err(AccountKeyError::AccountKeyNilUninitializable)
        );
        assert_eq!(
            check_replacable(&AccountKey::Fail, &AccountKey::Fail),
            Err(AccountKeyError::AccountKeyFailNotUpdatable)
        );
        assert!(check_replacable(&AccountKey::Fail, &AccountKey::Legacy).is_ok());
        assert!(check_replacable(&AccountKey::Legacy, &AccountKey::Public(keys[0])).is_ok());
        assert_eq!(
            check_replacable(&AccountKey::Legacy, &multi_sig(4, &keys)),
            Err(AccountKeyError::UnsatisfiableThreshold)
        );

        let nested = AccountKey::RoleBased(vec![AccountKey::RoleBased(vec![AccountKey::Legacy])]);
        assert_eq!(
            check_replacable(&AccountKey::Legacy, &nested),
            Err(AccountKeyError::NestedCompositeType)
        );

        let too_many_roles = AccountKey::RoleBased(vec![AccountKey::Legacy; RoleType::COUNT + 1]);
        assert_eq!(
            check_replacable(&AccountKey::Legacy, &too_many_roles),
            Err(AccountKeyError::LengthTooLong)
        );

        Ok(())
    }

    #[test]
    fn role_based_update_keeps_nil_roles() -> anyhow::Result<()> {
        let keys = public_keys()?;

        let mut account_key = AccountKey::RoleBased(vec![
            AccountKey::Public(keys[0]),
            AccountKey::Public(keys[1]),
        ]);
        account_key.update(&AccountKey::RoleBased(vec![
            AccountKey::Nil,
            AccountKey::Legacy,
            AccountKey::Public(keys[2]),
        ]))?;

        assert_eq!(
            account_key,
            AccountKey::RoleBased(vec![
                AccountKey::Public(keys[0]),
                AccountKey::Legacy,
                AccountKey::Public(keys[2]),
            ])
        );

        // A role that does not exist yet cannot be nil
        let mut account_key = AccountKey::RoleBased(vec![AccountKey::Public(keys[0])]);
        assert_eq!(
            account_key.update(&AccountKey::RoleBased(vec![AccountKey::Nil, AccountKey::Nil])),
            Err(AccountKeyError::AccountKeyNilUninitializable)
        );

        Ok(())
    }
}
