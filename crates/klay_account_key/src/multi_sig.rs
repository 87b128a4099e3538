use std::collections::HashSet;

use klay_chain_config::Rules;
use klay_defaults::{
    MAX_NUM_KEYS_FOR_MULTI_SIG, TX_ACCOUNT_CREATION_GAS_PER_KEY, TX_VALIDATION_GAS_PER_KEY,
};
use klay_signer::{PublicKey, compress_public_key};

use crate::AccountKeyError;

/// A public key and the weight its signature contributes towards the
/// threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightedPublicKey {
    /// Weight of the key
    pub weight: u64,
    /// The public key
    pub key: PublicKey,
}

/// A key that is satisfied when the weights of the signing keys sum to at
/// least the threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightedMultiSig {
    /// Minimum weighted sum of valid signatures
    pub threshold: u64,
    /// Weighted public keys
    pub keys: Vec<WeightedPublicKey>,
}

impl WeightedMultiSig {
    pub(crate) fn creation_gas(&self) -> Result<u64, AccountKeyError> {
        let num_keys = self.keys.len();
        if num_keys > MAX_NUM_KEYS_FOR_MULTI_SIG {
            return Err(AccountKeyError::MaxKeysExceeded);
        }

        (num_keys as u64)
            .checked_mul(TX_ACCOUNT_CREATION_GAS_PER_KEY)
            .ok_or(AccountKeyError::GasOverflow)
    }

    pub(crate) fn validation_gas(
        &self,
        rules: &Rules,
        num_signatures: usize,
    ) -> Result<u64, AccountKeyError> {
        let num_keys = self.keys.len();
        if num_keys > MAX_NUM_KEYS_FOR_MULTI_SIG {
            log::warn!("The number of keys in the account exceeds the limit: {num_keys}");
            return Err(AccountKeyError::MaxKeysExceeded);
        }
        if num_keys == 0 {
            return Err(AccountKeyError::ZeroLength);
        }

        let charged = if rules.is_istanbul {
            num_signatures.saturating_sub(1)
        } else {
            num_keys - 1
        };

        Ok(charged as u64 * TX_VALIDATION_GAS_PER_KEY)
    }

    pub(crate) fn check_installable(&self) -> Result<(), AccountKeyError> {
        if self.keys.is_empty() {
            return Err(AccountKeyError::ZeroLength);
        }
        if self.keys.len() > MAX_NUM_KEYS_FOR_MULTI_SIG {
            return Err(AccountKeyError::MaxKeysExceeded);
        }

        let mut unique_keys = HashSet::with_capacity(self.keys.len());
        let mut weighted_sum = 0u64;
        for weighted_key in &self.keys {
            if weighted_key.weight == 0 {
                return Err(AccountKeyError::ZeroKeyWeight);
            }

            if !unique_keys.insert(compress_public_key(&weighted_key.key)) {
                return Err(AccountKeyError::DuplicatedKey);
            }

            weighted_sum = weighted_sum
                .checked_add(weighted_key.weight)
                .ok_or(AccountKeyError::WeightedSumOverflow)?;
        }

        if weighted_sum < self.threshold {
            return Err(AccountKeyError::UnsatisfiableThreshold);
        }

        Ok(())
    }

    pub(crate) fn validate(&self, rules: &Rules, recovered_keys: &[PublicKey]) -> bool {
        if rules.is_istanbul && recovered_keys.len() > self.keys.len() {
            log::debug!(
                "Multi-sig validation failed: {} signatures for {} keys",
                recovered_keys.len(),
                self.keys.len()
            );
            return false;
        }

        // Signing twice with the same key counts once
        let signers: HashSet<Vec<u8>> = recovered_keys.iter().map(compress_public_key).collect();

        let mut num_valid_signers = 0usize;
        let mut weighted_sum = 0u64;
        for weighted_key in &self.keys {
            if signers.contains(&compress_public_key(&weighted_key.key)) {
                weighted_sum = weighted_sum.saturating_add(weighted_key.weight);
                num_valid_signers += 1;
            }
        }

        if rules.is_istanbul && num_valid_signers < signers.len() {
            log::debug!(
                "Multi-sig validation failed: {} of {} signers are not registered",
                signers.len() - num_valid_signers,
                signers.len()
            );
            return false;
        }

        if weighted_sum < self.threshold {
            log::debug!(
                "Multi-sig validation failed: weighted sum {weighted_sum} is below threshold {}",
                self.threshold
            );
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use klay_chain_config::Hardfork;
    use klay_test_utils::secret_key::secret_key_from_str;

    use super::*;

    const SECRET_KEYS: [&str; 4] = [
        "45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8",
        "b71c71a67e1177ad4e901695e1b4b9ee17ae16c6668d313eac2f96dbcda3f291",
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    ];

    fn public_keys() -> anyhow::Result<Vec<PublicKey>> {
        SECRET_KEYS
            .iter()
            .map(|secret_key| Ok(secret_key_from_str(secret_key)?.public_key()))
            .collect()
    }

    /// Threshold 4 with weights 2, 1, 1 for the first three keys.
    fn account_key(public_keys: &[PublicKey]) -> WeightedMultiSig {
        WeightedMultiSig {
            threshold: 4,
            keys: public_keys
                .iter()
                .take(3)
                .zip([2, 1, 1])
                .map(|(key, weight)| WeightedPublicKey { weight, key: *key })
                .collect(),
        }
    }

    #[test]
    fn validate() -> anyhow::Result<()> {
        let public_keys = public_keys()?;
        let account_key = account_key(&public_keys);

        let pre_istanbul = Rules::new(0, Hardfork::Genesis);
        let istanbul = Rules::new(0, Hardfork::Istanbul);

        // All registered keys reach the threshold
        assert!(account_key.validate(&istanbul, &public_keys[..3]));
        // Weight 3 is below the threshold
        assert!(!account_key.validate(&istanbul, &public_keys[1..3]));
        // Duplicate signatures do not add weight
        let duplicated = [public_keys[0], public_keys[0], public_keys[1]];
        assert!(!account_key.validate(&istanbul, &duplicated));

        // An unregistered signer is tolerated only before Istanbul
        let with_unknown = [public_keys[0], public_keys[1], public_keys[2], public_keys[3]];
        assert!(account_key.validate(&pre_istanbul, &with_unknown));
        assert!(!account_key.validate(&istanbul, &with_unknown));

        Ok(())
    }

    #[test]
    fn validation_gas() -> anyhow::Result<()> {
        let public_keys = public_keys()?;
        let account_key = account_key(&public_keys);

        let pre_istanbul = Rules::new(0, Hardfork::Genesis);
        let istanbul = Rules::new(0, Hardfork::Istanbul);

        for num_signatures in 1..=3 {
            assert_eq!(
                account_key.validation_gas(&pre_istanbul, num_signatures)?,
                2 * TX_VALIDATION_GAS_PER_KEY
            );
            assert_eq!(
                account_key.validation_gas(&istanbul, num_signatures)?,
                (num_signatures as u64 - 1) * TX_VALIDATION_GAS_PER_KEY
            );
        }

        Ok(())
    }

    #[test]
    fn check_installable() -> anyhow::Result<()> {
        let public_keys = public_keys()?;

        let mut account_key = account_key(&public_keys);
        assert_eq!(account_key.check_installable(), Ok(()));

        account_key.threshold = 5;
        assert_eq!(
            account_key.check_installable(),
            Err(AccountKeyError::UnsatisfiableThreshold)
        );

        let mut account_key = self::account_key(&public_keys);
        account_key.keys[1].weight = 0;
        assert_eq!(
            account_key.check_installable(),
            Err(AccountKeyError::ZeroKeyWeight)
        );

        let mut account_key = self::account_key(&public_keys);
        account_key.keys[2].key = public_keys[0];
        assert_eq!(
            account_key.check_installable(),
            Err(AccountKeyError::DuplicatedKey)
        );

        let mut account_key = self::account_key(&public_keys);
        account_key.keys[0].weight = u64::MAX;
        assert_eq!(
            account_key.check_installable(),
            Err(AccountKeyError::WeightedSumOverflow)
        );

        let empty = WeightedMultiSig {
            threshold: 1,
            keys: Vec::new(),
        };
        assert_eq!(empty.check_installable(), Err(AccountKeyError::ZeroLength));

        Ok(())
    }
}
