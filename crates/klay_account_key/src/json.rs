use core::fmt;

use k256::elliptic_curve::sec1::ToEncodedPoint as _;
use klay_primitives::U256;
use serde::ser::SerializeStruct as _;

use crate::{AccountKey, PublicKey, WeightedMultiSig};

/// Affine coordinates of a public key.
#[derive(serde::Serialize)]
struct PublicKeyJson {
    x: Option<U256>,
    y: Option<U256>,
}

impl From<&PublicKey> for PublicKeyJson {
    fn from(value: &PublicKey) -> Self {
        let point = value.to_encoded_point(/* compress = */ false);

        Self {
            x: point.x().map(|x| U256::from_be_slice(x)),
            y: point.y().map(|y| U256::from_be_slice(y)),
        }
    }
}

#[derive(serde::Serialize)]
struct WeightedPublicKeyJson {
    weight: u64,
    key: PublicKeyJson,
}

#[derive(serde::Serialize)]
struct WeightedMultiSigJson {
    threshold: u64,
    keys: Vec<WeightedPublicKeyJson>,
}

impl From<&WeightedMultiSig> for WeightedMultiSigJson {
    fn from(value: &WeightedMultiSig) -> Self {
        Self {
            threshold: value.threshold,
            keys: value
                .keys
                .iter()
                .map(|weighted_key| WeightedPublicKeyJson {
                    weight: weighted_key.weight,
                    key: PublicKeyJson::from(&weighted_key.key),
                })
                .collect(),
        }
    }
}

#[derive(serde::Serialize)]
struct EmptyKeyJson {}

impl serde::Serialize for AccountKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AccountKey", 2)?;
        state.serialize_field("keyType", &u8::from(self.key_type()))?;

        match self {
            AccountKey::Nil | AccountKey::Legacy | AccountKey::Fail => {
                state.serialize_field("key", &EmptyKeyJson {})?;
            }
            AccountKey::Public(public_key) => {
                state.serialize_field("key", &PublicKeyJson::from(public_key))?;
            }
            AccountKey::WeightedMultiSig(multi_sig) => {
                state.serialize_field("key", &WeightedMultiSigJson::from(multi_sig))?;
            }
            AccountKey::RoleBased(keys) => {
                state.serialize_field("key", keys)?;
            }
        }

        state.end()
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_error| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_as_json() -> anyhow::Result<()> {
        let role_based = AccountKey::RoleBased(vec![AccountKey::Legacy, AccountKey::Fail]);

        let json: serde_json::Value = serde_json::from_str(&role_based.to_string())?;
        assert_eq!(
            json,
            serde_json::json!({
                "keyType": 5,
                "key": [
                    { "keyType": 1, "key": {} },
                    { "keyType": 3, "key": {} },
                ],
            })
        );

        Ok(())
    }
}
