use alloy_rlp::{Buf as _, BufMut, Decodable, Encodable, RlpDecodable, RlpEncodable};
use klay_primitives::Bytes;
use klay_signer::{compress_public_key, public_key_from_sec1};

use crate::{AccountKey, AccountKeyType, PublicKey, WeightedMultiSig, WeightedPublicKey};

const COMPRESSED_PUBLIC_KEY_LENGTH: usize = 33;

#[derive(RlpEncodable, RlpDecodable)]
struct WeightedPublicKeyRlp {
    weight: u64,
    key: Bytes,
}

#[derive(RlpEncodable, RlpDecodable)]
struct WeightedMultiSigRlp {
    threshold: u64,
    keys: Vec<WeightedPublicKeyRlp>,
}

impl From<&WeightedMultiSig> for WeightedMultiSigRlp {
    fn from(value: &WeightedMultiSig) -> Self {
        Self {
            threshold: value.threshold,
            keys: value
                .keys
                .iter()
                .map(|weighted_key| WeightedPublicKeyRlp {
                    weight: weighted_key.weight,
                    key: compress_public_key(&weighted_key.key).into(),
                })
                .collect(),
        }
    }
}

impl TryFrom<WeightedMultiSigRlp> for WeightedMultiSig {
    type Error = alloy_rlp::Error;

    fn try_from(value: WeightedMultiSigRlp) -> Result<Self, Self::Error> {
        let keys = value
            .keys
            .into_iter()
            .map(|weighted_key| {
                Ok(WeightedPublicKey {
                    weight: weighted_key.weight,
                    key: decode_public_key(&weighted_key.key)?,
                })
            })
            .collect::<Result<Vec<_>, alloy_rlp::Error>>()?;

        Ok(Self {
            threshold: value.threshold,
            keys,
        })
    }
}

fn decode_public_key(bytes: &[u8]) -> Result<PublicKey, alloy_rlp::Error> {
    if bytes.len() != COMPRESSED_PUBLIC_KEY_LENGTH {
        return Err(alloy_rlp::Error::Custom("invalid compressed public key length"));
    }

    public_key_from_sec1(bytes).map_err(|_error| alloy_rlp::Error::Custom("invalid public key"))
}

fn decode_empty_list(buf: &mut &[u8]) -> Result<(), alloy_rlp::Error> {
    let header = alloy_rlp::Header::decode(buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString);
    }
    if header.payload_length != 0 {
        return Err(alloy_rlp::Error::ListLengthMismatch {
            expected: 0,
            got: header.payload_length,
        });
    }

    Ok(())
}

impl AccountKey {
    /// Returns the serialized form of the key: a type byte followed by the
    /// RLP encoding of the key's body, or `0x80` for a nil key.
    pub fn to_serialized_bytes(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    /// Parses a serialized key, rejecting trailing bytes.
    pub fn from_serialized_bytes(bytes: &[u8]) -> Result<Self, alloy_rlp::Error> {
        alloy_rlp::decode_exact(bytes)
    }
}

impl Encodable for AccountKey {
    fn encode(&self, out: &mut dyn BufMut) {
        let key_type = u8::from(self.key_type());

        match self {
            AccountKey::Nil => out.put_u8(alloy_rlp::EMPTY_STRING_CODE),
            AccountKey::Legacy | AccountKey::Fail => {
                out.put_u8(key_type);
                out.put_u8(alloy_rlp::EMPTY_LIST_CODE);
            }
            AccountKey::Public(public_key) => {
                out.put_u8(key_type);
                compress_public_key(public_key).as_slice().encode(out);
            }
            AccountKey::WeightedMultiSig(multi_sig) => {
                out.put_u8(key_type);
                WeightedMultiSigRlp::from(multi_sig).encode(out);
            }
            AccountKey::RoleBased(keys) => {
                out.put_u8(key_type);

                let roles = keys
                    .iter()
                    .map(|key| Bytes::from(key.to_serialized_bytes()))
                    .collect::<Vec<_>>();
                roles.encode(out);
            }
        }
    }
}

impl Decodable for AccountKey {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let first = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;
        // Consume the first byte
        buf.advance(1);

        if first == alloy_rlp::EMPTY_STRING_CODE {
            return Ok(AccountKey::Nil);
        }

        let key_type = AccountKeyType::try_from(first)
            .map_err(|_type| alloy_rlp::Error::Custom("undefined account key type"))?;

        match key_type {
            AccountKeyType::Nil => Err(alloy_rlp::Error::Custom("non-canonical nil account key")),
            AccountKeyType::Legacy => decode_empty_list(buf).map(|()| AccountKey::Legacy),
            AccountKeyType::Fail => decode_empty_list(buf).map(|()| AccountKey::Fail),
            AccountKeyType::Public => {
                let bytes = Bytes::decode(buf)?;
                decode_public_key(&bytes).map(AccountKey::Public)
            }
            AccountKeyType::WeightedMultiSig => WeightedMultiSigRlp::decode(buf)?
                .try_into()
                .map(AccountKey::WeightedMultiSig),
            AccountKeyType::RoleBased => {
                let roles = Vec::<Bytes>::decode(buf)?;
                roles
                    .iter()
                    .map(|role| AccountKey::from_serialized_bytes(role))
                    .collect::<Result<Vec<_>, _>>()
                    .map(AccountKey::RoleBased)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use klay_test_utils::secret_key::secret_key_from_str;

    use super::*;

    fn public_key() -> anyhow::Result<PublicKey> {
        Ok(
            secret_key_from_str("45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8")?
                .public_key(),
        )
    }

    #[test]
    fn fixed_encodings() -> anyhow::Result<()> {
        assert_eq!(AccountKey::Nil.to_serialized_bytes(), vec![0x80]);
        assert_eq!(AccountKey::Legacy.to_serialized_bytes(), vec![0x01, 0xc0]);
        assert_eq!(AccountKey::Fail.to_serialized_bytes(), vec![0x03, 0xc0]);

        let public_key = public_key()?;
        let encoded = AccountKey::Public(public_key).to_serialized_bytes();
        assert_eq!(encoded.len(), 35);
        assert_eq!(&encoded[..2], &[0x02, 0xa1]);
        assert_eq!(&encoded[2..], compress_public_key(&public_key).as_slice());

        Ok(())
    }

    #[test]
    fn nested_keys_survive_decoding() -> anyhow::Result<()> {
        let public_key = public_key()?;

        let account_key = AccountKey::RoleBased(vec![
            AccountKey::Public(public_key),
            AccountKey::Nil,
            AccountKey::WeightedMultiSig(WeightedMultiSig {
                threshold: 2,
                keys: vec![WeightedPublicKey {
                    weight: 2,
                    key: public_key,
                }],
            }),
        ]);

        let encoded = account_key.to_serialized_bytes();
        assert_eq!(encoded.first(), Some(&0x05));
        assert_eq!(AccountKey::from_serialized_bytes(&encoded)?, account_key);

        Ok(())
    }

    #[test]
    fn rejects_malformed_keys() {
        // Unknown type
        assert!(AccountKey::from_serialized_bytes(&[0x06, 0xc0]).is_err());
        // Legacy with a body
        assert!(AccountKey::from_serialized_bytes(&[0x01, 0xc1, 0x80]).is_err());
        // Public key that is not 33 bytes
        assert!(AccountKey::from_serialized_bytes(&[0x02, 0x82, 0x02, 0x03]).is_err());
        // Trailing bytes
        assert!(AccountKey::from_serialized_bytes(&[0x01, 0xc0, 0x00]).is_err());
    }
}
