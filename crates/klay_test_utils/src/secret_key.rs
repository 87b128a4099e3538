#[allow(deprecated)]
// This is test code, it's ok to use `DangerousSecretKeyStr`
use klay_signer::{DangerousSecretKeyStr, public_key_to_address};
use klay_primitives::Address;
pub use klay_signer::{SecretKey, SignatureError};

/// Secret key used by the legacy and EIP-2718 signing vectors.
pub const SIGNING_VECTOR_SECRET_KEY: &str =
    "45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8";

/// Secret key used by the typed signer hash vectors.
pub const TYPED_SIGNER_SECRET_KEY: &str =
    "b71c71a67e1177ad4e901695e1b4b9ee17ae16c6668d313eac2f96dbcda3f291";

/// Converts a hex string to a secret key.
pub fn secret_key_from_str(secret_key: &str) -> Result<SecretKey, SignatureError> {
    // This is test code, it's ok to use `DangerousSecretKeyStr`
    #[allow(deprecated)]
    klay_signer::secret_key_from_str(DangerousSecretKeyStr(secret_key))
}

/// Converts a secret key in a hex string format to an address.
///
/// Kept out of `klay_signer` so that production code has a single place
/// where secret keys are parsed from strings.
///
/// # Examples
///
/// ```
/// use klay_test_utils::secret_key::secret_key_to_address;
///
/// let secret_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
///
/// let address = secret_key_to_address(secret_key).unwrap();
/// ```
pub fn secret_key_to_address(secret_key: &str) -> Result<Address, SignatureError> {
    let secret_key = secret_key_from_str(secret_key)?;
    Ok(public_key_to_address(&secret_key.public_key()))
}

/// Converts a secret key to a 0x-prefixed hex string.
pub fn secret_key_to_str(secret_key: &SecretKey) -> String {
    format!("0x{}", hex::encode(secret_key.to_bytes().as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_string_round_trip() -> Result<(), SignatureError> {
        let secret_key = secret_key_from_str(SIGNING_VECTOR_SECRET_KEY)?;
        let as_str = secret_key_to_str(&secret_key);

        assert_eq!(as_str, format!("0x{SIGNING_VECTOR_SECRET_KEY}"));
        assert_eq!(secret_key_from_str(&as_str)?, secret_key);

        Ok(())
    }
}
