use auto_impl::auto_impl;
use klay_chain_config::ChainConfig;
use klay_primitives::{Address, B256, U256};
use klay_signer::{PublicKey, RecoverableSignature, public_key_to_address};

use crate::{TransactionVariant as _, TxData, TxError, TxSignature, TxSignatures, TxType};

/// Hashes transactions for signing, encodes signatures for a chain and
/// recovers the signers of transactions.
#[auto_impl(&, Box)]
pub trait Signer {
    /// Returns the chain id transactions are signed for.
    fn chain_id(&self) -> U256;

    /// Computes the hash the sender signs.
    fn hash(&self, data: &TxData) -> B256;

    /// Computes the hash the fee payer signs.
    fn hash_fee_payer(&self, data: &TxData) -> Result<B256, TxError>;

    /// Encodes a raw signature as the `[v, r, s]` signature of the
    /// transaction.
    fn signature_values(
        &self,
        data: &TxData,
        signature: &RecoverableSignature,
    ) -> Result<TxSignature, TxError>;

    /// Recovers the address of the sender from its single signature.
    fn sender(&self, data: &TxData) -> Result<Address, TxError>;

    /// Recovers the public key of every sender signature.
    fn sender_public_keys(&self, data: &TxData) -> Result<Vec<PublicKey>, TxError>;

    /// Recovers the public key of every fee payer signature.
    fn fee_payer_public_keys(&self, data: &TxData) -> Result<Vec<PublicKey>, TxError>;
}

fn single_signature(signatures: &TxSignatures) -> Result<&TxSignature, TxError> {
    match signatures.as_slice() {
        [signature] => Ok(signature),
        _ => Err(TxError::MultipleSignaturesNotSupported),
    }
}

/// Signs legacy and Klaytn-typed transactions with EIP-155 replay
/// protection. Ethereum typed transactions are not supported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacySigner {
    chain_id: U256,
    chain_id_mul: U256,
}

impl LegacySigner {
    /// Constructs a signer for the chain.
    pub fn new(chain_id: U256) -> Self {
        Self {
            chain_id,
            chain_id_mul: chain_id.saturating_mul(U256::from(2)),
        }
    }

    /// Maps `35 + 2 * chain_id + recovery_id` to `27 + recovery_id`.
    fn normalize_v(&self, v: U256) -> Option<U256> {
        v.checked_sub(self.chain_id_mul)?.checked_sub(U256::from(8))
    }

    fn check_supported(&self, data: &TxData) -> Result<(), TxError> {
        if data.tx_type().is_ethereum_typed() {
            return Err(TxError::TxTypeNotSupported);
        }

        if data.chain_id() != self.chain_id {
            return Err(TxError::InvalidChainId);
        }

        Ok(())
    }
}

impl Signer for LegacySigner {
    fn chain_id(&self) -> U256 {
        self.chain_id
    }

    fn hash(&self, data: &TxData) -> B256 {
        data.sign_hash(&self.chain_id)
    }

    fn hash_fee_payer(&self, data: &TxData) -> Result<B256, TxError> {
        data.fee_payer_sign_hash(&self.chain_id)
    }

    fn signature_values(
        &self,
        data: &TxData,
        signature: &RecoverableSignature,
    ) -> Result<TxSignature, TxError> {
        if data.tx_type().is_ethereum_typed() {
            return Err(TxError::TxTypeNotSupported);
        }

        let v = U256::from(signature.recovery_id)
            .saturating_add(U256::from(35))
            .saturating_add(self.chain_id_mul);

        Ok(TxSignature::with_v(signature, v))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn sender(&self, data: &TxData) -> Result<Address, TxError> {
        self.check_supported(data)?;

        let tx_type = data.tx_type();
        if tx_type != TxType::Legacy {
            log::warn!("No need to recover the sender of a {tx_type} through its signature");
        }

        let signatures = data.raw_signature_values();
        let public_key = single_signature(&signatures)?
            .recover_public_key(&self.hash(data), |v| self.normalize_v(v))?;

        Ok(public_key_to_address(&public_key))
    }

    fn sender_public_keys(&self, data: &TxData) -> Result<Vec<PublicKey>, TxError> {
        self.check_supported(data)?;

        data.raw_signature_values()
            .recover_public_keys(&self.hash(data), |v| self.normalize_v(v))
    }

    fn fee_payer_public_keys(&self, data: &TxData) -> Result<Vec<PublicKey>, TxError> {
        self.check_supported(data)?;

        let fee_delegation = data.fee_delegation().ok_or(TxError::NotFeeDelegated)?;
        let hash = self.hash_fee_payer(data)?;

        fee_delegation
            .fee_payer_signatures
            .recover_public_keys(&hash, |v| self.normalize_v(v))
    }
}

/// Signs every transaction type. Ethereum typed transactions carry their
/// chain id explicitly and a y-parity `v`; other types are delegated to
/// [`LegacySigner`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedSigner {
    legacy: LegacySigner,
}

impl TypedSigner {
    /// Constructs a signer for the chain.
    pub fn new(chain_id: U256) -> Self {
        Self {
            legacy: LegacySigner::new(chain_id),
        }
    }

    fn check_chain_id(&self, data: &TxData) -> Result<(), TxError> {
        if data.chain_id() == self.legacy.chain_id {
            Ok(())
        } else {
            Err(TxError::InvalidChainId)
        }
    }
}

/// Maps a y-parity `v` to `27 + recovery_id`.
fn normalize_y_parity(v: U256) -> Option<U256> {
    v.checked_add(U256::from(27))
}

impl Signer for TypedSigner {
    fn chain_id(&self) -> U256 {
        self.legacy.chain_id
    }

    fn hash(&self, data: &TxData) -> B256 {
        self.legacy.hash(data)
    }

    fn hash_fee_payer(&self, data: &TxData) -> Result<B256, TxError> {
        self.legacy.hash_fee_payer(data)
    }

    fn signature_values(
        &self,
        data: &TxData,
        signature: &RecoverableSignature,
    ) -> Result<TxSignature, TxError> {
        if !data.tx_type().is_ethereum_typed() {
            return self.legacy.signature_values(data, signature);
        }

        // Unbound transactions adopt the signer's chain id when signed
        let chain_id = data.chain_id();
        if !chain_id.is_zero() && chain_id != self.legacy.chain_id {
            return Err(TxError::InvalidChainId);
        }

        Ok(TxSignature::with_v(
            signature,
            U256::from(signature.recovery_id),
        ))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn sender(&self, data: &TxData) -> Result<Address, TxError> {
        if !data.tx_type().is_ethereum_typed() {
            return self.legacy.sender(data);
        }

        self.check_chain_id(data)?;

        let signatures = data.raw_signature_values();
        let public_key = single_signature(&signatures)?
            .recover_public_key(&self.hash(data), normalize_y_parity)?;

        Ok(public_key_to_address(&public_key))
    }

    fn sender_public_keys(&self, data: &TxData) -> Result<Vec<PublicKey>, TxError> {
        if !data.tx_type().is_ethereum_typed() {
            return self.legacy.sender_public_keys(data);
        }

        self.check_chain_id(data)?;

        data.raw_signature_values()
            .recover_public_keys(&self.hash(data), normalize_y_parity)
    }

    fn fee_payer_public_keys(&self, data: &TxData) -> Result<Vec<PublicKey>, TxError> {
        self.legacy.fee_payer_public_keys(data)
    }
}

/// Returns the signer supporting every transaction type for the chain.
pub fn latest_signer_for_chain_id(chain_id: U256) -> TypedSigner {
    TypedSigner::new(chain_id)
}

/// Returns the signer for the chain at the block. Ethereum typed
/// transactions are only supported from the London hardfork.
pub fn make_signer(config: &ChainConfig, block_number: u64) -> Box<dyn Signer> {
    let chain_id = U256::from(config.chain_id);

    if config.rules(block_number).is_london {
        Box::new(TypedSigner::new(chain_id))
    } else {
        log::trace!("Ethereum typed transactions are inactive at block {block_number}");
        Box::new(LegacySigner::new(chain_id))
    }
}
