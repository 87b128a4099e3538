//! Chain configuration and the protocol rules active at a given block.

/// Protocol upgrades that change transaction semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Hardfork {
    /// Initial rules.
    Genesis,
    /// Uniform per-byte payload pricing and signature-count based validation
    /// gas.
    Istanbul,
    /// EIP-1559 dynamic fee transactions.
    London,
}

/// A type representing the activation of a hardfork.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HardforkActivation {
    /// The block number from which the hardfork is active.
    pub block_number: u64,
    /// The hardfork to be activated.
    pub hardfork: Hardfork,
}

/// A struct that stores the hardforks for a chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct HardforkActivations {
    /// (Start block number -> hardfork) mapping
    hardforks: Vec<HardforkActivation>,
}

impl HardforkActivations {
    /// Constructs a new instance with the provided hardforks.
    pub fn new(hardforks: Vec<HardforkActivation>) -> Self {
        Self { hardforks }
    }

    /// Creates a new instance for a chain that starts at the provided
    /// hardfork.
    pub fn with_hardfork(hardfork: Hardfork) -> Self {
        Self {
            hardforks: vec![HardforkActivation {
                block_number: 0,
                hardfork,
            }],
        }
    }

    /// Whether no hardforks activations are present.
    pub fn is_empty(&self) -> bool {
        self.hardforks.is_empty()
    }

    /// Returns the latest hardfork active at the provided block number.
    pub fn hardfork_at_block(&self, block_number: u64) -> Option<Hardfork> {
        self.hardforks
            .iter()
            .filter(|activation| block_number >= activation.block_number)
            .map(|activation| activation.hardfork)
            .max()
    }
}

/// Type that stores the configuration for a chain.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Chain name
    pub name: String,
    /// Chain ID used for transaction signing
    pub chain_id: u64,
    /// Hardfork activations for the chain
    pub hardfork_activations: HardforkActivations,
}

impl ChainConfig {
    /// Returns the rules that apply at the provided block number.
    pub fn rules(&self, block_number: u64) -> Rules {
        let hardfork = self
            .hardfork_activations
            .hardfork_at_block(block_number)
            .unwrap_or(Hardfork::Genesis);

        Rules::new(block_number, hardfork)
    }
}

/// Protocol rules active at a specific block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rules {
    /// The block being processed.
    pub block_number: u64,
    /// Whether Istanbul is active.
    pub is_istanbul: bool,
    /// Whether London is active.
    pub is_london: bool,
}

impl Rules {
    /// Constructs the rules for the provided block number and latest active
    /// hardfork.
    pub fn new(block_number: u64, hardfork: Hardfork) -> Self {
        Self {
            block_number,
            is_istanbul: hardfork >= Hardfork::Istanbul,
            is_london: hardfork >= Hardfork::London,
        }
    }
}
