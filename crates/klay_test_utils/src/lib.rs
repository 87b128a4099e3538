//! Helpers shared by the tests of the Klaytn transaction crates.

pub mod secret_key;
