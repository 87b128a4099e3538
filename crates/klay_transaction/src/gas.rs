use klay_chain_config::Rules;
use klay_defaults::{
    TX_ACCESS_LIST_ADDRESS_GAS, TX_ACCESS_LIST_STORAGE_KEY_GAS, TX_DATA_GAS,
    TX_DATA_NON_ZERO_GAS, TX_DATA_ZERO_GAS, TX_GAS, TX_GAS_CONTRACT_CREATION,
};

use crate::{AccessList, TxError};

fn count(value: usize) -> Result<u64, TxError> {
    u64::try_from(value).map_err(|_error| TxError::OutOfGas)
}

fn charge(gas: u64, count: u64, cost_per_item: u64) -> Result<u64, TxError> {
    count
        .checked_mul(cost_per_item)
        .and_then(|cost| gas.checked_add(cost))
        .ok_or(TxError::OutOfGas)
}

/// Adds the uniform per-byte payload charge to `gas`.
pub fn intrinsic_gas_payload(gas: u64, data: &[u8]) -> Result<u64, TxError> {
    charge(gas, count(data.len())?, TX_DATA_GAS)
}

/// Adds the pre-Istanbul payload charge, which distinguishes zero and
/// non-zero bytes, to `gas`.
pub fn intrinsic_gas_payload_legacy(gas: u64, data: &[u8]) -> Result<u64, TxError> {
    let non_zero_bytes = count(data.iter().filter(|byte| **byte != 0).count())?;
    let zero_bytes = count(data.len())? - non_zero_bytes;

    let gas = charge(gas, non_zero_bytes, TX_DATA_NON_ZERO_GAS)?;
    charge(gas, zero_bytes, TX_DATA_ZERO_GAS)
}

/// Computes the intrinsic gas of an Ethereum transaction.
pub fn intrinsic_gas(
    data: &[u8],
    access_list: Option<&AccessList>,
    contract_creation: bool,
    rules: &Rules,
) -> Result<u64, TxError> {
    let gas = if contract_creation {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };

    let mut gas = if rules.is_istanbul {
        intrinsic_gas_payload(gas, data)?
    } else {
        intrinsic_gas_payload_legacy(gas, data)?
    };

    if let Some(access_list) = access_list {
        gas = charge(gas, count(access_list.0.len())?, TX_ACCESS_LIST_ADDRESS_GAS)?;
        gas = charge(
            gas,
            count(access_list.storage_key_count())?,
            TX_ACCESS_LIST_STORAGE_KEY_GAS,
        )?;
    }

    Ok(gas)
}
