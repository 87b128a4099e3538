use alloy_rlp::{BufMut, Decodable as _, Encodable as _};
use klay_chain_config::Rules;
use klay_defaults::TX_GAS_CANCEL;
use klay_primitives::{Address, Bytes, U256};

use super::{TypedFields, decode_fee_ratio};
use crate::{
    ExecutionError, ExecutionOutput, FeeRatio, StateDb, TransactionJson, TxError, TxType,
    TxValueKey, Vm, value::TxValueReader,
};

/// Consumes the sender's nonce, replacing a pending transaction with the
/// same nonce.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cancel {
    /// Sender
    pub from: Address,
}

impl TypedFields for Cancel {
    const TX_TYPE: TxType = TxType::Cancel;
    const FEE_DELEGATED_TX_TYPES: Option<(TxType, TxType)> = Some((
        TxType::FeeDelegatedCancel,
        TxType::FeeDelegatedCancelWithRatio,
    ));

    fn from(&self) -> &Address {
        &self.from
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.from.encode(out);

        if let Some(fee_ratio) = fee_ratio {
            fee_ratio.encode(out);
        }
    }

    fn decode_fields(
        buf: &mut &[u8],
        with_fee_ratio: bool,
    ) -> Result<(Self, Option<FeeRatio>), TxError> {
        let fields = Self {
            from: Address::decode(buf)?,
        };

        Ok((fields, decode_fee_ratio(buf, with_fee_ratio)?))
    }

    fn from_values(values: &mut TxValueReader) -> Result<Self, TxError> {
        Ok(Self {
            from: values.address(TxValueKey::From)?,
        })
    }

    fn write_json(&self, json: &mut TransactionJson) {
        json.from = Some(self.from);
    }

    fn intrinsic_gas(&self) -> Result<u64, TxError> {
        Ok(TX_GAS_CANCEL)
    }

    fn execute<StateT: StateDb, VmT: Vm>(
        &self,
        sender: &Address,
        _vm: &mut VmT,
        state: &mut StateT,
        _rules: &Rules,
        gas: u64,
        _value: U256,
    ) -> Result<ExecutionOutput, ExecutionError<VmT::Error>> {
        state.inc_nonce(sender);

        Ok(ExecutionOutput {
            output: Bytes::new(),
            leftover_gas: gas,
        })
    }
}

#[cfg(test)]
mod tests {
    use klay_chain_config::Hardfork;
    use klay_primitives::address;

    use super::*;
    use crate::test_utils::{InMemoryState, RecordingVm};

    #[test]
    fn only_consumes_the_nonce() -> anyhow::Result<()> {
        let from = address!("0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b");
        let mut state = InMemoryState::default();
        let mut vm = RecordingVm::default();

        let cancel = Cancel { from };
        let output = cancel.execute(
            &from,
            &mut vm,
            &mut state,
            &Rules::new(0, Hardfork::Istanbul),
            5_000,
            U256::ZERO,
        )?;

        assert_eq!(output.leftover_gas, 5_000);
        assert_eq!(state.nonce(&from), 1);
        assert!(vm.calls.is_empty());

        Ok(())
    }
}
