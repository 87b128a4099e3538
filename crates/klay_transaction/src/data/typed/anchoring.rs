use alloy_rlp::{BufMut, Decodable as _, Encodable as _};
use klay_chain_config::Rules;
use klay_defaults::TX_CHAIN_DATA_ANCHORING_GAS;
use klay_primitives::{Address, Bytes, U256};

use super::{TypedFields, decode_fee_ratio};
use crate::{
    ExecutionError, ExecutionOutput, FeeRatio, StateDb, TransactionJson, TxError, TxType,
    TxValueKey, Vm, gas::intrinsic_gas_payload, value::TxValueReader,
};

/// Anchors child chain data on the parent chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainDataAnchoring {
    // The order of these fields determines encoding order.
    /// Sender
    pub from: Address,
    /// Encoded anchoring payload, see [`klay_anchor`]
    pub anchored_data: Bytes,
}

impl TypedFields for ChainDataAnchoring {
    const TX_TYPE: TxType = TxType::ChainDataAnchoring;
    const FEE_DELEGATED_TX_TYPES: Option<(TxType, TxType)> = Some((
        TxType::FeeDelegatedChainDataAnchoring,
        TxType::FeeDelegatedChainDataAnchoringWithRatio,
    ));

    fn from(&self) -> &Address {
        &self.from
    }

    fn data(&self) -> &[u8] {
        &self.anchored_data
    }

    fn encode_fields(&self, fee_ratio: Option<FeeRatio>, out: &mut dyn BufMut) {
        self.from.encode(out);
        self.anchored_data.encode(out);

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
            anchored_data: Bytes::decode(buf)?,
        };

        Ok((fields, decode_fee_ratio(buf, with_fee_ratio)?))
    }

    fn from_values(values: &mut TxValueReader) -> Result<Self, TxError> {
        Ok(Self {
            from: values.address(TxValueKey::From)?,
            anchored_data: values.bytes(TxValueKey::AnchoredData)?,
        })
    }

    fn write_json(&self, json: &mut TransactionJson) {
        json.from = Some(self.from);
        json.input = Some(self.anchored_data.clone());
    }

    fn intrinsic_gas(&self) -> Result<u64, TxError> {
        intrinsic_gas_payload(TX_CHAIN_DATA_ANCHORING_GAS, &self.anchored_data)
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
