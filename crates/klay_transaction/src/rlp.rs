use alloy_rlp::{Buf as _, BufMut, Header};
use klay_primitives::{B256, keccak256};

use crate::r#type::ETHEREUM_TX_TYPE_ENVELOPE;

/// Writes a list header followed by the already encoded payload.
pub(crate) fn encode_list(payload: &[u8], out: &mut dyn BufMut) {
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(out);
    out.put_slice(payload);
}

/// Returns the encoding of a list with the provided, already encoded,
/// payload.
pub(crate) fn list(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + alloy_rlp::length_of_length(payload.len()));
    encode_list(payload, &mut out);
    out
}

/// Consumes a list header and returns the list's payload.
pub(crate) fn decode_list<'a>(buf: &mut &'a [u8]) -> alloy_rlp::Result<&'a [u8]> {
    let header = Header::decode(buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString);
    }

    let payload = buf
        .get(..header.payload_length)
        .ok_or(alloy_rlp::Error::InputTooShort)?;
    buf.advance(header.payload_length);

    Ok(payload)
}

/// Ensures that the payload of a list was consumed entirely.
pub(crate) fn finish_list(payload: &[u8], expected_length: usize) -> alloy_rlp::Result<()> {
    if payload.is_empty() {
        Ok(())
    } else {
        Err(alloy_rlp::Error::ListLengthMismatch {
            expected: expected_length - payload.len(),
            got: expected_length,
        })
    }
}

/// Writes an Ethereum typed transaction: the envelope byte, the EIP-2718 type
/// and the list with the provided payload.
pub(crate) fn encode_ethereum_typed(ethereum_type: u8, payload: &[u8], out: &mut dyn BufMut) {
    out.put_u8(ETHEREUM_TX_TYPE_ENVELOPE);
    out.put_u8(ethereum_type);
    encode_list(payload, out);
}

/// Hashes an Ethereum typed list the way EIP-2718 does, prefixed with the
/// EIP-2718 type but not the envelope byte.
pub(crate) fn ethereum_typed_hash(ethereum_type: u8, payload: &[u8]) -> B256 {
    let mut out = vec![ethereum_type];
    encode_list(payload, &mut out);

    keccak256(out)
}
