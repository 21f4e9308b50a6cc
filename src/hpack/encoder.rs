//! HPACK header block encoding (RFC 7541 Section 6).
//!
//! Writes into a caller-provided slice with a capacity check before every
//! write, so an undersized buffer surfaces as an error instead of a
//! truncated block. Fields found in neither table are emitted as literals
//! with incremental indexing so repeats compress on later blocks. String
//! literals use the Huffman coding whenever it is shorter.

use crate::error::HpackError;
use super::huffman;
use super::integer::encode_integer;
use super::tables::{DynamicTable, TableLookup};
use super::Header;

fn encode_string(text: &str, buf: &mut [u8]) -> Result<usize, HpackError> {
    let raw = text.as_bytes();
    let huffman_len = huffman::encoded_len(raw);

    let (body_len, h_bit) = if huffman_len < raw.len() {
        (huffman_len, 0x80)
    } else {
        (raw.len(), 0x00)
    };
    let prefix_len = encode_integer(body_len as u32, 7, h_bit, buf)?;
    if buf.len() < prefix_len + body_len {
        return Err(HpackError::Internal("string does not fit in buffer"));
    }

    if h_bit != 0 {
        let mut coded = Vec::with_capacity(body_len);
        huffman::encode(raw, &mut coded);
        buf[prefix_len..prefix_len + body_len].copy_from_slice(&coded);
    } else {
        buf[prefix_len..prefix_len + body_len].copy_from_slice(raw);
    }
    Ok(prefix_len + body_len)
}

/// Encode a header list into `buf`, updating the dynamic table for every
/// field emitted with incremental indexing. Returns the bytes written.
pub fn encode(
    table: &mut DynamicTable,
    headers: &[Header],
    buf: &mut [u8],
) -> Result<usize, HpackError> {
    let mut pos = 0;
    for header in headers {
        match table.lookup(&header.name, &header.value) {
            TableLookup::Exact(index) => {
                pos += encode_integer(index, 7, 0x80, &mut buf[pos..])?;
            }
            TableLookup::NameOnly(index) => {
                pos += encode_integer(index, 6, 0x40, &mut buf[pos..])?;
                pos += encode_string(&header.value, &mut buf[pos..])?;
                table.add_entry(&header.name, &header.value);
            }
            TableLookup::Miss => {
                pos += encode_integer(0, 6, 0x40, &mut buf[pos..])?;
                pos += encode_string(&header.name, &mut buf[pos..])?;
                pos += encode_string(&header.value, &mut buf[pos..])?;
                table.add_entry(&header.name, &header.value);
            }
        }
    }
    Ok(pos)
}

/// Shrink (or regrow) the local dynamic table and emit the size-update
/// preamble the peer's decoder needs to follow along.
pub fn encode_dynamic_size_update(
    table: &mut DynamicTable,
    settings_max: u32,
    new_max: u32,
    buf: &mut [u8],
) -> Result<usize, HpackError> {
    table.resize(settings_max, new_max)?;
    encode_integer(new_max, 5, 0x20, buf)
}
