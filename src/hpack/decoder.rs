//! HPACK header block decoding (RFC 7541 Section 3).
//!
//! A header block is a sequence of preamble-classified fields. Indexed
//! fields resolve against the combined static/dynamic index space; literal
//! fields carry their name and/or value inline, optionally Huffman coded.
//! Fields flagged for incremental indexing are inserted into the dynamic
//! table as a side effect, so decode failures are unrecoverable for the
//! connection.

use crate::error::HpackError;
use super::huffman;
use super::integer::{classify_preamble, decode_integer, Preamble};
use super::tables::DynamicTable;
use super::Header;

/// Hard cap on decoded fields per header block.
pub const MAX_HEADERS_PER_BLOCK: usize = 32;

/// Decode one string literal (H bit, 7-bit-prefixed length, octets).
/// Returns the string and the bytes consumed.
fn decode_string(src: &[u8]) -> Result<(String, usize), HpackError> {
    if src.is_empty() {
        return Err(HpackError::Compression("truncated string literal"));
    }
    let huffman_coded = src[0] & 0x80 != 0;
    let (len, prefix_len) = decode_integer(src, 7)?;
    let len = len as usize;
    let rest = &src[prefix_len..];
    if rest.len() < len {
        return Err(HpackError::Compression("truncated string literal"));
    }

    let text = if huffman_coded {
        let mut decoded = Vec::with_capacity(2 * len);
        huffman::decode(&rest[..len], &mut decoded)?;
        String::from_utf8_lossy(&decoded).into_owned()
    } else {
        String::from_utf8_lossy(&rest[..len]).into_owned()
    };
    Ok((text, prefix_len + len))
}

fn push_header(headers: &mut Vec<Header>, header: Header) -> Result<(), HpackError> {
    if headers.len() >= MAX_HEADERS_PER_BLOCK {
        return Err(HpackError::Internal("header list full"));
    }
    headers.push(header);
    Ok(())
}

/// Decode a complete header block, appending fields to `headers` and
/// applying dynamic-table insertions and size updates to `table`.
///
/// `settings_max_size` bounds dynamic-table size updates; it is the value
/// this endpoint advertised in SETTINGS_HEADER_TABLE_SIZE.
///
/// Returns the number of bytes consumed (always the whole block on
/// success).
pub fn decode_header_block(
    table: &mut DynamicTable,
    settings_max_size: u32,
    block: &[u8],
    headers: &mut Vec<Header>,
) -> Result<usize, HpackError> {
    let mut pos = 0;

    while pos < block.len() {
        let src = &block[pos..];
        match classify_preamble(src[0])? {
            Preamble::IndexedHeaderField => {
                let (index, consumed) = decode_integer(src, 7)?;
                let (name, value) = table.get(index)?;
                push_header(headers, Header { name, value })?;
                pos += consumed;
            }
            Preamble::DynamicTableSizeUpdate => {
                let (new_max, consumed) = decode_integer(src, 5)?;
                table.resize(settings_max_size, new_max)?;
                pos += consumed;
            }
            preamble => {
                let (index, mut consumed) = decode_integer(src, preamble.prefix_size())?;
                let name = if index == 0 {
                    let (name, n) = decode_string(&src[consumed..])?;
                    consumed += n;
                    name
                } else {
                    table.get(index)?.0
                };
                let (value, n) = decode_string(&src[consumed..])?;
                consumed += n;

                if preamble == Preamble::LiteralWithIncrementalIndexing {
                    table.add_entry(&name, &value);
                }
                push_header(headers, Header { name, value })?;
                pos += consumed;
            }
        }
    }
    Ok(pos)
}
