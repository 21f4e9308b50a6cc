//! HPACK: Header Compression for HTTP/2 (RFC 7541)
//!
//! Full from-scratch implementation sized for constrained endpoints:
//! prefixed-integer and Huffman codecs, the static table, a circular
//! dynamic table, and the block encoder/decoder built on top of them.
//! Dynamic table state is per-connection and per-direction; the
//! connection layer owns one table for decoding and one for encoding.

pub mod decoder;
pub mod encoder;
pub mod huffman;
pub mod integer;
pub mod tables;

pub use decoder::{decode_header_block, MAX_HEADERS_PER_BLOCK};
pub use encoder::{encode, encode_dynamic_size_update};
pub use tables::{DynamicTable, TableLookup, MAX_DYNAMIC_TABLE_SIZE, STATIC_TABLE_LEN};

/// A decoded HTTP/2 header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Pseudo-headers (`:method`, `:path`, ...) must precede regular
    /// fields in a request header list.
    pub fn is_pseudo(&self) -> bool {
        self.name.starts_with(':')
    }
}
