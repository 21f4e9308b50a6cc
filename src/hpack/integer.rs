//! HPACK primitive codecs: prefixed integers (RFC 7541 Section 5.1),
//! bit-level buffer reads used by the Huffman decoder, and field preamble
//! classification (RFC 7541 Section 6).

use crate::error::HpackError;

/// Field preamble kinds, ordered by descending bit-mask priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Preamble {
    /// `1xxxxxxx`, 7-bit prefix.
    IndexedHeaderField = 0x80,
    /// `01xxxxxx`, 6-bit prefix.
    LiteralWithIncrementalIndexing = 0x40,
    /// `001xxxxx`, 5-bit prefix.
    DynamicTableSizeUpdate = 0x20,
    /// `0001xxxx`, 4-bit prefix.
    LiteralNeverIndexed = 0x10,
    /// `0000xxxx`, 4-bit prefix.
    LiteralWithoutIndexing = 0x00,
}

impl Preamble {
    /// Prefix width in bits for the integer that follows this preamble.
    pub fn prefix_size(self) -> u8 {
        match self {
            Preamble::IndexedHeaderField => 7,
            Preamble::LiteralWithIncrementalIndexing => 6,
            Preamble::DynamicTableSizeUpdate => 5,
            Preamble::LiteralNeverIndexed => 4,
            Preamble::LiteralWithoutIndexing => 4,
        }
    }
}

/// Classify the first octet of a header field representation.
pub fn classify_preamble(octet: u8) -> Result<Preamble, HpackError> {
    if octet & Preamble::IndexedHeaderField as u8 != 0 {
        return Ok(Preamble::IndexedHeaderField);
    }
    if octet & Preamble::LiteralWithIncrementalIndexing as u8 != 0 {
        return Ok(Preamble::LiteralWithIncrementalIndexing);
    }
    if octet & Preamble::DynamicTableSizeUpdate as u8 != 0 {
        return Ok(Preamble::DynamicTableSizeUpdate);
    }
    if octet & Preamble::LiteralNeverIndexed as u8 != 0 {
        return Ok(Preamble::LiteralNeverIndexed);
    }
    if octet < 16 {
        return Ok(Preamble::LiteralWithoutIndexing);
    }
    Err(HpackError::Compression("unrecognized field preamble"))
}

/// Check that `n_bits` starting at `bit_offset` fit inside a buffer of
/// `buffer_len` bytes. Must be called before `read_bits_from_bytes`.
pub fn can_read_buffer(bit_offset: usize, n_bits: usize, buffer_len: usize) -> bool {
    bit_offset + n_bits <= 8 * buffer_len
}

/// Read up to 32 bits spanning byte boundaries, MSB first.
///
/// The caller must have checked the range with `can_read_buffer`.
pub fn read_bits_from_bytes(bit_offset: usize, n_bits: u8, buffer: &[u8]) -> u32 {
    debug_assert!(n_bits <= 32);
    debug_assert!(can_read_buffer(bit_offset, n_bits as usize, buffer.len()));

    let byte_offset = bit_offset / 8;
    let bit_in_byte = bit_offset % 8;
    let n_bytes = (bit_in_byte + n_bits as usize).div_ceil(8);

    let mut acc: u64 = 0;
    for i in 0..n_bytes {
        acc = (acc << 8) | buffer[byte_offset + i] as u64;
    }
    let trailing = 8 * n_bytes - bit_in_byte - n_bits as usize;
    ((acc >> trailing) & ((1u64 << n_bits) - 1)) as u32
}

/// Integer log base 128, as used by `encoded_integer_size`.
pub fn log128(x: u32) -> u32 {
    let mut n = 0;
    let mut m: u64 = 1;

    while m < x as u64 {
        n += 1;
        m = 1 << (7 * n);
    }
    if m == x as u64 {
        return n;
    }
    n - 1
}

/// Number of octets needed to encode `value` with an n-bit prefix.
pub fn encoded_integer_size(value: u32, prefix: u8) -> u32 {
    let p = (1u32 << prefix) - 1;

    if value < p {
        1
    } else if value == p {
        2
    } else {
        log128(value - p) + 2
    }
}

/// Encode an integer with the given prefix into `buf`.
///
/// `preamble_bits` holds the bits above the prefix, already positioned.
/// Returns the number of bytes written, or an internal error if `buf` is
/// too small.
pub fn encode_integer(
    value: u32,
    prefix: u8,
    preamble_bits: u8,
    buf: &mut [u8],
) -> Result<usize, HpackError> {
    let needed = encoded_integer_size(value, prefix) as usize;
    if buf.len() < needed {
        return Err(HpackError::Internal("integer does not fit in buffer"));
    }

    let mask = (1u32 << prefix) - 1;
    if value < mask {
        buf[0] = preamble_bits | value as u8;
        return Ok(1);
    }

    buf[0] = preamble_bits | mask as u8;
    let mut remaining = value - mask;
    let mut i = 1;
    while remaining >= 128 {
        buf[i] = (remaining & 0x7F) as u8 | 0x80;
        remaining >>= 7;
        i += 1;
    }
    buf[i] = remaining as u8;
    Ok(i + 1)
}

/// Decode an integer with the given prefix from the front of `src`.
///
/// Returns `(value, bytes_consumed)`.
pub fn decode_integer(src: &[u8], prefix: u8) -> Result<(u32, usize), HpackError> {
    if src.is_empty() {
        return Err(HpackError::Compression("empty input for integer"));
    }

    let mask = (1u32 << prefix) - 1;
    let prefix_value = src[0] as u32 & mask;
    if prefix_value < mask {
        return Ok((prefix_value, 1));
    }

    // Accumulate in u64 so high bits of an overlong encoding cannot be
    // shifted out before the range check.
    let mut value = prefix_value as u64;
    let mut shift = 0;
    let mut i = 1;
    loop {
        if i >= src.len() {
            return Err(HpackError::Compression("truncated integer"));
        }
        if shift > 28 {
            return Err(HpackError::Compression("integer overflow"));
        }
        let b = src[i];
        value += ((b & 0x7F) as u64) << shift;
        if value > u32::MAX as u64 {
            return Err(HpackError::Compression("integer overflow"));
        }
        shift += 7;
        i += 1;
        if b & 0x80 == 0 {
            break;
        }
    }

    Ok((value as u32, i))
}
