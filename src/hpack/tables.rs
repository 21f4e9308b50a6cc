//! HPACK indexing tables (RFC 7541 Sections 2.3 and 4).
//!
//! The static table is the fixed 61-entry list from Appendix A. The dynamic
//! table is a circular byte buffer: entries are appended at `next`, evicted
//! from `first`, and wrap modulo `max_size`. Each entry is stored as
//! `[u16 name_len][name][u16 value_len][value]`; its accounted size is
//! `name_len + value_len + 32` per RFC 7541 Section 4.1, which always
//! exceeds the 4 bytes of ring bookkeeping, so a `max_size`-byte region can
//! hold every entry combination the accounting admits.

use crate::error::HpackError;

/// Number of entries in the static table.
pub const STATIC_TABLE_LEN: u32 = 61;

/// Upper bound on the dynamic table size this build supports. The ring
/// buffer is allocated once at this capacity; SETTINGS_HEADER_TABLE_SIZE
/// values above it are clamped at the connection layer.
pub const MAX_DYNAMIC_TABLE_SIZE: u32 = 4096;

/// Per-entry accounting overhead (RFC 7541 Section 4.1).
const ENTRY_OVERHEAD: u32 = 32;

/// Ring bookkeeping per entry: two u16 length prefixes.
const PREFIX_BYTES: u32 = 4;

/// RFC 7541 Appendix A.
pub static STATIC_TABLE: [(&str, &str); STATIC_TABLE_LEN as usize] = [
    (":authority", ""),
    (":method", "GET"),
    (":method", "POST"),
    (":path", "/"),
    (":path", "/index.html"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "200"),
    (":status", "204"),
    (":status", "206"),
    (":status", "304"),
    (":status", "400"),
    (":status", "404"),
    (":status", "500"),
    ("accept-charset", ""),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", ""),
    ("accept-ranges", ""),
    ("accept", ""),
    ("access-control-allow-origin", ""),
    ("age", ""),
    ("allow", ""),
    ("authorization", ""),
    ("cache-control", ""),
    ("content-disposition", ""),
    ("content-encoding", ""),
    ("content-language", ""),
    ("content-length", ""),
    ("content-location", ""),
    ("content-range", ""),
    ("content-type", ""),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("expect", ""),
    ("expires", ""),
    ("from", ""),
    ("host", ""),
    ("if-match", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("if-range", ""),
    ("if-unmodified-since", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("max-forwards", ""),
    ("proxy-authenticate", ""),
    ("proxy-authorization", ""),
    ("range", ""),
    ("referer", ""),
    ("refresh", ""),
    ("retry-after", ""),
    ("server", ""),
    ("set-cookie", ""),
    ("strict-transport-security", ""),
    ("transfer-encoding", ""),
    ("user-agent", ""),
    ("vary", ""),
    ("via", ""),
    ("www-authenticate", ""),
];

/// Result of searching both tables for a header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLookup {
    /// Name and value both match at this combined index.
    Exact(u32),
    /// Only the name matches at this combined index.
    NameOnly(u32),
    Miss,
}

/// Circular dynamic table. Indices in the combined space start at
/// `STATIC_TABLE_LEN + 1` (= 62) for the newest entry.
#[derive(Debug)]
pub struct DynamicTable {
    buffer: Vec<u8>,
    max_size: u32,
    first: u32,
    next: u32,
    n_entries: u32,
    actual_size: u32,
}

impl DynamicTable {
    pub fn new(max_size: u32) -> Self {
        debug_assert!(max_size <= MAX_DYNAMIC_TABLE_SIZE);
        Self {
            buffer: vec![0; MAX_DYNAMIC_TABLE_SIZE as usize],
            max_size,
            first: 0,
            next: 0,
            n_entries: 0,
            actual_size: 0,
        }
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn n_entries(&self) -> u32 {
        self.n_entries
    }

    pub fn actual_size(&self) -> u32 {
        self.actual_size
    }

    fn ring_byte(&self, pos: u32) -> u8 {
        self.buffer[(pos % self.max_size) as usize]
    }

    fn ring_u16(&self, pos: u32) -> u16 {
        u16::from_be_bytes([self.ring_byte(pos), self.ring_byte(pos + 1)])
    }

    fn ring_read(&self, pos: u32, len: u16) -> Vec<u8> {
        (0..len as u32).map(|i| self.ring_byte(pos + i)).collect()
    }

    fn ring_write(&mut self, mut pos: u32, bytes: &[u8]) -> u32 {
        for &b in bytes {
            self.buffer[(pos % self.max_size) as usize] = b;
            pos = (pos + 1) % self.max_size;
        }
        pos
    }

    /// Ring bytes currently occupied, counting bookkeeping prefixes.
    fn used_bytes(&self) -> u32 {
        if self.n_entries == 0 {
            0
        } else if self.first < self.next {
            self.next - self.first
        } else {
            self.max_size - self.first + self.next
        }
    }

    /// Read the entry starting at ring offset `pos`. Returns the name, the
    /// value, and the offset just past the entry (unwrapped).
    fn entry_at(&self, pos: u32) -> (Vec<u8>, Vec<u8>, u32) {
        let name_len = self.ring_u16(pos);
        let name = self.ring_read(pos + 2, name_len);
        let value_pos = pos + 2 + name_len as u32;
        let value_len = self.ring_u16(value_pos);
        let value = self.ring_read(value_pos + 2, value_len);
        (name, value, value_pos + 2 + value_len as u32)
    }

    fn evict_oldest(&mut self) {
        let name_len = self.ring_u16(self.first) as u32;
        let value_len = self.ring_u16(self.first + 2 + name_len) as u32;
        self.actual_size -= name_len + value_len + ENTRY_OVERHEAD;
        self.first = (self.first + PREFIX_BYTES + name_len + value_len) % self.max_size;
        self.n_entries -= 1;
    }

    /// Insert an entry, evicting from the oldest end until it fits. An entry
    /// larger than the whole table leaves the table untouched.
    pub fn add_entry(&mut self, name: &str, value: &str) {
        let entry_size = (name.len() + value.len()) as u32 + ENTRY_OVERHEAD;
        if entry_size > self.max_size {
            return;
        }
        while self.actual_size + entry_size > self.max_size {
            self.evict_oldest();
        }

        let mut pos = self.next;
        pos = self.ring_write(pos, &(name.len() as u16).to_be_bytes());
        pos = self.ring_write(pos, name.as_bytes());
        pos = self.ring_write(pos, &(value.len() as u16).to_be_bytes());
        pos = self.ring_write(pos, value.as_bytes());
        self.next = pos;
        self.n_entries += 1;
        self.actual_size += entry_size;
    }

    /// Resolve a combined-space index (1-based; 1..=61 static, 62..
    /// dynamic newest-first) to a name/value pair.
    pub fn get(&self, index: u32) -> Result<(String, String), HpackError> {
        if index == 0 {
            return Err(HpackError::Compression("header index zero"));
        }
        if index <= STATIC_TABLE_LEN {
            let (name, value) = STATIC_TABLE[(index - 1) as usize];
            return Ok((name.to_string(), value.to_string()));
        }
        let nth_newest = index - STATIC_TABLE_LEN - 1;
        if nth_newest >= self.n_entries {
            return Err(HpackError::Compression("header index out of range"));
        }

        // Entries are laid out oldest-first from `first`; skip forward to
        // the requested one.
        let mut pos = self.first;
        for _ in 0..(self.n_entries - 1 - nth_newest) {
            let (_, _, end) = self.entry_at(pos);
            pos = end % self.max_size;
        }
        let (name, value, _) = self.entry_at(pos);
        Ok((
            String::from_utf8_lossy(&name).into_owned(),
            String::from_utf8_lossy(&value).into_owned(),
        ))
    }

    /// Search static then dynamic entries, preferring exact matches and
    /// smaller indices.
    pub fn lookup(&self, name: &str, value: &str) -> TableLookup {
        let mut name_only = None;
        for (i, &(n, v)) in STATIC_TABLE.iter().enumerate() {
            if n == name {
                if v == value {
                    return TableLookup::Exact(i as u32 + 1);
                }
                name_only.get_or_insert(i as u32 + 1);
            }
        }
        for nth in 0..self.n_entries {
            let index = STATIC_TABLE_LEN + 1 + nth;
            if let Ok((n, v)) = self.get(index) {
                if n == name {
                    if v == value {
                        return TableLookup::Exact(index);
                    }
                    name_only.get_or_insert(index);
                }
            }
        }
        match name_only {
            Some(index) => TableLookup::NameOnly(index),
            None => TableLookup::Miss,
        }
    }

    /// Change `max_size`, evicting until the remaining entries fit, then
    /// defragment the ring so the occupied region starts at offset zero.
    ///
    /// `settings_max` is the limit the peer advertised through
    /// SETTINGS_HEADER_TABLE_SIZE; a larger request is a compression error.
    pub fn resize(&mut self, settings_max: u32, new_max: u32) -> Result<(), HpackError> {
        if new_max > settings_max {
            return Err(HpackError::Compression(
                "table size update above settings limit",
            ));
        }
        if new_max == 0 {
            self.max_size = 0;
            self.first = 0;
            self.next = 0;
            self.n_entries = 0;
            self.actual_size = 0;
            return Ok(());
        }

        while self.actual_size > new_max {
            self.evict_oldest();
        }
        if self.n_entries == 0 {
            self.first = 0;
            self.next = 0;
            self.max_size = new_max;
            return Ok(());
        }

        let used = self.used_bytes();
        if self.first < self.next {
            // Contiguous region: slide it down to offset zero.
            self.buffer
                .copy_within(self.first as usize..self.next as usize, 0);
        } else {
            let head_len = self.next as usize;
            let tail_start = self.first as usize;
            let tail_len = (self.max_size - self.first) as usize;
            if self.next <= self.max_size - self.first {
                // Wrapped, short head: stash the wrapped-around front,
                // slide the tail down, reattach the front behind it.
                let head = self.buffer[..head_len].to_vec();
                self.buffer.copy_within(tail_start..tail_start + tail_len, 0);
                self.buffer[tail_len..tail_len + head_len].copy_from_slice(&head);
            } else {
                // Wrapped, short tail: stash the tail, slide the front up
                // to make room, put the tail at offset zero.
                let tail = self.buffer[tail_start..tail_start + tail_len].to_vec();
                self.buffer.copy_within(..head_len, tail_len);
                self.buffer[..tail_len].copy_from_slice(&tail);
            }
        }
        self.first = 0;
        self.next = used % new_max;
        self.max_size = new_max;
        Ok(())
    }
}
