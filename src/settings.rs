//! Connection settings (RFC 7540 Section 6.5).
//!
//! Two tables are kept: `local` is what this endpoint advertised, `remote`
//! is what the peer sent. Validation runs over a whole SETTINGS frame
//! before any value is applied, so an invalid pair rejects the frame
//! without leaving it half-applied.

use crate::error::{ConnectionError, ErrorCode};

pub const HEADER_TABLE_SIZE: u16 = 0x1;
pub const ENABLE_PUSH: u16 = 0x2;
pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
pub const MAX_FRAME_SIZE: u16 = 0x5;
pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;

const MAX_INITIAL_WINDOW_SIZE: u32 = (1 << 31) - 1;
const MIN_MAX_FRAME_SIZE: u32 = 16384;
const MAX_MAX_FRAME_SIZE: u32 = (1 << 24) - 1;

/// One endpoint's settings, indexed by identifier minus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsTable([u32; 6]);

impl SettingsTable {
    /// RFC 7540 Section 6.5.2 defaults, except the unlimited entries
    /// (MAX_CONCURRENT_STREAMS, MAX_HEADER_LIST_SIZE) which this build
    /// bounds explicitly.
    pub fn defaults() -> Self {
        Self([4096, 1, 1, 65535, 16384, 8192])
    }

    pub fn get(&self, id: u16) -> u32 {
        debug_assert!((1..=6).contains(&id));
        self.0[(id - 1) as usize]
    }

    fn set(&mut self, id: u16, value: u32) {
        self.0[(id - 1) as usize] = value;
    }

    /// Pairs to advertise in a SETTINGS frame.
    pub fn to_pairs(&self) -> Vec<(u16, u32)> {
        (1u16..=6).map(|id| (id, self.get(id))).collect()
    }
}

/// Local and remote settings of one connection.
#[derive(Debug)]
pub struct Settings {
    pub local: SettingsTable,
    pub remote: SettingsTable,
}

impl Settings {
    pub fn new() -> Self {
        Self {
            local: SettingsTable::defaults(),
            remote: SettingsTable::defaults(),
        }
    }

    /// Validate a received SETTINGS frame, then apply it to the remote
    /// table. Identifiers outside 1..=6 are ignored per RFC 7540
    /// Section 6.5.2. Returns the previous INITIAL_WINDOW_SIZE so the
    /// caller can shift open windows.
    pub fn apply_remote(&mut self, pairs: &[(u16, u32)]) -> Result<u32, ConnectionError> {
        for &(id, value) in pairs {
            validate(id, value)?;
        }
        let old_window = self.remote.get(INITIAL_WINDOW_SIZE);
        for &(id, value) in pairs {
            if (1..=6).contains(&id) {
                self.remote.set(id, value);
            }
        }
        Ok(old_window)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(id: u16, value: u32) -> Result<(), ConnectionError> {
    match id {
        ENABLE_PUSH if value > 1 => Err(ConnectionError::new(
            ErrorCode::ProtocolError,
            "ENABLE_PUSH must be 0 or 1",
        )),
        INITIAL_WINDOW_SIZE if value > MAX_INITIAL_WINDOW_SIZE => Err(ConnectionError::new(
            ErrorCode::FlowControlError,
            "INITIAL_WINDOW_SIZE above 2^31-1",
        )),
        MAX_FRAME_SIZE if !(MIN_MAX_FRAME_SIZE..=MAX_MAX_FRAME_SIZE).contains(&value) => {
            Err(ConnectionError::new(
                ErrorCode::ProtocolError,
                "MAX_FRAME_SIZE outside [2^14, 2^24-1]",
            ))
        }
        _ => Ok(()),
    }
}
