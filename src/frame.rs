//! HTTP/2 frame codec (RFC 7540 Section 4 and 6).
//!
//! Bidirectional translation between the 9-byte frame header plus a typed
//! payload and flat bytes. The codec is stateless; stream-state and
//! settings validation live in the connection layer.
//!
//! PADDED payloads are deliberately unsupported and surface as an internal
//! error rather than silently mis-parsing. PRIORITY, RST_STREAM and
//! PUSH_PROMISE decode to a not-implemented error which the connection
//! turns into a connection error.

use crate::error::{ErrorCode, FrameError};

/// HTTP/2 frame flags (RFC 7540 Section 6).
pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    /// ACK shares the 0x1 bit; it applies to SETTINGS and PING only.
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

/// HTTP/2 frame types (RFC 7540 Section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Data = 0x0,
    Headers = 0x1,
    Priority = 0x2,
    RstStream = 0x3,
    Settings = 0x4,
    PushPromise = 0x5,
    Ping = 0x6,
    Goaway = 0x7,
    WindowUpdate = 0x8,
    Continuation = 0x9,
}

impl FrameType {
    pub fn from_u8(value: u8) -> Result<Self, FrameError> {
        match value {
            0x0 => Ok(FrameType::Data),
            0x1 => Ok(FrameType::Headers),
            0x2 => Ok(FrameType::Priority),
            0x3 => Ok(FrameType::RstStream),
            0x4 => Ok(FrameType::Settings),
            0x5 => Ok(FrameType::PushPromise),
            0x6 => Ok(FrameType::Ping),
            0x7 => Ok(FrameType::Goaway),
            0x8 => Ok(FrameType::WindowUpdate),
            0x9 => Ok(FrameType::Continuation),
            other => Err(FrameError::UnknownType(other)),
        }
    }
}

/// A parsed HTTP/2 frame header (9 bytes on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length, 24 bits.
    pub length: u32,
    pub frame_type: FrameType,
    pub flags: u8,
    /// Stream identifier, 31 bits (high bit reserved, cleared on parse).
    pub stream_id: u32,
}

impl FrameHeader {
    /// Parse a 9-byte frame header.
    pub fn parse(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < 9 {
            return Err(FrameError::HeaderTooShort(data.len()));
        }

        let length = ((data[0] as u32) << 16) | ((data[1] as u32) << 8) | (data[2] as u32);
        let frame_type = FrameType::from_u8(data[3])?;
        let flags = data[4];
        let stream_id = ((data[5] as u32) << 24)
            | ((data[6] as u32) << 16)
            | ((data[7] as u32) << 8)
            | (data[8] as u32);
        let stream_id = stream_id & 0x7FFF_FFFF; // Clear reserved bit

        Ok(Self {
            length,
            frame_type,
            flags,
            stream_id,
        })
    }

    /// Serialize the header into its 9-byte wire form.
    pub fn encode(&self) -> [u8; 9] {
        [
            (self.length >> 16) as u8,
            (self.length >> 8) as u8,
            self.length as u8,
            self.frame_type as u8,
            self.flags,
            (self.stream_id >> 24) as u8 & 0x7F,
            (self.stream_id >> 16) as u8,
            (self.stream_id >> 8) as u8,
            self.stream_id as u8,
        ]
    }

    /// Total frame size including the 9-byte header.
    pub fn total_size(&self) -> usize {
        9 + self.length as usize
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags & flags::END_STREAM != 0
    }

    pub fn is_end_headers(&self) -> bool {
        self.flags & flags::END_HEADERS != 0
    }

    pub fn is_ack(&self) -> bool {
        self.flags & flags::ACK != 0
    }

    pub fn is_padded(&self) -> bool {
        self.flags & flags::PADDED != 0
    }
}

/// Typed frame payload, one variant per implemented frame type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    Data {
        data: Vec<u8>,
    },
    Headers {
        fragment: Vec<u8>,
    },
    Settings {
        ack: bool,
        /// Raw (identifier, value) pairs; validation is the connection's job.
        pairs: Vec<(u16, u32)>,
    },
    Ping {
        ack: bool,
        data: [u8; 8],
    },
    Goaway {
        last_stream_id: u32,
        error_code: ErrorCode,
        debug_data: Vec<u8>,
    },
    WindowUpdate {
        increment: u32,
    },
    Continuation {
        fragment: Vec<u8>,
    },
}

impl FramePayload {
    /// Parse a frame payload according to its header.
    ///
    /// `payload` must be exactly `header.length` bytes; the connection layer
    /// guarantees this before calling.
    pub fn parse(header: &FrameHeader, payload: &[u8]) -> Result<Self, FrameError> {
        match header.frame_type {
            FrameType::Data => {
                if header.is_padded() {
                    return Err(FrameError::PaddingUnsupported);
                }
                Ok(FramePayload::Data {
                    data: payload.to_vec(),
                })
            }
            FrameType::Headers => {
                if header.is_padded() {
                    return Err(FrameError::PaddingUnsupported);
                }
                let mut offset = 0;
                if header.flags & flags::PRIORITY != 0 {
                    // Skip stream dependency (4 bytes) + weight (1 byte)
                    if payload.len() < 5 {
                        return Err(FrameError::PayloadLength("HEADERS", payload.len()));
                    }
                    offset = 5;
                }
                Ok(FramePayload::Headers {
                    fragment: payload[offset..].to_vec(),
                })
            }
            FrameType::Settings => {
                let ack = header.is_ack();
                if ack {
                    if !payload.is_empty() {
                        return Err(FrameError::PayloadLength("SETTINGS ACK", payload.len()));
                    }
                    return Ok(FramePayload::Settings {
                        ack: true,
                        pairs: Vec::new(),
                    });
                }
                if payload.len() % 6 != 0 {
                    return Err(FrameError::SettingsLength(payload.len()));
                }
                let mut pairs = Vec::with_capacity(payload.len() / 6);
                for chunk in payload.chunks_exact(6) {
                    let id = u16::from_be_bytes([chunk[0], chunk[1]]);
                    let value = u32::from_be_bytes([chunk[2], chunk[3], chunk[4], chunk[5]]);
                    pairs.push((id, value));
                }
                Ok(FramePayload::Settings { ack: false, pairs })
            }
            FrameType::Ping => {
                if payload.len() != 8 {
                    return Err(FrameError::PayloadLength("PING", payload.len()));
                }
                let mut data = [0u8; 8];
                data.copy_from_slice(payload);
                Ok(FramePayload::Ping {
                    ack: header.is_ack(),
                    data,
                })
            }
            FrameType::Goaway => {
                if payload.len() < 8 {
                    return Err(FrameError::PayloadLength("GOAWAY", payload.len()));
                }
                let last_stream_id =
                    u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]])
                        & 0x7FFF_FFFF;
                let error_code =
                    u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
                Ok(FramePayload::Goaway {
                    last_stream_id,
                    error_code: ErrorCode::from_u32(error_code),
                    debug_data: payload[8..].to_vec(),
                })
            }
            FrameType::WindowUpdate => {
                if payload.len() != 4 {
                    return Err(FrameError::PayloadLength("WINDOW_UPDATE", payload.len()));
                }
                let increment =
                    u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]])
                        & 0x7FFF_FFFF;
                if increment == 0 {
                    return Err(FrameError::ZeroWindowIncrement);
                }
                Ok(FramePayload::WindowUpdate { increment })
            }
            FrameType::Continuation => Ok(FramePayload::Continuation {
                fragment: payload.to_vec(),
            }),
            FrameType::Priority => Err(FrameError::NotImplemented("PRIORITY")),
            FrameType::RstStream => Err(FrameError::NotImplemented("RST_STREAM")),
            FrameType::PushPromise => Err(FrameError::NotImplemented("PUSH_PROMISE")),
        }
    }
}

// ---------------------------------------------------------------------------
// Frame builders (outbound direction)
// ---------------------------------------------------------------------------

fn frame_with_payload(
    frame_type: FrameType,
    frame_flags: u8,
    stream_id: u32,
    payload: &[u8],
) -> Vec<u8> {
    let header = FrameHeader {
        length: payload.len() as u32,
        frame_type,
        flags: frame_flags,
        stream_id,
    };
    let mut frame = Vec::with_capacity(9 + payload.len());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(payload);
    frame
}

/// Build a SETTINGS frame with the given (identifier, value) pairs.
pub fn build_settings(pairs: &[(u16, u32)]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(pairs.len() * 6);
    for &(id, value) in pairs {
        payload.extend_from_slice(&id.to_be_bytes());
        payload.extend_from_slice(&value.to_be_bytes());
    }
    frame_with_payload(FrameType::Settings, 0, 0, &payload)
}

/// Build a SETTINGS ACK frame (empty payload, ACK flag).
pub fn build_settings_ack() -> Vec<u8> {
    frame_with_payload(FrameType::Settings, flags::ACK, 0, &[])
}

/// Build a PING ACK echoing the opaque data.
pub fn build_ping_ack(data: [u8; 8]) -> Vec<u8> {
    frame_with_payload(FrameType::Ping, flags::ACK, 0, &data)
}

/// Build a GOAWAY frame with no debug data.
pub fn build_goaway(last_stream_id: u32, error_code: ErrorCode) -> Vec<u8> {
    let mut payload = Vec::with_capacity(8);
    payload.extend_from_slice(&(last_stream_id & 0x7FFF_FFFF).to_be_bytes());
    payload.extend_from_slice(&error_code.as_u32().to_be_bytes());
    frame_with_payload(FrameType::Goaway, 0, 0, &payload)
}

/// Build a WINDOW_UPDATE frame.
/// `stream_id == 0` updates the connection-level window.
pub fn build_window_update(stream_id: u32, increment: u32) -> Vec<u8> {
    let payload = (increment & 0x7FFF_FFFF).to_be_bytes();
    frame_with_payload(FrameType::WindowUpdate, 0, stream_id, &payload)
}

/// Build a HEADERS frame carrying an already-encoded header block fragment.
pub fn build_headers(
    stream_id: u32,
    fragment: &[u8],
    end_headers: bool,
    end_stream: bool,
) -> Vec<u8> {
    let mut frame_flags = 0;
    if end_headers {
        frame_flags |= flags::END_HEADERS;
    }
    if end_stream {
        frame_flags |= flags::END_STREAM;
    }
    frame_with_payload(FrameType::Headers, frame_flags, stream_id, fragment)
}

/// Build a CONTINUATION frame for a header block that did not fit in one
/// HEADERS frame.
pub fn build_continuation(stream_id: u32, fragment: &[u8], end_headers: bool) -> Vec<u8> {
    let frame_flags = if end_headers { flags::END_HEADERS } else { 0 };
    frame_with_payload(FrameType::Continuation, frame_flags, stream_id, fragment)
}

/// Build a DATA frame.
pub fn build_data(stream_id: u32, data: &[u8], end_stream: bool) -> Vec<u8> {
    let frame_flags = if end_stream { flags::END_STREAM } else { 0 };
    frame_with_payload(FrameType::Data, frame_flags, stream_id, data)
}
