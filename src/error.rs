//! Error taxonomy for the HTTP/2 engine.
//!
//! Error codes mirror RFC 7540 Section 7. Layer-local error enums
//! (frame codec, HPACK, connection) carry enough context to map a
//! failure to the error code that goes out on the wire in a GOAWAY.

use thiserror::Error;

/// HTTP/2 error codes (RFC 7540 Section 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xa,
    EnhanceYourCalm = 0xb,
    InadequateSecurity = 0xc,
    Http11Required = 0xd,
}

impl ErrorCode {
    /// Wire representation (4 bytes big-endian in GOAWAY payloads).
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decode a wire error code. Unknown codes are treated as INTERNAL_ERROR
    /// per RFC 7540 Section 7.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0x0 => ErrorCode::NoError,
            0x1 => ErrorCode::ProtocolError,
            0x2 => ErrorCode::InternalError,
            0x3 => ErrorCode::FlowControlError,
            0x4 => ErrorCode::SettingsTimeout,
            0x5 => ErrorCode::StreamClosed,
            0x6 => ErrorCode::FrameSizeError,
            0x7 => ErrorCode::RefusedStream,
            0x8 => ErrorCode::Cancel,
            0x9 => ErrorCode::CompressionError,
            0xa => ErrorCode::ConnectError,
            0xb => ErrorCode::EnhanceYourCalm,
            0xc => ErrorCode::InadequateSecurity,
            0xd => ErrorCode::Http11Required,
            _ => ErrorCode::InternalError,
        }
    }
}

/// Frame codec failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame header needs 9 bytes, got {0}")]
    HeaderTooShort(usize),
    #[error("unknown frame type 0x{0:x}")]
    UnknownType(u8),
    #[error("{0} payload has wrong length {1}")]
    PayloadLength(&'static str, usize),
    #[error("SETTINGS payload length {0} is not a multiple of 6")]
    SettingsLength(usize),
    #[error("PADDED flag is not supported")]
    PaddingUnsupported,
    #[error("{0} frames are not implemented")]
    NotImplemented(&'static str),
    #[error("WINDOW_UPDATE with zero increment")]
    ZeroWindowIncrement,
}

impl FrameError {
    /// Error code this failure maps to when promoted to a connection error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            FrameError::HeaderTooShort(_) => ErrorCode::InternalError,
            FrameError::UnknownType(_) => ErrorCode::ProtocolError,
            FrameError::PayloadLength(..) => ErrorCode::FrameSizeError,
            FrameError::SettingsLength(_) => ErrorCode::FrameSizeError,
            FrameError::PaddingUnsupported => ErrorCode::InternalError,
            FrameError::NotImplemented(_) => ErrorCode::ProtocolError,
            FrameError::ZeroWindowIncrement => ErrorCode::ProtocolError,
        }
    }
}

/// HPACK failures. Decode-local issues are promoted to connection errors
/// because dynamic-table state is shared connection-wide and cannot be
/// partially rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HpackError {
    /// Malformed header block: bad integer, bad Huffman data, index out of
    /// range. Maps to COMPRESSION_ERROR.
    #[error("compression error: {0}")]
    Compression(&'static str),
    /// Local resource exhaustion: output buffer or header list full.
    /// Maps to INTERNAL_ERROR.
    #[error("internal hpack error: {0}")]
    Internal(&'static str),
}

impl HpackError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            HpackError::Compression(_) => ErrorCode::CompressionError,
            HpackError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

/// A connection-terminating error. By the time this is returned the engine
/// has already queued a best-effort GOAWAY in the output buffer and moved
/// the connection to the closed state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("connection error {code:?}: {reason}")]
pub struct ConnectionError {
    pub code: ErrorCode,
    pub reason: &'static str,
}

impl ConnectionError {
    pub fn new(code: ErrorCode, reason: &'static str) -> Self {
        Self { code, reason }
    }
}
