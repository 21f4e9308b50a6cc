//! h2-embed: a sans-I/O HTTP/2 protocol engine for constrained endpoints
//!
//! This crate implements the server side of HTTP/2 (RFC 7540) and HPACK
//! (RFC 7541) as a pure state machine over byte buffers, designed for
//! environments that cannot carry an async runtime (embedded targets,
//! WASM, single-threaded event loops).
//!
//! # Features
//!
//! - **Sans-I/O Design**: feed bytes in, drain bytes out; all socket work
//!   stays with the caller
//! - **Full HPACK**: integer/Huffman codecs, static table, and a circular
//!   dynamic table implemented from scratch
//! - **Flow Control**: connection and stream windows, WINDOW_UPDATE
//!   handling and generation, deferred body sends
//! - **CONTINUATION Assembly**: header blocks reassembled across frame
//!   boundaries with bounded buffers
//! - **RFC 7540 Error Taxonomy**: connection errors map to GOAWAY with
//!   the mandated error codes
//!
//! # Quick Start
//!
//! ```rust
//! use h2_embed::{Application, Connection, Request, Response, CONNECTION_PREFACE};
//!
//! struct Hello;
//!
//! impl Application for Hello {
//!     fn on_request(&mut self, request: Request) -> Response {
//!         Response::new(200)
//!             .with_header("content-type", "text/plain")
//!             .with_body(format!("hello {}", request.path().unwrap_or("/")))
//!     }
//! }
//!
//! let mut conn = Connection::new(Hello);
//!
//! // The client opens with the 24-byte preface; the engine answers with
//! // its SETTINGS advertisement.
//! conn.receive(CONNECTION_PREFACE).unwrap();
//! let to_send = conn.take_output();
//! assert!(!to_send.is_empty());
//! ```

pub mod connection;
pub mod error;
pub mod flow_control;
pub mod frame;
pub mod hpack;
pub mod settings;
pub mod stream;

pub use connection::{
    Application, Connection, Request, Response, CONNECTION_PREFACE, MAX_BODY_SIZE,
    MAX_HEADER_BLOCK_SIZE,
};
pub use error::{ConnectionError, ErrorCode, FrameError, HpackError};
pub use frame::{FrameHeader, FramePayload, FrameType};
pub use hpack::Header;
