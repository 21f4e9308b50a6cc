//! Server-side HTTP/2 connection state machine.
//!
//! Sans-I/O: feed raw transport bytes into [`Connection::receive`] and
//! drain the bytes to write with [`Connection::take_output`]. The engine
//! resumes exactly where it suspended when a preface, frame header, or
//! payload is still incomplete, so no frame boundary is assumed in the
//! input.
//!
//! One stream is live at a time: the request HEADERS (+ CONTINUATIONs)
//! and DATA are assembled, decoded, and handed to the [`Application`];
//! the response is HPACK-encoded and chunked back out under flow control.

use log::{debug, trace, warn};

use crate::error::{ConnectionError, ErrorCode};
use crate::flow_control::{FlowControl, WindowScope};
use crate::frame::{self, FrameHeader, FramePayload, FrameType};
use crate::hpack::{decoder, encoder, DynamicTable, Header, MAX_DYNAMIC_TABLE_SIZE};
use crate::settings::{self, Settings};
use crate::stream::{Stream, StreamState};

/// The fixed 24-byte client connection preface (RFC 7540 Section 3.5).
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Cap on an accumulated header block across HEADERS + CONTINUATION.
pub const MAX_HEADER_BLOCK_SIZE: usize = 16 * 1024;

/// Cap on an accumulated request body.
pub const MAX_BODY_SIZE: usize = 16 * 1024;

const FRAME_HEADER_LEN: usize = 9;

/// A complete decoded request, delivered once both the header block and
/// the body (if any) have arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn method(&self) -> Option<&str> {
        self.pseudo(":method")
    }

    pub fn path(&self) -> Option<&str> {
        self.pseudo(":path")
    }

    fn pseudo(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }
}

/// A response to send back on the request's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            headers: vec![Header::new(":status", status.to_string())],
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// The application collaborator: routing and handlers live behind this.
pub trait Application {
    fn on_request(&mut self, request: Request) -> Response;
}

#[derive(Debug, Clone, Copy)]
enum ConnState {
    AwaitingPreface,
    AwaitingHeader,
    AwaitingPayload(FrameHeader),
    /// GOAWAY(NO_ERROR) sent; draining until the transport closes.
    Closing,
    Closed,
}

#[derive(Debug)]
struct PendingBody {
    body: Vec<u8>,
    sent: usize,
}

/// One HTTP/2 connection. Owns all per-connection state: settings,
/// flow-control windows, the live stream, and both HPACK dynamic tables.
pub struct Connection<A: Application> {
    app: A,
    state: ConnState,
    buffer: Vec<u8>,
    output: Vec<u8>,

    settings: Settings,
    flow: FlowControl,
    decoder_table: DynamicTable,
    encoder_table: DynamicTable,
    /// Dynamic-table shrink to announce in the next encoded header block.
    encoder_size_update: Option<u32>,

    stream: Stream,
    last_open_stream_id: u32,

    /// Header block fragments accumulated until END_HEADERS.
    fragments: Vec<u8>,
    waiting_end_headers: bool,
    fragment_end_stream: bool,

    request_headers: Vec<Header>,
    request_body: Vec<u8>,
    /// Response body bytes still blocked on the peer's window.
    pending_body: Option<PendingBody>,

    wait_settings_ack: bool,
    sent_goaway: bool,
    received_goaway: bool,
}

impl<A: Application> Connection<A> {
    pub fn new(app: A) -> Self {
        let settings = Settings::new();
        let flow = FlowControl::new(settings.remote.get(settings::INITIAL_WINDOW_SIZE));
        let table_size = settings.local.get(settings::HEADER_TABLE_SIZE);
        Self {
            app,
            state: ConnState::AwaitingPreface,
            buffer: Vec::new(),
            output: Vec::new(),
            settings,
            flow,
            decoder_table: DynamicTable::new(table_size),
            encoder_table: DynamicTable::new(table_size),
            encoder_size_update: None,
            stream: Stream::idle(),
            last_open_stream_id: 0,
            fragments: Vec::new(),
            waiting_end_headers: false,
            fragment_end_stream: false,
            request_headers: Vec::new(),
            request_body: Vec::new(),
            pending_body: None,
            wait_settings_ack: false,
            sent_goaway: false,
            received_goaway: false,
        }
    }

    /// Feed transport bytes into the engine. On a connection error the
    /// engine has already queued a best-effort GOAWAY in the output and
    /// moved to the closed state; the caller should flush and close.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.buffer.extend_from_slice(bytes);
        loop {
            match self.state {
                ConnState::AwaitingPreface => {
                    if self.buffer.len() < CONNECTION_PREFACE.len() {
                        return Ok(());
                    }
                    let matched = self.buffer[..CONNECTION_PREFACE.len()] == *CONNECTION_PREFACE;
                    self.buffer.drain(..CONNECTION_PREFACE.len());
                    if !matched {
                        return self.fail(ConnectionError::new(
                            ErrorCode::ProtocolError,
                            "bad connection preface",
                        ));
                    }
                    trace!("client preface received, advertising local settings");
                    let settings_frame = frame::build_settings(&self.settings.local.to_pairs());
                    self.output.extend_from_slice(&settings_frame);
                    self.wait_settings_ack = true;
                    self.state = ConnState::AwaitingHeader;
                }
                ConnState::AwaitingHeader => {
                    if self.buffer.len() < FRAME_HEADER_LEN {
                        return Ok(());
                    }
                    let header = match FrameHeader::parse(&self.buffer[..FRAME_HEADER_LEN]) {
                        Ok(header) => header,
                        Err(e) => {
                            return self.fail(ConnectionError::new(
                                e.error_code(),
                                "malformed frame header",
                            ))
                        }
                    };
                    if header.length > self.settings.local.get(settings::MAX_FRAME_SIZE) {
                        return self.fail(ConnectionError::new(
                            ErrorCode::FrameSizeError,
                            "frame length above MAX_FRAME_SIZE",
                        ));
                    }
                    if let Err(err) = self.check_incoming(&header) {
                        return self.fail(err);
                    }
                    self.buffer.drain(..FRAME_HEADER_LEN);
                    self.state = ConnState::AwaitingPayload(header);
                }
                ConnState::AwaitingPayload(header) => {
                    let length = header.length as usize;
                    if self.buffer.len() < length {
                        return Ok(());
                    }
                    let payload_bytes: Vec<u8> = self.buffer.drain(..length).collect();
                    self.state = ConnState::AwaitingHeader;
                    let payload = match FramePayload::parse(&header, &payload_bytes) {
                        Ok(payload) => payload,
                        Err(e) => {
                            return self.fail(ConnectionError::new(
                                e.error_code(),
                                "malformed frame payload",
                            ))
                        }
                    };
                    trace!(
                        "frame {:?} stream={} len={}",
                        header.frame_type,
                        header.stream_id,
                        header.length
                    );
                    if let Err(err) = self.dispatch(&header, payload) {
                        return self.fail(err);
                    }
                }
                ConnState::Closing | ConnState::Closed => {
                    self.buffer.clear();
                    return Ok(());
                }
            }
        }
    }

    /// Drain the bytes the transport must write to the peer.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ConnState::Closing | ConnState::Closed)
    }

    /// True between sending local SETTINGS and receiving the peer's ACK.
    pub fn awaiting_settings_ack(&self) -> bool {
        self.wait_settings_ack
    }

    /// Queue a GOAWAY for `err` (unless one went out already) and close.
    fn fail(&mut self, err: ConnectionError) -> Result<(), ConnectionError> {
        warn!("connection error: {}", err);
        if !self.sent_goaway {
            self.output
                .extend_from_slice(&frame::build_goaway(self.last_open_stream_id, err.code));
            self.sent_goaway = true;
        }
        self.state = ConnState::Closed;
        self.buffer.clear();
        Err(err)
    }

    /// Frame-type preconditions checked before the payload is consumed.
    fn check_incoming(&self, header: &FrameHeader) -> Result<(), ConnectionError> {
        let proto = |reason| ConnectionError::new(ErrorCode::ProtocolError, reason);

        // While END_HEADERS is pending, only CONTINUATION may interleave.
        // A fresh HEADERS is tolerated and discards the stale fragment.
        if self.waiting_end_headers
            && !matches!(
                header.frame_type,
                FrameType::Continuation | FrameType::Headers
            )
        {
            return Err(proto("frame interleaved inside a header block"));
        }

        match header.frame_type {
            FrameType::Settings | FrameType::Ping | FrameType::Goaway => {
                if header.stream_id != 0 {
                    return Err(proto("connection frame with non-zero stream id"));
                }
                Ok(())
            }
            FrameType::Headers => {
                let id = header.stream_id;
                if id == 0 || id % 2 == 0 {
                    return Err(proto("HEADERS on a non-client stream id"));
                }
                if id <= self.last_open_stream_id {
                    return Err(proto("HEADERS on an old stream id"));
                }
                if self.stream.is_active() && !self.waiting_end_headers {
                    return Err(proto("second stream while one is in flight"));
                }
                Ok(())
            }
            FrameType::Continuation => {
                if !self.waiting_end_headers || header.stream_id != self.stream.id {
                    return Err(proto("CONTINUATION without an open header block"));
                }
                Ok(())
            }
            FrameType::Data => {
                let receivable = matches!(
                    self.stream.state,
                    StreamState::Open | StreamState::HalfClosedLocal
                );
                if header.stream_id != self.stream.id || !receivable {
                    return Err(proto("DATA on a closed or unknown stream"));
                }
                Ok(())
            }
            FrameType::WindowUpdate => Ok(()),
            // Payload parsing rejects these as not implemented.
            FrameType::Priority | FrameType::RstStream | FrameType::PushPromise => Ok(()),
        }
    }

    fn dispatch(
        &mut self,
        header: &FrameHeader,
        payload: FramePayload,
    ) -> Result<(), ConnectionError> {
        match payload {
            FramePayload::Settings { ack, pairs } => self.on_settings(ack, &pairs),
            FramePayload::Ping { ack, data } => {
                if !ack {
                    self.output.extend_from_slice(&frame::build_ping_ack(data));
                }
                Ok(())
            }
            FramePayload::Goaway {
                last_stream_id,
                error_code,
                debug_data,
            } => self.on_goaway(last_stream_id, error_code, &debug_data),
            FramePayload::WindowUpdate { increment } => {
                self.on_window_update(header.stream_id, increment)
            }
            FramePayload::Headers { fragment } => self.on_headers(header, fragment),
            FramePayload::Continuation { fragment } => self.on_continuation(header, &fragment),
            FramePayload::Data { data } => self.on_data(header, &data),
        }
    }

    fn on_settings(&mut self, ack: bool, pairs: &[(u16, u32)]) -> Result<(), ConnectionError> {
        if ack {
            trace!("SETTINGS ACK received");
            self.wait_settings_ack = false;
            return Ok(());
        }

        let old_window = self.settings.apply_remote(pairs)?;
        let new_window = self.settings.remote.get(settings::INITIAL_WINDOW_SIZE);
        if new_window != old_window {
            self.flow
                .apply_initial_window_size_change(old_window, new_window)?;
        }
        // The peer's decoder bounds our encoder table; a shrink must be
        // announced in the next header block we send.
        let table_limit = self
            .settings
            .remote
            .get(settings::HEADER_TABLE_SIZE)
            .min(MAX_DYNAMIC_TABLE_SIZE);
        if table_limit < self.encoder_table.max_size() {
            self.encoder_size_update = Some(table_limit);
        }
        debug!("applied {} settings from peer", pairs.len());
        self.output.extend_from_slice(&frame::build_settings_ack());
        Ok(())
    }

    fn on_goaway(
        &mut self,
        last_stream_id: u32,
        error_code: ErrorCode,
        debug_data: &[u8],
    ) -> Result<(), ConnectionError> {
        if error_code != ErrorCode::NoError {
            debug!(
                "peer GOAWAY {:?}: {}",
                error_code,
                String::from_utf8_lossy(debug_data)
            );
            // The peer is gone; answering with our own GOAWAY is pointless.
            self.sent_goaway = true;
            self.state = ConnState::Closed;
            return Err(ConnectionError::new(
                error_code,
                "peer terminated the connection",
            ));
        }
        if self.received_goaway || self.sent_goaway {
            trace!("repeat GOAWAY, closing immediately");
            self.state = ConnState::Closed;
            return Ok(());
        }

        self.received_goaway = true;
        if self.last_open_stream_id > last_stream_id {
            // The peer will not process our live stream; stop now.
            self.output.extend_from_slice(&frame::build_goaway(
                self.last_open_stream_id,
                ErrorCode::NoError,
            ));
            self.sent_goaway = true;
            self.state = ConnState::Closing;
        }
        Ok(())
    }

    fn on_window_update(&mut self, stream_id: u32, increment: u32) -> Result<(), ConnectionError> {
        let scope = if stream_id == 0 {
            WindowScope::Connection
        } else if stream_id == self.stream.id && self.stream.is_active() {
            WindowScope::Stream
        } else {
            trace!("WINDOW_UPDATE for finished stream {stream_id} ignored");
            return Ok(());
        };
        self.flow.receive_window_update(scope, increment)?;
        self.flush_pending_body()
    }

    fn on_headers(
        &mut self,
        header: &FrameHeader,
        fragment: Vec<u8>,
    ) -> Result<(), ConnectionError> {
        if self.waiting_end_headers {
            debug!("fresh HEADERS discards a stale header block fragment");
        }
        if fragment.len() > MAX_HEADER_BLOCK_SIZE {
            return Err(ConnectionError::new(
                ErrorCode::InternalError,
                "header block fragment buffer full",
            ));
        }

        self.stream = Stream::open(header.stream_id);
        self.last_open_stream_id = header.stream_id;
        self.flow
            .reset_stream_window(self.settings.remote.get(settings::INITIAL_WINDOW_SIZE));
        self.request_headers.clear();
        self.request_body.clear();
        self.pending_body = None;

        self.fragments = fragment;
        self.fragment_end_stream = header.is_end_stream();
        self.waiting_end_headers = !header.is_end_headers();
        if header.is_end_headers() {
            self.finish_header_block()?;
        }
        Ok(())
    }

    fn on_continuation(
        &mut self,
        header: &FrameHeader,
        fragment: &[u8],
    ) -> Result<(), ConnectionError> {
        if self.fragments.len() + fragment.len() > MAX_HEADER_BLOCK_SIZE {
            return Err(ConnectionError::new(
                ErrorCode::InternalError,
                "header block fragment buffer full",
            ));
        }
        self.fragments.extend_from_slice(fragment);
        if header.is_end_headers() {
            self.finish_header_block()?;
        }
        Ok(())
    }

    fn finish_header_block(&mut self) -> Result<(), ConnectionError> {
        self.waiting_end_headers = false;
        let block = std::mem::take(&mut self.fragments);
        let mut headers = Vec::new();
        let table_limit = self.settings.local.get(settings::HEADER_TABLE_SIZE);
        decoder::decode_header_block(&mut self.decoder_table, table_limit, &block, &mut headers)
            .map_err(|e| ConnectionError::new(e.error_code(), "header block decode failed"))?;
        trace!(
            "decoded {} header fields on stream {}",
            headers.len(),
            self.stream.id
        );
        self.request_headers = headers;

        if self.fragment_end_stream {
            self.stream.close_remote();
            self.complete_request()?;
        }
        Ok(())
    }

    fn on_data(&mut self, header: &FrameHeader, data: &[u8]) -> Result<(), ConnectionError> {
        self.flow.receive_data(data.len() as u32)?;
        if self.request_body.len() + data.len() > MAX_BODY_SIZE {
            return Err(ConnectionError::new(
                ErrorCode::InternalError,
                "request body buffer full",
            ));
        }
        self.request_body.extend_from_slice(data);

        if header.is_end_stream() {
            self.stream.close_remote();
            self.complete_request()?;
        }
        Ok(())
    }

    /// Both the header block and the body are in: hand the request to the
    /// application and send its response.
    fn complete_request(&mut self) -> Result<(), ConnectionError> {
        // Replenish the connection receive window for the next request.
        let consumed = self.request_body.len() as u32;
        if consumed > 0 {
            self.flow.send_window_update(consumed)?;
            self.output
                .extend_from_slice(&frame::build_window_update(0, consumed));
        }

        let headers = std::mem::take(&mut self.request_headers);
        let body = std::mem::take(&mut self.request_body);
        validate_request_headers(&headers)?;

        let list_size = header_list_size(&headers);
        let response = if list_size > self.settings.local.get(settings::MAX_HEADER_LIST_SIZE) {
            // Stream-level condition, not a connection error.
            debug!("header list of {list_size} bytes over limit, answering 431");
            Response::new(431)
        } else {
            self.app.on_request(Request { headers, body })
        };
        self.send_response(response)
    }

    fn send_response(&mut self, response: Response) -> Result<(), ConnectionError> {
        let mut block = vec![0u8; MAX_HEADER_BLOCK_SIZE];
        let mut written = 0;
        let table_limit = self
            .settings
            .remote
            .get(settings::HEADER_TABLE_SIZE)
            .min(MAX_DYNAMIC_TABLE_SIZE);
        if let Some(new_max) = self.encoder_size_update.take() {
            written += encoder::encode_dynamic_size_update(
                &mut self.encoder_table,
                table_limit,
                new_max,
                &mut block[written..],
            )
            .map_err(|e| ConnectionError::new(e.error_code(), "size update encode failed"))?;
        }
        written += encoder::encode(&mut self.encoder_table, &response.headers, &mut block[written..])
            .map_err(|e| ConnectionError::new(e.error_code(), "header block encode failed"))?;

        let max_frame = self.settings.remote.get(settings::MAX_FRAME_SIZE) as usize;
        let end_stream = response.body.is_empty();
        let mut chunks = block[..written].chunks(max_frame).enumerate().peekable();
        while let Some((i, chunk)) = chunks.next() {
            let end_headers = chunks.peek().is_none();
            let bytes = if i == 0 {
                frame::build_headers(self.stream.id, chunk, end_headers, end_stream)
            } else {
                frame::build_continuation(self.stream.id, chunk, end_headers)
            };
            self.output.extend_from_slice(&bytes);
        }

        if end_stream {
            self.stream.close_local();
            self.finish_stream();
            return Ok(());
        }
        self.pending_body = Some(PendingBody {
            body: response.body,
            sent: 0,
        });
        self.flush_pending_body()
    }

    /// Send as much of a pending response body as the peer's windows
    /// allow; the rest waits for WINDOW_UPDATE.
    fn flush_pending_body(&mut self) -> Result<(), ConnectionError> {
        let Some(mut pending) = self.pending_body.take() else {
            return Ok(());
        };
        let max_frame = self.settings.remote.get(settings::MAX_FRAME_SIZE) as usize;
        loop {
            let remaining = pending.body.len() - pending.sent;
            if remaining == 0 {
                self.stream.close_local();
                self.finish_stream();
                return Ok(());
            }
            let n = self.flow.size_to_send(remaining).min(max_frame);
            if n == 0 {
                trace!("window exhausted, {remaining} body bytes deferred");
                self.pending_body = Some(pending);
                return Ok(());
            }
            self.flow.send_data(n as u32)?;
            let end_stream = pending.sent + n == pending.body.len();
            let chunk = &pending.body[pending.sent..pending.sent + n];
            self.output
                .extend_from_slice(&frame::build_data(self.stream.id, chunk, end_stream));
            pending.sent += n;
        }
    }

    fn finish_stream(&mut self) {
        debug!("stream {} complete", self.stream.id);
        if self.received_goaway && !self.sent_goaway {
            self.output.extend_from_slice(&frame::build_goaway(
                self.last_open_stream_id,
                ErrorCode::NoError,
            ));
            self.sent_goaway = true;
            self.state = ConnState::Closing;
        }
    }
}

/// Request pseudo-header rules (RFC 7540 Section 8.1.2).
fn validate_request_headers(headers: &[Header]) -> Result<(), ConnectionError> {
    let proto = |reason| ConnectionError::new(ErrorCode::ProtocolError, reason);
    let mut seen_regular = false;
    for header in headers {
        if header.is_pseudo() {
            if seen_regular {
                return Err(proto("pseudo-header after a regular field"));
            }
            if !matches!(
                header.name.as_str(),
                ":method" | ":scheme" | ":path" | ":authority"
            ) {
                return Err(proto("unknown request pseudo-header"));
            }
        } else {
            seen_regular = true;
        }
    }
    for required in [":method", ":scheme", ":path"] {
        if !headers.iter().any(|h| h.name == required) {
            return Err(proto("missing required pseudo-header"));
        }
    }
    Ok(())
}

/// Header list size per RFC 7540 Section 6.5.2 (name + value + 32 each).
fn header_list_size(headers: &[Header]) -> u32 {
    headers
        .iter()
        .map(|h| (h.name.len() + h.value.len() + 32) as u32)
        .sum()
}
