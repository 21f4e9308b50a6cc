//! Flow-control window arithmetic (RFC 7540 Sections 5.2 and 6.9).
//!
//! Windows are signed 32-bit counters split into a size and a used part;
//! the available budget is `window_size - window_used`. Three windows are
//! tracked: one incoming (the single live stream collapses into the
//! connection window on the receive side) and an outgoing pair, since the
//! peer accounts the connection and the stream separately.

use crate::error::{ConnectionError, ErrorCode};

const MAX_WINDOW: i64 = i32::MAX as i64;

/// Scope of a WINDOW_UPDATE, selected by the frame's stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowScope {
    Connection,
    Stream,
}

#[derive(Debug, Clone, Copy)]
pub struct FlowControlWindow {
    window_size: i32,
    window_used: i32,
}

impl FlowControlWindow {
    fn new(window_size: i32) -> Self {
        Self {
            window_size,
            window_used: 0,
        }
    }

    pub fn available(&self) -> i32 {
        self.window_size - self.window_used
    }
}

/// All windows of one connection.
#[derive(Debug)]
pub struct FlowControl {
    incoming: FlowControlWindow,
    outgoing_connection: FlowControlWindow,
    outgoing_stream: FlowControlWindow,
}

impl FlowControl {
    pub fn new(initial_window_size: u32) -> Self {
        let size = initial_window_size as i32;
        Self {
            incoming: FlowControlWindow::new(size),
            outgoing_connection: FlowControlWindow::new(size),
            outgoing_stream: FlowControlWindow::new(size),
        }
    }

    pub fn incoming_available(&self) -> i32 {
        self.incoming.available()
    }

    /// Budget for outgoing DATA: the peer enforces both the connection and
    /// the stream window, so the smaller one binds.
    pub fn outgoing_available(&self) -> i32 {
        self.outgoing_connection
            .available()
            .min(self.outgoing_stream.available())
    }

    /// Account a received DATA payload against the incoming window.
    pub fn receive_data(&mut self, length: u32) -> Result<(), ConnectionError> {
        if length as i64 > self.incoming.available() as i64 {
            return Err(ConnectionError::new(
                ErrorCode::FlowControlError,
                "DATA exceeds incoming flow-control window",
            ));
        }
        self.incoming.window_used += length as i32;
        Ok(())
    }

    /// Account DATA about to be sent against both outgoing windows.
    pub fn send_data(&mut self, length: u32) -> Result<(), ConnectionError> {
        if length as i64 > self.outgoing_available() as i64 {
            return Err(ConnectionError::new(
                ErrorCode::FlowControlError,
                "DATA exceeds outgoing flow-control window",
            ));
        }
        self.outgoing_connection.window_used += length as i32;
        self.outgoing_stream.window_used += length as i32;
        Ok(())
    }

    /// Apply a WINDOW_UPDATE from the peer, widening the outgoing budget.
    pub fn receive_window_update(
        &mut self,
        scope: WindowScope,
        increment: u32,
    ) -> Result<(), ConnectionError> {
        let window = match scope {
            WindowScope::Connection => &mut self.outgoing_connection,
            WindowScope::Stream => &mut self.outgoing_stream,
        };
        let new_available = window.available() as i64 + increment as i64;
        if new_available > MAX_WINDOW {
            return Err(ConnectionError::new(
                ErrorCode::FlowControlError,
                "window increment overflows 2^31-1",
            ));
        }
        window.window_used -= increment as i32;
        Ok(())
    }

    /// Widen the incoming window after consuming received DATA; mirrors a
    /// WINDOW_UPDATE this endpoint sends.
    pub fn send_window_update(&mut self, increment: u32) -> Result<(), ConnectionError> {
        if (increment as i64) > self.incoming.window_used as i64 {
            return Err(ConnectionError::new(
                ErrorCode::InternalError,
                "window update below zero used bytes",
            ));
        }
        self.incoming.window_used -= increment as i32;
        Ok(())
    }

    /// A SETTINGS_INITIAL_WINDOW_SIZE change shifts stream-scoped windows
    /// by the delta (RFC 7540 Section 6.9.2); the connection window is
    /// unaffected.
    pub fn apply_initial_window_size_change(
        &mut self,
        old: u32,
        new: u32,
    ) -> Result<(), ConnectionError> {
        let delta = new as i64 - old as i64;
        let shifted = self.outgoing_stream.window_size as i64 + delta;
        if shifted > MAX_WINDOW {
            return Err(ConnectionError::new(
                ErrorCode::FlowControlError,
                "initial window size change overflows 2^31-1",
            ));
        }
        self.outgoing_stream.window_size = shifted as i32;
        Ok(())
    }

    /// Reset the stream-scoped outgoing window for a fresh stream.
    pub fn reset_stream_window(&mut self, initial_window_size: u32) {
        self.outgoing_stream = FlowControlWindow::new(initial_window_size as i32);
    }

    /// Bytes of a pending body that may go out right now.
    pub fn size_to_send(&self, bytes_remaining: usize) -> usize {
        let available = self.outgoing_available().max(0) as usize;
        available.min(bytes_remaining)
    }
}
