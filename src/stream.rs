//! Stream lifecycle (RFC 7540 Section 5.1), reduced to the single live
//! stream this engine supports at a time.

/// Stream states. PUSH_PROMISE is not sent or honored, so the reserved
/// states never occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Open,
    HalfClosedRemote,
    HalfClosedLocal,
    Closed,
}

/// The one live stream of a connection.
#[derive(Debug, Clone, Copy)]
pub struct Stream {
    pub id: u32,
    pub state: StreamState,
}

impl Stream {
    pub fn idle() -> Self {
        Self {
            id: 0,
            state: StreamState::Idle,
        }
    }

    /// Open on the first HEADERS frame of a request.
    pub fn open(id: u32) -> Self {
        Self {
            id,
            state: StreamState::Open,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            StreamState::Open | StreamState::HalfClosedRemote | StreamState::HalfClosedLocal
        )
    }

    /// Peer set END_STREAM: its side is done sending.
    pub fn close_remote(&mut self) {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal => StreamState::Closed,
            other => other,
        };
    }

    /// This endpoint sent END_STREAM: our side is done sending.
    pub fn close_local(&mut self) {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedLocal,
            StreamState::HalfClosedRemote => StreamState::Closed,
            other => other,
        };
    }
}
