//! Semantic events delivered from a transport to the controller.
//!
//! Transports translate raw messages into these and hand them over in
//! arrival order; the controller consumes them one at a time on its own
//! thread.  Each event carries the session (connection generation) it came
//! from, so traffic from a closed connection can be told apart from the
//! current one.

use crate::pose::RobotData;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Connection established; traffic may flow.
    Connected { endpoint: String },
    /// Connection closed or lost.  `reason` is human-readable.
    Disconnected { reason: String },
    /// Authoritative full snapshot.
    Robot(RobotData),
}

/// A [`ClientEvent`] tagged with the session that produced it.
///
/// Sessions are numbered by the transport, starting at 1 for the first
/// connection and bumped by every connect that opens a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session: u64,
    pub event: ClientEvent,
}

impl SessionEvent {
    pub fn new(session: u64, event: ClientEvent) -> Self {
        Self { session, event }
    }
}
