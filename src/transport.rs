//! Transport capability consumed by the controller.
//!
//! A transport emits named events and reports its connection state; inbound
//! traffic is delivered separately as [`SessionEvent`](crate::events::SessionEvent)s
//! tagged with [`Transport::session`].
//! Every transport starts disconnected and only opens its channel on an
//! explicit [`Transport::connect`], so scene setup can finish first.
//!
//! Nothing here retries or buffers: a frame emitted while disconnected is
//! reported as [`Error::NotConnected`] and dropped.

use crate::error::{Error, Result};
use crate::protocol::Frame;

pub trait Transport {
    /// Open the single session connection.  Calling it while connected is a
    /// no-op.
    fn connect(&mut self) -> Result<()>;

    /// Close the connection.  No further frames are sent or received.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Number of the current (or most recent) connection; 0 before the
    /// first connect.
    fn session(&self) -> u64;

    /// Send one frame, fire-and-forget.
    fn emit(&mut self, frame: Frame) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Loopback
// ---------------------------------------------------------------------------

/// In-memory transport that records every emitted frame.
///
/// Used by tests and by the console in `--offline` mode.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    connected: bool,
    session: u64,
    sent: Vec<Frame>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames emitted so far, oldest first.
    pub fn sent(&self) -> &[Frame] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for LoopbackTransport {
    fn connect(&mut self) -> Result<()> {
        if !self.connected {
            self.connected = true;
            self.session += 1;
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn session(&self) -> u64 {
        self.session
    }

    fn emit(&mut self, frame: Frame) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.sent.push(frame);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
