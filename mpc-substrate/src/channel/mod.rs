//! Point-to-point byte channels between two parties.
//!
//! [`Channel`] is the seam the rest of the crate talks to. [`SocketChannel`]
//! is the Unix-domain stream realisation used between party processes, and
//! [`MemoryChannel`] is an in-process one for tests and single-process runs.

pub mod memory;
pub mod socket;

pub use memory::MemoryChannel;
pub use socket::SocketChannel;

use crate::errors::MpcError;

use serde::Serialize;

/// Largest payload accepted by [`Channel::receive_frame`] (64 MiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Lifecycle of a channel endpoint. `Closed` is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ChannelState {
    Unopened,
    Opened,
    Bound,
    Listening,
    Connected,
    Closed,
}

/// Cumulative traffic counters, kept for instrumentation only.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// An ordered, reliable byte stream to exactly one peer.
pub trait Channel {
    /// Transmits all of `data` or fails; there is no partial send.
    ///
    /// The sent-byte counter is advanced before transmission, so it reflects
    /// what was attempted rather than what was delivered.
    fn send(&mut self, data: &[u8]) -> Result<(), MpcError>;

    /// Returns exactly `len` bytes, reassembled from as many underlying reads
    /// as it takes.
    ///
    /// # Errors
    ///
    /// Returns `MpcError::TruncatedTransfer` if the peer closes the stream
    /// first, and `MpcError::Timeout` if a configured receive timeout elapses.
    fn receive(&mut self, len: usize) -> Result<Vec<u8>, MpcError>;

    /// Shuts the channel down. Safe to call any number of times, in any state.
    fn close(&mut self);

    fn state(&self) -> ChannelState;

    fn stats(&self) -> ChannelStats;

    fn reset_stats(&mut self);

    fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Sends `payload` behind a 4-byte big-endian length prefix.
    fn send_frame(&mut self, payload: &[u8]) -> Result<(), MpcError> {
        if payload.len() > MAX_FRAME_SIZE {
            return Err(MpcError::FrameTooLarge(payload.len()));
        }
        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(payload);
        self.send(&frame)
    }

    /// Receives one payload written by [`Channel::send_frame`].
    fn receive_frame(&mut self) -> Result<Vec<u8>, MpcError> {
        let header = self.receive(4)?;
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(MpcError::FrameTooLarge(len));
        }
        self.receive(len)
    }
}
