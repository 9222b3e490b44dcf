use crate::channel::{Channel, ChannelState, ChannelStats};
use crate::errors::MpcError;

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::time::Duration;

/// One end of an in-process channel pair.
///
/// Every `send` travels as a separate fragment, so a `receive` spanning
/// several sends goes through the same reassembly as a socket read loop.
#[derive(Debug)]
pub struct MemoryChannel {
    tx: Option<Sender<Vec<u8>>>,
    rx: Option<Receiver<Vec<u8>>>,
    pending: VecDeque<u8>,
    state: ChannelState,
    stats: ChannelStats,
    receive_timeout: Option<Duration>,
}

impl MemoryChannel {
    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        let (send_a_to_b, recv_a_to_b) = channel();
        let (send_b_to_a, recv_b_to_a) = channel();
        (
            Self::connected(send_a_to_b, recv_b_to_a),
            Self::connected(send_b_to_a, recv_a_to_b),
        )
    }

    fn connected(tx: Sender<Vec<u8>>, rx: Receiver<Vec<u8>>) -> Self {
        Self {
            tx: Some(tx),
            rx: Some(rx),
            pending: VecDeque::new(),
            state: ChannelState::Connected,
            stats: ChannelStats::default(),
            receive_timeout: None,
        }
    }

    pub fn with_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receive_timeout = timeout;
        self
    }

    fn next_fragment(&mut self, expected: usize) -> Result<(), MpcError> {
        let rx = self.rx.as_ref().ok_or_else(|| {
            MpcError::InvalidState("receive on a closed channel".to_string())
        })?;
        let fragment = match self.receive_timeout {
            Some(timeout) => rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => MpcError::Timeout("receive timed out".to_string()),
                RecvTimeoutError::Disconnected => MpcError::TruncatedTransfer {
                    expected,
                    received: self.pending.len(),
                },
            })?,
            None => rx.recv().map_err(|_| MpcError::TruncatedTransfer {
                expected,
                received: self.pending.len(),
            })?,
        };
        self.pending.extend(fragment);
        Ok(())
    }
}

impl Channel for MemoryChannel {
    fn send(&mut self, data: &[u8]) -> Result<(), MpcError> {
        self.stats.bytes_sent += data.len() as u64;
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| MpcError::InvalidState("send on a closed channel".to_string()))?;
        tx.send(data.to_vec()).map_err(|_| {
            MpcError::Transport(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        })
    }

    fn receive(&mut self, len: usize) -> Result<Vec<u8>, MpcError> {
        while self.pending.len() < len {
            self.next_fragment(len)?;
        }
        self.stats.bytes_received += len as u64;
        Ok(self.pending.drain(..len).collect())
    }

    fn close(&mut self) {
        self.tx = None;
        self.rx = None;
        self.pending.clear();
        self.state = ChannelState::Closed;
    }

    fn state(&self) -> ChannelState {
        self.state
    }

    fn stats(&self) -> ChannelStats {
        self.stats
    }

    fn reset_stats(&mut self) {
        self.stats = ChannelStats::default();
    }
}
