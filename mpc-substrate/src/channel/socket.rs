use crate::channel::{Channel, ChannelState, ChannelStats};
use crate::errors::MpcError;

use std::fs;
use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug)]
enum Handle {
    None,
    Listener(UnixListener),
    Stream(UnixStream),
}

/// A channel endpoint over a Unix-domain stream socket.
///
/// The listening side goes `open -> bind -> listen -> accept`; the connecting
/// side goes `open -> connect`. Accepting replaces the listening handle with
/// the accepted connection, so one endpoint serves exactly one peer.
#[derive(Debug)]
pub struct SocketChannel {
    pid: usize,
    port: u32,
    socket_prefix: String,
    handle: Handle,
    state: ChannelState,
    bound_path: Option<PathBuf>,
    receive_timeout: Option<Duration>,
    stats: ChannelStats,
}

impl SocketChannel {
    /// A fresh, unopened endpoint owned by party `pid`. Endpoints bound by
    /// this channel live at `"<socket_prefix>.<port>"`.
    pub fn new(pid: usize, socket_prefix: impl Into<String>) -> Self {
        Self {
            pid,
            port: 0,
            socket_prefix: socket_prefix.into(),
            handle: Handle::None,
            state: ChannelState::Unopened,
            bound_path: None,
            receive_timeout: None,
            stats: ChannelStats::default(),
        }
    }

    pub fn with_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn pid(&self) -> usize {
        self.pid
    }

    pub fn port(&self) -> u32 {
        self.port
    }

    pub fn address(&self, port: u32) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.socket_prefix, port))
    }

    /// Discards any previous connection and readies a fresh handle.
    /// Byte counters are left untouched.
    pub fn open(&mut self) {
        self.close();
        self.state = ChannelState::Opened;
    }

    /// Attempts to reach the endpoint at `address`.
    ///
    /// # Errors
    ///
    /// Returns `MpcError::ConnectionFailure` if the peer is not reachable yet;
    /// the channel stays open and the call may be retried.
    pub fn connect(&mut self, address: &Path) -> Result<(), MpcError> {
        self.expect_state(ChannelState::Opened, "connect")?;
        match UnixStream::connect(address) {
            Ok(stream) => {
                stream.set_read_timeout(self.receive_timeout)?;
                self.handle = Handle::Stream(stream);
                self.state = ChannelState::Connected;
                log::debug!("[P{}] connected to {}", self.pid, address.display());
                Ok(())
            }
            Err(source) => {
                log::debug!(
                    "[P{}] could not connect to {}: {}",
                    self.pid,
                    address.display(),
                    source
                );
                Err(MpcError::ConnectionFailure {
                    address: address.display().to_string(),
                    source,
                })
            }
        }
    }

    /// Binds the local endpoint for `port`.
    pub fn bind(&mut self, port: u32) -> Result<(), MpcError> {
        self.expect_state(ChannelState::Opened, "bind")?;
        let address = self.address(port);
        let listener = UnixListener::bind(&address).map_err(|source| MpcError::BindFailure {
            address: address.display().to_string(),
            source,
        })?;
        self.port = port;
        self.handle = Handle::Listener(listener);
        self.bound_path = Some(address);
        self.state = ChannelState::Bound;
        Ok(())
    }

    /// Marks the bound endpoint ready to accept. The OS backlog is already in
    /// place once `bind` returns, so this only advances the state machine.
    pub fn listen(&mut self) -> Result<(), MpcError> {
        if self.state != ChannelState::Bound {
            return Err(MpcError::ListenFailure(format!(
                "P{} cannot listen in state {:?}",
                self.pid, self.state
            )));
        }
        self.state = ChannelState::Listening;
        Ok(())
    }

    /// Blocks until one peer connects, then replaces the listening handle
    /// with the accepted connection.
    pub fn accept(&mut self) -> Result<(), MpcError> {
        self.expect_state(ChannelState::Listening, "accept")?;
        let address = self.address(self.port);
        let Handle::Listener(listener) = &self.handle else {
            return Err(MpcError::InvalidState(
                "listening channel has no listener".to_string(),
            ));
        };
        let (stream, _) = listener.accept().map_err(|source| MpcError::AcceptFailure {
            address: address.display().to_string(),
            source,
        })?;
        stream.set_read_timeout(self.receive_timeout)?;

        self.handle = Handle::Stream(stream);
        self.remove_bound_path();
        self.state = ChannelState::Connected;
        log::debug!("[P{}] accepted a peer on {}", self.pid, address.display());
        Ok(())
    }

    fn expect_state(&self, expected: ChannelState, op: &str) -> Result<(), MpcError> {
        if self.state != expected {
            return Err(MpcError::InvalidState(format!(
                "P{} cannot {} in state {:?}",
                self.pid, op, self.state
            )));
        }
        Ok(())
    }

    fn stream(&mut self, op: &str) -> Result<&mut UnixStream, MpcError> {
        match &mut self.handle {
            Handle::Stream(stream) => Ok(stream),
            _ => Err(MpcError::InvalidState(format!(
                "P{} cannot {} on an unconnected channel",
                self.pid, op
            ))),
        }
    }

    fn remove_bound_path(&mut self) {
        if let Some(path) = self.bound_path.take() {
            let _ = fs::remove_file(path);
        }
    }
}

impl Channel for SocketChannel {
    fn send(&mut self, data: &[u8]) -> Result<(), MpcError> {
        self.stats.bytes_sent += data.len() as u64;
        let stream = self.stream("send")?;
        stream
            .write_all(data)
            .map_err(|e| MpcError::from_transfer(e, "send"))?;
        stream.flush().map_err(|e| MpcError::from_transfer(e, "send"))
    }

    fn receive(&mut self, len: usize) -> Result<Vec<u8>, MpcError> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let read = match self.stream("receive")?.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(MpcError::TruncatedTransfer {
                        expected: len,
                        received: filled,
                    });
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(MpcError::from_transfer(e, "receive")),
            };
            // Remaining bytes shrink by exactly what this read returned.
            filled += read;
            self.stats.bytes_received += read as u64;
        }
        Ok(buf)
    }

    fn close(&mut self) {
        if let Handle::Stream(stream) = &self.handle {
            // The peer may already be gone; shutdown is best effort.
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.handle = Handle::None;
        self.remove_bound_path();
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

impl Drop for SocketChannel {
    fn drop(&mut self) {
        self.close();
    }
}
