use crate::channel::{Channel, MemoryChannel, SocketChannel};
use crate::config::NetworkConfig;
use crate::errors::MpcError;
use crate::topology::{PeerLink, Topology};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

/// Produces the connected channel for one [`PeerLink`].
///
/// `accept` is called for links where the local party is the listener,
/// `connect` for links where it is the connector. Both block until the
/// channel is connected or fail.
pub trait ChannelFactory {
    type Channel: Channel;

    fn accept(&self, link: &PeerLink) -> Result<Self::Channel, MpcError>;

    fn connect(&self, link: &PeerLink) -> Result<Self::Channel, MpcError>;
}

/// Opens Unix-domain socket channels at the addresses given by a [`NetworkConfig`].
#[derive(Debug, Clone)]
pub struct SocketFactory {
    config: NetworkConfig,
}

impl SocketFactory {
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    fn fresh_channel(&self, link: &PeerLink) -> SocketChannel {
        let mut channel = SocketChannel::new(link.local, self.config.socket_prefix.clone())
            .with_receive_timeout(self.config.receive_timeout());
        channel.open();
        channel
    }
}

impl ChannelFactory for SocketFactory {
    type Channel = SocketChannel;

    fn accept(&self, link: &PeerLink) -> Result<SocketChannel, MpcError> {
        let mut channel = self.fresh_channel(link);
        channel.bind(link.port)?;
        channel.listen()?;
        log::debug!(
            "[P{}] waiting for P{} on port {}",
            link.local,
            link.peer,
            link.port
        );
        channel.accept()?;
        Ok(channel)
    }

    /// Retries with exponential backoff until `connect_timeout_ms` has passed.
    fn connect(&self, link: &PeerLink) -> Result<SocketChannel, MpcError> {
        let mut channel = self.fresh_channel(link);
        let address = self.config.address(link.port);
        let deadline = Instant::now() + self.config.connect_timeout();
        let mut backoff = self.config.connect_backoff();
        let mut attempts = 1u32;

        loop {
            match channel.connect(&address) {
                Ok(()) => return Ok(channel),
                Err(err) if err.is_recoverable() && Instant::now() + backoff < deadline => {
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(self.config.max_backoff());
                    attempts += 1;
                }
                Err(err) => {
                    log::warn!(
                        "[P{}] giving up on P{} after {} attempts: {}",
                        link.local,
                        link.peer,
                        attempts,
                        err
                    );
                    return Err(err);
                }
            }
        }
    }
}

/// Hands out pre-connected [`MemoryChannel`] ends, one per direction of
/// every pair in a topology. Clones share the same pool, so each party
/// thread can hold its own handle.
#[derive(Debug, Clone)]
pub struct MemoryHub {
    ends: Arc<Mutex<HashMap<(usize, usize), MemoryChannel>>>,
}

impl MemoryHub {
    pub fn new(topology: &Topology) -> Self {
        let mut ends = HashMap::new();
        for &(i, j) in topology.pairs() {
            let (a, b) = MemoryChannel::pair();
            ends.insert((i, j), a);
            ends.insert((j, i), b);
        }
        Self {
            ends: Arc::new(Mutex::new(ends)),
        }
    }

    fn take(&self, link: &PeerLink) -> Result<MemoryChannel, MpcError> {
        let mut ends = self
            .ends
            .lock()
            .map_err(|_| MpcError::InvalidState("memory hub lock poisoned".to_string()))?;
        ends.remove(&(link.local, link.peer)).ok_or_else(|| {
            MpcError::InvalidState(format!(
                "no channel left for P{} -> P{}",
                link.local, link.peer
            ))
        })
    }
}

impl ChannelFactory for MemoryHub {
    type Channel = MemoryChannel;

    fn accept(&self, link: &PeerLink) -> Result<MemoryChannel, MpcError> {
        self.take(link)
    }

    fn connect(&self, link: &PeerLink) -> Result<MemoryChannel, MpcError> {
        self.take(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelState;

    #[test]
    fn test_memory_hub_hands_out_each_end_once() -> Result<(), MpcError> {
        let topology = Topology::new(3, 0)?;
        let hub = MemoryHub::new(&topology);
        let link = topology.links_for(0)?[0];

        let mut end = hub.accept(&link)?;
        assert_eq!(end.state(), ChannelState::Connected);
        assert!(hub.accept(&link).is_err());

        let mirror = topology.links_for(1)?[0];
        let mut other = hub.clone().connect(&mirror)?;
        end.send(b"hi")?;
        assert_eq!(other.receive(2)?, b"hi".to_vec());
        Ok(())
    }

    #[test]
    fn test_socket_connect_gives_up_after_deadline() -> Result<(), MpcError> {
        let config = NetworkConfig {
            socket_prefix: std::env::temp_dir()
                .join(format!("mpc-factory-test-{}", std::process::id()))
                .to_string_lossy()
                .into_owned(),
            connect_timeout_ms: 50,
            connect_backoff_ms: 5,
            ..Default::default()
        };
        let topology = Topology::new(2, config.base_port)?;
        let factory = SocketFactory::new(config);
        let link = topology.links_for(1)?[0];

        let started = Instant::now();
        let err = factory.connect(&link).unwrap_err();
        assert!(matches!(err, MpcError::ConnectionFailure { .. }));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        Ok(())
    }
}
