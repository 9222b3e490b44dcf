//! The per-party environment a protocol runs in.
//!
//! A [`Network`] owns one connected [`Channel`] per peer and exposes typed
//! send/receive helpers on top of length-prefixed frames.

pub mod factory;

pub use factory::{ChannelFactory, MemoryHub, SocketFactory};

use crate::channel::{Channel, ChannelState, ChannelStats};
use crate::errors::MpcError;
use crate::field::{Element, Fp, Matrix, Vector};
use crate::topology::{Role, Topology};

use std::collections::BTreeMap;

use serde::Serialize;

/// State and traffic of the channel to one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelReport {
    pub peer: usize,
    pub state: ChannelState,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

#[derive(Debug)]
pub struct Network<C: Channel> {
    pid: usize,
    topology: Topology,
    channels: BTreeMap<usize, C>,
}

impl<C: Channel> Network<C> {
    /// Establishes a channel to every peer of `pid`, in peer order: accepting
    /// where `pid` is the lower id of the pair, connecting otherwise.
    pub fn initialize<F>(pid: usize, topology: &Topology, factory: &F) -> Result<Self, MpcError>
    where
        F: ChannelFactory<Channel = C>,
    {
        let mut channels = BTreeMap::new();
        for link in topology.links_for(pid)? {
            let channel = match link.role {
                Role::Listener => factory.accept(&link)?,
                Role::Connector => factory.connect(&link)?,
            };
            log::debug!(
                "[P{}] channel to P{} up on port {} ({:?})",
                pid,
                link.peer,
                link.port,
                link.role
            );
            channels.insert(link.peer, channel);
        }
        log::info!("[P{}] connected to {} peers", pid, channels.len());
        Ok(Self {
            pid,
            topology: topology.clone(),
            channels,
        })
    }

    pub fn pid(&self) -> usize {
        self.pid
    }

    pub fn parties(&self) -> usize {
        self.topology.parties()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Peer ids in ascending order.
    pub fn peers(&self) -> Vec<usize> {
        self.channels.keys().copied().collect()
    }

    pub fn channel(&self, peer: usize) -> Option<&C> {
        self.channels.get(&peer)
    }

    fn channel_mut(&mut self, peer: usize) -> Result<&mut C, MpcError> {
        let pid = self.pid;
        self.channels.get_mut(&peer).ok_or_else(|| {
            MpcError::Topology(format!("P{} has no channel to P{}", pid, peer))
        })
    }

    /// One byte on the wire: `1` for true, `0` for false.
    pub fn send_bool(&mut self, value: bool, peer: usize) -> Result<(), MpcError> {
        self.channel_mut(peer)?.send(&[u8::from(value)])
    }

    pub fn receive_bool(&mut self, peer: usize) -> Result<bool, MpcError> {
        let byte = self.channel_mut(peer)?.receive(1)?;
        match byte[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(MpcError::Decode(format!(
                "{} from P{} is not a boolean",
                other, peer
            ))),
        }
    }

    pub fn send_frame(&mut self, payload: &[u8], peer: usize) -> Result<(), MpcError> {
        log::trace!("[P{}] -> P{}: {} bytes", self.pid, peer, payload.len());
        self.channel_mut(peer)?.send_frame(payload)
    }

    pub fn receive_frame(&mut self, peer: usize) -> Result<Vec<u8>, MpcError> {
        let payload = self.channel_mut(peer)?.receive_frame()?;
        log::trace!("[P{}] <- P{}: {} bytes", self.pid, peer, payload.len());
        Ok(payload)
    }

    pub fn send_field<const P: u64>(&mut self, value: &Fp<P>, peer: usize) -> Result<(), MpcError> {
        self.send_frame(&value.to_bytes(), peer)
    }

    pub fn receive_field<const P: u64>(&mut self, peer: usize) -> Result<Fp<P>, MpcError> {
        Ok(Fp::from_bytes(&self.receive_frame(peer)?))
    }

    pub fn send_vector<T: Element>(&mut self, vector: &Vector<T>, peer: usize) -> Result<(), MpcError> {
        self.send_frame(&vector.to_bytes(), peer)
    }

    pub fn receive_vector<T: Element>(&mut self, peer: usize) -> Result<Vector<T>, MpcError> {
        Vector::from_bytes(&self.receive_frame(peer)?)
    }

    pub fn send_matrix<const P: u64>(&mut self, matrix: &Matrix<P>, peer: usize) -> Result<(), MpcError> {
        self.send_frame(&matrix.to_bytes(), peer)
    }

    pub fn receive_matrix<const P: u64>(&mut self, peer: usize) -> Result<Matrix<P>, MpcError> {
        Matrix::from_bytes(&self.receive_frame(peer)?)
    }

    /// Closes every channel. Safe to call more than once.
    pub fn clean_up(&mut self) {
        for (peer, channel) in self.channels.iter_mut() {
            if channel.state() != ChannelState::Closed {
                log::debug!("[P{}] closing channel to P{}", self.pid, peer);
            }
            channel.close();
        }
    }

    pub fn channel_report(&self) -> Vec<ChannelReport> {
        self.channels
            .iter()
            .map(|(&peer, channel)| {
                let ChannelStats {
                    bytes_sent,
                    bytes_received,
                } = channel.stats();
                ChannelReport {
                    peer,
                    state: channel.state(),
                    bytes_sent,
                    bytes_received,
                }
            })
            .collect()
    }

    pub fn reset_stats(&mut self) {
        self.channels.values_mut().for_each(|c| c.reset_stats());
    }
}
