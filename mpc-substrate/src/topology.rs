//! Full-mesh wiring between N parties.
//!
//! Every unordered pair `(i, j)` with `i < j` gets one channel and one port.
//! The port is a pure function of the pair, so each party works out whom to
//! reach where without any rendezvous service.

use crate::errors::MpcError;

use serde::{Deserialize, Serialize};

/// Which end of a pairwise channel a party plays.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Lower pid of the pair: binds, listens and accepts.
    Listener,
    /// Higher pid of the pair: connects.
    Connector,
}

/// One pairwise channel as seen from a single party.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerLink {
    pub local: usize,
    pub peer: usize,
    pub port: u32,
    pub role: Role,
}

/// Largest supported deployment; the full mesh keeps one port per pair.
pub const MAX_PARTIES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    parties: usize,
    base_port: u32,
    pairs: Vec<(usize, usize)>,
}

impl Topology {
    /// Builds the full mesh for `parties` parties with ports starting at `base_port`.
    ///
    /// # Example
    ///
    /// ```
    /// # use mpc_substrate::topology::Topology;
    /// let topology = Topology::new(3, 10_000).unwrap();
    /// assert_eq!(topology.pairs(), &[(0, 1), (0, 2), (1, 2)]);
    /// ```
    pub fn new(parties: usize, base_port: u32) -> Result<Self, MpcError> {
        if parties == 0 {
            return Err(MpcError::Topology(
                "A topology needs at least one party".to_string(),
            ));
        }
        if parties > MAX_PARTIES {
            return Err(MpcError::Topology(format!(
                "{} parties exceed the maximum of {}",
                parties, MAX_PARTIES
            )));
        }
        let pairs: Vec<(usize, usize)> = (0..parties)
            .flat_map(|i| (i + 1..parties).map(move |j| (i, j)))
            .collect();
        if base_port as u64 + pairs.len() as u64 > u32::MAX as u64 {
            return Err(MpcError::Topology(format!(
                "Ports for {} pairs overflow from base port {}",
                pairs.len(),
                base_port
            )));
        }
        Ok(Self {
            parties,
            base_port,
            pairs,
        })
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Every port used by the deployment, one per pair.
    pub fn ports(&self) -> Vec<u32> {
        self.pairs
            .iter()
            .map(|&(i, j)| self.pair_port_unchecked(i, j))
            .collect()
    }

    /// The port of the pair `{a, b}`; symmetric in its arguments.
    ///
    /// # Errors
    ///
    /// Returns `MpcError::Topology` if either pid is out of range or `a == b`.
    pub fn port_for_pair(&self, a: usize, b: usize) -> Result<u32, MpcError> {
        if a == b || a >= self.parties || b >= self.parties {
            return Err(MpcError::Topology(format!(
                "({}, {}) is not a pair of distinct parties among {}",
                a, b, self.parties
            )));
        }
        Ok(self.pair_port_unchecked(a.min(b), a.max(b)))
    }

    /// Triangular index of `(i, j)`, `i < j`, in the order of [`Topology::pairs`].
    fn pair_port_unchecked(&self, i: usize, j: usize) -> u32 {
        let n = self.parties;
        let index = i * (2 * n - i - 1) / 2 + (j - i - 1);
        self.base_port + index as u32
    }

    /// The channels party `pid` has to establish, ordered by peer pid.
    pub fn links_for(&self, pid: usize) -> Result<Vec<PeerLink>, MpcError> {
        if pid >= self.parties {
            return Err(MpcError::Topology(format!(
                "P{} is not one of {} parties",
                pid, self.parties
            )));
        }
        (0..self.parties)
            .filter(|&peer| peer != pid)
            .map(|peer| {
                Ok(PeerLink {
                    local: pid,
                    peer,
                    port: self.port_for_pair(pid, peer)?,
                    role: if pid < peer {
                        Role::Listener
                    } else {
                        Role::Connector
                    },
                })
            })
            .collect()
    }

    /// The parties taking part in the final liveness handshake: the last
    /// party signals pid 0 that it no longer needs it online.
    pub fn drain_pair(&self) -> Option<(usize, usize)> {
        (self.parties > 1).then(|| (0, self.parties - 1))
    }
}
