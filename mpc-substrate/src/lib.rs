//! Building blocks for running an N-party secure computation on one machine:
//! prime-field arithmetic, vectors and matrices of field elements with a
//! textual wire form, point-to-point channels over local sockets and the
//! full-mesh bootstrap that connects every party to every other one.

pub mod bootstrap;
pub mod channel;
pub mod codec;
pub mod config;
pub mod errors;
pub mod field;
pub mod network;
pub mod topology;

pub use bootstrap::{PartyLauncher, PartyReport, Protocol, cleanup_stale_endpoints, run_party};
pub use channel::{Channel, ChannelState, MemoryChannel, SocketChannel};
pub use config::NetworkConfig;
pub use errors::MpcError;
pub use field::{BASE_P, FieldElement, FieldMatrix, FieldVector, Fp, Matrix, Vector};
pub use network::{ChannelFactory, MemoryHub, Network, SocketFactory};
pub use topology::Topology;
