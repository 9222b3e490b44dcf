use std::io;

#[derive(thiserror::Error, Debug)]
pub enum MpcError {
    /// Error when trying to invert an element that has no inverse (zero).
    #[error("NoInverse: {0}")]
    NoInverse(String),
    /// Elementwise operation on operands of different length or shape.
    #[error("DimensionMismatch: {0}")]
    DimensionMismatch(String),
    #[error("IndexOutOfBounds: index {index} is out of range for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("Decode: {0}")]
    Decode(String),

    /// `connect` could not reach the peer. The only recoverable transport error.
    #[error("ConnectionFailure: could not connect to {address}: {source}")]
    ConnectionFailure { address: String, source: io::Error },
    /// The peer closed the stream before the requested number of bytes arrived.
    #[error("TruncatedTransfer: expected {expected} bytes, stream closed after {received}")]
    TruncatedTransfer { expected: usize, received: usize },
    #[error("BindFailure: could not bind {address}: {source}")]
    BindFailure { address: String, source: io::Error },
    #[error("ListenFailure: {0}")]
    ListenFailure(String),
    #[error("AcceptFailure: could not accept on {address}: {source}")]
    AcceptFailure { address: String, source: io::Error },
    #[error("InvalidState: {0}")]
    InvalidState(String),
    #[error("Transport: {0}")]
    Transport(io::Error),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),

    #[error("ProtocolFailure: protocol abnormally terminated for P{pid}")]
    ProtocolFailure { pid: usize },
    #[error("Topology: {0}")]
    Topology(String),
    #[error("InvalidConfig: {0}")]
    InvalidConfig(String),
    #[error("Spawn: {0}")]
    Spawn(String),

    #[error("Data serialization: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Io: {0}")]
    Io(#[from] io::Error),
}

impl MpcError {
    /// Only a failed `connect` may be retried; every other error is fatal for the party.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MpcError::ConnectionFailure { .. })
    }

    /// Maps an I/O error from a blocking read or write, turning an elapsed
    /// socket timeout into [`MpcError::Timeout`].
    pub(crate) fn from_transfer(err: io::Error, what: &str) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                MpcError::Timeout(format!("{what} timed out"))
            }
            _ => MpcError::Transport(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connection_failure_is_recoverable() {
        let refused = MpcError::ConnectionFailure {
            address: "/tmp/x.1".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(refused.is_recoverable());
        assert!(!MpcError::ProtocolFailure { pid: 0 }.is_recoverable());
        assert!(!MpcError::TruncatedTransfer { expected: 8, received: 3 }.is_recoverable());
    }

    #[test]
    fn test_timeouts_are_distinguished() {
        let err = MpcError::from_transfer(io::Error::from(io::ErrorKind::WouldBlock), "receive");
        assert!(matches!(err, MpcError::Timeout(_)));

        let err = MpcError::from_transfer(io::Error::from(io::ErrorKind::BrokenPipe), "send");
        assert!(matches!(err, MpcError::Transport(_)));
    }
}
