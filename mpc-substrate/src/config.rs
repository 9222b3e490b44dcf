use crate::errors::MpcError;
use crate::topology::MAX_PARTIES;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Deployment parameters shared by every party process.
///
/// Loaded from JSON; any field missing from the file takes its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Number of parties N.
    pub parties: usize,
    /// Filesystem prefix of every local stream endpoint (`<prefix>.<port>`).
    pub socket_prefix: String,
    /// Port assigned to the first pair; pairs take consecutive ports.
    pub base_port: u32,
    /// How long a connector keeps retrying before giving up.
    pub connect_timeout_ms: u64,
    /// First retry delay; doubled after each failed attempt.
    pub connect_backoff_ms: u64,
    /// Upper bound on the retry delay.
    pub max_backoff_ms: u64,
    /// `None` blocks forever on receive.
    pub receive_timeout_ms: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            parties: 3,
            socket_prefix: std::env::temp_dir()
                .join("mpc-substrate.sock")
                .to_string_lossy()
                .into_owned(),
            base_port: 10_000,
            connect_timeout_ms: 10_000,
            connect_backoff_ms: 20,
            max_backoff_ms: 1_000,
            receive_timeout_ms: None,
        }
    }
}

impl NetworkConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MpcError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty JSON, so children can be pointed at it.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<(), MpcError> {
        fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), MpcError> {
        if self.parties == 0 {
            return Err(MpcError::InvalidConfig(
                "Number of parties must be > 0".to_string(),
            ));
        }
        if self.socket_prefix.is_empty() {
            return Err(MpcError::InvalidConfig(
                "Socket prefix must not be empty".to_string(),
            ));
        }
        if self.parties > MAX_PARTIES {
            return Err(MpcError::InvalidConfig(format!(
                "Number of parties must be <= {}, got {}",
                MAX_PARTIES, self.parties
            )));
        }
        let pair_count = (self.parties * (self.parties - 1) / 2) as u64;
        if self.base_port as u64 + pair_count > u32::MAX as u64 {
            return Err(MpcError::InvalidConfig(format!(
                "Ports for {} pairs overflow from base port {}",
                pair_count, self.base_port
            )));
        }
        Ok(())
    }

    /// The local endpoint address for `port`: `"<prefix>.<port>"`.
    ///
    /// # Example
    ///
    /// ```
    /// # use mpc_substrate::config::NetworkConfig;
    /// let config = NetworkConfig { socket_prefix: "/tmp/sock".to_string(), ..Default::default() };
    /// assert_eq!(config.address(10002).to_str(), Some("/tmp/sock.10002"));
    /// ```
    pub fn address(&self, port: u32) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.socket_prefix, port))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() -> Result<(), MpcError> {
        let config = NetworkConfig::default();
        config.validate()?;
        assert_eq!(config.parties, 3);
        assert!(config.receive_timeout().is_none());
        Ok(())
    }

    #[test]
    fn test_partial_json_takes_defaults() -> Result<(), MpcError> {
        let config: NetworkConfig =
            serde_json::from_str(r#"{ "parties": 4, "receive_timeout_ms": 250 }"#)?;
        assert_eq!(config.parties, 4);
        assert_eq!(config.base_port, NetworkConfig::default().base_port);
        assert_eq!(config.receive_timeout(), Some(Duration::from_millis(250)));
        Ok(())
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let zero = NetworkConfig {
            parties: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let overflow = NetworkConfig {
            base_port: u32::MAX,
            ..Default::default()
        };
        assert!(overflow.validate().is_err());

        let huge: NetworkConfig =
            serde_json::from_str(r#"{ "parties": 18446744073709551615 }"#)
                .unwrap();
        assert_eq!(huge.parties, usize::MAX);
        assert!(matches!(huge.validate(), Err(MpcError::InvalidConfig(_))));

        let too_many = NetworkConfig {
            parties: MAX_PARTIES + 1,
            ..Default::default()
        };
        assert!(too_many.validate().is_err());

        let empty = NetworkConfig {
            socket_prefix: String::new(),
            ..Default::default()
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_store_and_load() -> Result<(), MpcError> {
        let path = std::env::temp_dir().join(format!(
            "mpc-substrate-config-{}.json",
            std::process::id()
        ));
        let config = NetworkConfig {
            parties: 5,
            ..Default::default()
        };
        config.store(&path)?;
        let loaded = NetworkConfig::load(&path);
        let _ = fs::remove_file(&path);
        assert_eq!(loaded?, config);
        Ok(())
    }
}
