//! Relay configuration.
//!
//! Unlike the rest of the corpus, this crate's configuration is a plain
//! `serde`-deserializable struct loaded from an optional TOML file, rather
//! than layered config-source resolution: OTP's external contract is
//! "constructor-supplied configuration" (OTP §6), so there is no directory
//! search path, no environment variable overrides, and no config-merging to
//! get right.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

/// Default per-step handshake timeout (OTP §4.2).
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default route-phase read segment size (OTP §4.1, "Route phase").
pub const DEFAULT_SEGMENT_SIZE: usize = 32;
/// Default interval between heartbeats to a configured pool index.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
/// Default log level used until a configuration overrides it.
pub const DEFAULT_LOG_LEVEL: tracing::Level = tracing::Level::INFO;

/// Configuration for a single relay process.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Address to accept predecessor connections on.
    pub listen: SocketAddr,
    /// Address of a pool index to heartbeat to, if any.
    #[serde(default)]
    pub pool_index: Option<SocketAddr>,
    /// Per-step handshake timeout.
    #[serde(default = "default_handshake_timeout", with = "humantime_serde")]
    pub handshake_timeout: Duration,
    /// Route-phase read segment size, in bytes.
    #[serde(default = "default_segment_size")]
    pub segment_size: usize,
    /// How often to heartbeat to `pool_index`, if configured.
    #[serde(default = "default_heartbeat_interval", with = "humantime_serde")]
    pub heartbeat_interval: Duration,
}

/// Serde default for [`RelayConfig::handshake_timeout`].
fn default_handshake_timeout() -> Duration {
    DEFAULT_HANDSHAKE_TIMEOUT
}

/// Serde default for [`RelayConfig::segment_size`].
fn default_segment_size() -> usize {
    DEFAULT_SEGMENT_SIZE
}

/// Serde default for [`RelayConfig::heartbeat_interval`].
fn default_heartbeat_interval() -> Duration {
    DEFAULT_HEARTBEAT_INTERVAL
}

impl RelayConfig {
    /// Build a config from just the fields the embedding API contract
    /// names (OTP §6): a listen address and an optional pool index.
    pub fn new(listen: SocketAddr, pool_index: Option<SocketAddr>) -> Self {
        Self {
            listen,
            pool_index,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            segment_size: DEFAULT_SEGMENT_SIZE,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minimal_toml_fills_in_defaults() {
        let cfg = RelayConfig::from_toml("listen = \"127.0.0.1:9001\"").unwrap();
        assert_eq!(cfg.listen, "127.0.0.1:9001".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.handshake_timeout, DEFAULT_HANDSHAKE_TIMEOUT);
        assert_eq!(cfg.segment_size, DEFAULT_SEGMENT_SIZE);
        assert!(cfg.pool_index.is_none());
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = RelayConfig::from_toml(
            "listen = \"127.0.0.1:9001\"\nbogus = true",
        );
        assert!(err.is_err());
    }
}
