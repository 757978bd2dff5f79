//! Pool index configuration.
//!
//! As with the relay, configuration is a plain `serde`-deserializable
//! struct, not a layered config-source resolution: the embedding contract
//! (OTP §6) is a handful of constructor-supplied tunables, nothing more.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

/// Default number of seconds a relay is told to wait before its next
/// heartbeat (OTP §4.4).
pub const DEFAULT_REQUESTED_DELAY: u8 = 15;
/// Default window after which a relay is eligible for removal if it has
/// not heartbeated again (OTP §4.4).
pub const DEFAULT_DEPRECATION_DELAY: Duration = Duration::from_secs(30);
/// Default interval between garbage-collection sweeps (OTP §4.4).
pub const DEFAULT_GC_CYCLE: Duration = Duration::from_secs(10);
/// Default log level used until a configuration overrides it.
pub const DEFAULT_LOG_LEVEL: tracing::Level = tracing::Level::INFO;

/// Configuration for a single pool index process.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolIndexConfig {
    /// Address to accept relay and client connections on.
    pub listen: SocketAddr,
    /// Seconds to tell a relay to wait before its next heartbeat.
    #[serde(default = "default_requested_delay")]
    pub requested_delay: u8,
    /// How long a relay record stays live after its last heartbeat.
    #[serde(default = "default_deprecation_delay", with = "humantime_serde")]
    pub deprecation_delay: Duration,
    /// How often the garbage-collection sweep runs.
    #[serde(default = "default_gc_cycle", with = "humantime_serde")]
    pub gc_cycle: Duration,
}

/// Serde default for [`PoolIndexConfig::requested_delay`].
fn default_requested_delay() -> u8 {
    DEFAULT_REQUESTED_DELAY
}

/// Serde default for [`PoolIndexConfig::deprecation_delay`].
fn default_deprecation_delay() -> Duration {
    DEFAULT_DEPRECATION_DELAY
}

/// Serde default for [`PoolIndexConfig::gc_cycle`].
fn default_gc_cycle() -> Duration {
    DEFAULT_GC_CYCLE
}

impl PoolIndexConfig {
    /// Build a config from just the fields the embedding API contract
    /// names (OTP §6): a listen address and the three tunables.
    pub fn new(listen: SocketAddr) -> Self {
        Self {
            listen,
            requested_delay: DEFAULT_REQUESTED_DELAY,
            deprecation_delay: DEFAULT_DEPRECATION_DELAY,
            gc_cycle: DEFAULT_GC_CYCLE,
        }
    }

    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
