//! A relay implementation of the onion transport protocol.
//!
//! A [`Relay`] accepts predecessor connections, instantiates one
//! [`relay::OtpService`] per accepted circuit (OTP §4.2), and optionally
//! heartbeats its advertised endpoint to a pool index (OTP §4.4).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod err;
pub mod relay;
mod tasks;

pub use config::RelayConfig;
pub use err::{Error, Result};
pub use relay::OtpService;

use tokio::net::TcpListener;

/// A running relay: one accept loop, and an optional heartbeat task.
pub struct Relay {
    /// The relay's configuration.
    config: RelayConfig,
}

impl Relay {
    /// Build a relay from `config`. Nothing happens on the network until
    /// [`Relay::start`] is called.
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Accept connections and heartbeat until the returned future is
    /// dropped or an unrecoverable bind error occurs.
    pub async fn start(&self) -> Result<()> {
        let listener =
            TcpListener::bind(self.config.listen)
                .await
                .map_err(|source| Error::Bind {
                    addr: self.config.listen,
                    source,
                })?;
        let local_addr = listener.local_addr().unwrap_or(self.config.listen);

        let accept = tasks::listeners::accept_loop(
            listener,
            self.config.handshake_timeout,
            self.config.segment_size,
        );

        if let Some(pool_index) = self.config.pool_index {
            let heartbeat = tasks::heartbeat::heartbeat_loop(
                pool_index,
                local_addr,
                self.config.heartbeat_interval,
            );
            tokio::select! {
                res = accept => { res?; }
                _ = heartbeat => {}
            }
        } else {
            accept.await?;
        }

        Ok(())
    }
}
