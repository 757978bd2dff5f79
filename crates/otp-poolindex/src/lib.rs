//! A pool index: the discovery service relays heartbeat to and clients sync
//! their relay list from (OTP §4.4).
//!
//! A [`PoolIndex`] accepts connections, dispatches each to [`service::handle_connection`]
//! based on its command byte, and runs a background sweeper that removes
//! relay records whose deprecation deadline has passed (OTP §3 invariant 4).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod err;
mod service;
mod sweeper;
mod table;

pub use config::PoolIndexConfig;
pub use err::{Error, Result};
pub use table::RelayTable;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::debug;

/// A running pool index: one accept loop, plus a background GC sweeper.
pub struct PoolIndex {
    /// The pool index's configuration.
    config: PoolIndexConfig,
    /// The live relay table, shared between the accept loop's connection
    /// handlers and the sweeper (OTP §4.4, "Concurrency").
    table: Arc<RelayTable>,
}

impl PoolIndex {
    /// Build a pool index from `config`. Nothing happens on the network
    /// until [`PoolIndex::start`] is called.
    pub fn new(config: PoolIndexConfig) -> Self {
        Self {
            config,
            table: Arc::new(RelayTable::new()),
        }
    }

    /// Accept connections and run the GC sweeper until the returned future
    /// is dropped or an unrecoverable bind error occurs.
    pub async fn start(&self) -> Result<()> {
        let listener =
            TcpListener::bind(self.config.listen)
                .await
                .map_err(|source| Error::Bind {
                    addr: self.config.listen,
                    source,
                })?;

        let accept = accept_loop(listener, Arc::clone(&self.table), self.config.requested_delay, self.config.deprecation_delay);
        let sweep = sweeper::sweep_loop(Arc::clone(&self.table), self.config.gc_cycle);

        tokio::select! {
            res = accept => { res?; }
            _ = sweep => {}
        }

        Ok(())
    }

    /// Give out a handle to the live relay table, mainly useful for tests
    /// that want to assert on its contents without going over the wire.
    pub fn table(&self) -> Arc<RelayTable> {
        Arc::clone(&self.table)
    }
}

/// Accept connections on `listener` forever, dispatching each to
/// [`service::handle_connection`].
async fn accept_loop(
    listener: TcpListener,
    table: Arc<RelayTable>,
    requested_delay: u8,
    deprecation_delay: std::time::Duration,
) -> std::io::Result<std::convert::Infallible> {
    loop {
        let (stream, remote_addr) = listener.accept().await?;
        let remote_addr = safelog::Sensitive::new(remote_addr);
        debug!("accepted connection from {remote_addr}");
        let table = Arc::clone(&table);
        tokio::spawn(async move {
            if let Err(e) = service::handle_connection(stream, &table, requested_delay, deprecation_delay).await {
                debug!("connection from {remote_addr} failed: {e}");
            }
        });
    }
}
