//! The top-level client: a synced relay list plus (optionally) a circuit
//! built from it (OTP §6 external interface).

use std::net::SocketAddr;

use rand::{CryptoRng, RngCore};
use safelog::Sensitive;
use tracing::{debug, info};

use crate::address::Destination;
use crate::circuit::Circuit;
use crate::err::Result;
use crate::relaylist::{RelayList, RelayRecord};

/// A client that can sync a relay list from a pool index, build a circuit
/// through randomly-chosen relays, and stream data over it.
///
/// `Client` owns at most one open [`Circuit`] at a time. Building a new one
/// via [`Client::connect`] drops whatever circuit was open before it.
pub struct Client {
    pool_index: SocketAddr,
    relays: RelayList,
    circuit: Option<Circuit>,
}

impl Client {
    /// Create a client that will sync its relay list from `pool_index`.
    pub fn new(pool_index: SocketAddr) -> Self {
        Self {
            pool_index,
            relays: RelayList::new(),
            circuit: None,
        }
    }

    /// Refresh the relay list from the pool index (OTP §6
    /// `sync_nodes_list`).
    pub async fn sync_nodes_list(&mut self) -> Result<()> {
        self.relays.sync(self.pool_index).await?;
        debug!(relays = self.relays.len(), "synced relay list");
        Ok(())
    }

    /// Forget every relay currently known (OTP §6 `purge_nodes_list`).
    pub fn purge_nodes_list(&mut self) {
        self.relays.purge();
    }

    /// Number of relays currently known.
    pub fn known_relays(&self) -> usize {
        self.relays.len()
    }

    /// Choose `hop_count` distinct relays at random and build a circuit
    /// through all of them to `destination`, tunneling each extension
    /// through the hops already established (OTP §4.3
    /// `random_path_to_destination`).
    pub async fn random_path_to_destination<R: RngCore + CryptoRng>(
        &mut self,
        hop_count: usize,
        destination: &Destination,
        rng: &mut R,
    ) -> Result<()> {
        let path = self.relays.pick_distinct(hop_count, rng)?;
        self.connect_via(&path, destination, rng).await
    }

    /// Build a circuit through an explicit, caller-chosen sequence of
    /// relays, extending hop by hop, to `destination` (OTP §6 `connect`,
    /// `next_destination`).
    pub async fn connect_via<R: RngCore + CryptoRng>(
        &mut self,
        path: &[RelayRecord],
        destination: &Destination,
        rng: &mut R,
    ) -> Result<()> {
        let (first, rest) = path
            .split_first()
            .expect("connect_via requires at least one relay");

        let mut circuit = if rest.is_empty() {
            Circuit::connect(first.connect_target(), destination, rng).await?
        } else {
            let mut circuit = Circuit::connect(first.connect_target(), &rest[0].as_destination()?, rng)
                .await?;
            for window in rest.windows(2) {
                circuit
                    .next_destination(&window[1].as_destination()?, rng)
                    .await?;
            }
            circuit.next_destination(destination, rng).await?;
            circuit
        };

        info!(
            hops = circuit.len(),
            destination = %Sensitive::new(destination.clone()),
            "circuit established"
        );
        self.circuit = Some(circuit);
        Ok(())
    }

    /// Send `data` over the open circuit (OTP §6 `send`).
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.circuit_mut()?.send(data).await
    }

    /// Read up to `buf_size` bytes from the open circuit (OTP §6
    /// `receive`).
    pub async fn receive(&mut self, buf_size: usize) -> Result<Vec<u8>> {
        self.circuit_mut()?.receive(buf_size).await
    }

    /// Read exactly `n` bytes from the open circuit, classifying a
    /// short-read tail as a relay-reported error (OTP §6
    /// `receive_exactly`).
    pub async fn receive_exactly(&mut self, n: usize) -> Result<Vec<u8>> {
        self.circuit_mut()?.receive_exactly(n).await
    }

    /// Tear down the open circuit, if any (OTP §6 `close`).
    pub async fn close(&mut self) {
        if let Some(circuit) = self.circuit.take() {
            circuit.close().await;
        }
    }

    fn circuit_mut(&mut self) -> Result<&mut Circuit> {
        self.circuit
            .as_mut()
            .ok_or(crate::err::Error::NoCircuit)
    }
}

impl RelayRecord {
    fn as_destination(&self) -> Result<Destination> {
        use crate::address::IntoDestination;
        Ok((self.host.clone(), self.port).into_destination()?)
    }
}
