//! The client-side relay list: synced from a pool index, and sampled
//! without replacement when building a path (OTP §3, §4.3).

use std::collections::HashMap;
use std::net::SocketAddr;

use otp_bytes::Reader;
use rand::seq::SliceRandom;
use rand::{CryptoRng, RngCore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::err::{Error, Result};

/// LIST command byte sent to a pool index (OTP §4.4).
const CMD_LIST: u8 = 0x00;

/// One relay a pool index has advertised: a host and port a client can
/// connect to directly, or tunnel a handshake to through an existing
/// circuit (OTP §3, "RelayRecord").
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RelayRecord {
    /// The relay's advertised hostname or IP address.
    pub host: String,
    /// The relay's advertised port.
    pub port: u16,
}

impl RelayRecord {
    /// Resolve this record to a [`SocketAddr`]-compatible pair usable with
    /// `TcpStream::connect`.
    pub(crate) fn connect_target(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

/// An unordered set of [`RelayRecord`]s, keyed by `"host:port"` so repeated
/// syncs never produce duplicate entries (OTP §3, "RelayList").
#[derive(Clone, Debug, Default)]
pub struct RelayList {
    records: HashMap<(String, u16), ()>,
}

impl RelayList {
    /// Build an empty relay list.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Number of distinct relays currently known.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no relay is currently known.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove every known relay (OTP §6, `purge_nodes_list`).
    pub fn purge(&mut self) {
        self.records.clear();
    }

    /// Sync this list from a pool index at `pool_index` (OTP §4.3,
    /// `sync_nodes_list`): send the LIST command, then parse
    /// `<host-bytes>\0<port: u16 BE>` records until EOF.
    pub async fn sync(&mut self, pool_index: SocketAddr) -> Result<()> {
        let mut stream = TcpStream::connect(pool_index)
            .await
            .map_err(|source| Error::Sync {
                addr: pool_index,
                source,
            })?;
        stream
            .write_all(&[CMD_LIST])
            .await
            .map_err(|source| Error::Sync {
                addr: pool_index,
                source,
            })?;

        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|source| Error::Sync {
                addr: pool_index,
                source,
            })?;

        let mut reader = Reader::from_slice(&buf);
        while reader.remaining() > 0 {
            let host = match reader.take_until(0x00) {
                Ok(host) => String::from_utf8_lossy(host).into_owned(),
                Err(_) => break,
            };
            let port = match reader.take_u16() {
                Ok(port) => port,
                Err(_) => break,
            };
            self.records.insert((host, port), ());
        }

        Ok(())
    }

    /// Pick `n` distinct relays uniformly at random, without replacement,
    /// using a cryptographically strong source (OTP §4.3, §9 "Randomness").
    ///
    /// Fails with [`Error::InsufficientRelays`] before doing any network
    /// I/O if fewer than `n` relays are known.
    pub fn pick_distinct<R: RngCore + CryptoRng>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<RelayRecord>> {
        if self.records.len() < n {
            return Err(Error::InsufficientRelays {
                wanted: n,
                available: self.records.len(),
            });
        }
        let mut all: Vec<RelayRecord> = self
            .records
            .keys()
            .map(|(host, port)| RelayRecord {
                host: host.clone(),
                port: *port,
            })
            .collect();
        all.shuffle(rng);
        all.truncate(n);
        Ok(all)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::OsRng;
    use tokio::net::TcpListener;

    async fn serve_list(body: &'static [u8]) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut cmd = [0u8; 1];
            sock.read_exact(&mut cmd).await.unwrap();
            assert_eq!(cmd[0], CMD_LIST);
            sock.write_all(body).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn sync_parses_repeated_records() {
        let addr = serve_list(b"127.0.0.2\x00\x17\x70127.0.0.3\x00\x17\x71").await;
        let mut list = RelayList::new();
        list.sync(addr).await.unwrap();
        assert_eq!(list.len(), 2);
    }

    #[tokio::test]
    async fn sync_does_not_duplicate_across_calls() {
        let addr = serve_list(b"127.0.0.2\x00\x17\x70").await;
        let mut list = RelayList::new();
        list.sync(addr).await.unwrap();
        let addr2 = serve_list(b"127.0.0.2\x00\x17\x70").await;
        list.sync(addr2).await.unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn purge_empties_the_list() {
        let mut list = RelayList::new();
        list.records.insert(("127.0.0.2".into(), 6000), ());
        list.purge();
        assert!(list.is_empty());
    }

    #[test]
    fn pick_distinct_fails_fast_when_short() {
        let list = RelayList::new();
        let err = list.pick_distinct(1, &mut OsRng).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientRelays {
                wanted: 1,
                available: 0
            }
        ));
    }

    #[test]
    fn pick_distinct_returns_no_duplicates() {
        let mut list = RelayList::new();
        for i in 0..5u16 {
            list.records.insert((format!("127.0.0.{i}"), 6000 + i), ());
        }
        let picked = list.pick_distinct(3, &mut OsRng).unwrap();
        assert_eq!(picked.len(), 3);
        let unique: std::collections::HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 3);
    }
}
