//! The live relay map and its serialized wire buffer (OTP §3, §4.4).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// The relay map and its precomputed LIST buffer, guarded by one mutex so
/// the buffer is never read mid-rebuild (OTP §4.4, "Concurrency").
pub struct RelayTable {
    inner: Mutex<Inner>,
}

/// Fields that must be updated together under the same lock.
struct Inner {
    /// Live records, keyed by (host, port) so repeated heartbeats from the
    /// same endpoint refresh rather than duplicate (OTP §3 invariant 4).
    records: HashMap<(String, u16), Instant>,
    /// The LIST response: concatenation of `<host-bytes>\x00<port BE>` for
    /// every entry in `records`, rebuilt after every add or remove.
    buffer: Vec<u8>,
}

impl RelayTable {
    /// Build an empty table.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: HashMap::new(),
                buffer: Vec::new(),
            }),
        }
    }

    /// Insert or refresh a relay's record, and rebuild the LIST buffer.
    pub fn heartbeat(&self, host: String, port: u16, deprecation_delay: Duration) {
        let mut inner = self.inner.lock().expect("relay table poisoned");
        let deadline = Instant::now() + deprecation_delay;
        inner.records.insert((host, port), deadline);
        rebuild_buffer(&mut inner);
    }

    /// Remove every record whose deadline has passed, and rebuild the LIST
    /// buffer. Returns the number of records removed.
    pub fn sweep(&self) -> usize {
        let mut inner = self.inner.lock().expect("relay table poisoned");
        let now = Instant::now();
        let before = inner.records.len();
        inner.records.retain(|_, deadline| *deadline > now);
        let removed = before - inner.records.len();
        if removed > 0 {
            rebuild_buffer(&mut inner);
        }
        removed
    }

    /// Return a copy of the current LIST buffer.
    pub fn serialized_buffer(&self) -> Vec<u8> {
        self.inner.lock().expect("relay table poisoned").buffer.clone()
    }

    /// Number of live records. Exposed for tests.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("relay table poisoned").records.len()
    }
}

impl Default for RelayTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Rebuild `inner.buffer` from `inner.records`, in whatever order the map
/// iterates (OTP §4.4: "in any order").
fn rebuild_buffer(inner: &mut Inner) {
    let mut buf = Vec::new();
    for (host, port) in inner.records.keys() {
        buf.extend_from_slice(host.as_bytes());
        buf.push(0x00);
        buf.extend_from_slice(&port.to_be_bytes());
    }
    inner.buffer = buf;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn repeated_heartbeats_do_not_duplicate() {
        let table = RelayTable::new();
        table.heartbeat("127.0.0.2".into(), 6000, Duration::from_secs(30));
        table.heartbeat("127.0.0.2".into(), 6000, Duration::from_secs(30));
        assert_eq!(table.len(), 1);
        let buf = table.serialized_buffer();
        assert_eq!(buf, *b"127.0.0.2\x00\x17\x70");
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_expired_records() {
        let table = RelayTable::new();
        table.heartbeat("127.0.0.2".into(), 6000, Duration::from_millis(100));
        assert_eq!(table.sweep(), 0);
        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(table.sweep(), 1);
        assert!(table.serialized_buffer().is_empty());
    }
}
