//! The pool index's background garbage-collection sweeper (OTP §4.4).

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::table::RelayTable;

/// Sweep `table` every `gc_cycle`, forever, removing records whose
/// deprecation deadline has passed (OTP §3 invariant 4).
pub(crate) async fn sweep_loop(table: Arc<RelayTable>, gc_cycle: Duration) {
    loop {
        tokio::time::sleep(gc_cycle).await;
        let removed = table.sweep();
        if removed > 0 {
            debug!("swept {removed} expired relay record(s)");
        }
    }
}
