//! Per-tracer event statistics.

use std::fmt;

use argus_types::EventKind;
use serde::{Deserialize, Serialize};

/// Counters per event kind, folded into the tracer's exit notice.
///
/// The `other` bucket counts raw trace notifications the verifier does
/// not model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Spawn events seen.
    pub spawn: u64,
    /// Spawned events seen.
    pub spawned: u64,
    /// Exit events seen.
    pub exit: u64,
    /// Send events seen.
    pub send: u64,
    /// Receive events seen.
    pub recv: u64,
    /// Unrecognized trace notifications.
    pub other: u64,
}

impl Stats {
    /// Count one event of the given kind.
    pub fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::Spawn => self.spawn += 1,
            EventKind::Spawned => self.spawned += 1,
            EventKind::Exit => self.exit += 1,
            EventKind::Send => self.send += 1,
            EventKind::Recv => self.recv += 1,
            EventKind::Other => self.other += 1,
        }
    }

    /// Fold another tracer's counters into this one.
    pub fn merge(&mut self, other: &Stats) {
        self.spawn += other.spawn;
        self.spawned += other.spawned;
        self.exit += other.exit;
        self.send += other.send;
        self.recv += other.recv;
        self.other += other.other;
    }

    /// Total events counted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.spawn + self.spawned + self.exit + self.send + self.recv + self.other
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "spawn={} spawned={} exit={} send={} recv={} other={}",
            self.spawn, self.spawned, self.exit, self.send, self.recv, self.other
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_counters() {
        let mut a = Stats { spawn: 1, send: 2, ..Stats::default() };
        let b = Stats { send: 3, exit: 1, ..Stats::default() };
        a.merge(&b);
        assert_eq!(a.send, 5);
        assert_eq!(a.exit, 1);
        assert_eq!(a.total(), 7);
    }

    #[test]
    fn record_hits_the_matching_bucket() {
        let mut stats = Stats::default();
        stats.record(EventKind::Other);
        stats.record(EventKind::Recv);
        assert_eq!(stats.other, 1);
        assert_eq!(stats.recv, 1);
    }
}
