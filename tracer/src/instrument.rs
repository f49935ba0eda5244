//! The instrumentation predicate.

use argus_types::{EntryPoint, Monitor};

/// Maps a spawned process's entry point to an optional fresh monitor.
///
/// Consulted only on spawn events whose source is traced directly, never
/// for routed ones. `Some` instruments a new tracer owning the returned
/// monitor; `None` keeps the process in the spawner's partition. The
/// tracer caches nothing about the predicate.
pub trait Instrument: Send + Sync {
    /// A fresh monitor for the process, or `None`.
    fn monitor_for(&self, entry: &EntryPoint) -> Option<Monitor>;
}

impl<F> Instrument for F
where
    F: Fn(&EntryPoint) -> Option<Monitor> + Send + Sync,
{
    fn monitor_for(&self, entry: &EntryPoint) -> Option<Monitor> {
        self(entry)
    }
}
