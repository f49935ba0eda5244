//! Mailbox protocol between tracers.
//!
//! Tracers communicate exclusively by message passing over unbounded
//! FIFO mailboxes. Routed messages are hop-wrapped with the identity of
//! the tracer that first wrapped them, which later hops leave untouched.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use argus_types::{Event, Pid};
use tokio::sync::mpsc;
use tracing::debug;

use crate::stats::Stats;

/// Identity of a tracer agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TracerId(u64);

static NEXT_TRACER: AtomicU64 = AtomicU64::new(1);

impl TracerId {
    /// A fresh process-wide identity.
    pub(crate) fn next() -> Self {
        TracerId(NEXT_TRACER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TracerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tracer#{}", self.0)
    }
}

/// Cloneable handle to a tracer's mailbox.
#[derive(Debug, Clone)]
pub struct TracerRef {
    id: TracerId,
    tx: mpsc::UnboundedSender<TracerMsg>,
}

impl TracerRef {
    pub(crate) fn new(id: TracerId, tx: mpsc::UnboundedSender<TracerMsg>) -> Self {
        Self { id, tx }
    }

    /// The tracer this handle addresses.
    #[must_use]
    pub fn id(&self) -> TracerId {
        self.id
    }

    /// Enqueue a message, reporting whether the tracer still runs.
    pub(crate) fn send(&self, msg: TracerMsg) -> bool {
        let delivered = self.tx.send(msg).is_ok();
        if !delivered {
            debug!(tracer = %self.id, "message for a collected tracer dropped");
        }
        delivered
    }
}

/// The end-of-partition marker migrating direct observation of a
/// process from an ancestor to the issuing tracer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detach {
    /// The tracer that assumed direct observation.
    pub issuer: TracerId,
    /// The process whose observation migrated.
    pub target: Pid,
}

/// Payload of a hop-wrapped message.
#[derive(Debug, Clone)]
pub enum Routed {
    /// A forwarded trace event.
    Trace(Event),
    /// A descending detach marker.
    Detach(Detach),
}

/// Messages a tracer consumes from its mailbox.
#[derive(Debug, Clone)]
pub enum TracerMsg {
    /// A direct trace event from the trace source.
    Trace(Event),
    /// A non-routed detach from a child tracer.
    Detach(Detach),
    /// A hop-wrapped message; `origin` is the tracer that first wrapped
    /// it and is preserved across forwarding hops.
    Routed {
        /// First wrapper of the message.
        origin: TracerRef,
        /// Wrapped payload.
        msg: Routed,
    },
    /// Termination notice from a child tracer.
    Down(DownNotice),
}

/// Notice a tracer sends its supervisor when it collects itself.
#[derive(Debug, Clone)]
pub struct DownNotice {
    /// The terminated tracer.
    pub tracer: TracerId,
    /// Its accumulated event statistics.
    pub stats: Stats,
}
