//! Hierarchical tracer choreography for the argus runtime verifier.
//!
//! A tree of tracer agents partitions the set of traced processes. Raw
//! events enter at the partition that observes their process directly;
//! each tracer either analyzes an event against its monitor, routes it
//! to the descendant subtree that owns it, or instruments a fresh
//! descendant tracer in reaction to a spawn. The two-phase *detach*
//! protocol migrates direct observation of a process from an ancestor
//! to a descendant without losing or reordering that process's events.
//!
//! Tracers are tokio tasks over private FIFO mailboxes; there is no
//! shared mutable state between agents. A tracer collects itself once
//! its traced set and routing table are both empty, notifying its
//! supervisor with its accumulated event statistics.

mod external;
mod instrument;
mod message;
mod source;
mod stats;
mod system;
mod tracer;

pub use instrument::Instrument;
pub use message::{Detach, DownNotice, Routed, TracerId, TracerMsg, TracerRef};
pub use source::{EventSink, InMemorySource, TraceSource};
pub use stats::Stats;
pub use system::{start, System};
pub use tracer::{AnalysisMode, TraceMode, TracerConfig, TracerError};
