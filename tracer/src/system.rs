//! Bootstrapping the tracer network.

use std::sync::Arc;

use argus_analyzer::VerdictHook;
use argus_types::Pid;
use tokio::sync::mpsc;

use crate::instrument::Instrument;
use crate::message::{DownNotice, TracerId, TracerMsg, TracerRef};
use crate::source::TraceSource;
use crate::tracer::{Tracer, TracerConfig};

/// Handle to a running tracer network.
///
/// The bootstrapper plays the root tracer's supervisor: it observes the
/// root's termination notice and owns the trace source's auxiliary
/// lookup state.
pub struct System {
    root: TracerRef,
    source: Arc<dyn TraceSource>,
    supervisor: mpsc::UnboundedReceiver<TracerMsg>,
}

/// Start tracing `root`.
///
/// Registers interest in `root`'s events with the trace source, then
/// spawns the root tracer (no analyzer, direct mode). Must be called
/// within a tokio runtime.
pub fn start(
    root: Pid,
    predicate: Arc<dyn Instrument>,
    config: TracerConfig,
    source: Arc<dyn TraceSource>,
    hook: Option<VerdictHook>,
) -> System {
    let (boot_tx, boot_rx) = mpsc::unbounded_channel();
    let bootstrapper = TracerRef::new(TracerId::next(), boot_tx);
    let root_ref = Tracer::spawn_root(root, predicate, config, source.clone(), hook, bootstrapper);
    System { root: root_ref, source, supervisor: boot_rx }
}

impl System {
    /// Identity of the root tracer.
    #[must_use]
    pub fn root(&self) -> TracerId {
        self.root.id()
    }

    /// Await the root tracer's termination notice.
    pub async fn wait_root(&mut self) -> Option<DownNotice> {
        while let Some(msg) = self.supervisor.recv().await {
            if let TracerMsg::Down(notice) = msg {
                return Some(notice);
            }
        }
        None
    }

    /// Release the trace source's auxiliary lookup tables.
    pub fn stop(self) {
        self.source.release();
    }
}
