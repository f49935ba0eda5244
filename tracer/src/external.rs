//! The external analyzer task.
//!
//! In external analysis mode a dedicated task owns the [`Analyzer`] and
//! the tracer only forwards events to it, keeping monitor reduction off
//! the tracer's message loop.

use argus_analyzer::{Analyzer, VerdictHook};
use argus_types::{Event, Monitor};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Messages consumed by an external analyzer task.
#[derive(Debug)]
enum AnalyzerMsg {
    Event(Event),
    Stop,
}

/// Handle to an external analyzer task.
#[derive(Debug, Clone)]
pub(crate) struct AnalyzerRef {
    tx: mpsc::UnboundedSender<AnalyzerMsg>,
}

impl AnalyzerRef {
    /// Forward one event for analysis.
    pub(crate) fn feed(&self, event: Event) {
        let _ = self.tx.send(AnalyzerMsg::Event(event));
    }

    /// Stop the task after it drains pending events.
    pub(crate) fn stop(&self) {
        let _ = self.tx.send(AnalyzerMsg::Stop);
    }
}

/// Spawn an analyzer task owning `monitor`.
pub(crate) fn spawn_analyzer(monitor: Monitor, hook: Option<VerdictHook>) -> AnalyzerRef {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut analyzer = match hook {
            Some(hook) => Analyzer::with_hook(hook),
            None => Analyzer::new(),
        };
        analyzer.embed(monitor);
        while let Some(msg) = rx.recv().await {
            match msg {
                AnalyzerMsg::Event(event) => {
                    if let Err(err) = analyzer.dispatch(&event) {
                        error!(%err, "analyzer aborted on a malformed term");
                        break;
                    }
                }
                AnalyzerMsg::Stop => break,
            }
        }
        debug!(steps = analyzer.step_count(), "external analyzer stopped");
    });
    AnalyzerRef { tx }
}
