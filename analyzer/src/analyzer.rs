//! Per-context analyzer state.
//!
//! An [`Analyzer`] owns one ambient monitor term, advances it event by
//! event, accumulates the proof log, and fires the verdict hook exactly
//! once when the term first becomes terminal. Tracers hold one inline,
//! or a dedicated task holds one externally.

use std::sync::Arc;

use argus_types::{Event, Monitor, Verdict};
use tracing::{debug, info};

use crate::derivation::Derivation;
use crate::reduce::{analyze, saturate, AnalyzerError};

/// Callback invoked once with the verdict and the accumulated proof log
/// (newest entry first).
pub type VerdictHook = Arc<dyn Fn(Verdict, &[Derivation]) + Send + Sync>;

/// The reduction-engine state for one monitored context.
#[derive(Default)]
pub struct Analyzer {
    ambient: Option<Monitor>,
    steps: Vec<Derivation>,
    hook: Option<VerdictHook>,
    fired: bool,
}

impl Analyzer {
    /// An analyzer with no ambient monitor and no verdict hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An analyzer that reports its first verdict through `hook`.
    #[must_use]
    pub fn with_hook(hook: VerdictHook) -> Self {
        Self { hook: Some(hook), ..Self::default() }
    }

    /// Attach `m` as the ambient monitor, τ-saturating it first.
    pub fn embed(&mut self, m: Monitor) {
        let (entries, ready) = saturate(m);
        debug!(steps = entries.len(), term = %ready, "monitor embedded");
        self.steps.extend(entries);
        self.ambient = Some(ready);
        self.check_verdict();
    }

    /// Advance the ambient monitor by one external event.
    ///
    /// A missing ambient monitor makes this a no-op. After an error the
    /// analyzer is defunct: the broken term is discarded.
    ///
    /// # Errors
    ///
    /// Propagates fatal reduction failures.
    pub fn dispatch(&mut self, event: &Event) -> Result<(), AnalyzerError> {
        let Some(m) = self.ambient.take() else {
            return Ok(());
        };
        let (entries, next) = analyze(event, m)?;
        self.steps.extend(entries);
        self.ambient = Some(next);
        self.check_verdict();
        Ok(())
    }

    fn check_verdict(&mut self) {
        if self.fired {
            return;
        }
        if let Some(verdict) = self.verdict() {
            self.fired = true;
            info!(verdict = %verdict, "monitor reached a verdict");
            if let Some(hook) = self.hook.clone() {
                let log = self.proof_log();
                hook(verdict, &log);
            }
        }
    }

    /// The ambient term, when one is attached.
    #[must_use]
    pub fn current(&self) -> Option<&Monitor> {
        self.ambient.as_ref()
    }

    /// The verdict, once the ambient term is terminal.
    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        self.ambient.as_ref().and_then(Monitor::verdict)
    }

    /// The proof log, newest entry first.
    #[must_use]
    pub fn proof_log(&self) -> Vec<Derivation> {
        self.steps.iter().rev().cloned().collect()
    }

    /// Number of recorded reduction steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}
