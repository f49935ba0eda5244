//! The trace primitive.
//!
//! Tracers consume raw events through [`TraceSource`], the interface to
//! the runtime facility that observes the target program.
//! [`InMemorySource`] is the in-process implementation used by tests and
//! demos.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use argus_types::{Event, Pid};
use tracing::debug;

use crate::message::{TracerId, TracerMsg, TracerRef};

/// A tracer-side delivery handle for raw trace events.
#[derive(Debug, Clone)]
pub struct EventSink {
    tracer: TracerRef,
}

impl EventSink {
    pub(crate) fn new(tracer: TracerRef) -> Self {
        Self { tracer }
    }

    /// The tracer this sink delivers to.
    #[must_use]
    pub fn tracer(&self) -> TracerId {
        self.tracer.id()
    }

    /// Deliver a raw event as a direct (non-routed) trace message.
    pub fn deliver(&self, event: Event) -> bool {
        self.tracer.send(TracerMsg::Trace(event))
    }
}

/// The runtime primitive delivering lifecycle and message events.
///
/// Implementations must be safe under concurrent callers from multiple
/// tracers.
pub trait TraceSource: Send + Sync {
    /// Begin delivering `target`'s events, and transitively those of its
    /// spawned descendants, to `observer` until superseded.
    fn trace(&self, target: Pid, observer: &EventSink) -> bool;

    /// Transfer delivery of `target`'s events to `observer`.
    ///
    /// Returns `false` when `target` has already exited, which is normal
    /// and non-fatal.
    fn preempt(&self, target: Pid, observer: &EventSink) -> bool;

    /// Drop any auxiliary lookup state.
    fn release(&self) {}
}

#[derive(Default)]
struct Registry {
    observers: HashMap<Pid, EventSink>,
    exited: HashSet<Pid>,
}

/// In-process trace source backed by a synchronized observer registry.
///
/// Spawn events re-register the child to the parent's current observer,
/// mirroring observer inheritance in the traced runtime: a process's
/// events flow to whoever observes its spawner until a tracer preempts
/// it.
#[derive(Default)]
pub struct InMemorySource {
    inner: Mutex<Registry>,
}

impl InMemorySource {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver `event` to the subject's current observer.
    pub fn emit(&self, event: Event) {
        let mut inner = self.lock();
        if let Event::Spawn { src, tgt, .. } = &event {
            if let Some(sink) = inner.observers.get(src).cloned() {
                inner.observers.insert(*tgt, sink);
            }
        }
        let subject = event.subject();
        match inner.observers.get(&subject) {
            Some(sink) => {
                sink.deliver(event.clone());
            }
            None => debug!(%subject, %event, "no observer registered, event dropped"),
        }
        if let Event::Exit { src, .. } = &event {
            inner.exited.insert(*src);
            inner.observers.remove(src);
        }
    }

    /// The current observer of `p`, for tests synchronizing on
    /// ownership hand-over.
    #[must_use]
    pub fn observer_of(&self, p: Pid) -> Option<TracerId> {
        self.lock().observers.get(&p).map(EventSink::tracer)
    }
}

impl TraceSource for InMemorySource {
    fn trace(&self, target: Pid, observer: &EventSink) -> bool {
        debug!(%target, tracer = %observer.tracer(), "trace registered");
        self.lock().observers.insert(target, observer.clone());
        true
    }

    fn preempt(&self, target: Pid, observer: &EventSink) -> bool {
        let mut inner = self.lock();
        if inner.exited.contains(&target) {
            return false;
        }
        debug!(%target, tracer = %observer.tracer(), "observer preempted");
        inner.observers.insert(target, observer.clone());
        true
    }

    fn release(&self) {
        let mut inner = self.lock();
        inner.observers.clear();
        inner.exited.clear();
    }
}
