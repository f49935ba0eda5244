//! The tracer agent.
//!
//! One tracer owns one trace partition. Its message loop runs a
//! two-state machine: in *direct* mode it consumes everything; in
//! *priority* mode, while a takeover of some process is still in
//! flight, it consumes only routed messages and defers the rest,
//! re-injecting them FIFO once it turns direct. Events either belong to
//! the partition (analyzed, possibly instrumenting a new descendant) or
//! are routed to the subtree that owns them; the detach protocol
//! migrates direct observation down the tree without losing or
//! reordering a process's events.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use argus_analyzer::{Analyzer, AnalyzerError, VerdictHook};
use argus_types::{Event, Monitor, Pid};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::external::{spawn_analyzer, AnalyzerRef};
use crate::instrument::Instrument;
use crate::message::{Detach, DownNotice, Routed, TracerId, TracerMsg, TracerRef};
use crate::source::{EventSink, TraceSource};
use crate::stats::Stats;

/// Fatal tracer failures; each aborts the containing tracer.
#[derive(Debug, Error)]
pub enum TracerError {
    /// A routed trace event reached a direct-mode tracer with no route
    /// for its subject.
    #[error("no route for {subject} at {tracer}")]
    MissingRoute {
        /// The event's subject process.
        subject: Pid,
        /// The tracer that received it.
        tracer: TracerId,
    },
    /// The analyzer rejected its term.
    #[error(transparent)]
    Analysis(#[from] AnalyzerError),
}

/// Where an instrumented monitor is reduced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnalysisMode {
    /// In the tracer's own loop, between dequeues.
    #[default]
    Inline,
    /// In a dedicated analyzer task.
    External,
}

/// Tracer-network configuration.
#[derive(Debug, Clone, Default)]
pub struct TracerConfig {
    /// Analysis placement for instrumented monitors.
    pub analysis: AnalysisMode,
}

/// Per-process observation mode in the traced set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    /// Takeover in flight; events still arrive routed.
    Priority,
    /// Steady state; events arrive directly.
    Direct,
}

/// Overall loop mode; direct iff every traced entry is direct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Priority,
    Direct,
}

/// How an event reached `handle_event`.
enum Arrival {
    Direct,
    Routed(TracerRef),
}

enum AnalyzerHandle {
    None,
    Inline(Box<Analyzer>),
    External(AnalyzerRef),
}

pub(crate) struct Tracer {
    id: TracerId,
    self_ref: TracerRef,
    parent: TracerRef,
    predicate: Arc<dyn Instrument>,
    source: Arc<dyn TraceSource>,
    config: TracerConfig,
    hook: Option<VerdictHook>,
    analyzer: AnalyzerHandle,
    traced: HashMap<Pid, TraceMode>,
    routes: HashMap<Pid, TracerRef>,
    /// For a process instrumented from a routed spawn: the original
    /// router, where the child's detach must enter the routing chain.
    detach_origin: HashMap<Pid, TracerRef>,
    mode: Mode,
    deferred: VecDeque<TracerMsg>,
    stats: Stats,
    /// Process to preempt and announce before the first dequeue.
    announce: Option<Pid>,
    done: bool,
}

impl Tracer {
    /// Spawn the root tracer over `root`, supervised by the
    /// bootstrapper's sink.
    pub(crate) fn spawn_root(
        root: Pid,
        predicate: Arc<dyn Instrument>,
        config: TracerConfig,
        source: Arc<dyn TraceSource>,
        hook: Option<VerdictHook>,
        supervisor: TracerRef,
    ) -> TracerRef {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = TracerId::next();
        let self_ref = TracerRef::new(id, tx);
        let tracer = Tracer {
            id,
            self_ref: self_ref.clone(),
            parent: supervisor,
            predicate,
            source: source.clone(),
            config,
            hook,
            analyzer: AnalyzerHandle::None,
            traced: HashMap::from([(root, TraceMode::Direct)]),
            routes: HashMap::new(),
            detach_origin: HashMap::new(),
            mode: Mode::Direct,
            deferred: VecDeque::new(),
            stats: Stats::default(),
            announce: None,
            done: false,
        };
        source.trace(root, &tracer.sink());
        info!(tracer = %id, process = %root, "root tracer started");
        tokio::spawn(tracer.run(rx));
        self_ref
    }

    /// Spawn a child tracer owning `monitor` for `target`.
    fn spawn_child(&self, target: Pid, monitor: Monitor) -> TracerRef {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = TracerId::next();
        let self_ref = TracerRef::new(id, tx);
        let analyzer = match self.config.analysis {
            AnalysisMode::Inline => {
                let mut inline = match &self.hook {
                    Some(hook) => Analyzer::with_hook(hook.clone()),
                    None => Analyzer::new(),
                };
                inline.embed(monitor);
                AnalyzerHandle::Inline(Box::new(inline))
            }
            AnalysisMode::External => {
                AnalyzerHandle::External(spawn_analyzer(monitor, self.hook.clone()))
            }
        };
        let child = Tracer {
            id,
            self_ref: self_ref.clone(),
            parent: self.self_ref.clone(),
            predicate: self.predicate.clone(),
            source: self.source.clone(),
            config: self.config.clone(),
            hook: self.hook.clone(),
            analyzer,
            traced: HashMap::from([(target, TraceMode::Priority)]),
            routes: HashMap::new(),
            detach_origin: HashMap::new(),
            mode: Mode::Priority,
            deferred: VecDeque::new(),
            stats: Stats::default(),
            announce: Some(target),
            done: false,
        };
        debug!(parent = %self.id, child = %id, process = %target, "tracer instrumented");
        tokio::spawn(child.run(rx));
        self_ref
    }

    fn sink(&self) -> EventSink {
        EventSink::new(self.self_ref.clone())
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<TracerMsg>) {
        if let Some(target) = self.announce.take() {
            if !self.source.preempt(target, &self.sink()) {
                debug!(tracer = %self.id, process = %target, "preempt on exited target ignored");
            }
            self.parent
                .send(TracerMsg::Detach(Detach { issuer: self.id, target }));
        }
        while !self.done {
            let msg = match self.next_deferred() {
                Some(deferred) => deferred,
                None => match rx.recv().await {
                    Some(msg) => msg,
                    None => break,
                },
            };
            if let Err(err) = self.handle(msg) {
                error!(tracer = %self.id, %err, "tracer aborted");
                self.stop_analyzer();
                return;
            }
        }
        debug!(tracer = %self.id, "tracer loop ended");
    }

    /// Deferred messages are re-injected, FIFO, once the tracer is
    /// direct.
    fn next_deferred(&mut self) -> Option<TracerMsg> {
        if self.mode == Mode::Direct {
            self.deferred.pop_front()
        } else {
            None
        }
    }

    fn handle(&mut self, msg: TracerMsg) -> Result<(), TracerError> {
        match self.mode {
            Mode::Direct => match msg {
                TracerMsg::Trace(event) => self.handle_event(event, Arrival::Direct),
                TracerMsg::Detach(detach) => {
                    self.route_detach(detach);
                    Ok(())
                }
                TracerMsg::Routed { origin, msg: Routed::Trace(event) } => {
                    self.forward_event(event, &origin)
                }
                TracerMsg::Routed { msg: Routed::Detach(detach), .. } => {
                    self.forward_detach(detach);
                    Ok(())
                }
                TracerMsg::Down(notice) => {
                    self.observe_down(notice);
                    Ok(())
                }
            },
            Mode::Priority => match msg {
                TracerMsg::Routed { origin, msg: Routed::Trace(event) } => {
                    self.handle_event(event, Arrival::Routed(origin))
                }
                TracerMsg::Routed { msg: Routed::Detach(detach), .. } => {
                    if detach.issuer == self.id {
                        self.handle_detach(detach);
                    } else {
                        self.forward_detach(detach);
                    }
                    Ok(())
                }
                other => {
                    self.deferred.push_back(other);
                    Ok(())
                }
            },
        }
    }

    /// Consume one trace event: route it to the owning subtree, or
    /// analyze it here and react to spawns.
    fn handle_event(&mut self, event: Event, arrival: Arrival) -> Result<(), TracerError> {
        self.stats.record(event.kind());
        let origin = match &arrival {
            Arrival::Direct => self.self_ref.clone(),
            Arrival::Routed(origin) => origin.clone(),
        };
        if self.route(&event, &origin) {
            return Ok(());
        }
        match &event {
            Event::Spawn { tgt, entry, .. } => {
                let tgt = *tgt;
                self.analyze(&event)?;
                match self.predicate.monitor_for(entry) {
                    None => match arrival {
                        Arrival::Direct => {
                            self.traced.insert(tgt, TraceMode::Direct);
                        }
                        Arrival::Routed(origin) => {
                            // Take the process over from the remote
                            // observer; its events keep arriving routed
                            // until the marker comes back.
                            self.traced.insert(tgt, TraceMode::Priority);
                            self.mode = Mode::Priority;
                            if !self.source.preempt(tgt, &self.sink()) {
                                debug!(tracer = %self.id, process = %tgt,
                                    "preempt on exited target ignored");
                            }
                            origin.send(TracerMsg::Detach(Detach {
                                issuer: self.id,
                                target: tgt,
                            }));
                        }
                    },
                    Some(monitor) => {
                        let child = self.spawn_child(tgt, monitor);
                        self.routes.insert(tgt, child);
                        if let Arrival::Routed(origin) = arrival {
                            self.detach_origin.insert(tgt, origin);
                        }
                    }
                }
                Ok(())
            }
            Event::Exit { src, .. } => {
                let src = *src;
                self.analyze(&event)?;
                self.traced.remove(&src);
                self.refresh_mode();
                self.try_gc();
                Ok(())
            }
            Event::Gap { .. } => Ok(()),
            _ => self.analyze(&event),
        }
    }

    /// A routed trace event in direct mode must have a route.
    fn forward_event(&mut self, event: Event, origin: &TracerRef) -> Result<(), TracerError> {
        self.stats.record(event.kind());
        if self.route(&event, origin) {
            Ok(())
        } else {
            Err(TracerError::MissingRoute { subject: event.subject(), tracer: self.id })
        }
    }

    /// Forward `event` along its subject's route, when one exists.
    ///
    /// Spawn events extend the route to the spawned child so its events
    /// follow the same subtree; exit events retire the route, making any
    /// later detach for the subject a harmless no-op.
    fn route(&mut self, event: &Event, origin: &TracerRef) -> bool {
        let subject = event.subject();
        let Some(hop) = self.routes.get(&subject).cloned() else {
            return false;
        };
        if let Event::Spawn { tgt, .. } = event {
            self.routes.insert(*tgt, hop.clone());
        }
        debug!(tracer = %self.id, %subject, hop = %hop.id(), %event, "event routed");
        hop.send(TracerMsg::Routed { origin: origin.clone(), msg: Routed::Trace(event.clone()) });
        if let Event::Exit { src, .. } = event {
            self.routes.remove(src);
            self.detach_origin.remove(src);
            self.try_gc();
        }
        true
    }

    fn analyze(&mut self, event: &Event) -> Result<(), TracerError> {
        match &mut self.analyzer {
            AnalyzerHandle::None => Ok(()),
            AnalyzerHandle::Inline(analyzer) => {
                analyzer.dispatch(event)?;
                Ok(())
            }
            AnalyzerHandle::External(handle) => {
                handle.feed(event.clone());
                Ok(())
            }
        }
    }

    /// A child finished taking over `detach.target`: inject the marker
    /// into the routing chain.
    fn route_detach(&mut self, detach: Detach) {
        if let Some(origin) = self.detach_origin.remove(&detach.target) {
            // The chain starts at the original router; the local entry
            // is retired when the descending marker passes back through.
            debug!(tracer = %self.id, target = %detach.target, origin = %origin.id(),
                "detach injected at the routing chain's origin");
            origin.send(TracerMsg::Routed {
                origin: self.self_ref.clone(),
                msg: Routed::Detach(detach),
            });
        } else if let Some(hop) = self.routes.remove(&detach.target) {
            debug!(tracer = %self.id, target = %detach.target, hop = %hop.id(), "detach routed");
            hop.send(TracerMsg::Routed {
                origin: self.self_ref.clone(),
                msg: Routed::Detach(detach),
            });
        } else {
            debug!(tracer = %self.id, target = %detach.target,
                "detach for a departed process dropped");
        }
        self.try_gc();
    }

    /// Pass a descending detach one hop further down its chain,
    /// retiring the local entry.
    fn forward_detach(&mut self, detach: Detach) {
        match self.routes.remove(&detach.target) {
            Some(hop) => {
                self.detach_origin.remove(&detach.target);
                debug!(tracer = %self.id, target = %detach.target, hop = %hop.id(),
                    "detach forwarded");
                hop.send(TracerMsg::Routed {
                    origin: self.self_ref.clone(),
                    msg: Routed::Detach(detach),
                });
            }
            None => debug!(tracer = %self.id, target = %detach.target,
                "detach without route dropped"),
        }
        self.try_gc();
    }

    /// The marker this tracer issued came back: observation of the
    /// target is now direct.
    fn handle_detach(&mut self, detach: Detach) {
        match self.traced.get_mut(&detach.target) {
            Some(mode) => {
                *mode = TraceMode::Direct;
                info!(tracer = %self.id, process = %detach.target, "direct observation assumed");
                self.refresh_mode();
            }
            None => debug!(tracer = %self.id, target = %detach.target,
                "detach for a departed process dropped"),
        }
    }

    fn refresh_mode(&mut self) {
        if self.mode == Mode::Priority
            && self.traced.values().all(|mode| *mode == TraceMode::Direct)
        {
            self.mode = Mode::Direct;
            debug!(tracer = %self.id, deferred = self.deferred.len(), "tracer turned direct");
        }
    }

    fn observe_down(&mut self, notice: DownNotice) {
        debug!(tracer = %self.id, child = %notice.tracer, stats = %notice.stats,
            "descendant tracer ended");
    }

    /// Self-collect once both the traced set and the routing table are
    /// empty: stop the analyzer and notify the supervisor.
    fn try_gc(&mut self) {
        if !self.done && self.traced.is_empty() && self.routes.is_empty() {
            self.stop_analyzer();
            info!(tracer = %self.id, stats = %self.stats, "tracer collected");
            self.parent
                .send(TracerMsg::Down(DownNotice { tracer: self.id, stats: self.stats }));
            self.done = true;
        }
    }

    fn stop_analyzer(&mut self) {
        if let AnalyzerHandle::External(handle) = &self.analyzer {
            handle.stop();
        }
        self.analyzer = AnalyzerHandle::None;
    }
}
