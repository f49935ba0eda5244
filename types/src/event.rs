//! Canonical trace events.
//!
//! An event is an immutable observation of one step of the target
//! program. The `subject` of an event is the process identity the tracer
//! network routes on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entry::EntryPoint;
use crate::pid::Pid;

/// Message payloads and exit reasons are structured JSON values.
pub type Val = serde_json::Value;

/// One observation of the target program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// `src` spawned `tgt` with the given entry point.
    Spawn {
        /// The spawning process.
        src: Pid,
        /// The new process.
        tgt: Pid,
        /// Entry point of the new process.
        entry: EntryPoint,
    },
    /// `tgt` started executing, seen from the child's side.
    Spawned {
        /// The new process.
        tgt: Pid,
        /// The process that spawned it.
        parent: Pid,
        /// Entry point of the new process.
        entry: EntryPoint,
    },
    /// `src` terminated.
    Exit {
        /// The exiting process.
        src: Pid,
        /// Termination reason.
        reason: Val,
    },
    /// `src` sent `msg` to `dst`.
    Send {
        /// The sender.
        src: Pid,
        /// The receiver.
        dst: Pid,
        /// Message payload.
        msg: Val,
    },
    /// `dst` consumed `msg` from its mailbox.
    Recv {
        /// The receiver.
        dst: Pid,
        /// Message payload.
        msg: Val,
    },
    /// A raw trace notification the verifier does not model.
    ///
    /// Gaps are routed like any other event so partition streams stay
    /// faithful to the raw trace, but they are never given to monitors;
    /// they only feed the *other* statistics bucket.
    Gap {
        /// The process the notification concerns.
        subject: Pid,
        /// Unparsed description.
        detail: String,
    },
}

/// Event kind tag, usable as a statistics key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A spawn observation.
    Spawn,
    /// A spawned (child-side start) observation.
    Spawned,
    /// An exit observation.
    Exit,
    /// A send observation.
    Send,
    /// A receive observation.
    Recv,
    /// Anything the verifier does not model.
    Other,
}

impl Event {
    /// The source-process identity used for routing.
    #[must_use]
    pub fn subject(&self) -> Pid {
        match self {
            Event::Spawn { src, .. } | Event::Exit { src, .. } | Event::Send { src, .. } => *src,
            Event::Spawned { tgt, .. } => *tgt,
            Event::Recv { dst, .. } => *dst,
            Event::Gap { subject, .. } => *subject,
        }
    }

    /// The kind tag of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Spawn { .. } => EventKind::Spawn,
            Event::Spawned { .. } => EventKind::Spawned,
            Event::Exit { .. } => EventKind::Exit,
            Event::Send { .. } => EventKind::Send,
            Event::Recv { .. } => EventKind::Recv,
            Event::Gap { .. } => EventKind::Other,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Spawn { src, tgt, entry } => write!(f, "spawn({src} -> {tgt}, {entry})"),
            Event::Spawned { tgt, parent, entry } => {
                write!(f, "spawned({tgt} of {parent}, {entry})")
            }
            Event::Exit { src, reason } => write!(f, "exit({src}, {reason})"),
            Event::Send { src, dst, msg } => write!(f, "send({src} -> {dst}, {msg})"),
            Event::Recv { dst, msg } => write!(f, "recv({dst}, {msg})"),
            Event::Gap { subject, detail } => write!(f, "gap({subject}, {detail})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn subject_follows_the_routed_process() {
        let entry = EntryPoint::new("server", "loop", vec![]);
        assert_eq!(
            Event::Spawn { src: Pid(1), tgt: Pid(2), entry: entry.clone() }.subject(),
            Pid(1)
        );
        assert_eq!(
            Event::Spawned { tgt: Pid(2), parent: Pid(1), entry }.subject(),
            Pid(2)
        );
        assert_eq!(Event::Recv { dst: Pid(3), msg: json!(1) }.subject(), Pid(3));
    }

    #[test]
    fn rendering_is_compact() {
        let ev = Event::Send { src: Pid(1), dst: Pid(2), msg: json!(42) };
        assert_eq!(ev.to_string(), "send(<0.1.0> -> <0.2.0>, 42)");
    }
}
