//! Core data model for the argus runtime verifier.
//!
//! This crate holds the types shared by the analyzer and the tracer
//! choreography: trace events, process identities, entry-point
//! descriptors, binder environments with their binding contexts, and the
//! monitor-term algebra that the analyzer reduces.
//!
//! Monitor terms carry thunked continuations and are therefore plain
//! in-memory values; everything else derives `serde` for logging and
//! replay tooling.

mod context;
mod entry;
mod env;
mod event;
mod monitor;
mod pid;

pub use context::Ctx;
pub use entry::EntryPoint;
pub use env::{Env, Namespace};
pub use event::{Event, EventKind, Val};
pub use monitor::{ActCont, Guard, Monitor, RecCont, Verdict};
pub use pid::Pid;
