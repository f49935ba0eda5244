//! Entry-point descriptors for spawned processes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::Val;

/// The callable a spawned process was started with.
///
/// Carried by spawn events and consulted by the instrumentation
/// predicate to decide whether the new process gets its own monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Module (or namespace) of the entry function.
    pub module: String,
    /// Entry function name.
    pub function: String,
    /// Startup arguments.
    pub args: Vec<Val>,
}

impl EntryPoint {
    /// Construct a descriptor.
    #[must_use]
    pub fn new(module: impl Into<String>, function: impl Into<String>, args: Vec<Val>) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
            args,
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.module, self.function, self.args.len())
    }
}
