//! Binder environments and namespaces.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::Ctx;

/// Namespace tag scoping context bindings.
///
/// Unfolding a recursion binder rewrites the namespace of the unfolded
/// body to the binder's name; everything outside a binder lives in the
/// global namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// The ambient namespace outside any recursion binder.
    #[default]
    Global,
    /// The namespace of a named recursion binder.
    Scoped(String),
}

impl Namespace {
    /// Scoped namespace from a binder name.
    #[must_use]
    pub fn scoped(name: impl Into<String>) -> Self {
        Namespace::Scoped(name.into())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Global => f.write_str("global"),
            Namespace::Scoped(name) => f.write_str(name),
        }
    }
}

/// The environment every monitor term carries.
///
/// `text` is the display string the synthesis pass attached to the node,
/// `var` the binder name (an act's binding variable or a recursion
/// binder), `pat` the display pattern of an act's guard. `ns` and `ctx`
/// are the live namespace and binding context threaded through
/// reductions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Env {
    /// Display string for proof entries.
    pub text: Option<String>,
    /// Binder name.
    pub var: Option<String>,
    /// Display pattern for act guards.
    pub pat: Option<String>,
    /// Current namespace.
    pub ns: Namespace,
    /// Variable bindings visible at this node.
    pub ctx: Ctx,
}

impl Env {
    /// An empty environment in the global namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment with a display string.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    /// Set the binder name.
    #[must_use]
    pub fn var(mut self, var: impl Into<String>) -> Self {
        self.var = Some(var.into());
        self
    }

    /// Set the display pattern.
    #[must_use]
    pub fn pat(mut self, pat: impl Into<String>) -> Self {
        self.pat = Some(pat.into());
        self
    }

    /// Set the namespace.
    #[must_use]
    pub fn ns(mut self, ns: Namespace) -> Self {
        self.ns = ns;
        self
    }

    /// Copy a parent's namespace and binding context into this
    /// environment, the propagation applied on every branch descent.
    ///
    /// Parent bindings win over local ones so that variables bound higher
    /// in the term stay visible below.
    pub fn inherit(&mut self, parent: &Env) {
        self.ns = parent.ns.clone();
        self.ctx = Ctx::merge(parent.ctx.clone(), std::mem::take(&mut self.ctx));
    }

    /// Like [`Env::inherit`] but keeps this environment's namespace,
    /// used when a recursion unfolding has already rewritten it.
    pub fn inherit_ctx(&mut self, ctx: Ctx) {
        self.ctx = Ctx::merge(ctx, std::mem::take(&mut self.ctx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inherit_copies_namespace_and_context() {
        let mut parent = Env::new().ns(Namespace::scoped("X"));
        parent.ctx.bind(
            Namespace::Global,
            "x",
            crate::Event::Gap { subject: crate::Pid(1), detail: "seed".into() },
        );

        let mut child = Env::with_text("child");
        child.inherit(&parent);
        assert_eq!(child.ns, Namespace::scoped("X"));
        assert_eq!(child.ctx.len(), 1);
        assert_eq!(child.text.as_deref(), Some("child"));
    }
}
