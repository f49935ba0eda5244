//! The monitor-term algebra.
//!
//! A monitor term is the state of a formal property under evaluation: a
//! tagged recursive value whose act, recursion, and variable nodes carry
//! thunked continuations. Continuations are shared `Arc` closures, so
//! terms clone cheaply and cross task boundaries.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::env::Env;
use crate::event::Event;

/// Predicate deciding whether an act consumes an event.
pub type Guard = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Suspended continuation of an act, entered with the consumed event.
pub type ActCont = Arc<dyn Fn(&Event) -> Monitor + Send + Sync>;

/// Suspended body of a recursion binder or variable.
pub type RecCont = Arc<dyn Fn() -> Monitor + Send + Sync>;

/// An irrevocable outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The property is satisfied.
    Yes,
    /// The property is violated.
    No,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Yes => f.write_str("yes"),
            Verdict::No => f.write_str("no"),
        }
    }
}

/// A monitor term in one of the seven shapes of the logic.
#[derive(Clone)]
pub enum Monitor {
    /// Terminal verdict; absorbs every further event.
    Verdict(Env, Verdict),
    /// Awaits one external event accepted by the guard.
    Act(Env, Guard, ActCont),
    /// External choice between two acts with mutually exclusive guards.
    Chs(Env, Box<Monitor>, Box<Monitor>),
    /// Parallel conjunction.
    And(Env, Box<Monitor>, Box<Monitor>),
    /// Parallel disjunction.
    Or(Env, Box<Monitor>, Box<Monitor>),
    /// Recursion binder; unfolding rewrites the namespace to the binder
    /// name.
    Rec(Env, RecCont),
    /// Bound recursion variable; unfolding first purges the current
    /// namespace from the context.
    Var(Env, RecCont),
}

impl Monitor {
    /// The `yes` verdict.
    #[must_use]
    pub fn yes(env: Env) -> Self {
        Monitor::Verdict(env, Verdict::Yes)
    }

    /// The `no` verdict.
    #[must_use]
    pub fn no(env: Env) -> Self {
        Monitor::Verdict(env, Verdict::No)
    }

    /// An act node from a guard and continuation.
    #[must_use]
    pub fn act<G, K>(env: Env, guard: G, cont: K) -> Self
    where
        G: Fn(&Event) -> bool + Send + Sync + 'static,
        K: Fn(&Event) -> Monitor + Send + Sync + 'static,
    {
        Monitor::Act(env, Arc::new(guard), Arc::new(cont))
    }

    /// An external choice.
    #[must_use]
    pub fn chs(env: Env, left: Monitor, right: Monitor) -> Self {
        Monitor::Chs(env, Box::new(left), Box::new(right))
    }

    /// A parallel conjunction.
    #[must_use]
    pub fn and(env: Env, left: Monitor, right: Monitor) -> Self {
        Monitor::And(env, Box::new(left), Box::new(right))
    }

    /// A parallel disjunction.
    #[must_use]
    pub fn or(env: Env, left: Monitor, right: Monitor) -> Self {
        Monitor::Or(env, Box::new(left), Box::new(right))
    }

    /// A recursion binder.
    #[must_use]
    pub fn rec<K>(env: Env, cont: K) -> Self
    where
        K: Fn() -> Monitor + Send + Sync + 'static,
    {
        Monitor::Rec(env, Arc::new(cont))
    }

    /// A bound recursion variable.
    #[must_use]
    pub fn var<K>(env: Env, cont: K) -> Self
    where
        K: Fn() -> Monitor + Send + Sync + 'static,
    {
        Monitor::Var(env, Arc::new(cont))
    }

    /// The environment carried by the outermost node.
    #[must_use]
    pub fn env(&self) -> &Env {
        match self {
            Monitor::Verdict(env, _)
            | Monitor::Act(env, _, _)
            | Monitor::Chs(env, _, _)
            | Monitor::And(env, _, _)
            | Monitor::Or(env, _, _)
            | Monitor::Rec(env, _)
            | Monitor::Var(env, _) => env,
        }
    }

    /// Mutable access to the outermost environment.
    pub fn env_mut(&mut self) -> &mut Env {
        match self {
            Monitor::Verdict(env, _)
            | Monitor::Act(env, _, _)
            | Monitor::Chs(env, _, _)
            | Monitor::And(env, _, _)
            | Monitor::Or(env, _, _)
            | Monitor::Rec(env, _)
            | Monitor::Var(env, _) => env,
        }
    }

    /// The verdict, when this term is terminal.
    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Monitor::Verdict(_, v) => Some(*v),
            _ => None,
        }
    }

    /// Shape name for diagnostics.
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Monitor::Verdict(_, _) => "verdict",
            Monitor::Act(_, _, _) => "act",
            Monitor::Chs(_, _, _) => "chs",
            Monitor::And(_, _, _) => "and",
            Monitor::Or(_, _, _) => "or",
            Monitor::Rec(_, _) => "rec",
            Monitor::Var(_, _) => "var",
        }
    }
}

impl fmt::Display for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.env().text {
            return f.write_str(text);
        }
        match self {
            Monitor::Verdict(_, v) => write!(f, "{v}"),
            Monitor::Act(env, _, _) => match (&env.pat, &env.var) {
                (Some(pat), _) => write!(f, "act({pat})"),
                (None, Some(var)) => write!(f, "act({var})"),
                (None, None) => f.write_str("act(_)"),
            },
            Monitor::Chs(_, l, r) => write!(f, "({l} + {r})"),
            Monitor::And(_, l, r) => write!(f, "({l} and {r})"),
            Monitor::Or(_, l, r) => write!(f, "({l} or {r})"),
            Monitor::Rec(env, _) => match &env.var {
                Some(var) => write!(f, "rec {var}"),
                None => f.write_str("rec _"),
            },
            Monitor::Var(env, _) => match &env.var {
                Some(var) => f.write_str(var),
                None => f.write_str("_"),
            },
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.shape(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefers_the_attached_text() {
        let m = Monitor::or(
            Env::new(),
            Monitor::yes(Env::with_text("always")),
            Monitor::no(Env::new()),
        );
        assert_eq!(m.to_string(), "(always or no)");
    }

    #[test]
    fn act_renders_its_pattern() {
        let m = Monitor::act(Env::new().pat("send(_, _, 42)"), |_| true, |_| {
            Monitor::yes(Env::new())
        });
        assert_eq!(m.to_string(), "act(send(_, _, 42))");
    }
}
