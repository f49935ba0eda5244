//! Binding contexts.

use std::fmt;

use indexmap::IndexMap;

use crate::env::Namespace;
use crate::event::Event;

/// Insertion-ordered mapping from `(namespace, name)` to the event
/// captured when an act consumed it.
///
/// Contexts merge on parallel reductions with the left operand winning
/// on duplicate keys, and recursion-variable unfolding purges the
/// current namespace wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ctx {
    bindings: IndexMap<(Namespace, String), Event>,
}

impl Ctx {
    /// An empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `event` under `ns`, replacing any previous binding
    /// for the same key.
    pub fn bind(&mut self, ns: Namespace, name: impl Into<String>, event: Event) {
        self.bindings.insert((ns, name.into()), event);
    }

    /// Look up a binding.
    #[must_use]
    pub fn get(&self, ns: &Namespace, name: &str) -> Option<&Event> {
        self.bindings.get(&(ns.clone(), name.to_string()))
    }

    /// Merge two contexts; on duplicate keys the left operand wins.
    #[must_use]
    pub fn merge(left: Ctx, right: Ctx) -> Ctx {
        let mut merged = left;
        for (key, event) in right.bindings {
            merged.bindings.entry(key).or_insert(event);
        }
        merged
    }

    /// Remove every binding under `ns`.
    pub fn purge(&mut self, ns: &Namespace) {
        self.bindings.retain(|(bound_ns, _), _| bound_ns != ns);
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True when no bindings are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&(Namespace, String), &Event)> {
        self.bindings.iter()
    }
}

impl fmt::Display for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, ((ns, name), event)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "({ns},{name}) -> {event}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::Pid;

    fn ev(n: u64) -> Event {
        Event::Send { src: Pid(n), dst: Pid(n + 1), msg: json!(n) }
    }

    #[test]
    fn merge_keeps_the_left_binding() {
        let mut left = Ctx::new();
        left.bind(Namespace::Global, "x", ev(1));
        let mut right = Ctx::new();
        right.bind(Namespace::Global, "x", ev(2));
        right.bind(Namespace::Global, "y", ev(3));

        let merged = Ctx::merge(left, right);
        assert_eq!(merged.get(&Namespace::Global, "x"), Some(&ev(1)));
        assert_eq!(merged.get(&Namespace::Global, "y"), Some(&ev(3)));
    }

    #[test]
    fn purge_drops_one_namespace_only() {
        let mut ctx = Ctx::new();
        ctx.bind(Namespace::scoped("X"), "a", ev(1));
        ctx.bind(Namespace::Global, "b", ev(2));
        ctx.purge(&Namespace::scoped("X"));
        assert!(ctx.get(&Namespace::scoped("X"), "a").is_none());
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn insertion_order_survives_merges() {
        let mut left = Ctx::new();
        left.bind(Namespace::Global, "b", ev(1));
        let mut right = Ctx::new();
        right.bind(Namespace::Global, "a", ev(2));
        let merged = Ctx::merge(left, right);
        let keys: Vec<&str> = merged.iter().map(|((_, name), _)| name.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
