//! Proof-derivation records.
//!
//! Every reduction produces a derivation tree: the applied rule, the
//! action driving it (an external event or the silent τ), rendered
//! source and target terms, and the premises of congruence rules. Nodes
//! are numbered by derivation identifiers reflecting their depth-first
//! position in the tree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rule::Rule;

/// Position of a node in a derivation tree.
///
/// The top reduction is `[1]`; descending into a premise prepends `1`;
/// a sibling premise at the same level increments the head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationId(Vec<u32>);

impl DerivationId {
    /// Identifier of a top-level reduction.
    #[must_use]
    pub fn root() -> Self {
        DerivationId(vec![1])
    }

    /// Identifier of this node's first premise.
    #[must_use]
    pub fn premise(&self) -> Self {
        let mut path = Vec::with_capacity(self.0.len() + 1);
        path.push(1);
        path.extend_from_slice(&self.0);
        DerivationId(path)
    }

    /// Identifier of the next sibling premise at the same level.
    #[must_use]
    pub fn sibling(&self) -> Self {
        let mut path = self.0.clone();
        path[0] += 1;
        DerivationId(path)
    }

    /// The identifier as a head-first index path.
    #[must_use]
    pub fn path(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for DerivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        f.write_str("]")
    }
}

/// The action driving a reduction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Silent internal reduction.
    Tau,
    /// An external event, rendered.
    Ev(String),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Tau => f.write_str("tau"),
            Action::Ev(ev) => f.write_str(ev),
        }
    }
}

/// One reduction step with its premises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Derivation {
    /// Depth-first position in the proof tree.
    pub id: DerivationId,
    /// Rule applied.
    pub rule: Rule,
    /// Driving action.
    pub action: Action,
    /// Rendered source term.
    pub from: String,
    /// Rendered target term.
    pub to: String,
    /// Premises of congruence rules: zero, one, or two.
    pub premises: Vec<Derivation>,
}

impl Derivation {
    /// A leaf step with no premises.
    #[must_use]
    pub fn leaf(id: DerivationId, rule: Rule, action: Action, from: String, to: String) -> Self {
        Derivation { id, rule, action, from, to, premises: Vec::new() }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{} {}: {} --{}--> {}",
            "",
            self.id,
            self.rule,
            self.from,
            self.action,
            self.to,
            indent = depth * 2
        )?;
        for premise in &self.premises {
            premise.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_number_premises_depth_first() {
        let root = DerivationId::root();
        let first = root.premise();
        let second = first.sibling();
        assert_eq!(root.to_string(), "[1]");
        assert_eq!(first.to_string(), "[1.1]");
        assert_eq!(second.to_string(), "[2.1]");
        assert_eq!(first.premise().to_string(), "[1.1.1]");
    }
}
