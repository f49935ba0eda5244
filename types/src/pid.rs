//! Process identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of an observed process.
///
/// Opaque and comparable; the tracer network keys its routing tables and
/// traced sets on it. The numeric payload has no meaning beyond
/// uniqueness.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Pid(pub u64);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<0.{}.0>", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pids_order_by_payload() {
        assert!(Pid(1) < Pid(2));
        assert_eq!(Pid(7).to_string(), "<0.7.0>");
    }
}
