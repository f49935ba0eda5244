//! Reduction-rule tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The rule applied by one reduction step, recorded in proof entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    /// A verdict absorbed an event.
    MVrd,
    /// An act consumed an event and bound it.
    MAct,
    /// Left branch of an external choice was selected.
    MChsL,
    /// Right branch of an external choice was selected.
    MChsR,
    /// Both children of a parallel node consumed the event.
    MPar,
    /// Silent congruence through the left child.
    MTauL,
    /// Silent congruence through the right child.
    MTauR,
    /// `yes` short-circuited a disjunction from the left.
    MDisYL,
    /// `yes` short-circuited a disjunction from the right.
    MDisYR,
    /// `no` was absorbed by a disjunction from the left.
    MDisNL,
    /// `no` was absorbed by a disjunction from the right.
    MDisNR,
    /// `yes` was absorbed by a conjunction from the left.
    MConYL,
    /// `yes` was absorbed by a conjunction from the right.
    MConYR,
    /// `no` short-circuited a conjunction from the left.
    MConNL,
    /// `no` short-circuited a conjunction from the right.
    MConNR,
    /// A recursion binder unfolded.
    MRec,
    /// A recursion variable unfolded, purging its namespace.
    MRecVar,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::MVrd => "mVrd",
            Rule::MAct => "mAct",
            Rule::MChsL => "mChsL",
            Rule::MChsR => "mChsR",
            Rule::MPar => "mPar",
            Rule::MTauL => "mTauL",
            Rule::MTauR => "mTauR",
            Rule::MDisYL => "mDisYL",
            Rule::MDisYR => "mDisYR",
            Rule::MDisNL => "mDisNL",
            Rule::MDisNR => "mDisNR",
            Rule::MConYL => "mConYL",
            Rule::MConYR => "mConYR",
            Rule::MConNL => "mConNL",
            Rule::MConNR => "mConNR",
            Rule::MRec => "mRec",
            Rule::MRecVar => "mRecVar",
        };
        f.write_str(name)
    }
}
