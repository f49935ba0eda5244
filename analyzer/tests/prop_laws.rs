//! Reduction-engine laws over generated terms.
//!
//! Terms are generated as closure-free shape trees and compiled to
//! monitors with always-accepting guards, which keeps every generated
//! run well-formed.

use argus_analyzer::{analyze, saturate, Rule};
use argus_types::{Env, Event, Monitor, Pid};
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
enum Shape {
    Yes,
    No,
    Act(Box<Shape>),
    And(Box<Shape>, Box<Shape>),
    Or(Box<Shape>, Box<Shape>),
    Rec(Box<Shape>),
}

fn build(shape: &Shape) -> Monitor {
    match shape {
        Shape::Yes => Monitor::yes(Env::new()),
        Shape::No => Monitor::no(Env::new()),
        Shape::Act(cont) => {
            let cont = (**cont).clone();
            Monitor::act(Env::new().var("x"), |_| true, move |_| build(&cont))
        }
        Shape::And(left, right) => Monitor::and(Env::new(), build(left), build(right)),
        Shape::Or(left, right) => Monitor::or(Env::new(), build(left), build(right)),
        Shape::Rec(body) => {
            let body = (**body).clone();
            Monitor::rec(Env::new().var("X"), move || build(&body))
        }
    }
}

fn shapes() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![Just(Shape::Yes), Just(Shape::No)];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| Shape::Act(Box::new(s))),
            (inner.clone(), inner.clone())
                .prop_map(|(l, r)| Shape::And(Box::new(l), Box::new(r))),
            (inner.clone(), inner.clone())
                .prop_map(|(l, r)| Shape::Or(Box::new(l), Box::new(r))),
            inner.prop_map(|s| Shape::Rec(Box::new(s))),
        ]
    })
}

fn events() -> impl Strategy<Value = Event> {
    (1u64..4, 1u64..4, 0i64..4)
        .prop_map(|(src, dst, n)| Event::Send { src: Pid(src), dst: Pid(dst), msg: json!(n) })
}

proptest! {
    // After saturation no tau rule applies.
    #[test]
    fn saturation_reaches_a_fixed_point(shape in shapes()) {
        let (_, ready) = saturate(build(&shape));
        let (again, _) = saturate(ready);
        prop_assert!(again.is_empty());
    }

    // Every analyze call returns a ready term.
    #[test]
    fn analyze_returns_saturated_terms(
        shape in shapes(),
        trace in prop::collection::vec(events(), 1..6),
    ) {
        let mut m = build(&shape);
        for ev in &trace {
            let (_, next) = analyze(ev, m).expect("generated terms are well-formed");
            let (extra, ready) = saturate(next);
            prop_assert!(extra.is_empty());
            m = ready;
        }
    }

    // A verdict absorbs any further event with exactly one mVrd record.
    #[test]
    fn verdicts_absorb_further_events(
        shape in shapes(),
        trace in prop::collection::vec(events(), 1..6),
    ) {
        let mut m = saturate(build(&shape)).1;
        for ev in &trace {
            m = analyze(ev, m).expect("well-formed").1;
        }
        if let Some(verdict) = m.verdict() {
            let probe = Event::Send { src: Pid(9), dst: Pid(9), msg: json!(0) };
            let (entries, next) = analyze(&probe, m).expect("verdicts absorb");
            prop_assert_eq!(next.verdict(), Some(verdict));
            prop_assert_eq!(entries.len(), 1);
            prop_assert_eq!(entries[0].rule, Rule::MVrd);
        }
    }

    // Identical inputs yield identical terms and proof logs.
    #[test]
    fn reduction_is_deterministic(
        shape in shapes(),
        trace in prop::collection::vec(events(), 0..6),
    ) {
        let run = |seed: Monitor| {
            let mut log = Vec::new();
            let (pre, mut m) = saturate(seed);
            log.extend(pre);
            for ev in &trace {
                let (entries, next) = analyze(ev, m).expect("well-formed");
                log.extend(entries);
                m = next;
            }
            (m.to_string(), format!("{log:?}"))
        };
        prop_assert_eq!(run(build(&shape)), run(build(&shape)));
    }
}
