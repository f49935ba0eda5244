//! Functional scenarios for the reduction engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use argus_analyzer::{analyze, saturate, Analyzer, AnalyzerError, Rule};
use argus_types::{Env, Event, Monitor, Namespace, Pid, Verdict};
use serde_json::json;

fn send(src: u64, dst: u64, msg: i64) -> Event {
    Event::Send { src: Pid(src), dst: Pid(dst), msg: json!(msg) }
}

fn recv(dst: u64, msg: i64) -> Event {
    Event::Recv { dst: Pid(dst), msg: json!(msg) }
}

fn rules(entries: &[argus_analyzer::Derivation]) -> Vec<Rule> {
    entries.iter().map(|e| e.rule).collect()
}

#[test]
fn disjunction_short_circuits_before_the_event() {
    let m = Monitor::or(
        Env::new(),
        Monitor::yes(Env::new()),
        Monitor::act(Env::new(), |_| true, |_| Monitor::no(Env::new())),
    );
    let (entries, next) = analyze(&send(1, 2, 5), m).expect("well-formed");
    assert_eq!(next.verdict(), Some(Verdict::Yes));
    assert_eq!(rules(&entries), vec![Rule::MDisYL, Rule::MVrd]);
}

#[test]
fn act_binds_the_consumed_event() {
    let env = Env::new().var("x").ns(Namespace::scoped("ns1"));
    let m = Monitor::act(
        env,
        |e| matches!(e, Event::Send { msg, .. } if *msg == json!(42)),
        |_| Monitor::yes(Env::new()),
    );
    let event = send(1, 2, 42);
    let (entries, next) = analyze(&event, m).expect("guard accepts");
    assert_eq!(next.verdict(), Some(Verdict::Yes));
    assert_eq!(rules(&entries), vec![Rule::MAct]);
    assert_eq!(
        next.env().ctx.get(&Namespace::scoped("ns1"), "x"),
        Some(&event)
    );
}

#[test]
fn external_choice_selects_the_matching_branch() {
    let choice = || {
        Monitor::chs(
            Env::new(),
            Monitor::act(
                Env::new(),
                |e| matches!(e, Event::Send { .. }),
                |_| Monitor::yes(Env::new()),
            ),
            Monitor::act(
                Env::new(),
                |e| matches!(e, Event::Recv { .. }),
                |_| Monitor::no(Env::new()),
            ),
        )
    };

    let (entries, next) = analyze(&send(1, 2, 1), choice()).expect("send matches left");
    assert_eq!(entries[0].rule, Rule::MChsL);
    assert_eq!(entries[0].premises[0].rule, Rule::MAct);
    assert_eq!(next.verdict(), Some(Verdict::Yes));

    let (entries, next) = analyze(&recv(2, 1), choice()).expect("recv matches right");
    assert_eq!(entries[0].rule, Rule::MChsR);
    assert_eq!(next.verdict(), Some(Verdict::No));
}

#[test]
fn external_choice_rejects_ambiguous_guards() {
    let m = Monitor::chs(
        Env::new(),
        Monitor::act(Env::new(), |_| true, |_| Monitor::yes(Env::new())),
        Monitor::act(Env::new(), |_| true, |_| Monitor::no(Env::new())),
    );
    match analyze(&send(1, 2, 1), m) {
        Err(AnalyzerError::ChoiceGuards { matched: 2, .. }) => {}
        other => panic!("expected a guard ambiguity, got {other:?}"),
    }
}

#[test]
fn external_choice_rejects_non_act_children() {
    let m = Monitor::chs(
        Env::new(),
        Monitor::yes(Env::new()),
        Monitor::act(Env::new(), |_| true, |_| Monitor::no(Env::new())),
    );
    match analyze(&send(1, 2, 1), m) {
        Err(AnalyzerError::ChoiceShape { found: "verdict" }) => {}
        other => panic!("expected a shape error, got {other:?}"),
    }
}

#[test]
fn unmatched_act_guard_is_fatal() {
    let m = Monitor::act(
        Env::new(),
        |e| matches!(e, Event::Recv { .. }),
        |_| Monitor::yes(Env::new()),
    );
    assert!(matches!(
        analyze(&send(1, 2, 1), m),
        Err(AnalyzerError::Unmatched { .. })
    ));
}

#[test]
fn recursion_unfolding_scopes_the_namespace() {
    let m = Monitor::rec(Env::new().var("X"), || {
        Monitor::and(
            Env::new(),
            Monitor::act(Env::new(), |_| true, |_| Monitor::yes(Env::new())),
            Monitor::act(Env::new(), |_| true, |_| Monitor::yes(Env::new())),
        )
    });
    let (entries, ready) = saturate(m);
    assert_eq!(rules(&entries), vec![Rule::MRec]);
    assert_eq!(ready.shape(), "and");
    assert_eq!(ready.env().ns, Namespace::scoped("X"));
}

#[test]
fn left_branch_binding_wins_in_parallel_merge() {
    // Left binds x on the first event; the right branch binds the same
    // key on the second event and must not override it.
    let m = Monitor::and(
        Env::new(),
        Monitor::act(Env::new().var("x"), |_| true, |_| {
            Monitor::act(Env::new(), |_| true, |_| Monitor::yes(Env::new()))
        }),
        Monitor::act(Env::new(), |_| true, |_| {
            Monitor::act(Env::new().var("x"), |_| true, |_| Monitor::yes(Env::new()))
        }),
    );
    let first = send(1, 2, 1);
    let second = send(3, 4, 2);

    let (_, m) = analyze(&first, m).expect("step one");
    assert_eq!(m.env().ctx.get(&Namespace::Global, "x"), Some(&first));

    let (_, m) = analyze(&second, m).expect("step two");
    assert_eq!(m.env().ctx.get(&Namespace::Global, "x"), Some(&first));
}

fn looping_act() -> Monitor {
    Monitor::act(Env::new().var("v"), |_| true, |_| {
        Monitor::var(Env::new().var("X").ns(Namespace::scoped("X")), looping_act)
    })
}

#[test]
fn variable_unfolding_purges_its_namespace() {
    let m = Monitor::rec(Env::new().var("X"), looping_act);
    let (_, ready) = saturate(m);
    assert_eq!(ready.env().ns, Namespace::scoped("X"));

    // The act binds (X, v); re-unfolding through the variable must purge it.
    let (entries, ready) = analyze(&send(1, 2, 7), ready).expect("guard accepts");
    assert_eq!(rules(&entries), vec![Rule::MAct, Rule::MRecVar]);
    assert_eq!(ready.shape(), "act");
    assert!(ready.env().ctx.get(&Namespace::scoped("X"), "v").is_none());
    assert!(ready.env().ctx.is_empty());
}

#[test]
fn verdict_hook_fires_exactly_once() {
    let fired = Arc::new(AtomicUsize::new(0));
    let seen = fired.clone();
    let mut analyzer = Analyzer::with_hook(Arc::new(move |verdict, log| {
        assert_eq!(verdict, Verdict::Yes);
        assert!(!log.is_empty());
        seen.fetch_add(1, Ordering::SeqCst);
    }));

    analyzer.embed(Monitor::act(Env::new(), |_| true, |_| {
        Monitor::yes(Env::new())
    }));
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    analyzer.dispatch(&send(1, 2, 1)).expect("reaches yes");
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(analyzer.verdict(), Some(Verdict::Yes));

    // Further events are absorbed without re-firing.
    analyzer.dispatch(&send(1, 2, 2)).expect("absorbed");
    analyzer.dispatch(&recv(2, 2)).expect("absorbed");
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(analyzer.verdict(), Some(Verdict::Yes));
}

#[test]
fn proof_log_is_reported_newest_first() {
    let mut analyzer = Analyzer::new();
    analyzer.embed(Monitor::or(
        Env::new(),
        Monitor::act(Env::new(), |_| true, |_| Monitor::yes(Env::new())),
        Monitor::act(Env::new(), |_| true, |_| Monitor::yes(Env::new())),
    ));
    analyzer.dispatch(&send(1, 2, 1)).expect("parallel step");
    let log = analyzer.proof_log();
    // The mPar event step happened before the closing tau steps.
    let par_at = log.iter().position(|d| d.rule == Rule::MPar).expect("mPar recorded");
    let dis_at = log.iter().position(|d| d.rule == Rule::MDisYL).expect("tau recorded");
    assert!(dis_at < par_at, "newest entries come first");
}
