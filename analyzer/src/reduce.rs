//! The small-step reduction engine.
//!
//! Reduction rules split into τ-rules (silent, event-less) and event
//! rules. τ-rules are applied greedily to a fixed point after every
//! event step, so the externally visible term is always one where the
//! next event is consumable.

use argus_types::{Ctx, Env, Event, Monitor, Namespace};
use thiserror::Error;
use tracing::trace;

use crate::derivation::{Action, Derivation, DerivationId};
use crate::rule::Rule;

/// Fatal analyzer failures.
///
/// These indicate a malformed monitor or a violated external-choice
/// constraint; the containing tracer aborts on them.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// A child of an external choice is not an act.
    #[error("external choice requires act children, found {found}")]
    ChoiceShape {
        /// Shape of the offending child.
        found: &'static str,
    },
    /// An external choice matched the event with zero or both guards.
    #[error("external choice matched {matched} guards for {event}")]
    ChoiceGuards {
        /// Rendered event.
        event: String,
        /// How many guards accepted it.
        matched: usize,
    },
    /// A bare act's guard rejected the event.
    #[error("no guard accepts {event}")]
    Unmatched {
        /// Rendered event.
        event: String,
    },
    /// An event reached an unsaturated term.
    #[error("event delivered to an unsaturated {shape} term")]
    NotSaturated {
        /// Shape of the term.
        shape: &'static str,
    },
}

#[derive(Clone, Copy)]
enum ParKind {
    And,
    Or,
}

impl ParKind {
    fn rebuild(self, env: Env, left: Monitor, right: Monitor) -> Monitor {
        match self {
            ParKind::And => Monitor::and(env, left, right),
            ParKind::Or => Monitor::or(env, left, right),
        }
    }
}

/// Outcome of attempting one τ-rule.
pub(crate) enum TauOutcome {
    /// A rule applied.
    Stepped(Derivation, Monitor),
    /// No τ-rule matches; the term is ready.
    Stuck(Monitor),
}

/// Attempt one τ-step at the top of `m`.
pub(crate) fn tau_step(m: Monitor, id: &DerivationId) -> TauOutcome {
    match m {
        Monitor::Or(env, left, right) => tau_parallel(env, left, right, ParKind::Or, id),
        Monitor::And(env, left, right) => tau_parallel(env, left, right, ParKind::And, id),
        Monitor::Rec(env, cont) => {
            let from = Monitor::Rec(env.clone(), cont.clone()).to_string();
            let mut body = cont();
            body.env_mut().ns = match &env.var {
                Some(binder) => Namespace::scoped(binder.clone()),
                None => env.ns.clone(),
            };
            body.env_mut().inherit_ctx(env.ctx.clone());
            let entry =
                Derivation::leaf(id.clone(), Rule::MRec, Action::Tau, from, body.to_string());
            TauOutcome::Stepped(entry, body)
        }
        Monitor::Var(env, cont) => {
            let from = Monitor::Var(env.clone(), cont.clone()).to_string();
            let mut inherited = env.ctx.clone();
            inherited.purge(&env.ns);
            let mut body = cont();
            body.env_mut().ns = env.ns.clone();
            body.env_mut().inherit_ctx(inherited);
            let entry =
                Derivation::leaf(id.clone(), Rule::MRecVar, Action::Tau, from, body.to_string());
            TauOutcome::Stepped(entry, body)
        }
        other => TauOutcome::Stuck(other),
    }
}

/// Verdict short-circuiting, identity absorption, and τ-congruence for
/// `And`/`Or` nodes, tried in that priority order.
fn tau_parallel(
    env: Env,
    left: Box<Monitor>,
    right: Box<Monitor>,
    kind: ParKind,
    id: &DerivationId,
) -> TauOutcome {
    use argus_types::Verdict::{No, Yes};

    let from = kind
        .rebuild(env.clone(), (*left).clone(), (*right).clone())
        .to_string();

    let short = |rule: Rule, survivor: Monitor| {
        let mut survivor = survivor;
        survivor.env_mut().inherit(&env);
        let entry =
            Derivation::leaf(id.clone(), rule, Action::Tau, from.clone(), survivor.to_string());
        TauOutcome::Stepped(entry, survivor)
    };

    match (kind, left.verdict(), right.verdict()) {
        // Short-circuit verdicts.
        (ParKind::Or, Some(Yes), _) => return short(Rule::MDisYL, *left),
        (ParKind::Or, _, Some(Yes)) => return short(Rule::MDisYR, *right),
        (ParKind::And, Some(No), _) => return short(Rule::MConNL, *left),
        (ParKind::And, _, Some(No)) => return short(Rule::MConNR, *right),
        // Identity absorption: the other operand survives with the
        // parent's context and namespace copied in.
        (ParKind::Or, Some(No), _) => return short(Rule::MDisNL, *right),
        (ParKind::Or, _, Some(No)) => return short(Rule::MDisNR, *left),
        (ParKind::And, Some(Yes), _) => return short(Rule::MConYL, *right),
        (ParKind::And, _, Some(Yes)) => return short(Rule::MConYR, *left),
        _ => {}
    }

    // Congruence: left first, else right.
    let premise_id = id.premise();
    let mut descended = (*left).clone();
    descended.env_mut().inherit(&env);
    if let TauOutcome::Stepped(premise, reduced) = tau_step(descended, &premise_id) {
        let node = kind.rebuild(env, reduced, (*right).clone());
        let entry = Derivation {
            id: id.clone(),
            rule: Rule::MTauL,
            action: Action::Tau,
            from,
            to: node.to_string(),
            premises: vec![premise],
        };
        return TauOutcome::Stepped(entry, node);
    }

    let mut descended = (*right).clone();
    descended.env_mut().inherit(&env);
    if let TauOutcome::Stepped(premise, reduced) = tau_step(descended, &premise_id) {
        let node = kind.rebuild(env, (*left).clone(), reduced);
        let entry = Derivation {
            id: id.clone(),
            rule: Rule::MTauR,
            action: Action::Tau,
            from,
            to: node.to_string(),
            premises: vec![premise],
        };
        return TauOutcome::Stepped(entry, node);
    }

    TauOutcome::Stuck(kind.rebuild(env, *left, *right))
}

/// Apply τ-rules to a fixed point, collecting one entry per step.
#[must_use]
pub fn saturate(m: Monitor) -> (Vec<Derivation>, Monitor) {
    let mut entries = Vec::new();
    let mut current = m;
    loop {
        match tau_step(current, &DerivationId::root()) {
            TauOutcome::Stepped(entry, next) => {
                trace!(rule = %entry.rule, to = %entry.to, "tau step");
                entries.push(entry);
                current = next;
            }
            TauOutcome::Stuck(ready) => return (entries, ready),
        }
    }
}

fn choice_guard(m: &Monitor) -> Result<argus_types::Guard, AnalyzerError> {
    match m {
        Monitor::Act(_, guard, _) => Ok(guard.clone()),
        other => Err(AnalyzerError::ChoiceShape { found: other.shape() }),
    }
}

/// Reduce a ready term by one external event.
pub(crate) fn event_step(
    event: &Event,
    m: Monitor,
    id: &DerivationId,
) -> Result<(Derivation, Monitor), AnalyzerError> {
    match m {
        Monitor::Verdict(env, verdict) => {
            let term = Monitor::Verdict(env, verdict);
            let rendered = term.to_string();
            let entry = Derivation::leaf(
                id.clone(),
                Rule::MVrd,
                Action::Ev(event.to_string()),
                rendered.clone(),
                rendered,
            );
            Ok((entry, term))
        }
        Monitor::Act(env, guard, cont) => {
            if !guard(event) {
                return Err(AnalyzerError::Unmatched { event: event.to_string() });
            }
            let from = Monitor::Act(env.clone(), guard, cont.clone()).to_string();
            let mut bound = env;
            if let Some(var) = bound.var.clone() {
                bound.ctx.bind(bound.ns.clone(), var, event.clone());
            }
            let mut next = cont(event);
            next.env_mut().inherit(&bound);
            let entry = Derivation::leaf(
                id.clone(),
                Rule::MAct,
                Action::Ev(event.to_string()),
                from,
                next.to_string(),
            );
            Ok((entry, next))
        }
        Monitor::Chs(env, left, right) => {
            let from = Monitor::chs(env.clone(), (*left).clone(), (*right).clone()).to_string();
            let left_guard = choice_guard(&left)?;
            let right_guard = choice_guard(&right)?;
            let (rule, selected) = match (left_guard(event), right_guard(event)) {
                (true, false) => (Rule::MChsL, left),
                (false, true) => (Rule::MChsR, right),
                (l, r) => {
                    return Err(AnalyzerError::ChoiceGuards {
                        event: event.to_string(),
                        matched: usize::from(l) + usize::from(r),
                    })
                }
            };
            let mut selected = *selected;
            selected.env_mut().inherit(&env);
            let (premise, next) = event_step(event, selected, &id.premise())?;
            let entry = Derivation {
                id: id.clone(),
                rule,
                action: Action::Ev(event.to_string()),
                from,
                to: next.to_string(),
                premises: vec![premise],
            };
            Ok((entry, next))
        }
        Monitor::And(env, left, right) => par_event(env, left, right, ParKind::And, event, id),
        Monitor::Or(env, left, right) => par_event(env, left, right, ParKind::Or, event, id),
        unfolding @ (Monitor::Rec(_, _) | Monitor::Var(_, _)) => {
            Err(AnalyzerError::NotSaturated { shape: unfolding.shape() })
        }
    }
}

/// Parallel event reduction: both children consume the event; their
/// contexts merge left-wins into the rebuilt parent.
fn par_event(
    env: Env,
    left: Box<Monitor>,
    right: Box<Monitor>,
    kind: ParKind,
    event: &Event,
    id: &DerivationId,
) -> Result<(Derivation, Monitor), AnalyzerError> {
    let from = kind
        .rebuild(env.clone(), (*left).clone(), (*right).clone())
        .to_string();

    let left_id = id.premise();
    let right_id = left_id.sibling();

    let mut left = *left;
    left.env_mut().inherit(&env);
    let mut right = *right;
    right.env_mut().inherit(&env);

    let (left_entry, left_next) = event_step(event, left, &left_id)?;
    let (right_entry, right_next) = event_step(event, right, &right_id)?;

    let mut env = env;
    env.ctx = Ctx::merge(left_next.env().ctx.clone(), right_next.env().ctx.clone());
    let node = kind.rebuild(env, left_next, right_next);
    let entry = Derivation {
        id: id.clone(),
        rule: Rule::MPar,
        action: Action::Ev(event.to_string()),
        from,
        to: node.to_string(),
        premises: vec![left_entry, right_entry],
    };
    Ok((entry, node))
}

/// Advance a term by one external event.
///
/// The input is τ-saturated first when needed, then the event step is
/// applied, then τ-rules run to a fixed point again. Entries are
/// returned in chronological order; the returned term is ready for the
/// next event.
///
/// # Errors
///
/// Fails on malformed terms and violated external-choice constraints.
pub fn analyze(event: &Event, m: Monitor) -> Result<(Vec<Derivation>, Monitor), AnalyzerError> {
    let (mut entries, ready) = saturate(m);
    let (step, next) = event_step(event, ready, &DerivationId::root())?;
    entries.push(step);
    let (post, settled) = saturate(next);
    entries.extend(post);
    Ok((entries, settled))
}
