//! The per-rule evaluation state machine: scope, init, check, finish.

use super::condition::Condition;
use super::predicate::DescribedPredicate;
use super::scope::{Scope, ScopeElement};
use crate::analyzer::EvaluationError;
use crate::context::EvaluationContext;
use crate::rule::Rule;
use crate::types::{ConditionEvent, ConditionEvents, Report};
use rayon::prelude::*;
use tracing::debug;

/// Message reported for an empty scope that must not be empty.
pub const EMPTY_SCOPE_MESSAGE: &str = "scope required at least one element, found 0";

/// Evaluates a rule against a context.
///
/// # Errors
///
/// Returns an error only when the condition's `init` fails; per-element
/// failures are reported as violation events.
pub fn evaluate(rule: &dyn Rule, ctx: &EvaluationContext<'_>) -> Result<Report, EvaluationError> {
    rule.evaluate(ctx)
}

/// Runs the phases for one scope, predicate and condition.
pub(crate) fn run<T, C>(
    ctx: &EvaluationContext<'_>,
    scope: &Scope<T>,
    predicate: Option<&DescribedPredicate<T>>,
    condition: &C,
    allow_empty_scope: bool,
) -> Result<ConditionEvents, EvaluationError>
where
    T: ScopeElement,
    C: Condition<T>,
{
    let mut events = ConditionEvents::new();
    let elements = select(ctx, scope, predicate, &mut events);
    debug!("Scope '{}' selected {} element(s)", scope.description(), elements.len());

    if elements.is_empty() && !allow_empty_scope {
        events.add(ConditionEvent::violated(None, EMPTY_SCOPE_MESSAGE));
        return Ok(events);
    }

    let state = condition.init(ctx, &elements)?;
    debug!("Initialized condition '{}'", condition.description());

    let check = |element: &T| {
        let mut element_events = ConditionEvents::new();
        if let Err(e) = condition.check(ctx, &state, element, &mut element_events) {
            let subject = element.element();
            let message = format!("{} could not be checked: {e}", ctx.describe(&subject));
            element_events.add(ConditionEvent::violated(subject, message));
        }
        element_events
    };

    let per_element: Vec<ConditionEvents> = if elements.len() >= ctx.evaluation().parallel_threshold {
        debug!("Checking {} element(s) in parallel", elements.len());
        elements.par_iter().map(check).collect()
    } else {
        elements.iter().map(check).collect()
    };
    for element_events in per_element {
        events.extend(element_events);
    }

    condition.finish(ctx, &state, &mut events);
    Ok(events)
}

fn select<T: ScopeElement>(
    ctx: &EvaluationContext<'_>,
    scope: &Scope<T>,
    predicate: Option<&DescribedPredicate<T>>,
    events: &mut ConditionEvents,
) -> Vec<T> {
    let candidates = scope.select(ctx.model());
    let Some(predicate) = predicate else {
        return candidates;
    };

    candidates
        .into_iter()
        .filter(|element| match predicate.test(ctx, element) {
            Ok(keep) => keep,
            Err(e) => {
                let subject = element.element();
                let message = format!(
                    "{} could not be tested for '{}': {e}",
                    ctx.describe(&subject),
                    predicate.description()
                );
                events.add(ConditionEvent::violated(subject, message));
                false
            }
        })
        .collect()
}
