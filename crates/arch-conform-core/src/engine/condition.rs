//! Conditions: the init / check / finish visitors a rule applies to its scope.

use super::predicate::DescribedPredicate;
use super::scope::ScopeElement;
use crate::analyzer::EvaluationError;
use crate::context::EvaluationContext;
use crate::model::Element;
use crate::types::{ConditionEvent, ConditionEvents};
use std::fmt;
use std::marker::PhantomData;

/// A condition evaluated over every element of a scope.
///
/// The engine calls [`init`](Self::init) once with the whole scope, then
/// [`check`](Self::check) once per element (possibly from several threads),
/// then [`finish`](Self::finish) once. Facts shared between elements are
/// computed in `init` and handed back read-only as [`Self::State`].
///
/// # Example
///
/// ```ignore
/// use arch_conform_core::engine::{Condition, ConditionEvent, ConditionEvents};
///
/// struct HaveNoFields;
///
/// impl Condition<TypeId> for HaveNoFields {
///     type State = ();
///
///     fn description(&self) -> String { "have no fields".into() }
///
///     fn init(&self, _: &EvaluationContext<'_>, _: &[TypeId]) -> Result<(), EvaluationError> {
///         Ok(())
///     }
///
///     fn check(&self, ctx: &EvaluationContext<'_>, _: &(), ty: &TypeId, events: &mut ConditionEvents)
///         -> Result<(), EvaluationError>
///     {
///         let desc = ctx.describe(&Element::Type(*ty));
///         if ctx.model().fields_of(*ty).is_empty() {
///             events.add(ConditionEvent::satisfied(Element::Type(*ty), format!("{desc} has no fields")));
///         } else {
///             events.add(ConditionEvent::violated(Element::Type(*ty), format!("{desc} has fields")));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Condition<T>: Send + Sync {
    /// Precomputed facts, read-only after `init`.
    type State: Send + Sync;

    /// Returns the description, e.g. `be proxyable`.
    fn description(&self) -> String;

    /// Computes global facts once, before any check.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::Precondition`] when a fact the condition
    /// structurally requires cannot be established. This aborts the rule.
    fn init(&self, ctx: &EvaluationContext<'_>, elements: &[T]) -> Result<Self::State, EvaluationError>;

    /// Checks one element and records its events.
    ///
    /// # Errors
    ///
    /// Errors are turned into a violation for this element only.
    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        state: &Self::State,
        element: &T,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError>;

    /// Records verdicts that do not belong to a single element.
    fn finish(&self, _ctx: &EvaluationContext<'_>, _state: &Self::State, _events: &mut ConditionEvents) {}
}

/// Composition methods available on every condition.
pub trait ConditionExt<T>: Condition<T> + Sized {
    /// Both conditions must hold.
    fn and<B: Condition<T>>(self, other: B) -> And<Self, B> {
        And {
            left: self,
            right: other,
        }
    }

    /// At least one condition must hold.
    fn or<B: Condition<T>>(self, other: B) -> Or<Self, B> {
        Or {
            left: self,
            right: other,
        }
    }

    /// Replaces the description.
    fn described_as(self, description: impl Into<String>) -> Described<Self> {
        Described {
            inner: self,
            description: description.into(),
        }
    }
}

impl<T, C: Condition<T>> ConditionExt<T> for C {}

/// Inverts every event of `condition`.
///
/// An element for which `condition` records no event stays without events.
#[must_use]
pub fn not<C>(condition: C) -> Not<C> {
    Not { inner: condition }
}

/// Elements should satisfy `predicate`.
#[must_use]
pub fn be<T: ScopeElement>(predicate: DescribedPredicate<T>) -> PredicateCondition<T> {
    PredicateCondition { predicate }
}

/// A condition from a description and a per-element check function.
#[must_use]
pub fn each<T, F>(description: impl Into<String>, check: F) -> FnCondition<T, F>
where
    F: Fn(&EvaluationContext<'_>, &T, &mut ConditionEvents) -> Result<(), EvaluationError>
        + Send
        + Sync,
{
    FnCondition {
        description: description.into(),
        check,
        _element: PhantomData,
    }
}

// ────────────────────────────────────────────
// Combinators
// ────────────────────────────────────────────

/// Conjunction of two conditions. Both sides always run every phase.
#[derive(Debug, Clone)]
pub struct And<A, B> {
    left: A,
    right: B,
}

impl<T, A: Condition<T>, B: Condition<T>> Condition<T> for And<A, B> {
    type State = (A::State, B::State);

    fn description(&self) -> String {
        format!("{} and {}", self.left.description(), self.right.description())
    }

    fn init(&self, ctx: &EvaluationContext<'_>, elements: &[T]) -> Result<Self::State, EvaluationError> {
        let left = self.left.init(ctx, elements);
        let right = self.right.init(ctx, elements);
        Ok((left?, right?))
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        state: &Self::State,
        element: &T,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        let left = self.left.check(ctx, &state.0, element, events);
        let right = self.right.check(ctx, &state.1, element, events);
        left.and(right)
    }

    fn finish(&self, ctx: &EvaluationContext<'_>, state: &Self::State, events: &mut ConditionEvents) {
        self.left.finish(ctx, &state.0, events);
        self.right.finish(ctx, &state.1, events);
    }
}

/// Disjunction of two conditions. Both sides always run every phase.
#[derive(Debug, Clone)]
pub struct Or<A, B> {
    left: A,
    right: B,
}

impl<T: ScopeElement, A: Condition<T>, B: Condition<T>> Condition<T> for Or<A, B> {
    type State = (A::State, B::State);

    fn description(&self) -> String {
        format!("{} or {}", self.left.description(), self.right.description())
    }

    fn init(&self, ctx: &EvaluationContext<'_>, elements: &[T]) -> Result<Self::State, EvaluationError> {
        let left = self.left.init(ctx, elements);
        let right = self.right.init(ctx, elements);
        Ok((left?, right?))
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        state: &Self::State,
        element: &T,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        let mut left = ConditionEvents::new();
        let mut right = ConditionEvents::new();
        let left_result = self.left.check(ctx, &state.0, element, &mut left);
        let right_result = self.right.check(ctx, &state.1, element, &mut right);

        // One side holding is enough; an erroring side does not hold.
        let left_holds = left_result.is_ok() && !left.contains_violation();
        let right_holds = right_result.is_ok() && !right.contains_violation();
        if !left_holds && !right_holds {
            let subject = element.element();
            match (left_result, right_result) {
                (Err(e), Err(_)) => return Err(e),
                (Err(e), Ok(())) => left.add(ConditionEvent::violated(subject, e.to_string())),
                (Ok(()), Err(e)) => right.add(ConditionEvent::violated(subject, e.to_string())),
                (Ok(()), Ok(())) => {}
            }
        }
        merge_alternatives(Some(element.element()), left_holds, left, right_holds, right, events);
        Ok(())
    }

    fn finish(&self, ctx: &EvaluationContext<'_>, state: &Self::State, events: &mut ConditionEvents) {
        let mut left = ConditionEvents::new();
        let mut right = ConditionEvents::new();
        self.left.finish(ctx, &state.0, &mut left);
        self.right.finish(ctx, &state.1, &mut right);
        if left.is_empty() && right.is_empty() {
            return;
        }
        let left_holds = !left.contains_violation();
        let right_holds = !right.contains_violation();
        merge_alternatives(None, left_holds, left, right_holds, right, events);
    }
}

fn merge_alternatives(
    element: Option<Element>,
    left_holds: bool,
    left: ConditionEvents,
    right_holds: bool,
    right: ConditionEvents,
    events: &mut ConditionEvents,
) {
    if left_holds || right_holds {
        let mut satisfied = ConditionEvents::new();
        if left_holds {
            satisfied.extend(left);
        }
        if right_holds {
            satisfied.extend(right);
        }
        if satisfied.is_empty() {
            return;
        }
        events.add(ConditionEvent::satisfied(element, join_messages(satisfied.iter())));
    } else {
        let message = join_messages(left.violations().chain(right.violations()));
        events.add(ConditionEvent::violated(element, message));
    }
}

fn join_messages<'a>(events: impl Iterator<Item = &'a ConditionEvent>) -> String {
    events
        .map(ConditionEvent::message)
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Negation of a condition.
#[derive(Debug, Clone)]
pub struct Not<C> {
    inner: C,
}

impl<T, C: Condition<T>> Condition<T> for Not<C> {
    type State = C::State;

    fn description(&self) -> String {
        format!("not {}", self.inner.description())
    }

    fn init(&self, ctx: &EvaluationContext<'_>, elements: &[T]) -> Result<Self::State, EvaluationError> {
        self.inner.init(ctx, elements)
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        state: &Self::State,
        element: &T,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        let mut inner = ConditionEvents::new();
        self.inner.check(ctx, state, element, &mut inner)?;
        events.extend(inner.inverted());
        Ok(())
    }

    fn finish(&self, ctx: &EvaluationContext<'_>, state: &Self::State, events: &mut ConditionEvents) {
        let mut inner = ConditionEvents::new();
        self.inner.finish(ctx, state, &mut inner);
        events.extend(inner.inverted());
    }
}

/// A condition with a replaced description.
#[derive(Debug, Clone)]
pub struct Described<C> {
    inner: C,
    description: String,
}

impl<T, C: Condition<T>> Condition<T> for Described<C> {
    type State = C::State;

    fn description(&self) -> String {
        self.description.clone()
    }

    fn init(&self, ctx: &EvaluationContext<'_>, elements: &[T]) -> Result<Self::State, EvaluationError> {
        self.inner.init(ctx, elements)
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        state: &Self::State,
        element: &T,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        self.inner.check(ctx, state, element, events)
    }

    fn finish(&self, ctx: &EvaluationContext<'_>, state: &Self::State, events: &mut ConditionEvents) {
        self.inner.finish(ctx, state, events);
    }
}

// ────────────────────────────────────────────
// Leaf conditions
// ────────────────────────────────────────────

/// Condition form of a [`DescribedPredicate`].
#[derive(Debug, Clone)]
pub struct PredicateCondition<T> {
    predicate: DescribedPredicate<T>,
}

impl<T: ScopeElement> Condition<T> for PredicateCondition<T> {
    type State = ();

    fn description(&self) -> String {
        format!("be {}", self.predicate.description())
    }

    fn init(&self, _ctx: &EvaluationContext<'_>, _elements: &[T]) -> Result<(), EvaluationError> {
        Ok(())
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        _state: &(),
        element: &T,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        let subject = element.element();
        let desc = ctx.describe(&subject);
        let predicate = self.predicate.description();
        if self.predicate.test(ctx, element)? {
            events.add(ConditionEvent::satisfied(subject, format!("{desc} is {predicate}")));
        } else {
            events.add(ConditionEvent::violated(subject, format!("{desc} is not {predicate}")));
        }
        Ok(())
    }
}

/// Condition built from a closure, see [`each`].
pub struct FnCondition<T, F> {
    description: String,
    check: F,
    _element: PhantomData<fn(&T)>,
}

impl<T, F> fmt::Debug for FnCondition<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCondition")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T, F> Condition<T> for FnCondition<T, F>
where
    F: Fn(&EvaluationContext<'_>, &T, &mut ConditionEvents) -> Result<(), EvaluationError>
        + Send
        + Sync,
{
    type State = ();

    fn description(&self) -> String {
        self.description.clone()
    }

    fn init(&self, _ctx: &EvaluationContext<'_>, _elements: &[T]) -> Result<(), EvaluationError> {
        Ok(())
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        _state: &(),
        element: &T,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        (self.check)(ctx, element, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::annotated_with;
    use crate::model::{AnnotationInstance, CodeModel, MethodDecl, MethodId, TypeDecl};
    use crate::types::Outcome;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn model() -> (CodeModel, MethodId, MethodId) {
        let mut builder = CodeModel::builder();
        let service = builder.add_type(TypeDecl::class("app.Service"));
        let tagged = builder.add_method(
            service,
            MethodDecl::new("load").annotated(AnnotationInstance::new("fw.Cached")),
        );
        let plain = builder.add_method(service, MethodDecl::new("save"));
        (builder.build().expect("valid model"), tagged, plain)
    }

    fn check_one<C: Condition<MethodId>>(
        condition: &C,
        ctx: &EvaluationContext<'_>,
        method: MethodId,
    ) -> ConditionEvents {
        let state = condition.init(ctx, &[method]).expect("init");
        let mut events = ConditionEvents::new();
        condition
            .check(ctx, &state, &method, &mut events)
            .expect("check");
        condition.finish(ctx, &state, &mut events);
        events
    }

    /// Records how often each phase runs and emits a fixed finish event.
    struct Counting<'a> {
        inits: &'a AtomicUsize,
        finishes: &'a AtomicUsize,
        holds: bool,
    }

    impl Condition<MethodId> for Counting<'_> {
        type State = ();

        fn description(&self) -> String {
            "count".to_string()
        }

        fn init(&self, _: &EvaluationContext<'_>, _: &[MethodId]) -> Result<(), EvaluationError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn check(
            &self,
            _: &EvaluationContext<'_>,
            _: &(),
            method: &MethodId,
            events: &mut ConditionEvents,
        ) -> Result<(), EvaluationError> {
            let event = if self.holds {
                ConditionEvent::satisfied(Element::Method(*method), "holds")
            } else {
                ConditionEvent::violated(Element::Method(*method), "fails")
            };
            events.add(event);
            Ok(())
        }

        fn finish(&self, _: &EvaluationContext<'_>, _: &(), _: &mut ConditionEvents) {
            self.finishes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn be_reports_predicate_outcome() {
        let (model, tagged, plain) = model();
        let ctx = EvaluationContext::new(&model);
        let condition = be::<MethodId>(annotated_with("fw.Cached"));

        assert_eq!(condition.description(), "be annotated with @Cached");
        let events = check_one(&condition, &ctx, tagged);
        assert!(!events.contains_violation());

        let events = check_one(&condition, &ctx, plain);
        let messages: Vec<_> = events.violations().map(ConditionEvent::message).collect();
        assert_eq!(
            messages,
            vec!["Method <app.Service.save()> is not annotated with @Cached"]
        );
    }

    #[test]
    fn not_inverts_events() {
        let (model, tagged, _) = model();
        let ctx = EvaluationContext::new(&model);
        let condition = not(be::<MethodId>(annotated_with("fw.Cached")));

        assert_eq!(condition.description(), "not be annotated with @Cached");
        let events = check_one(&condition, &ctx, tagged);
        assert_eq!(events.len(), 1);
        assert!(events.iter().all(|e| e.outcome() == Outcome::Violated));
    }

    #[test]
    fn and_runs_both_sides_without_short_circuit() {
        let (model, tagged, _) = model();
        let ctx = EvaluationContext::new(&model);
        let inits = AtomicUsize::new(0);
        let finishes = AtomicUsize::new(0);
        let failing = Counting {
            inits: &inits,
            finishes: &finishes,
            holds: false,
        };
        let passing = Counting {
            inits: &inits,
            finishes: &finishes,
            holds: true,
        };

        let events = check_one(&failing.and(passing), &ctx, tagged);
        assert_eq!(inits.load(Ordering::SeqCst), 2);
        assert_eq!(finishes.load(Ordering::SeqCst), 2);
        assert_eq!(events.len(), 2);
        assert!(events.contains_violation());
    }

    #[test]
    fn or_holds_when_one_side_holds() {
        let (model, tagged, plain) = model();
        let ctx = EvaluationContext::new(&model);
        let condition = be::<MethodId>(annotated_with("fw.Cached"))
            .or(be(annotated_with("fw.Logged")));

        assert!(!check_one(&condition, &ctx, tagged).contains_violation());

        let events = check_one(&condition, &ctx, plain);
        let messages: Vec<_> = events.violations().map(ConditionEvent::message).collect();
        assert_eq!(
            messages,
            vec![
                "Method <app.Service.save()> is not annotated with @Cached and \
                 Method <app.Service.save()> is not annotated with @Logged"
            ]
        );
    }

    #[test]
    fn or_keeps_the_reason_an_erroring_side_failed() {
        let (model, _, plain) = model();
        let ctx = EvaluationContext::new(&model);
        let unavailable = each::<MethodId, _>("be traced", |_, _, _| {
            Err(EvaluationError::precondition("no trace metadata"))
        });
        let condition = unavailable.or(be(annotated_with("fw.Logged")));

        let events = check_one(&condition, &ctx, plain);
        let messages: Vec<_> = events.violations().map(ConditionEvent::message).collect();
        assert_eq!(
            messages,
            vec![
                "precondition failed: no trace metadata and \
                 Method <app.Service.save()> is not annotated with @Logged"
            ]
        );
    }

    #[test]
    fn or_holds_despite_an_erroring_side() {
        let (model, tagged, _) = model();
        let ctx = EvaluationContext::new(&model);
        let unavailable = each::<MethodId, _>("be traced", |_, _, _| {
            Err(EvaluationError::precondition("no trace metadata"))
        });
        let condition = be::<MethodId>(annotated_with("fw.Cached")).or(unavailable);

        let events = check_one(&condition, &ctx, tagged);
        assert!(!events.contains_violation());
    }

    #[test]
    fn described_as_replaces_description() {
        let condition = each::<MethodId, _>("stay quiet", |_, _, _| Ok(())).described_as("be silent");
        assert_eq!(condition.description(), "be silent");
    }
}
