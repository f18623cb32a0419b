//! Self-invocation detection.
//!
//! A call whose origin is declared by the same type the call instruction
//! names as target owner never passes through a proxy wrapping that type.

use crate::analyzer::EvaluationError;
use crate::context::EvaluationContext;
use crate::engine::{Condition, ConditionEvent, ConditionEvents};
use crate::model::{CallId, CodeModel, Element, MethodId};

/// Finds calls to a method made from within its own type.
#[derive(Debug, Clone, Copy)]
pub struct SelfInvocationDetector<'m> {
    model: &'m CodeModel,
}

impl<'m> SelfInvocationDetector<'m> {
    /// Creates a detector over a model.
    #[must_use]
    pub fn new(model: &'m CodeModel) -> Self {
        Self { model }
    }

    /// Returns the incoming calls of `method` whose origin's declaring type
    /// is the target owner named at the call site.
    #[must_use]
    pub fn calls_from_within_same_type(&self, method: MethodId) -> Vec<CallId> {
        let model = self.model;
        model
            .calls_to(method)
            .iter()
            .copied()
            .filter(|&call| {
                let Some(site) = model.get_call(call) else {
                    return false;
                };
                model
                    .code_unit_owner(site.origin())
                    .is_some_and(|origin| model.type_decl(origin).name() == site.target().owner())
            })
            .collect()
    }
}

/// Condition reporting each call of a method from within its own type.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotBeCalledFromWithinSameType;

/// Methods should not be called from within the type declaring them.
#[must_use]
pub fn not_be_called_from_within_same_type() -> NotBeCalledFromWithinSameType {
    NotBeCalledFromWithinSameType
}

impl Condition<MethodId> for NotBeCalledFromWithinSameType {
    type State = ();

    fn description(&self) -> String {
        "not be called from within the same class".to_string()
    }

    fn init(&self, _ctx: &EvaluationContext<'_>, _elements: &[MethodId]) -> Result<(), EvaluationError> {
        Ok(())
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        _state: &(),
        method: &MethodId,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        let model = ctx.model();
        let calls = SelfInvocationDetector::new(model).calls_from_within_same_type(*method);

        if calls.is_empty() {
            events.add(ConditionEvent::satisfied(
                Element::Method(*method),
                format!(
                    "{} is not called from within the same class",
                    model.describe(&Element::Method(*method))
                ),
            ));
        }
        for call in calls {
            let element = Element::CallTarget(call);
            let message = model.describe(&element);
            events.add(ConditionEvent::violated(element, message));
        }
        Ok(())
    }
}
