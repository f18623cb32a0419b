//! Return type constraints for annotated methods.

use crate::names;
use arch_conform_core::engine::{annotated_with, Condition, ConditionEvent, ConditionEvents, Scope};
use arch_conform_core::model::{Element, MethodId};
use arch_conform_core::{ArchRule, EvaluationContext, EvaluationError};

/// Condition requiring the declared return type to be assignable to one of
/// the allowed types.
#[derive(Debug, Clone)]
pub struct ReturnTypeAssignableTo {
    allowed: Vec<String>,
}

/// Methods should return a type assignable to one of `allowed`.
///
/// Primitive names such as `void` only match themselves.
#[must_use]
pub fn have_return_type_assignable_to<I, S>(allowed: I) -> ReturnTypeAssignableTo
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ReturnTypeAssignableTo {
        allowed: allowed.into_iter().map(Into::into).collect(),
    }
}

/// Methods annotated with `annotation` should return one of `allowed`.
///
/// Named `<annotation>-return-type`.
#[must_use]
pub fn return_types(annotation: &str, allowed: &[&str]) -> ArchRule<MethodId, ReturnTypeAssignableTo> {
    Scope::methods()
        .that(annotated_with(annotation))
        .should(have_return_type_assignable_to(allowed.iter().copied()))
        .named(format!("{}-return-type", names::slug(annotation)))
}

impl Condition<MethodId> for ReturnTypeAssignableTo {
    type State = ();

    fn description(&self) -> String {
        format!("have return type {}", self.allowed.join(" or "))
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
        let Some(decl) = model.get_method(*method) else {
            return Ok(());
        };
        let subject = Element::Method(*method);
        let desc = model.describe(&subject);
        let returned = decl.return_type();

        if self
            .allowed
            .iter()
            .any(|target| model.is_assignable_to(returned, target))
        {
            events.add(ConditionEvent::satisfied(
                subject,
                format!("{desc} has return type {returned}"),
            ));
        } else {
            events.add(ConditionEvent::violated(
                subject,
                format!(
                    "{desc} has return type {returned}, expected {}",
                    self.allowed.join(" or ")
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch_conform_core::model::{AnnotationInstance, CodeModel, MethodDecl, TypeDecl};
    use arch_conform_core::Rule;

    const ASYNC: &str = "fw.Async";
    const FUTURE: &str = "java.util.concurrent.Future";

    fn model() -> CodeModel {
        let mut builder = CodeModel::builder();
        builder.add_type(TypeDecl::interface(FUTURE));
        builder.add_type(TypeDecl::class("app.Job").extends(FUTURE));
        let worker = builder.add_type(TypeDecl::class("app.Worker"));
        let async_method = |name: &str| MethodDecl::new(name).annotated(AnnotationInstance::new(ASYNC));
        builder.add_method(worker, async_method("fire"));
        builder.add_method(worker, async_method("submit").returns("app.Job"));
        builder.add_method(worker, async_method("count").returns("int"));
        builder.add_method(worker, MethodDecl::new("name").returns("java.lang.String"));
        builder.build().expect("valid model")
    }

    #[test]
    fn description_lists_allowed_types() {
        let rule = return_types(ASYNC, &["void", FUTURE]);
        assert_eq!(rule.name(), "async-return-type");
        assert_eq!(
            rule.description(),
            "methods that are annotated with @Async should have return type void or java.util.concurrent.Future"
        );
    }

    #[test]
    fn subtypes_of_allowed_types_pass() {
        let model = model();
        let report = return_types(ASYNC, &["void", FUTURE])
            .evaluate(&EvaluationContext::new(&model))
            .unwrap();

        assert_eq!(report.satisfactions().len(), 2);
        let messages: Vec<_> = report.violations().iter().map(|e| e.message()).collect();
        assert_eq!(
            messages,
            vec!["Method <app.Worker.count()> has return type int, expected void or java.util.concurrent.Future"]
        );
    }
}
