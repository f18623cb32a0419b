//! Feature annotations that only take effect once an enabling annotation is
//! present somewhere in the application.

use crate::names;
use arch_conform_core::engine::{Condition, ConditionEvent, ConditionEvents, Scope};
use arch_conform_core::model::{Element, TypeId};
use arch_conform_core::{ArchRule, EvaluationContext, EvaluationError};
use tracing::debug;

/// Condition requiring a type annotated with the enabling annotation as soon
/// as any method uses the feature annotation.
#[derive(Debug, Clone)]
pub struct EnablerPresent {
    feature: String,
    enabler: String,
}

/// Facts about the whole scope, gathered before any element is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnablerState {
    /// Some method in scope carries the feature annotation.
    pub feature_used: bool,
    /// Some type in scope carries the enabling annotation.
    pub enabler_found: bool,
}

impl EnablerPresent {
    /// Creates the condition.
    #[must_use]
    pub fn new(feature: impl Into<String>, enabler: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            enabler: enabler.into(),
        }
    }
}

/// The application should contain a type annotated with `enabler` if any
/// method is annotated with `feature`.
///
/// Named `<feature>-requires-<enabler>`. An empty application is accepted.
#[must_use]
pub fn enabler_present(feature: &str, enabler: &str) -> ArchRule<TypeId, EnablerPresent> {
    Scope::types()
        .should(EnablerPresent::new(feature, enabler))
        .described_as(format!(
            "application should contain a class annotated with {} if any method is annotated with {}",
            names::at(enabler),
            names::at(feature)
        ))
        .named(format!(
            "{}-requires-{}",
            names::slug(feature),
            names::slug(enabler)
        ))
        .allow_empty(true)
}

impl Condition<TypeId> for EnablerPresent {
    type State = EnablerState;

    fn description(&self) -> String {
        format!(
            "have {} present if methods annotated with {} exist",
            names::at(&self.enabler),
            names::at(&self.feature)
        )
    }

    fn init(&self, ctx: &EvaluationContext<'_>, types: &[TypeId]) -> Result<EnablerState, EvaluationError> {
        let model = ctx.model();
        let resolver = ctx.resolver();

        let mut feature_used = false;
        'types: for &ty in types {
            for method in model.all_methods(ty) {
                if resolver.is_present(&Element::Method(method), &self.feature)? {
                    feature_used = true;
                    break 'types;
                }
            }
        }

        let mut enabler_found = false;
        if feature_used {
            for &ty in types {
                if resolver.is_present(&Element::Type(ty), &self.enabler)? {
                    enabler_found = true;
                    break;
                }
            }
        }

        debug!(
            "{} used: {}, {} found: {}",
            names::at(&self.feature),
            feature_used,
            names::at(&self.enabler),
            enabler_found
        );
        Ok(EnablerState {
            feature_used,
            enabler_found,
        })
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        state: &EnablerState,
        ty: &TypeId,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        if !state.feature_used {
            return Ok(());
        }
        let subject = Element::Type(*ty);
        if ctx.resolver().is_present(&subject, &self.enabler)? {
            let message = format!(
                "{} is annotated with {}",
                ctx.describe(&subject),
                names::at(&self.enabler)
            );
            events.add(ConditionEvent::satisfied(subject, message));
        }
        Ok(())
    }

    fn finish(&self, _ctx: &EvaluationContext<'_>, state: &EnablerState, events: &mut ConditionEvents) {
        if state.feature_used && !state.enabler_found {
            events.add(ConditionEvent::violated(
                None,
                format!(
                    "application contains no class annotated with {}",
                    names::at(&self.enabler)
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch_conform_core::model::{AnnotationInstance, CodeModel, MethodDecl, TypeDecl};
    use arch_conform_core::Rule;

    const SCHEDULED: &str = "fw.scheduling.Scheduled";
    const ENABLE_SCHEDULING: &str = "fw.scheduling.EnableScheduling";

    fn model(scheduled: bool, enabled: bool) -> CodeModel {
        let mut builder = CodeModel::builder();
        let mut app = TypeDecl::class("app.Application");
        if enabled {
            app = app.annotated(AnnotationInstance::new(ENABLE_SCHEDULING));
        }
        builder.add_type(app);
        let jobs = builder.add_type(TypeDecl::class("app.Jobs"));
        let mut cleanup = MethodDecl::new("cleanup");
        if scheduled {
            cleanup = cleanup.annotated(AnnotationInstance::new(SCHEDULED));
        }
        builder.add_method(jobs, cleanup);
        builder.build().expect("valid model")
    }

    fn evaluate(model: &CodeModel) -> arch_conform_core::Report {
        enabler_present(SCHEDULED, ENABLE_SCHEDULING)
            .evaluate(&EvaluationContext::new(model))
            .unwrap()
    }

    #[test]
    fn rule_name_and_description() {
        let rule = enabler_present(SCHEDULED, ENABLE_SCHEDULING);
        assert_eq!(rule.name(), "scheduled-requires-enable-scheduling");
        assert_eq!(
            rule.description(),
            "application should contain a class annotated with @EnableScheduling \
             if any method is annotated with @Scheduled"
        );
        assert!(rule.allow_empty_scope());
    }

    #[test]
    fn missing_enabler_is_reported_once_in_finish() {
        let report = evaluate(&model(true, false));
        assert_eq!(report.events.len(), 1);
        let violation = report.violations()[0];
        assert!(violation.element().is_none());
        assert_eq!(
            violation.message(),
            "application contains no class annotated with @EnableScheduling"
        );
    }

    #[test]
    fn present_enabler_is_satisfied() {
        let report = evaluate(&model(true, true));
        assert!(!report.has_violations());
        assert_eq!(
            report.satisfactions()[0].message(),
            "Class <app.Application> is annotated with @EnableScheduling"
        );
    }

    #[test]
    fn unused_feature_needs_no_enabler() {
        let report = evaluate(&model(false, false));
        assert!(report.events.is_empty());
    }

    #[test]
    fn meta_annotated_enabler_counts() {
        let mut builder = CodeModel::builder();
        builder.add_type(
            TypeDecl::annotation("app.EnableEverything")
                .annotated(AnnotationInstance::new(ENABLE_SCHEDULING)),
        );
        builder.add_type(
            TypeDecl::class("app.Application").annotated(AnnotationInstance::new("app.EnableEverything")),
        );
        let jobs = builder.add_type(TypeDecl::class("app.Jobs"));
        builder.add_method(
            jobs,
            MethodDecl::new("cleanup").annotated(AnnotationInstance::new(SCHEDULED)),
        );
        let model = builder.build().expect("valid model");

        let report = evaluate(&model);
        assert!(!report.has_violations());
    }
}
