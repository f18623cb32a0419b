//! Rule trait and the fluent rule builder.

use crate::analyzer::EvaluationError;
use crate::context::EvaluationContext;
use crate::engine::{self, Condition, DescribedPredicate, Scope, ScopeElement};
use crate::types::Report;
use std::fmt;

/// A named rule evaluated against one model.
///
/// Most rules are built fluently from a [`Scope`]:
///
/// ```ignore
/// use arch_conform_core::engine::{annotated_with, Scope};
/// use arch_conform_core::proxy::be_proxyable;
///
/// let rule = Scope::available_methods()
///     .that(annotated_with("org.example.Transactional"))
///     .should(be_proxyable())
///     .named("transactional-proxyable");
/// ```
///
/// Implement the trait directly for rules whose shape does not fit
/// "elements that are P should C".
pub trait Rule: Send + Sync {
    /// Returns the kebab-case name of this rule.
    fn name(&self) -> &str;

    /// Returns the full description, e.g.
    /// `methods that are annotated with @Async should be proxyable`.
    fn description(&self) -> String;

    /// Whether an empty scope is accepted without a violation.
    fn allow_empty_scope(&self) -> bool {
        false
    }

    /// Evaluates the rule with an explicit empty-scope policy.
    ///
    /// # Errors
    ///
    /// Returns an error when a structural precondition fails during init.
    fn evaluate_with(
        &self,
        ctx: &EvaluationContext<'_>,
        allow_empty_scope: bool,
    ) -> Result<Report, EvaluationError>;

    /// Evaluates the rule with its own empty-scope policy.
    ///
    /// # Errors
    ///
    /// Returns an error when a structural precondition fails during init.
    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Report, EvaluationError> {
        self.evaluate_with(ctx, self.allow_empty_scope())
    }
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

impl<T: ScopeElement> Scope<T> {
    /// Narrows the scope to elements satisfying `predicate`.
    #[must_use]
    pub fn that(self, predicate: DescribedPredicate<T>) -> RuleBuilder<T> {
        RuleBuilder {
            scope: self,
            predicate: Some(predicate),
        }
    }

    /// Applies `condition` to every element of the scope.
    #[must_use]
    pub fn should<C: Condition<T>>(self, condition: C) -> ArchRule<T, C> {
        ArchRule::new(self, None, condition)
    }
}

/// A scope narrowed by a predicate, waiting for its condition.
#[derive(Debug, Clone)]
pub struct RuleBuilder<T> {
    scope: Scope<T>,
    predicate: Option<DescribedPredicate<T>>,
}

impl<T: ScopeElement> RuleBuilder<T> {
    /// Further narrows the scope.
    #[must_use]
    pub fn and(self, predicate: DescribedPredicate<T>) -> Self {
        let predicate = match self.predicate {
            Some(existing) => existing.and(predicate),
            None => predicate,
        };
        Self {
            scope: self.scope,
            predicate: Some(predicate),
        }
    }

    /// Completes the rule with a condition.
    #[must_use]
    pub fn should<C: Condition<T>>(self, condition: C) -> ArchRule<T, C> {
        ArchRule::new(self.scope, self.predicate, condition)
    }
}

/// A rule of the form "scope that are predicate should condition".
pub struct ArchRule<T, C> {
    name: Option<String>,
    scope: Scope<T>,
    predicate: Option<DescribedPredicate<T>>,
    condition: C,
    description: Option<String>,
    reason: Option<String>,
    allow_empty_scope: bool,
}

impl<T, C> fmt::Debug for ArchRule<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchRule")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("predicate", &self.predicate)
            .field("allow_empty_scope", &self.allow_empty_scope)
            .finish_non_exhaustive()
    }
}

impl<T: ScopeElement, C: Condition<T>> ArchRule<T, C> {
    fn new(scope: Scope<T>, predicate: Option<DescribedPredicate<T>>, condition: C) -> Self {
        Self {
            name: None,
            scope,
            predicate,
            condition,
            description: None,
            reason: None,
            allow_empty_scope: false,
        }
    }

    /// Sets the rule name used for configuration and reports.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces the generated description.
    #[must_use]
    pub fn described_as(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends `, because <reason>` to the description.
    #[must_use]
    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets whether an empty scope is accepted.
    #[must_use]
    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty_scope = allow;
        self
    }

    /// Returns the rule boxed.
    #[must_use]
    pub fn boxed(self) -> RuleBox
    where
        T: 'static,
        C: 'static,
    {
        Box::new(self)
    }

    fn generated_description(&self) -> String {
        let condition = self.condition.description();
        match &self.predicate {
            Some(p) => format!(
                "{} that are {} should {condition}",
                self.scope.description(),
                p.description()
            ),
            None => format!("{} should {condition}", self.scope.description()),
        }
    }
}

impl<T: ScopeElement, C: Condition<T>> Rule for ArchRule<T, C> {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed-rule")
    }

    fn description(&self) -> String {
        let base = self
            .description
            .clone()
            .unwrap_or_else(|| self.generated_description());
        match &self.reason {
            Some(reason) => format!("{base}, because {reason}"),
            None => base,
        }
    }

    fn allow_empty_scope(&self) -> bool {
        self.allow_empty_scope
    }

    fn evaluate_with(
        &self,
        ctx: &EvaluationContext<'_>,
        allow_empty_scope: bool,
    ) -> Result<Report, EvaluationError> {
        let events = engine::run(
            ctx,
            &self.scope,
            self.predicate.as_ref(),
            &self.condition,
            allow_empty_scope,
        )?;
        Ok(Report::new(self.name(), self.description(), events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{annotated_with, be, not};
    use crate::model::{AnnotationInstance, CodeModel, MethodDecl, TypeDecl, TypeId};

    fn model() -> CodeModel {
        let mut builder = CodeModel::builder();
        let service = builder.add_type(TypeDecl::class("app.Service"));
        builder.add_method(
            service,
            MethodDecl::new("load").annotated(AnnotationInstance::new("fw.Cached")),
        );
        builder.build().expect("valid model")
    }

    #[test]
    fn generated_description() {
        let rule = Scope::methods()
            .that(annotated_with("fw.Cached"))
            .should(be(annotated_with("fw.Logged")))
            .because("cache hits are audited");

        assert_eq!(
            rule.description(),
            "methods that are annotated with @Cached should be annotated with @Logged, \
             because cache hits are audited"
        );
        assert_eq!(rule.name(), "unnamed-rule");
    }

    #[test]
    fn described_as_overrides_generated_text() {
        let rule = Scope::types()
            .should(not(be::<TypeId>(annotated_with("fw.Legacy"))))
            .named("no-legacy")
            .described_as("no legacy classes");
        assert_eq!(rule.description(), "no legacy classes");
        assert_eq!(rule.name(), "no-legacy");
    }

    #[test]
    fn empty_scope_policy() {
        let model = model();
        let ctx = EvaluationContext::new(&model);
        let rule = Scope::methods()
            .that(annotated_with("fw.Async"))
            .should(be(annotated_with("fw.Logged")));

        let report = rule.evaluate(&ctx).expect("evaluates");
        let messages: Vec<_> = report.violations().iter().map(|e| e.message()).collect();
        assert_eq!(messages, vec![engine::EMPTY_SCOPE_MESSAGE]);

        let report = rule.allow_empty(true).evaluate(&ctx).expect("evaluates");
        assert!(report.events.is_empty());
    }

    #[test]
    fn predicates_chain_with_and() {
        let model = model();
        let ctx = EvaluationContext::new(&model);
        let rule = Scope::methods()
            .that(annotated_with("fw.Cached"))
            .and(annotated_with("fw.Logged"))
            .should(be(annotated_with("fw.Cached")))
            .allow_empty(true);

        assert!(rule.description().contains("annotated with @Cached and annotated with @Logged"));
        assert!(rule.evaluate(&ctx).expect("evaluates").events.is_empty());
    }
}
