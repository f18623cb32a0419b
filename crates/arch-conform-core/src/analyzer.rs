//! Evaluator orchestrating rule evaluation over one model.

use crate::annotations::ResolveError;
use crate::config::{Config, ConfigError};
use crate::context::EvaluationContext;
use crate::model::CodeModel;
use crate::rule::{Rule, RuleBox};
use crate::types::{EvaluationSummary, RuleOutcome};

use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while evaluating a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum EvaluationError {
    /// Annotation resolution failed for an element.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),

    /// A fact the condition structurally requires does not hold. Fatal to
    /// the rule being evaluated.
    #[error("precondition failed: {message}")]
    #[diagnostic(code(arch_conform::evaluate::precondition))]
    Precondition {
        /// What could not be established.
        message: String,
    },
}

impl EvaluationError {
    /// Creates a precondition error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }
}

/// Builder for configuring an [`Evaluator`].
#[derive(Default)]
pub struct EvaluatorBuilder {
    rules: Vec<RuleBox>,
    config: Option<Config>,
}

impl EvaluatorBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    #[must_use]
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Adds a boxed rule.
    #[must_use]
    pub fn rule_box(mut self, rule: RuleBox) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds several boxed rules.
    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = RuleBox>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the evaluator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration holds out-of-range values.
    pub fn build(self) -> Result<Evaluator, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(Evaluator {
            rules: self.rules,
            config,
        })
    }
}

/// Evaluates a set of rules against models.
///
/// Use [`Evaluator::builder()`] to construct an instance.
pub struct Evaluator {
    rules: Vec<RuleBox>,
    config: Config,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl Evaluator {
    /// Creates a new builder for configuring an evaluator.
    #[must_use]
    pub fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::new()
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Evaluates every enabled rule against a model, with a fresh context.
    #[must_use]
    pub fn evaluate(&self, model: &CodeModel) -> EvaluationSummary {
        let ctx = EvaluationContext::from_config(model, &self.config);
        self.evaluate_in(&ctx)
    }

    /// Evaluates every enabled rule within an existing context.
    ///
    /// A rule failing its precondition is recorded as an error outcome;
    /// the remaining rules still run.
    #[must_use]
    pub fn evaluate_in(&self, ctx: &EvaluationContext<'_>) -> EvaluationSummary {
        info!(
            "Starting evaluation of {} rule(s) over {} type(s)",
            self.rules.len(),
            ctx.model().type_count()
        );

        let mut summary = EvaluationSummary::new();
        for rule in &self.rules {
            let name = rule.name();
            if !self.config.is_rule_enabled(name) {
                debug!("Skipping disabled rule: {}", name);
                summary.skipped.push(name.to_string());
                continue;
            }

            let allow_empty = self.config.rule_allow_empty_scope(name).unwrap_or_else(|| {
                rule.allow_empty_scope() || self.config.evaluation.allow_empty_scope
            });
            debug!("Evaluating rule: {}", name);
            let result = rule.evaluate_with(ctx, allow_empty);
            if let Err(e) = &result {
                warn!("Rule {} could not be evaluated: {}", name, e);
            }
            summary.outcomes.push(RuleOutcome {
                name: name.to_string(),
                result,
            });
        }

        info!(
            "Evaluation complete: {} violation(s) in {} rule(s), {} skipped",
            summary.violation_count(),
            summary.outcomes.len(),
            summary.skipped.len()
        );

        summary
    }
}
