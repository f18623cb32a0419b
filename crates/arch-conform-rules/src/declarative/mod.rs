//! Declarative conformance rules defined in TOML.
//!
//! Rules are declared as arrays of tables next to the base configuration:
//!
//! ```toml
//! [[require-proxyable]]
//! name = "retry-proxyable"
//! annotation = "org.example.retry.Retryable"
//!
//! [[require-enabler]]
//! name = "retry-enabled"
//! annotation = "org.example.retry.Retryable"
//! enabler = "org.example.retry.EnableRetry"
//!
//! [[require-return-type]]
//! name = "async-return-type"
//! annotation = "org.example.Async"
//! types = ["void", "java.util.concurrent.Future"]
//! because = "callers cannot observe any other result"
//!
//! [[deny-dependency]]
//! name = "repository-dependencies"
//! annotation = "org.example.Repository"
//! forbidden = ["org.example.Controller", "org.example.Service"]
//! ```
//!
//! Pipeline: TOML text → [`config_dto`] → [`loader`] → [`model`] →
//! [`create_rules`].

pub mod config_dto;
pub mod loader;
pub mod model;

use crate::{
    companion, companion_when_attribute_set, dependencies, enabler_present, not_self_invoked,
    proxyable_methods, return_types, root_package, single_root,
};
use arch_conform_core::engine::{Condition, ScopeElement};
use arch_conform_core::{ArchRule, RuleBox};
use model::{DeclarativeConfig, DeclaredRule, RuleKind};
use tracing::debug;

/// Errors from loading declarative rules out of TOML text.
#[derive(Debug, thiserror::Error)]
pub enum LoadRulesError {
    /// TOML deserialization failed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Domain model validation failed.
    #[error("{0}")]
    Load(#[from] loader::LoadError),
}

/// Parses TOML content and creates all declared rules.
///
/// Returns `Ok(vec![])` if no declarative sections are present.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or a rule is invalid.
pub fn load_rules_from_toml(content: &str) -> Result<Vec<RuleBox>, LoadRulesError> {
    let dto: config_dto::DeclarativeConfigDto = toml::from_str(content)?;
    let config = loader::load(dto)?;
    Ok(create_rules(&config))
}

/// Creates one rule per declaration of a validated [`DeclarativeConfig`].
#[must_use]
pub fn create_rules(config: &DeclarativeConfig) -> Vec<RuleBox> {
    let rules: Vec<RuleBox> = config.rules().iter().map(create_rule).collect();
    debug!("Created {} declarative rule(s)", rules.len());
    rules
}

fn create_rule(decl: &DeclaredRule) -> RuleBox {
    match decl.kind() {
        RuleKind::RequireProxyable { annotation } => {
            configure(proxyable_methods(annotation.as_str()), decl)
        }
        RuleKind::DenySelfInvocation { annotation } => {
            configure(not_self_invoked(annotation.as_str()), decl)
        }
        RuleKind::RequireEnabler {
            annotation,
            enabler,
        } => configure(enabler_present(annotation.as_str(), enabler.as_str()), decl),
        RuleKind::SingleRoot { annotation } => configure(single_root(annotation.as_str()), decl),
        RuleKind::RootPackage { annotation } => configure(root_package(annotation.as_str()), decl),
        RuleKind::RequireAnnotation {
            annotation,
            requires,
            when_attribute,
        } => match when_attribute {
            Some(attribute) => configure(
                companion_when_attribute_set(annotation.as_str(), attribute, requires.as_str()),
                decl,
            ),
            None => configure(companion(annotation.as_str(), requires.as_str()), decl),
        },
        RuleKind::RequireReturnType { annotation, types } => {
            let allowed: Vec<&str> = types.iter().map(model::QualifiedName::as_str).collect();
            configure(return_types(annotation.as_str(), &allowed), decl)
        }
        RuleKind::DenyDependency {
            annotation,
            forbidden,
        } => {
            let forbidden: Vec<&str> = forbidden.iter().map(model::QualifiedName::as_str).collect();
            configure(dependencies(annotation.as_str(), &forbidden), decl)
        }
    }
}

/// Applies the declared name, reason and empty-scope policy.
fn configure<T, C>(rule: ArchRule<T, C>, decl: &DeclaredRule) -> RuleBox
where
    T: ScopeElement,
    C: Condition<T> + 'static,
{
    let mut rule = rule.named(decl.name().as_str());
    if let Some(reason) = decl.because() {
        rule = rule.because(reason);
    }
    if let Some(allow) = decl.allow_empty_scope() {
        rule = rule.allow_empty(allow);
    }
    rule.boxed()
}
