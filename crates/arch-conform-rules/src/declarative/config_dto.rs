//! TOML deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization.
//! They are converted to domain model types via the loader.

use serde::Deserialize;

/// Raw TOML representation of declarative rules.
///
/// Lives beside the base `Config` sections in the same file; unknown tables
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeclarativeConfigDto {
    /// Proxyable method rules.
    #[serde(rename = "require-proxyable", default)]
    pub require_proxyable: Vec<AnnotatedRuleDto>,

    /// Self-invocation rules.
    #[serde(rename = "deny-self-invocation", default)]
    pub deny_self_invocation: Vec<AnnotatedRuleDto>,

    /// Enabling annotation rules.
    #[serde(rename = "require-enabler", default)]
    pub require_enabler: Vec<RequireEnablerDto>,

    /// Single root type rules.
    #[serde(rename = "single-root", default)]
    pub single_root: Vec<AnnotatedRuleDto>,

    /// Root package rules.
    #[serde(rename = "root-package", default)]
    pub root_package: Vec<AnnotatedRuleDto>,

    /// Companion annotation rules.
    #[serde(rename = "require-annotation", default)]
    pub require_annotation: Vec<RequireAnnotationDto>,

    /// Return type rules.
    #[serde(rename = "require-return-type", default)]
    pub require_return_type: Vec<RequireReturnTypeDto>,

    /// Forbidden dependency rules.
    #[serde(rename = "deny-dependency", default)]
    pub deny_dependency: Vec<DenyDependencyDto>,
}

/// TOML representation of a rule parameterized by one annotation.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotatedRuleDto {
    /// Rule name (e.g., "retryable-proxyable").
    pub name: String,
    /// Fully-qualified annotation name.
    pub annotation: String,
    /// Reason appended to the description.
    #[serde(default)]
    pub because: Option<String>,
    /// Empty-scope policy (default: the rule's own).
    #[serde(rename = "allow-empty-scope", default)]
    pub allow_empty_scope: Option<bool>,
}

/// TOML representation of a require-enabler rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RequireEnablerDto {
    /// Rule name.
    pub name: String,
    /// Feature annotation on methods.
    pub annotation: String,
    /// Enabling annotation on types.
    pub enabler: String,
    /// Reason appended to the description.
    #[serde(default)]
    pub because: Option<String>,
}

/// TOML representation of a require-annotation rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RequireAnnotationDto {
    /// Rule name.
    pub name: String,
    /// Triggering annotation on types.
    pub annotation: String,
    /// Required companion annotation.
    pub requires: String,
    /// Only applies when this attribute is set.
    #[serde(rename = "when-attribute", default)]
    pub when_attribute: Option<String>,
    /// Reason appended to the description.
    #[serde(default)]
    pub because: Option<String>,
    /// Empty-scope policy.
    #[serde(rename = "allow-empty-scope", default)]
    pub allow_empty_scope: Option<bool>,
}

/// TOML representation of a require-return-type rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RequireReturnTypeDto {
    /// Rule name.
    pub name: String,
    /// Method annotation.
    pub annotation: String,
    /// Allowed return types.
    pub types: Vec<String>,
    /// Reason appended to the description.
    #[serde(default)]
    pub because: Option<String>,
    /// Empty-scope policy.
    #[serde(rename = "allow-empty-scope", default)]
    pub allow_empty_scope: Option<bool>,
}

/// TOML representation of a deny-dependency rule.
#[derive(Debug, Clone, Deserialize)]
pub struct DenyDependencyDto {
    /// Rule name.
    pub name: String,
    /// Annotation on the depending types.
    pub annotation: String,
    /// Annotations the depended-on types must not carry.
    pub forbidden: Vec<String>,
    /// Reason appended to the description.
    #[serde(default)]
    pub because: Option<String>,
    /// Empty-scope policy.
    #[serde(rename = "allow-empty-scope", default)]
    pub allow_empty_scope: Option<bool>,
}
