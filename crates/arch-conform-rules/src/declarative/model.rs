//! Pure domain model for declarative conformance rules.
//!
//! No serde, no I/O. Invariants are enforced at construction time via
//! validated newtypes.

use std::collections::HashMap;
use std::fmt;

// ────────────────────────────────────────────
// Newtypes with validation
// ────────────────────────────────────────────

/// A validated rule name (non-empty, `[a-z0-9-]` only).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleName(String);

impl RuleName {
    /// Creates a new rule name.
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or contains invalid characters.
    pub fn new(name: &str) -> Result<Self, ModelError> {
        if name.is_empty() {
            return Err(ModelError::EmptyRuleName);
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ModelError::InvalidRuleName {
                name: name.to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated fully-qualified type name, e.g. `org.example.Retryable`.
///
/// Dot-separated, no empty segment, no whitespace. Nested types use `$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName(String);

impl QualifiedName {
    /// Creates a new qualified name.
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or malformed.
    pub fn new(name: &str) -> Result<Self, ModelError> {
        if name.is_empty() {
            return Err(ModelError::EmptyQualifiedName);
        }
        if name.chars().any(char::is_whitespace) || name.split('.').any(str::is_empty) {
            return Err(ModelError::InvalidQualifiedName {
                name: name.to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ────────────────────────────────────────────
// Domain entities
// ────────────────────────────────────────────

/// What a declared rule checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Methods annotated with `annotation` should be proxyable.
    RequireProxyable {
        /// The method annotation.
        annotation: QualifiedName,
    },
    /// Methods annotated with `annotation` should not be called from their
    /// own type.
    DenySelfInvocation {
        /// The method annotation.
        annotation: QualifiedName,
    },
    /// Some type should carry `enabler` once `annotation` is used.
    RequireEnabler {
        /// The feature annotation on methods.
        annotation: QualifiedName,
        /// The enabling annotation on types.
        enabler: QualifiedName,
    },
    /// Only one type should carry `annotation`.
    SingleRoot {
        /// The root annotation.
        annotation: QualifiedName,
    },
    /// All types should live in the package tree of the type carrying
    /// `annotation`.
    RootPackage {
        /// The root annotation.
        annotation: QualifiedName,
    },
    /// Types annotated with `annotation` should also carry `requires`.
    RequireAnnotation {
        /// The triggering annotation.
        annotation: QualifiedName,
        /// The required companion annotation.
        requires: QualifiedName,
        /// Only applies when this attribute of `annotation` is set.
        when_attribute: Option<String>,
    },
    /// Methods annotated with `annotation` should return one of `types`.
    RequireReturnType {
        /// The method annotation.
        annotation: QualifiedName,
        /// Allowed return types, never empty.
        types: Vec<QualifiedName>,
    },
    /// Types annotated with `annotation` should not depend on types carrying
    /// any of `forbidden`.
    DenyDependency {
        /// The annotation on depending types.
        annotation: QualifiedName,
        /// Forbidden annotations, never empty.
        forbidden: Vec<QualifiedName>,
    },
}

impl RuleKind {
    /// Returns the TOML table name this kind is declared under.
    #[must_use]
    pub fn table(&self) -> &'static str {
        match self {
            Self::RequireProxyable { .. } => "require-proxyable",
            Self::DenySelfInvocation { .. } => "deny-self-invocation",
            Self::RequireEnabler { .. } => "require-enabler",
            Self::SingleRoot { .. } => "single-root",
            Self::RootPackage { .. } => "root-package",
            Self::RequireAnnotation { .. } => "require-annotation",
            Self::RequireReturnType { .. } => "require-return-type",
            Self::DenyDependency { .. } => "deny-dependency",
        }
    }
}

/// A named rule declared in TOML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredRule {
    name: RuleName,
    kind: RuleKind,
    because: Option<String>,
    allow_empty_scope: Option<bool>,
}

impl DeclaredRule {
    /// Creates a new declared rule.
    #[must_use]
    pub fn new(
        name: RuleName,
        kind: RuleKind,
        because: Option<String>,
        allow_empty_scope: Option<bool>,
    ) -> Self {
        Self {
            name,
            kind,
            because,
            allow_empty_scope,
        }
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &RuleName {
        &self.name
    }

    /// Returns what the rule checks.
    #[must_use]
    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Returns the reason appended to the description.
    #[must_use]
    pub fn because(&self) -> Option<&str> {
        self.because.as_deref()
    }

    /// Returns the empty-scope policy, if declared.
    #[must_use]
    pub fn allow_empty_scope(&self) -> Option<bool> {
        self.allow_empty_scope
    }
}

// ────────────────────────────────────────────
// Aggregate root
// ────────────────────────────────────────────

/// All declared rules, with unique names.
#[derive(Debug, Clone, Default)]
pub struct DeclarativeConfig {
    rules: Vec<DeclaredRule>,
}

impl DeclarativeConfig {
    /// Creates a new declarative config with full validation.
    ///
    /// # Errors
    ///
    /// Returns every name declared more than once, across all tables.
    pub fn new(rules: Vec<DeclaredRule>) -> Result<Self, Vec<ModelError>> {
        let mut seen: HashMap<&RuleName, &'static str> = HashMap::new();
        let mut errors = Vec::new();

        for rule in &rules {
            let table = rule.kind.table();
            match seen.get(&rule.name) {
                Some(&first) => errors.push(ModelError::DuplicateRuleName {
                    name: rule.name.clone(),
                    first,
                    second: table,
                }),
                None => {
                    seen.insert(&rule.name, table);
                }
            }
        }

        if errors.is_empty() {
            Ok(Self { rules })
        } else {
            Err(errors)
        }
    }

    /// Creates an empty declarative config (no declarative rules).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if no declarative rules are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns all rules in declaration order, table by table.
    #[must_use]
    pub fn rules(&self) -> &[DeclaredRule] {
        &self.rules
    }

    /// Gets a rule by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&DeclaredRule> {
        self.rules.iter().find(|r| r.name.as_str() == name)
    }
}

// ────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────

/// Errors in domain model construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Rule name is empty.
    #[error("rule name must not be empty")]
    EmptyRuleName,

    /// Rule name contains invalid characters.
    #[error("invalid rule name `{name}`: must be [a-z0-9-]")]
    InvalidRuleName {
        /// The invalid name.
        name: String,
    },

    /// Annotation or type name is empty.
    #[error("type name must not be empty")]
    EmptyQualifiedName,

    /// Annotation or type name is malformed.
    #[error("invalid type name `{name}`: expected a dotted, fully-qualified name")]
    InvalidQualifiedName {
        /// The invalid name.
        name: String,
    },

    /// Attribute name is empty.
    #[error("attribute name must not be empty")]
    EmptyAttributeName,

    /// A return type rule lists no types.
    #[error("at least one type is required")]
    EmptyTypeList,

    /// Two rules share a name.
    #[error("duplicate rule name `{name}` in [[{first}]] and [[{second}]]")]
    DuplicateRuleName {
        /// The shared name.
        name: RuleName,
        /// Table of the first declaration.
        first: &'static str,
        /// Table of the repeated declaration.
        second: &'static str,
    },
}

// ────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────
