//! Rule presets for features implemented through dynamic proxies.

use crate::{enabler_present, not_self_invoked, proxyable_methods};
use arch_conform_core::RuleBox;

/// A framework feature that wraps annotated methods in a proxy, such as
/// retries, caching, transactions or asynchronous execution.
///
/// ```ignore
/// let caching = ProxiedFeature::new("cache", "org.example.Cacheable")
///     .enabled_by("org.example.EnableCaching");
/// assert_eq!(caching.rules().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxiedFeature {
    name: String,
    method_annotation: String,
    enabling_annotation: Option<String>,
    allow_empty_scope: bool,
}

impl ProxiedFeature {
    /// Creates a feature triggered by `method_annotation`.
    ///
    /// An application not using the feature passes by default.
    #[must_use]
    pub fn new(name: impl Into<String>, method_annotation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method_annotation: method_annotation.into(),
            enabling_annotation: None,
            allow_empty_scope: true,
        }
    }

    /// Requires a type annotated with `annotation` whenever the feature is
    /// used.
    #[must_use]
    pub fn enabled_by(mut self, annotation: impl Into<String>) -> Self {
        self.enabling_annotation = Some(annotation.into());
        self
    }

    /// Sets whether an application without annotated methods passes.
    #[must_use]
    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty_scope = allow;
        self
    }

    /// Returns the feature name, used as rule name prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the annotation marking proxied methods.
    #[must_use]
    pub fn method_annotation(&self) -> &str {
        &self.method_annotation
    }

    /// Returns the annotation enabling the feature, if any.
    #[must_use]
    pub fn enabling_annotation(&self) -> Option<&str> {
        self.enabling_annotation.as_deref()
    }

    /// Returns the rules for this feature.
    ///
    /// Includes:
    /// - `<name>-proxyable` - annotated methods can be proxied
    /// - `<name>-not-self-invoked` - annotated methods are not called from
    ///   their own type
    /// - `<name>-enabled` - the enabling annotation is present, only when one
    ///   was configured
    #[must_use]
    pub fn rules(&self) -> Vec<RuleBox> {
        let mut rules = vec![
            proxyable_methods(&self.method_annotation)
                .named(format!("{}-proxyable", self.name))
                .allow_empty(self.allow_empty_scope)
                .boxed(),
            not_self_invoked(&self.method_annotation)
                .named(format!("{}-not-self-invoked", self.name))
                .allow_empty(self.allow_empty_scope)
                .boxed(),
        ];
        if let Some(enabler) = &self.enabling_annotation {
            rules.push(
                enabler_present(&self.method_annotation, enabler)
                    .named(format!("{}-enabled", self.name))
                    .boxed(),
            );
        }
        rules
    }
}
