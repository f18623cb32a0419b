//! Context shared by all rules evaluated against one model.

use crate::annotations::AnnotationResolver;
use crate::config::{Config, EvaluationConfig};
use crate::model::{CodeModel, Element};
use crate::proxy::{ProxySettings, ProxyabilityAnalyzer};

/// Everything conditions and predicates consult during one evaluation run.
///
/// Caches live as long as the context and are bound to its model, so a
/// context is built per model snapshot and dropped with it.
#[derive(Debug)]
pub struct EvaluationContext<'m> {
    model: &'m CodeModel,
    resolver: AnnotationResolver<'m>,
    proxy: ProxyabilityAnalyzer<'m>,
    evaluation: EvaluationConfig,
}

impl<'m> EvaluationContext<'m> {
    /// Creates a context with default configuration.
    #[must_use]
    pub fn new(model: &'m CodeModel) -> Self {
        Self::from_config(model, &Config::default())
    }

    /// Creates a context from configuration.
    #[must_use]
    pub fn from_config(model: &'m CodeModel, config: &Config) -> Self {
        Self {
            model,
            resolver: AnnotationResolver::from_config(model, &config.resolver),
            proxy: ProxyabilityAnalyzer::new(model, config.proxy.settings_for(model)),
            evaluation: config.evaluation.clone(),
        }
    }

    /// Replaces the proxy settings.
    #[must_use]
    pub fn with_proxy_settings(mut self, settings: ProxySettings) -> Self {
        self.proxy = ProxyabilityAnalyzer::new(self.model, settings);
        self
    }

    /// Sets the scope size from which checks run in parallel.
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.evaluation.parallel_threshold = threshold.max(1);
        self
    }

    /// Returns the model.
    #[must_use]
    pub fn model(&self) -> &'m CodeModel {
        self.model
    }

    /// Returns the annotation resolver.
    #[must_use]
    pub fn resolver(&self) -> &AnnotationResolver<'m> {
        &self.resolver
    }

    /// Returns the proxyability analyzer.
    #[must_use]
    pub fn proxy(&self) -> &ProxyabilityAnalyzer<'m> {
        &self.proxy
    }

    /// Returns the evaluation settings.
    #[must_use]
    pub fn evaluation(&self) -> &EvaluationConfig {
        &self.evaluation
    }

    /// Describes an element for messages.
    #[must_use]
    pub fn describe(&self, element: &Element) -> String {
        self.model.describe(element)
    }
}
