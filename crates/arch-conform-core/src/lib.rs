//! # arch-conform-core
//!
//! Core framework for architecture conformance checks over an imported,
//! immutable code model.
//!
//! This crate provides:
//!
//! - [`CodeModel`] - arena of types, members, parameters and call sites
//! - [`AnnotationResolver`] - meta-annotation aware resolution with alias
//!   merging and a structural fallback tier
//! - [`ProxyabilityAnalyzer`] - can a dynamic proxy intercept a method?
//! - [`SelfInvocationDetector`] - calls that bypass a proxy
//! - [`dependency`] - which imported types a type refers to
//! - [`Rule`], [`engine::Condition`] and [`Evaluator`] - the init / check /
//!   finish evaluation engine producing [`Report`]s
//!
//! ## Example
//!
//! ```ignore
//! use arch_conform_core::engine::{annotated_with, Scope};
//! use arch_conform_core::proxy::be_proxyable;
//! use arch_conform_core::{CodeModel, Evaluator};
//!
//! let model = CodeModel::from_json(&snapshot)?;
//! let evaluator = Evaluator::builder()
//!     .rule(
//!         Scope::available_methods()
//!             .that(annotated_with("org.example.Transactional"))
//!             .should(be_proxyable())
//!             .named("transactional-proxyable"),
//!     )
//!     .build()?;
//!
//! let summary = evaluator.evaluate(&model);
//! assert!(!summary.has_failures(), "{}", summary.format_test_report());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod config;
mod context;
mod rule;
mod types;

pub mod annotations;
pub mod dependency;
pub mod engine;
pub mod invocation;
pub mod model;
pub mod proxy;

/// Utility modules for rule implementations.
pub mod utils;

pub use analyzer::{EvaluationError, Evaluator, EvaluatorBuilder};
pub use annotations::{AnnotationResolver, AnnotationSet, AnnotationSpec, ResolveError};
pub use config::{
    Config, ConfigError, EvaluationConfig, ProxyConfig, ResolverConfig, RuleConfig,
    DEFAULT_MAX_META_DEPTH, DEFAULT_PARALLEL_THRESHOLD,
};
pub use context::EvaluationContext;
pub use dependency::{Dependency, DependencyKind};
pub use invocation::SelfInvocationDetector;
pub use model::{CodeModel, CodeModelBuilder, Element, ModelError};
pub use proxy::{ProxySettings, ProxyStrategy, ProxyVisibility, ProxyabilityAnalyzer};
pub use rule::{ArchRule, Rule, RuleBox, RuleBuilder};
pub use types::{ConditionEvent, ConditionEvents, EvaluationSummary, Outcome, Report, RuleOutcome};
