//! # arch-conform
//!
//! Architecture conformance checks over an imported code model.
//!
//! This is the main facade crate that re-exports the core framework and the
//! built-in rule shapes.
//!
//! ## Quick Start: `cargo test` Integration
//!
//! ```toml
//! [dev-dependencies]
//! arch-conform = "0.1"
//! ```
//!
//! ```rust,ignore
//! // tests/architecture.rs
//! #[test]
//! fn architecture() {
//!     let model = arch_conform::CodeModel::from_json(include_str!("model.json")).unwrap();
//!     arch_conform::assert_conforms(&model, None);
//! }
//! ```
//!
//! Rules are declared in `arch-conform.toml` at the workspace root:
//!
//! ```toml
//! [proxy]
//! visibility = "strict"
//!
//! [[require-proxyable]]
//! name = "retry-proxyable"
//! annotation = "org.example.retry.Retryable"
//!
//! [[deny-self-invocation]]
//! name = "retry-not-self-invoked"
//! annotation = "org.example.retry.Retryable"
//! ```
//!
//! ## Programmatic Usage
//!
//! ```rust,ignore
//! use arch_conform::rules::ProxiedFeature;
//! use arch_conform::Evaluator;
//!
//! let retry = ProxiedFeature::new("retry", "org.example.retry.Retryable")
//!     .enabled_by("org.example.retry.EnableRetry");
//!
//! let summary = Evaluator::builder().rules(retry.rules()).build()?.evaluate(&model);
//! ```

#![forbid(unsafe_code)]

// Re-export core types and traits
pub use arch_conform_core::*;

/// Built-in rule shapes and declarative rules.
pub mod rules {
    pub use arch_conform_rules::*;
}

mod runner;

pub use runner::{assert_conforms, assert_rules, assert_rules_with_config};
