//! # arch-conform-rules
//!
//! Reusable conformance rules for arch-conform.
//!
//! Every rule shape is parameterized by annotation names, so the same
//! building blocks serve any framework whose features are implemented
//! through dynamic proxies.
//!
//! ## Available Rule Shapes
//!
//! | Function | Scope | Checks |
//! |----------|-------|--------|
//! | [`proxyable_methods`] | methods incl. inherited | annotated methods can be intercepted by a proxy |
//! | [`not_self_invoked`] | methods incl. inherited | annotated methods are not called from their own type |
//! | [`enabler_present`] | types | some type carries the enabling annotation if the feature is used |
//! | [`single_root`] | types | at most one type carries the root annotation |
//! | [`root_package`] | types | every type lives in the package tree of the root type |
//! | [`companion`] | types | annotated types also carry a companion annotation |
//! | [`return_types`] | methods | annotated methods return one of the allowed types |
//! | [`dependencies`] | types | annotated types do not depend on types with forbidden stereotypes |
//!
//! ## Usage
//!
//! ```ignore
//! use arch_conform_core::Evaluator;
//! use arch_conform_rules::ProxiedFeature;
//!
//! let retry = ProxiedFeature::new("retry", "org.example.retry.Retryable")
//!     .enabled_by("org.example.retry.EnableRetry");
//!
//! let evaluator = Evaluator::builder().rules(retry.rules()).build()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod companion;
pub mod declarative;
mod dependencies;
mod enabler;
mod names;
mod presets;
mod proxied;
mod return_type;
mod root;

pub use companion::{companion, companion_when_attribute_set};
pub use dependencies::dependencies;
pub use enabler::{enabler_present, EnablerPresent, EnablerState};
pub use presets::ProxiedFeature;
pub use proxied::{not_self_invoked, proxyable_methods};
pub use return_type::{have_return_type_assignable_to, return_types, ReturnTypeAssignableTo};
pub use root::{
    be_in_root_package, have_only_one_root, root_package, single_root, InRootPackage, OnlyOneRoot,
};

/// Re-export core types for convenience.
pub use arch_conform_core::{Report, Rule, RuleBox};
