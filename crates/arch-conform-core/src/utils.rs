//! Utility functions for rule implementations.

pub mod names;

#[doc(inline)]
pub use names::{is_in_package_tree, package_matches, package_of, simple_name};
