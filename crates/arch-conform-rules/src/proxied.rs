//! Rules for methods whose behavior is added by a proxy.

use crate::names;
use arch_conform_core::engine::{annotated_with, Scope};
use arch_conform_core::invocation::{
    not_be_called_from_within_same_type, NotBeCalledFromWithinSameType,
};
use arch_conform_core::model::MethodId;
use arch_conform_core::proxy::{be_proxyable, BeProxyable};
use arch_conform_core::ArchRule;

/// Methods annotated with `annotation`, including inherited ones, should be
/// proxyable.
///
/// Named `<annotation>-proxyable`, e.g. `retryable-proxyable`.
#[must_use]
pub fn proxyable_methods(annotation: &str) -> ArchRule<MethodId, BeProxyable> {
    Scope::available_methods()
        .that(annotated_with(annotation))
        .should(be_proxyable())
        .named(format!("{}-proxyable", names::slug(annotation)))
}

/// Methods annotated with `annotation`, including inherited ones, should not
/// be called from within the type declaring them.
///
/// Named `<annotation>-not-self-invoked`.
#[must_use]
pub fn not_self_invoked(annotation: &str) -> ArchRule<MethodId, NotBeCalledFromWithinSameType> {
    Scope::available_methods()
        .that(annotated_with(annotation))
        .should(not_be_called_from_within_same_type())
        .named(format!("{}-not-self-invoked", names::slug(annotation)))
}
