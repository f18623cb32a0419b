//! Dependency constraints between stereotyped types.

use crate::names;
use arch_conform_core::dependency::{depend_on_types_that, DependOnTypesThat};
use arch_conform_core::engine::{annotated_with, not, DescribedPredicate, Not, Scope};
use arch_conform_core::model::TypeId;
use arch_conform_core::ArchRule;

/// Types annotated with `of` should not depend on types annotated with any
/// of `forbidden`.
///
/// Every offending reference is reported with its origin: the field,
/// parameter, method or call site naming the forbidden type. Named
/// `<of>-dependencies`.
#[must_use]
pub fn dependencies(of: &str, forbidden: &[&str]) -> ArchRule<TypeId, Not<DependOnTypesThat>> {
    Scope::types()
        .that(annotated_with(of))
        .should(not(depend_on_types_that(any_annotated_with(forbidden))))
        .named(format!("{}-dependencies", names::slug(of)))
}

fn any_annotated_with(annotations: &[&str]) -> DescribedPredicate<TypeId> {
    annotations
        .iter()
        .map(|a| annotated_with(*a))
        .reduce(DescribedPredicate::or)
        .unwrap_or_else(|| DescribedPredicate::new("annotated with nothing", |_, _| Ok(false)))
}
