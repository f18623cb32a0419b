//! Annotations that are only meaningful together with another one.

use crate::names;
use arch_conform_core::engine::{
    annotated_with, annotated_with_matching, be, PredicateCondition, Scope,
};
use arch_conform_core::model::{AttributeValue, TypeId};
use arch_conform_core::ArchRule;

/// Types annotated with `annotation` should also be annotated with
/// `companion`.
///
/// Named `<annotation>-requires-<companion>`.
#[must_use]
pub fn companion(annotation: &str, companion: &str) -> ArchRule<TypeId, PredicateCondition<TypeId>> {
    Scope::types()
        .that(annotated_with(annotation))
        .should(be(annotated_with(companion)))
        .named(rule_name(annotation, companion))
}

/// Types annotated with `annotation` whose merged `attribute` is set should
/// also be annotated with `companion`.
///
/// An attribute counts as set unless it is missing, an empty string or an
/// empty array. Named `<annotation>-requires-<companion>`. An application
/// without any such type conforms.
#[must_use]
pub fn companion_when_attribute_set(
    annotation: &str,
    attribute: &str,
    companion: &str,
) -> ArchRule<TypeId, PredicateCondition<TypeId>> {
    let attribute = attribute.to_string();
    let description = format!("annotated with {} with {attribute}", names::at(annotation));
    let with_attribute = annotated_with_matching(annotation, description, move |spec| {
        spec.attribute(&attribute).is_some_and(is_set)
    });
    Scope::types()
        .that(with_attribute)
        .should(be(annotated_with(companion)))
        .named(rule_name(annotation, companion))
        .allow_empty(true)
}

fn rule_name(annotation: &str, companion: &str) -> String {
    format!("{}-requires-{}", names::slug(annotation), names::slug(companion))
}

fn is_set(value: &AttributeValue) -> bool {
    match value {
        AttributeValue::String(s) => !s.is_empty(),
        AttributeValue::Array(items) => !items.is_empty(),
        _ => true,
    }
}
