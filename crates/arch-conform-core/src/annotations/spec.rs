//! Resolved annotation views.

use crate::model::AttributeValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How an annotation was reached from the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Written directly on the element.
    Direct,
    /// Reached through `depth` levels of meta-annotation.
    Meta {
        /// Number of meta levels between the element and this annotation.
        depth: usize,
    },
}

impl Provenance {
    /// Returns 0 for direct annotations, the meta depth otherwise.
    #[must_use]
    pub fn depth(self) -> usize {
        match self {
            Self::Direct => 0,
            Self::Meta { depth } => depth,
        }
    }
}

/// A resolved, read-only view of one annotation on an element, with
/// attribute aliases already merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSpec {
    type_name: String,
    attributes: BTreeMap<String, AttributeValue>,
    provenance: Provenance,
    root: String,
}

impl AnnotationSpec {
    pub(crate) fn new(
        type_name: impl Into<String>,
        attributes: BTreeMap<String, AttributeValue>,
        provenance: Provenance,
        root: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            attributes,
            provenance,
            root: root.into(),
        }
    }

    /// Returns the fully-qualified annotation type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the simple name of the annotation type.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        crate::utils::simple_name(&self.type_name)
    }

    /// Returns all merged attribute values.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    /// Returns one merged attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Returns how this annotation was reached.
    #[must_use]
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Returns the directly-present annotation this one was reached from.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Whether the annotation is written directly on the element.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.provenance == Provenance::Direct
    }
}

/// All annotations of an element, unique by type name.
///
/// When the same annotation type is reachable along several meta paths the
/// shallowest one is kept; among equally deep paths the first discovered
/// wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSet {
    specs: Vec<AnnotationSpec>,
}

impl AnnotationSet {
    pub(crate) fn insert(&mut self, spec: AnnotationSpec) {
        match self
            .specs
            .iter_mut()
            .find(|s| s.type_name == spec.type_name)
        {
            Some(existing) if existing.provenance.depth() > spec.provenance.depth() => {
                *existing = spec;
            }
            Some(_) => {}
            None => self.specs.push(spec),
        }
    }

    /// Returns the annotation of the given type, if present.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&AnnotationSpec> {
        self.specs.iter().find(|s| s.type_name == type_name)
    }

    /// Whether an annotation of the given type is present.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.get(type_name).is_some()
    }

    /// Iterates in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &AnnotationSpec> {
        self.specs.iter()
    }

    /// Returns the number of distinct annotation types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether no annotation is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, provenance: Provenance, root: &str) -> AnnotationSpec {
        AnnotationSpec::new(name, BTreeMap::new(), provenance, root)
    }

    #[test]
    fn shallowest_path_wins() {
        let mut set = AnnotationSet::default();
        set.insert(spec("a.Component", Provenance::Meta { depth: 2 }, "a.Rest"));
        set.insert(spec("a.Component", Provenance::Meta { depth: 1 }, "a.Service"));
        set.insert(spec("a.Component", Provenance::Meta { depth: 1 }, "a.Other"));

        assert_eq!(set.len(), 1);
        let component = set.get("a.Component").expect("present");
        assert_eq!(component.provenance().depth(), 1);
        assert_eq!(component.root(), "a.Service");
        assert_eq!(component.simple_name(), "Component");
    }

    #[test]
    fn direct_annotations_report_depth_zero() {
        let direct = spec("a.Service", Provenance::Direct, "a.Service");
        assert!(direct.is_direct());
        assert_eq!(direct.provenance().depth(), 0);
    }
}
