//! Attribute merging along a meta-annotation path.
//!
//! Values carry a precedence so that a closer declaration can override a
//! farther one: defaults lose to values written on an annotation instance,
//! which lose to values pushed down an explicit alias from a lower level.

use crate::model::{AnnotationInstance, AttributeDecl, AttributeValue};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    Default,
    Declared,
    Aliased,
}

#[derive(Debug, Clone)]
pub(crate) struct MergedValue {
    value: AttributeValue,
    precedence: Precedence,
}

impl MergedValue {
    /// The value as seen through an alias on the next level up.
    fn propagated(&self) -> Self {
        let precedence = match self.precedence {
            Precedence::Default => Precedence::Default,
            Precedence::Declared | Precedence::Aliased => Precedence::Aliased,
        };
        Self {
            value: self.value.clone(),
            precedence,
        }
    }
}

/// One annotation type along the path: its name and declared attributes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Level<'a> {
    pub type_name: &'a str,
    pub declared: &'a [AttributeDecl],
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MergedAttributes(BTreeMap<String, MergedValue>);

impl MergedAttributes {
    /// Merges a directly-present annotation: defaults, then explicit values,
    /// then mirrors.
    pub(crate) fn root(level: Level<'_>, instance: &AnnotationInstance) -> Self {
        Self::from_instance(level, instance)
    }

    /// Merges a meta-annotation instance found on the declaration of `lower`.
    pub(crate) fn meta(
        lower: Level<'_>,
        lower_values: &MergedAttributes,
        meta: Level<'_>,
        instance: &AnnotationInstance,
    ) -> Self {
        let mut merged = Self::from_instance(meta, instance);

        // alias declared on the lower annotation, pointing up
        for attribute in lower.declared {
            let Some(alias) = attribute.alias() else {
                continue;
            };
            if alias.annotation.as_deref() != Some(meta.type_name) {
                continue;
            }
            if let Some(value) = lower_values.0.get(attribute.name()) {
                merged.offer(&alias.attribute, value.propagated());
            }
        }

        // alias declared on the meta-annotation, pointing down
        for attribute in meta.declared {
            let Some(alias) = attribute.alias() else {
                continue;
            };
            if alias.annotation.as_deref() != Some(lower.type_name) {
                continue;
            }
            if let Some(value) = lower_values.0.get(&alias.attribute) {
                merged.offer(attribute.name(), value.propagated());
            }
        }

        merged.apply_mirrors(meta);
        merged
    }

    fn from_instance(level: Level<'_>, instance: &AnnotationInstance) -> Self {
        let mut values = BTreeMap::new();
        for attribute in level.declared {
            if let Some(default) = attribute.default_value() {
                values.insert(
                    attribute.name().to_string(),
                    MergedValue {
                        value: default.clone(),
                        precedence: Precedence::Default,
                    },
                );
            }
        }
        for (name, value) in instance.attributes() {
            values.insert(
                name.clone(),
                MergedValue {
                    value: value.clone(),
                    precedence: Precedence::Declared,
                },
            );
        }

        let mut merged = Self(values);
        merged.apply_mirrors(level);
        merged
    }

    fn offer(&mut self, name: &str, value: MergedValue) {
        match self.0.get(name) {
            Some(existing) if existing.precedence > value.precedence => {}
            _ => {
                self.0.insert(name.to_string(), value);
            }
        }
    }

    /// Copies the stronger value of each mirrored pair onto its partner.
    fn apply_mirrors(&mut self, level: Level<'_>) {
        for attribute in level.declared {
            let Some(alias) = attribute.alias() else {
                continue;
            };
            if alias
                .annotation
                .as_deref()
                .is_some_and(|a| a != level.type_name)
            {
                continue;
            }

            let source = self.0.get(attribute.name()).cloned();
            let partner = self.0.get(&alias.attribute).cloned();
            match (source, partner) {
                (Some(s), Some(p)) if s.precedence > p.precedence => {
                    self.0.insert(alias.attribute.clone(), s);
                }
                (Some(s), Some(p)) if p.precedence > s.precedence => {
                    self.0.insert(attribute.name().to_string(), p);
                }
                (Some(s), None) => {
                    self.0.insert(alias.attribute.clone(), s);
                }
                (None, Some(p)) => {
                    self.0.insert(attribute.name().to_string(), p);
                }
                _ => {}
            }
        }
    }

    pub(crate) fn values(&self) -> BTreeMap<String, AttributeValue> {
        self.0
            .iter()
            .map(|(name, merged)| (name.clone(), merged.value.clone()))
            .collect()
    }
}
