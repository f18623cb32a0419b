//! Structural annotation metadata, read without loading types.
//!
//! A [`MetadataSource`] plays the role of a compiled-artifact reader: it
//! knows the annotations written on a type and on its methods, keyed by
//! method name only.

use crate::model::{AnnotationInstance, AttributeDecl};
use dashmap::DashMap;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Annotation metadata of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TypeMetadata {
    /// Annotations on the type.
    #[serde(default)]
    pub annotations: Vec<AnnotationInstance>,
    /// Attribute declarations, for annotation types.
    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,
    /// Methods with their annotations. Names may repeat for overloads.
    #[serde(default)]
    pub methods: Vec<MethodMetadata>,
}

impl TypeMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type-level annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Adds an attribute declaration.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeDecl) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds a method entry.
    #[must_use]
    pub fn method(mut self, method: MethodMetadata) -> Self {
        self.methods.push(method);
        self
    }
}

/// Annotation metadata of one method, identified by name only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MethodMetadata {
    /// Method name.
    pub name: String,
    /// Annotations on the method.
    #[serde(default)]
    pub annotations: Vec<AnnotationInstance>,
}

impl MethodMetadata {
    /// Creates a method entry without annotations.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
        }
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// Failure to read metadata for a type.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("failed to read metadata of '{type_name}': {message}")]
#[diagnostic(code(arch_conform::metadata::read))]
pub struct MetadataError {
    /// The type whose metadata was requested.
    pub type_name: String,
    /// Reader-specific failure description.
    pub message: String,
}

/// Reads annotation metadata by fully-qualified type name.
///
/// `Ok(None)` means the type is unknown to the source.
pub trait MetadataSource: Send + Sync + fmt::Debug {
    /// Reads the metadata of one type.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the underlying artifact cannot be read.
    fn read(&self, type_name: &str) -> Result<Option<TypeMetadata>, MetadataError>;
}

/// A [`MetadataSource`] backed by a map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadata {
    types: HashMap<String, TypeMetadata>,
}

impl InMemoryMetadata {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers metadata for a type.
    #[must_use]
    pub fn with(mut self, type_name: impl Into<String>, metadata: TypeMetadata) -> Self {
        self.types.insert(type_name.into(), metadata);
        self
    }
}

impl FromIterator<(String, TypeMetadata)> for InMemoryMetadata {
    fn from_iter<I: IntoIterator<Item = (String, TypeMetadata)>>(iter: I) -> Self {
        Self {
            types: iter.into_iter().collect(),
        }
    }
}

impl MetadataSource for InMemoryMetadata {
    fn read(&self, type_name: &str) -> Result<Option<TypeMetadata>, MetadataError> {
        Ok(self.types.get(type_name).cloned())
    }
}

/// Memoizes reads of an inner source for the lifetime of a resolver.
///
/// Read failures are logged and cached as absent.
#[derive(Debug)]
pub struct CachingMetadataSource<'s> {
    inner: &'s dyn MetadataSource,
    cache: DashMap<String, Option<Arc<TypeMetadata>>>,
}

impl<'s> CachingMetadataSource<'s> {
    /// Wraps a source.
    #[must_use]
    pub fn new(inner: &'s dyn MetadataSource) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Returns the metadata of a type, reading it at most once.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<Arc<TypeMetadata>> {
        if let Some(hit) = self.cache.get(type_name) {
            return hit.value().clone();
        }

        self.cache
            .entry(type_name.to_string())
            .or_insert_with(|| match self.inner.read(type_name) {
                Ok(metadata) => metadata.map(Arc::new),
                Err(e) => {
                    warn!("Treating '{}' as absent: {}", type_name, e);
                    None
                }
            })
            .value()
            .clone()
    }
}
