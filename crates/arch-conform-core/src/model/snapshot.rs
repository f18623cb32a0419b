//! Serialized form of a [`CodeModel`], as written by an importer.
//!
//! The snapshot is a plain DTO tree: types with nested members and their
//! outgoing calls. [`CodeModelSnapshot::into_model`] converts it through the
//! [`CodeModelBuilder`](super::CodeModelBuilder), so snapshot input is
//! validated exactly like programmatic input.

use super::{
    AnnotationInstance, AttributeDecl, CallTarget, CodeModel, CodeUnit, ConstructorDecl,
    FieldDecl, MethodDecl, ModelError, Modifiers, Parameter, TypeDecl, TypeKind,
};
use crate::annotations::{InMemoryMetadata, TypeMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors from loading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The JSON text could not be deserialized.
    #[error("invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot deserialized but does not form a valid model.
    #[error("invalid code model:\n{}", format_errors(.0))]
    Model(Vec<ModelError>),
}

fn format_errors(errors: &[ModelError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn default_true() -> bool {
    true
}

fn default_return_type() -> String {
    "void".to_string()
}

/// Root of a serialized code model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CodeModelSnapshot {
    /// Imported types.
    #[serde(default)]
    pub types: Vec<TypeSnapshot>,

    /// Structural metadata per type name, served when a type is not loadable.
    #[serde(default)]
    pub metadata: BTreeMap<String, TypeMetadata>,
}

/// A serialized type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TypeSnapshot {
    /// Fully-qualified name.
    pub name: String,
    /// Kind of type.
    #[serde(default)]
    pub kind: TypeKind,
    /// Modifiers.
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Direct supertypes by name.
    #[serde(default)]
    pub supertypes: Vec<String>,
    /// Directly-present annotations.
    #[serde(default)]
    pub annotations: Vec<AnnotationInstance>,
    /// Attribute declarations (annotation types only).
    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,
    /// Whether the class entity is available for introspection.
    #[serde(default = "default_true")]
    pub loadable: bool,
    /// Whether a static initializer exists.
    #[serde(default)]
    pub static_initializer: bool,
    /// Calls made from the static initializer.
    #[serde(default)]
    pub static_initializer_calls: Vec<CallSnapshot>,
    /// Declared fields.
    #[serde(default)]
    pub fields: Vec<FieldSnapshot>,
    /// Declared constructors.
    #[serde(default)]
    pub constructors: Vec<ConstructorSnapshot>,
    /// Declared methods.
    #[serde(default)]
    pub methods: Vec<MethodSnapshot>,
}

/// A serialized field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldSnapshot {
    /// Field name.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Modifiers.
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Directly-present annotations.
    #[serde(default)]
    pub annotations: Vec<AnnotationInstance>,
}

/// A serialized constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConstructorSnapshot {
    /// Parameters.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Modifiers.
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Directly-present annotations.
    #[serde(default)]
    pub annotations: Vec<AnnotationInstance>,
    /// Outgoing calls.
    #[serde(default)]
    pub calls: Vec<CallSnapshot>,
}

/// A serialized method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MethodSnapshot {
    /// Method name.
    pub name: String,
    /// Parameters.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Return type.
    #[serde(default = "default_return_type")]
    pub return_type: String,
    /// Modifiers.
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Directly-present annotations.
    #[serde(default)]
    pub annotations: Vec<AnnotationInstance>,
    /// Outgoing calls.
    #[serde(default)]
    pub calls: Vec<CallSnapshot>,
}

/// A serialized outgoing call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CallSnapshot {
    /// Owner type named by the call.
    pub owner: String,
    /// Called method name.
    pub name: String,
    /// Parameter type names.
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Source line.
    #[serde(default)]
    pub line: u32,
}

impl CallSnapshot {
    fn to_target(&self) -> CallTarget {
        CallTarget::new(&self.owner, &self.name, &self.parameters)
    }
}

impl CodeModelSnapshot {
    /// Converts the snapshot into a validated model.
    ///
    /// # Errors
    ///
    /// Returns the builder's validation errors.
    pub fn into_model(self) -> Result<CodeModel, Vec<ModelError>> {
        let mut builder = CodeModel::builder();
        if !self.metadata.is_empty() {
            builder.metadata_source(Arc::new(
                self.metadata.into_iter().collect::<InMemoryMetadata>(),
            ));
        }

        for ty in self.types {
            let mut decl = TypeDecl::new(ty.kind, ty.name);
            for modifier in ty.modifiers.iter() {
                decl = decl.with_modifier(modifier);
            }
            for supertype in ty.supertypes {
                decl = decl.extends(supertype);
            }
            for annotation in ty.annotations {
                decl = decl.annotated(annotation);
            }
            for attribute in ty.attributes {
                decl = decl.attribute(attribute);
            }
            if !ty.loadable {
                decl = decl.unloadable();
            }
            if ty.static_initializer || !ty.static_initializer_calls.is_empty() {
                decl = decl.with_static_initializer();
            }
            let owner = builder.add_type(decl);

            for call in &ty.static_initializer_calls {
                builder.add_call(CodeUnit::StaticInitializer(owner), call.to_target(), call.line);
            }

            for field in ty.fields {
                let mut decl = FieldDecl::new(field.name, field.type_name);
                for modifier in field.modifiers.iter() {
                    decl = decl.with_modifier(modifier);
                }
                for annotation in field.annotations {
                    decl = decl.annotated(annotation);
                }
                builder.add_field(owner, decl);
            }

            for ctor in ty.constructors {
                let mut decl = ConstructorDecl::new();
                for parameter in ctor.parameters {
                    decl = decl.parameter(parameter);
                }
                for modifier in ctor.modifiers.iter() {
                    decl = decl.with_modifier(modifier);
                }
                for annotation in ctor.annotations {
                    decl = decl.annotated(annotation);
                }
                let id = builder.add_constructor(owner, decl);
                for call in &ctor.calls {
                    builder.add_call(id, call.to_target(), call.line);
                }
            }

            for method in ty.methods {
                let mut decl = MethodDecl::new(method.name).returns(method.return_type);
                for parameter in method.parameters {
                    decl = decl.parameter(parameter);
                }
                for modifier in method.modifiers.iter() {
                    decl = decl.with_modifier(modifier);
                }
                for annotation in method.annotations {
                    decl = decl.annotated(annotation);
                }
                let id = builder.add_method(owner, decl);
                for call in &method.calls {
                    builder.add_call(id, call.to_target(), call.line);
                }
            }
        }

        builder.build()
    }
}

impl CodeModel {
    /// Loads a model from a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Json`] for malformed JSON and
    /// [`SnapshotError::Model`] when the content fails validation.
    pub fn from_json(content: &str) -> Result<Self, SnapshotError> {
        let snapshot: CodeModelSnapshot = serde_json::from_str(content)?;
        snapshot.into_model().map_err(SnapshotError::Model)
    }
}
