//! Programmatic construction of a [`CodeModel`].

use super::{
    CallId, CallSite, CallTarget, CodeModel, CodeUnit, ConstructorDecl, ConstructorId, FieldDecl,
    FieldId, Members, MethodDecl, MethodId, ModelError, TypeDecl, TypeId, TypeKind,
};
use crate::annotations::MetadataSource;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Collects declarations and validates them into a [`CodeModel`].
///
/// Adding declarations never fails; all consistency checks run in
/// [`CodeModelBuilder::build`], which reports every problem at once.
///
/// # Example
///
/// ```
/// use arch_conform_core::model::{CodeModel, MethodDecl, TypeDecl};
///
/// let mut builder = CodeModel::builder();
/// let service = builder.add_type(TypeDecl::class("app.Service"));
/// builder.add_method(service, MethodDecl::new("run"));
/// let model = builder.build().unwrap();
/// assert_eq!(model.type_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct CodeModelBuilder {
    types: Vec<TypeDecl>,
    members: Vec<Members>,
    fields: Vec<FieldDecl>,
    field_owners: Vec<TypeId>,
    constructors: Vec<ConstructorDecl>,
    constructor_owners: Vec<TypeId>,
    methods: Vec<MethodDecl>,
    method_owners: Vec<TypeId>,
    calls: Vec<CallSite>,
    metadata: Option<Arc<dyn MetadataSource>>,
}

impl CodeModelBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type declaration.
    pub fn add_type(&mut self, decl: TypeDecl) -> TypeId {
        let id = TypeId::new(self.types.len());
        self.types.push(decl);
        self.members.push(Members::default());
        id
    }

    /// Adds a field to `owner`.
    pub fn add_field(&mut self, owner: TypeId, decl: FieldDecl) -> FieldId {
        let id = FieldId::new(self.fields.len());
        self.fields.push(decl);
        self.field_owners.push(owner);
        if let Some(members) = self.members.get_mut(owner.index()) {
            members.fields.push(id);
        }
        id
    }

    /// Adds a constructor to `owner`.
    pub fn add_constructor(&mut self, owner: TypeId, decl: ConstructorDecl) -> ConstructorId {
        let id = ConstructorId::new(self.constructors.len());
        self.constructors.push(decl);
        self.constructor_owners.push(owner);
        if let Some(members) = self.members.get_mut(owner.index()) {
            members.constructors.push(id);
        }
        id
    }

    /// Adds a method to `owner`.
    pub fn add_method(&mut self, owner: TypeId, decl: MethodDecl) -> MethodId {
        let id = MethodId::new(self.methods.len());
        self.methods.push(decl);
        self.method_owners.push(owner);
        if let Some(members) = self.members.get_mut(owner.index()) {
            members.methods.push(id);
        }
        id
    }

    /// Records a call made from `origin`.
    pub fn add_call(&mut self, origin: impl Into<CodeUnit>, target: CallTarget, line: u32) -> CallId {
        let id = CallId::new(self.calls.len());
        self.calls.push(CallSite::new(origin.into(), target, line));
        id
    }

    /// Attaches a structural metadata source used when types are not loadable.
    pub fn metadata_source(&mut self, source: Arc<dyn MetadataSource>) -> &mut Self {
        self.metadata = Some(source);
        self
    }

    /// Validates the collected declarations and computes derived indexes.
    ///
    /// # Errors
    ///
    /// Returns every [`ModelError`] found: duplicate type names, members or
    /// calls referring to unknown handles, and malformed attribute aliases.
    pub fn build(self) -> Result<CodeModel, Vec<ModelError>> {
        let mut errors = Vec::new();

        let mut type_index = HashMap::with_capacity(self.types.len());
        for (i, decl) in self.types.iter().enumerate() {
            if type_index
                .insert(decl.name().to_string(), TypeId::new(i))
                .is_some()
            {
                errors.push(ModelError::DuplicateType {
                    name: decl.name().to_string(),
                });
            }
            validate_attributes(decl, &mut errors);
        }

        let type_count = self.types.len();
        let owner_checks = self
            .field_owners
            .iter()
            .zip(&self.fields)
            .map(|(o, f)| (*o, format!("field '{}'", f.name())))
            .chain(self.constructor_owners.iter().map(|o| (*o, "constructor".to_string())))
            .chain(
                self.method_owners
                    .iter()
                    .zip(&self.methods)
                    .map(|(o, m)| (*o, format!("method '{}'", m.name()))),
            );
        for (owner, member) in owner_checks {
            if owner.index() >= type_count {
                errors.push(ModelError::UnknownOwner {
                    member,
                    index: owner.index(),
                });
            }
        }

        for call in &self.calls {
            let known = match call.origin() {
                CodeUnit::Method(id) => id.index() < self.methods.len(),
                CodeUnit::Constructor(id) => id.index() < self.constructors.len(),
                CodeUnit::StaticInitializer(id) => id.index() < type_count,
            };
            if !known {
                errors.push(ModelError::UnknownCallOrigin {
                    target: call.target().full_name(),
                });
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let mut direct_subtypes = vec![Vec::new(); type_count];
        for (i, decl) in self.types.iter().enumerate() {
            for supertype in decl.supertypes() {
                if let Some(&parent) = type_index.get(supertype) {
                    if parent.index() != i {
                        direct_subtypes[parent.index()].push(TypeId::new(i));
                    }
                }
            }
        }

        let mut model = CodeModel {
            types: self.types,
            members: self.members,
            fields: self.fields,
            field_owners: self.field_owners,
            constructors: self.constructors,
            constructor_owners: self.constructor_owners,
            methods: self.methods,
            method_owners: self.method_owners,
            calls: self.calls,
            call_resolutions: Vec::new(),
            type_index,
            direct_subtypes,
            calls_to: HashMap::new(),
            metadata: self.metadata,
        };

        let resolutions: Vec<Option<MethodId>> = model
            .calls
            .iter()
            .map(|call| model.resolve_call_target(call.target()))
            .collect();
        let mut calls_to: HashMap<MethodId, Vec<CallId>> = HashMap::new();
        for (i, resolved) in resolutions.iter().enumerate() {
            if let Some(method) = resolved {
                calls_to.entry(*method).or_default().push(CallId::new(i));
            }
        }
        model.call_resolutions = resolutions;
        model.calls_to = calls_to;

        debug!(
            "Built code model: {} types, {} methods, {} calls",
            model.types.len(),
            model.methods.len(),
            model.calls.len()
        );

        Ok(model)
    }
}

fn validate_attributes(decl: &TypeDecl, errors: &mut Vec<ModelError>) {
    if decl.attributes().is_empty() {
        return;
    }
    if decl.kind() != TypeKind::Annotation {
        errors.push(ModelError::AttributesOnNonAnnotation {
            type_name: decl.name().to_string(),
        });
        return;
    }

    for attribute in decl.attributes() {
        let Some(alias) = attribute.alias() else {
            continue;
        };
        let is_mirror = alias
            .annotation
            .as_deref()
            .map_or(true, |a| a == decl.name());
        if is_mirror && !decl.attributes().iter().any(|a| a.name() == alias.attribute) {
            errors.push(ModelError::InvalidAlias {
                annotation: decl.name().to_string(),
                attribute: attribute.name().to_string(),
                target: alias.attribute.clone(),
            });
        }
    }
}
