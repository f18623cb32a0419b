//! Immutable, arena-backed model of an imported codebase.
//!
//! A [`CodeModel`] is produced once (programmatically through
//! [`CodeModelBuilder`] or from a JSON snapshot) and then only read. All
//! declarations are addressed by copyable handles, and the derived indexes
//! (name lookup, inverse supertype edges, incoming calls) are computed at
//! build time.

mod builder;
mod decl;
mod element;
mod snapshot;

pub use builder::CodeModelBuilder;
pub use decl::{
    AliasTarget, AnnotationInstance, AttributeDecl, AttributeValue, CallSite, CallTarget,
    ConstructorDecl, FieldDecl, MethodDecl, Modifier, Modifiers, Parameter, TypeDecl, TypeKind,
    Visibility,
};
pub use element::{CallId, CodeUnit, ConstructorId, Element, FieldId, MethodId, TypeId};
pub use snapshot::{
    CallSnapshot, CodeModelSnapshot, ConstructorSnapshot, FieldSnapshot, MethodSnapshot,
    SnapshotError, TypeSnapshot,
};

use crate::annotations::MetadataSource;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;

/// Errors detected while building a [`CodeModel`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Two types share a fully-qualified name.
    #[error("duplicate type '{name}'")]
    DuplicateType {
        /// The duplicated name.
        name: String,
    },

    /// A member refers to an owner handle not issued by this builder.
    #[error("{member} refers to unknown owner #{index}")]
    UnknownOwner {
        /// Description of the member.
        member: String,
        /// The offending handle index.
        index: usize,
    },

    /// A call refers to an origin code unit not issued by this builder.
    #[error("call to '{target}' has unknown origin")]
    UnknownCallOrigin {
        /// Full name of the call target.
        target: String,
    },

    /// Attributes can only be declared by annotation types.
    #[error("type '{type_name}' declares attributes but is not an annotation type")]
    AttributesOnNonAnnotation {
        /// The declaring type.
        type_name: String,
    },

    /// A mirror alias points to an attribute the annotation does not declare.
    #[error("attribute '{attribute}' of '{annotation}' mirrors undeclared attribute '{target}'")]
    InvalidAlias {
        /// The annotation type.
        annotation: String,
        /// The aliasing attribute.
        attribute: String,
        /// The missing target attribute.
        target: String,
    },
}

#[derive(Debug, Clone, Default)]
struct Members {
    fields: Vec<FieldId>,
    constructors: Vec<ConstructorId>,
    methods: Vec<MethodId>,
}

/// An immutable snapshot of types, members, calls and annotations.
#[derive(Debug, Clone)]
pub struct CodeModel {
    types: Vec<TypeDecl>,
    members: Vec<Members>,
    fields: Vec<FieldDecl>,
    field_owners: Vec<TypeId>,
    constructors: Vec<ConstructorDecl>,
    constructor_owners: Vec<TypeId>,
    methods: Vec<MethodDecl>,
    method_owners: Vec<TypeId>,
    calls: Vec<CallSite>,
    call_resolutions: Vec<Option<MethodId>>,
    type_index: HashMap<String, TypeId>,
    direct_subtypes: Vec<Vec<TypeId>>,
    calls_to: HashMap<MethodId, Vec<CallId>>,
    metadata: Option<Arc<dyn MetadataSource>>,
}

impl CodeModel {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> CodeModelBuilder {
        CodeModelBuilder::new()
    }

    // ────────────────────────────────────────────
    // Types
    // ────────────────────────────────────────────

    /// Returns the number of imported types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Iterates over all type handles in import order.
    pub fn type_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len()).map(TypeId::new)
    }

    /// Returns a type declaration, or `None` for a foreign handle.
    #[must_use]
    pub fn get_type(&self, id: TypeId) -> Option<&TypeDecl> {
        self.types.get(id.index())
    }

    /// Returns a type declaration.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued for this model.
    #[must_use]
    pub fn type_decl(&self, id: TypeId) -> &TypeDecl {
        &self.types[id.index()]
    }

    /// Looks up a type by fully-qualified name.
    #[must_use]
    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.type_index.get(name).copied()
    }

    /// Returns the fields declared by a type.
    #[must_use]
    pub fn fields_of(&self, id: TypeId) -> &[FieldId] {
        self.members.get(id.index()).map_or(&[][..], |m| m.fields.as_slice())
    }

    /// Returns the constructors declared by a type.
    #[must_use]
    pub fn constructors_of(&self, id: TypeId) -> &[ConstructorId] {
        self.members.get(id.index()).map_or(&[][..], |m| m.constructors.as_slice())
    }

    /// Returns the methods declared by a type.
    #[must_use]
    pub fn methods_of(&self, id: TypeId) -> &[MethodId] {
        self.members.get(id.index()).map_or(&[][..], |m| m.methods.as_slice())
    }

    /// Returns the imported types that name `id` as a direct supertype.
    #[must_use]
    pub fn direct_subtypes(&self, id: TypeId) -> &[TypeId] {
        self.direct_subtypes.get(id.index()).map_or(&[][..], Vec::as_slice)
    }

    /// Returns all transitive subtypes of a type, excluding the type itself.
    ///
    /// Cycle-safe; order is breadth-first.
    #[must_use]
    pub fn all_subtypes(&self, id: TypeId) -> Vec<TypeId> {
        Self::breadth_first(id, |t| self.direct_subtypes(t).to_vec())
    }

    /// Returns all imported transitive supertypes, excluding the type itself.
    #[must_use]
    pub fn all_supertypes(&self, id: TypeId) -> Vec<TypeId> {
        Self::breadth_first(id, |t| {
            self.get_type(t)
                .map(|decl| {
                    decl.supertypes()
                        .iter()
                        .filter_map(|name| self.type_by_name(name))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    fn breadth_first<F>(start: TypeId, next: F) -> Vec<TypeId>
    where
        F: Fn(TypeId) -> Vec<TypeId>,
    {
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            for neighbour in next(current) {
                if visited.insert(neighbour) {
                    result.push(neighbour);
                    queue.push_back(neighbour);
                }
            }
        }

        result
    }

    /// Whether a value of type `type_name` can be assigned to `target`.
    ///
    /// Walks supertype names through imported declarations; supertypes that
    /// were never imported are matched by name but not expanded.
    #[must_use]
    pub fn is_assignable_to(&self, type_name: &str, target: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::from([type_name]);
        let mut queue = VecDeque::from([type_name]);

        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            let Some(decl) = self.type_by_name(current).and_then(|id| self.get_type(id)) else {
                continue;
            };
            for supertype in decl.supertypes() {
                if visited.insert(supertype.as_str()) {
                    queue.push_back(supertype.as_str());
                }
            }
        }

        false
    }

    // ────────────────────────────────────────────
    // Members
    // ────────────────────────────────────────────

    /// Returns a field declaration, or `None` for a foreign handle.
    #[must_use]
    pub fn get_field(&self, id: FieldId) -> Option<&FieldDecl> {
        self.fields.get(id.index())
    }

    /// Returns the declaring type of a field.
    #[must_use]
    pub fn field_owner(&self, id: FieldId) -> Option<TypeId> {
        self.field_owners.get(id.index()).copied()
    }

    /// Returns a constructor declaration, or `None` for a foreign handle.
    #[must_use]
    pub fn get_constructor(&self, id: ConstructorId) -> Option<&ConstructorDecl> {
        self.constructors.get(id.index())
    }

    /// Returns the declaring type of a constructor.
    #[must_use]
    pub fn constructor_owner(&self, id: ConstructorId) -> Option<TypeId> {
        self.constructor_owners.get(id.index()).copied()
    }

    /// Returns a method declaration, or `None` for a foreign handle.
    #[must_use]
    pub fn get_method(&self, id: MethodId) -> Option<&MethodDecl> {
        self.methods.get(id.index())
    }

    /// Returns a method declaration.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued for this model.
    #[must_use]
    pub fn method(&self, id: MethodId) -> &MethodDecl {
        &self.methods[id.index()]
    }

    /// Returns the declaring type of a method.
    #[must_use]
    pub fn method_owner(&self, id: MethodId) -> Option<TypeId> {
        self.method_owners.get(id.index()).copied()
    }

    /// Iterates over all field handles.
    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        (0..self.fields.len()).map(FieldId::new)
    }

    /// Iterates over all constructor handles.
    pub fn constructor_ids(&self) -> impl Iterator<Item = ConstructorId> + '_ {
        (0..self.constructors.len()).map(ConstructorId::new)
    }

    /// Iterates over all method handles.
    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> + '_ {
        (0..self.methods.len()).map(MethodId::new)
    }

    /// Returns the methods declared by a type followed by those declared by
    /// its imported supertypes, breadth-first.
    #[must_use]
    pub fn all_methods(&self, id: TypeId) -> Vec<MethodId> {
        std::iter::once(id)
            .chain(self.all_supertypes(id))
            .flat_map(|t| self.methods_of(t).iter().copied())
            .collect()
    }

    /// Finds a method declared directly by `owner` with the given signature.
    #[must_use]
    pub fn find_method(&self, owner: TypeId, name: &str, parameter_types: &[String]) -> Option<MethodId> {
        self.methods_of(owner)
            .iter()
            .copied()
            .find(|&m| self.method(m).has_signature(name, parameter_types))
    }

    /// Returns the declaring type of a code unit.
    #[must_use]
    pub fn code_unit_owner(&self, unit: CodeUnit) -> Option<TypeId> {
        match unit {
            CodeUnit::Method(id) => self.method_owner(id),
            CodeUnit::Constructor(id) => self.constructor_owner(id),
            CodeUnit::StaticInitializer(id) => self.get_type(id).map(|_| id),
        }
    }

    /// Returns the parameters of a code unit. Static initializers have none.
    #[must_use]
    pub fn parameters_of(&self, unit: CodeUnit) -> Option<&[Parameter]> {
        match unit {
            CodeUnit::Method(id) => self.get_method(id).map(MethodDecl::parameters),
            CodeUnit::Constructor(id) => self.get_constructor(id).map(ConstructorDecl::parameters),
            CodeUnit::StaticInitializer(id) => self.get_type(id).map(|_| &[][..]),
        }
    }

    // ────────────────────────────────────────────
    // Calls
    // ────────────────────────────────────────────

    /// Iterates over all call handles.
    pub fn call_ids(&self) -> impl Iterator<Item = CallId> + '_ {
        (0..self.calls.len()).map(CallId::new)
    }

    /// Returns a call site, or `None` for a foreign handle.
    #[must_use]
    pub fn get_call(&self, id: CallId) -> Option<&CallSite> {
        self.calls.get(id.index())
    }

    /// Returns the imported method a call resolves to, if any.
    #[must_use]
    pub fn resolved_target(&self, id: CallId) -> Option<MethodId> {
        self.call_resolutions.get(id.index()).copied().flatten()
    }

    /// Returns the calls whose target resolves to `method`.
    #[must_use]
    pub fn calls_to(&self, method: MethodId) -> &[CallId] {
        self.calls_to.get(&method).map_or(&[][..], Vec::as_slice)
    }

    /// Resolves a call target to an imported method, walking imported
    /// supertypes of the named owner.
    #[must_use]
    pub fn resolve_call_target(&self, target: &CallTarget) -> Option<MethodId> {
        let owner = self.type_by_name(target.owner())?;
        std::iter::once(owner)
            .chain(self.all_supertypes(owner))
            .find_map(|t| self.find_method(t, target.name(), target.parameter_types()))
    }

    // ────────────────────────────────────────────
    // Elements
    // ────────────────────────────────────────────

    /// Returns the optional structural metadata source.
    #[must_use]
    pub fn metadata_source(&self) -> Option<&dyn MetadataSource> {
        self.metadata.as_deref()
    }

    /// Returns the type that declares an element.
    ///
    /// Call targets report the declaring type of the resolved method.
    #[must_use]
    pub fn declaring_type(&self, element: &Element) -> Option<TypeId> {
        match element {
            Element::Type(id) | Element::StaticInitializer(id) => self.get_type(*id).map(|_| *id),
            Element::Field(id) => self.field_owner(*id),
            Element::Constructor(id) => self.constructor_owner(*id),
            Element::Method(id) => self.method_owner(*id),
            Element::Parameter { owner, .. } => self.code_unit_owner(*owner),
            Element::CallTarget(id) => self
                .resolved_target(*id)
                .and_then(|m| self.method_owner(m)),
            Element::Package(_) => None,
        }
    }

    /// Returns the annotations directly present on an element.
    ///
    /// Static initializers carry none. Returns `None` when the element does
    /// not belong to this model, when a parameter index is out of range,
    /// for unresolvable call targets and for packages.
    #[must_use]
    pub fn direct_annotations(&self, element: &Element) -> Option<&[AnnotationInstance]> {
        match element {
            Element::Type(id) => self.get_type(*id).map(TypeDecl::annotations),
            Element::Field(id) => self.get_field(*id).map(FieldDecl::annotations),
            Element::Constructor(id) => self.get_constructor(*id).map(ConstructorDecl::annotations),
            Element::Method(id) => self.get_method(*id).map(MethodDecl::annotations),
            Element::Parameter { owner, index } => self
                .parameters_of(*owner)
                .and_then(|params| params.get(*index))
                .map(Parameter::annotations),
            Element::StaticInitializer(id) => self.get_type(*id).map(|_| &[][..]),
            Element::CallTarget(id) => self
                .resolved_target(*id)
                .and_then(|m| self.get_method(m))
                .map(MethodDecl::annotations),
            Element::Package(_) => None,
        }
    }

    /// Returns `owner.name(params)` for a method.
    #[must_use]
    pub fn method_full_name(&self, id: MethodId) -> String {
        match (self.get_method(id), self.method_owner(id)) {
            (Some(method), Some(owner)) => format!(
                "{}.{}({})",
                self.type_decl(owner).name(),
                method.name(),
                join_types(method.parameters())
            ),
            _ => format!("#{}", id.index()),
        }
    }

    /// Describes a code unit for messages.
    #[must_use]
    pub fn describe_code_unit(&self, unit: CodeUnit) -> String {
        match unit {
            CodeUnit::Method(id) => format!("Method <{}>", self.method_full_name(id)),
            CodeUnit::Constructor(id) => {
                match (self.get_constructor(id), self.constructor_owner(id)) {
                    (Some(ctor), Some(owner)) => format!(
                        "Constructor <{}.<init>({})>",
                        self.type_decl(owner).name(),
                        join_types(ctor.parameters())
                    ),
                    _ => format!("Constructor <#{}>", id.index()),
                }
            }
            CodeUnit::StaticInitializer(id) => match self.get_type(id) {
                Some(decl) => format!("Static Initializer <{}.<clinit>()>", decl.name()),
                None => format!("Static Initializer <#{}>", id.index()),
            },
        }
    }

    /// Describes an element for messages, e.g. `Class <com.example.Service>`
    /// or `Method <com.example.Service.run()>`.
    #[must_use]
    pub fn describe(&self, element: &Element) -> String {
        match element {
            Element::Type(id) => match self.get_type(*id) {
                Some(decl) => {
                    let kind = match decl.kind() {
                        TypeKind::Class => "Class",
                        TypeKind::Interface => "Interface",
                        TypeKind::Annotation => "Annotation",
                        TypeKind::Enum => "Enum",
                    };
                    format!("{kind} <{}>", decl.name())
                }
                None => format!("Class <#{}>", id.index()),
            },
            Element::Field(id) => match (self.get_field(*id), self.field_owner(*id)) {
                (Some(field), Some(owner)) => {
                    format!("Field <{}.{}>", self.type_decl(owner).name(), field.name())
                }
                _ => format!("Field <#{}>", id.index()),
            },
            Element::Constructor(id) => self.describe_code_unit(CodeUnit::Constructor(*id)),
            Element::Method(id) => self.describe_code_unit(CodeUnit::Method(*id)),
            Element::StaticInitializer(id) => {
                self.describe_code_unit(CodeUnit::StaticInitializer(*id))
            }
            Element::Parameter { owner, index } => {
                let unit = self.describe_code_unit(*owner);
                match self.parameters_of(*owner).and_then(|p| p.get(*index)) {
                    Some(param) => format!("Parameter <{}> at index {index} of {unit}", param.type_name()),
                    None => format!("Parameter at index {index} of {unit}"),
                }
            }
            Element::CallTarget(id) => match self.get_call(*id) {
                Some(call) => format!(
                    "{} calls method <{}> in line {}",
                    self.describe_code_unit(call.origin()),
                    call.target().full_name(),
                    call.line()
                ),
                None => format!("Call <#{}>", id.index()),
            },
            Element::Package(name) => format!("Package <{name}>"),
        }
    }
}

fn join_types(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(Parameter::type_name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> CodeModel {
        let mut builder = CodeModel::builder();
        let base = builder.add_type(TypeDecl::class("app.Base"));
        builder.add_type(TypeDecl::class("app.Mid").extends("app.Base"));
        builder.add_type(TypeDecl::class("app.web.Leaf").extends("app.Mid"));
        builder.add_type(TypeDecl::class("app.Other").extends("java.lang.Object"));
        builder.add_method(
            base,
            MethodDecl::new("run").parameter(Parameter::new("java.lang.String")),
        );
        builder.build().expect("valid model")
    }

    #[test]
    fn subtypes_are_transitive() {
        let model = hierarchy();
        let base = model.type_by_name("app.Base").expect("base");
        let names: Vec<_> = model
            .all_subtypes(base)
            .into_iter()
            .map(|t| model.type_decl(t).name().to_string())
            .collect();
        assert_eq!(names, vec!["app.Mid", "app.web.Leaf"]);
    }

    #[test]
    fn subtypes_terminate_on_cycles() {
        let mut builder = CodeModel::builder();
        builder.add_type(TypeDecl::interface("a.X").extends("a.Y"));
        builder.add_type(TypeDecl::interface("a.Y").extends("a.X"));
        let model = builder.build().expect("valid model");

        let x = model.type_by_name("a.X").expect("x");
        assert_eq!(model.all_subtypes(x).len(), 1);
        assert_eq!(model.all_supertypes(x).len(), 1);
    }

    #[test]
    fn inherited_methods_are_available() {
        let model = hierarchy();
        let leaf = model.type_by_name("app.web.Leaf").expect("leaf");
        let methods = model.all_methods(leaf);
        assert_eq!(methods.len(), 1);
        assert_eq!(model.method_full_name(methods[0]), "app.Base.run(java.lang.String)");
    }

    #[test]
    fn call_targets_resolve_through_supertypes() {
        let model = hierarchy();
        let target = CallTarget::new("app.web.Leaf", "run", ["java.lang.String"]);
        let resolved = model.resolve_call_target(&target).expect("resolved");
        assert_eq!(model.method(resolved).name(), "run");

        let missing = CallTarget::new("ext.Unknown", "run", ["java.lang.String"]);
        assert!(model.resolve_call_target(&missing).is_none());
    }

    #[test]
    fn assignability_follows_names() {
        let model = hierarchy();
        assert!(model.is_assignable_to("app.web.Leaf", "app.Base"));
        assert!(model.is_assignable_to("app.Other", "java.lang.Object"));
        assert!(!model.is_assignable_to("app.Base", "app.Mid"));
    }

    #[test]
    fn describes_elements() {
        let model = hierarchy();
        let base = model.type_by_name("app.Base").expect("base");
        let run = model.methods_of(base)[0];

        assert_eq!(model.describe(&Element::Type(base)), "Class <app.Base>");
        assert_eq!(
            model.describe(&Element::Method(run)),
            "Method <app.Base.run(java.lang.String)>"
        );
        assert_eq!(
            model.describe(&Element::Parameter {
                owner: CodeUnit::Method(run),
                index: 0
            }),
            "Parameter <java.lang.String> at index 0 of Method <app.Base.run(java.lang.String)>"
        );
        assert_eq!(
            model.describe(&Element::Package("app".to_string())),
            "Package <app>"
        );
    }

    #[test]
    fn foreign_handles_have_no_annotations() {
        let model = hierarchy();
        assert!(model.direct_annotations(&Element::Type(TypeId::new(99))).is_none());
        assert!(model
            .direct_annotations(&Element::Package("app".to_string()))
            .is_none());
    }
}
