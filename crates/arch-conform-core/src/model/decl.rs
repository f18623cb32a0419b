//! Declarations that make up a [`CodeModel`](super::CodeModel).
//!
//! These are plain data types produced by an importer. They carry no
//! cross-references of their own; the model arena wires them together.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::element::CodeUnit;

// ────────────────────────────────────────────
// Modifiers and visibility
// ────────────────────────────────────────────

/// A declaration modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// Visible everywhere.
    Public,
    /// Visible to subtypes and the declaring package.
    Protected,
    /// Visible to the declaring type only.
    Private,
    /// Cannot be overridden or subclassed.
    Final,
    /// Belongs to the type rather than an instance.
    Static,
    /// Declared without an implementation.
    Abstract,
}

/// The set of modifiers present on a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(BTreeSet<Modifier>);

impl Modifiers {
    /// Creates an empty modifier set (package-private, non-final).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a modifier.
    pub fn insert(&mut self, modifier: Modifier) {
        self.0.insert(modifier);
    }

    /// Returns true if the modifier is present.
    #[must_use]
    pub fn contains(&self, modifier: Modifier) -> bool {
        self.0.contains(&modifier)
    }

    /// Returns true if `final` is present.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.contains(Modifier::Final)
    }

    /// Derives the effective visibility from the access modifiers.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        if self.contains(Modifier::Public) {
            Visibility::Public
        } else if self.contains(Modifier::Protected) {
            Visibility::Protected
        } else if self.contains(Modifier::Private) {
            Visibility::Private
        } else {
            Visibility::Package
        }
    }

    /// Iterates over the modifiers in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Effective access level of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// `public`
    Public,
    /// `protected`
    Protected,
    /// No access modifier.
    Package,
    /// `private`
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Protected => write!(f, "protected"),
            Self::Package => write!(f, "package-private"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// What kind of type a [`TypeDecl`] declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// A regular class.
    #[default]
    Class,
    /// An interface.
    Interface,
    /// An annotation type.
    Annotation,
    /// An enumeration.
    Enum,
}

impl TypeKind {
    /// Annotation types are interfaces too.
    #[must_use]
    pub fn is_interface(self) -> bool {
        matches!(self, Self::Interface | Self::Annotation)
    }
}

// ────────────────────────────────────────────
// Annotation values
// ────────────────────────────────────────────

/// The value of an annotation attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeValue {
    /// A string literal.
    String(String),
    /// A boolean literal.
    Bool(bool),
    /// An integral literal.
    Int(i64),
    /// A type reference, by fully-qualified name.
    Type(String),
    /// An enum constant.
    #[serde(rename_all = "kebab-case")]
    Enum {
        /// Fully-qualified name of the enum type.
        enum_type: String,
        /// Constant name.
        constant: String,
    },
    /// A nested annotation.
    Annotation(Box<AnnotationInstance>),
    /// An array of values.
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Returns the string content if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean content if this is a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Type(t) => write!(f, "{t}"),
            Self::Enum {
                enum_type,
                constant,
            } => write!(f, "{enum_type}.{constant}"),
            Self::Annotation(a) => write!(f, "@{}", a.type_name()),
            Self::Array(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// An annotation as written on a declaration: its type and the attributes
/// that were set explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationInstance {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,
}

impl AnnotationInstance {
    /// Creates an instance of the given annotation type without attributes.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Sets an attribute explicitly.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Returns the fully-qualified annotation type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the explicitly set attributes.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    /// Returns one explicitly set attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

/// Where an aliased attribute points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTarget {
    /// Annotation type owning the target attribute; `None` means the
    /// declaring annotation itself (a mirror).
    #[serde(default)]
    pub annotation: Option<String>,
    /// Target attribute name.
    pub attribute: String,
}

/// An attribute declared by an annotation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDecl {
    name: String,
    #[serde(default)]
    default: Option<AttributeValue>,
    #[serde(default, rename = "alias-for")]
    alias_for: Option<AliasTarget>,
}

impl AttributeDecl {
    /// Declares an attribute without default and without alias.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            alias_for: None,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<AttributeValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Declares this attribute as a mirror of another attribute of the same annotation.
    #[must_use]
    pub fn mirrors(mut self, attribute: impl Into<String>) -> Self {
        self.alias_for = Some(AliasTarget {
            annotation: None,
            attribute: attribute.into(),
        });
        self
    }

    /// Declares this attribute as an alias of an attribute on another annotation.
    #[must_use]
    pub fn alias_for(mut self, annotation: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.alias_for = Some(AliasTarget {
            annotation: Some(annotation.into()),
            attribute: attribute.into(),
        });
        self
    }

    /// Returns the attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the default value.
    #[must_use]
    pub fn default_value(&self) -> Option<&AttributeValue> {
        self.default.as_ref()
    }

    /// Returns the alias declaration, if any.
    #[must_use]
    pub fn alias(&self) -> Option<&AliasTarget> {
        self.alias_for.as_ref()
    }
}

// ────────────────────────────────────────────
// Declarations
// ────────────────────────────────────────────

/// A parameter of a method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    annotations: Vec<AnnotationInstance>,
}

impl Parameter {
    /// Creates a parameter of the given type.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            annotations: Vec::new(),
        }
    }

    /// Adds a directly-present annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Returns the parameter type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the directly-present annotations.
    #[must_use]
    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }
}

/// A type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    name: String,
    kind: TypeKind,
    modifiers: Modifiers,
    supertypes: Vec<String>,
    annotations: Vec<AnnotationInstance>,
    attributes: Vec<AttributeDecl>,
    loadable: bool,
    static_initializer: bool,
}

impl TypeDecl {
    /// Declares a type of the given kind.
    #[must_use]
    pub fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: Modifiers::new(),
            supertypes: Vec::new(),
            annotations: Vec::new(),
            attributes: Vec::new(),
            loadable: true,
            static_initializer: false,
        }
    }

    /// Declares a class.
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Class, name)
    }

    /// Declares an interface.
    #[must_use]
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Interface, name)
    }

    /// Declares an annotation type.
    #[must_use]
    pub fn annotation(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Annotation, name)
    }

    /// Adds a modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    /// Adds a direct supertype (superclass or interface), by name.
    #[must_use]
    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    /// Adds a directly-present annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Declares an attribute (annotation types only).
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeDecl) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Marks the type as referenced only: its class entity is not available
    /// for full introspection.
    #[must_use]
    pub fn unloadable(mut self) -> Self {
        self.loadable = false;
        self
    }

    /// Marks the type as having a static initializer.
    #[must_use]
    pub fn with_static_initializer(mut self) -> Self {
        self.static_initializer = true;
        self
    }

    /// Returns the fully-qualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the package name (empty for the default package).
    #[must_use]
    pub fn package(&self) -> &str {
        crate::utils::names::package_of(&self.name)
    }

    /// Returns the simple name.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        crate::utils::names::simple_name(&self.name)
    }

    /// Returns the kind of type.
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Returns the modifiers.
    #[must_use]
    pub fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    /// Returns the names of the direct supertypes.
    #[must_use]
    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    /// Returns the directly-present annotations.
    #[must_use]
    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }

    /// Returns the declared attributes.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeDecl] {
        &self.attributes
    }

    /// Whether the class entity can be introspected fully.
    #[must_use]
    pub fn is_loadable(&self) -> bool {
        self.loadable
    }

    /// Whether a static initializer is declared.
    #[must_use]
    pub fn has_static_initializer(&self) -> bool {
        self.static_initializer
    }

    /// Whether the type is `final`.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.modifiers.is_final()
    }

    /// Whether the type is an interface (or annotation type).
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind.is_interface()
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    name: String,
    type_name: String,
    modifiers: Modifiers,
    annotations: Vec<AnnotationInstance>,
}

impl FieldDecl {
    /// Declares a field.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            modifiers: Modifiers::new(),
            annotations: Vec::new(),
        }
    }

    /// Adds a modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    /// Adds a directly-present annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the modifiers.
    #[must_use]
    pub fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    /// Returns the directly-present annotations.
    #[must_use]
    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }
}

/// A constructor declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructorDecl {
    parameters: Vec<Parameter>,
    modifiers: Modifiers,
    annotations: Vec<AnnotationInstance>,
}

impl ConstructorDecl {
    /// Declares a constructor without parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Adds a modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    /// Adds a directly-present annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Returns the parameters.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Returns the modifiers.
    #[must_use]
    pub fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    /// Returns the directly-present annotations.
    #[must_use]
    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    name: String,
    parameters: Vec<Parameter>,
    return_type: String,
    modifiers: Modifiers,
    annotations: Vec<AnnotationInstance>,
}

impl MethodDecl {
    /// Declares a method returning `void` without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: "void".to_string(),
            modifiers: Modifiers::new(),
            annotations: Vec::new(),
        }
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = type_name.into();
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Adds a modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    /// Adds a directly-present annotation.
    #[must_use]
    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameters.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Returns the return type name.
    #[must_use]
    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    /// Returns the modifiers.
    #[must_use]
    pub fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    /// Returns the directly-present annotations.
    #[must_use]
    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }

    /// Returns true if name and parameter types match.
    #[must_use]
    pub fn has_signature(&self, name: &str, parameter_types: &[String]) -> bool {
        self.name == name
            && self.parameters.len() == parameter_types.len()
            && self
                .parameters
                .iter()
                .zip(parameter_types)
                .all(|(p, t)| p.type_name == *t)
    }

    /// Returns true if both methods share name and parameter types.
    #[must_use]
    pub fn overrides_signature_of(&self, other: &MethodDecl) -> bool {
        self.name == other.name
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.type_name == b.type_name)
    }
}

// ────────────────────────────────────────────
// Calls
// ────────────────────────────────────────────

/// The target of a method call, as recorded at the call site.
///
/// The owner is the type named in the call instruction, which need not be
/// part of the imported universe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallTarget {
    owner: String,
    name: String,
    parameter_types: Vec<String>,
}

impl CallTarget {
    /// Creates a call target.
    #[must_use]
    pub fn new<I, S>(owner: impl Into<String>, name: impl Into<String>, parameter_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            owner: owner.into(),
            name: name.into(),
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the owner type name.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter type names.
    #[must_use]
    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    /// Returns `owner.name(param, ...)`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!(
            "{}.{}({})",
            self.owner,
            self.name,
            self.parameter_types.join(", ")
        )
    }
}

/// A call recorded in the body of a code unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    origin: CodeUnit,
    target: CallTarget,
    line: u32,
}

impl CallSite {
    pub(crate) fn new(origin: CodeUnit, target: CallTarget, line: u32) -> Self {
        Self {
            origin,
            target,
            line,
        }
    }

    /// Returns the calling code unit.
    #[must_use]
    pub fn origin(&self) -> CodeUnit {
        self.origin
    }

    /// Returns the call target.
    #[must_use]
    pub fn target(&self) -> &CallTarget {
        &self.target
    }

    /// Returns the source line of the call.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }
}
