//! Scopes: which elements a rule evaluates.

use crate::model::{CodeModel, ConstructorId, Element, FieldId, MethodId, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// An element handle a scope can select.
pub trait ScopeElement: Copy + Into<Element> + Send + Sync + fmt::Debug + 'static {
    /// Converts the handle into an [`Element`].
    fn element(self) -> Element {
        self.into()
    }
}

impl ScopeElement for TypeId {}
impl ScopeElement for FieldId {}
impl ScopeElement for ConstructorId {}
impl ScopeElement for MethodId {}

type SelectFn<T> = dyn Fn(&CodeModel) -> Vec<T> + Send + Sync;

/// A described, pure selection of elements of one kind from a model.
///
/// Selection order is deterministic and defines the order of check events.
#[derive(Clone)]
pub struct Scope<T> {
    description: String,
    select: Arc<SelectFn<T>>,
}

impl<T> fmt::Debug for Scope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T: ScopeElement> Scope<T> {
    /// Creates a scope from a selection function.
    pub fn new<F>(description: impl Into<String>, select: F) -> Self
    where
        F: Fn(&CodeModel) -> Vec<T> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            select: Arc::new(select),
        }
    }

    /// Returns the description, e.g. `methods`.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Selects the elements of a model.
    #[must_use]
    pub fn select(&self, model: &CodeModel) -> Vec<T> {
        (self.select)(model)
    }
}

impl Scope<TypeId> {
    /// All types of the model.
    #[must_use]
    pub fn types() -> Self {
        Self::new("classes", |model| model.type_ids().collect())
    }
}

impl Scope<MethodId> {
    /// All methods declared by types of the model.
    #[must_use]
    pub fn methods() -> Self {
        Self::new("methods", |model| model.method_ids().collect())
    }

    /// All methods available on types of the model, walked type by type.
    ///
    /// Selects the same methods as [`Scope::methods`]; only the order
    /// differs. Each method appears once, at the first type in import order
    /// on which it is available: its declaring type or an imported subtype.
    #[must_use]
    pub fn available_methods() -> Self {
        Self::new("methods", |model| {
            let mut seen = HashSet::new();
            model
                .type_ids()
                .flat_map(|t| model.all_methods(t))
                .filter(|m| seen.insert(*m))
                .collect()
        })
    }
}

impl Scope<FieldId> {
    /// All fields of the model.
    #[must_use]
    pub fn fields() -> Self {
        Self::new("fields", |model| model.field_ids().collect())
    }
}

impl Scope<ConstructorId> {
    /// All constructors of the model.
    #[must_use]
    pub fn constructors() -> Self {
        Self::new("constructors", |model| model.constructor_ids().collect())
    }
}
