//! Handles into the model arena and the closed set of queryable elements.

use serde::{Deserialize, Serialize};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(u32::try_from(index).unwrap_or(u32::MAX))
            }

            /// Returns the arena index of this handle.
            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

handle!(
    /// Handle of a type declaration.
    TypeId
);
handle!(
    /// Handle of a field declaration.
    FieldId
);
handle!(
    /// Handle of a constructor declaration.
    ConstructorId
);
handle!(
    /// Handle of a method declaration.
    MethodId
);
handle!(
    /// Handle of a recorded call site.
    CallId
);

/// A unit of code that can contain calls and own parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodeUnit {
    /// A method body.
    Method(MethodId),
    /// A constructor body.
    Constructor(ConstructorId),
    /// The static initializer of a type.
    StaticInitializer(TypeId),
}

impl From<MethodId> for CodeUnit {
    fn from(id: MethodId) -> Self {
        Self::Method(id)
    }
}

impl From<ConstructorId> for CodeUnit {
    fn from(id: ConstructorId) -> Self {
        Self::Constructor(id)
    }
}

/// Anything annotation resolution or a rule can be asked about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Element {
    /// A type.
    Type(TypeId),
    /// A field.
    Field(FieldId),
    /// A constructor.
    Constructor(ConstructorId),
    /// A method.
    Method(MethodId),
    /// The parameter at `index` of a code unit.
    Parameter {
        /// Code unit declaring the parameter.
        owner: CodeUnit,
        /// Zero-based parameter position.
        index: usize,
    },
    /// The static initializer of a type.
    StaticInitializer(TypeId),
    /// The target of a recorded call.
    CallTarget(CallId),
    /// A package, by name.
    Package(String),
}

impl From<TypeId> for Element {
    fn from(id: TypeId) -> Self {
        Self::Type(id)
    }
}

impl From<FieldId> for Element {
    fn from(id: FieldId) -> Self {
        Self::Field(id)
    }
}

impl From<ConstructorId> for Element {
    fn from(id: ConstructorId) -> Self {
        Self::Constructor(id)
    }
}

impl From<MethodId> for Element {
    fn from(id: MethodId) -> Self {
        Self::Method(id)
    }
}

impl From<CallId> for Element {
    fn from(id: CallId) -> Self {
        Self::CallTarget(id)
    }
}

impl From<CodeUnit> for Element {
    fn from(unit: CodeUnit) -> Self {
        match unit {
            CodeUnit::Method(id) => Self::Method(id),
            CodeUnit::Constructor(id) => Self::Constructor(id),
            CodeUnit::StaticInitializer(id) => Self::StaticInitializer(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_unit_converts_to_element() {
        let method = MethodId::new(3);
        assert_eq!(Element::from(CodeUnit::from(method)), Element::Method(method));

        let ty = TypeId::new(1);
        assert_eq!(
            Element::from(CodeUnit::StaticInitializer(ty)),
            Element::StaticInitializer(ty)
        );
    }

    #[test]
    fn handles_expose_index() {
        assert_eq!(TypeId::new(7).index(), 7);
    }

    #[test]
    fn element_serializes_as_tagged_variant() {
        let json = serde_json::to_string(&Element::Package("a.b".to_string()))
            .expect("serialize");
        assert_eq!(json, r#"{"package":"a.b"}"#);
    }
}
