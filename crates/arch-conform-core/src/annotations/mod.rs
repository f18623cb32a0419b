//! Annotation resolution over a [`CodeModel`].
//!
//! [`AnnotationResolver`] answers "is this element annotated with X,
//! directly or through meta-annotations?" and returns merged attribute views.
//! Resolution runs in two tiers:
//!
//! 1. **Loaded**: the element's declaring type and every annotation type
//!    inspected on the way are loadable model declarations.
//! 2. **Structural**: when tier 1 hits an unloadable type, annotations are
//!    read from the model's [`MetadataSource`]. Only types and methods are
//!    supported, and methods are matched by name alone, so overloaded
//!    methods resolve to absent.
//!
//! Results are memoized per element for the lifetime of the resolver, which
//! borrows the model and therefore cannot outlive or cross snapshots.

mod merge;
mod metadata;
mod spec;

pub use metadata::{
    CachingMetadataSource, InMemoryMetadata, MetadataError, MetadataSource, MethodMetadata,
    TypeMetadata,
};
pub use spec::{AnnotationSet, AnnotationSpec, Provenance};

use crate::config::{ResolverConfig, DEFAULT_MAX_META_DEPTH};
use crate::model::{AnnotationInstance, AttributeDecl, CodeModel, CodeUnit, Element, TypeDecl};
use dashmap::DashMap;
use merge::{Level, MergedAttributes};
use miette::Diagnostic;
use std::collections::{HashSet, VecDeque};
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised for elements the resolver cannot map to an annotatable
/// entity. Distinct from absence, which is `Ok(None)` / `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ResolveError {
    /// The element kind or handle is not resolvable.
    #[error("cannot resolve annotations of {element}: {reason}")]
    #[diagnostic(
        code(arch_conform::resolve::unsupported_element),
        help("only types, members, parameters, static initializers and call targets of this model can be resolved")
    )]
    UnsupportedElement {
        /// Description of the element.
        element: String,
        /// Why it cannot be resolved.
        reason: String,
    },
}

/// Tier 1 could not introspect this type.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Unloadable {
    type_name: String,
}

/// A declaration the traversal can read annotations and attributes from.
enum DeclarationRef<'m> {
    Model(&'m TypeDecl),
    Metadata(Arc<TypeMetadata>),
}

impl DeclarationRef<'_> {
    fn annotations(&self) -> &[AnnotationInstance] {
        match self {
            Self::Model(decl) => decl.annotations(),
            Self::Metadata(metadata) => &metadata.annotations,
        }
    }

    fn attributes(&self) -> &[AttributeDecl] {
        match self {
            Self::Model(decl) => decl.attributes(),
            Self::Metadata(metadata) => &metadata.attributes,
        }
    }
}

struct Node<'m> {
    type_name: String,
    declaration: Option<DeclarationRef<'m>>,
    merged: MergedAttributes,
    depth: usize,
}

type CachedSet = Result<Arc<AnnotationSet>, ResolveError>;

/// Resolves direct and meta-annotations of model elements.
///
/// # Example
///
/// ```
/// use arch_conform_core::annotations::AnnotationResolver;
/// use arch_conform_core::model::{AnnotationInstance, CodeModel, Element, TypeDecl};
///
/// let mut builder = CodeModel::builder();
/// builder.add_type(
///     TypeDecl::annotation("fw.Service").annotated(AnnotationInstance::new("fw.Component")),
/// );
/// let billing = builder.add_type(
///     TypeDecl::class("app.Billing").annotated(AnnotationInstance::new("fw.Service")),
/// );
/// let model = builder.build().unwrap();
///
/// let resolver = AnnotationResolver::new(&model);
/// assert!(resolver.is_present(&Element::Type(billing), "fw.Component").unwrap());
/// ```
#[derive(Debug)]
pub struct AnnotationResolver<'m> {
    model: &'m CodeModel,
    max_depth: usize,
    metadata: Option<CachingMetadataSource<'m>>,
    cache: DashMap<Element, CachedSet>,
}

impl<'m> AnnotationResolver<'m> {
    /// Creates a resolver with the default maximum meta depth.
    #[must_use]
    pub fn new(model: &'m CodeModel) -> Self {
        Self::with_max_depth(model, DEFAULT_MAX_META_DEPTH)
    }

    /// Creates a resolver using the resolver section of the configuration.
    #[must_use]
    pub fn from_config(model: &'m CodeModel, config: &ResolverConfig) -> Self {
        Self::with_max_depth(model, config.max_meta_depth)
    }

    /// Creates a resolver that follows at most `max_depth` meta levels.
    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_depth(model: &'m CodeModel, max_depth: usize) -> Self {
        Self {
            model,
            max_depth: max_depth.max(1),
            metadata: model.metadata_source().map(CachingMetadataSource::new),
            cache: DashMap::new(),
        }
    }

    /// Returns the model this resolver reads.
    #[must_use]
    pub fn model(&self) -> &'m CodeModel {
        self.model
    }

    /// Returns all annotations of an element, direct and meta.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnsupportedElement`] for packages, handles
    /// that do not belong to the model and out-of-range parameters.
    pub fn annotations(&self, element: &Element) -> Result<Arc<AnnotationSet>, ResolveError> {
        if let Element::CallTarget(call) = element {
            if self.model.get_call(*call).is_none() {
                return Err(self.unsupported(element, "call handle does not belong to this model"));
            }
            return match self.model.resolved_target(*call) {
                Some(method) => self.annotations(&Element::Method(method)),
                None => {
                    debug!(
                        "Call target of {} is outside the imported universe",
                        self.model.describe(element)
                    );
                    Ok(Arc::default())
                }
            };
        }

        if let Some(hit) = self.cache.get(element) {
            return hit.value().clone();
        }

        self.cache
            .entry(element.clone())
            .or_insert_with(|| self.compute(element).map(Arc::new))
            .value()
            .clone()
    }

    /// Resolves one annotation type on an element.
    ///
    /// # Errors
    ///
    /// See [`AnnotationResolver::annotations`].
    pub fn resolve(
        &self,
        element: &Element,
        annotation: &str,
    ) -> Result<Option<AnnotationSpec>, ResolveError> {
        Ok(self.annotations(element)?.get(annotation).cloned())
    }

    /// Checks whether an annotation type is present, directly or meta.
    ///
    /// # Errors
    ///
    /// See [`AnnotationResolver::annotations`].
    pub fn is_present(&self, element: &Element, annotation: &str) -> Result<bool, ResolveError> {
        Ok(self.annotations(element)?.contains(annotation))
    }

    fn unsupported(&self, element: &Element, reason: &str) -> ResolveError {
        ResolveError::UnsupportedElement {
            element: self.model.describe(element),
            reason: reason.to_string(),
        }
    }

    fn compute(&self, element: &Element) -> Result<AnnotationSet, ResolveError> {
        match element {
            Element::Package(_) => {
                return Err(self.unsupported(element, "packages are not annotatable elements"));
            }
            Element::StaticInitializer(ty) if self.model.get_type(*ty).is_some() => {
                return Ok(AnnotationSet::default());
            }
            Element::Parameter {
                owner: CodeUnit::StaticInitializer(_),
                ..
            } => {
                return Err(self.unsupported(element, "static initializers declare no parameters"));
            }
            Element::Parameter { owner, index } => {
                if let Some(parameters) = self.model.parameters_of(*owner) {
                    if *index >= parameters.len() {
                        return Err(self.unsupported(
                            element,
                            &format!("parameter index out of range (0..{})", parameters.len()),
                        ));
                    }
                }
            }
            _ => {}
        }

        let (Some(direct), Some(owner)) = (
            self.model.direct_annotations(element),
            self.model.declaring_type(element),
        ) else {
            return Err(self.unsupported(element, "handle does not belong to this model"));
        };

        match self.resolve_loaded(self.model.type_decl(owner), direct) {
            Ok(set) => Ok(set),
            Err(Unloadable { type_name }) => {
                debug!(
                    "Falling back to structural resolution for {}: '{}' is not loadable",
                    self.model.describe(element),
                    type_name
                );
                Ok(self.resolve_structural(element))
            }
        }
    }

    // ────────────────────────────────────────────
    // Tier 1
    // ────────────────────────────────────────────

    fn resolve_loaded(
        &self,
        owner: &TypeDecl,
        direct: &[AnnotationInstance],
    ) -> Result<AnnotationSet, Unloadable> {
        if !owner.is_loadable() {
            return Err(Unloadable {
                type_name: owner.name().to_string(),
            });
        }
        self.traverse(direct, |name| self.loaded_declaration(name))
    }

    fn loaded_declaration(&self, type_name: &str) -> Result<Option<DeclarationRef<'m>>, Unloadable> {
        let model = self.model;
        match model.type_by_name(type_name) {
            Some(id) => {
                let decl = model.type_decl(id);
                if decl.is_loadable() {
                    Ok(Some(DeclarationRef::Model(decl)))
                } else {
                    Err(Unloadable {
                        type_name: type_name.to_string(),
                    })
                }
            }
            None => Ok(None),
        }
    }

    // ────────────────────────────────────────────
    // Tier 2
    // ────────────────────────────────────────────

    fn resolve_structural(&self, element: &Element) -> AnnotationSet {
        let Some(source) = &self.metadata else {
            debug!("No metadata source; treating annotations as absent");
            return AnnotationSet::default();
        };

        let model = self.model;
        let (type_name, method_name) = match element {
            Element::Type(id) => (model.type_decl(*id).name(), None),
            Element::Method(id) => match model.method_owner(*id) {
                Some(owner) => (model.type_decl(owner).name(), Some(model.method(*id).name())),
                None => return AnnotationSet::default(),
            },
            _ => {
                debug!(
                    "Structural resolution does not support {}",
                    model.describe(element)
                );
                return AnnotationSet::default();
            }
        };

        let Some(metadata) = source.get(type_name) else {
            return AnnotationSet::default();
        };

        let direct: &[AnnotationInstance] = match method_name {
            None => &metadata.annotations,
            Some(name) => {
                let mut candidates = metadata.methods.iter().filter(|m| m.name == name);
                match (candidates.next(), candidates.next()) {
                    (Some(method), None) => &method.annotations,
                    (Some(_), Some(_)) => {
                        debug!(
                            "Method '{}' of '{}' is overloaded; metadata is ambiguous",
                            name, type_name
                        );
                        return AnnotationSet::default();
                    }
                    (None, _) => return AnnotationSet::default(),
                }
            }
        };

        let resolved: Result<AnnotationSet, Infallible> =
            self.traverse(direct, |name| Ok(self.structural_declaration(source, name)));
        match resolved {
            Ok(set) => set,
            Err(never) => match never {},
        }
    }

    fn structural_declaration(
        &self,
        source: &CachingMetadataSource<'m>,
        type_name: &str,
    ) -> Option<DeclarationRef<'m>> {
        if let Some(metadata) = source.get(type_name) {
            return Some(DeclarationRef::Metadata(metadata));
        }
        let model = self.model;
        model
            .type_by_name(type_name)
            .map(|id| DeclarationRef::Model(model.type_decl(id)))
    }

    // ────────────────────────────────────────────
    // Traversal
    // ────────────────────────────────────────────

    /// Breadth-first meta-annotation search from each directly-present
    /// annotation. Annotation types without a declaration are leaves.
    fn traverse<E, F>(&self, direct: &[AnnotationInstance], lookup: F) -> Result<AnnotationSet, E>
    where
        F: Fn(&str) -> Result<Option<DeclarationRef<'m>>, E>,
    {
        let mut set = AnnotationSet::default();

        for root in direct {
            let root_name = root.type_name();
            let declaration = lookup(root_name)?;
            let merged = MergedAttributes::root(
                Level {
                    type_name: root_name,
                    declared: declaration.as_ref().map_or(&[][..], DeclarationRef::attributes),
                },
                root,
            );
            set.insert(AnnotationSpec::new(
                root_name,
                merged.values(),
                Provenance::Direct,
                root_name,
            ));

            let mut visited: HashSet<String> = HashSet::from([root_name.to_string()]);
            let mut queue = VecDeque::from([Node {
                type_name: root_name.to_string(),
                declaration,
                merged,
                depth: 0,
            }]);

            while let Some(node) = queue.pop_front() {
                if node.depth >= self.max_depth {
                    continue;
                }
                let Some(lower) = &node.declaration else {
                    continue;
                };

                for meta in lower.annotations() {
                    let meta_name = meta.type_name();
                    if !visited.insert(meta_name.to_string()) {
                        continue;
                    }

                    let meta_declaration = lookup(meta_name)?;
                    let merged = MergedAttributes::meta(
                        Level {
                            type_name: &node.type_name,
                            declared: lower.attributes(),
                        },
                        &node.merged,
                        Level {
                            type_name: meta_name,
                            declared: meta_declaration
                                .as_ref()
                                .map_or(&[][..], DeclarationRef::attributes),
                        },
                        meta,
                    );
                    let depth = node.depth + 1;
                    set.insert(AnnotationSpec::new(
                        meta_name,
                        merged.values(),
                        Provenance::Meta { depth },
                        root_name,
                    ));
                    queue.push_back(Node {
                        type_name: meta_name.to_string(),
                        declaration: meta_declaration,
                        merged,
                        depth,
                    });
                }
            }
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AttributeDecl, AttributeValue, CallTarget, MethodDecl, Parameter, TypeDecl, TypeId,
    };

    fn chain_model() -> (CodeModel, TypeId) {
        let mut builder = CodeModel::builder();
        builder.add_type(
            TypeDecl::annotation("fw.A")
                .annotated(AnnotationInstance::new("fw.B"))
                .attribute(AttributeDecl::new("value").with_default("")),
        );
        builder.add_type(
            TypeDecl::annotation("fw.B")
                .annotated(AnnotationInstance::new("fw.C"))
                .attribute(
                    AttributeDecl::new("value")
                        .with_default("b-default")
                        .alias_for("fw.A", "value"),
                ),
        );
        builder.add_type(TypeDecl::annotation("fw.C").annotated(AnnotationInstance::new("fw.Ext")));
        let target = builder.add_type(
            TypeDecl::class("app.Target").annotated(AnnotationInstance::new("fw.A").with("value", "x")),
        );
        (builder.build().expect("valid model"), target)
    }

    #[test]
    fn meta_annotations_are_transitive() {
        let (model, target) = chain_model();
        let resolver = AnnotationResolver::new(&model);
        let element = Element::Type(target);

        assert!(resolver.is_present(&element, "fw.A").expect("resolvable"));
        assert!(resolver.is_present(&element, "fw.B").expect("resolvable"));
        let c = resolver.resolve(&element, "fw.C").expect("resolvable").expect("present");
        assert_eq!(c.provenance(), Provenance::Meta { depth: 2 });
        assert_eq!(c.root(), "fw.A");
        // not in the universe, still reported as a leaf
        assert!(resolver.is_present(&element, "fw.Ext").expect("resolvable"));
        assert!(!resolver.is_present(&element, "fw.Missing").expect("resolvable"));
    }

    #[test]
    fn alias_on_meta_takes_lower_value() {
        let (model, target) = chain_model();
        let resolver = AnnotationResolver::new(&model);

        let b = resolver
            .resolve(&Element::Type(target), "fw.B")
            .expect("resolvable")
            .expect("present");
        assert_eq!(b.attribute("value"), Some(&AttributeValue::String("x".to_string())));
    }

    #[test]
    fn max_depth_limits_traversal() {
        let (model, target) = chain_model();
        let resolver = AnnotationResolver::with_max_depth(&model, 1);
        let element = Element::Type(target);

        assert!(resolver.is_present(&element, "fw.B").expect("resolvable"));
        assert!(!resolver.is_present(&element, "fw.C").expect("resolvable"));
    }

    #[test]
    fn cycles_terminate() {
        let mut builder = CodeModel::builder();
        builder.add_type(TypeDecl::annotation("fw.A").annotated(AnnotationInstance::new("fw.B")));
        builder.add_type(TypeDecl::annotation("fw.B").annotated(AnnotationInstance::new("fw.A")));
        let target =
            builder.add_type(TypeDecl::class("app.T").annotated(AnnotationInstance::new("fw.A")));
        let model = builder.build().expect("valid model");
        let resolver = AnnotationResolver::new(&model);

        let set = resolver.annotations(&Element::Type(target)).expect("resolvable");
        assert_eq!(set.len(), 2);
        assert!(set.get("fw.A").expect("present").is_direct());
    }

    #[test]
    fn results_are_memoized() {
        let (model, target) = chain_model();
        let resolver = AnnotationResolver::new(&model);
        let element = Element::Type(target);

        let first = resolver.annotations(&element).expect("resolvable");
        let second = resolver.annotations(&element).expect("resolvable");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn static_initializers_are_absent() {
        let mut builder = CodeModel::builder();
        let ty = builder.add_type(
            TypeDecl::class("app.T")
                .annotated(AnnotationInstance::new("fw.A"))
                .with_static_initializer(),
        );
        let model = builder.build().expect("valid model");
        let resolver = AnnotationResolver::new(&model);

        let set = resolver
            .annotations(&Element::StaticInitializer(ty))
            .expect("resolvable");
        assert!(set.is_empty());
    }

    #[test]
    fn unsupported_elements_are_errors() {
        let mut builder = CodeModel::builder();
        let ty = builder.add_type(TypeDecl::class("app.T"));
        let method = builder.add_method(ty, MethodDecl::new("m").parameter(Parameter::new("int")));
        let model = builder.build().expect("valid model");
        let resolver = AnnotationResolver::new(&model);

        let package = resolver.annotations(&Element::Package("app".to_string()));
        assert!(matches!(package, Err(ResolveError::UnsupportedElement { .. })));

        let out_of_range = resolver.annotations(&Element::Parameter {
            owner: CodeUnit::Method(method),
            index: 1,
        });
        assert!(matches!(out_of_range, Err(ResolveError::UnsupportedElement { .. })));

        let foreign = resolver.annotations(&Element::Type(TypeId::new(42)));
        assert!(matches!(foreign, Err(ResolveError::UnsupportedElement { .. })));

        let in_range = resolver.annotations(&Element::Parameter {
            owner: CodeUnit::Method(method),
            index: 0,
        });
        assert!(in_range.expect("resolvable").is_empty());
    }

    #[test]
    fn unresolved_call_targets_are_absent() {
        let mut builder = CodeModel::builder();
        let ty = builder.add_type(TypeDecl::class("app.T"));
        let method = builder.add_method(ty, MethodDecl::new("m"));
        let call = builder.add_call(
            method,
            CallTarget::new("ext.Library", "helper", Vec::<String>::new()),
            3,
        );
        let model = builder.build().expect("valid model");
        let resolver = AnnotationResolver::new(&model);

        assert!(!resolver
            .is_present(&Element::CallTarget(call), "fw.A")
            .expect("never an error"));
    }
}
