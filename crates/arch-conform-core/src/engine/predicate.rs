//! Described predicates used to narrow a scope.

use super::scope::ScopeElement;
use crate::analyzer::EvaluationError;
use crate::annotations::AnnotationSpec;
use crate::context::EvaluationContext;
use crate::model::TypeId;
use crate::utils::names;
use std::fmt;
use std::sync::Arc;

type TestFn<T> = dyn Fn(&EvaluationContext<'_>, &T) -> Result<bool, EvaluationError> + Send + Sync;

/// A predicate with a human-readable description.
///
/// Descriptions read as the tail of "that are ...", e.g.
/// `annotated with @Transactional`.
pub struct DescribedPredicate<T> {
    description: String,
    test: Arc<TestFn<T>>,
}

impl<T> Clone for DescribedPredicate<T> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            test: Arc::clone(&self.test),
        }
    }
}

impl<T> fmt::Debug for DescribedPredicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescribedPredicate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> DescribedPredicate<T> {
    /// Creates a predicate.
    pub fn new<F>(description: impl Into<String>, test: F) -> Self
    where
        F: Fn(&EvaluationContext<'_>, &T) -> Result<bool, EvaluationError> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Tests an element.
    ///
    /// # Errors
    ///
    /// Propagates failures of the underlying test, e.g. unsupported
    /// elements during annotation resolution.
    pub fn test(&self, ctx: &EvaluationContext<'_>, element: &T) -> Result<bool, EvaluationError> {
        (self.test)(ctx, element)
    }

    /// Both predicates hold. Both are always tested.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let description = format!("{} and {}", self.description, other.description);
        Self::new(description, move |ctx, e| {
            let left = self.test(ctx, e)?;
            let right = other.test(ctx, e)?;
            Ok(left && right)
        })
    }

    /// Either predicate holds. Both are always tested.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        let description = format!("{} or {}", self.description, other.description);
        Self::new(description, move |ctx, e| {
            let left = self.test(ctx, e)?;
            let right = other.test(ctx, e)?;
            Ok(left || right)
        })
    }

    /// Replaces the description.
    #[must_use]
    pub fn described_as(self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            test: self.test,
        }
    }
}

impl<T: 'static> std::ops::Not for DescribedPredicate<T> {
    type Output = Self;

    fn not(self) -> Self {
        let description = format!("not {}", self.description);
        Self::new(description, move |ctx, e| Ok(!self.test(ctx, e)?))
    }
}

// ────────────────────────────────────────────
// Common predicates
// ────────────────────────────────────────────

/// Elements annotated with `annotation`, directly or through
/// meta-annotations.
#[must_use]
pub fn annotated_with<T: ScopeElement>(annotation: impl Into<String>) -> DescribedPredicate<T> {
    let annotation = annotation.into();
    let description = format!("annotated with @{}", names::simple_name(&annotation));
    DescribedPredicate::new(description, move |ctx, element: &T| {
        Ok(ctx.resolver().is_present(&element.element(), &annotation)?)
    })
}

/// Elements annotated with `annotation` whose merged view satisfies `test`.
#[must_use]
pub fn annotated_with_matching<T, F>(
    annotation: impl Into<String>,
    description: impl Into<String>,
    test: F,
) -> DescribedPredicate<T>
where
    T: ScopeElement,
    F: Fn(&AnnotationSpec) -> bool + Send + Sync + 'static,
{
    let annotation = annotation.into();
    DescribedPredicate::new(description, move |ctx, element: &T| {
        Ok(ctx
            .resolver()
            .resolve(&element.element(), &annotation)?
            .is_some_and(|spec| test(&spec)))
    })
}

/// Members whose declaring type satisfies `types`.
#[must_use]
pub fn declared_in<T: ScopeElement>(types: DescribedPredicate<TypeId>) -> DescribedPredicate<T> {
    let description = format!("declared in classes that are {}", types.description());
    DescribedPredicate::new(description, move |ctx, element: &T| {
        match ctx.model().declaring_type(&element.element()) {
            Some(owner) => types.test(ctx, &owner),
            None => Ok(false),
        }
    })
}

/// Elements whose declaring type's package matches `pattern`.
///
/// `*` matches one package segment, `**` any number of segments.
#[must_use]
pub fn in_package<T: ScopeElement>(pattern: impl Into<String>) -> DescribedPredicate<T> {
    let pattern = pattern.into();
    let description = format!("in package '{pattern}'");
    DescribedPredicate::new(description, move |ctx, element: &T| {
        let model = ctx.model();
        Ok(model
            .declaring_type(&element.element())
            .is_some_and(|owner| names::package_matches(model.type_decl(owner).package(), &pattern)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationInstance, CodeModel, MethodDecl, MethodId, TypeDecl};

    fn model() -> (CodeModel, MethodId, MethodId) {
        let mut builder = CodeModel::builder();
        builder.add_type(TypeDecl::annotation("fw.Cached"));
        let service = builder.add_type(
            TypeDecl::class("app.service.Service").annotated(AnnotationInstance::new("fw.Component")),
        );
        let other = builder.add_type(TypeDecl::class("app.web.Controller"));
        let cached = builder.add_method(
            service,
            MethodDecl::new("load").annotated(AnnotationInstance::new("fw.Cached")),
        );
        let plain = builder.add_method(other, MethodDecl::new("handle"));
        (builder.build().expect("valid model"), cached, plain)
    }

    #[test]
    fn annotated_with_describes_simple_name() {
        let (model, cached, plain) = model();
        let ctx = EvaluationContext::new(&model);
        let predicate = annotated_with::<MethodId>("fw.Cached");

        assert_eq!(predicate.description(), "annotated with @Cached");
        assert!(predicate.test(&ctx, &cached).expect("resolvable"));
        assert!(!predicate.test(&ctx, &plain).expect("resolvable"));
    }

    #[test]
    fn combinators_compose_descriptions() {
        let (model, cached, plain) = model();
        let ctx = EvaluationContext::new(&model);

        let either = annotated_with::<MethodId>("fw.Cached").or(in_package("app.web"));
        assert_eq!(either.description(), "annotated with @Cached or in package 'app.web'");
        assert!(either.test(&ctx, &cached).expect("ok"));
        assert!(either.test(&ctx, &plain).expect("ok"));

        let negated = !annotated_with::<MethodId>("fw.Cached");
        assert_eq!(negated.description(), "not annotated with @Cached");
        assert!(!negated.test(&ctx, &cached).expect("ok"));

        let renamed = negated.described_as("uncached");
        assert_eq!(renamed.description(), "uncached");
    }

    #[test]
    fn declared_in_lifts_type_predicate() {
        let (model, cached, plain) = model();
        let ctx = EvaluationContext::new(&model);
        let predicate = declared_in::<MethodId>(annotated_with("fw.Component"));

        assert_eq!(
            predicate.description(),
            "declared in classes that are annotated with @Component"
        );
        assert!(predicate.test(&ctx, &cached).expect("ok"));
        assert!(!predicate.test(&ctx, &plain).expect("ok"));
    }

    #[test]
    fn in_package_supports_wildcards() {
        let (model, cached, plain) = model();
        let ctx = EvaluationContext::new(&model);
        let predicate = in_package::<MethodId>("app.*");

        assert!(predicate.test(&ctx, &cached).expect("ok"));
        assert!(predicate.test(&ctx, &plain).expect("ok"));
        assert!(!in_package::<MethodId>("lib.**").test(&ctx, &plain).expect("ok"));
    }
}
