//! Rules anchored on an application root type, the single type carrying a
//! bootstrapping annotation.

use crate::names;
use arch_conform_core::engine::{Condition, ConditionEvent, ConditionEvents, Scope};
use arch_conform_core::model::{Element, TypeId, TypeKind};
use arch_conform_core::utils::is_in_package_tree;
use arch_conform_core::{ArchRule, EvaluationContext, EvaluationError};
use std::collections::{BTreeSet, HashSet};

/// Types carrying `annotation`. Annotation types composing it are
/// stereotypes, never roots.
fn annotated_types(
    ctx: &EvaluationContext<'_>,
    types: &[TypeId],
    annotation: &str,
) -> Result<Vec<TypeId>, EvaluationError> {
    let model = ctx.model();
    let mut found = Vec::new();
    for &ty in types {
        if model.type_decl(ty).kind() == TypeKind::Annotation {
            continue;
        }
        if ctx.resolver().is_present(&Element::Type(ty), annotation)? {
            found.push(ty);
        }
    }
    Ok(found)
}

// ────────────────────────────────────────────
// Single root
// ────────────────────────────────────────────

/// Condition allowing at most one type annotated with the root annotation.
#[derive(Debug, Clone)]
pub struct OnlyOneRoot {
    annotation: String,
}

/// Types should not share the root annotation with another type.
#[must_use]
pub fn have_only_one_root(annotation: impl Into<String>) -> OnlyOneRoot {
    OnlyOneRoot {
        annotation: annotation.into(),
    }
}

/// The application should have only one type annotated with `annotation`.
///
/// Named `single-<annotation>`. An empty application is accepted.
#[must_use]
pub fn single_root(annotation: &str) -> ArchRule<TypeId, OnlyOneRoot> {
    Scope::types()
        .should(have_only_one_root(annotation))
        .described_as(format!(
            "application should have only one class annotated with {}",
            names::at(annotation)
        ))
        .named(format!("single-{}", names::slug(annotation)))
        .allow_empty(true)
}

impl Condition<TypeId> for OnlyOneRoot {
    type State = HashSet<TypeId>;

    fn description(&self) -> String {
        format!("have only one class annotated with {}", names::at(&self.annotation))
    }

    fn init(&self, ctx: &EvaluationContext<'_>, types: &[TypeId]) -> Result<HashSet<TypeId>, EvaluationError> {
        Ok(annotated_types(ctx, types, &self.annotation)?.into_iter().collect())
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        roots: &HashSet<TypeId>,
        ty: &TypeId,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        let subject = Element::Type(*ty);
        let desc = ctx.describe(&subject);
        let annotation = names::at(&self.annotation);
        let is_root = roots.contains(ty);

        let message = if is_root {
            format!("{desc} is annotated with {annotation}")
        } else {
            format!("{desc} is not annotated with {annotation}")
        };
        if is_root && roots.len() > 1 {
            events.add(ConditionEvent::violated(subject, message));
        } else {
            events.add(ConditionEvent::satisfied(subject, message));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────
// Root package
// ────────────────────────────────────────────

/// Condition requiring each type to reside in the package tree of a root
/// type.
#[derive(Debug, Clone)]
pub struct InRootPackage {
    annotation: String,
}

/// Types should reside in the package, or a sub-package, of a type annotated
/// with `annotation`.
#[must_use]
pub fn be_in_root_package(annotation: impl Into<String>) -> InRootPackage {
    InRootPackage {
        annotation: annotation.into(),
    }
}

/// All types should be located in the package, or a sub-package, of the
/// type annotated with `annotation`.
///
/// Named `<annotation>-root-package`. Fails with a precondition error when
/// no such type exists.
#[must_use]
pub fn root_package(annotation: &str) -> ArchRule<TypeId, InRootPackage> {
    Scope::types()
        .should(be_in_root_package(annotation))
        .described_as(format!(
            "all types should be located in the same package or a sub-package of the class annotated with {}",
            names::at(annotation)
        ))
        .named(format!("{}-root-package", names::slug(annotation)))
        .allow_empty(true)
}

impl Condition<TypeId> for InRootPackage {
    /// Distinct root packages, sorted.
    type State = Vec<String>;

    fn description(&self) -> String {
        format!(
            "be located in the same package or a sub-package of the class annotated with {}",
            names::at(&self.annotation)
        )
    }

    fn init(&self, ctx: &EvaluationContext<'_>, types: &[TypeId]) -> Result<Vec<String>, EvaluationError> {
        let roots = annotated_types(ctx, types, &self.annotation)?;
        if roots.is_empty() {
            return Err(EvaluationError::precondition(format!(
                "could not locate a class annotated with {}",
                names::at(&self.annotation)
            )));
        }
        let model = ctx.model();
        let packages: BTreeSet<String> = roots
            .into_iter()
            .map(|ty| model.type_decl(ty).package().to_string())
            .collect();
        Ok(packages.into_iter().collect())
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        packages: &Vec<String>,
        ty: &TypeId,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        let model = ctx.model();
        let subject = Element::Type(*ty);
        let desc = ctx.describe(&subject);
        let package = model.type_decl(*ty).package();

        match packages.iter().find(|root| is_in_package_tree(package, root)) {
            Some(root) => events.add(ConditionEvent::satisfied(
                subject,
                format!("{desc} resides in package '{root}' or a sub-package"),
            )),
            None => {
                let expected = packages
                    .iter()
                    .map(|p| format!("'{p}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                events.add(ConditionEvent::violated(
                    subject,
                    format!("{desc} does not reside in any package of [{expected}] or their sub-packages"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch_conform_core::model::{AnnotationInstance, CodeModel, TypeDecl};
    use arch_conform_core::Rule;

    const APPLICATION: &str = "fw.boot.Application";
    const CONFIGURATION: &str = "fw.boot.Configuration";

    /// `@Application` is meta-annotated with `@Configuration`.
    fn model(types: &[(&str, Option<&str>)]) -> CodeModel {
        let mut builder = CodeModel::builder();
        builder.add_type(
            TypeDecl::annotation(APPLICATION).annotated(AnnotationInstance::new(CONFIGURATION)),
        );
        builder.add_type(TypeDecl::annotation(CONFIGURATION));
        for (name, annotation) in types {
            let mut decl = TypeDecl::class(*name);
            if let Some(annotation) = annotation {
                decl = decl.annotated(AnnotationInstance::new(*annotation));
            }
            builder.add_type(decl);
        }
        builder.build().expect("valid model")
    }

    fn violations(report: &arch_conform_core::Report) -> Vec<&str> {
        report.violations().iter().map(|e| e.message()).collect()
    }

    // -- Single root --

    #[test]
    fn one_root_is_fine() {
        let model = model(&[("app.Main", Some(APPLICATION)), ("app.web.Controller", None)]);
        let report = single_root(CONFIGURATION)
            .evaluate(&EvaluationContext::new(&model))
            .unwrap();
        assert!(!report.has_violations());
    }

    #[test]
    fn every_root_is_reported_when_several_exist() {
        let model = model(&[
            ("app.Main", Some(APPLICATION)),
            ("app.TestMain", Some(CONFIGURATION)),
            ("app.web.Controller", None),
        ]);
        let rule = single_root(CONFIGURATION);
        assert_eq!(rule.name(), "single-configuration");

        let report = rule.evaluate(&EvaluationContext::new(&model)).unwrap();
        assert_eq!(
            violations(&report),
            vec![
                "Class <app.Main> is annotated with @Configuration",
                "Class <app.TestMain> is annotated with @Configuration",
            ]
        );
    }

    // -- Root package --

    #[test]
    fn types_outside_root_package_are_reported() {
        let model = model(&[
            ("app.Main", Some(APPLICATION)),
            ("app.web.Controller", None),
            ("application.Sneaky", None),
            ("lib.Helper", None),
        ]);
        let rule = root_package(APPLICATION);
        assert_eq!(rule.name(), "application-root-package");

        let report = rule.evaluate(&EvaluationContext::new(&model)).unwrap();
        assert_eq!(
            violations(&report),
            vec![
                "Annotation <fw.boot.Application> does not reside in any package of ['app'] or their sub-packages",
                "Annotation <fw.boot.Configuration> does not reside in any package of ['app'] or their sub-packages",
                "Class <application.Sneaky> does not reside in any package of ['app'] or their sub-packages",
                "Class <lib.Helper> does not reside in any package of ['app'] or their sub-packages",
            ]
        );
    }

    #[test]
    fn missing_root_is_a_precondition_failure() {
        let model = model(&[("app.web.Controller", None)]);
        let result = root_package(APPLICATION).evaluate(&EvaluationContext::new(&model));
        assert_eq!(
            result,
            Err(EvaluationError::precondition(
                "could not locate a class annotated with @Application"
            ))
        );
    }
}
