//! Type-level dependencies.
//!
//! A type depends on every imported type it names: its supertypes, the
//! types of its fields, the parameter and return types of its code units,
//! and the owners of the methods it calls. References to the type itself
//! and to types that were never imported are not dependencies. Annotations
//! are not dependencies either; stereotype checks go through annotation
//! resolution instead.

use crate::analyzer::EvaluationError;
use crate::context::EvaluationContext;
use crate::engine::{Condition, ConditionEvent, ConditionEvents, DescribedPredicate};
use crate::model::{CallId, CodeModel, CodeUnit, Element, TypeId};
use std::collections::HashMap;

/// How a type refers to one of its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// The target is a direct supertype.
    Supertype,
    /// A field has the target type.
    FieldType,
    /// A parameter of a method or constructor has the target type.
    ParameterType,
    /// A method returns the target type.
    ReturnType,
    /// A code unit calls a method of the target type.
    Call,
}

/// One reference from an element of a type to another imported type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Element the reference originates from.
    pub origin: Element,
    /// Referenced type.
    pub target: TypeId,
    /// Kind of reference.
    pub kind: DependencyKind,
}

impl Dependency {
    /// Describes the reference, citing its origin, e.g.
    /// `Field <app.Orders.audit> has type <app.AuditLog>`.
    #[must_use]
    pub fn describe(&self, model: &CodeModel) -> String {
        let target = model
            .get_type(self.target)
            .map_or_else(|| format!("#{}", self.target.index()), |t| t.name().to_string());

        match (self.kind, &self.origin) {
            (DependencyKind::Supertype, origin) => {
                let verb = match (model.get_type(self.target), origin) {
                    (Some(t), Element::Type(from))
                        if t.is_interface() && !model.type_decl(*from).is_interface() =>
                    {
                        "implements"
                    }
                    _ => "extends",
                };
                format!("{} {verb} <{target}>", model.describe(origin))
            }
            (DependencyKind::ParameterType, Element::Parameter { owner, .. }) => format!(
                "{} has parameter of type <{target}>",
                model.describe_code_unit(*owner)
            ),
            (DependencyKind::ReturnType, origin) => {
                format!("{} has return type <{target}>", model.describe(origin))
            }
            (DependencyKind::Call, origin) => model.describe(origin),
            (_, origin) => format!("{} has type <{target}>", model.describe(origin)),
        }
    }
}

/// Outgoing call sites grouped by the type declaring their origin.
#[derive(Debug, Clone, Default)]
pub struct OutgoingCalls(HashMap<TypeId, Vec<CallId>>);

impl OutgoingCalls {
    /// Groups every call of the model by origin type, in import order.
    #[must_use]
    pub fn index(model: &CodeModel) -> Self {
        let mut by_type: HashMap<TypeId, Vec<CallId>> = HashMap::new();
        for call in model.call_ids() {
            let owner = model
                .get_call(call)
                .and_then(|site| model.code_unit_owner(site.origin()));
            if let Some(owner) = owner {
                by_type.entry(owner).or_default().push(call);
            }
        }
        Self(by_type)
    }

    /// Returns the calls made from code units of `ty`.
    #[must_use]
    pub fn of(&self, ty: TypeId) -> &[CallId] {
        self.0.get(&ty).map_or(&[][..], Vec::as_slice)
    }
}

/// Collects the dependencies of `ty`: supertypes, fields, constructor
/// parameters, method parameters and return types, then calls.
#[must_use]
pub fn dependencies_of(model: &CodeModel, calls: &OutgoingCalls, ty: TypeId) -> Vec<Dependency> {
    let Some(decl) = model.get_type(ty) else {
        return Vec::new();
    };
    let mut deps = Vec::new();
    let mut push = |origin: Element, name: &str, kind: DependencyKind| {
        if let Some(target) = imported(model, name).filter(|&t| t != ty) {
            deps.push(Dependency { origin, target, kind });
        }
    };

    for supertype in decl.supertypes() {
        push(Element::Type(ty), supertype.as_str(), DependencyKind::Supertype);
    }
    for &field in model.fields_of(ty) {
        if let Some(f) = model.get_field(field) {
            push(Element::Field(field), f.type_name(), DependencyKind::FieldType);
        }
    }
    for &ctor in model.constructors_of(ty) {
        let unit = CodeUnit::Constructor(ctor);
        for (index, param) in model.parameters_of(unit).unwrap_or_default().iter().enumerate() {
            push(parameter(unit, index), param.type_name(), DependencyKind::ParameterType);
        }
    }
    for &method in model.methods_of(ty) {
        let unit = CodeUnit::Method(method);
        for (index, param) in model.parameters_of(unit).unwrap_or_default().iter().enumerate() {
            push(parameter(unit, index), param.type_name(), DependencyKind::ParameterType);
        }
        if let Some(m) = model.get_method(method) {
            push(Element::Method(method), m.return_type(), DependencyKind::ReturnType);
        }
    }
    for &call in calls.of(ty) {
        if let Some(site) = model.get_call(call) {
            push(Element::CallTarget(call), site.target().owner(), DependencyKind::Call);
        }
    }

    deps
}

fn parameter(owner: CodeUnit, index: usize) -> Element {
    Element::Parameter { owner, index }
}

/// Looks up a referenced type, ignoring array dimensions.
fn imported(model: &CodeModel, name: &str) -> Option<TypeId> {
    let mut name = name.trim();
    while let Some(element) = name.strip_suffix("[]") {
        name = element;
    }
    model.type_by_name(name)
}

// ────────────────────────────────────────────
// Condition
// ────────────────────────────────────────────

/// Condition recording every dependency on a type matching a predicate.
///
/// Each matching dependency is a satisfied event citing its origin; a type
/// without one gets a single violated event. Wrap it in
/// [`not`](crate::engine::not) to forbid the dependencies.
#[derive(Debug, Clone)]
pub struct DependOnTypesThat {
    predicate: DescribedPredicate<TypeId>,
}

/// Types should depend on types satisfying `predicate`.
#[must_use]
pub fn depend_on_types_that(predicate: DescribedPredicate<TypeId>) -> DependOnTypesThat {
    DependOnTypesThat { predicate }
}

impl Condition<TypeId> for DependOnTypesThat {
    type State = OutgoingCalls;

    fn description(&self) -> String {
        format!("depend on classes that are {}", self.predicate.description())
    }

    fn init(&self, ctx: &EvaluationContext<'_>, _elements: &[TypeId]) -> Result<OutgoingCalls, EvaluationError> {
        Ok(OutgoingCalls::index(ctx.model()))
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        calls: &OutgoingCalls,
        ty: &TypeId,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        let model = ctx.model();
        let mut found = false;
        for dep in dependencies_of(model, calls, *ty) {
            if self.predicate.test(ctx, &dep.target)? {
                found = true;
                events.add(ConditionEvent::satisfied(dep.origin.clone(), dep.describe(model)));
            }
        }
        if !found {
            events.add(ConditionEvent::violated(
                Element::Type(*ty),
                format!(
                    "{} does not depend on classes that are {}",
                    model.describe(&Element::Type(*ty)),
                    self.predicate.description()
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{annotated_with, not, Scope};
    use crate::model::{
        AnnotationInstance, CallTarget, ConstructorDecl, FieldDecl, MethodDecl, Parameter, TypeDecl,
    };
    use crate::Rule;

    const CONTROLLER: &str = "fw.Controller";
    const CONFIGURATION: &str = "fw.Configuration";

    fn edges(model: &CodeModel, ty: TypeId) -> Vec<String> {
        dependencies_of(model, &OutgoingCalls::index(model), ty)
            .iter()
            .map(|d| d.describe(model))
            .collect()
    }

    #[test]
    fn collects_every_kind_of_reference() {
        let mut builder = CodeModel::builder();
        builder.add_type(TypeDecl::interface("app.Api"));
        builder.add_type(TypeDecl::class("app.Order"));
        builder.add_type(TypeDecl::class("app.Receipt"));
        let repo = builder.add_type(TypeDecl::class("app.Repo"));
        builder.add_method(repo, MethodDecl::new("save"));
        let service = builder.add_type(TypeDecl::class("app.Service").extends("app.Api"));
        builder.add_field(service, FieldDecl::new("repo", "app.Repo"));
        builder.add_constructor(
            service,
            ConstructorDecl::new().parameter(Parameter::new("app.Repo")),
        );
        let place = builder.add_method(
            service,
            MethodDecl::new("place")
                .parameter(Parameter::new("app.Order[]"))
                .returns("app.Receipt"),
        );
        builder.add_call(place, CallTarget::new("app.Repo", "save", Vec::<String>::new()), 21);
        let model = builder.build().expect("valid model");

        assert_eq!(
            edges(&model, service),
            vec![
                "Class <app.Service> implements <app.Api>",
                "Field <app.Service.repo> has type <app.Repo>",
                "Constructor <app.Service.<init>(app.Repo)> has parameter of type <app.Repo>",
                "Method <app.Service.place(app.Order[])> has parameter of type <app.Order>",
                "Method <app.Service.place(app.Order[])> has return type <app.Receipt>",
                "Method <app.Service.place(app.Order[])> calls method <app.Repo.save()> in line 21",
            ]
        );
        assert!(edges(&model, repo).is_empty());
    }

    #[test]
    fn self_and_foreign_references_are_skipped() {
        let mut builder = CodeModel::builder();
        let node = builder.add_type(TypeDecl::class("app.Node").extends("java.lang.Object"));
        builder.add_field(node, FieldDecl::new("next", "app.Node"));
        builder.add_field(node, FieldDecl::new("label", "java.lang.String"));
        builder.add_method(
            node,
            MethodDecl::new("link").parameter(Parameter::new("app.Node")),
        );
        let model = builder.build().expect("valid model");

        assert!(edges(&model, node).is_empty());
    }

    /// `app.web.Orders` holds a field of another controller, `app.web.Admin`
    /// is a controller through the `app.AdminController` stereotype, and
    /// `app.web.Health` only depends on a plain class.
    fn layered() -> CodeModel {
        let mut builder = CodeModel::builder();
        builder.add_type(TypeDecl::annotation(CONTROLLER));
        builder.add_type(
            TypeDecl::annotation("app.AdminController").annotated(AnnotationInstance::new(CONTROLLER)),
        );
        builder.add_type(
            TypeDecl::class("app.web.Admin").annotated(AnnotationInstance::new("app.AdminController")),
        );
        builder.add_type(
            TypeDecl::class("app.AppConfig").annotated(AnnotationInstance::new(CONFIGURATION)),
        );
        builder.add_type(TypeDecl::class("app.Clock"));

        let orders = builder.add_type(
            TypeDecl::class("app.web.Orders").annotated(AnnotationInstance::new(CONTROLLER)),
        );
        builder.add_field(orders, FieldDecl::new("admin", "app.web.Admin"));
        builder.add_field(orders, FieldDecl::new("config", "app.AppConfig"));

        let health = builder.add_type(
            TypeDecl::class("app.web.Health").annotated(AnnotationInstance::new(CONTROLLER)),
        );
        builder.add_field(health, FieldDecl::new("clock", "app.Clock"));
        builder.build().expect("valid model")
    }

    #[test]
    fn forbidden_dependencies_are_reported_per_origin() {
        let model = layered();
        let rule = Scope::types()
            .that(annotated_with(CONTROLLER))
            .should(not(depend_on_types_that(
                annotated_with(CONTROLLER).or(annotated_with(CONFIGURATION)),
            )));
        assert_eq!(
            rule.description(),
            "classes that are annotated with @Controller should not depend on classes that \
             are annotated with @Controller or annotated with @Configuration"
        );

        let report = rule.evaluate(&EvaluationContext::new(&model)).unwrap();
        let messages: Vec<_> = report.violations().iter().map(|e| e.message()).collect();
        assert_eq!(
            messages,
            vec![
                "Field <app.web.Orders.admin> has type <app.web.Admin>",
                "Field <app.web.Orders.config> has type <app.AppConfig>",
            ]
        );
        let origins: Vec<_> = report.violations().iter().map(|e| e.element().cloned()).collect();
        assert!(origins.iter().all(|o| matches!(o, Some(Element::Field(_)))));
    }

    #[test]
    fn allowed_dependencies_are_satisfied() {
        let model = layered();
        let health = model.type_by_name("app.web.Health").unwrap();
        let ctx = EvaluationContext::new(&model);
        let condition = not(depend_on_types_that(annotated_with(CONTROLLER)));

        let state = condition.init(&ctx, &[health]).unwrap();
        let mut events = ConditionEvents::new();
        condition.check(&ctx, &state, &health, &mut events).unwrap();
        assert!(!events.contains_violation());
        let messages: Vec<_> = events.iter().map(ConditionEvent::message).collect();
        assert_eq!(
            messages,
            vec!["Class <app.web.Health> does not depend on classes that are annotated with @Controller"]
        );
    }
}
