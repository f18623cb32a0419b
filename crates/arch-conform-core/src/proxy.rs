//! Proxyability analysis: can a dynamic proxy intercept calls to a method?
//!
//! A method is proxyable when neither its declaring type nor any of that
//! type's subtypes is final, the method itself is not final, and its
//! visibility allows a generated subclass to override it.

use crate::analyzer::EvaluationError;
use crate::context::EvaluationContext;
use crate::engine::{Condition, ConditionEvent, ConditionEvents, DescribedPredicate};
use crate::model::{CodeModel, Element, MethodId, TypeDecl, TypeId, Visibility};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which visibilities a proxy can override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyVisibility {
    /// Any non-private method; public or protected when a subtype lives in
    /// another package.
    #[default]
    Tolerant,
    /// Public methods only.
    Strict,
}

impl ProxyVisibility {
    /// Selects [`Tolerant`](Self::Tolerant) when `marker` is a type of the
    /// model, [`Strict`](Self::Strict) otherwise.
    #[must_use]
    pub fn detect(model: &CodeModel, marker: &str) -> Self {
        if model.type_by_name(marker).is_some() {
            Self::Tolerant
        } else {
            Self::Strict
        }
    }
}

/// How proxies are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyStrategy {
    /// Interface-based or subclass proxies, whichever applies.
    #[default]
    Interface,
    /// Subclass proxies only: methods declared on interfaces are not intercepted.
    Subclass,
}

/// Settings injected into a [`ProxyabilityAnalyzer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProxySettings {
    /// Visibility mode.
    pub visibility: ProxyVisibility,
    /// Proxy generation strategy.
    pub strategy: ProxyStrategy,
}

/// The individual proxyability criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Criterion {
    /// The method handle belongs to the model.
    KnownMethod,
    /// The declaring type is not final.
    NonFinalOwner,
    /// A subtype of the declaring type is not final.
    NonFinalSubtype,
    /// The method is not final.
    NonFinalMethod,
    /// The method is not declared on an interface (subclass strategy).
    NotOnInterface,
    /// The method's visibility allows overriding.
    Visibility,
}

/// Outcome of one criterion for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionResult {
    /// Which criterion was checked.
    pub criterion: Criterion,
    /// The element the criterion was checked on.
    pub subject: Element,
    /// Whether it holds.
    pub satisfied: bool,
    /// Human-readable verdict.
    pub message: String,
}

impl CriterionResult {
    fn new(criterion: Criterion, subject: Element, satisfied: bool, message: String) -> Self {
        Self {
            criterion,
            subject,
            satisfied,
            message,
        }
    }
}

/// Evaluates proxyability criteria against one model.
#[derive(Debug)]
pub struct ProxyabilityAnalyzer<'m> {
    model: &'m CodeModel,
    settings: ProxySettings,
    subtypes: DashMap<TypeId, Arc<Vec<TypeId>>>,
}

impl<'m> ProxyabilityAnalyzer<'m> {
    /// Creates an analyzer with the given settings.
    #[must_use]
    pub fn new(model: &'m CodeModel, settings: ProxySettings) -> Self {
        Self {
            model,
            settings,
            subtypes: DashMap::new(),
        }
    }

    /// Returns the injected settings.
    #[must_use]
    pub fn settings(&self) -> ProxySettings {
        self.settings
    }

    /// Checks whether every criterion holds.
    #[must_use]
    pub fn is_proxyable(&self, method: MethodId) -> bool {
        self.criteria(method).iter().all(|c| c.satisfied)
    }

    /// Evaluates all criteria independently. A method inherited by a type is
    /// evaluated on its declaring type.
    #[must_use]
    pub fn criteria(&self, method: MethodId) -> Vec<CriterionResult> {
        let model = self.model;
        let (Some(decl), Some(owner)) = (model.get_method(method), model.method_owner(method))
        else {
            return vec![CriterionResult::new(
                Criterion::KnownMethod,
                Element::Method(method),
                false,
                format!("Method <#{}> does not belong to this model", method.index()),
            )];
        };

        let owner_decl = model.type_decl(owner);
        let subtypes = self.subtypes_of(owner);
        let method_desc = model.describe(&Element::Method(method));
        let mut results = Vec::new();

        results.push(final_type_result(
            Criterion::NonFinalOwner,
            owner,
            owner_decl,
            None,
        ));
        for &subtype in subtypes.iter() {
            results.push(final_type_result(
                Criterion::NonFinalSubtype,
                subtype,
                model.type_decl(subtype),
                Some(owner_decl),
            ));
        }

        let final_method = decl.modifiers().is_final();
        results.push(CriterionResult::new(
            Criterion::NonFinalMethod,
            Element::Method(method),
            !final_method,
            if final_method {
                format!("{method_desc} must not be final")
            } else {
                format!("{method_desc} is not final")
            },
        ));

        if self.settings.strategy == ProxyStrategy::Subclass {
            let on_interface = owner_decl.is_interface();
            results.push(CriterionResult::new(
                Criterion::NotOnInterface,
                Element::Method(method),
                !on_interface,
                if on_interface {
                    format!("{method_desc} must not be declared on an interface")
                } else {
                    format!("{method_desc} is declared on a class")
                },
            ));
        }

        results.extend(self.visibility_results(method, owner, &subtypes));
        results
    }

    fn subtypes_of(&self, owner: TypeId) -> Arc<Vec<TypeId>> {
        if let Some(hit) = self.subtypes.get(&owner) {
            return Arc::clone(hit.value());
        }
        Arc::clone(
            self.subtypes
                .entry(owner)
                .or_insert_with(|| Arc::new(self.model.all_subtypes(owner)))
                .value(),
        )
    }

    fn visibility_results(
        &self,
        method: MethodId,
        owner: TypeId,
        subtypes: &[TypeId],
    ) -> Vec<CriterionResult> {
        let model = self.model;
        let owner_decl = model.type_decl(owner);

        match self.settings.visibility {
            ProxyVisibility::Strict => {
                vec![visibility_result(model, method, &[Visibility::Public], "must be public")]
            }
            ProxyVisibility::Tolerant => {
                let foreign: Vec<TypeId> = subtypes
                    .iter()
                    .copied()
                    .filter(|&s| model.type_decl(s).package() != owner_decl.package())
                    .collect();
                if foreign.is_empty() {
                    return vec![visibility_result(
                        model,
                        method,
                        &[Visibility::Public, Visibility::Protected, Visibility::Package],
                        "must not be private",
                    )];
                }

                let allowed = [Visibility::Public, Visibility::Protected];
                let decl = model.method(method);
                let mut results = vec![visibility_result(
                    model,
                    method,
                    &allowed,
                    "must be public or protected",
                )];
                for subtype in foreign {
                    for &candidate in model.methods_of(subtype) {
                        if model.method(candidate).overrides_signature_of(decl) {
                            results.push(visibility_result(
                                model,
                                candidate,
                                &allowed,
                                "must be public or protected",
                            ));
                        }
                    }
                }
                results
            }
        }
    }
}

fn final_type_result(
    criterion: Criterion,
    id: TypeId,
    decl: &TypeDecl,
    subtype_of: Option<&TypeDecl>,
) -> CriterionResult {
    let subject = match subtype_of {
        Some(parent) => format!("Class <{}> (subtype of <{}>)", decl.name(), parent.name()),
        None => format!("Class <{}>", decl.name()),
    };
    let is_final = decl.is_final();
    CriterionResult::new(
        criterion,
        Element::Type(id),
        !is_final,
        if is_final {
            format!("{subject} must not be final")
        } else {
            format!("{subject} is not final")
        },
    )
}

fn visibility_result(
    model: &CodeModel,
    method: MethodId,
    allowed: &[Visibility],
    requirement: &str,
) -> CriterionResult {
    let visibility = effective_visibility(model, method);
    let desc = model.describe(&Element::Method(method));
    let satisfied = allowed.contains(&visibility);
    CriterionResult::new(
        Criterion::Visibility,
        Element::Method(method),
        satisfied,
        if satisfied {
            format!("{desc} is {visibility}")
        } else {
            format!("{desc} {requirement} but is {visibility}")
        },
    )
}

/// Interface methods without an access modifier are public.
fn effective_visibility(model: &CodeModel, method: MethodId) -> Visibility {
    let declared = model.method(method).modifiers().visibility();
    let on_interface = model
        .method_owner(method)
        .is_some_and(|owner| model.type_decl(owner).is_interface());
    if on_interface && declared == Visibility::Package {
        Visibility::Public
    } else {
        declared
    }
}

// ────────────────────────────────────────────
// Condition and predicate forms
// ────────────────────────────────────────────

/// Condition emitting one event per proxyability criterion.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeProxyable;

/// Methods should be proxyable.
#[must_use]
pub fn be_proxyable() -> BeProxyable {
    BeProxyable
}

impl Condition<MethodId> for BeProxyable {
    type State = ();

    fn description(&self) -> String {
        "be proxyable".to_string()
    }

    fn init(&self, _ctx: &EvaluationContext<'_>, _elements: &[MethodId]) -> Result<(), EvaluationError> {
        Ok(())
    }

    fn check(
        &self,
        ctx: &EvaluationContext<'_>,
        _state: &(),
        method: &MethodId,
        events: &mut ConditionEvents,
    ) -> Result<(), EvaluationError> {
        for result in ctx.proxy().criteria(*method) {
            let event = if result.satisfied {
                ConditionEvent::satisfied(result.subject, result.message)
            } else {
                ConditionEvent::violated(result.subject, result.message)
            };
            events.add(event);
        }
        Ok(())
    }
}

/// Methods that are proxyable.
#[must_use]
pub fn proxyable() -> DescribedPredicate<MethodId> {
    DescribedPredicate::new("proxyable", |ctx, method: &MethodId| {
        Ok(ctx.proxy().is_proxyable(*method))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MethodDecl, Modifier};

    fn service_model(
        class_final: bool,
        visibility: Option<Modifier>,
        subtype_package: Option<&str>,
    ) -> (CodeModel, MethodId) {
        let mut builder = CodeModel::builder();
        let mut class = TypeDecl::class("app.Service");
        if class_final {
            class = class.with_modifier(Modifier::Final);
        }
        let service = builder.add_type(class);
        let mut run = MethodDecl::new("run");
        if let Some(modifier) = visibility {
            run = run.with_modifier(modifier);
        }
        let method = builder.add_method(service, run);
        if let Some(package) = subtype_package {
            builder.add_type(TypeDecl::class(format!("{package}.Custom")).extends("app.Service"));
        }
        (builder.build().expect("valid model"), method)
    }

    #[test]
    fn public_method_on_open_class_is_proxyable() {
        let (model, method) = service_model(false, Some(Modifier::Public), None);
        let analyzer = ProxyabilityAnalyzer::new(&model, ProxySettings::default());
        assert!(analyzer.is_proxyable(method));
    }

    #[test]
    fn final_class_is_not_proxyable() {
        let (model, method) = service_model(true, Some(Modifier::Public), None);
        let analyzer = ProxyabilityAnalyzer::new(&model, ProxySettings::default());

        let violations: Vec<_> = analyzer
            .criteria(method)
            .into_iter()
            .filter(|c| !c.satisfied)
            .collect();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].criterion, Criterion::NonFinalOwner);
        assert_eq!(violations[0].message, "Class <app.Service> must not be final");
    }

    #[test]
    fn protected_method_with_foreign_subtype() {
        let (model, method) = service_model(false, Some(Modifier::Protected), Some("ext"));

        let tolerant = ProxyabilityAnalyzer::new(&model, ProxySettings::default());
        assert!(tolerant.is_proxyable(method));

        let strict = ProxyabilityAnalyzer::new(
            &model,
            ProxySettings {
                visibility: ProxyVisibility::Strict,
                ..ProxySettings::default()
            },
        );
        assert!(!strict.is_proxyable(method));
        let messages: Vec<_> = strict
            .criteria(method)
            .into_iter()
            .filter(|c| !c.satisfied)
            .map(|c| c.message)
            .collect();
        assert_eq!(
            messages,
            vec!["Method <app.Service.run()> must be public but is protected"]
        );
    }

    #[test]
    fn package_private_method_needs_same_package_subtypes() {
        let (model, method) = service_model(false, None, Some("app"));
        let analyzer = ProxyabilityAnalyzer::new(&model, ProxySettings::default());
        assert!(analyzer.is_proxyable(method));

        let (model, method) = service_model(false, None, Some("ext"));
        let analyzer = ProxyabilityAnalyzer::new(&model, ProxySettings::default());
        assert!(!analyzer.is_proxyable(method));
    }

    #[test]
    fn private_method_is_not_proxyable() {
        let (model, method) = service_model(false, Some(Modifier::Private), None);
        let analyzer = ProxyabilityAnalyzer::new(&model, ProxySettings::default());
        assert!(!analyzer.is_proxyable(method));
    }

    #[test]
    fn final_subtype_is_reported() {
        let mut builder = CodeModel::builder();
        let base = builder.add_type(TypeDecl::class("app.Base"));
        builder.add_type(
            TypeDecl::class("app.Sealed")
                .extends("app.Base")
                .with_modifier(Modifier::Final),
        );
        let method = builder.add_method(base, MethodDecl::new("run").with_modifier(Modifier::Public));
        let model = builder.build().expect("valid model");

        let analyzer = ProxyabilityAnalyzer::new(&model, ProxySettings::default());
        let failed: Vec<_> = analyzer
            .criteria(method)
            .into_iter()
            .filter(|c| !c.satisfied)
            .map(|c| c.message)
            .collect();
        assert_eq!(
            failed,
            vec!["Class <app.Sealed> (subtype of <app.Base>) must not be final"]
        );
    }

    #[test]
    fn override_in_foreign_subtype_must_stay_visible() {
        let mut builder = CodeModel::builder();
        let base = builder.add_type(TypeDecl::class("app.Base"));
        let sub = builder.add_type(TypeDecl::class("ext.Sub").extends("app.Base"));
        let method = builder.add_method(base, MethodDecl::new("run").with_modifier(Modifier::Protected));
        builder.add_method(sub, MethodDecl::new("run"));
        let model = builder.build().expect("valid model");

        let analyzer = ProxyabilityAnalyzer::new(&model, ProxySettings::default());
        assert!(!analyzer.is_proxyable(method));
    }

    #[test]
    fn subclass_strategy_rejects_interface_methods() {
        let mut builder = CodeModel::builder();
        let api = builder.add_type(TypeDecl::interface("app.Api"));
        let method = builder.add_method(api, MethodDecl::new("call"));
        let model = builder.build().expect("valid model");

        let interface = ProxyabilityAnalyzer::new(&model, ProxySettings::default());
        assert!(interface.is_proxyable(method));

        let subclass = ProxyabilityAnalyzer::new(
            &model,
            ProxySettings {
                strategy: ProxyStrategy::Subclass,
                ..ProxySettings::default()
            },
        );
        assert!(!subclass.is_proxyable(method));
    }

    #[test]
    fn visibility_detection_uses_marker() {
        let (model, _) = service_model(false, Some(Modifier::Public), None);
        assert_eq!(ProxyVisibility::detect(&model, "app.Service"), ProxyVisibility::Tolerant);
        assert_eq!(ProxyVisibility::detect(&model, "fw.Marker"), ProxyVisibility::Strict);
    }
}
