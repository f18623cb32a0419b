//! Integration tests: annotation resolution across both tiers.

use arch_conform_core::annotations::{
    AnnotationResolver, InMemoryMetadata, MethodMetadata, Provenance, TypeMetadata,
};
use arch_conform_core::model::{
    AnnotationInstance, AttributeDecl, AttributeValue, CallTarget, CodeModel, CodeModelBuilder,
    Element, MethodDecl, MethodId, Parameter, TypeDecl, TypeId,
};
use arch_conform_core::ResolveError;
use std::sync::Arc;

const STEREOTYPES: [&str; 4] = ["fw.Service", "fw.Component", "fw.Indexed", "fw.Transactional"];

/// `fw.Service` -> `fw.Component` -> `fw.Indexed`.
fn add_stereotypes(builder: &mut CodeModelBuilder) {
    builder.add_type(
        TypeDecl::annotation("fw.Service")
            .annotated(AnnotationInstance::new("fw.Component"))
            .attribute(AttributeDecl::new("value").with_default("")),
    );
    builder.add_type(
        TypeDecl::annotation("fw.Component")
            .annotated(AnnotationInstance::new("fw.Indexed"))
            .attribute(
                AttributeDecl::new("value")
                    .with_default("")
                    .alias_for("fw.Service", "value"),
            ),
    );
    builder.add_type(TypeDecl::annotation("fw.Indexed"));
    builder.add_type(TypeDecl::annotation("fw.Transactional"));
}

fn service_type(loadable: bool) -> TypeDecl {
    let decl = TypeDecl::class("app.Billing")
        .annotated(AnnotationInstance::new("fw.Service").with("value", "billing"));
    if loadable {
        decl
    } else {
        decl.unloadable()
    }
}

fn charge() -> MethodDecl {
    MethodDecl::new("charge").annotated(AnnotationInstance::new("fw.Transactional"))
}

/// The same codebase, once fully loadable and once with the service type
/// only visible through structural metadata.
fn twin_models() -> [(CodeModel, TypeId, MethodId); 2] {
    let mut loaded = CodeModel::builder();
    add_stereotypes(&mut loaded);
    let ty = loaded.add_type(service_type(true));
    let method = loaded.add_method(ty, charge());
    let loaded = (loaded.build().expect("valid model"), ty, method);

    let mut structural = CodeModel::builder();
    add_stereotypes(&mut structural);
    let ty = structural.add_type(service_type(false));
    let method = structural.add_method(ty, charge());
    structural.metadata_source(Arc::new(InMemoryMetadata::new().with(
        "app.Billing",
        TypeMetadata::new()
            .annotated(AnnotationInstance::new("fw.Service").with("value", "billing"))
            .method(MethodMetadata::new("charge").annotated(AnnotationInstance::new("fw.Transactional"))),
    )));
    let structural = (structural.build().expect("valid model"), ty, method);

    [loaded, structural]
}

#[test]
fn tiers_agree_on_presence() {
    let [(loaded, loaded_ty, loaded_m), (structural, structural_ty, structural_m)] = twin_models();
    let first = AnnotationResolver::new(&loaded);
    let second = AnnotationResolver::new(&structural);

    for name in STEREOTYPES.iter().chain(["fw.Missing"].iter()) {
        assert_eq!(
            first.is_present(&Element::Type(loaded_ty), name).expect("resolvable"),
            second.is_present(&Element::Type(structural_ty), name).expect("resolvable"),
            "type-level verdict differs for {name}"
        );
        assert_eq!(
            first.is_present(&Element::Method(loaded_m), name).expect("resolvable"),
            second.is_present(&Element::Method(structural_m), name).expect("resolvable"),
            "method-level verdict differs for {name}"
        );
    }
}

#[test]
fn tiers_agree_on_merged_attributes() {
    let [(loaded, loaded_ty, _), (structural, structural_ty, _)] = twin_models();

    let from_loaded = AnnotationResolver::new(&loaded)
        .resolve(&Element::Type(loaded_ty), "fw.Component")
        .expect("resolvable")
        .expect("present");
    let from_structural = AnnotationResolver::new(&structural)
        .resolve(&Element::Type(structural_ty), "fw.Component")
        .expect("resolvable")
        .expect("present");

    assert_eq!(
        from_loaded.attribute("value"),
        Some(&AttributeValue::String("billing".to_string()))
    );
    assert_eq!(from_loaded, from_structural);
}

#[test]
fn three_level_chain_reports_depth() {
    let [(model, ty, _), _] = twin_models();
    let resolver = AnnotationResolver::new(&model);

    let indexed = resolver
        .resolve(&Element::Type(ty), "fw.Indexed")
        .expect("resolvable")
        .expect("present");
    assert_eq!(indexed.provenance(), Provenance::Meta { depth: 2 });
    assert_eq!(indexed.root(), "fw.Service");
}

#[test]
fn unloadable_annotation_type_triggers_fallback() {
    let mut builder = CodeModel::builder();
    builder.add_type(TypeDecl::annotation("lib.Audited").unloadable());
    let ty = builder.add_type(
        TypeDecl::class("app.Ledger").annotated(AnnotationInstance::new("lib.Audited")),
    );
    builder.metadata_source(Arc::new(
        InMemoryMetadata::new()
            .with(
                "app.Ledger",
                TypeMetadata::new().annotated(AnnotationInstance::new("lib.Audited")),
            )
            .with(
                "lib.Audited",
                TypeMetadata::new().annotated(AnnotationInstance::new("lib.Logged")),
            ),
    ));
    let model = builder.build().expect("valid model");
    let resolver = AnnotationResolver::new(&model);

    assert!(resolver
        .is_present(&Element::Type(ty), "lib.Logged")
        .expect("resolvable"));
}

#[test]
fn overloaded_methods_are_absent_in_structural_tier() {
    let mut builder = CodeModel::builder();
    let ty = builder.add_type(TypeDecl::class("app.Repo").unloadable());
    let by_id = builder.add_method(
        ty,
        MethodDecl::new("find").parameter(Parameter::new("long")),
    );
    builder.add_method(ty, MethodDecl::new("find").parameter(Parameter::new("java.lang.String")));
    builder.metadata_source(Arc::new(InMemoryMetadata::new().with(
        "app.Repo",
        TypeMetadata::new()
            .method(MethodMetadata::new("find").annotated(AnnotationInstance::new("fw.Cached")))
            .method(MethodMetadata::new("find")),
    )));
    let model = builder.build().expect("valid model");
    let resolver = AnnotationResolver::new(&model);

    assert!(!resolver
        .is_present(&Element::Method(by_id), "fw.Cached")
        .expect("ambiguity is absence, not an error"));
}

#[test]
fn structural_tier_without_metadata_is_absent() {
    let mut builder = CodeModel::builder();
    let ty = builder.add_type(
        TypeDecl::class("app.Opaque")
            .annotated(AnnotationInstance::new("fw.Service"))
            .unloadable(),
    );
    let model = builder.build().expect("valid model");

    let set = AnnotationResolver::new(&model)
        .annotations(&Element::Type(ty))
        .expect("resolvable");
    assert!(set.is_empty());
}

#[test]
fn call_target_outside_universe_is_absent() {
    let mut builder = CodeModel::builder();
    let ty = builder.add_type(TypeDecl::class("app.Client"));
    let caller = builder.add_method(ty, MethodDecl::new("run"));
    let external = builder.add_call(
        caller,
        CallTarget::new("lib.Remote", "fetch", Vec::<String>::new()),
        3,
    );
    let model = builder.build().expect("valid model");
    let resolver = AnnotationResolver::new(&model);

    assert!(!resolver
        .is_present(&Element::CallTarget(external), "fw.Cached")
        .expect("never an error"));
}

#[test]
fn call_target_resolves_through_supertype() {
    let mut builder = CodeModel::builder();
    let base = builder.add_type(TypeDecl::class("app.Base"));
    let sub = builder.add_type(TypeDecl::class("app.Sub").extends("app.Base"));
    builder.add_method(
        base,
        MethodDecl::new("load").annotated(AnnotationInstance::new("fw.Cached")),
    );
    let caller = builder.add_method(sub, MethodDecl::new("run"));
    let call = builder.add_call(
        caller,
        CallTarget::new("app.Sub", "load", Vec::<String>::new()),
        9,
    );
    let model = builder.build().expect("valid model");

    assert!(AnnotationResolver::new(&model)
        .is_present(&Element::CallTarget(call), "fw.Cached")
        .expect("resolvable"));
}

#[test]
fn unsupported_elements_are_distinct_from_absence() {
    let mut builder = CodeModel::builder();
    let ty = builder.add_type(TypeDecl::class("app.T"));
    let method = builder.add_method(ty, MethodDecl::new("run"));
    let model = builder.build().expect("valid model");
    let resolver = AnnotationResolver::new(&model);

    let package = resolver.is_present(&Element::Package("app".to_string()), "fw.A");
    assert!(matches!(package, Err(ResolveError::UnsupportedElement { .. })));

    let parameter = resolver.is_present(
        &Element::Parameter {
            owner: method.into(),
            index: 0,
        },
        "fw.A",
    );
    assert!(matches!(parameter, Err(ResolveError::UnsupportedElement { .. })));

    assert_eq!(resolver.is_present(&Element::Method(method), "fw.A"), Ok(false));
}
