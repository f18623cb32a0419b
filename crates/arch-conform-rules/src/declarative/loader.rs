//! DTO → Domain model conversion with validation.

use super::config_dto::{
    AnnotatedRuleDto, DeclarativeConfigDto, DenyDependencyDto, RequireAnnotationDto,
    RequireEnablerDto, RequireReturnTypeDto,
};
use super::model::{DeclarativeConfig, DeclaredRule, ModelError, QualifiedName, RuleKind, RuleName};

/// Errors during DTO → Domain conversion.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A field-level validation error.
    #[error("{context}: {source}")]
    Validation {
        /// Where the error occurred (e.g., "require-proxyable[0].annotation").
        context: String,
        /// The underlying model error.
        source: ModelError,
    },

    /// Cross-reference errors from aggregate root construction.
    #[error("configuration validation errors:\n{}", format_errors(.0))]
    CrossRef(Vec<ModelError>),
}

fn format_errors(errors: &[ModelError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Converts a `DeclarativeConfigDto` to a validated `DeclarativeConfig`.
///
/// # Errors
///
/// Returns the first field error encountered, or every duplicate name.
pub fn load(dto: DeclarativeConfigDto) -> Result<DeclarativeConfig, LoadError> {
    let mut rules = Vec::new();

    for (i, d) in dto.require_proxyable.into_iter().enumerate() {
        rules.push(convert_annotated(d, "require-proxyable", i, |annotation| {
            RuleKind::RequireProxyable { annotation }
        })?);
    }
    for (i, d) in dto.deny_self_invocation.into_iter().enumerate() {
        rules.push(convert_annotated(d, "deny-self-invocation", i, |annotation| {
            RuleKind::DenySelfInvocation { annotation }
        })?);
    }
    for (i, d) in dto.require_enabler.into_iter().enumerate() {
        rules.push(convert_require_enabler(d, i)?);
    }
    for (i, d) in dto.single_root.into_iter().enumerate() {
        rules.push(convert_annotated(d, "single-root", i, |annotation| {
            RuleKind::SingleRoot { annotation }
        })?);
    }
    for (i, d) in dto.root_package.into_iter().enumerate() {
        rules.push(convert_annotated(d, "root-package", i, |annotation| {
            RuleKind::RootPackage { annotation }
        })?);
    }
    for (i, d) in dto.require_annotation.into_iter().enumerate() {
        rules.push(convert_require_annotation(d, i)?);
    }
    for (i, d) in dto.require_return_type.into_iter().enumerate() {
        rules.push(convert_require_return_type(d, i)?);
    }
    for (i, d) in dto.deny_dependency.into_iter().enumerate() {
        rules.push(convert_deny_dependency(d, i)?);
    }

    DeclarativeConfig::new(rules).map_err(LoadError::CrossRef)
}

fn rule_name(name: &str, ctx: &str) -> Result<RuleName, LoadError> {
    RuleName::new(name).map_err(|e| LoadError::Validation {
        context: format!("{ctx}.name"),
        source: e,
    })
}

fn qualified(name: &str, context: String) -> Result<QualifiedName, LoadError> {
    QualifiedName::new(name).map_err(|e| LoadError::Validation { context, source: e })
}

fn convert_annotated(
    dto: AnnotatedRuleDto,
    table: &str,
    index: usize,
    kind: impl FnOnce(QualifiedName) -> RuleKind,
) -> Result<DeclaredRule, LoadError> {
    let ctx = format!("{table}[{index}]");
    let name = rule_name(&dto.name, &ctx)?;
    let annotation = qualified(&dto.annotation, format!("{ctx}.annotation"))?;

    Ok(DeclaredRule::new(
        name,
        kind(annotation),
        dto.because,
        dto.allow_empty_scope,
    ))
}

fn convert_require_enabler(dto: RequireEnablerDto, index: usize) -> Result<DeclaredRule, LoadError> {
    let ctx = format!("require-enabler[{index}]");
    let name = rule_name(&dto.name, &ctx)?;
    let annotation = qualified(&dto.annotation, format!("{ctx}.annotation"))?;
    let enabler = qualified(&dto.enabler, format!("{ctx}.enabler"))?;

    Ok(DeclaredRule::new(
        name,
        RuleKind::RequireEnabler {
            annotation,
            enabler,
        },
        dto.because,
        None,
    ))
}

fn convert_require_annotation(
    dto: RequireAnnotationDto,
    index: usize,
) -> Result<DeclaredRule, LoadError> {
    let ctx = format!("require-annotation[{index}]");
    let name = rule_name(&dto.name, &ctx)?;
    let annotation = qualified(&dto.annotation, format!("{ctx}.annotation"))?;
    let requires = qualified(&dto.requires, format!("{ctx}.requires"))?;

    if dto.when_attribute.as_deref() == Some("") {
        return Err(LoadError::Validation {
            context: format!("{ctx}.when-attribute"),
            source: ModelError::EmptyAttributeName,
        });
    }

    Ok(DeclaredRule::new(
        name,
        RuleKind::RequireAnnotation {
            annotation,
            requires,
            when_attribute: dto.when_attribute,
        },
        dto.because,
        dto.allow_empty_scope,
    ))
}

fn convert_require_return_type(
    dto: RequireReturnTypeDto,
    index: usize,
) -> Result<DeclaredRule, LoadError> {
    let ctx = format!("require-return-type[{index}]");
    let name = rule_name(&dto.name, &ctx)?;
    let annotation = qualified(&dto.annotation, format!("{ctx}.annotation"))?;

    if dto.types.is_empty() {
        return Err(LoadError::Validation {
            context: format!("{ctx}.types"),
            source: ModelError::EmptyTypeList,
        });
    }
    let types = dto
        .types
        .iter()
        .enumerate()
        .map(|(j, t)| qualified(t, format!("{ctx}.types[{j}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DeclaredRule::new(
        name,
        RuleKind::RequireReturnType { annotation, types },
        dto.because,
        dto.allow_empty_scope,
    ))
}

fn convert_deny_dependency(dto: DenyDependencyDto, index: usize) -> Result<DeclaredRule, LoadError> {
    let ctx = format!("deny-dependency[{index}]");
    let name = rule_name(&dto.name, &ctx)?;
    let annotation = qualified(&dto.annotation, format!("{ctx}.annotation"))?;

    if dto.forbidden.is_empty() {
        return Err(LoadError::Validation {
            context: format!("{ctx}.forbidden"),
            source: ModelError::EmptyTypeList,
        });
    }
    let forbidden = dto
        .forbidden
        .iter()
        .enumerate()
        .map(|(j, f)| qualified(f, format!("{ctx}.forbidden[{j}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DeclaredRule::new(
        name,
        RuleKind::DenyDependency {
            annotation,
            forbidden,
        },
        dto.because,
        dto.allow_empty_scope,
    ))
}
