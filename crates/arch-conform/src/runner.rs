//! Runner for `cargo test` integration.
//!
//! Every entry point evaluates rules against a model and panics with a
//! formatted report if any rule is violated or cannot be evaluated.

use arch_conform_core::{CodeModel, Config, EvaluationSummary, Evaluator, RuleBox};
use arch_conform_rules::declarative;
use std::path::{Path, PathBuf};

/// Config file names to search for, in priority order.
const CONFIG_CANDIDATES: &[&str] = &["arch-conform.toml", ".arch-conform.toml"];

/// Evaluates `rules` with the default configuration.
///
/// # Panics
///
/// Panics with the failure report if any rule fails.
pub fn assert_rules(model: &CodeModel, rules: impl IntoIterator<Item = RuleBox>) {
    let summary = evaluate(model, rules, Config::default());
    assert_summary(&summary);
}

/// Evaluates `rules` plus the rules declared in `config_content`, under the
/// configuration in `config_content`.
///
/// # Panics
///
/// Panics if the configuration is invalid, or with the failure report if
/// any rule fails.
pub fn assert_rules_with_config(
    model: &CodeModel,
    rules: impl IntoIterator<Item = RuleBox>,
    config_content: &str,
) {
    let config = parse_config(config_content);
    let declared = load_declarative_rules(config_content);
    let summary = evaluate(model, rules.into_iter().chain(declared), config);
    assert_summary(&summary);
}

/// Evaluates the rules declared in the project's config file.
///
/// With `config_path` unset, looks for `arch-conform.toml` or
/// `.arch-conform.toml` at the workspace root. Relative paths are resolved
/// against the workspace root.
///
/// # Panics
///
/// Panics if an explicit config file cannot be read, the configuration is
/// invalid, or with the failure report if any rule fails.
pub fn assert_conforms(model: &CodeModel, config_path: Option<&str>) {
    let root = find_project_root();
    let content = read_config_content(&root, config_path);
    assert_rules_with_config(model, Vec::new(), &content);
}

fn evaluate(
    model: &CodeModel,
    rules: impl IntoIterator<Item = RuleBox>,
    config: Config,
) -> EvaluationSummary {
    let evaluator = Evaluator::builder()
        .rules(rules)
        .config(config)
        .build()
        .unwrap_or_else(|e| panic!("arch-conform: failed to build evaluator: {e}"));
    evaluator.evaluate(model)
}

fn assert_summary(summary: &EvaluationSummary) {
    if summary.has_failures() {
        panic!("{}", summary.format_test_report());
    }
}

/// Reads the raw TOML content from the config file.
///
/// Returns an empty string if no config file is found.
fn read_config_content(root: &Path, explicit_path: Option<&str>) -> String {
    if let Some(path) = explicit_path {
        let full_path = if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            root.join(path)
        };
        return std::fs::read_to_string(&full_path).unwrap_or_else(|e| {
            panic!(
                "arch-conform: failed to read config from {}: {e}",
                full_path.display()
            );
        });
    }

    for candidate in CONFIG_CANDIDATES {
        let path = root.join(candidate);
        if path.exists() {
            return std::fs::read_to_string(&path).unwrap_or_else(|e| {
                panic!(
                    "arch-conform: failed to read config from {}: {e}",
                    path.display()
                );
            });
        }
    }

    String::new()
}

/// Parses a `Config` from TOML content.
fn parse_config(content: &str) -> Config {
    if content.is_empty() {
        return Config::default();
    }
    Config::parse(content).unwrap_or_else(|e| {
        panic!("arch-conform: failed to parse config: {e}");
    })
}

/// Loads declarative rules from TOML content.
fn load_declarative_rules(content: &str) -> Vec<RuleBox> {
    if content.is_empty() {
        return vec![];
    }
    declarative::load_rules_from_toml(content)
        .unwrap_or_else(|e| panic!("arch-conform: declarative config error: {e}"))
}

/// Checks whether a `Cargo.toml` file defines a `[workspace]` section.
fn has_workspace_section(cargo_toml: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(cargo_toml) else {
        return false;
    };
    let Ok(table) = content.parse::<toml::Table>() else {
        return false;
    };
    table.contains_key("workspace")
}

/// Finds the workspace root, starting from `CARGO_MANIFEST_DIR`.
fn find_project_root() -> PathBuf {
    let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    };
    let manifest_path = PathBuf::from(manifest_dir);

    let mut candidate = manifest_path.as_path();
    loop {
        let cargo_toml = candidate.join("Cargo.toml");
        if cargo_toml.exists() && has_workspace_section(&cargo_toml) {
            return candidate.to_path_buf();
        }
        match candidate.parent() {
            Some(parent) => candidate = parent,
            None => break,
        }
    }

    // not inside a workspace
    manifest_path
}
