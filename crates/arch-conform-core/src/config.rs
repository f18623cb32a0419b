//! Configuration types for arch-conform.

use crate::proxy::{ProxySettings, ProxyStrategy, ProxyVisibility};
use crate::model::CodeModel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default maximum number of meta-annotation levels followed.
pub const DEFAULT_MAX_META_DEPTH: usize = 32;

/// Default scope size from which checks run in parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 256;

/// Top-level configuration for arch-conform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Annotation resolver configuration.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Proxyability analysis configuration.
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Rule evaluation configuration.
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Per-rule configurations.
    #[serde(default)]
    pub rules: HashMap<String, RuleConfig>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is out of range.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.max_meta_depth < 1 {
            return Err(ConfigError::Invalid {
                key: "resolver.max-meta-depth".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.evaluation.parallel_threshold < 1 {
            return Err(ConfigError::Invalid {
                key: "evaluation.parallel-threshold".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Checks if a rule is enabled.
    #[must_use]
    pub fn is_rule_enabled(&self, rule_name: &str) -> bool {
        self.rules
            .get(rule_name)
            .map_or(true, |c| c.enabled.unwrap_or(true))
    }

    /// Gets the `allow-empty-scope` override for a rule.
    #[must_use]
    pub fn rule_allow_empty_scope(&self, rule_name: &str) -> Option<bool> {
        self.rules.get(rule_name).and_then(|c| c.allow_empty_scope)
    }
}

/// Annotation resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Maximum meta-annotation depth followed from a directly-present annotation.
    #[serde(default = "default_max_meta_depth")]
    pub max_meta_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_meta_depth: DEFAULT_MAX_META_DEPTH,
        }
    }
}

fn default_max_meta_depth() -> usize {
    DEFAULT_MAX_META_DEPTH
}

/// Proxyability analysis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyConfig {
    /// Visibility mode. Ignored when `visibility-marker` is set.
    #[serde(default)]
    pub visibility: ProxyVisibility,

    /// Proxy generation strategy.
    #[serde(default)]
    pub strategy: ProxyStrategy,

    /// Type whose presence in the model selects the tolerant mode; its
    /// absence selects the strict mode.
    #[serde(default)]
    pub visibility_marker: Option<String>,
}

impl ProxyConfig {
    /// Computes the settings for one model, detecting the visibility mode
    /// from the marker type when configured.
    #[must_use]
    pub fn settings_for(&self, model: &CodeModel) -> ProxySettings {
        let visibility = match &self.visibility_marker {
            Some(marker) => ProxyVisibility::detect(model, marker),
            None => self.visibility,
        };
        ProxySettings {
            visibility,
            strategy: self.strategy,
        }
    }
}

/// Rule evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EvaluationConfig {
    /// Scope size from which per-element checks run in parallel.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Whether empty scopes are accepted by default.
    #[serde(default)]
    pub allow_empty_scope: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            allow_empty_scope: false,
        }
    }
}

fn default_parallel_threshold() -> usize {
    DEFAULT_PARALLEL_THRESHOLD
}

/// Per-rule configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleConfig {
    /// Whether this rule is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Override of the rule's `allow_empty_scope` flag.
    #[serde(default)]
    pub allow_empty_scope: Option<bool>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    #[diagnostic(code(arch_conform::config::io))]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    #[diagnostic(code(arch_conform::config::parse))]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A value is out of range.
    #[error("Invalid value for {key}: {message}")]
    #[diagnostic(code(arch_conform::config::invalid))]
    Invalid {
        /// Dotted key of the offending value.
        key: String,
        /// What is wrong with it.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.resolver.max_meta_depth, 32);
        assert_eq!(config.evaluation.parallel_threshold, 256);
        assert!(!config.evaluation.allow_empty_scope);
        assert_eq!(config.proxy.visibility, ProxyVisibility::Tolerant);
        assert_eq!(config.proxy.strategy, ProxyStrategy::Interface);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[resolver]
max-meta-depth = 4

[proxy]
visibility = "strict"
strategy = "subclass"

[evaluation]
parallel-threshold = 8
allow-empty-scope = true

[rules.transactional-proxyable]
enabled = false

[rules.async-return-types]
allow-empty-scope = false
"#;

        let config = Config::parse(toml).expect("Failed to parse");
        assert_eq!(config.resolver.max_meta_depth, 4);
        assert_eq!(config.proxy.visibility, ProxyVisibility::Strict);
        assert_eq!(config.proxy.strategy, ProxyStrategy::Subclass);
        assert_eq!(config.evaluation.parallel_threshold, 8);
        assert!(config.evaluation.allow_empty_scope);
        assert!(!config.is_rule_enabled("transactional-proxyable"));
        assert!(config.is_rule_enabled("unknown-rule"));
        assert_eq!(
            config.rule_allow_empty_scope("async-return-types"),
            Some(false)
        );
    }

    #[test]
    fn test_rejects_zero_depth() {
        let err = Config::parse("[resolver]\nmax-meta-depth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "resolver.max-meta-depth"));
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let err = Config::parse("[evaluation]\nparallel-threshold = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        let err = Config::parse("[proxy]\nvisibility = \"lenient\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[proxy]\nvisibility-marker = \"fw.aot.Hints\"").expect("write");

        let config = Config::from_file(file.path()).expect("Failed to load");
        assert_eq!(
            config.proxy.visibility_marker.as_deref(),
            Some("fw.aot.Hints")
        );
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = Config::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_marker_detection() {
        let mut builder = CodeModel::builder();
        builder.add_type(crate::model::TypeDecl::class("fw.aot.Hints"));
        let model = builder.build().expect("valid model");

        let config = ProxyConfig {
            visibility: ProxyVisibility::Strict,
            strategy: ProxyStrategy::Interface,
            visibility_marker: Some("fw.aot.Hints".to_string()),
        };
        assert_eq!(config.settings_for(&model).visibility, ProxyVisibility::Tolerant);

        let absent = ProxyConfig {
            visibility_marker: Some("fw.aot.Missing".to_string()),
            ..config
        };
        assert_eq!(absent.settings_for(&model).visibility, ProxyVisibility::Strict);
    }
}
