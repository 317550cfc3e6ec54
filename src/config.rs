//! Configuration system for the linter
//!
//! Reads configuration from `.markuplintrc.yaml`, `.markuplintrc.yml` or
//! `.markuplintrc.json` in the working directory. Every section rejects
//! unknown keys, so typos fail at load time instead of being ignored.

use crate::diagnostic::Severity;
use crate::parser::ParserOptions;
use crate::rules::element_newline::{ElementNewline, ElementNewlineOptions};
use crate::rules::require_closing_tags::{RequireClosingTags, RequireClosingTagsOptions};
use crate::rules::ActiveRule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern '{pattern}' for {rule}: {source}")]
    InvalidPattern {
        rule: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown preset '{preset}' for {rule}")]
    UnknownPreset { rule: &'static str, preset: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// File names searched by [`Config::load_default`], in order
pub const CONFIG_FILE_NAMES: [&str; 3] = [
    ".markuplintrc.yaml",
    ".markuplintrc.yml",
    ".markuplintrc.json",
];

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Enable parallel processing
    pub parallel: bool,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,

    /// Upper bound on lint/fix rounds per file
    pub max_fix_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
            max_fix_passes: 10,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color: ColorMode,
}

/// File handling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    /// Include patterns
    pub include: Vec<String>,

    /// Exclude patterns
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*.html".to_string(), "**/*.htm".to_string()],
            exclude: vec!["**/node_modules/**".to_string()],
        }
    }
}

/// Rule options that know the severity their rule runs at by default
pub trait RuleOptions: Default {
    const DEFAULT_SEVERITY: Severity;
}

impl RuleOptions for RequireClosingTagsOptions {
    const DEFAULT_SEVERITY: Severity = Severity::Error;
}

impl RuleOptions for ElementNewlineOptions {
    const DEFAULT_SEVERITY: Severity = Severity::Warning;
}

/// Per-rule switch, severity and options. Missing keys fall back to the
/// rule's own defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    default,
    deny_unknown_fields,
    bound(deserialize = "T: Deserialize<'de> + RuleOptions")
)]
pub struct RuleEntry<T> {
    pub enabled: bool,
    pub severity: Severity,
    pub options: T,
}

impl<T: RuleOptions> Default for RuleEntry<T> {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: T::DEFAULT_SEVERITY,
            options: T::default(),
        }
    }
}

/// Settings for the built-in rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    #[serde(rename = "require-closing-tags")]
    pub require_closing_tags: RuleEntry<RequireClosingTagsOptions>,

    #[serde(rename = "element-newline")]
    pub element_newline: RuleEntry<ElementNewlineOptions>,
}

/// Complete linter configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub parser: ParserOptions,
    pub files: FilesConfig,
    pub engine: EngineConfig,
    pub output: OutputConfig,
    pub rules: RulesConfig,
}

impl Config {
    /// Load configuration from a file, picking the format by extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config = match ext {
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            "json" => Self::from_json_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration from the working directory, or the defaults
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."))
    }

    /// Load the first configuration file found in `dir`, or the defaults
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        for name in CONFIG_FILE_NAMES {
            let path: PathBuf = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // an empty file is a valid, all-default configuration
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_fix_passes == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_fix_passes must be at least 1".to_string(),
            ));
        }
        if let Some((open, close)) = self
            .parser
            .templates
            .iter()
            .find(|(open, close)| open.is_empty() || close.is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "Empty template delimiter in [{:?}, {:?}]",
                open, close
            )));
        }
        Ok(())
    }

    /// Activate every enabled rule with its options
    pub fn build_rules(&self) -> Result<Vec<ActiveRule>, ConfigError> {
        let mut rules = Vec::new();

        let entry = &self.rules.require_closing_tags;
        if entry.enabled {
            rules.push(ActiveRule::new(
                Box::new(RequireClosingTags::new(&entry.options)?),
                entry.severity,
            ));
        }

        let entry = &self.rules.element_newline;
        if entry.enabled {
            rules.push(ActiveRule::new(
                Box::new(ElementNewline::new(&entry.options)?),
                entry.severity,
            ));
        }

        for rule in &rules {
            log::trace!("activated {} ({})", rule.rule.meta().id, rule.severity);
        }
        Ok(rules)
    }
}
