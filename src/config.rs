//! # Generator Configuration
//!
//! [`GeneratorConfig`] carries every knob of a generation run. It can be
//! built in code, loaded from a TOML file, or read from environment
//! variables.
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `SCHEMAFORGE_SPEC_VERSION` | `3.0` or `3.1` | `3.1` |
//! | `SCHEMAFORGE_MAX_DEPTH` | maximum expansion depth (floored at 1) | `32` |
//! | `SCHEMAFORGE_ENUM_THRESHOLD` | enum literal cap, `0` disables | `256` |
//! | `SCHEMAFORGE_OBJECT_MEMBER_THRESHOLD` | object member cap, unset disables | unset |
//! | `SCHEMAFORGE_EXAMPLE_BUDGET_MS` | example synthesis budget | `25` |
//! | `SCHEMAFORGE_ENUM_MODE` | `string` or `integer` | `string` |
//! | `SCHEMAFORGE_ENUM_NAMING` | `preserve`, `camel`, `pascal`, `snake`, `kebab`, `screaming_snake` | `preserve` |
//! | `SCHEMAFORGE_SYNTHESIZE_EXAMPLES` | `true`/`false` | `true` |
//!
//! Unparseable values fall back to the default.
//!
//! ## TOML
//!
//! ```toml
//! [generator]
//! spec_version = "3.0"
//! max_depth = 8
//! enum_mode = "integer"
//!
//! [scalar_overrides.Money]
//! type = "string"
//! format = "decimal"
//! ```

use crate::enums::{EnumMode, EnumRenamer, NamingPolicy};
use crate::example::DEFAULT_EXAMPLE_BUDGET;
use crate::guard::DEFAULT_MAX_DEPTH;
use crate::nullability::NullabilityEncoding;
use crate::scalar::ScalarOverride;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default enum literal cap
pub const DEFAULT_ENUM_THRESHOLD: usize = 256;

/// Target OpenAPI version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenApiVersion {
    #[serde(rename = "3.0")]
    V3_0,
    #[default]
    #[serde(rename = "3.1")]
    V3_1,
}

impl OpenApiVersion {
    /// Accepts `3.0`, `3.0.x`, `3.1`, `3.1.x`
    pub fn parse(s: &str) -> Option<OpenApiVersion> {
        let s = s.trim();
        if s == "3.0" || s.starts_with("3.0.") {
            Some(OpenApiVersion::V3_0)
        } else if s == "3.1" || s.starts_with("3.1.") {
            Some(OpenApiVersion::V3_1)
        } else {
            None
        }
    }

    /// Value of the document's `openapi` field
    pub fn document_version(&self) -> &'static str {
        match self {
            OpenApiVersion::V3_0 => "3.0.3",
            OpenApiVersion::V3_1 => "3.1.0",
        }
    }

    pub fn nullability(&self) -> NullabilityEncoding {
        match self {
            OpenApiVersion::V3_0 => NullabilityEncoding::Flag,
            OpenApiVersion::V3_1 => NullabilityEncoding::Union,
        }
    }
}

impl fmt::Display for OpenApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenApiVersion::V3_0 => f.write_str("3.0"),
            OpenApiVersion::V3_1 => f.write_str("3.1"),
        }
    }
}

#[derive(Clone)]
pub struct GeneratorConfig {
    pub spec_version: OpenApiVersion,
    /// Maximum number of simultaneously active expansions
    pub max_depth: usize,
    /// Enum literal cap; `0` disables virtualization
    pub enum_threshold: usize,
    /// Object member cap; `None` disables virtualization
    pub object_member_threshold: Option<usize>,
    /// Wall-clock budget per example synthesis request
    pub example_budget: Duration,
    pub enum_mode: EnumMode,
    pub enum_naming: NamingPolicy,
    /// Overrides `enum_naming` when set
    pub enum_renamer: Option<EnumRenamer>,
    /// Scalar overrides keyed by type name or identity
    pub scalar_overrides: BTreeMap<String, ScalarOverride>,
    /// Attach examples to document components
    pub synthesize_examples: bool,
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("spec_version", &self.spec_version)
            .field("max_depth", &self.max_depth)
            .field("enum_threshold", &self.enum_threshold)
            .field("object_member_threshold", &self.object_member_threshold)
            .field("example_budget", &self.example_budget)
            .field("enum_mode", &self.enum_mode)
            .field("enum_naming", &self.enum_naming)
            .field("enum_renamer", &self.enum_renamer.as_ref().map(|_| "<fn>"))
            .field("scalar_overrides", &self.scalar_overrides)
            .field("synthesize_examples", &self.synthesize_examples)
            .finish()
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            spec_version: OpenApiVersion::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            enum_threshold: DEFAULT_ENUM_THRESHOLD,
            object_member_threshold: None,
            example_budget: DEFAULT_EXAMPLE_BUDGET,
            enum_mode: EnumMode::default(),
            enum_naming: NamingPolicy::default(),
            enum_renamer: None,
            scalar_overrides: BTreeMap::new(),
            synthesize_examples: true,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl GeneratorConfig {
    pub fn with_spec_version(mut self, version: OpenApiVersion) -> Self {
        self.spec_version = version;
        self
    }

    /// Set the maximum depth, floored at 1
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn with_enum_mode(mut self, mode: EnumMode) -> Self {
        self.enum_mode = mode;
        self
    }

    pub fn with_enum_threshold(mut self, threshold: usize) -> Self {
        self.enum_threshold = threshold;
        self
    }

    pub fn with_object_member_threshold(mut self, threshold: Option<usize>) -> Self {
        self.object_member_threshold = threshold;
        self
    }

    pub fn with_example_budget(mut self, budget: Duration) -> Self {
        self.example_budget = budget;
        self
    }

    pub fn with_enum_renamer(mut self, renamer: EnumRenamer) -> Self {
        self.enum_renamer = Some(renamer);
        self
    }

    pub fn with_scalar_override(mut self, type_name: &str, mapping: ScalarOverride) -> Self {
        self.scalar_overrides.insert(type_name.to_string(), mapping);
        self
    }

    /// Load configuration from `SCHEMAFORGE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = GeneratorConfig::default();
        if let Some(v) = lookup("SCHEMAFORGE_SPEC_VERSION").and_then(|v| OpenApiVersion::parse(&v)) {
            config.spec_version = v;
        }
        if let Some(v) = lookup("SCHEMAFORGE_MAX_DEPTH").and_then(|v| v.trim().parse::<usize>().ok()) {
            config.max_depth = v.max(1);
        }
        if let Some(v) = lookup("SCHEMAFORGE_ENUM_THRESHOLD").and_then(|v| v.trim().parse().ok()) {
            config.enum_threshold = v;
        }
        if let Some(v) = lookup("SCHEMAFORGE_OBJECT_MEMBER_THRESHOLD").and_then(|v| v.trim().parse().ok()) {
            config.object_member_threshold = Some(v);
        }
        if let Some(ms) = lookup("SCHEMAFORGE_EXAMPLE_BUDGET_MS").and_then(|v| v.trim().parse().ok()) {
            config.example_budget = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("SCHEMAFORGE_ENUM_MODE").and_then(|v| EnumMode::parse(&v)) {
            config.enum_mode = v;
        }
        if let Some(v) = lookup("SCHEMAFORGE_ENUM_NAMING").and_then(|v| NamingPolicy::parse(&v)) {
            config.enum_naming = v;
        }
        if let Some(v) = lookup("SCHEMAFORGE_SYNTHESIZE_EXAMPLES").and_then(|v| parse_bool(&v)) {
            config.synthesize_examples = v;
        }
        config
    }

    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let file: ConfigFile = toml::from_str(contents).context("invalid generator config")?;
        Ok(file.into_config())
    }

    pub fn nullability(&self) -> NullabilityEncoding {
        self.spec_version.nullability()
    }
}

/// Read and parse a TOML configuration file
pub fn load_config(path: &Path) -> anyhow::Result<GeneratorConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read generator config: {}", path.display()))?;
    GeneratorConfig::from_toml_str(&contents)
        .with_context(|| format!("Failed to parse generator config: {}", path.display()))
}

/// On-disk layout of the TOML configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    generator: GeneratorSection,
    #[serde(default)]
    scalar_overrides: BTreeMap<String, ScalarOverride>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratorSection {
    spec_version: Option<String>,
    max_depth: Option<usize>,
    enum_threshold: Option<usize>,
    object_member_threshold: Option<usize>,
    example_budget_ms: Option<u64>,
    enum_mode: Option<EnumMode>,
    enum_naming: Option<NamingPolicy>,
    synthesize_examples: Option<bool>,
}

impl ConfigFile {
    fn into_config(self) -> GeneratorConfig {
        let defaults = GeneratorConfig::default();
        let g = self.generator;
        GeneratorConfig {
            spec_version: g
                .spec_version
                .as_deref()
                .and_then(OpenApiVersion::parse)
                .unwrap_or(defaults.spec_version),
            max_depth: g.max_depth.unwrap_or(defaults.max_depth).max(1),
            enum_threshold: g.enum_threshold.unwrap_or(defaults.enum_threshold),
            object_member_threshold: g.object_member_threshold,
            example_budget: g
                .example_budget_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.example_budget),
            enum_mode: g.enum_mode.unwrap_or(defaults.enum_mode),
            enum_naming: g.enum_naming.unwrap_or(defaults.enum_naming),
            enum_renamer: None,
            scalar_overrides: self.scalar_overrides,
            synthesize_examples: g.synthesize_examples.unwrap_or(defaults.synthesize_examples),
        }
    }
}
