//! Effect toggles and post-processing tuning with TOML preset support.
//!
//! [`EffectsOptions`] holds the per-effect enable/strength pairs the
//! pipeline exposes through its accessors; [`PostProcessingOptions`] holds
//! the finer shader parameters. Both serialize to/from TOML presets and
//! publish a JSON schema for UI generators.

mod effects;
mod post_processing;

use std::path::Path;

pub use effects::{EdgeDetectionConfig, EffectConfig, EffectsOptions};
pub use post_processing::PostProcessingOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[effects]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Effect toggles and strengths.
    pub effects: EffectsOptions,
    /// Post-processing shader parameters.
    pub post_processing: PostProcessingOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// The schema serialized as pretty JSON, ready to hand to a form
    /// generator.
    pub fn json_schema_string() -> Result<String, PipelineError> {
        serde_json::to_string_pretty(&Self::json_schema())
            .map_err(|e| PipelineError::OptionsParse(e.to_string()))
    }

    /// Parse options from TOML text. Missing fields use defaults and effect
    /// strengths are clamped.
    pub fn from_toml(content: &str) -> Result<Self, PipelineError> {
        let options: Self = toml::from_str(content)
            .map_err(|e| PipelineError::OptionsParse(e.to_string()))?;
        Ok(options.sanitized())
    }

    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(PipelineError::Io)?;
        Self::from_toml(&content)
    }

    /// Save options to a TOML file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PipelineError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(PipelineError::Io)?;
        }
        std::fs::write(path, content).map_err(PipelineError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }

    /// Re-apply input clamping to every validated field.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            effects: self.effects.sanitized(),
            post_processing: self.post_processing,
        }
    }
}
