//! Configuration handling for the GenomeShader CLI
//!
//! Supports loading configuration from genomeshader.toml files with CLI
//! argument overrides.

use crate::error::{CliError, CliResult};
use genomeshader_core::{Axis, RenderConfig, VariantOrdering};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "genomeshader.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub view: ViewConfig,
    pub export: ExportSettings,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    pub axis: Axis,
    pub ordering: VariantOrdering,
    /// Fraction added on each side when the window is derived from the data
    pub auto_padding: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 400,
            axis: Axis::Horizontal,
            ordering: VariantOrdering::Genomic,
            auto_padding: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub legend: bool,
    pub scale_bar: bool,
    pub footer: bool,
    pub font_family: String,
    pub font_size: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            legend: true,
            scale_bar: true,
            footer: true,
            font_family: "Arial, sans-serif".to_string(),
            font_size: 12,
        }
    }
}

/// Command-line values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub axis: Option<Axis>,
    pub ordering: Option<VariantOrdering>,
    pub segments: Option<u32>,
    pub expansion_factor: Option<f64>,
    pub no_legend: bool,
    pub no_scale_bar: bool,
    pub no_footer: bool,
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> CliResult<Self> {
        let config = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::file_not_found(path.to_path_buf()));
                }
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    log::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                    Self::load_from_file(&default_path)?
                } else {
                    log::debug!("Using default configuration");
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Generate example configuration file content
    pub fn example_toml() -> CliResult<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(width) = overrides.width {
            self.view.width = width;
        }
        if let Some(height) = overrides.height {
            self.view.height = height;
        }
        if let Some(axis) = overrides.axis {
            self.view.axis = axis;
        }
        if let Some(ordering) = overrides.ordering {
            self.view.ordering = ordering;
        }
        if let Some(segments) = overrides.segments {
            self.render.tessellation.segments = segments;
        }
        if let Some(factor) = overrides.expansion_factor {
            self.render.gaps.expansion_factor = factor;
        }
        self.export.legend &= !overrides.no_legend;
        self.export.scale_bar &= !overrides.no_scale_bar;
        self.export.footer &= !overrides.no_footer;
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.view.width == 0 || self.view.height == 0 {
            return Err(CliError::config(format!(
                "view size must be positive, got {}x{}",
                self.view.width, self.view.height
            )));
        }
        if self.view.auto_padding.is_nan() || self.view.auto_padding < 0.0 {
            return Err(CliError::config("view.auto_padding must be non-negative"));
        }
        self.render.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.view.width, 1200);
        assert_eq!(config.view.axis, Axis::Horizontal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() -> CliResult<()> {
        let mut config = Config::default();
        config.view.axis = Axis::Vertical;
        config.render.gaps.expansion_factor = 1.5;
        let temp_file = NamedTempFile::new()?;

        config.save_to_file(temp_file.path())?;
        let loaded = Config::load_from_file(temp_file.path())?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> CliResult<()> {
        let temp_file = NamedTempFile::new()?;
        std::fs::write(temp_file.path(), "[view]\naxis = \"vertical\"\n\n[render.cache]\ncapacity = 16\n")?;
        let loaded = Config::load(Some(temp_file.path()))?;
        assert_eq!(loaded.view.axis, Axis::Vertical);
        assert_eq!(loaded.view.width, 1200);
        assert_eq!(loaded.render.cache.capacity, 16);
        Ok(())
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        config.apply_overrides(&Overrides {
            width: Some(640),
            ordering: Some(VariantOrdering::EqualSpacing),
            no_footer: true,
            ..Overrides::default()
        });
        assert_eq!(config.view.width, 640);
        assert_eq!(config.view.ordering, VariantOrdering::EqualSpacing);
        assert!(!config.export.footer);
        assert!(config.export.legend);
    }

    #[test]
    fn test_example_toml_generation() {
        let example = Config::example_toml().unwrap();
        assert!(example.contains("[view]"));
        assert!(example.contains("[export]"));
        assert!(example.contains("expansion_factor"));
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        let mut config = Config::default();
        config.view.height = 0;
        assert!(matches!(config.validate(), Err(CliError::Config { .. })));
    }
}
