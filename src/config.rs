//! Configuration management for registry analysis
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (vkreg.toml)
//! - Environment variables (VKREG__*)
//!
//! ## Example config file (vkreg.toml):
//! ```toml
//! [registry]
//! primary = "external/Vulkan-Headers/registry/vk.xml"
//! secondary = "external/Vulkan-Headers/registry/video.xml"
//! feature_detect = "include/vulkan_feature_detect.h"
//!
//! [target]
//! api = "vulkan"
//! max_version = "1.3"
//!
//! [vendor]
//! allowed_tags = ["KHR", "EXT", "ANDROID", "GOOGLE", "ARM"]
//!
//! [export]
//! output_format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::{rules, AnalysisOptions};
use crate::error::Result;
use crate::version::ApiVersion;

/// Main configuration for registry analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Input documents
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Target API selection
    #[serde(default)]
    pub target: TargetConfig,

    /// Vendor tag filtering
    #[serde(default)]
    pub vendor: VendorConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Input document locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Main registry document
    #[serde(default = "default_primary")]
    pub primary: PathBuf,

    /// Video registry document
    #[serde(default = "default_secondary")]
    pub secondary: PathBuf,

    /// Header declaring the feature-detection wrappers
    #[serde(default)]
    pub feature_detect: Option<PathBuf>,
}

/// Target API selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// API name matched against `api`/`supported` attributes
    #[serde(default = "default_api")]
    pub api: String,

    /// Skip features numbered above this version
    #[serde(default)]
    pub max_version: Option<String>,
}

/// Vendor tag filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Tags kept even though the registry lists them
    #[serde(default = "default_allowed_tags")]
    pub allowed_tags: Vec<String>,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format (pretty or compact)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_primary() -> PathBuf {
    PathBuf::from("registry/vk.xml")
}

fn default_secondary() -> PathBuf {
    PathBuf::from("registry/video.xml")
}

fn default_api() -> String {
    "vulkan".to_string()
}

fn default_allowed_tags() -> Vec<String> {
    rules::ALWAYS_ALLOWED_TAGS.iter().map(|t| t.to_string()).collect()
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            feature_detect: None,
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            api: default_api(),
            max_version: None,
        }
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            allowed_tags: default_allowed_tags(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_format: default_output_format(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["vkreg.toml", ".vkreg.toml", "config/vkreg.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "vkreg", "vk-registry-tables") {
            let xdg_config = config_dir.config_dir().join("vkreg.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // VKREG__TARGET__API=vulkansc
        builder = builder.add_source(
            Environment::with_prefix("VKREG")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Options for a single analysis run
    pub fn options(&self) -> Result<AnalysisOptions> {
        let max_version = self
            .target
            .max_version
            .as_deref()
            .map(ApiVersion::parse)
            .transpose()?;
        Ok(AnalysisOptions {
            target_api: self.target.api.clone(),
            allowed_tags: self.vendor.allowed_tags.clone(),
            max_version,
        })
    }

    /// Resolve a configured path against `base` when it is relative
    pub fn resolve(&self, path: &Path, base: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.target.api, "vulkan");
        assert_eq!(config.vendor.allowed_tags, vec!["KHR", "EXT", "ANDROID", "GOOGLE", "ARM"]);
        assert_eq!(config.export.output_format, OutputFormat::Pretty);
        assert!(config.registry.feature_detect.is_none());
    }

    #[test]
    fn test_serialize_config() {
        let config = AnalysisConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[target]"));
        assert!(toml_str.contains("[export]"));
    }

    #[test]
    fn test_options_from_config() {
        let mut config = AnalysisConfig::default();
        config.target.max_version = Some("1.2".to_string());
        let options = config.options().unwrap();
        assert_eq!(options.target_api, "vulkan");
        assert_eq!(options.max_version, Some(ApiVersion::new(1, 2)));

        config.target.max_version = Some("latest".to_string());
        assert!(config.options().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[target]\napi = \"vulkansc\"\n\n[vendor]\nallowed_tags = [\"KHR\"]\n\n[export]\noutput_format = \"compact\"\n",
        )
        .unwrap();
        let config = AnalysisConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.target.api, "vulkansc");
        assert_eq!(config.vendor.allowed_tags, vec!["KHR"]);
        assert_eq!(config.export.output_format, OutputFormat::Compact);
        assert_eq!(config.registry.primary, PathBuf::from("registry/vk.xml"));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = AnalysisConfig::default();
        config.registry.feature_detect = Some(PathBuf::from("include/vulkan_feature_detect.h"));
        config.save(&path).unwrap();
        let loaded = AnalysisConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.registry.feature_detect, config.registry.feature_detect);
    }

    #[test]
    fn test_resolve_relative_paths() {
        let config = AnalysisConfig::default();
        let base = Path::new("/work");
        assert_eq!(config.resolve(&config.registry.primary, base), PathBuf::from("/work/registry/vk.xml"));
        assert_eq!(config.resolve(Path::new("/abs/vk.xml"), base), PathBuf::from("/abs/vk.xml"));
    }
}
