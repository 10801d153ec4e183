//! Configuration management for Nebula

use crate::error::{NebulaError, Result};
use crate::types::{ValidationError, ValidationResult, ValidationWarning};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] =
    &["nebula.config.yaml", "nebula.config.yml", "nebula.config.json"];

static CHANNEL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("channel pattern is valid"));

/// How fences are turned into file writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Lower-case explicit filenames before writing them
    pub lowercase_paths: bool,
    /// Name created for inferred JavaScript when no script exists yet
    pub default_script: String,
    /// Extensions accepted by filename markers beyond the built-in list
    pub extra_extensions: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            lowercase_paths: false,
            default_script: "script.js".to_string(),
            extra_extensions: Vec::new(),
        }
    }
}

/// How the preview document is composed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub title: String,
    /// Tag stamped on every message the sandbox posts
    pub channel: String,
    /// File the CLI writes the composed document to
    pub output: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            title: "Preview".to_string(),
            channel: "nebula-preview".to_string(),
            output: "preview.html".to_string(),
        }
    }
}

/// Host-side handling of sandbox messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Drop messages from documents composed before the current one
    pub discard_stale: bool,
}

/// Project configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NebulaConfig {
    pub name: String,
    pub extractor: ExtractorConfig,
    pub preview: PreviewConfig,
    pub bridge: BridgeConfig,
}

impl NebulaConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Configuration manager for loading and saving project configurations
pub struct ConfigManager {
    cache: std::collections::HashMap<PathBuf, CachedConfig>,
}

struct CachedConfig {
    config: NebulaConfig,
    modified_time: std::time::SystemTime,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            cache: std::collections::HashMap::new(),
        }
    }

    /// Find configuration file in a directory
    pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    pub fn is_config_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| CONFIG_FILE_NAMES.contains(&name))
            .unwrap_or(false)
    }

    /// Load configuration from a file
    pub fn load(&mut self, config_path: &Path) -> Result<NebulaConfig> {
        let metadata = std::fs::metadata(config_path)?;
        let modified_time = metadata
            .modified()
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);

        if let Some(cached) = self.cache.get(config_path) {
            if cached.modified_time == modified_time {
                return Ok(cached.config.clone());
            }
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: NebulaConfig = if is_json(config_path) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        self.cache.insert(
            config_path.to_path_buf(),
            CachedConfig {
                config: config.clone(),
                modified_time,
            },
        );

        Ok(config)
    }

    /// Load configuration from a directory (searches for config files)
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<(NebulaConfig, PathBuf)> {
        let config_path = Self::find_config_file(dir)
            .ok_or_else(|| NebulaError::ConfigNotFound(dir.display().to_string()))?;

        let config = self.load(&config_path)?;
        Ok((config, config_path))
    }

    /// Load the directory's configuration, or defaults when it has none
    pub fn load_or_default(&mut self, dir: &Path) -> Result<NebulaConfig> {
        match self.load_from_directory(dir) {
            Ok((config, _)) => Ok(config),
            Err(NebulaError::ConfigNotFound(_)) => {
                let name = dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("nebula-project");
                Ok(NebulaConfig::new(name))
            }
            Err(e) => Err(e),
        }
    }

    /// Validate a configuration
    pub fn validate(&self, config: &NebulaConfig) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if !CHANNEL_NAME.is_match(&config.preview.channel) {
            result = result.with_error(ValidationError {
                field: "preview.channel".to_string(),
                message: "Channel must be lowercase alphanumeric with hyphens".to_string(),
                code: "INVALID_CHANNEL".to_string(),
            });
        }

        let script = &config.extractor.default_script;
        if !script.ends_with(".js") || script.contains('/') || script.len() <= 3 {
            result = result.with_error(ValidationError {
                field: "extractor.default_script".to_string(),
                message: "Default script must be a bare .js filename".to_string(),
                code: "INVALID_DEFAULT_SCRIPT".to_string(),
            });
        }

        for ext in &config.extractor.extra_extensions {
            let bare = ext.trim_start_matches('.');
            if bare.is_empty() || !bare.chars().all(|c| c.is_ascii_alphanumeric()) {
                result = result.with_error(ValidationError {
                    field: "extractor.extra_extensions".to_string(),
                    message: format!("Extension '{}' must be alphanumeric", ext),
                    code: "INVALID_EXTENSION".to_string(),
                });
            }
        }

        if config.preview.output.trim().is_empty() {
            result = result.with_error(ValidationError {
                field: "preview.output".to_string(),
                message: "Preview output path must not be empty".to_string(),
                code: "INVALID_OUTPUT".to_string(),
            });
        }

        if config.preview.title.trim().is_empty() {
            result = result.with_warning(ValidationWarning {
                field: "preview.title".to_string(),
                message: "Preview title is empty".to_string(),
                suggestion: Some("Set a title so the preview tab is recognizable".to_string()),
            });
        }

        result
    }

    /// Save configuration to a file
    pub fn save(&self, config: &NebulaConfig, config_path: &Path) -> Result<()> {
        let content = if is_json(config_path) {
            serde_json::to_string_pretty(config)?
        } else {
            serde_yaml::to_string(config)?
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(config_path, content)?;

        Ok(())
    }

    /// Create a default configuration
    pub fn create_default(name: &str) -> NebulaConfig {
        NebulaConfig::new(name)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_yaml_uses_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nebula.config.yaml");
        std::fs::write(
            &config_path,
            "name: landing\nextractor:\n  default_script: app.js\n",
        )?;

        let mut manager = ConfigManager::new();
        let (config, found) = manager.load_from_directory(temp_dir.path())?;

        assert_eq!(found, config_path);
        assert_eq!(config.name, "landing");
        assert_eq!(config.extractor.default_script, "app.js");
        assert!(!config.extractor.lowercase_paths);
        assert_eq!(config.preview.channel, "nebula-preview");
        assert!(!config.bridge.discard_stale);
        Ok(())
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut manager = ConfigManager::new();

        assert!(matches!(
            manager.load_from_directory(temp_dir.path()),
            Err(NebulaError::ConfigNotFound(_))
        ));
        let config = manager.load_or_default(temp_dir.path())?;
        assert_eq!(config.preview.output, "preview.html");
        Ok(())
    }

    #[test]
    fn test_save_and_reload_json() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nebula.config.json");

        let mut config = ConfigManager::create_default("demo");
        config.bridge.discard_stale = true;

        let mut manager = ConfigManager::new();
        manager.save(&config, &config_path)?;
        assert_eq!(manager.load(&config_path)?, config);
        Ok(())
    }

    #[test]
    fn test_validate_flags_bad_values() {
        let manager = ConfigManager::new();
        assert!(manager.validate(&NebulaConfig::new("ok")).valid);

        let mut config = NebulaConfig::new("bad");
        config.preview.channel = "Bad Channel".to_string();
        config.extractor.default_script = "src/app.ts".to_string();
        config.extractor.extra_extensions = vec!["vue".to_string(), "a-b".to_string()];
        config.preview.title = String::new();

        let result = manager.validate(&config);
        assert!(!result.valid);
        let codes: Vec<_> = result.errors.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(
            codes,
            vec!["INVALID_CHANNEL", "INVALID_DEFAULT_SCRIPT", "INVALID_EXTENSION"]
        );
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_is_config_file() {
        assert!(ConfigManager::is_config_file(Path::new("/p/nebula.config.yml")));
        assert!(!ConfigManager::is_config_file(Path::new("/p/index.html")));
    }
}
