//! Configuration management for PawBuddy
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.pawbuddy/config.toml

use crate::errors::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete configuration for the assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub nlu: NluConfig,
    pub vector: VectorConfig,
    pub search: SearchConfig,
    pub reference: ReferenceConfig,
    pub profile: ProfileConfig,
    pub paths: PathsConfig,
}

/// Text-understanding service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NluConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub timeout_ms: u64,
}

/// Vector-similarity service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    pub url: String,
    pub collection: String,
    pub embed_model: String,
    pub timeout_ms: u64,
}

/// Retrieval behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results returned to the caller per turn
    pub top_k: usize,
    /// Candidates fetched per result slot, to leave room for post-filtering
    pub overfetch_factor: usize,
    /// Minimum similarity score accepted from the service (0.0 to 1.0)
    pub score_threshold: f64,
}

/// Comparative-reference price policy ("cheaper", "more expensive")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// New price_max as a fraction of the cheapest prior result
    pub cheaper_factor: f64,
    /// New price_min as a multiple of the priciest prior result
    pub pricier_factor: f64,
}

/// Customer profile store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub db_path: String,
}

/// File system paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub state_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nlu: NluConfig::default(),
            vector: VectorConfig::default(),
            search: SearchConfig::default(),
            reference: ReferenceConfig::default(),
            profile: ProfileConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11434,
            model: "qwen2.5:7b-instruct".to_string(),
            timeout_ms: 15_000,
        }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "pet_products".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            overfetch_factor: 3,
            score_threshold: 0.0,
        }
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            cheaper_factor: 0.8,
            pricier_factor: 1.2,
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            db_path: "~/.pawbuddy/customers.db".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: "~/.pawbuddy".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AssistantError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| AssistantError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".pawbuddy").join("config.toml");
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.search.top_k == 0 {
            return Err(AssistantError::ConfigError(
                "search.top_k must be greater than 0".to_string(),
            ));
        }

        if self.search.overfetch_factor == 0 {
            return Err(AssistantError::ConfigError(
                "search.overfetch_factor must be greater than 0".to_string(),
            ));
        }

        if self.search.score_threshold < 0.0 || self.search.score_threshold > 1.0 {
            return Err(AssistantError::ConfigError(
                "search.score_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.reference.cheaper_factor <= 0.0 || self.reference.cheaper_factor >= 1.0 {
            return Err(AssistantError::ConfigError(
                "reference.cheaper_factor must be between 0.0 and 1.0 exclusive".to_string(),
            ));
        }

        if self.reference.pricier_factor <= 1.0 {
            return Err(AssistantError::ConfigError(
                "reference.pricier_factor must be greater than 1.0".to_string(),
            ));
        }

        if self.nlu.timeout_ms == 0 || self.vector.timeout_ms == 0 {
            return Err(AssistantError::ConfigError(
                "service timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AssistantError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AssistantError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| AssistantError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Get NLU service base URL
    pub fn nlu_url(&self) -> String {
        format!("http://{}:{}", self.nlu.host, self.nlu.port)
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if path.starts_with("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(&path[2..]);
            }
        }
        PathBuf::from(path)
    }

    /// Get profile database path
    pub fn profile_db_path(&self) -> PathBuf {
        Self::expand_path(&self.profile.db_path)
    }

    /// Get state directory path
    pub fn state_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.state_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.nlu.host, "127.0.0.1");
        assert_eq!(config.nlu.port, 11434);
        assert_eq!(config.search.top_k, 5);
        assert_eq!(config.search.overfetch_factor, 3);
    }

    #[test]
    fn test_config_validation_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_top_k() {
        let mut config = Config::default();
        config.search.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_cheaper_factor_range() {
        let mut config = Config::default();
        config.reference.cheaper_factor = 1.5;
        assert!(config.validate().is_err());

        config.reference.cheaper_factor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_pricier_factor_range() {
        let mut config = Config::default();
        config.reference.pricier_factor = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nlu_url() {
        let config = Config::default();
        assert_eq!(config.nlu_url(), "http://127.0.0.1:11434");
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path("~/.pawbuddy");
        assert!(!expanded.to_string_lossy().contains('~'));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = "/absolute/path";
        let expanded = Config::expand_path(path);
        assert_eq!(expanded.to_string_lossy(), path);
    }
}
