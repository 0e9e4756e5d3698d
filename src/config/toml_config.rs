use crate::config::catalog::CategoryCatalog;
use crate::domain::model::Poi;
use crate::utils::error::{DiscoveryError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub debounce: DebounceConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    /// Category tag -> stored categories. Empty means the built-in table.
    pub categories: BTreeMap<String, Vec<String>>,
    /// Replaces the built-in fallback list when non-empty.
    pub fallback: Vec<Poi>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub endpoint: String,
    pub table: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub max_results: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:54321".to_string(),
            table: "points_of_interest".to_string(),
            api_key: None,
            timeout_seconds: 10,
            max_results: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    pub filters_ms: u64,
    pub map_bounds_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            filters_ms: 300,
            map_bounds_ms: 800,
        }
    }
}

impl DebounceConfig {
    pub fn filters(&self) -> Duration {
        Duration::from_millis(self.filters_ms)
    }

    pub fn map_bounds(&self) -> Duration {
        Duration::from_millis(self.map_bounds_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 300,
            max_entries: 64,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for this crate's own events when `RUST_LOG` is unset.
    pub level: String,
    /// Level for dependencies (reqwest, hyper, ...).
    pub dependencies: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dependencies: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| DiscoveryError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| DiscoveryError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn catalog(&self) -> CategoryCatalog {
        if self.categories.is_empty() {
            CategoryCatalog::default()
        } else {
            CategoryCatalog::new(self.categories.clone())
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("store.endpoint", &self.store.endpoint)?;
        validation::validate_non_empty_string("store.table", &self.store.table)?;
        validation::validate_range("store.timeout_seconds", self.store.timeout_seconds, 1, 120)?;
        validation::validate_positive_number("store.max_results", self.store.max_results as u64, 1)?;

        if let Some(key) = &self.store.api_key {
            if key.starts_with("${") {
                return Err(DiscoveryError::MissingConfigError {
                    field: format!("store.api_key (environment variable {} is not set)", key),
                });
            }
        }

        validation::validate_range("debounce.filters_ms", self.debounce.filters_ms, 0, 10_000)?;
        validation::validate_range(
            "debounce.map_bounds_ms",
            self.debounce.map_bounds_ms,
            0,
            10_000,
        )?;

        if self.cache.enabled {
            validation::validate_positive_number("cache.ttl_seconds", self.cache.ttl_seconds, 1)?;
            validation::validate_positive_number(
                "cache.max_entries",
                self.cache.max_entries as u64,
                1,
            )?;
        }

        for (field, level) in [
            ("logging.level", &self.logging.level),
            ("logging.dependencies", &self.logging.dependencies),
        ] {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(DiscoveryError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: level.clone(),
                    reason: format!("Expected one of {}", LOG_LEVELS.join(", ")),
                });
            }
        }

        for (tag, categories) in &self.categories {
            if categories.is_empty() {
                return Err(DiscoveryError::InvalidConfigValueError {
                    field: format!("categories.{}", tag),
                    value: "[]".to_string(),
                    reason: "A category tag must map to at least one stored category".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.store.table, "points_of_interest");
        assert_eq!(config.debounce.filters_ms, 300);
        assert_eq!(config.debounce.map_bounds_ms, 800);
        assert!(config.cache.enabled);
        assert_eq!(config.catalog(), CategoryCatalog::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"
[store]
endpoint = "https://abc.supabase.co"
api_key = "anon-key"
max_results = 50

[debounce]
filters_ms = 250

[cache]
enabled = false

[logging]
level = "debug"
format = "json"

[categories]
cibo = ["Ristoranti", "Cantine"]

[[fallback]]
id = "fb-1"
name = "Ponte di Tiberio"
category = "Monumenti"
latitude = 44.0625
longitude = 12.5622
"#;
        let config = AppConfig::from_toml_str(content).unwrap();
        assert_eq!(config.store.endpoint, "https://abc.supabase.co");
        assert_eq!(config.store.max_results, 50);
        assert_eq!(config.debounce.filters_ms, 250);
        assert_eq!(config.debounce.map_bounds_ms, 800);
        assert!(!config.cache.enabled);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.dependencies, "warn");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.catalog().expand("cibo"), vec!["Ristoranti", "Cantine"]);
        assert_eq!(config.fallback.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("MIA_ROMAGNA_TEST_KEY", "secret-from-env");
        let config = AppConfig::from_toml_str(
            "[store]\nendpoint = \"https://abc.supabase.co\"\napi_key = \"${MIA_ROMAGNA_TEST_KEY}\"\n",
        )
        .unwrap();
        assert_eq!(config.store.api_key.as_deref(), Some("secret-from-env"));
    }

    #[test]
    fn test_unset_env_var_fails_validation() {
        let config = AppConfig::from_toml_str(
            "[store]\nendpoint = \"https://abc.supabase.co\"\napi_key = \"${MIA_ROMAGNA_UNSET_VAR}\"\n",
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(DiscoveryError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = AppConfig::default();
        config.store.endpoint = "ftp://store".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.categories.insert("vuoto".to_string(), vec![]);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "chatty".to_string();
        assert!(matches!(
            config.validate(),
            Err(DiscoveryError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store]\ntable = \"pois\"").unwrap();
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.store.table, "pois");
    }

    #[test]
    fn test_malformed_toml() {
        let err = AppConfig::from_toml_str("[store\nendpoint = 1").unwrap_err();
        assert!(matches!(err, DiscoveryError::ConfigValidationError { .. }));
    }
}
