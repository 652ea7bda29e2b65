use crate::config::auth::AuthConfig;
use crate::core::importer::{default_fallback_date, ImportSettings};
use crate::core::normalizer::{Normalizer, DEFAULT_FIXED_LENGTH};
use crate::utils::error::{Result, SerialError};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Widest code whose digits still fit a `u128`.
pub const MAX_FIXED_LENGTH: usize = 38;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub normalizer: NormalizerConfig,
    pub import: ImportConfig,
    pub auth: AuthConfig,
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./data/serials.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub fixed_length: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            fixed_length: DEFAULT_FIXED_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub max_errors: usize,
    pub commit_interval: usize,
    pub fallback_date: NaiveDate,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_errors: 100,
            commit_interval: 1000,
            fallback_date: default_fallback_date(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub enabled: bool,
    /// Full send URL, API key included, e.g. `https://api.kavenegar.com/v1/<key>/sms/send.json`.
    pub endpoint: String,
    pub sender: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            sender: None,
            timeout_seconds: 10,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SerialError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SerialError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SMS_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SerialError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.normalizer.fixed_length)
    }

    pub fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            fixed_length: self.normalizer.fixed_length,
            max_errors: self.import.max_errors,
            commit_interval: self.import.commit_interval,
            fallback_date: self.import.fallback_date,
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("database.path", &self.database.path)?;
        validation::validate_range(
            "normalizer.fixed_length",
            self.normalizer.fixed_length,
            1,
            MAX_FIXED_LENGTH,
        )?;
        validation::validate_positive_number("import.max_errors", self.import.max_errors, 1)?;
        validation::validate_positive_number(
            "import.commit_interval",
            self.import.commit_interval,
            1,
        )?;

        if self.notifier.enabled {
            validation::validate_url("notifier.endpoint", &self.notifier.endpoint)?;
            validation::validate_positive_number(
                "notifier.timeout_seconds",
                self.notifier.timeout_seconds as usize,
                1,
            )?;
        }

        Ok(())
    }
}
