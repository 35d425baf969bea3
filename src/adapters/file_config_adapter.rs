//! INI file configuration adapter.

use crate::domain::error::FolioError;
use crate::domain::portfolio::{TaxRules, DEFAULT_CURRENCY, DEFAULT_VAT};
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::{Path, PathBuf};

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FolioError> {
        let mut config = Ini::new();
        config.load(&path).map_err(|e| FolioError::ConfigParse {
            file: path.as_ref().display().to_string(),
            reason: e,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, FolioError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|e| FolioError::ConfigParse {
                file: "<inline>".to_string(),
                reason: e,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

/// Application settings: user-data location, portfolio defaults, tax rules.
/// Every key is optional; absent keys fall back to the legacy defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub user_data_dir: PathBuf,
    pub default_currency: String,
    pub default_vat: f64,
    pub tax_rules: TaxRules,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            user_data_dir: PathBuf::from("usrdata"),
            default_currency: DEFAULT_CURRENCY.to_string(),
            default_vat: DEFAULT_VAT,
            tax_rules: TaxRules::default(),
        }
    }
}

impl AppConfig {
    /// Read `[portfolio]` (dir, currency, vat) and `[taxes]` (threshold,
    /// rate) sections from any config port.
    pub fn from_port(config: &dyn ConfigPort) -> Self {
        let defaults = AppConfig::default();
        let default_rules = defaults.tax_rules;
        AppConfig {
            user_data_dir: config
                .get_string("portfolio", "dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.user_data_dir),
            default_currency: config
                .get_string("portfolio", "currency")
                .unwrap_or(defaults.default_currency),
            default_vat: config.get_double("portfolio", "vat", defaults.default_vat),
            tax_rules: TaxRules {
                transfer_threshold: config.get_double(
                    "taxes",
                    "threshold",
                    default_rules.transfer_threshold,
                ),
                rate: config.get_double("taxes", "rate", default_rules.rate),
            },
        }
    }
}
