//! Configuration parsing for the financial core.
//!
//! Deployment configuration lives in a TOML document with a `[currency]`
//! section (which currency balances are denominated in) and a `[fines]`
//! section (debt threshold and fine tier parameters). Both sections are
//! optional and default to the production values used by the organization:
//! EUR with two minor-unit digits, a five-euro debt threshold, a fine of
//! 20% of the deficit capped at five euros.
//!
//! ```toml
//! [currency]
//! code = "EUR"
//! exponent = 2
//!
//! [fines]
//! debt_threshold = 500
//! deficit_percent = 20
//! maximum = 500
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fines::FinePolicy;
use crate::money::{Currency, Money};

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file")]
    Io(#[from] std::io::Error),

    /// The TOML document could not be parsed.
    #[error("failed to parse configuration")]
    Parse(#[from] toml::de::Error),

    /// The document parsed but a field is out of range.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TallyConfig {
    /// Currency all balances are denominated in.
    #[serde(default)]
    pub currency: CurrencyConfig,

    /// Debt threshold and fine tier parameters.
    #[serde(default)]
    pub fines: FineConfig,
}

impl TallyConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML and
    /// [`ConfigError::Validation`] on out-of-range fields.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if serialization fails, which
    /// only happens for non-string-representable values.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Validation(e.to_string()))
    }

    /// Checks field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.code.is_empty() {
            return Err(ConfigError::Validation(
                "currency.code must not be empty".to_string(),
            ));
        }
        if self.currency.exponent > 9 {
            return Err(ConfigError::Validation(format!(
                "currency.exponent must be at most 9, got {}",
                self.currency.exponent
            )));
        }
        if self.fines.deficit_percent > 100 {
            return Err(ConfigError::Validation(format!(
                "fines.deficit_percent must be at most 100, got {}",
                self.fines.deficit_percent
            )));
        }
        if self.fines.debt_threshold == 0 {
            return Err(ConfigError::Validation(
                "fines.debt_threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured currency.
    #[must_use]
    pub fn currency(&self) -> Currency {
        Currency::new(self.currency.code.clone(), self.currency.exponent)
    }

    /// The configured fine tier policy.
    #[must_use]
    pub fn fine_policy(&self) -> FinePolicy {
        let currency = self.currency();
        FinePolicy::new(
            Money::new(
                i64::try_from(self.fines.debt_threshold).unwrap_or(i64::MAX),
                currency.clone(),
            ),
            self.fines.deficit_percent,
            Money::new(
                i64::try_from(self.fines.maximum).unwrap_or(i64::MAX),
                currency,
            ),
        )
    }
}

/// The `[currency]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrencyConfig {
    /// Currency code, e.g. `"EUR"`.
    pub code: String,
    /// Minor-unit digits per major unit.
    pub exponent: u32,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            code: "EUR".to_string(),
            exponent: 2,
        }
    }
}

/// The `[fines]` section, all amounts in minor units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FineConfig {
    /// Debt threshold: users are fine-eligible below minus this amount.
    pub debt_threshold: u64,
    /// Percentage of the deficit charged as fine.
    pub deficit_percent: u32,
    /// Upper bound on a single fine.
    pub maximum: u64,
}

impl Default for FineConfig {
    fn default() -> Self {
        Self {
            debt_threshold: 500,
            deficit_percent: 20,
            maximum: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TallyConfig::default();
        assert_eq!(config.currency.code, "EUR");
        assert_eq!(config.currency.exponent, 2);
        assert_eq!(config.fines.debt_threshold, 500);
        assert_eq!(config.fines.deficit_percent, 20);
        assert_eq!(config.fines.maximum, 500);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_toml_full() {
        let config = TallyConfig::from_toml(
            r#"
            [currency]
            code = "DKK"
            exponent = 2

            [fines]
            debt_threshold = 1000
            deficit_percent = 10
            maximum = 2500
            "#,
        )
        .unwrap();
        assert_eq!(config.currency().code, "DKK");
        assert_eq!(config.fines.debt_threshold, 1000);
    }

    #[test]
    fn test_from_toml_empty_uses_defaults() {
        let config = TallyConfig::from_toml("").unwrap();
        assert_eq!(config, TallyConfig::default());
    }

    #[test]
    fn test_round_trip() {
        let config = TallyConfig::default();
        let rendered = config.to_toml().unwrap();
        let reparsed = TallyConfig::from_toml(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_rejects_percent_over_100() {
        let result = TallyConfig::from_toml(
            r"
            [fines]
            debt_threshold = 500
            deficit_percent = 150
            maximum = 500
            ",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let result = TallyConfig::from_toml(
            r"
            [fines]
            debt_threshold = 0
            deficit_percent = 20
            maximum = 500
            ",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let result = TallyConfig::from_toml("[currency\ncode = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
