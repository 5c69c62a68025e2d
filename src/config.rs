// Application configuration
// Every value has a default matching the live site, so an empty JSON object is a valid config

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub latency: LatencyConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub wizard: WizardConfig,
}

impl AppConfig {
    // Load a (possibly partial) JSON document over the defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.pricing.tax_rate) {
            return Err(ConfigError::InvalidValue(format!(
                "tax_rate must be in [0, 1), got {}",
                self.pricing.tax_rate
            )));
        }
        if self.pricing.hotel_nights == 0 {
            return Err(ConfigError::InvalidValue(
                "hotel_nights must be at least 1".to_string(),
            ));
        }
        if self.wizard.max_guests == 0 {
            return Err(ConfigError::InvalidValue(
                "max_guests must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub tax_rate: f64,
    pub hotel_nights: u32,
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: 0.18,
            hotel_nights: 2,
            currency: "INR".to_string(),
        }
    }
}

// Fixed delays standing in for network round trips
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    pub auth_ms: u64,
    pub payment_ms: u64,
}

impl LatencyConfig {
    pub fn auth(&self) -> Duration {
        Duration::from_millis(self.auth_ms)
    }

    pub fn payment(&self) -> Duration {
        Duration::from_millis(self.payment_ms)
    }
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            auth_ms: 1000,
            payment_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub session_key: String,
    pub favorites_prefix: String,
}

impl StorageConfig {
    pub fn favorites_key(&self, user_id: &str) -> String {
        format!("{}{}", self.favorites_prefix, user_id)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_key: "johar_user".to_string(),
            favorites_prefix: "favorites_".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_price_min: u32,
    pub default_price_max: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_price_min: 0,
            default_price_max: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    // When set, Details -> Payment needs both dates with check-out after check-in
    pub require_details: bool,
    pub max_guests: u8,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            require_details: false,
            max_guests: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_site() {
        let config = AppConfig::default();
        assert_eq!(config.pricing.tax_rate, 0.18);
        assert_eq!(config.pricing.hotel_nights, 2);
        assert_eq!(config.latency.payment(), Duration::from_millis(2000));
        assert_eq!(config.storage.session_key, "johar_user");
        assert_eq!(config.storage.favorites_key("42"), "favorites_42");
        assert_eq!(config.search.default_price_max, 5000);
        assert!(!config.wizard.require_details);
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config =
            AppConfig::from_json_str(r#"{"latency": {"payment_ms": 5}, "wizard": {"require_details": true}}"#)
                .unwrap();
        assert_eq!(config.latency.payment_ms, 5);
        assert_eq!(config.latency.auth_ms, 1000);
        assert!(config.wizard.require_details);
        assert_eq!(config.wizard.max_guests, 8);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let result = AppConfig::from_json_str(r#"{"pricing": {"hotel_nights": 0}}"#);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));

        let result = AppConfig::from_json_str("{not json");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
