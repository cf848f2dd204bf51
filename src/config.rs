//! Analysis configuration: pricing schedule, maintenance accrual, anomaly
//! threshold and ranking size.
//!
//! Stored as a JSON object on disk. Every key is optional and falls back to
//! the defaults below:
//! ```json
//! {
//!   "anomaly_threshold": 3.0,
//!   "top_k": 3,
//!   "pricing": [
//!     { "user_type": "casual", "base_fee": 1.0, "per_minute": 0.15, "per_km": 0.10 },
//!     { "user_type": "member", "base_fee": 0.0, "per_minute": 0.08, "per_km": 0.05 }
//!   ],
//!   "peak_surcharge": { "hours": [7, 8, 17, 18], "multiplier": 1.5 },
//!   "maintenance": [
//!     { "bike_type": "classic", "per_trip": 0.10, "per_km": 0.02 },
//!     { "bike_type": "electric", "per_trip": 0.25, "per_km": 0.05 }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::AnalyticsError;
use crate::model::{BikeType, UserType};

pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 3.0;
pub const DEFAULT_TOP_K: usize = 3;

/// Fare rule for one user type: `base_fee + per_minute * min + per_km * km`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub user_type: UserType,
    #[serde(default)]
    pub base_fee: f64,
    #[serde(default)]
    pub per_minute: f64,
    #[serde(default)]
    pub per_km: f64,
}

/// Multiplier applied to fares of trips starting in one of `hours`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakSurcharge {
    pub hours: Vec<u32>,
    pub multiplier: f64,
}

/// Usage-based maintenance accrual for one bike type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRule {
    pub bike_type: BikeType,
    #[serde(default)]
    pub per_trip: f64,
    #[serde(default)]
    pub per_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub anomaly_threshold: f64,
    pub top_k: usize,
    pub pricing: Vec<PricingRule>,
    pub peak_surcharge: Option<PeakSurcharge>,
    pub maintenance: Vec<MaintenanceRule>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            pricing: vec![
                PricingRule {
                    user_type: UserType::Casual,
                    base_fee: 1.0,
                    per_minute: 0.15,
                    per_km: 0.10,
                },
                PricingRule {
                    user_type: UserType::Member,
                    base_fee: 0.0,
                    per_minute: 0.08,
                    per_km: 0.05,
                },
            ],
            peak_surcharge: None,
            maintenance: vec![
                MaintenanceRule {
                    bike_type: BikeType::Classic,
                    per_trip: 0.10,
                    per_km: 0.02,
                },
                MaintenanceRule {
                    bike_type: BikeType::Electric,
                    per_trip: 0.25,
                    per_km: 0.05,
                },
            ],
        }
    }
}

impl AnalyticsConfig {
    /// Loads the config from a JSON file at `path` and validates it.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
        let config: AnalyticsConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency. Coverage of the dataset's user and bike
    /// types is checked by the pricing stage, which knows what is present.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !self.anomaly_threshold.is_finite() || self.anomaly_threshold <= 0.0 {
            return Err(AnalyticsError::configuration(format!(
                "anomaly_threshold must be a positive number, got {}",
                self.anomaly_threshold
            )));
        }

        let mut priced = HashSet::new();
        for rule in &self.pricing {
            if !priced.insert(rule.user_type) {
                return Err(AnalyticsError::configuration(format!(
                    "duplicate pricing rule for user type '{}'",
                    rule.user_type
                )));
            }
            for (name, value) in [
                ("base_fee", rule.base_fee),
                ("per_minute", rule.per_minute),
                ("per_km", rule.per_km),
            ] {
                non_negative(&format!("pricing.{}.{name}", rule.user_type), value)?;
            }
        }

        if let Some(peak) = &self.peak_surcharge {
            if !peak.multiplier.is_finite() || peak.multiplier <= 0.0 {
                return Err(AnalyticsError::configuration(format!(
                    "peak_surcharge.multiplier must be positive, got {}",
                    peak.multiplier
                )));
            }
            if let Some(hour) = peak.hours.iter().find(|h| **h > 23) {
                return Err(AnalyticsError::configuration(format!(
                    "peak_surcharge hour {hour} is outside 0..=23"
                )));
            }
        }

        let mut maintained = HashSet::new();
        for rule in &self.maintenance {
            if !maintained.insert(rule.bike_type) {
                return Err(AnalyticsError::configuration(format!(
                    "duplicate maintenance rule for bike type '{}'",
                    rule.bike_type
                )));
            }
            let prefix = format!("maintenance.{}", rule.bike_type);
            non_negative(&format!("{prefix}.per_trip"), rule.per_trip)?;
            non_negative(&format!("{prefix}.per_km"), rule.per_km)?;
        }

        Ok(())
    }

    /// Applies command-line overrides on top of file or default values.
    pub fn with_overrides(mut self, top_k: Option<usize>, threshold: Option<f64>) -> Self {
        if let Some(k) = top_k {
            self.top_k = k;
        }
        if let Some(t) = threshold {
            self.anomaly_threshold = t;
        }
        self
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), AnalyticsError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AnalyticsError::configuration(format!(
            "{name} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_default_is_valid() {
        let config = AnalyticsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.anomaly_threshold, 3.0);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.pricing.len(), 2);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalyticsConfig = serde_json::from_str(r#"{ "top_k": 5 }"#).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.anomaly_threshold, DEFAULT_ANOMALY_THRESHOLD);
        assert_eq!(config.maintenance.len(), 2);
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let config = AnalyticsConfig::default().with_overrides(None, Some(0.0));
        assert!(matches!(config.validate(), Err(AnalyticsError::Configuration { .. })));

        let config = AnalyticsConfig::default().with_overrides(None, Some(f64::NAN));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_pricing_rule() {
        let mut config = AnalyticsConfig::default();
        let first = config.pricing[0].clone();
        config.pricing.push(first);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_rate() {
        let mut config = AnalyticsConfig::default();
        config.maintenance[0].per_km = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_peak_hours() {
        let mut config = AnalyticsConfig::default();
        config.peak_surcharge = Some(PeakSurcharge {
            hours: vec![8, 24],
            multiplier: 1.5,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = AnalyticsConfig::default().with_overrides(Some(10), None);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.anomaly_threshold, DEFAULT_ANOMALY_THRESHOLD);
    }

    #[test]
    fn test_load_from_file() {
        let path = temp_path("bikeshare_analytics_test_config.json");
        fs::write(
            &path,
            r#"{
                "anomaly_threshold": 2.5,
                "pricing": [
                    { "user_type": "member", "base_fee": 1.0, "per_minute": 0.1 },
                    { "user_type": "casual", "base_fee": 2.0, "per_minute": 0.15 }
                ],
                "peak_surcharge": { "hours": [8], "multiplier": 1.5 }
            }"#,
        )
        .unwrap();

        let config = AnalyticsConfig::load(&path).unwrap();
        assert_eq!(config.anomaly_threshold, 2.5);
        assert_eq!(config.pricing[0].per_km, 0.0);
        assert_eq!(config.peak_surcharge.as_ref().map(|p| p.multiplier), Some(1.5));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(AnalyticsConfig::load("/nonexistent/bikeshare.json").is_err());
    }
}
