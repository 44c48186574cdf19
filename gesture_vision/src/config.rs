// THEORY:
// Configuration for the detection engine. Like the rest of the engine, it is a
// plain data struct with sensible defaults; the only behavior here is loading
// (from a JSON file or from `GV_*` environment variables) and validation.

use crate::error::{DetectionError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CYCLE_PERIOD_MS: u64 = 100;
const DEFAULT_REPORT_THRESHOLD: f32 = 0.9;
const DEFAULT_NO_CURL_MAX_DEG: f32 = 60.0;
const DEFAULT_HALF_CURL_MAX_DEG: f32 = 150.0;

/// Thresholds used to bucket a finger's total flexion into a curl state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Total flexion (degrees, summed over the finger's joints) below which a
    /// finger counts as straight.
    pub no_curl_max_deg: f32,
    /// Total flexion below which a finger counts as half curled. Anything at or
    /// above this is a full curl.
    pub half_curl_max_deg: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            no_curl_max_deg: DEFAULT_NO_CURL_MAX_DEG,
            half_curl_max_deg: DEFAULT_HALF_CURL_MAX_DEG,
        }
    }
}

/// Configuration for the `DetectionPipeline`, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Period of the detection loop in milliseconds.
    pub cycle_period_ms: u64,
    /// A gesture is only reported when its score is strictly above this value.
    pub report_threshold: f32,
    pub classifier: ClassifierConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cycle_period_ms: DEFAULT_CYCLE_PERIOD_MS,
            report_threshold: DEFAULT_REPORT_THRESHOLD,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl DetectorConfig {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }

    /// Reads a JSON config file. Missing fields take their default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `GV_CYCLE_PERIOD_MS` and `GV_REPORT_THRESHOLD` on top of `self`.
    /// Unset or empty variables are ignored; unparsable ones are an error.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(raw) = env_value("GV_CYCLE_PERIOD_MS") {
            self.cycle_period_ms = raw.parse().map_err(|_| {
                DetectionError::InvalidConfig(format!("GV_CYCLE_PERIOD_MS is not an integer: {raw}"))
            })?;
        }
        if let Some(raw) = env_value("GV_REPORT_THRESHOLD") {
            self.report_threshold = raw.parse().map_err(|_| {
                DetectionError::InvalidConfig(format!("GV_REPORT_THRESHOLD is not a number: {raw}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn validate(&self) -> Result<()> {
        if self.cycle_period_ms == 0 {
            return Err(DetectionError::InvalidConfig("cycle period must be non-zero".into()));
        }
        if !(0.0..=1.0).contains(&self.report_threshold) {
            return Err(DetectionError::InvalidConfig(format!(
                "report threshold must be within [0, 1], got {}",
                self.report_threshold
            )));
        }
        let c = &self.classifier;
        if !(c.no_curl_max_deg > 0.0 && c.no_curl_max_deg < c.half_curl_max_deg) {
            return Err(DetectionError::InvalidConfig(format!(
                "curl limits must satisfy 0 < no_curl ({}) < half_curl ({})",
                c.no_curl_max_deg, c.half_curl_max_deg
            )));
        }
        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_loop() {
        let config = DetectorConfig::default();
        assert_eq!(config.cycle_period(), Duration::from_millis(100));
        assert_eq!(config.report_threshold, 0.9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: DetectorConfig = serde_json::from_str(r#"{ "cycle_period_ms": 40 }"#).unwrap();
        assert_eq!(config.cycle_period_ms, 40);
        assert_eq!(config.report_threshold, 0.9);
        assert_eq!(config.classifier, ClassifierConfig::default());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = DetectorConfig::default();
        config.cycle_period_ms = 0;
        assert!(config.validate().is_err());

        let mut config = DetectorConfig::default();
        config.report_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = DetectorConfig::default();
        config.classifier.no_curl_max_deg = 200.0;
        assert!(config.validate().is_err());
    }
}
