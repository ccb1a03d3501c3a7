use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::predict::{
    ObserverLocation, PredictionSettings, TleFetcher, CELESTRAK_GP_TEMPLATE,
    DEFAULT_MAX_TRACK_POINTS, DEFAULT_STEP_SECONDS,
};
use crate::report::SatelliteTarget;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub tle_folder: PathBuf,
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
    #[serde(default)]
    pub satellites: Vec<SatelliteTarget>,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub tle_fetch: TleFetchConfig,
}

/// Where fresh element sets are downloaded from before predicting
#[derive(Debug, Clone, Deserialize)]
pub struct TleFetchConfig {
    #[serde(default = "default_fetch_enabled")]
    pub enabled: bool,
    /// URL templates tried in order; `{norad}` is replaced by the catalog number
    #[serde(default = "default_fetch_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_fetch_timeout")]
    pub timeout: String,
}

impl Default for TleFetchConfig {
    fn default() -> Self {
        Self {
            enabled: default_fetch_enabled(),
            sources: default_fetch_sources(),
            timeout: default_fetch_timeout(),
        }
    }
}

fn default_fetch_enabled() -> bool {
    true
}

fn default_fetch_sources() -> Vec<String> {
    vec![CELESTRAK_GP_TEMPLATE.to_string()]
}

fn default_fetch_timeout() -> String {
    "10s".to_string()
}

impl TleFetchConfig {
    /// `None` when downloading is switched off
    pub fn fetcher(&self) -> Result<Option<TleFetcher>, ConfigError> {
        if !self.enabled {
            return Ok(None);
        }
        let timeout = humantime::parse_duration(self.timeout.trim()).map_err(|e| {
            ConfigError::Invalid(format!("tle_fetch.timeout '{}': {}", self.timeout, e))
        })?;
        TleFetcher::new(self.sources.clone(), timeout)
            .map(Some)
            .map_err(|e| ConfigError::Invalid(format!("tle_fetch: {}", e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// A fixed, named observing site
#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    pub slug: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub alt_m: f64,
}

impl LocationConfig {
    pub fn observer(&self) -> Result<ObserverLocation, ConfigError> {
        ObserverLocation::new(self.lat, self.lon, Some(self.alt_m))
            .map_err(|e| ConfigError::Invalid(format!("location '{}': {}", self.slug, e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    #[serde(default = "default_days")]
    pub days: i64,
    /// Longest window a request may ask for
    #[serde(default = "default_max_days")]
    pub max_days: i64,
    /// Scan step as a human-readable duration, e.g. `60s`
    #[serde(default = "default_step")]
    pub step: String,
    #[serde(default = "default_max_track_points")]
    pub max_track_points: usize,
    #[serde(default)]
    pub include_truncated_passes: bool,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            max_days: default_max_days(),
            step: default_step(),
            max_track_points: default_max_track_points(),
            include_truncated_passes: false,
        }
    }
}

fn default_days() -> i64 {
    7
}

fn default_max_days() -> i64 {
    14
}

fn default_step() -> String {
    format!("{}s", DEFAULT_STEP_SECONDS)
}

fn default_max_track_points() -> usize {
    DEFAULT_MAX_TRACK_POINTS
}

impl PredictionConfig {
    pub fn settings(&self) -> Result<PredictionSettings, ConfigError> {
        let step = humantime::parse_duration(self.step.trim())
            .map_err(|e| ConfigError::Invalid(format!("prediction.step '{}': {}", self.step, e)))
            .and_then(|d| {
                chrono::Duration::from_std(d)
                    .map_err(|e| ConfigError::Invalid(format!("prediction.step: {}", e)))
            })?;

        let settings = PredictionSettings {
            step,
            max_track_points: self.max_track_points,
            include_truncated_passes: self.include_truncated_passes,
        };
        settings
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("prediction: {}", e)))?;
        Ok(settings)
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut slugs = HashSet::new();
        for location in &self.locations {
            if !slugs.insert(location.slug.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate location slug '{}'",
                    location.slug
                )));
            }
            location.observer()?;
        }
        if self.prediction.days <= 0 {
            return Err(ConfigError::Invalid(format!(
                "prediction.days must be positive, got {}",
                self.prediction.days
            )));
        }
        if self.prediction.days > self.prediction.max_days {
            return Err(ConfigError::Invalid(format!(
                "prediction.days ({}) exceeds prediction.max_days ({})",
                self.prediction.days, self.prediction.max_days
            )));
        }
        self.prediction.settings()?;
        if self.tle_fetch.enabled {
            if self.tle_fetch.sources.is_empty() {
                return Err(ConfigError::Invalid("tle_fetch.sources is empty".into()));
            }
            humantime::parse_duration(self.tle_fetch.timeout.trim()).map_err(|e| {
                ConfigError::Invalid(format!("tle_fetch.timeout '{}': {}", self.tle_fetch.timeout, e))
            })?;
        }
        Ok(())
    }

    pub fn find_location(&self, slug: &str) -> Option<&LocationConfig> {
        self.locations.iter().find(|l| l.slug == slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
tle_folder: ./tle
locations:
  - slug: london
    name: London
    lat: 51.5074
    lon: -0.1278
  - slug: edinburgh
    name: Edinburgh
    lat: 55.9533
    lon: -3.1883
    alt_m: 47
satellites:
  - norad_id: 57166
    name: Meteor-M N2-3
    frequency: 137.9 MHz LRPT
  - norad_id: 59051
    name: Meteor-M N2-4
prediction:
  step: 30s
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.locations[0].alt_m, 0.0);
        assert_eq!(config.satellites[1].frequency, None);
        assert_eq!(config.prediction.days, 7);
        assert_eq!(config.prediction.max_days, 14);
        assert_eq!(config.web.bind, "0.0.0.0:8080");
        assert!(config.tle_fetch.enabled);
        assert_eq!(config.tle_fetch.sources, vec![CELESTRAK_GP_TEMPLATE.to_string()]);

        let settings = config.prediction.settings().unwrap();
        assert_eq!(settings.step, chrono::Duration::seconds(30));
        assert_eq!(settings.max_track_points, 30);
        assert!(!settings.include_truncated_passes);

        assert_eq!(config.find_location("edinburgh").unwrap().alt_m, 47.0);
        assert!(config.find_location("paris").is_none());
    }

    #[test]
    fn example_config_is_valid() {
        let config = Config::from_yaml(include_str!("../../config.example.yaml")).unwrap();
        assert_eq!(config.satellites.len(), 2);
        assert!(config.locations.iter().all(|l| l.observer().is_ok()));
    }

    #[test]
    fn rejects_bad_step() {
        let yaml = "tle_folder: ./tle\nprediction:\n  step: soon\n";
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_duplicate_slugs_and_bad_coordinates() {
        let duplicate = r#"
tle_folder: ./tle
locations:
  - { slug: a, name: A, lat: 1, lon: 1 }
  - { slug: a, name: B, lat: 2, lon: 2 }
"#;
        assert!(matches!(
            Config::from_yaml(duplicate),
            Err(ConfigError::Invalid(_))
        ));

        let off_planet = "tle_folder: ./tle\nlocations:\n  - { slug: x, name: X, lat: 95, lon: 0 }\n";
        assert!(matches!(
            Config::from_yaml(off_planet),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn default_window_must_fit_the_limit() {
        let yaml = "tle_folder: ./tle\nprediction:\n  days: 20\n";
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));

        let raised = "tle_folder: ./tle\nprediction:\n  days: 20\n  max_days: 30\n";
        assert_eq!(Config::from_yaml(raised).unwrap().prediction.days, 20);
    }

    #[test]
    fn tle_fetch_section() {
        let off = "tle_folder: ./tle\ntle_fetch:\n  enabled: false\n";
        let config = Config::from_yaml(off).unwrap();
        assert!(config.tle_fetch.fetcher().unwrap().is_none());

        let mirrored = r#"
tle_folder: ./tle
tle_fetch:
  sources:
    - https://celestrak.org/NORAD/elements/gp.php?CATNR={norad}&FORMAT=TLE
    - https://mirror.example/gp/{norad}.tle
  timeout: 3s
"#;
        let config = Config::from_yaml(mirrored).unwrap();
        assert_eq!(config.tle_fetch.sources.len(), 2);

        let bad_timeout = "tle_folder: ./tle\ntle_fetch:\n  timeout: eventually\n";
        assert!(matches!(
            Config::from_yaml(bad_timeout),
            Err(ConfigError::Invalid(_))
        ));

        let no_sources = "tle_folder: ./tle\ntle_fetch:\n  sources: []\n";
        assert!(matches!(
            Config::from_yaml(no_sources),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn missing_tle_folder_is_a_yaml_error() {
        assert!(matches!(
            Config::from_yaml("locations: []\n"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
