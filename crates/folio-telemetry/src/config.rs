//! Aggregate configuration for the telemetry runtime.
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration. Files are YAML (`.yaml`, `.yml`) or JSON (`.json`).

use std::path::Path;

use anyhow::{Context, Result, bail};
use folio_activity::{DEFAULT_ACTIVITY_LIMIT, FetcherConfig};
use folio_analytics::{BatcherConfig, TrackerConfig};
use folio_perf::MonitorConfig;
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// Default timeout for analytics POSTs.
pub const DEFAULT_TRANSPORT_TIMEOUT_MS: u64 = 10_000;

/// Analytics delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Collector URL. Batches go to the log when unset.
    pub endpoint: Option<String>,
    pub transport_timeout_ms: u64,
    pub batcher: BatcherConfig,
    pub tracker: TrackerConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            transport_timeout_ms: DEFAULT_TRANSPORT_TIMEOUT_MS,
            batcher: BatcherConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

/// Activity feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Feed API root. The feed is disabled when unset.
    pub base_url: Option<String>,
    pub fetcher: FetcherConfig,
    /// Limit used when the caller does not pass one.
    pub default_limit: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            fetcher: FetcherConfig::default(),
            default_limit: DEFAULT_ACTIVITY_LIMIT,
        }
    }
}

/// Complete telemetry configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub monitor: MonitorConfig,
    pub analytics: AnalyticsConfig,
    pub activity: ActivityConfig,
    pub logging: LoggingConfig,
}

/// Serialization format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Format implied by the file extension.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing or unsupported extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => bail!(
                "Unsupported config file extension '{other}' for {}; expected .yaml, .yml or .json",
                path.display()
            ),
        }
    }
}

impl TelemetryConfig {
    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content, format)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        tracing::debug!(path = %path.display(), ?format, "Loaded telemetry config");
        Ok(config)
    }

    /// Load `path` if given, otherwise return the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the given file cannot be loaded.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse config text without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error when the text is not valid for `format`.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).context("Invalid YAML")?,
            ConfigFormat::Json => serde_json::from_str(content).context("Invalid JSON")?,
        };
        Ok(config)
    }

    /// Render the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render(&self, format: ConfigFormat) -> Result<String> {
        let text = match format {
            ConfigFormat::Yaml => serde_yaml::to_string(self).context("Failed to render YAML")?,
            ConfigFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to render JSON")?
            }
        };
        Ok(text)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting, labelled with its section.
    pub fn validate(&self) -> Result<()> {
        self.monitor.validate().context("monitor")?;
        self.analytics
            .batcher
            .validate()
            .context("analytics.batcher")?;
        self.analytics
            .tracker
            .validate()
            .context("analytics.tracker")?;
        if self.analytics.transport_timeout_ms == 0 {
            bail!("analytics.transport_timeout_ms must be greater than 0");
        }
        self.activity
            .fetcher
            .validate()
            .context("activity.fetcher")?;
        if self.activity.default_limit == 0 {
            bail!("activity.default_limit must be greater than 0");
        }
        self.logging.validate().context("logging")?;
        Ok(())
    }

    #[must_use]
    pub fn with_analytics_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.analytics.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_activity_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.activity.base_url = Some(base_url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_format_from_extension() -> TestResult {
        assert_eq!(ConfigFormat::from_path(&PathBuf::from("a.yaml"))?, ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(&PathBuf::from("a.YML"))?, ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(&PathBuf::from("a.json"))?, ConfigFormat::Json);
        assert!(matches!(ConfigFormat::from_path(&PathBuf::from("a.toml")), Err(_)));
        assert!(matches!(ConfigFormat::from_path(&PathBuf::from("config")), Err(_)));
        Ok(())
    }

    #[test]
    fn test_defaults_are_valid() -> TestResult {
        TelemetryConfig::default().validate()?;
        Ok(())
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() -> TestResult {
        let config = TelemetryConfig::parse(
            "analytics:\n  batcher:\n    batch_size: 25\n",
            ConfigFormat::Yaml,
        )?;
        assert_eq!(config.analytics.batcher.batch_size, 25);
        assert_eq!(
            config.analytics.batcher.flush_interval_ms,
            BatcherConfig::default().flush_interval_ms
        );
        assert_eq!(config.monitor, MonitorConfig::default());
        Ok(())
    }

    #[test]
    fn test_validation_names_section() {
        let mut config = TelemetryConfig::default();
        config.activity.fetcher.retries = 0;
        let err = config.validate().err().map(|err| format!("{err:#}"));
        let message = err.unwrap_or_default();
        assert!(message.contains("activity.fetcher"), "{message}");
    }
}
