//! Structured logging setup for the telemetry binary.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown level name.
    pub fn validate(&self) -> Result<()> {
        if !LEVELS.contains(&self.level.to_lowercase().as_str()) {
            bail!(
                "Unknown log level '{}'; expected one of {}",
                self.level,
                LEVELS.join(", ")
            );
        }
        Ok(())
    }

    /// Level after applying `-v` flags: each one raises verbosity a step.
    pub fn effective_level(&self, verbose: u8) -> &'static str {
        let base = LEVELS
            .iter()
            .position(|level| level.eq_ignore_ascii_case(&self.level))
            .unwrap_or(2);
        let index = base.saturating_add(usize::from(verbose)).min(LEVELS.len().saturating_sub(1));
        LEVELS.get(index).copied().unwrap_or("trace")
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig, verbose: u8) -> Result<()> {
    let level = config.effective_level(verbose);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = if config.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(level, json = config.json, "Logging initialized");
    Ok(())
}
