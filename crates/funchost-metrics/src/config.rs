//! Metrics publisher configuration

use std::path::PathBuf;
use std::time::Duration;

use funchost_common::{
    HostError, Result, DEFAULT_INITIAL_PUBLISH_DELAY_MS, DEFAULT_MINIMUM_ACTIVITY_INTERVAL_MS,
    DEFAULT_PUBLISH_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};

/// Prefix of the environment variables read by [`MetricsPublisherOptions::from_env`]
pub const ENV_PREFIX: &str = "FUNCTIONS_METRICS";

/// Full name of the mandatory publish path variable
pub const PUBLISH_PATH_VAR: &str = "FUNCTIONS_METRICS_PUBLISH_PATH";

/// Deployment stamp the instance runs on
pub const STAMP_NAME_VAR: &str = "WEBSITE_HOME_STAMPNAME";

/// Metrics publisher options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsPublisherOptions {
    /// Directory that receives one snapshot file per non-idle interval
    #[serde(default)]
    pub publish_path: String,
    /// Interval between publishes
    pub publish_interval_ms: u64,
    /// Delay before the first publish, excluding cold start work from metering
    pub initial_publish_delay_ms: u64,
    /// Billing floor for a single busy window
    pub minimum_activity_interval_ms: u64,
    /// Deployment stamp, informational only
    #[serde(default)]
    pub stamp_name: Option<String>,
}

impl Default for MetricsPublisherOptions {
    fn default() -> Self {
        Self {
            publish_path: String::new(),
            publish_interval_ms: DEFAULT_PUBLISH_INTERVAL_MS,
            initial_publish_delay_ms: DEFAULT_INITIAL_PUBLISH_DELAY_MS,
            minimum_activity_interval_ms: DEFAULT_MINIMUM_ACTIVITY_INTERVAL_MS,
            stamp_name: None,
        }
    }
}

impl MetricsPublisherOptions {
    /// Options with defaults and the given publish path
    pub fn with_publish_path(path: impl Into<String>) -> Self {
        Self {
            publish_path: path.into(),
            ..Self::default()
        }
    }

    /// Load options from the environment (and a `.env` file, if present)
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = Self::defaults_builder()?.add_source(
            config::Environment::with_prefix(ENV_PREFIX).try_parsing(true),
        );

        if let Ok(stamp) = std::env::var(STAMP_NAME_VAR) {
            builder = builder
                .set_override("stamp_name", stamp)
                .map_err(config_error)?;
        }

        let cfg = builder.build().map_err(config_error)?;
        Self::from_config(cfg)
    }

    /// Deserialize options from an already layered configuration
    pub fn from_config(cfg: config::Config) -> Result<Self> {
        let options: Self = cfg.try_deserialize().map_err(config_error)?;
        options.validate()?;
        Ok(options)
    }

    /// Configuration builder seeded with the default values
    pub fn defaults_builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        config::Config::builder()
            .set_default("publish_interval_ms", DEFAULT_PUBLISH_INTERVAL_MS as i64)
            .and_then(|b| {
                b.set_default("initial_publish_delay_ms", DEFAULT_INITIAL_PUBLISH_DELAY_MS as i64)
            })
            .and_then(|b| {
                b.set_default(
                    "minimum_activity_interval_ms",
                    DEFAULT_MINIMUM_ACTIVITY_INTERVAL_MS as i64,
                )
            })
            .map_err(config_error)
    }

    /// Reject options the publisher cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.publish_path.trim().is_empty() {
            return Err(HostError::Config(format!(
                "{} not configured",
                PUBLISH_PATH_VAR
            )));
        }
        if self.publish_interval_ms == 0 {
            return Err(HostError::Config(
                "publish_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn publish_path(&self) -> PathBuf {
        PathBuf::from(&self.publish_path)
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    pub fn initial_publish_delay(&self) -> Duration {
        Duration::from_millis(self.initial_publish_delay_ms)
    }

    pub fn minimum_activity_interval(&self) -> Duration {
        Duration::from_millis(self.minimum_activity_interval_ms)
    }
}

fn config_error(err: config::ConfigError) -> HostError {
    HostError::Config(err.to_string())
}
