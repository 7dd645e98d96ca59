//! Prometheus self-telemetry for the metrics publisher

use funchost_common::{HostError, Result};
use prometheus::{IntCounter, IntGauge, Registry};

/// Counters describing the publisher's own behavior
pub struct PublisherMetrics {
    pub ticks_total: IntCounter,
    pub idle_ticks_total: IntCounter,
    pub artifacts_written_total: IntCounter,
    pub write_errors_total: IntCounter,
    pub active_invocations: IntGauge,
}

impl PublisherMetrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ticks_total: IntCounter::new(
                "funchost_metrics_publish_ticks_total",
                "Publish timer ticks handled",
            )
            .map_err(telemetry_error)?,
            idle_ticks_total: IntCounter::new(
                "funchost_metrics_idle_ticks_total",
                "Publish ticks skipped because the interval had no activity",
            )
            .map_err(telemetry_error)?,
            artifacts_written_total: IntCounter::new(
                "funchost_metrics_artifacts_written_total",
                "Snapshot artifacts written to the sink",
            )
            .map_err(telemetry_error)?,
            write_errors_total: IntCounter::new(
                "funchost_metrics_write_errors_total",
                "Snapshot writes that failed and were dropped",
            )
            .map_err(telemetry_error)?,
            active_invocations: IntGauge::new(
                "funchost_metrics_active_invocations",
                "Invocations currently in flight",
            )
            .map_err(telemetry_error)?,
        })
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry
            .register(Box::new(self.ticks_total.clone()))
            .map_err(telemetry_error)?;
        registry
            .register(Box::new(self.idle_ticks_total.clone()))
            .map_err(telemetry_error)?;
        registry
            .register(Box::new(self.artifacts_written_total.clone()))
            .map_err(telemetry_error)?;
        registry
            .register(Box::new(self.write_errors_total.clone()))
            .map_err(telemetry_error)?;
        registry
            .register(Box::new(self.active_invocations.clone()))
            .map_err(telemetry_error)?;
        Ok(())
    }
}

fn telemetry_error(err: prometheus::Error) -> HostError {
    HostError::Telemetry(err.to_string())
}
