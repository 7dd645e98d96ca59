//! Metering module - invocation activity metering for usage-based scaling and billing
//!
//! This module provides:
//! - ActivityMeter: busy-window / invocation-count accumulator
//! - PeriodicPublisher: timer-driven drain of the meter into the sink
//! - FileSink: flat directory of immutable snapshot artifacts
//! - LifecycleGate: activates metering once the instance is specialized

pub mod lifecycle;
pub mod meter;
pub mod publisher;
pub mod sink;
pub mod telemetry;

use std::sync::Arc;

use funchost_common::{FunctionActivity, Result};
use tracing::info;

pub use lifecycle::{LifecycleGate, LifecycleSubscription, StandbyMonitor};
pub use meter::{ActivityMeter, Snapshot};
pub use publisher::PeriodicPublisher;
pub use sink::{FileSink, SnapshotSink};
pub use telemetry::PublisherMetrics;

use crate::config::MetricsPublisherOptions;

/// Invocation lifecycle hooks raised by the serving layer
pub trait MetricsPublisher: Send + Sync {
    fn on_function_started(&self, function_name: &str, invocation_id: &str);

    fn on_function_completed(&self, function_name: &str, invocation_id: &str);

    /// Detailed activity events. Implementations may ignore them.
    fn add_function_execution_activity(&self, activity: &FunctionActivity);
}

/// Metrics publisher for a function host instance
pub struct HostMetricsPublisher {
    meter: Arc<ActivityMeter>,
    publisher: Arc<PeriodicPublisher>,
    metrics: Arc<PublisherMetrics>,
    gate: LifecycleGate,
}

impl HostMetricsPublisher {
    /// Build the publisher writing to `options.publish_path`.
    ///
    /// Must be called within a tokio runtime. Fails if the options are invalid.
    pub fn new(options: &MetricsPublisherOptions, monitor: &StandbyMonitor) -> Result<Self> {
        let sink = Arc::new(FileSink::new(options.publish_path()));
        Self::with_sink(options, monitor, sink)
    }

    /// Build the publisher with an alternative sink
    pub fn with_sink(
        options: &MetricsPublisherOptions,
        monitor: &StandbyMonitor,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<Self> {
        options.validate()?;

        let meter = Arc::new(ActivityMeter::new(options.minimum_activity_interval()));
        let metrics = Arc::new(PublisherMetrics::new()?);
        let publisher = Arc::new(PeriodicPublisher::new(
            meter.clone(),
            sink,
            metrics.clone(),
            options.initial_publish_delay(),
            options.publish_interval(),
        )?);

        info!(
            publish_path = %options.publish_path,
            stamp = options.stamp_name.as_deref().unwrap_or("unknown"),
            lifecycle = %monitor.current(),
            "Metrics publisher configured"
        );

        let gate = LifecycleGate::attach(monitor, publisher.clone());

        Ok(Self {
            meter,
            publisher,
            metrics,
            gate,
        })
    }

    /// Report the start of an invocation now and its completion when the guard drops
    pub fn track<'a>(&'a self, function_name: &'a str, invocation_id: &'a str) -> InvocationGuard<'a> {
        self.on_function_started(function_name, invocation_id);
        InvocationGuard {
            publisher: self,
            function_name,
            invocation_id,
        }
    }

    pub fn meter(&self) -> &Arc<ActivityMeter> {
        &self.meter
    }

    pub fn publisher(&self) -> &Arc<PeriodicPublisher> {
        &self.publisher
    }

    pub fn metrics(&self) -> &Arc<PublisherMetrics> {
        &self.metrics
    }

    /// Whether the instance has been specialized and metering is active
    pub fn is_active(&self) -> bool {
        self.gate.is_fired() && self.meter.is_enabled()
    }

    /// Cancel the timer and the pending lifecycle subscription
    pub fn stop(&self) {
        self.gate.detach();
        self.publisher.stop();
    }

    /// Stop and wait for an in-flight publish to finish
    pub async fn shutdown(&self) {
        self.gate.detach();
        self.publisher.shutdown().await;
    }
}

impl MetricsPublisher for HostMetricsPublisher {
    fn on_function_started(&self, _function_name: &str, _invocation_id: &str) {
        self.meter.on_function_started();
    }

    fn on_function_completed(&self, _function_name: &str, _invocation_id: &str) {
        self.meter.on_function_completed();
    }

    fn add_function_execution_activity(&self, _activity: &FunctionActivity) {
        // only started/completed edges are metered
    }
}

impl Drop for HostMetricsPublisher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Completes a tracked invocation on drop
pub struct InvocationGuard<'a> {
    publisher: &'a HostMetricsPublisher,
    function_name: &'a str,
    invocation_id: &'a str,
}

impl Drop for InvocationGuard<'_> {
    fn drop(&mut self) {
        self.publisher
            .on_function_completed(self.function_name, self.invocation_id);
    }
}
