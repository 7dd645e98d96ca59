//! # Funchost Metrics
//!
//! Activity metering and periodic usage publishing for the function host.
//!
//! Invocation start/completion events are accumulated by an [`ActivityMeter`]
//! into billed busy time and invocation counts. A [`PeriodicPublisher`] drains
//! the meter on a timer and writes one immutable JSON artifact per non-idle
//! interval, which the external scaling/billing consumer picks up:
//!
//! ```text
//! {"FunctionExecutionTimeMS":300,"FunctionExecutionCount":3}
//! ```
//!
//! Nothing is metered until the instance leaves placeholder (standby) mode.

pub mod config;
pub mod metering;

pub use config::MetricsPublisherOptions;
pub use metering::{
    ActivityMeter, FileSink, HostMetricsPublisher, InvocationGuard, LifecycleGate,
    MetricsPublisher, PeriodicPublisher, PublisherMetrics, Snapshot, SnapshotSink,
    StandbyMonitor,
};
