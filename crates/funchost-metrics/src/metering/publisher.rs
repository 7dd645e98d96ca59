//! Periodic publisher - drains the activity meter on a timer and hands
//! non-idle snapshots to the sink
//!
//! Publishing is best effort: a failed write is logged and the interval's data
//! is dropped. Nothing here ever propagates to the request-serving path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use funchost_common::{HostError, Result};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use super::meter::{duration_ms, ActivityMeter};
use super::sink::SnapshotSink;
use super::telemetry::PublisherMetrics;

/// Timer-driven consumer of the activity meter
pub struct PeriodicPublisher {
    meter: Arc<ActivityMeter>,
    sink: Arc<dyn SnapshotSink>,
    metrics: Arc<PublisherMetrics>,
    initial_delay: Duration,
    interval: Duration,
    /// Runtime the timer task runs on, so `start` works from any thread
    runtime: Handle,
    started: AtomicBool,
    stopped: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicPublisher {
    /// Create a publisher bound to the current tokio runtime
    pub fn new(
        meter: Arc<ActivityMeter>,
        sink: Arc<dyn SnapshotSink>,
        metrics: Arc<PublisherMetrics>,
        initial_delay: Duration,
        interval: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(HostError::Config(
                "publish interval must be greater than zero".into(),
            ));
        }
        let runtime = Handle::try_current().map_err(|e| HostError::Runtime(e.to_string()))?;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            meter,
            sink,
            metrics,
            initial_delay,
            interval,
            runtime,
            started: AtomicBool::new(false),
            stopped: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            task: Mutex::new(None),
        })
    }

    /// Enable metering and schedule the publish timer.
    ///
    /// Idempotent, and a no-op once the publisher has been stopped.
    pub fn start(&self) {
        if self.stopped.load(Ordering::Acquire) {
            debug!("Metrics publisher already stopped, ignoring start");
            return;
        }
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.meter.enable();

        let meter = self.meter.clone();
        let sink = self.sink.clone();
        let metrics = self.metrics.clone();
        let stopped = self.stopped.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let initial_delay = self.initial_delay;
        let interval = self.interval;

        let handle = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + initial_delay, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if stopped.load(Ordering::Acquire) {
                            break;
                        }
                        // sink I/O blocks, keep it off the runtime workers
                        let (meter, sink, metrics) = (meter.clone(), sink.clone(), metrics.clone());
                        let tick = tokio::task::spawn_blocking(move || {
                            publish_tick(&meter, sink.as_ref(), &metrics);
                        });
                        if let Err(e) = tick.await {
                            error!(error = %e, "Metrics publish tick failed");
                        }
                    }
                }
            }
            debug!("Metrics publisher timer exited");
        });
        *self.task.lock() = Some(handle);

        info!(
            initial_delay_ms = duration_ms(initial_delay),
            interval_ms = duration_ms(interval),
            "Starting metrics publisher"
        );
    }

    /// Drain the meter and publish the snapshot unless the interval was idle.
    ///
    /// Returns the artifact id when one was written.
    pub fn on_tick(&self) -> Option<String> {
        publish_tick(&self.meter, self.sink.as_ref(), &self.metrics)
    }

    /// Cancel the timer. No tick is scheduled afterwards; an in-flight tick is
    /// allowed to finish its write on the blocking pool.
    pub fn stop(&self) {
        self.signal_stop();
        // detach, the task observes the shutdown signal
        drop(self.task.lock().take());
    }

    /// Stop and wait for an in-flight tick to complete
    pub async fn shutdown(&self) {
        self.signal_stop();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Metrics publisher task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire) && !self.stopped.load(Ordering::Acquire)
    }

    pub fn meter(&self) -> &Arc<ActivityMeter> {
        &self.meter
    }

    fn signal_stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) && self.started.load(Ordering::Acquire) {
            info!("Stopping metrics publisher");
        }
        self.shutdown_tx.send_replace(true);
    }
}

impl Drop for PeriodicPublisher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[instrument(skip_all)]
fn publish_tick(
    meter: &ActivityMeter,
    sink: &dyn SnapshotSink,
    metrics: &PublisherMetrics,
) -> Option<String> {
    metrics.ticks_total.inc();
    metrics.active_invocations.set(meter.active_count() as i64);

    let snapshot = meter.drain_and_reset();
    if snapshot.is_idle() {
        // no activity to report
        metrics.idle_ticks_total.inc();
        return None;
    }

    let content = match serde_json::to_vec(&snapshot) {
        Ok(content) => content,
        Err(e) => {
            metrics.write_errors_total.inc();
            error!(error = %e, "Error serializing metrics snapshot");
            return None;
        }
    };

    match sink.write(&content) {
        Ok(artifact) => {
            metrics.artifacts_written_total.inc();
            debug!(
                artifact = %artifact,
                execution_count = snapshot.execution_count,
                execution_time_ms = snapshot.execution_time_ms,
                "Published metrics"
            );
            Some(artifact)
        }
        Err(e) => {
            metrics.write_errors_total.inc();
            error!(
                error = %e,
                execution_count = snapshot.execution_count,
                execution_time_ms = snapshot.execution_time_ms,
                "Error writing metrics file"
            );
            None
        }
    }
}
