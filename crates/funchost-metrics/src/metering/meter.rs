//! Activity meter - converts invocation concurrency into billable usage
//!
//! Execution time is attributed per busy window (overlapping invocations are
//! coalesced), while execution counts are attributed per invocation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

/// Usage accumulated over one publish interval
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Billed busy time in milliseconds
    #[serde(rename = "FunctionExecutionTimeMS")]
    pub execution_time_ms: u64,

    /// Completed invocations
    #[serde(rename = "FunctionExecutionCount")]
    pub execution_count: u64,
}

impl Snapshot {
    /// True when the interval saw no activity at all
    pub fn is_idle(&self) -> bool {
        self.execution_count == 0 && self.execution_time_ms == 0
    }
}

#[derive(Debug, Default)]
struct ActivityState {
    active_count: u64,
    execution_count: u64,
    execution_time_ms: u64,
    busy_window_start: Option<Instant>,
}

/// Concurrency-safe accumulator of invocation activity
#[derive(Debug)]
pub struct ActivityMeter {
    state: Mutex<ActivityState>,
    /// Flipped once the instance is specialized; inert until then
    enabled: AtomicBool,
    minimum_activity_interval_ms: u64,
}

impl ActivityMeter {
    /// Create a disabled meter with the given billing floor
    pub fn new(minimum_activity_interval: Duration) -> Self {
        Self {
            state: Mutex::new(ActivityState::default()),
            enabled: AtomicBool::new(false),
            minimum_activity_interval_ms: duration_ms(minimum_activity_interval),
        }
    }

    /// Start accepting activity. Irreversible.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Record the start of an invocation
    pub fn on_function_started(&self) {
        if !self.is_enabled() {
            return;
        }

        let mut state = self.state.lock();
        if state.active_count == 0 {
            // idle -> busy
            state.busy_window_start = Some(Instant::now());
        }
        state.active_count += 1;
    }

    /// Record the completion of an invocation
    ///
    /// An unbalanced completion (no active invocation) is clamped rather than
    /// rejected. It still closes a busy window, measured from the last window
    /// start if there is one, so at least the billing floor is attributed.
    pub fn on_function_completed(&self) {
        if !self.is_enabled() {
            return;
        }

        let mut state = self.state.lock();
        state.active_count = state.active_count.saturating_sub(1);

        if state.active_count == 0 {
            // busy -> idle, bill the window with the floor applied
            let elapsed_ms = state
                .busy_window_start
                .map(|start| duration_ms(start.elapsed()))
                .unwrap_or(0);
            let billed_ms = elapsed_ms.max(self.minimum_activity_interval_ms);
            state.execution_time_ms = state.execution_time_ms.saturating_add(billed_ms);
        }

        state.execution_count += 1;
    }

    /// Atomically capture the accumulated usage and reset it to zero
    pub fn drain_and_reset(&self) -> Snapshot {
        let snapshot = {
            let mut state = self.state.lock();
            let snapshot = Snapshot {
                execution_time_ms: state.execution_time_ms,
                execution_count: state.execution_count,
            };
            state.execution_time_ms = 0;
            state.execution_count = 0;
            snapshot
        };

        if !snapshot.is_idle() {
            debug!(
                execution_count = snapshot.execution_count,
                execution_time_ms = snapshot.execution_time_ms,
                "Drained activity"
            );
        }
        snapshot
    }

    /// Invocations currently in flight
    pub fn active_count(&self) -> u64 {
        self.state.lock().active_count
    }

    pub fn minimum_activity_interval(&self) -> Duration {
        Duration::from_millis(self.minimum_activity_interval_ms)
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
