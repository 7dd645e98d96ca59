//! Cross-cutting host types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a host instance.
///
/// A placeholder instance starts in `Standby` and is bound to a tenant's
/// function app exactly once. There is no path back to `Standby`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Generic placeholder, not yet bound to a tenant
    Standby,
    /// Bound to a tenant's function app
    Specialized,
}

impl LifecycleState {
    pub fn is_specialized(&self) -> bool {
        matches!(self, LifecycleState::Specialized)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Standby => write!(f, "standby"),
            LifecycleState::Specialized => write!(f, "specialized"),
        }
    }
}

/// Stage an invocation reported in an activity event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStage {
    Started,
    InProgress,
    Finished,
    Failed,
}

/// Detailed per-invocation activity event emitted by the serving layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionActivity {
    /// Function name
    pub function_name: String,
    /// Invocation ID
    pub invocation_id: String,
    /// Concurrency level observed when the event was raised
    pub concurrency: u32,
    /// Stage of the invocation
    pub execution_stage: ExecutionStage,
    /// Whether the invocation succeeded (meaningful once finished)
    pub success: bool,
    /// Execution time so far in milliseconds
    pub execution_time_ms: u64,
    /// Execution ID
    pub execution_id: String,
    /// When the event was raised
    pub event_timestamp: DateTime<Utc>,
    /// When the function started
    pub function_start_time: DateTime<Utc>,
}

impl FunctionActivity {
    /// Create a started-stage event for an invocation
    pub fn started(function_name: impl Into<String>, invocation_id: impl Into<String>) -> Self {
        let now = Utc::now();
        let invocation_id = invocation_id.into();
        Self {
            function_name: function_name.into(),
            execution_id: invocation_id.clone(),
            invocation_id,
            concurrency: 1,
            execution_stage: ExecutionStage::Started,
            success: false,
            execution_time_ms: 0,
            event_timestamp: now,
            function_start_time: now,
        }
    }

    /// Set the stage
    pub fn with_stage(mut self, stage: ExecutionStage) -> Self {
        self.execution_stage = stage;
        self
    }
}
