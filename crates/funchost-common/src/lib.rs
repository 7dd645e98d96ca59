//! # Funchost Common
//!
//! Shared types and errors for the request-serving host of the function platform.
//!
//! - [`HostError`]: unified error type
//! - [`LifecycleState`]: Standby / Specialized lifecycle of a host instance
//! - [`FunctionActivity`]: detailed per-invocation activity event

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{HostError, Result};
pub use types::{ExecutionStage, FunctionActivity, LifecycleState};

/// Funchost version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default interval between metrics publishes
pub const DEFAULT_PUBLISH_INTERVAL_MS: u64 = 5000;

/// Default cold start grace period before the first publish
pub const DEFAULT_INITIAL_PUBLISH_DELAY_MS: u64 = 5000;

/// Billing floor applied to every busy window
pub const DEFAULT_MINIMUM_ACTIVITY_INTERVAL_MS: u64 = 100;
