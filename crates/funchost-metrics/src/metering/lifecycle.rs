//! Lifecycle gating
//!
//! A placeholder instance is shared and generic, so it must not accumulate
//! tenant-attributable usage. Metering and publishing begin the first time the
//! instance is observed as specialized, and that transition is terminal.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use funchost_common::LifecycleState;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use super::publisher::PeriodicPublisher;

/// Callback invoked with the new lifecycle value
pub type LifecycleCallback = Arc<dyn Fn(LifecycleState) + Send + Sync>;

struct MonitorInner {
    state: RwLock<LifecycleState>,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, LifecycleCallback)>>,
}

/// Live lifecycle value with change notifications
#[derive(Clone)]
pub struct StandbyMonitor {
    inner: Arc<MonitorInner>,
}

impl StandbyMonitor {
    pub fn new(initial: LifecycleState) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                state: RwLock::new(initial),
                next_id: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn current(&self) -> LifecycleState {
        *self.inner.state.read()
    }

    /// Update the value and notify subscribers if it changed.
    ///
    /// Callbacks run on the calling thread, outside of any internal lock, so a
    /// callback may drop its own subscription.
    pub fn set(&self, state: LifecycleState) {
        {
            let mut current = self.inner.state.write();
            if *current == state {
                return;
            }
            *current = state;
        }
        debug!(state = %state, "Lifecycle changed");

        let callbacks: Vec<LifecycleCallback> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(state);
        }
    }

    /// Register a change callback; dropping the subscription unregisters it
    pub fn subscribe(&self, callback: LifecycleCallback) -> LifecycleSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push((id, callback));
        LifecycleSubscription {
            monitor: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Registration handle returned by [`StandbyMonitor::subscribe`]
pub struct LifecycleSubscription {
    monitor: Weak<MonitorInner>,
    id: u64,
}

impl Drop for LifecycleSubscription {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.upgrade() {
            monitor.subscribers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

/// Starts the publisher once, the first time the instance is specialized
pub struct LifecycleGate {
    fired: Arc<AtomicBool>,
    subscription: Arc<Mutex<Option<LifecycleSubscription>>>,
}

impl LifecycleGate {
    pub fn attach(monitor: &StandbyMonitor, publisher: Arc<PeriodicPublisher>) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let subscription: Arc<Mutex<Option<LifecycleSubscription>>> = Arc::new(Mutex::new(None));
        let gate = Self {
            fired: fired.clone(),
            subscription: subscription.clone(),
        };

        if monitor.current().is_specialized() {
            gate.fire(&publisher);
            return gate;
        }

        let weak_publisher = Arc::downgrade(&publisher);
        let callback: LifecycleCallback = {
            let fired = fired.clone();
            let slot = subscription.clone();
            Arc::new(move |state: LifecycleState| {
                if !state.is_specialized() || fired.swap(true, Ordering::AcqRel) {
                    return;
                }
                info!("Instance specialized, activating metrics publisher");
                if let Some(publisher) = weak_publisher.upgrade() {
                    publisher.start();
                }
                // one-shot: unregister
                drop(slot.lock().take());
            })
        };
        *subscription.lock() = Some(monitor.subscribe(callback));

        if fired.load(Ordering::Acquire) {
            // fired before the registration was stored
            gate.detach();
        } else if monitor.current().is_specialized() {
            // specialization landed between the first read and subscribe
            gate.fire(&publisher);
        }

        gate
    }

    fn fire(&self, publisher: &PeriodicPublisher) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            publisher.start();
        }
        self.detach();
    }

    /// Whether the specialization transition has been acted upon
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Drop the pending subscription, if any
    pub fn detach(&self) {
        drop(self.subscription.lock().take());
    }
}

impl Drop for LifecycleGate {
    fn drop(&mut self) {
        self.detach();
    }
}
