//! Simulated live metrics feed.
//!
//! A timer dressed as a connection: there is no transport underneath, only a
//! recurring tokio task that nudges one metric per tick and republishes the
//! list. The surface is `start`/`stop`/`subscribe` so a real push transport
//! can replace this later without consumers changing.
//!
//! Each feed is an explicit service object owning its own metrics list,
//! subscriber registry and connection flag; construct one per process (or
//! per test) and hand it around by reference.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Metric, Trend};

/// Observer of metric updates: receives the full updated list and the index
/// that changed this tick. Always read the list from the argument; the feed
/// mutates its own copy in place between deliveries.
pub type UpdateCallback = Arc<dyn Fn(&[Metric], usize) + Send + Sync>;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Bounds for the randomized delay between ticks, in milliseconds.
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    /// Largest single-tick change, as a percentage of the current value.
    pub max_drift_percent: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            min_interval_ms: 3_000,
            max_interval_ms: 5_000,
            max_drift_percent: 5.0,
        }
    }
}

struct FeedState {
    metrics: Vec<Metric>,
    subscribers: HashMap<Uuid, UpdateCallback>,
    on_update: Option<UpdateCallback>,
    connected: bool,
    timer: Option<JoinHandle<()>>,
}

pub struct LiveFeed {
    config: FeedConfig,
    state: Arc<Mutex<FeedState>>,
}

/// Handle returned by [`LiveFeed::subscribe`]; dropping it keeps the
/// subscription alive, `unsubscribe` removes it.
pub struct Subscription {
    id: Uuid,
    state: Arc<Mutex<FeedState>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        lock(&self.state).subscribers.remove(&self.id);
    }
}

fn lock(state: &Mutex<FeedState>) -> MutexGuard<'_, FeedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Applies a percentage drift to one metric, rounding the delta toward
/// zero. The trend follows the sign of the delta and stays untouched when
/// the delta rounds away; the timestamp is stamped either way.
fn apply_drift(metric: &mut Metric, percent: f64) {
    let delta = (metric.value * percent / 100.0).trunc();
    if delta > 0.0 {
        metric.trend = Trend::Up;
    } else if delta < 0.0 {
        metric.trend = Trend::Down;
    }
    metric.value += delta;
    metric.last_updated = Utc::now();
}

/// One tick: mutate, snapshot, notify. Returns false once the feed has been
/// stopped so the timer loop can wind down. An empty metrics list makes the
/// tick a silent no-op.
fn tick(config: &FeedConfig, state: &Arc<Mutex<FeedState>>) -> bool {
    let (snapshot, changed, callbacks) = {
        let mut state = lock(state);
        if !state.connected {
            return false;
        }
        if state.metrics.is_empty() {
            debug!("live feed tick skipped: no metrics loaded");
            return true;
        }

        let (index, percent) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(0..state.metrics.len()),
                rng.gen_range(-config.max_drift_percent..=config.max_drift_percent),
            )
        };
        apply_drift(&mut state.metrics[index], percent);

        let callbacks: Vec<UpdateCallback> = state
            .subscribers
            .values()
            .cloned()
            .chain(state.on_update.clone())
            .collect();
        (state.metrics.clone(), index, callbacks)
    };

    // The lock is released before delivery so observers may call back into
    // the feed (e.g. to unsubscribe) without deadlocking.
    for callback in &callbacks {
        callback(&snapshot, changed);
    }
    true
}

async fn run(config: FeedConfig, state: Arc<Mutex<FeedState>>) {
    loop {
        let delay = {
            let mut rng = rand::thread_rng();
            rng.gen_range(config.min_interval_ms..=config.max_interval_ms)
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        if !tick(&config, &state) {
            break;
        }
    }
}

impl LiveFeed {
    pub fn new(config: FeedConfig, metrics: Vec<Metric>) -> Self {
        LiveFeed {
            config,
            state: Arc::new(Mutex::new(FeedState {
                metrics,
                subscribers: HashMap::new(),
                on_update: None,
                connected: false,
                timer: None,
            })),
        }
    }

    /// Connects the feed. Idempotent: while connected, further calls return
    /// false and do not spawn a second timer or re-announce the connection.
    /// `on_connection_change(true)` fires exactly once per connection.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<U, C>(&self, on_update: U, on_connection_change: C) -> bool
    where
        U: Fn(&[Metric], usize) + Send + Sync + 'static,
        C: Fn(bool) + Send + Sync + 'static,
    {
        {
            let mut state = lock(&self.state);
            if state.connected {
                debug!("live feed already connected");
                return false;
            }
            state.connected = true;
            state.on_update = Some(Arc::new(on_update));
        }
        on_connection_change(true);

        let timer = tokio::spawn(run(self.config.clone(), Arc::clone(&self.state)));
        lock(&self.state).timer = Some(timer);
        info!("live metrics feed connected");
        true
    }

    /// Disconnects: cancels the timer, clears every subscriber and invokes
    /// no further callbacks. A stopped feed can be started again.
    pub fn stop(&self) {
        let timer = {
            let mut state = lock(&self.state);
            if !state.connected {
                return;
            }
            state.connected = false;
            state.subscribers.clear();
            state.on_update = None;
            state.timer.take()
        };
        if let Some(timer) = timer {
            timer.abort();
        }
        info!("live metrics feed disconnected");
    }

    /// Registers an observer independent of the `start` callback; any number
    /// of consumers can watch the same feed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Metric], usize) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        lock(&self.state).subscribers.insert(id, Arc::new(callback));
        Subscription {
            id,
            state: Arc::clone(&self.state),
        }
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    /// Snapshot of the current list; updates keep flowing to subscribers,
    /// so treat this as a point-in-time read.
    pub fn metrics(&self) -> Vec<Metric> {
        lock(&self.state).metrics.clone()
    }
}
