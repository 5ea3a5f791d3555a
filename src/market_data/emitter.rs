//! Simulated live price feed.
//!
//! An `UpdateEmitter` is an explicitly constructed handle (clone it to share)
//! that owns at most one emission schedule. Each tick picks one id from the
//! active set and pushes a synthetic price to every subscribed listener.
//!
//! Prices are drawn from a fresh random base on every tick rather than from
//! the token's last price, so successive ticks for one token do not form a
//! continuous path.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::{EmitterConfig, MAX_BASE_PRICE};
use crate::engine::types::PriceUpdate;

pub type Listener = Arc<dyn Fn(&PriceUpdate) + Send + Sync>;

struct EmitterState {
    token_ids: Vec<String>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
    // bumped on every connect/disconnect; a schedule only emits while its
    // generation is current
    generation: u64,
    schedule: Option<JoinHandle<()>>,
    rng: StdRng,
}

struct EmitterInner {
    config: EmitterConfig,
    state: Mutex<EmitterState>,
}

impl Drop for EmitterInner {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().schedule.take() {
            handle.abort();
        }
    }
}

#[derive(Clone)]
pub struct UpdateEmitter {
    inner: Arc<EmitterInner>,
}

impl std::fmt::Debug for UpdateEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("UpdateEmitter")
            .field("token_ids", &state.token_ids.len())
            .field("listeners", &state.listeners.len())
            .field("connected", &state.schedule.is_some())
            .finish()
    }
}

impl UpdateEmitter {
    pub fn new(config: EmitterConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: EmitterConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EmitterConfig, rng: StdRng) -> Self {
        let state = EmitterState {
            token_ids: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            generation: 0,
            schedule: None,
            rng,
        };
        Self { inner: Arc::new(EmitterInner { config, state: Mutex::new(state) }) }
    }

    /// Starts emitting for `token_ids`. A running schedule is stopped first,
    /// so there is never more than one timer per emitter.
    pub fn connect(&self, token_ids: Vec<String>) {
        let mut state = self.inner.state.lock();
        if let Some(handle) = state.schedule.take() {
            debug!("Stopping previous emission schedule before reconnect");
            handle.abort();
        }
        state.generation += 1;
        state.token_ids = token_ids;
        let generation = state.generation;

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let weak = Arc::downgrade(&self.inner);
                state.schedule = Some(runtime.spawn(run_schedule(weak, generation)));
                info!(generation, ids = state.token_ids.len(), "Emitter connected");
            }
            Err(_) => {
                warn!("No tokio runtime, emitter connected without a schedule");
            }
        }
    }

    /// Stops emission. Calling it while disconnected does nothing.
    pub fn disconnect(&self) {
        let mut state = self.inner.state.lock();
        state.generation += 1;
        if let Some(handle) = state.schedule.take() {
            handle.abort();
            info!("Emitter disconnected");
        }
    }

    /// Retargets the running schedule without restarting it.
    pub fn update_token_ids(&self, token_ids: Vec<String>) {
        self.inner.state.lock().token_ids = token_ids;
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PriceUpdate) + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        state.listeners.push((id, Arc::new(listener)));
        trace!(listener = id, "Listener subscribed");
        Subscription { emitter: Arc::downgrade(&self.inner), id }
    }

    /// Emits one update immediately, outside the schedule.
    pub fn tick(&self) -> Option<PriceUpdate> {
        self.inner.emit(None)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().schedule.is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.state.lock().listeners.len()
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.inner.state.lock().token_ids.clone()
    }
}

impl EmitterInner {
    fn next_interval(&self) -> Duration {
        let range = self.config.interval_range();
        Duration::from_millis(self.state.lock().rng.gen_range(range))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    fn emit(&self, generation: Option<u64>) -> Option<PriceUpdate> {
        let (update, listeners) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if generation.is_some_and(|g| g != state.generation) {
                return None;
            }
            if state.token_ids.is_empty() {
                return None;
            }

            let idx = state.rng.gen_range(0..state.token_ids.len());
            let token_id = state.token_ids[idx].clone();
            let max_delta = self.config.max_delta_pct;
            let delta_pct = if max_delta > 0.0 {
                state.rng.gen_range(-max_delta..max_delta)
            } else {
                0.0
            };
            let base = state.rng.gen_range(0.0..MAX_BASE_PRICE);
            let update = PriceUpdate {
                token_id,
                price: base * (1.0 + delta_pct / 100.0),
                timestamp_ms: Utc::now().timestamp_millis(),
            };
            let listeners: Vec<Listener> =
                state.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
            (update, listeners)
        };

        trace!(id = %update.token_id, price = update.price, listeners = listeners.len(), "Emitting price update");
        metrics::counter!("tokenboard_ticks_emitted").increment(1);
        for listener in &listeners {
            listener(&update);
        }
        Some(update)
    }
}

async fn run_schedule(inner: Weak<EmitterInner>, generation: u64) {
    loop {
        let Some(delay) = inner.upgrade().map(|e| e.next_interval()) else { break };
        tokio::time::sleep(delay).await;

        let Some(emitter) = inner.upgrade() else { break };
        if !emitter.is_current(generation) {
            break;
        }
        emitter.emit(Some(generation));
    }
    trace!(generation, "Emission schedule ended");
}

/// Registration of one listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    emitter: Weak<EmitterInner>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.emitter.upgrade() {
            inner.state.lock().listeners.retain(|(id, _)| *id != self.id);
            trace!(listener = self.id, "Listener unsubscribed");
        }
    }
}
