// Router binds category selection to the fetch + live feed lifecycle
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::engine::store::SharedStore;
use crate::engine::types::{PriceUpdate, SortConfig, SortKey, StoreError, Token, TokenCategory};
use crate::market_data::adapters::TokenSource;
use crate::market_data::cache::CategoryCache;
use crate::market_data::emitter::{Subscription, UpdateEmitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Fetched { count: usize },
    Cached { count: usize },
    // a newer selection started while this fetch was in flight
    Superseded,
    Failed,
}

/// Applies one emitter tick to the store. Ticks for ids outside the current
/// list are dropped.
pub fn forward_update(store: &SharedStore, update: &PriceUpdate) {
    match store.write().update_price(&update.token_id, update.price) {
        Ok(_) => {
            metrics::counter!("tokenboard_price_updates_applied").increment(1);
        }
        Err(StoreError::UpdateTargetMissing { id }) => {
            debug!(%id, "Dropping price update for token outside the current view");
            metrics::counter!("tokenboard_price_updates_dropped").increment(1);
        }
        Err(e) => {
            warn!(error = %e, "Rejected price update");
            metrics::counter!("tokenboard_price_updates_dropped").increment(1);
        }
    }
}

/// Connect + subscribe pair for one category. Dropping it unsubscribes and
/// then disconnects the emitter, whichever way the feed ends.
struct LiveFeed {
    category: TokenCategory,
    subscription: Option<Subscription>,
    emitter: UpdateEmitter,
}

impl LiveFeed {
    fn start(emitter: &UpdateEmitter, store: &SharedStore, category: TokenCategory, ids: Vec<String>) -> Self {
        let mut feed = LiveFeed { category, subscription: None, emitter: emitter.clone() };
        emitter.connect(ids);
        let sink = Arc::clone(store);
        feed.subscription = Some(emitter.subscribe(move |update| forward_update(&sink, update)));
        feed
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        drop(self.subscription.take());
        self.emitter.disconnect();
        debug!(category = %self.category, "Live feed torn down");
    }
}

/// Clears the store's loading flag if the fetch that raised it is abandoned
/// before it settles, e.g. when the caller drops the `select_category` future.
struct LoadingGuard<'a> {
    coordinator: &'a Coordinator,
    ticket: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let _live = self.coordinator.live.lock();
        // a newer request owns the flag now
        if self.coordinator.is_current(self.ticket) {
            self.coordinator.store.write().set_loading(false);
        }
    }
}

/// Binds category selection to the fetch and the live feed.
///
/// Every step that touches the live feed, the selected category or the
/// token list runs under the `live` lock and re-checks the request ticket
/// first, so concurrent selections commit one at a time and a stale one
/// never overwrites a newer result.
pub struct Coordinator {
    source: Arc<dyn TokenSource>,
    store: SharedStore,
    emitter: UpdateEmitter,
    cache: Mutex<CategoryCache>,
    latest_request: AtomicU64,
    live: Mutex<Option<LiveFeed>>,
}

impl Coordinator {
    pub fn new(
        source: Arc<dyn TokenSource>,
        store: SharedStore,
        emitter: UpdateEmitter,
        stale_time: Duration,
    ) -> Self {
        Self {
            source,
            store,
            emitter,
            cache: Mutex::new(CategoryCache::new(stale_time)),
            latest_request: AtomicU64::new(0),
            live: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn emitter(&self) -> &UpdateEmitter {
        &self.emitter
    }

    /// Category whose live feed is currently running.
    pub fn live_category(&self) -> Option<TokenCategory> {
        self.live.lock().as_ref().map(|feed| feed.category)
    }

    /// Switches the view to `category`. Only the most recent call may write
    /// its result into the store; earlier in-flight fetches are discarded
    /// when they complete.
    #[instrument(skip(self))]
    pub async fn select_category(&self, category: TokenCategory) -> SelectOutcome {
        let ticket = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut live = self.live.lock();
            if !self.is_current(ticket) {
                return SelectOutcome::Superseded;
            }
            self.teardown_locked(&mut live);
            self.store.write().set_category(category);
        }

        let cached = self.cache.lock().get_fresh(category);
        if let Some(tokens) = cached {
            let mut live = self.live.lock();
            if !self.is_current(ticket) {
                debug!(%category, ticket, "Discarding superseded cache hit");
                return SelectOutcome::Superseded;
            }
            let count = tokens.len();
            self.install_locked(&mut live, category, tokens);
            info!(%category, count, "Served category from cache");
            return SelectOutcome::Cached { count };
        }

        let _loading = {
            let _live = self.live.lock();
            if !self.is_current(ticket) {
                return SelectOutcome::Superseded;
            }
            self.store.write().set_loading(true);
            LoadingGuard { coordinator: self, ticket }
        };
        metrics::counter!("tokenboard_fetches").increment(1);
        let result = self.source.fetch_category(category).await;

        let mut live = self.live.lock();
        if !self.is_current(ticket) {
            debug!(%category, ticket, "Discarding superseded fetch result");
            metrics::counter!("tokenboard_stale_fetches_discarded").increment(1);
            return SelectOutcome::Superseded;
        }

        match result {
            Ok(tokens) => {
                let count = tokens.len();
                self.cache.lock().insert(category, tokens.clone());
                self.install_locked(&mut live, category, tokens);
                info!(%category, count, "Fetched category");
                SelectOutcome::Fetched { count }
            }
            Err(e) => {
                warn!(%category, error = %e, "Category fetch failed");
                metrics::counter!("tokenboard_fetch_failures").increment(1);
                self.store.write().set_error(e.to_string());
                SelectOutcome::Failed
            }
        }
    }

    /// Drops the cached list for the selected category and fetches it again.
    pub async fn refresh(&self) -> SelectOutcome {
        let category = self.store.read().selected_category();
        self.cache.lock().invalidate(category);
        self.select_category(category).await
    }

    /// Sort-column click from the presentation.
    pub fn handle_sort(&self, key: SortKey) -> SortConfig {
        let mut store = self.store.write();
        let next = SortConfig::toggle(store.sort_config(), key);
        store.set_sort_config(Some(next));
        next
    }

    pub fn shutdown(&self) {
        let mut live = self.live.lock();
        self.teardown_locked(&mut live);
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.latest_request.load(Ordering::SeqCst) == ticket
    }

    // Callers hold the `live` lock.
    fn install_locked(&self, live: &mut Option<LiveFeed>, category: TokenCategory, tokens: Vec<Token>) {
        self.teardown_locked(live);
        let ids: Vec<String> = tokens.iter().map(|t| t.id.clone()).collect();
        self.store.write().set_tokens(tokens);
        if ids.is_empty() {
            debug!(%category, "Empty token list, no live feed");
            return;
        }
        *live = Some(LiveFeed::start(&self.emitter, &self.store, category, ids));
    }

    fn teardown_locked(&self, live: &mut Option<LiveFeed>) {
        let Some(feed) = live.take() else { return };
        // keep the ticked prices for a cache hit on the way back
        {
            let store = self.store.read();
            if store.selected_category() == feed.category {
                self.cache.lock().retain_latest(feed.category, store.items());
            }
        }
        drop(feed);
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
