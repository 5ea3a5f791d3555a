use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::engine::types::{Token, TokenCategory};

struct CacheEntry {
    fetched_at: Instant,
    tokens: Vec<Token>,
}

/// Per-category results of the last successful fetch, served again while
/// younger than the staleness window.
pub struct CategoryCache {
    stale_time: Duration,
    entries: HashMap<TokenCategory, CacheEntry>,
}

impl CategoryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self { stale_time, entries: HashMap::new() }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    pub fn get_fresh(&self, category: TokenCategory) -> Option<Vec<Token>> {
        let entry = self.entries.get(&category)?;
        let age = entry.fetched_at.elapsed();
        if age < self.stale_time {
            trace!(%category, age_ms = age.as_millis() as u64, "Cache hit");
            Some(entry.tokens.clone())
        } else {
            debug!(%category, age_ms = age.as_millis() as u64, "Cache entry is stale");
            None
        }
    }

    pub fn insert(&mut self, category: TokenCategory, tokens: Vec<Token>) {
        self.entries.insert(category, CacheEntry { fetched_at: Instant::now(), tokens });
    }

    /// Replaces the cached list with the latest known values without
    /// extending its freshness.
    pub fn retain_latest(&mut self, category: TokenCategory, tokens: &[Token]) {
        if let Some(entry) = self.entries.get_mut(&category) {
            entry.tokens = tokens.to_vec();
        }
    }

    pub fn invalidate(&mut self, category: TokenCategory) {
        self.entries.remove(&category);
    }
}
