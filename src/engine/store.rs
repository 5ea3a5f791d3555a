use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, trace, warn};

use crate::engine::types::{
    FilterConfig, SortConfig, StoreError, Token, TokenCategory,
};

/// Store shared between the coordinator, the emitter listener and readers.
pub type SharedStore = Arc<RwLock<TokenStore>>;

/// Canonical client state for the active category. Only the operations
/// below mutate the token list; everything else reads it.
#[derive(Debug, Default)]
pub struct TokenStore {
    items: Vec<Token>,
    id_index: AHashMap<String, usize>,
    loading: bool,
    error: Option<String>,
    sort_config: Option<SortConfig>,
    filter_config: FilterConfig,
    selected_category: TokenCategory,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn items(&self) -> &[Token] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Token> {
        self.id_index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn sort_config(&self) -> Option<&SortConfig> {
        self.sort_config.as_ref()
    }

    pub fn filter_config(&self) -> &FilterConfig {
        &self.filter_config
    }

    pub fn selected_category(&self) -> TokenCategory {
        self.selected_category
    }

    #[instrument(level = "debug", skip(self, tokens), fields(count = tokens.len()))]
    pub fn set_tokens(&mut self, tokens: Vec<Token>) {
        self.id_index = tokens
            .iter()
            .enumerate()
            .map(|(pos, token)| (token.id.clone(), pos))
            .collect();
        if self.id_index.len() != tokens.len() {
            warn!(
                count = tokens.len(),
                unique = self.id_index.len(),
                "Token batch contains duplicate ids, later entries win on update"
            );
        }
        self.items = tokens;
        self.loading = false;
        self.error = None;
        debug!(count = self.items.len(), "Replaced token list");
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Records a fetch failure. The token list is left as it was so a failed
    /// refetch does not blank a populated view.
    pub fn set_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(error = %message, kept = self.items.len(), "Store error set");
        self.error = Some(message);
        self.loading = false;
    }

    /// Moves one token's price. Ids outside the current list are reported as
    /// `UpdateTargetMissing` and leave the store untouched.
    pub fn update_price(&mut self, id: &str, price: f64) -> Result<&Token, StoreError> {
        let Some(&pos) = self.id_index.get(id) else {
            return Err(StoreError::UpdateTargetMissing { id: id.to_string() });
        };
        if !price.is_finite() || price < 0.0 {
            return Err(StoreError::InvalidPrice { id: id.to_string(), price });
        }

        let token = &mut self.items[pos];
        token.apply_price(price);
        trace!(
            id,
            price,
            previous = token.previous_price(),
            change = token.price_change_24h(),
            "Applied price update"
        );
        Ok(token)
    }

    pub fn set_sort_config(&mut self, sort: Option<SortConfig>) {
        self.sort_config = sort;
    }

    pub fn set_filter_config(&mut self, filter: FilterConfig) {
        self.filter_config = filter;
    }

    pub fn set_category(&mut self, category: TokenCategory) {
        self.selected_category = category;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{token_fixture, CategoryPayload, SortDirection, SortKey};

    fn store_with(prices: &[(&str, f64)]) -> TokenStore {
        let mut store = TokenStore::new();
        store.set_tokens(
            prices
                .iter()
                .map(|(id, price)| token_fixture(id, *price, CategoryPayload::NewPair))
                .collect(),
        );
        store
    }

    #[test]
    fn test_initialise() {
        let store = TokenStore::new();
        assert!(store.items().is_empty());
        assert!(!store.loading());
        assert_eq!(store.error(), None);
        assert_eq!(store.sort_config(), None);
        assert_eq!(store.selected_category(), TokenCategory::NewPairs);
    }

    #[test]
    fn test_set_tokens_clears_loading_and_error() {
        let mut store = TokenStore::new();
        store.set_loading(true);
        store.set_error("boom");
        store.set_loading(true);
        store.set_tokens(vec![token_fixture("a", 1.0, CategoryPayload::NewPair)]);
        assert!(!store.loading());
        assert_eq!(store.error(), None);
        assert_eq!(store.items().len(), 1);
    }

    #[test]
    fn test_set_error_keeps_list() {
        let mut store = store_with(&[("a", 1.0), ("b", 2.0)]);
        store.set_loading(true);
        store.set_error("Failed to fetch tokens");
        assert!(!store.loading());
        assert_eq!(store.error(), Some("Failed to fetch tokens"));
        assert_eq!(store.items().len(), 2);
    }

    #[test]
    fn test_update_price() {
        let mut store = store_with(&[("a", 2.0), ("b", 4.0)]);
        let token = store.update_price("b", 5.0).unwrap();
        assert_eq!(token.price(), 5.0);
        assert_eq!(token.previous_price(), 4.0);
        assert_eq!(token.price_change_24h(), (5.0 - 4.0) / 4.0 * 100.0);

        // second tick chains off the first
        let token = store.update_price("b", 2.5).unwrap();
        assert_eq!(token.previous_price(), 5.0);
        assert_eq!(token.price_change_24h(), (2.5 - 5.0) / 5.0 * 100.0);
        assert_eq!(store.get("a").unwrap().price(), 2.0);
    }

    #[test]
    fn test_update_price_zero_base() {
        let mut store = store_with(&[("a", 0.0)]);
        let token = store.update_price("a", 3.0).unwrap();
        assert_eq!(token.price_change_24h(), 0.0);
        assert!(token.price_change_24h().is_finite());
    }

    #[test]
    fn test_update_price_missing_id_is_noop() {
        let mut store = store_with(&[("a", 1.0), ("b", 2.0)]);
        let before = store.items().to_vec();
        let err = store.update_price("token-new-pairs-7", 9.0).unwrap_err();
        assert_eq!(err, StoreError::UpdateTargetMissing { id: "token-new-pairs-7".into() });
        assert_eq!(store.items(), before.as_slice());
    }

    #[test]
    fn test_update_price_rejects_nan() {
        let mut store = store_with(&[("a", 1.0)]);
        assert!(matches!(
            store.update_price("a", f64::NAN),
            Err(StoreError::InvalidPrice { .. })
        ));
        assert_eq!(store.get("a").unwrap().price(), 1.0);
    }

    #[test]
    fn test_set_tokens_rebuilds_index() {
        let mut store = store_with(&[("a", 1.0)]);
        store.set_tokens(vec![token_fixture("z", 3.0, CategoryPayload::NewPair)]);
        assert!(store.update_price("a", 2.0).is_err());
        assert!(store.update_price("z", 2.0).is_ok());
    }

    #[test]
    fn test_setters_store_values() {
        let mut store = TokenStore::new();
        let sort = SortConfig::new(SortKey::Holders, SortDirection::Asc);
        store.set_sort_config(Some(sort));
        store.set_category(TokenCategory::Migrated);
        store.set_filter_config(FilterConfig { min_volume: Some(10.0), ..Default::default() });
        assert_eq!(store.sort_config(), Some(&sort));
        assert_eq!(store.selected_category(), TokenCategory::Migrated);
        assert_eq!(store.filter_config().min_volume, Some(10.0));
    }
}
