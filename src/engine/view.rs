//! Read-only projection of the store into render-ready rows.
//!
//! Nothing here mutates the canonical list: sorting and filtering produce a
//! fresh `Vec<&Token>` every time, so the store's per-tick cost stays O(1)
//! and the presentation recomputes ordering on demand.

use std::cmp::Ordering;

use serde::Serialize;

use crate::engine::store::TokenStore;
use crate::engine::types::{
    FieldValue, FilterConfig, SortConfig, SortDirection, Token, TokenCategory,
};

/// Everything the presentation needs for one frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView<'a> {
    pub category: TokenCategory,
    pub rows: Vec<&'a Token>,
    pub total: usize,
    pub loading: bool,
    pub error: Option<&'a str>,
    pub sort: Option<SortConfig>,
}

/// Recent direction of a token's price, used for the tick highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceDirection {
    Up,
    Down,
    Flat,
}

impl PriceDirection {
    pub fn of(token: &Token) -> Self {
        match token.price().partial_cmp(&token.previous_price()) {
            Some(Ordering::Greater) => PriceDirection::Up,
            Some(Ordering::Less) => PriceDirection::Down,
            _ => PriceDirection::Flat,
        }
    }
}

/// Locale-style string ordering: case-insensitive first, exact bytes as the
/// tie-breaker so distinct strings never compare equal.
fn compare_text(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

fn compare_fields(a: Option<FieldValue<'_>>, b: Option<FieldValue<'_>>) -> Ordering {
    match (a, b) {
        // total order, NaN sorts above every number
        (Some(FieldValue::Number(x)), Some(FieldValue::Number(y))) => x.total_cmp(&y),
        (Some(FieldValue::Text(x)), Some(FieldValue::Text(y))) => compare_text(x, y),
        // missing on either side, or mixed kinds
        _ => Ordering::Equal,
    }
}

/// Orders `tokens` by `sort` without touching the input. With no directive
/// the input order is kept. The sort is stable, so equal keys keep their
/// relative order in both directions.
pub fn sort_tokens<'a>(tokens: &'a [Token], sort: Option<&SortConfig>) -> Vec<&'a Token> {
    let mut rows: Vec<&Token> = tokens.iter().collect();
    sort_rows(&mut rows, sort);
    rows
}

fn sort_rows(rows: &mut [&Token], sort: Option<&SortConfig>) {
    let Some(sort) = sort else { return };
    rows.sort_by(|a, b| {
        let ord = compare_fields(a.field(sort.key), b.field(sort.key));
        match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

pub fn matches_filter(token: &Token, filter: &FilterConfig) -> bool {
    if filter.min_market_cap.is_some_and(|min| token.market_cap < min) {
        return false;
    }
    if filter.max_market_cap.is_some_and(|max| token.market_cap > max) {
        return false;
    }
    if filter.min_volume.is_some_and(|min| token.volume_24h < min) {
        return false;
    }
    if filter.min_liquidity.is_some_and(|min| token.liquidity < min) {
        return false;
    }
    match &filter.chains {
        Some(chains) if !chains.is_empty() => chains.contains(&token.chain),
        _ => true,
    }
}

pub fn apply_filter<'a>(tokens: &'a [Token], filter: &FilterConfig) -> Vec<&'a Token> {
    tokens.iter().filter(|t| matches_filter(t, filter)).collect()
}

/// Filtered, sorted view of the store's current state.
pub fn project(store: &TokenStore) -> TableView<'_> {
    let mut rows = apply_filter(store.items(), store.filter_config());
    sort_rows(&mut rows, store.sort_config());
    TableView {
        category: store.selected_category(),
        rows,
        total: store.items().len(),
        loading: store.loading(),
        error: store.error(),
        sort: store.sort_config().copied(),
    }
}
