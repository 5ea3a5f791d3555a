//! Sorting and tick-application cost for board-sized and larger lists.
//!
//! Run with: cargo bench --bench projection

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use tokenboard_rs::engine::store::TokenStore;
use tokenboard_rs::engine::types::{FilterConfig, SortConfig, SortDirection, SortKey, TokenCategory};
use tokenboard_rs::engine::view::{project, sort_tokens};
use tokenboard_rs::market_data::adapters::mock::generate_tokens;

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_tokens");
    for size in [20usize, 200, 2_000] {
        let mut rng = StdRng::seed_from_u64(42);
        let tokens = generate_tokens(size, TokenCategory::FinalStretch, &mut rng);
        for key in [SortKey::MarketCap, SortKey::Symbol, SortKey::BondingProgress] {
            let sort = SortConfig::new(key, SortDirection::Desc);
            group.bench_with_input(BenchmarkId::new(key.as_str(), size), &tokens, |b, tokens| {
                b.iter(|| sort_tokens(black_box(tokens), Some(&sort)).len())
            });
        }
    }
    group.finish();
}

fn bench_project(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let mut store = TokenStore::new();
    store.set_tokens(generate_tokens(2_000, TokenCategory::NewPairs, &mut rng));
    store.set_sort_config(Some(SortConfig::default()));
    store.set_filter_config(FilterConfig { min_market_cap: Some(1_000_000.0), ..Default::default() });

    c.bench_function("project_filtered_2000", |b| b.iter(|| project(black_box(&store)).rows.len()));
}

fn bench_update_price(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(9);
    let mut store = TokenStore::new();
    store.set_tokens(generate_tokens(2_000, TokenCategory::Migrated, &mut rng));
    let ids: Vec<String> = store.items().iter().map(|t| t.id.clone()).collect();

    let mut i = 0usize;
    c.bench_function("update_price_2000", |b| {
        b.iter(|| {
            i = (i + 1) % ids.len();
            let _ = store.update_price(black_box(&ids[i]), 1.0 + i as f64);
        })
    });
}

criterion_group!(benches, bench_sort, bench_project, bench_update_price);
criterion_main!(benches);
