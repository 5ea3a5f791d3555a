use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tokenboard_rs::engine::store::TokenStore;
use tokenboard_rs::engine::types::{
    percent_change, PriceState, SortConfig, SortDirection, SortKey, Token, TokenCategory,
};
use tokenboard_rs::engine::view::sort_tokens;
use tokenboard_rs::market_data::adapters::mock::generate_tokens;

fn batch(seed: u64, count: usize, category: TokenCategory) -> Vec<Token> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_tokens(count, category, &mut rng)
}

fn sort_key() -> impl Strategy<Value = SortKey> {
    prop::sample::select(SortKey::ALL.to_vec())
}

fn direction() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
}

fn category() -> impl Strategy<Value = TokenCategory> {
    prop::sample::select(TokenCategory::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_apply_keeps_price_fields_in_step(
        start in 0.0001f64..1_000.0,
        moves in prop::collection::vec(0.0001f64..1_000.0, 1..20),
    ) {
        let mut state = PriceState::new(start, start, 0.0);
        for next in moves {
            let old = state.price();
            state.apply(next);
            prop_assert_eq!(state.previous_price(), old);
            prop_assert_eq!(state.price(), next);
            prop_assert_eq!(state.price_change_24h(), (next - old) / old * 100.0);
        }
    }

    #[test]
    fn prop_percent_change_is_always_finite(old in any::<f64>(), new in any::<f64>()) {
        prop_assert!(percent_change(old, new).is_finite());
    }

    #[test]
    fn prop_update_for_absent_id_changes_nothing(
        seed in any::<u64>(),
        cat in category(),
        suffix in "[a-z]{1,8}",
        price in 0.0001f64..100.0,
    ) {
        let tokens = batch(seed, 10, cat);
        let mut store = TokenStore::new();
        store.set_tokens(tokens.clone());

        let missing = format!("absent-{}", suffix);
        prop_assert!(store.update_price(&missing, price).is_err());
        prop_assert_eq!(store.items(), tokens.as_slice());
    }

    #[test]
    fn prop_sort_is_idempotent(seed in any::<u64>(), cat in category(), key in sort_key(), dir in direction()) {
        let tokens = batch(seed, 20, cat);
        let sort = SortConfig::new(key, dir);
        let once: Vec<Token> = sort_tokens(&tokens, Some(&sort)).into_iter().cloned().collect();
        let twice: Vec<Token> = sort_tokens(&once, Some(&sort)).into_iter().cloned().collect();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_sort_does_not_touch_input(seed in any::<u64>(), key in sort_key(), dir in direction()) {
        let tokens = batch(seed, 15, TokenCategory::FinalStretch);
        let before = tokens.clone();
        let rows = sort_tokens(&tokens, Some(&SortConfig::new(key, dir)));
        prop_assert_eq!(rows.len(), tokens.len());
        prop_assert_eq!(tokens, before);
    }

    #[test]
    fn prop_sort_is_stable_on_equal_keys(seed in any::<u64>(), dir in direction()) {
        // every token shares one of three chains, so ties are plentiful
        let tokens = batch(seed, 20, TokenCategory::NewPairs);
        let rows = sort_tokens(&tokens, Some(&SortConfig::new(SortKey::Chain, dir)));
        let position = |id: &str| tokens.iter().position(|t| t.id == id);
        for pair in rows.windows(2) {
            if pair[0].chain == pair[1].chain {
                prop_assert!(position(&pair[0].id) < position(&pair[1].id));
            }
        }
    }

    #[test]
    fn prop_missing_field_keeps_input_order(seed in any::<u64>(), dir in direction()) {
        let tokens = batch(seed, 20, TokenCategory::NewPairs);
        let rows = sort_tokens(&tokens, Some(&SortConfig::new(SortKey::BondingProgress, dir)));
        let ids: Vec<&str> = rows.iter().map(|t| t.id.as_str()).collect();
        let expected: Vec<&str> = tokens.iter().map(|t| t.id.as_str()).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn prop_toggle_twice_returns_to_start(key in sort_key(), other in sort_key(), dir in direction()) {
        let start = SortConfig::new(key, dir);
        let once = SortConfig::toggle(Some(&start), key);
        prop_assert_eq!(once.direction, dir.flip());
        prop_assert_eq!(SortConfig::toggle(Some(&once), key), start);

        let switched = SortConfig::toggle(Some(&start), other);
        if other != key {
            prop_assert_eq!(switched, SortConfig::new(other, SortDirection::Desc));
        }
    }
}
