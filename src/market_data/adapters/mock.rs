// Synthetic token generator and the mock fetch API built on it

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument, warn};

use super::{FetchError, TokenSource};
use crate::config::{ApiConfig, MAX_BASE_PRICE};
use crate::engine::types::{
    CategoryPayload, Chain, MigrationStatus, PriceState, Token, TokenCategory,
};

pub const TOKEN_NAMES: [&str; 20] = [
    "SolDoge", "BonkCat", "MoonRocket", "SafePepe", "ElonMars",
    "ShibaFloki", "DogeKing", "MetaMoon", "CryptoShark", "DiamondHands",
    "RocketFuel", "GoldenPepe", "LunarEclipse", "StellarDoge", "CosmicCat",
    "TurboShib", "MegaMoon", "UltraDoge", "HyperCat", "SuperBonk",
];

// Keeps generated prices strictly positive.
const MIN_PRICE: f64 = 1e-6;
const DAY_MS: i64 = 86_400_000;

/// Id of the `index`-th token of a category batch.
pub fn token_id(category: TokenCategory, index: usize) -> String {
    format!("token-{}-{}", category, index)
}

pub fn generate_token<R: Rng + ?Sized>(index: usize, category: TokenCategory, rng: &mut R) -> Token {
    let name = TOKEN_NAMES[index % TOKEN_NAMES.len()];
    let price = rng.gen_range(0.0..MAX_BASE_PRICE).max(MIN_PRICE);
    let change = rng.gen_range(-10.0..10.0);
    let now = Utc::now();
    let created_at = now - ChronoDuration::milliseconds(rng.gen_range(0..DAY_MS * 30));

    let payload = match category {
        TokenCategory::NewPairs => CategoryPayload::NewPair,
        TokenCategory::FinalStretch => CategoryPayload::FinalStretch {
            bonding_progress: rng.gen_range(0.0..100.0),
        },
        TokenCategory::Migrated => CategoryPayload::Migrated {
            status: MigrationStatus::Completed,
            date: now - ChronoDuration::milliseconds(rng.gen_range(0..DAY_MS * 7)),
        },
    };

    let contract_address: String = (0..40)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect();

    Token {
        id: token_id(category, index),
        symbol: name.to_uppercase(),
        name: name.to_string(),
        pricing: PriceState::new(price, price * (1.0 - change / 100.0), change),
        market_cap: rng.gen_range(0.0..10_000_000.0),
        volume_24h: rng.gen_range(0.0..1_000_000.0),
        liquidity: rng.gen_range(0.0..500_000.0),
        holders: rng.gen_range(0..10_000),
        created_at,
        contract_address: format!("0x{}", contract_address),
        chain: Chain::ALL[rng.gen_range(0..Chain::ALL.len())],
        logo_url: Some(format!("https://api.dicebear.com/7.x/shapes/svg?seed={}", name)),
        payload,
    }
}

pub fn generate_tokens<R: Rng + ?Sized>(count: usize, category: TokenCategory, rng: &mut R) -> Vec<Token> {
    (0..count).map(|i| generate_token(i, category, rng)).collect()
}

/// In-process stand-in for the token listing API.
pub struct MockTokenApi {
    config: ApiConfig,
    rng: Mutex<StdRng>,
}

impl MockTokenApi {
    pub fn new(config: ApiConfig) -> Self {
        Self { config, rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn with_seed(config: ApiConfig, seed: u64) -> Self {
        Self { config, rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl TokenSource for MockTokenApi {
    #[instrument(skip(self))]
    async fn fetch_category(&self, category: TokenCategory) -> Result<Vec<Token>, FetchError> {
        tokio::time::sleep(self.config.delay()).await;

        let mut rng = self.rng.lock();
        if self.config.failure_rate > 0.0 && rng.gen_bool(self.config.failure_rate.clamp(0.0, 1.0)) {
            warn!(%category, "Injected mock fetch failure");
            return Err(FetchError::Failure("mock API unavailable".to_string()));
        }
        let tokens = generate_tokens(self.config.batch_size(category), category, &mut *rng);
        debug!(%category, count = tokens.len(), "Generated mock tokens");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_unique_and_traceable() {
        let mut rng = StdRng::seed_from_u64(1);
        let tokens = generate_tokens(25, TokenCategory::NewPairs, &mut rng);
        let ids: HashSet<_> = tokens.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), 25);
        assert_eq!(tokens[3].id, "token-new-pairs-3");
        assert_ne!(token_id(TokenCategory::NewPairs, 3), token_id(TokenCategory::Migrated, 3));
    }

    #[test]
    fn test_values_plausible() {
        let mut rng = StdRng::seed_from_u64(2);
        for category in TokenCategory::ALL {
            for token in generate_tokens(50, category, &mut rng) {
                assert!(token.price() > 0.0);
                assert!(token.market_cap >= 0.0 && token.volume_24h >= 0.0 && token.liquidity >= 0.0);
                assert!(token.holders < 10_000);
                assert_eq!(token.contract_address.len(), 42);
                assert!(token.contract_address.starts_with("0x"));
                assert_eq!(token.category(), category);
                assert!(token.created_at <= Utc::now());
            }
        }
    }

    #[test]
    fn test_category_payloads() {
        let mut rng = StdRng::seed_from_u64(3);
        for token in generate_tokens(15, TokenCategory::FinalStretch, &mut rng) {
            let progress = token.bonding_progress().unwrap();
            assert!((0.0..=100.0).contains(&progress));
            assert_eq!(token.migration_status(), None);
        }
        for token in generate_tokens(10, TokenCategory::Migrated, &mut rng) {
            assert_eq!(token.migration_status(), Some(MigrationStatus::Completed));
            assert!(token.migration_date().unwrap() >= Utc::now() - ChronoDuration::days(7));
            assert_eq!(token.bonding_progress(), None);
        }
        for token in generate_tokens(20, TokenCategory::NewPairs, &mut rng) {
            assert_eq!(token.bonding_progress(), None);
            assert_eq!(token.migration_status(), None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_api_batch_sizes() {
        let api = MockTokenApi::with_seed(ApiConfig::default(), 9);
        assert_eq!(api.fetch_category(TokenCategory::NewPairs).await.unwrap().len(), 20);
        assert_eq!(api.fetch_category(TokenCategory::FinalStretch).await.unwrap().len(), 15);
        assert_eq!(api.fetch_category(TokenCategory::Migrated).await.unwrap().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_api_failure_injection() {
        let config = ApiConfig { failure_rate: 1.0, ..Default::default() };
        let api = MockTokenApi::with_seed(config, 9);
        let err = api.fetch_category(TokenCategory::NewPairs).await.unwrap_err();
        assert!(matches!(err, FetchError::Failure(_)));
    }
}
