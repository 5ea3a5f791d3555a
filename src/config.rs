//! Tunables and layered configuration.
//!
//! Defaults come from the named constants below, then an optional config
//! file, then `TOKENBOARD__*` environment variables, then CLI flags.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::engine::types::TokenCategory;

/// Lower bound of the delay between two emitted ticks.
pub const MIN_EMIT_INTERVAL_MS: u64 = 2_000;
/// Upper bound (exclusive) of the delay between two emitted ticks.
pub const MAX_EMIT_INTERVAL_MS: u64 = 5_000;
/// Largest relative move applied to a tick's base price, in percent.
pub const MAX_PRICE_DELTA_PCT: f64 = 5.0;
/// Synthetic prices are drawn from `[0, MAX_BASE_PRICE)`.
pub const MAX_BASE_PRICE: f64 = 10.0;
/// How long a fetched category may be served from cache.
pub const STALE_TIME: Duration = Duration::from_secs(30);
/// Latency of the mock fetch API.
pub const API_DELAY: Duration = Duration::from_millis(500);

pub const NEW_PAIRS_BATCH: usize = 20;
pub const FINAL_STRETCH_BATCH: usize = 15;
pub const MIGRATED_BATCH: usize = 10;

pub const ENV_PREFIX: &str = "TOKENBOARD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub max_delta_pct: f64,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: MIN_EMIT_INTERVAL_MS,
            max_interval_ms: MAX_EMIT_INTERVAL_MS,
            max_delta_pct: MAX_PRICE_DELTA_PCT,
        }
    }
}

impl EmitterConfig {
    /// Interval range in milliseconds, never empty.
    pub fn interval_range(&self) -> Range<u64> {
        let start = self.min_interval_ms.max(1);
        let end = self.max_interval_ms.max(start + 1);
        start..end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub delay_ms: u64,
    pub failure_rate: f64,
    pub new_pairs: usize,
    pub final_stretch: usize,
    pub migrated: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            delay_ms: API_DELAY.as_millis() as u64,
            failure_rate: 0.0,
            new_pairs: NEW_PAIRS_BATCH,
            final_stretch: FINAL_STRETCH_BATCH,
            migrated: MIGRATED_BATCH,
        }
    }
}

impl ApiConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn batch_size(&self, category: TokenCategory) -> usize {
        match category {
            TokenCategory::NewPairs => self.new_pairs,
            TokenCategory::FinalStretch => self.final_stretch,
            TokenCategory::Migrated => self.migrated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub emitter: EmitterConfig,
    pub api: ApiConfig,
    pub stale_time_ms: u64,
    pub initial_category: TokenCategory,
    pub seed: Option<u64>,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            emitter: EmitterConfig::default(),
            api: ApiConfig::default(),
            stale_time_ms: STALE_TIME.as_millis() as u64,
            initial_category: TokenCategory::NewPairs,
            seed: None,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("parsing configuration")
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(category) = cli.category {
            self.initial_category = category;
        }
        if let Some(seed) = cli.seed {
            self.seed = Some(seed);
        }
        if let Some(rate) = cli.failure_rate {
            self.api.failure_rate = rate;
        }
        if let Some(filter) = &cli.log_filter {
            self.log_filter = filter.clone();
        }
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }
}

#[derive(Debug, Parser)]
#[command(name = "tokenboard", version, about = "Live token discovery board with simulated price ticks")]
pub struct Cli {
    /// Optional config file (toml/json/yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Category shown at startup
    #[arg(long)]
    pub category: Option<TokenCategory>,

    /// Seed for the synthetic data and tick generators
    #[arg(long)]
    pub seed: Option<u64>,

    /// Probability in [0, 1] that a mock fetch fails
    #[arg(long)]
    pub failure_rate: Option<f64>,

    /// tracing filter used when RUST_LOG is unset
    #[arg(long)]
    pub log_filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.emitter.interval_range(), 2_000..5_000);
        assert_eq!(cfg.stale_time(), Duration::from_secs(30));
        assert_eq!(cfg.api.delay(), Duration::from_millis(500));
        assert_eq!(cfg.api.batch_size(TokenCategory::NewPairs), 20);
        assert_eq!(cfg.api.batch_size(TokenCategory::FinalStretch), 15);
        assert_eq!(cfg.api.batch_size(TokenCategory::Migrated), 10);
    }

    #[test]
    fn test_interval_range_never_empty() {
        let cfg = EmitterConfig { min_interval_ms: 300, max_interval_ms: 100, ..Default::default() };
        let range = cfg.interval_range();
        assert!(range.start < range.end);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("tokenboard-test-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "stale_time_ms = 1000\ninitial_category = \"migrated\"\n[emitter]\nmin_interval_ms = 10\n",
        )
        .unwrap();

        let cfg = AppConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.stale_time_ms, 1000);
        assert_eq!(cfg.initial_category, TokenCategory::Migrated);
        assert_eq!(cfg.emitter.min_interval_ms, 10);
        assert_eq!(cfg.emitter.max_interval_ms, MAX_EMIT_INTERVAL_MS);
        assert_eq!(cfg.api, ApiConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["tokenboard", "--category", "final-stretch", "--seed", "7"]);
        let mut cfg = AppConfig::default();
        cfg.apply_cli(&cli);
        assert_eq!(cfg.initial_category, TokenCategory::FinalStretch);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.api.failure_rate, 0.0);
    }
}
