use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

// Token grouping shown as a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenCategory {
    NewPairs,
    FinalStretch,
    Migrated,
}

impl TokenCategory {
    pub const ALL: [TokenCategory; 3] = [
        TokenCategory::NewPairs,
        TokenCategory::FinalStretch,
        TokenCategory::Migrated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenCategory::NewPairs => "new-pairs",
            TokenCategory::FinalStretch => "final-stretch",
            TokenCategory::Migrated => "migrated",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TokenCategory::NewPairs => "New Pairs",
            TokenCategory::FinalStretch => "Final Stretch",
            TokenCategory::Migrated => "Migrated",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TokenCategory::NewPairs => "Recently launched tokens",
            TokenCategory::FinalStretch => "Tokens near bonding completion",
            TokenCategory::Migrated => "Successfully migrated tokens",
        }
    }
}

impl Default for TokenCategory {
    fn default() -> Self {
        TokenCategory::NewPairs
    }
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new-pairs" | "new" => Ok(TokenCategory::NewPairs),
            "final-stretch" | "final" => Ok(TokenCategory::FinalStretch),
            "migrated" => Ok(TokenCategory::Migrated),
            _ => Err(ParseError::UnknownCategory(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    SOL,
    BNB,
    ETH,
}

impl Chain {
    pub const ALL: [Chain; 3] = [Chain::SOL, Chain::BNB, Chain::ETH];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::SOL => "SOL",
            Chain::BNB => "BNB",
            Chain::ETH => "ETH",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SOL" => Ok(Chain::SOL),
            "BNB" => Ok(Chain::BNB),
            "ETH" => Ok(Chain::ETH),
            _ => Err(ParseError::UnknownChain(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    Pending,
    Completed,
}

/// Fields that only exist for one category. The variant always matches the
/// category the token was fetched for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum CategoryPayload {
    #[serde(rename = "new-pairs")]
    NewPair,
    #[serde(rename = "final-stretch")]
    FinalStretch {
        #[serde(rename = "bondingProgress")]
        bonding_progress: f64,
    },
    #[serde(rename = "migrated")]
    Migrated {
        #[serde(rename = "migrationStatus")]
        status: MigrationStatus,
        #[serde(rename = "migrationDate")]
        date: DateTime<Utc>,
    },
}

impl CategoryPayload {
    pub fn category(&self) -> TokenCategory {
        match self {
            CategoryPayload::NewPair => TokenCategory::NewPairs,
            CategoryPayload::FinalStretch { .. } => TokenCategory::FinalStretch,
            CategoryPayload::Migrated { .. } => TokenCategory::Migrated,
        }
    }
}

/// Percentage move from `old` to `new`. A zero (or otherwise degenerate)
/// base yields 0 instead of a non-finite value.
pub fn percent_change(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        trace!(new, "previous price is zero, clamping change to 0");
        return 0.0;
    }
    let change = (new - old) / old * 100.0;
    if change.is_finite() {
        change
    } else {
        trace!(old, new, "non-finite price change, clamping to 0");
        0.0
    }
}

/// Current price, the price before the last update and the derived change.
/// `apply` is the only way to move the price, so the three stay in step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceState {
    price: f64,
    previous_price: f64,
    price_change_24h: f64,
}

impl PriceState {
    pub fn new(price: f64, previous_price: f64, price_change_24h: f64) -> Self {
        Self { price, previous_price, price_change_24h }
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn previous_price(&self) -> f64 {
        self.previous_price
    }

    pub fn price_change_24h(&self) -> f64 {
        self.price_change_24h
    }

    pub fn apply(&mut self, new_price: f64) {
        let old = self.price;
        self.previous_price = old;
        self.price = new_price;
        self.price_change_24h = percent_change(old, new_price);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(flatten)]
    pub pricing: PriceState,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub liquidity: f64,
    pub holders: u64,
    pub created_at: DateTime<Utc>,
    pub contract_address: String,
    pub chain: Chain,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub logo_url: Option<String>,
    #[serde(flatten)]
    pub payload: CategoryPayload,
}

impl Token {
    pub fn category(&self) -> TokenCategory {
        self.payload.category()
    }

    pub fn price(&self) -> f64 {
        self.pricing.price()
    }

    pub fn previous_price(&self) -> f64 {
        self.pricing.previous_price()
    }

    pub fn price_change_24h(&self) -> f64 {
        self.pricing.price_change_24h()
    }

    pub fn apply_price(&mut self, new_price: f64) {
        self.pricing.apply(new_price);
    }

    pub fn bonding_progress(&self) -> Option<f64> {
        match self.payload {
            CategoryPayload::FinalStretch { bonding_progress } => Some(bonding_progress),
            _ => None,
        }
    }

    pub fn migration_status(&self) -> Option<MigrationStatus> {
        match self.payload {
            CategoryPayload::Migrated { status, .. } => Some(status),
            _ => None,
        }
    }

    pub fn migration_date(&self) -> Option<DateTime<Utc>> {
        match self.payload {
            CategoryPayload::Migrated { date, .. } => Some(date),
            _ => None,
        }
    }

    /// Value of a sortable column, `None` when the field does not exist for
    /// this token's category.
    pub fn field(&self, key: SortKey) -> Option<FieldValue<'_>> {
        let value = match key {
            SortKey::Symbol => FieldValue::Text(&self.symbol),
            SortKey::Name => FieldValue::Text(&self.name),
            SortKey::Price => FieldValue::Number(self.price()),
            SortKey::PreviousPrice => FieldValue::Number(self.previous_price()),
            SortKey::MarketCap => FieldValue::Number(self.market_cap),
            SortKey::Volume24h => FieldValue::Number(self.volume_24h),
            SortKey::PriceChange24h => FieldValue::Number(self.price_change_24h()),
            SortKey::Liquidity => FieldValue::Number(self.liquidity),
            SortKey::Holders => FieldValue::Number(self.holders as f64),
            SortKey::CreatedAt => FieldValue::Number(self.created_at.timestamp_millis() as f64),
            SortKey::Chain => FieldValue::Text(self.chain.as_str()),
            SortKey::ContractAddress => FieldValue::Text(&self.contract_address),
            SortKey::BondingProgress => FieldValue::Number(self.bonding_progress()?),
            SortKey::MigrationDate => {
                FieldValue::Number(self.migration_date()?.timestamp_millis() as f64)
            }
        };
        Some(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Symbol,
    Name,
    Price,
    PreviousPrice,
    MarketCap,
    Volume24h,
    PriceChange24h,
    Liquidity,
    Holders,
    CreatedAt,
    Chain,
    ContractAddress,
    BondingProgress,
    MigrationDate,
}

impl SortKey {
    pub const ALL: [SortKey; 14] = [
        SortKey::Symbol,
        SortKey::Name,
        SortKey::Price,
        SortKey::PreviousPrice,
        SortKey::MarketCap,
        SortKey::Volume24h,
        SortKey::PriceChange24h,
        SortKey::Liquidity,
        SortKey::Holders,
        SortKey::CreatedAt,
        SortKey::Chain,
        SortKey::ContractAddress,
        SortKey::BondingProgress,
        SortKey::MigrationDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Symbol => "symbol",
            SortKey::Name => "name",
            SortKey::Price => "price",
            SortKey::PreviousPrice => "previousPrice",
            SortKey::MarketCap => "marketCap",
            SortKey::Volume24h => "volume24h",
            SortKey::PriceChange24h => "priceChange24h",
            SortKey::Liquidity => "liquidity",
            SortKey::Holders => "holders",
            SortKey::CreatedAt => "createdAt",
            SortKey::Chain => "chain",
            SortKey::ContractAddress => "contractAddress",
            SortKey::BondingProgress => "bondingProgress",
            SortKey::MigrationDate => "migrationDate",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SortKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseError::UnknownSortKey(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Directive after a click on `key`: same column flips, a new column
    /// starts descending.
    pub fn toggle(current: Option<&SortConfig>, key: SortKey) -> SortConfig {
        match current {
            Some(cur) if cur.key == key => SortConfig::new(key, cur.direction.flip()),
            _ => SortConfig::new(key, SortDirection::Desc),
        }
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig::new(SortKey::MarketCap, SortDirection::Desc)
    }
}

impl fmt::Display for SortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.direction)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    pub min_market_cap: Option<f64>,
    pub max_market_cap: Option<f64>,
    pub min_volume: Option<f64>,
    pub min_liquidity: Option<f64>,
    pub chains: Option<Vec<Chain>>,
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        *self == FilterConfig::default()
    }
}

// Single-token tick pushed by the emitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub token_id: String,
    pub price: f64,
    pub timestamp_ms: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("no token with id '{id}' in the current view")]
    UpdateTargetMissing { id: String },
    #[error("rejected price {price} for token '{id}'")]
    InvalidPrice { id: String, price: f64 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown category '{0}' (expected new-pairs, final-stretch or migrated)")]
    UnknownCategory(String),
    #[error("unknown sort key '{0}'")]
    UnknownSortKey(String),
    #[error("unknown chain '{0}' (expected SOL, BNB or ETH)")]
    UnknownChain(String),
}

#[cfg(test)]
pub(crate) fn token_fixture(id: &str, price: f64, payload: CategoryPayload) -> Token {
    use chrono::TimeZone;

    Token {
        id: id.to_string(),
        symbol: id.to_uppercase(),
        name: id.to_string(),
        pricing: PriceState::new(price, price, 0.0),
        market_cap: 1_000.0,
        volume_24h: 100.0,
        liquidity: 50.0,
        holders: 10,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        contract_address: format!("0x{:0>40}", id.len()),
        chain: Chain::SOL,
        logo_url: None,
        payload,
    }
}
