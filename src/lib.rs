pub mod config;
pub mod engine;
pub mod format;
pub mod market_data;
pub mod telemetry;
