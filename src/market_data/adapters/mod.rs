// Shared trait + errors for token list sources

use thiserror::Error;

use crate::engine::types::{Token, TokenCategory};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Failed to fetch tokens: {0}")]
    Failure(String),
}

/// Asynchronous provider of a category's token list. The coordinator awaits
/// exactly one of these per category switch.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_category(&self, category: TokenCategory) -> Result<Vec<Token>, FetchError>;
}

pub mod mock;
