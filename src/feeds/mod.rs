use crate::models::AssetQuote;
use async_trait::async_trait;

pub mod coingecko;
pub mod cycles;

pub use coingecko::CoinGeckoClient;
pub use cycles::CyclesClient;

/// Upstream market data: one snapshot per call
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the current top assets by market cap
    async fn fetch(&self) -> Result<Vec<AssetQuote>, FetchError>;
}

/// Downstream ingestion: one data point per call
#[async_trait]
pub trait StreamSink: Send + Sync {
    /// Upsert a single value under `stream_id` at `timestamp`
    async fn send(&self, stream_id: &str, value: f64, timestamp: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("market data request returned HTTP {0}")]
    Status(u16),
    #[error("market data request failed: {0}")]
    Transport(String),
    #[error("could not decode market data: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether the upstream API actually received the request
    pub fn reached_api(&self) -> bool {
        !matches!(self, FetchError::Transport(_))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to send {stream_id}: HTTP {status}")]
    Status { stream_id: String, status: u16 },
    #[error("error sending {stream_id}: {message}")]
    Transport { stream_id: String, message: String },
}
