use serde::{Deserialize, Serialize};

pub type StreamId = String;

const STREAM_ID_SUFFIX: &str = "_PRICE";
const UPSERT: &str = "UPSERT";

/// One asset record from the market-data snapshot, after required fields were checked
#[derive(Debug, Clone, PartialEq)]
pub struct AssetQuote {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: f64,
}

impl AssetQuote {
    pub fn stream_id(&self) -> StreamId {
        stream_id(&self.symbol)
    }
}

/// Raw record as returned by the markets endpoint.
/// Anything beyond these fields is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
}

impl MarketRecord {
    /// Convert into a quote, or `None` when symbol, name or price is missing
    pub fn into_quote(self) -> Option<AssetQuote> {
        let symbol = self.symbol.filter(|s| !s.trim().is_empty())?;
        let name = self.name.filter(|n| !n.trim().is_empty())?;
        let price = self.current_price?;

        Some(AssetQuote {
            id: self.id.unwrap_or_else(|| symbol.to_lowercase()),
            symbol,
            name,
            price,
        })
    }
}

/// Split a snapshot into usable quotes and the ids of skipped records
pub fn quotes_from_records(records: Vec<MarketRecord>) -> (Vec<AssetQuote>, Vec<String>) {
    let mut quotes = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for record in records {
        let label = record
            .id
            .clone()
            .or_else(|| record.symbol.clone())
            .unwrap_or_else(|| "<unknown>".to_string());

        match record.into_quote() {
            Some(quote) => quotes.push(quote),
            None => skipped.push(label),
        }
    }

    (quotes, skipped)
}

/// Stream identifier for a symbol: uppercase symbol plus `_PRICE`
pub fn stream_id(symbol: &str) -> StreamId {
    format!("{}{}", symbol.trim().to_uppercase(), STREAM_ID_SUFFIX)
}

/// Single-point upsert body accepted by the ingestion endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamPayload {
    pub streamid: StreamId,
    pub messagetype: String,
    pub dates: Vec<String>,
    pub values: Vec<f64>,
}

impl StreamPayload {
    pub fn upsert(stream_id: &str, value: f64, timestamp: &str) -> Self {
        Self {
            streamid: stream_id.to_string(),
            messagetype: UPSERT.to_string(),
            dates: vec![timestamp.to_string()],
            values: vec![value],
        }
    }
}
