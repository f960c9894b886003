use super::{FetchError, PriceSource};
use crate::models::{quotes_from_records, AssetQuote, MarketRecord};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MARKETS_URL: &str = "https://api.coingecko.com/api/v3/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=10&page=1&sparkline=false";

/// Market data client for the CoinGecko markets endpoint
pub struct CoinGeckoClient {
    client: reqwest::Client,
    markets_url: String,
}

impl CoinGeckoClient {
    pub fn new(markets_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("crypto-cycles/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            markets_url: markets_url.into(),
        })
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch(&self) -> Result<Vec<AssetQuote>, FetchError> {
        let response = self
            .client
            .get(&self.markets_url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        // Read the body first so decode errors can show what came back
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        let records: Vec<MarketRecord> = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            FetchError::Decode(format!("{} (response: {})", e, preview))
        })?;

        let (quotes, skipped) = quotes_from_records(records);
        for id in &skipped {
            warn!("Skipping {}: missing required fields", id);
        }

        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> CoinGeckoClient {
        let url = format!(
            "{}/api/v3/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=10&page=1&sparkline=false",
            server.uri()
        );
        CoinGeckoClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_parses_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/coins/markets"))
            .and(query_param("order", "market_cap_desc"))
            .and(query_param("per_page", "10"))
            .and(query_param("sparkline", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "current_price": 65000.5},
                {"id": "ethereum", "symbol": "eth", "name": "Ethereum", "current_price": 3000},
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let quotes = client_for(&server).await.fetch().await.unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(
            quotes[0],
            AssetQuote {
                id: "bitcoin".to_string(),
                symbol: "btc".to_string(),
                name: "Bitcoin".to_string(),
                price: 65000.5,
            }
        );
        assert_eq!(quotes[1].price, 3000.0);
    }

    #[tokio::test]
    async fn test_fetch_skips_incomplete_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "current_price": 65000.5},
                {"id": "mystery", "symbol": "mys", "name": "Mystery", "current_price": null},
                {"id": "anon", "current_price": 1.0},
            ])))
            .mount(&server)
            .await;

        let quotes = client_for(&server).await.fetch().await.unwrap();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].symbol, "btc");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch().await.unwrap_err();

        assert_eq!(err, FetchError::Status(429));
        assert!(err.reached_api());
    }

    #[tokio::test]
    async fn test_fetch_bad_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"status\": \"maintenance\"}"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.fetch().await.unwrap_err();

        assert!(matches!(err, FetchError::Decode(ref msg) if msg.contains("maintenance")));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_transport_error() {
        // nothing listens on port 1
        let client =
            CoinGeckoClient::new("http://127.0.0.1:1/api/v3/coins/markets", Duration::from_secs(2))
                .unwrap();
        let err = client.fetch().await.unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)));
        assert!(!err.reached_api());
    }
}
