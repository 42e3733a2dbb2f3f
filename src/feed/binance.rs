//! Binance push stream and batch ticker adapters

use super::error::{FeedError, ParseError};
use super::{ExchangeTicker, StreamConnector, TickerSource};
use crate::ws::{WsClient, WsConfig, WsConnection};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Binance combined-stream base URL
pub const BINANCE_STREAM_URL: &str = "wss://stream.binance.com:9443/stream";

/// Binance 24h ticker endpoint
pub const BINANCE_TICKER_URL: &str = "https://api.binance.com/api/v3/ticker/24hr";

/// Combined stream envelope
#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    /// Stream name (e.g., "btcusdt@ticker")
    #[allow(dead_code)]
    stream: String,
    data: StreamTicker,
}

/// 24h rolling window ticker payload
#[derive(Debug, Deserialize)]
struct StreamTicker {
    /// Symbol
    #[serde(rename = "s")]
    symbol: String,
    /// Last price
    #[serde(rename = "c")]
    last_price: String,
    /// Price change percent
    #[serde(rename = "P")]
    change_percent: String,
    /// Total traded base asset volume
    #[serde(rename = "v")]
    volume: String,
}

/// Entry of the batch ticker response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestTicker {
    symbol: String,
    last_price: String,
    price_change_percent: String,
    volume: String,
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, ParseError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::Number {
            field,
            value: value.to_string(),
        })
}

fn build_ticker(
    symbol: String,
    price: &str,
    change: &str,
    volume: &str,
) -> Result<ExchangeTicker, ParseError> {
    let price = parse_number("price", price)?;
    if price <= 0.0 {
        return Err(ParseError::NonPositivePrice(price));
    }

    Ok(ExchangeTicker {
        symbol: symbol.to_uppercase(),
        price,
        change_24h: parse_number("change", change)?,
        volume_24h: parse_number("volume", volume)?.max(0.0),
    })
}

/// Parse one combined-stream frame
pub fn parse_stream_message(msg: &str) -> Result<ExchangeTicker, ParseError> {
    let envelope: StreamEnvelope = serde_json::from_str(msg)?;
    let t = envelope.data;
    build_ticker(t.symbol, &t.last_price, &t.change_percent, &t.volume)
}

/// Parse a batch ticker body, skipping entries that fail to parse
pub fn parse_ticker_response(body: &str) -> Result<Vec<ExchangeTicker>, serde_json::Error> {
    let raw: Vec<RestTicker> = serde_json::from_str(body)?;

    Ok(raw
        .into_iter()
        .filter_map(|t| {
            let symbol = t.symbol.clone();
            build_ticker(t.symbol, &t.last_price, &t.price_change_percent, &t.volume)
                .map_err(|e| tracing::debug!(%symbol, error = %e, "Skipping malformed ticker"))
                .ok()
        })
        .collect())
}

/// Build the combined stream URL for the given symbols
pub fn build_stream_url(base: &str, symbols: &[String]) -> String {
    let streams: Vec<String> = symbols
        .iter()
        .map(|s| format!("{}@ticker", s.to_lowercase()))
        .collect();
    format!("{}?streams={}", base, streams.join("/"))
}

/// Push-stream connector for Binance `@ticker` streams
pub struct BinanceStream {
    base_url: String,
    connect_timeout: Duration,
}

impl BinanceStream {
    /// Create a connector for the public Binance endpoint
    pub fn new() -> Self {
        Self::with_url(BINANCE_STREAM_URL)
    }

    /// Create a connector for a custom endpoint
    pub fn with_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Set the handshake timeout
    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self
    }
}

impl Default for BinanceStream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamConnector for BinanceStream {
    async fn connect(&self, symbols: &[String]) -> Result<WsConnection, FeedError> {
        if symbols.is_empty() {
            return Err(FeedError::NoSymbols);
        }

        let url = build_stream_url(&self.base_url, symbols);
        tracing::info!(symbols = symbols.len(), "Subscribing to Binance ticker stream");

        let client = WsClient::new(WsConfig::new(url).connect_timeout(self.connect_timeout));
        Ok(client.connect().await?)
    }

    fn parse_message(&self, msg: &str) -> Result<ExchangeTicker, ParseError> {
        parse_stream_message(msg)
    }
}

/// Batch ticker source backed by the Binance REST API
pub struct BinanceRest {
    url: String,
    client: Client,
}

impl BinanceRest {
    /// Create a source for the public Binance endpoint
    pub fn new(timeout: Duration) -> Result<Self, FeedError> {
        Self::with_url(BINANCE_TICKER_URL, timeout)
    }

    /// Create a source for a custom endpoint
    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl TickerSource for BinanceRest {
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<ExchangeTicker>, FeedError> {
        if symbols.is_empty() {
            return Err(FeedError::NoSymbols);
        }

        let symbols_param = serde_json::to_string(symbols)?;
        tracing::debug!(url = %self.url, symbols = %symbols_param, "Fetching batch tickers");

        let response = self
            .client
            .get(&self.url)
            .query(&[("symbols", symbols_param.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Status { status, body });
        }

        let body = response.text().await?;
        Ok(parse_ticker_response(&body)?)
    }
}
