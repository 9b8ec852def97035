// src/market_data.rs
use crate::config::BriefConfig;
use crate::error::{BriefError, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Point-in-time read of one ticker. Fetched per query and never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteSnapshot {
    pub ticker: String,
    pub current: f64,
    pub previous_close: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
}

impl QuoteSnapshot {
    /// Rounds both prices to cents.
    pub fn new(ticker: &str, current: f64, previous_close: f64) -> Self {
        Self {
            ticker: ticker.to_string(),
            current: round_cents(current),
            previous_close: round_cents(previous_close),
            as_of: None,
        }
    }

    pub fn change(&self) -> f64 {
        round_cents(self.current - self.previous_close)
    }

    pub fn change_percent(&self) -> Option<f64> {
        if self.previous_close == 0.0 {
            return None;
        }
        Some(round_cents(self.change() / self.previous_close * 100.0))
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Any failure, including an empty result, comes back as `Err`.
    async fn fetch_quote(&self, ticker: &str) -> Result<QuoteSnapshot>;
}

/// Reads the Yahoo Finance chart endpoint.
pub struct YahooQuoteProvider {
    client: Client,
    base_url: String,
}

impl YahooQuoteProvider {
    pub fn new(config: &BriefConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: config.quote_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!(
            "{}/{}?range=1d&interval=1d",
            self.base_url,
            urlencoding::encode(ticker)
        )
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    async fn fetch_quote(&self, ticker: &str) -> Result<QuoteSnapshot> {
        let url = self.chart_url(ticker);
        debug!("Fetching quote: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Quote request for {} failed: {}", ticker, e);
            BriefError::QuoteUnavailable(format!("{}: {}", ticker, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Quote request for {} returned HTTP {}", ticker, status);
            return Err(BriefError::QuoteUnavailable(format!(
                "{}: HTTP {}",
                ticker, status
            )));
        }

        let body: ChartResponse = response.json().await.map_err(|e| {
            warn!("Quote response for {} could not be parsed: {}", ticker, e);
            BriefError::QuoteUnavailable(format!("{}: {}", ticker, e))
        })?;

        snapshot_from_chart(ticker, body)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

pub(crate) fn snapshot_from_chart(ticker: &str, body: ChartResponse) -> Result<QuoteSnapshot> {
    let unavailable = |reason: &str| BriefError::QuoteUnavailable(format!("{}: {}", ticker, reason));

    if let Some(err) = body.chart.error {
        return Err(unavailable(
            err.description.as_deref().unwrap_or("provider error"),
        ));
    }

    let result = body
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| unavailable("no data"))?;

    let closes: Vec<f64> = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .map(|q| q.close.into_iter().flatten().collect())
        .unwrap_or_default();

    let current = result
        .meta
        .regular_market_price
        .or_else(|| closes.last().copied())
        .ok_or_else(|| unavailable("no current price"))?;
    let previous_close = result
        .meta
        .chart_previous_close
        .or(result.meta.previous_close)
        .or_else(|| closes.first().copied())
        .ok_or_else(|| unavailable("no previous close"))?;

    let mut snapshot = QuoteSnapshot::new(ticker, current, previous_close);
    snapshot.as_of = result
        .meta
        .regular_market_time
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single());
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(ticker: &str, value: serde_json::Value) -> Result<QuoteSnapshot> {
        snapshot_from_chart(ticker, serde_json::from_value(value).unwrap())
    }

    #[test]
    fn reads_meta_prices_and_rounds() {
        let snap = parse(
            "AAPL",
            json!({"chart": {"result": [{
                "meta": {
                    "regularMarketPrice": 189.98765,
                    "chartPreviousClose": 187.004,
                    "regularMarketTime": 1_700_000_000
                },
                "indicators": {"quote": [{"close": [189.9]}]}
            }], "error": null}}),
        )
        .unwrap();
        assert_eq!(snap.ticker, "AAPL");
        assert_eq!(snap.current, 189.99);
        assert_eq!(snap.previous_close, 187.0);
        assert_eq!(snap.as_of.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(snap.change(), 2.99);
    }

    #[test]
    fn falls_back_to_close_series() {
        let snap = parse(
            "TSLA",
            json!({"chart": {"result": [{
                "meta": {},
                "indicators": {"quote": [{"close": [null, 240.111, 250.556, null]}]}
            }]}}),
        )
        .unwrap();
        assert_eq!(snap.current, 250.56);
        assert_eq!(snap.previous_close, 240.11);
        assert!(snap.as_of.is_none());
    }

    #[test]
    fn empty_result_is_unavailable() {
        let err = parse("ZZZZ", json!({"chart": {"result": [], "error": null}})).unwrap_err();
        assert!(matches!(err, BriefError::QuoteUnavailable(_)));

        let err = parse("ZZZZ", json!({"chart": {"result": null}})).unwrap_err();
        assert!(matches!(err, BriefError::QuoteUnavailable(_)));
    }

    #[test]
    fn missing_prices_are_unavailable() {
        let err = parse(
            "ZZZZ",
            json!({"chart": {"result": [{"meta": {}, "indicators": {"quote": [{"close": [null]}]}}]}}),
        )
        .unwrap_err();
        assert!(matches!(err, BriefError::QuoteUnavailable(_)));
    }

    #[test]
    fn provider_error_is_unavailable() {
        let err = parse(
            "BAD",
            json!({"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn change_percent_guards_zero() {
        assert_eq!(QuoteSnapshot::new("X", 1.0, 0.0).change_percent(), None);
        assert_eq!(QuoteSnapshot::new("X", 110.0, 100.0).change_percent(), Some(10.0));
    }

    #[test]
    fn chart_url_encodes_ticker() {
        let config = BriefConfig::new("sk-test".into()).unwrap();
        let provider = YahooQuoteProvider::new(&config).unwrap();
        assert_eq!(
            provider.chart_url("^GSPC"),
            "https://query1.finance.yahoo.com/v8/finance/chart/%5EGSPC?range=1d&interval=1d"
        );
    }
}
