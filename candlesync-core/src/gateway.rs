//! HTTP adapter for the local market-data gateway daemon.
//!
//! The gateway runs on the same host (default port 11111) and bridges the
//! brokerage connection; this client speaks its small JSON envelope over
//! blocking HTTP. One call fetches one page. Pacing, retry and pagination
//! all sit above, in the fetcher — this adapter only translates requests
//! and classifies failures.

use crate::domain::{Candle, FetchRequest, PageCursor};
use crate::source::{CandlePage, HistorySource, SourceError};
use chrono::DateTime;
use serde::Deserialize;
use std::time::Duration;

/// Connection settings for the gateway daemon.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11111,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Gateway history response envelope.
#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    status: String,
    code: Option<String>,
    message: Option<String>,
    candles: Option<Vec<WireCandle>>,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireCandle {
    /// Epoch milliseconds.
    ts: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
    turnover: f64,
}

/// Blocking HTTP client for the gateway's history endpoint.
pub struct GatewayClient {
    config: GatewayConfig,
    client: reqwest::blocking::Client,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build HTTP client");

        Self { config, client }
    }

    /// Build the history endpoint URL for one page request.
    fn history_url(
        &self,
        request: &FetchRequest,
        cursor: Option<&PageCursor>,
        max_count: usize,
    ) -> String {
        let mut url = format!(
            "http://{}:{}/history?symbol={}&start={}&end={}&granularity={}&adjustment={}&max_count={max_count}",
            self.config.host,
            self.config.port,
            request.symbol,
            request.start,
            request.end,
            request.granularity.tag(),
            request.adjustment.as_param(),
        );
        if let Some(cursor) = cursor {
            url.push_str("&cursor=");
            url.push_str(cursor.as_str());
        }
        url
    }

    /// Map the envelope into a page or a classified error.
    fn parse_envelope(envelope: HistoryEnvelope) -> Result<CandlePage, SourceError> {
        if envelope.status != "ok" {
            let message = envelope.message.unwrap_or_else(|| "unspecified".to_string());
            return Err(match envelope.code.as_deref() {
                Some("rate_limited") => SourceError::RateLimited(message),
                Some("invalid_request") => SourceError::InvalidRequest(message),
                Some("unsupported_granularity") => SourceError::UnsupportedGranularity(message),
                // Unclassified gateway-side failures are worth retrying.
                _ => SourceError::Unavailable(message),
            });
        }

        let wire = envelope.candles.unwrap_or_default();
        let mut candles = Vec::with_capacity(wire.len());
        for row in wire {
            let ts = DateTime::from_timestamp_millis(row.ts)
                .ok_or_else(|| SourceError::Protocol(format!("invalid timestamp: {}", row.ts)))?
                .naive_utc();
            candles.push(Candle {
                ts,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
                turnover: row.turnover,
            });
        }

        Ok(CandlePage {
            candles,
            next: envelope.next_cursor.map(PageCursor::new),
        })
    }
}

impl HistorySource for GatewayClient {
    fn name(&self) -> &str {
        "gateway"
    }

    fn request_history(
        &self,
        request: &FetchRequest,
        cursor: Option<&PageCursor>,
        max_count: usize,
    ) -> Result<CandlePage, SourceError> {
        let url = self.history_url(request, cursor, max_count);

        let resp = self.client.get(&url).send().map_err(|e| {
            // Connect failures and timeouts clear up when the gateway comes
            // back; treat every transport error as retryable.
            SourceError::Unavailable(e.to_string())
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited(format!(
                "HTTP 429 for {}",
                request.symbol
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "HTTP {status} for {}",
                request.symbol
            )));
        }

        let envelope: HistoryEnvelope = resp.json().map_err(|e| {
            SourceError::Protocol(format!(
                "failed to parse response for {}: {e}",
                request.symbol
            ))
        })?;

        Self::parse_envelope(envelope)
    }
}
