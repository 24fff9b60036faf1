//! Yahoo Finance equity bars.
//!
//! Daily OHLCV from the v8 chart API. Timestamps are UTC session opens; they
//! are shifted by the exchange `gmtoffset` from the response metadata so each
//! bar lands on its exchange-local trading date.

use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use super::http_retry::{RetryPolicy, build_client, get_json};
use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
}

impl YahooAdapter {
    pub fn new() -> Result<Self, EngineError> {
        Ok(Self {
            client: build_client(Duration::from_secs(30))?,
            retry: RetryPolicy::default(),
        })
    }

    fn query(start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
        let start_ts = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp());
        let end_ts = end.and_hms_opt(23, 59, 59).map(|t| t.and_utc().timestamp());
        vec![
            ("period1", start_ts.unwrap_or_default().to_string()),
            ("period2", end_ts.unwrap_or_default().to_string()),
            ("interval", "1d".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ]
    }
}

fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, EngineError> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) => {
            EngineError::data_unavailable(symbol, format!("{}: {}", err.code, err.description))
        }
        None => EngineError::data_unavailable(symbol, "empty result with no error"),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::data_unavailable(symbol, "result array is empty"))?;

    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::data_unavailable(symbol, "no quote data"))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| {
                EngineError::data_unavailable(symbol, format!("invalid timestamp {ts}"))
            })?;

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();

        // holidays and halted sessions come back as all-null rows
        let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close) else {
            continue;
        };

        bars.push(Bar {
            symbol: symbol.to_string(),
            date,
            open,
            high,
            low,
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0.0),
        });
    }

    if bars.is_empty() {
        return Err(EngineError::data_unavailable(symbol, "no bars in range"));
    }
    Ok(bars)
}

impl DataPort for YahooAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, EngineError> {
        let url = format!("{CHART_URL}/{symbol}");
        let chart: ChartResponse = get_json(
            &self.client,
            &url,
            &Self::query(start_date, end_date),
            symbol,
            &self.retry,
        )?;
        parse_response(symbol, chart)
    }
}
