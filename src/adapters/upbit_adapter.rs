//! Upbit crypto candles.
//!
//! The candles endpoint returns at most 200 candles per call, newest first,
//! strictly before the `to` cursor. Pages are walked backward from the end of
//! the requested range until the start date is covered. Candle times come from
//! `candle_date_time_kst`, so daily bars follow the exchange's KST calendar.

use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use super::http_retry::{RetryPolicy, build_client, get_json};
use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;
use crate::domain::resample::{CandleInterval, IntradayBar, resample_daily};
use crate::ports::data_port::DataPort;

const CANDLES_URL: &str = "https://api.upbit.com/v1/candles";
const PAGE_SIZE: usize = 200;
const MAX_PAGES: usize = 500;
const KST_OFFSET_SECS: i32 = 9 * 3600;

#[derive(Debug, Clone, Deserialize)]
struct Candle {
    candle_date_time_kst: NaiveDateTime,
    opening_price: f64,
    high_price: f64,
    low_price: f64,
    trade_price: f64,
    candle_acc_trade_volume: f64,
}

impl From<Candle> for IntradayBar {
    fn from(c: Candle) -> Self {
        IntradayBar {
            timestamp: c.candle_date_time_kst,
            open: c.opening_price,
            high: c.high_price,
            low: c.low_price,
            close: c.trade_price,
            volume: c.candle_acc_trade_volume,
        }
    }
}

pub struct UpbitAdapter {
    client: reqwest::blocking::Client,
    interval: CandleInterval,
    retry: RetryPolicy,
    page_delay: Duration,
}

impl UpbitAdapter {
    pub fn new(interval: CandleInterval) -> Result<Self, EngineError> {
        Ok(Self {
            client: build_client(Duration::from_secs(10))?,
            interval,
            retry: RetryPolicy::default(),
            page_delay: Duration::from_millis(110),
        })
    }

    fn endpoint(&self) -> String {
        match self.interval {
            CandleInterval::Day => format!("{CANDLES_URL}/days"),
            CandleInterval::Minutes(unit) => format!("{CANDLES_URL}/minutes/{unit}"),
        }
    }

    fn fetch_page(&self, symbol: &str, cursor: NaiveDateTime) -> Result<Vec<Candle>, EngineError> {
        let to = kst_cursor(cursor).ok_or_else(|| {
            EngineError::data_unavailable(symbol, format!("cursor {cursor} has no KST time"))
        })?;
        let query = [
            ("market", symbol.to_string()),
            ("to", to),
            ("count", PAGE_SIZE.to_string()),
        ];
        get_json(&self.client, &self.endpoint(), &query, symbol, &self.retry)
    }
}

/// `to` parameter for a cursor read on the KST wall clock.
fn kst_cursor(cursor: NaiveDateTime) -> Option<String> {
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS)?;
    cursor
        .and_local_timezone(kst)
        .single()
        .map(|t| t.to_rfc3339())
}

/// Walk pages backward from the day after `end` until a page reaches before
/// `start`, comes back short, or is empty. Running out of pages first is an
/// error, not a truncated range.
fn collect_candles<F>(
    symbol: &str,
    mut fetch_page: F,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Candle>, EngineError>
where
    F: FnMut(NaiveDateTime) -> Result<Vec<Candle>, EngineError>,
{
    let mut cursor = end
        .succ_opt()
        .unwrap_or(end)
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default();
    let mut candles = Vec::new();

    for page_no in 0..MAX_PAGES {
        let page = fetch_page(cursor)?;
        let Some(oldest) = page.iter().map(|c| c.candle_date_time_kst).min() else {
            return Ok(candles);
        };
        let full = page.len() >= PAGE_SIZE;
        debug!(page = page_no, candles = page.len(), %oldest, "candle page");
        candles.extend(page);

        if !full || oldest.date() < start || oldest >= cursor {
            return Ok(candles);
        }
        cursor = oldest;
    }

    Err(EngineError::data_unavailable(
        symbol,
        format!(
            "{MAX_PAGES} pages reached back only to {cursor}, short of {start}; use a coarser crypto_interval"
        ),
    ))
}

impl DataPort for UpbitAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, EngineError> {
        let mut first = true;
        let candles = collect_candles(
            symbol,
            |cursor| {
                if !first {
                    std::thread::sleep(self.page_delay);
                }
                first = false;
                self.fetch_page(symbol, cursor)
            },
            start_date,
            end_date,
        )?;

        if candles.is_empty() {
            return Err(EngineError::data_unavailable(symbol, "no candles returned"));
        }
        let intraday = candles.into_iter().map(IntradayBar::from).collect();
        Ok(resample_daily(symbol, intraday))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: NaiveDateTime) -> Candle {
        Candle {
            candle_date_time_kst: ts,
            opening_price: 100.0,
            high_price: 110.0,
            low_price: 90.0,
            trade_price: 105.0,
            candle_acc_trade_volume: 1.0,
        }
    }

    fn at(date: NaiveDate) -> NaiveDateTime {
        date.and_hms_opt(9, 0, 0).unwrap()
    }

    /// Daily candles newest first, strictly before `cursor`, from a fixed series.
    fn paged(series: &[NaiveDate], cursor: NaiveDateTime) -> Vec<Candle> {
        series
            .iter()
            .rev()
            .map(|&d| at(d))
            .filter(|ts| *ts < cursor)
            .take(PAGE_SIZE)
            .map(candle)
            .collect()
    }

    #[test]
    fn parses_api_candle() {
        let json = r#"[{
            "market":"KRW-BTC",
            "candle_date_time_utc":"2024-01-01T00:00:00",
            "candle_date_time_kst":"2024-01-01T09:00:00",
            "opening_price":57000000.0,
            "high_price":58000000.0,
            "low_price":56500000.0,
            "trade_price":57800000.0,
            "timestamp":1704153599000,
            "candle_acc_trade_price":1.0e11,
            "candle_acc_trade_volume":1712.5,
            "prev_closing_price":57000000.0,
            "change_price":800000.0,
            "change_rate":0.014
        }]"#;
        let candles: Vec<Candle> = serde_json::from_str(json).unwrap();
        let bar = IntradayBar::from(candles[0].clone());
        assert_eq!(bar.timestamp.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(bar.close, 57800000.0);
        assert_eq!(bar.volume, 1712.5);
    }

    #[test]
    fn pages_back_until_start_is_covered() {
        let first = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let series: Vec<NaiveDate> = (0..500).map(|i| first + chrono::Duration::days(i)).collect();
        let start = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        let end = *series.last().unwrap();

        let mut calls = 0;
        let candles = collect_candles(
            "KRW-BTC",
            |cursor| {
                calls += 1;
                Ok(paged(&series, cursor))
            },
            start,
            end,
        )
        .unwrap();

        // start sits 440 days back; the third page comes back short
        assert_eq!(calls, 3);
        assert!(candles.iter().any(|c| c.candle_date_time_kst.date() <= start));
        let mut dates: Vec<NaiveDate> = candles.iter().map(|c| c.candle_date_time_kst.date()).collect();
        dates.dedup();
        assert_eq!(dates.len(), candles.len());
    }

    #[test]
    fn short_page_ends_paging() {
        let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series: Vec<NaiveDate> = (0..50).map(|i| first + chrono::Duration::days(i)).collect();

        let mut calls = 0;
        let candles = collect_candles(
            "KRW-BTC",
            |cursor| {
                calls += 1;
                Ok(paged(&series, cursor))
            },
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            *series.last().unwrap(),
        )
        .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(candles.len(), 50);
    }

    #[test]
    fn empty_page_yields_nothing() {
        let candles = collect_candles(
            "KRW-BTC",
            |_| Ok(Vec::new()),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
        .unwrap();
        assert!(candles.is_empty());
    }

    #[test]
    fn page_errors_propagate() {
        let result = collect_candles(
            "KRW-XYZ",
            |_| Err(EngineError::data_unavailable("KRW-XYZ", "HTTP 400 Bad Request")),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );
        assert!(matches!(result, Err(EngineError::DataUnavailable { .. })));
    }

    #[test]
    fn page_cap_before_start_is_data_unavailable() {
        // one-minute candles: 500 pages cover about 69 days
        let mut calls = 0;
        let result = collect_candles(
            "KRW-BTC",
            |cursor| {
                calls += 1;
                Ok((1..=PAGE_SIZE as i64)
                    .map(|i| candle(cursor - chrono::Duration::minutes(i)))
                    .collect())
            },
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );

        assert_eq!(calls, MAX_PAGES);
        match result {
            Err(EngineError::DataUnavailable { symbol, reason }) => {
                assert_eq!(symbol, "KRW-BTC");
                assert!(reason.contains("2024-01-01"));
            }
            other => panic!("expected DataUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn cursor_carries_kst_offset() {
        let cursor = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(kst_cursor(cursor).unwrap(), "2024-01-02T00:00:00+09:00");
    }
}
