#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rhythmsphere::domain::error::EngineError;
pub use rhythmsphere::domain::ohlcv::Bar;
use rhythmsphere::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
    pub delays: HashMap<String, std::time::Duration>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            delays: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_delay(mut self, symbol: &str, delay: std::time::Duration) -> Self {
        self.delays.insert(symbol.to_string(), delay);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<Bar>, EngineError> {
        if let Some(delay) = self.delays.get(symbol) {
            std::thread::sleep(*delay);
        }
        if let Some(reason) = self.errors.get(symbol) {
            return Err(EngineError::data_unavailable(symbol, reason.clone()));
        }
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| EngineError::data_unavailable(symbol, "symbol not found"))
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn make_bar(symbol: &str, date: NaiveDate, open: f64, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        date,
        open,
        high: open.max(close) + 1.0,
        low: open.min(close) - 1.0,
        close,
        volume: 1_000.0,
    }
}

/// Daily bars whose closes follow `closes`, each opening at the prior close.
pub fn bars_from_closes(symbol: &str, start: NaiveDate, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            make_bar(symbol, start + Duration::days(i as i64), open, close)
        })
        .collect()
}

/// Sine-wave closes around 100, so swings form every half period.
pub fn wave_bars(symbol: &str, start: NaiveDate, n: usize, period: f64, amplitude: f64) -> Vec<Bar> {
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + amplitude * (2.0 * std::f64::consts::PI * i as f64 / period).sin())
        .collect();
    bars_from_closes(symbol, start, &closes)
}
