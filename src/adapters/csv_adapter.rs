//! CSV file data adapter.
//!
//! Reads `{base}/{symbol}.csv` with header `date,open,high,low,close,volume`.
//! Date cells are `YYYY-MM-DD` for daily rows or `YYYY-MM-DD HH:MM:SS` (also
//! with a `T` separator) for intraday rows, which are resampled to daily bars.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;
use crate::domain::resample::{IntradayBar, resample_daily};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

enum RowTime {
    Daily(NaiveDate),
    Intraday(NaiveDateTime),
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

fn parse_time(cell: &str) -> Option<RowTime> {
    let cell = cell.trim();
    if let Ok(date) = NaiveDate::parse_from_str(cell, "%Y-%m-%d") {
        return Some(RowTime::Daily(date));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        .map(RowTime::Intraday)
}

fn field(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    symbol: &str,
) -> Result<f64, EngineError> {
    let cell = record
        .get(idx)
        .ok_or_else(|| EngineError::data_unavailable(symbol, format!("missing {name} column")))?;
    cell.trim().parse().map_err(|e| {
        EngineError::data_unavailable(symbol, format!("invalid {name} value '{cell}': {e}"))
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, EngineError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| {
            EngineError::data_unavailable(
                symbol,
                format!("failed to read {}: {}", path.display(), e),
            )
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut daily = Vec::new();
        let mut intraday = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| {
                EngineError::data_unavailable(symbol, format!("CSV parse error: {e}"))
            })?;

            let cell = record
                .get(0)
                .ok_or_else(|| EngineError::data_unavailable(symbol, "missing date column"))?;
            let time = parse_time(cell).ok_or_else(|| {
                EngineError::data_unavailable(symbol, format!("invalid date '{cell}'"))
            })?;

            let date = match &time {
                RowTime::Daily(d) => *d,
                RowTime::Intraday(ts) => ts.date(),
            };
            if date < start_date || date > end_date {
                continue;
            }

            let open = field(&record, 1, "open", symbol)?;
            let high = field(&record, 2, "high", symbol)?;
            let low = field(&record, 3, "low", symbol)?;
            let close = field(&record, 4, "close", symbol)?;
            let volume = field(&record, 5, "volume", symbol)?;

            match time {
                RowTime::Daily(date) => daily.push(Bar {
                    symbol: symbol.to_string(),
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                }),
                RowTime::Intraday(timestamp) => intraday.push(IntradayBar {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume,
                }),
            }
        }

        daily.extend(resample_daily(symbol, intraday));
        daily.sort_by_key(|b| b.date);
        Ok(daily)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("005930.KS.csv"), csv_content).unwrap();
        fs::write(
            path.join("KRW-BTC.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-15 09:00:00,100,120,95,110,1.5\n\
             2024-01-15 10:00:00,110,130,100,125,2.5\n\
             2024-01-16T09:00:00,125,126,115,120,1.0\n",
        )
        .unwrap();
        fs::write(
            path.join("BROKEN.csv"),
            "date,open,high,low,close,volume\n2024-01-15,abc,1,1,1,1\n",
        )
        .unwrap();

        (dir, path)
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn fetch_bars_returns_correct_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("005930.KS", d(15), d(17)).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, d(15));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000.0);
        assert_eq!(bars[0].symbol, "005930.KS");
    }

    #[test]
    fn fetch_bars_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("005930.KS", d(16), d(16)).unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, d(16));
    }

    #[test]
    fn intraday_rows_are_resampled() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("KRW-BTC", d(1), d(31)).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 130.0);
        assert_eq!(bars[0].low, 95.0);
        assert_eq!(bars[0].close, 125.0);
        assert_eq!(bars[0].volume, 4.0);
        assert_eq!(bars[1].date, d(16));
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_bars("XYZ", d(1), d(31));
        assert!(matches!(result, Err(EngineError::DataUnavailable { .. })));
    }

    #[test]
    fn bad_number_is_reported() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_bars("BROKEN", d(1), d(31)).unwrap_err();
        assert!(err.to_string().contains("invalid open value"));
    }
}
