//! JSON report adapter implementing ReportPort.
//!
//! Writes the request, current signal, cycle estimate, backtest result and the
//! plot series as one pretty-printed document.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::domain::analysis::AnalysisRequest;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::EngineError;
use crate::domain::fibonacci::{CycleEstimate, FibonacciLevel};
use crate::domain::report::{AnalysisReport, PlotSeries};
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct ReportDocument<'a> {
    request: &'a AnalysisRequest,
    buy_signal: bool,
    cycle_estimate: Option<CycleEstimate>,
    levels: &'a [FibonacciLevel],
    result: &'a BacktestResult,
    plot: PlotSeries,
}

pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, report: &AnalysisReport, output_path: &Path) -> Result<(), EngineError> {
        let document = ReportDocument {
            request: &report.request,
            buy_signal: report.buy_signal,
            cycle_estimate: report.cycle_estimate,
            levels: &report.levels,
            result: &report.result,
            plot: report.plot_series(),
        };

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(output_path)?);
        serde_json::to_writer_pretty(writer, &document)
            .map_err(|e| EngineError::Io(std::io::Error::other(e)))?;
        Ok(())
    }
}
