//! Report export port trait.

use std::path::Path;

use crate::domain::error::EngineError;
use crate::domain::report::AnalysisReport;

/// Port for persisting an assembled analysis.
pub trait ReportPort {
    fn write(&self, report: &AnalysisReport, output_path: &Path) -> Result<(), EngineError>;
}
