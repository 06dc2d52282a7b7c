//! Report writers

use crate::report::{AggregatedReport, DailyRecord};

pub mod csv;

pub use self::csv::CsvReportWriter;

/// File name used when only an output directory is given
pub const DEFAULT_OUTPUT_FILE: &str = "aggregated_data.csv";

/// Metric columns written when no record arrives to define the header
pub const DEFAULT_METRIC_COLUMNS: [&str; 3] = ["clicks", "impressions", "cost"];

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Destination could not be created, written or synced
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    CsvError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Sink for an aggregated report
pub trait ReportWriter {
    /// Write one day
    fn write_record(&mut self, record: &DailyRecord) -> OutputResult<()>;

    /// Write every day of a report in order
    fn write_report(&mut self, report: &AggregatedReport) -> OutputResult<()> {
        for record in report.records() {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}
