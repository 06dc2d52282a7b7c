//! CSV report writer
//!
//! The header is `date` followed by the metric keys of the first record, in
//! that record's order. Later rows are written against that header: a missing
//! metric becomes an empty cell, an unknown one is ignored. A report with no
//! records still gets the full default header.

use csv::Writer;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{OutputError, OutputResult, ReportWriter, DEFAULT_METRIC_COLUMNS};
use crate::range::DATE_FORMAT;
use crate::report::DailyRecord;

const DEFAULT_BUFFER_SIZE: usize = 8192;
const DATE_COLUMN: &str = "date";

/// CSV writer for aggregated reports
pub struct CsvReportWriter {
    writer: Writer<BufWriter<File>>,
    path: PathBuf,
    header: Option<Vec<String>>,
    rows_written: u64,
}

impl CsvReportWriter {
    /// Create the destination file (and missing parent directories)
    ///
    /// # Errors
    /// [`OutputError::IoError`] if the destination cannot be opened for writing
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;

        Ok(Self {
            writer: Writer::from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file)),
            path: path.to_path_buf(),
            header: None,
            rows_written: 0,
        })
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far (header excluded)
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Metric columns, once the header has been written
    pub fn metric_columns(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    fn write_header(&mut self, metric_keys: Vec<String>) -> OutputResult<()> {
        let mut row = Vec::with_capacity(metric_keys.len() + 1);
        row.push(DATE_COLUMN.to_string());
        row.extend(metric_keys.iter().cloned());

        self.writer
            .write_record(&row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;
        debug!(columns = ?row, "CSV header written");

        self.header = Some(metric_keys);
        Ok(())
    }
}

impl ReportWriter for CsvReportWriter {
    fn write_record(&mut self, record: &DailyRecord) -> OutputResult<()> {
        if self.header.is_none() {
            self.write_header(record.metrics.keys().map(str::to_string).collect())?;
        }
        let columns = self.header.as_deref().unwrap_or_default();

        let unknown: Vec<&str> = record
            .metrics
            .keys()
            .filter(|key| !columns.iter().any(|c| c == key))
            .collect();
        if !unknown.is_empty() {
            warn!(
                date = %record.date,
                ignored = ?unknown,
                "Metrics not in header were dropped"
            );
        }

        let mut row = Vec::with_capacity(columns.len() + 1);
        row.push(record.date.format(DATE_FORMAT).to_string());
        row.extend(columns.iter().map(|key| {
            record
                .metrics
                .get(key)
                .map(|value| value.to_string())
                .unwrap_or_default()
        }));

        self.writer
            .write_record(&row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {e}")))?;
        self.rows_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::IoError(format!("Failed to flush: {e}")))
    }

    fn close(mut self) -> OutputResult<()> {
        if self.header.is_none() {
            self.write_header(DEFAULT_METRIC_COLUMNS.iter().map(|c| c.to_string()).collect())?;
        }

        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {e}")))?;
        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {e}")))?;
        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {e}")))?;

        info!(
            "CSV writer closed successfully: {} rows written to {}",
            self.rows_written,
            self.path.display()
        );
        Ok(())
    }
}
