//! Append-only CSV data writers.
//!
//! All procedure writers share one file-lifecycle contract, implemented by
//! [`DataWriter`]: if the target file does not exist it is created and a
//! header row is written exactly once; if it exists the writer appends and
//! writes no header, so a restarted run resumes a file without corrupting
//! it. Every data row starts with a local wall-clock timestamp and every
//! field is quoted, tolerating embedded delimiters.

pub mod calibration;
pub mod draw;
pub mod simulated_use;

pub use calibration::CalibrationWriter;
pub use draw::DrawWriter;
pub use simulated_use::SimulatedUseWriter;

use crate::error::BenchResult;
use chrono::Local;
use log::info;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Shared file lifecycle and row formatting for the writer family.
pub struct DataWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    /// Origin for relative-elapsed-time columns, independent of file state.
    start: Instant,
    rows_written: u64,
}

impl DataWriter {
    /// Opens (or creates) the file at `path`.
    ///
    /// `leading` holds the fixed leading header labels (`"Time"`, and for
    /// some variants also `"PRT"`); `headers` the caller-supplied column
    /// names. The header row is written only when the file is newly
    /// created.
    pub fn open(path: &Path, leading: &[&str], headers: &[String]) -> BenchResult<Self> {
        let file_already_exists = path.is_file();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(file);
        info!("writing to: {}", path.display());
        if file_already_exists {
            info!("appending to existing file");
        } else {
            info!("creating new file, writing CSV headers");
            let header_row: Vec<&str> = leading
                .iter()
                .copied()
                .chain(headers.iter().map(String::as_str))
                .collect();
            writer.write_record(&header_row)?;
            writer.flush()?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            start: Instant::now(),
            rows_written: 0,
        })
    }

    /// Appends one row, prepending the current local timestamp.
    pub fn write_row<I, S>(&mut self, fields: I) -> BenchResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let record: Vec<String> = std::iter::once(timestamp)
            .chain(fields.into_iter().map(|f| f.as_ref().to_string()))
            .collect();
        self.writer.write_record(&record)?;
        self.rows_written += 1;
        info!(
            "row #{} written to {}",
            self.rows_written,
            self.path.display()
        );
        Ok(())
    }

    /// Resets the elapsed-time origin. File state is untouched.
    pub fn reset_clock(&mut self) {
        self.start = Instant::now();
    }

    /// Seconds since construction or the last [`reset_clock`].
    ///
    /// [`reset_clock`]: DataWriter::reset_clock
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Number of data rows written by this instance.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flushes buffered rows to disk.
    pub fn flush(&mut self) -> BenchResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
