//! Writer for the set-point calibration procedure.

use crate::error::BenchResult;
use crate::instrument::{Daq, Prt};
use crate::pace::{RetryPolicy, Sleeper};
use crate::writer::DataWriter;
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Collects timed batches of PRT + uncalibrated DAQ readings.
///
/// The header row is `Time, PRT, <channel headers...>`; each data row is
/// the reference temperature followed by the raw reading of every
/// configured DAQ channel.
pub struct CalibrationWriter {
    inner: DataWriter,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl CalibrationWriter {
    pub fn open(path: &Path, headers: &[String], sleeper: Arc<dyn Sleeper>) -> BenchResult<Self> {
        Ok(Self {
            inner: DataWriter::open(path, &["Time", "PRT"], headers)?,
            retry: RetryPolicy::unlimited(),
            sleeper,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Collects exactly `reads` successful rows.
    ///
    /// A failed acquisition does not count toward `reads` and is retried
    /// immediately with no extra delay; only a successful row incurs the
    /// fixed `interval` wait. The stream is flushed once the batch
    /// completes, so the data is durable before the caller moves the bath.
    pub async fn collect_data(
        &mut self,
        prt: &Prt,
        daq: &Daq,
        reads: u32,
        interval: Duration,
    ) -> BenchResult<()> {
        info!(
            "collecting data: {reads} readings at {}s intervals",
            interval.as_secs()
        );
        let mut successful = 0u32;
        let mut failures = 0u32;
        while successful < reads {
            let row = match self.acquire(prt, daq).await {
                Ok(row) => row,
                Err(e) if e.is_transient() => {
                    failures += 1;
                    warn!("read error, retrying: {e}");
                    if self.retry.exhausted(failures) {
                        return Err(crate::error::BenchError::RetriesExhausted(failures));
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.inner.write_row(&row)?;
            successful += 1;
            info!("read #{successful} successful");
            self.sleeper.sleep(interval).await;
        }
        self.inner.flush()?;
        info!("data collection complete");
        Ok(())
    }

    async fn acquire(&self, prt: &Prt, daq: &Daq) -> BenchResult<Vec<String>> {
        let reference = prt.read_temp().await?;
        let raw = daq.read_uncalibrated().await?;
        let mut row = Vec::with_capacity(raw.len() + 1);
        row.push(reference.to_string());
        row.extend(raw.iter().map(f64::to_string));
        Ok(row)
    }

    pub fn reset_clock(&mut self) {
        self.inner.reset_clock();
    }
}
