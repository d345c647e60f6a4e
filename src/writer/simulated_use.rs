//! Periodic sampler for the simulated-use test.
//!
//! One row per sample: elapsed seconds since the recorded start, whether a
//! draw is currently running, the calibrated temperature of every DAQ
//! channel, relative humidity, then watts, energy, volts, amps from the
//! power meter, in that order.

use crate::error::BenchResult;
use crate::instrument::{Daq, HumiditySensor, PowerMeter};
use crate::pace::Sleeper;
use crate::writer::DataWriter;
use log::warn;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct SimulatedUseWriter {
    inner: DataWriter,
    daq: Arc<Daq>,
    humidity: HumiditySensor,
    power: PowerMeter,
    drawing: Arc<AtomicBool>,
    recording: Arc<AtomicBool>,
    sleeper: Arc<dyn Sleeper>,
}

impl SimulatedUseWriter {
    pub fn open(
        path: &Path,
        headers: &[String],
        daq: Arc<Daq>,
        humidity: HumiditySensor,
        power: PowerMeter,
        sleeper: Arc<dyn Sleeper>,
    ) -> BenchResult<Self> {
        Ok(Self {
            inner: DataWriter::open(path, &["Time"], headers)?,
            daq,
            humidity,
            power,
            drawing: Arc::new(AtomicBool::new(false)),
            recording: Arc::new(AtomicBool::new(true)),
            sleeper,
        })
    }

    /// Flag a concurrently running draw task flips while it holds the
    /// draw solenoid open.
    pub fn drawing_flag(&self) -> Arc<AtomicBool> {
        self.drawing.clone()
    }

    pub fn set_drawing(&self, drawing: bool) {
        self.drawing.store(drawing, Ordering::Relaxed);
    }

    /// Cooperative stop flag for [`gather_data`]; checked once per loop
    /// iteration, so stopping is not instantaneous.
    ///
    /// [`gather_data`]: SimulatedUseWriter::gather_data
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.recording.clone()
    }

    pub fn stop(&self) {
        self.recording.store(false, Ordering::Relaxed);
    }

    /// Captures one row.
    pub async fn read_data(&mut self) -> BenchResult<()> {
        let elapsed = self.inner.elapsed_secs();
        let drawing = self.drawing.load(Ordering::Relaxed);
        let temps = self.daq.read_calibrated().await?;
        let rh = self.humidity.relative_humidity().await?;
        let power = [
            self.power.read_watts().await?,
            self.power.read_energy().await?,
            self.power.read_volts().await?,
            self.power.read_amps().await?,
        ];
        let mut fields = vec![elapsed.to_string(), drawing.to_string()];
        fields.extend(temps.iter().map(f64::to_string));
        fields.push(rh.to_string());
        fields.extend(power.iter().map(f64::to_string));
        self.inner.write_row(&fields)
    }

    /// Samples every `interval` until the stop flag is cleared. Transient
    /// acquisition errors are logged and the cadence continues.
    pub async fn gather_data(&mut self, interval: Duration) -> BenchResult<()> {
        while self.recording.load(Ordering::Relaxed) {
            if let Err(e) = self.read_data().await {
                if e.is_transient() {
                    warn!("sample failed, continuing: {e}");
                } else {
                    return Err(e);
                }
            }
            self.sleeper.sleep(interval).await;
        }
        self.inner.flush()?;
        Ok(())
    }

    pub fn reset_clock(&mut self) {
        self.inner.reset_clock();
    }

    pub fn flush(&mut self) -> BenchResult<()> {
        self.inner.flush()
    }
}
