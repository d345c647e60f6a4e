//! Agilent 34970A data-acquisition unit.
//!
//! The DAQ multiplexes thermocouple channels, relay routing, a DC output
//! used by the flow valve, and single-channel voltage sense for the scale
//! and humidity sensor onto one bus session. Per-channel calibration is an
//! explicit `channel -> (gain, offset)` map applied as a pure function at
//! read time; unset channels read back raw (identity).

use crate::channel::Channel;
use crate::error::{BenchError, BenchResult};
use crate::instrument::{channel_list, TemperatureUnit};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Plausible thermocouple range; anything outside is a failed read.
const TEMP_RANGE: std::ops::Range<f64> = 0.0..100.0;

/// Linear per-channel correction applied as `gain * raw + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub gain: f64,
    pub offset: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
        }
    }
}

impl Calibration {
    pub fn new(gain: f64, offset: f64) -> Self {
        Self { gain, offset }
    }

    pub fn apply(self, raw: f64) -> f64 {
        self.gain * raw + self.offset
    }
}

pub struct Daq {
    channel: Arc<dyn Channel>,
    channels: RwLock<Vec<u16>>,
    calibrations: RwLock<HashMap<u16, Calibration>>,
}

impl Daq {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self {
            channel,
            channels: RwLock::new(Vec::new()),
            calibrations: RwLock::new(HashMap::new()),
        }
    }

    /// Configures the thermocouple channels to read from.
    pub async fn configure_channels(
        &self,
        channels: &[u16],
        units: TemperatureUnit,
    ) -> BenchResult<()> {
        let list = channel_list(channels);
        for config in [
            format!("CONF:TEMP TC,T,(@{list})"),
            format!("SENS:TEMP:TRAN:TC:RJUN:TYPE FIX,(@{list})"),
            format!("UNIT:TEMP {},(@{list})", units.code()),
        ] {
            self.channel.command(&config).await?;
            info!("DAQ config written: {config}");
        }
        *self.channels.write().await = channels.to_vec();
        info!("DAQ channels set to {channels:?}");
        Ok(())
    }

    /// Currently configured thermocouple channels.
    pub async fn channels(&self) -> Vec<u16> {
        self.channels.read().await.clone()
    }

    /// Sets the calibration constants for one channel. Other channels are
    /// unaffected.
    pub async fn set_calibration(&self, channel: u16, calibration: Calibration) {
        self.calibrations.write().await.insert(channel, calibration);
        info!("DAQ channel {channel} calibration set to {calibration:?}");
    }

    /// Reads all configured channels without calibration, in channel order.
    pub async fn read_uncalibrated(&self) -> BenchResult<Vec<f64>> {
        let channels = self.channels.read().await.clone();
        if channels.is_empty() {
            return Err(BenchError::ChannelsNotConfigured);
        }
        self.channel.clear().await?;
        let data = self.channel.query_values("READ?").await?;
        if data.len() != channels.len() {
            warn!(
                "DAQ returned {} values for {} channels",
                data.len(),
                channels.len()
            );
            return Err(bad_readings(&data));
        }
        if !data.iter().all(|v| TEMP_RANGE.contains(v)) {
            warn!("bad readings from DAQ: {data:?}");
            return Err(bad_readings(&data));
        }
        Ok(data)
    }

    /// Reads all configured channels with calibration applied, in channel
    /// order.
    pub async fn read_calibrated(&self) -> BenchResult<Vec<f64>> {
        let raw = self.read_uncalibrated().await?;
        let channels = self.channels.read().await.clone();
        let calibrations = self.calibrations.read().await;
        Ok(channels
            .iter()
            .zip(raw)
            .map(|(ch, v)| calibrations.get(ch).copied().unwrap_or_default().apply(v))
            .collect())
    }

    /// Reads all configured channels with calibration applied, keyed by
    /// channel number.
    pub async fn read_calibrated_map(&self) -> BenchResult<HashMap<u16, f64>> {
        let raw = self.read_uncalibrated().await?;
        let channels = self.channels.read().await.clone();
        let calibrations = self.calibrations.read().await;
        Ok(channels
            .iter()
            .zip(raw)
            .map(|(&ch, v)| (ch, calibrations.get(&ch).copied().unwrap_or_default().apply(v)))
            .collect())
    }

    /// Opens a routing relay.
    pub async fn route_open(&self, channel: u16) -> BenchResult<()> {
        self.channel.command(&format!("ROUT:OPEN (@{channel})")).await
    }

    /// Closes a routing relay.
    pub async fn route_close(&self, channel: u16) -> BenchResult<()> {
        self.channel.command(&format!("ROUT:CLOS (@{channel})")).await
    }

    /// Drives a DC output channel to the given voltage.
    pub async fn set_output_volts(&self, channel: u16, volts: f64) -> BenchResult<()> {
        self.channel
            .command(&format!("SOUR:VOLT {volts:.3},(@{channel})"))
            .await
    }

    /// Senses a DC voltage on one channel.
    pub async fn sense_volts(&self, channel: u16) -> BenchResult<f64> {
        let values = self
            .channel
            .query_values(&format!("MEAS:VOLT:DC? (@{channel})"))
            .await?;
        values.first().copied().ok_or(BenchError::BadReading {
            instrument: "DAQ",
            detail: format!("empty voltage reply on channel {channel}"),
        })
    }
}

fn bad_readings(data: &[f64]) -> BenchError {
    BenchError::BadReading {
        instrument: "DAQ",
        detail: format!("values {data:?}"),
    }
}
