//! Ambient relative-humidity sensor, read as an analog voltage on the DAQ.

use crate::error::{BenchError, BenchResult};
use crate::instrument::Daq;
use log::warn;
use std::sync::Arc;

/// Sensor output scaling: 0-10 V maps to 0-100 %RH.
const PERCENT_PER_VOLT: f64 = 10.0;

#[derive(Clone)]
pub struct HumiditySensor {
    daq: Arc<Daq>,
    channel: u16,
}

impl HumiditySensor {
    pub fn new(daq: Arc<Daq>, channel: u16) -> Self {
        Self { daq, channel }
    }

    /// Reads relative humidity in percent.
    pub async fn relative_humidity(&self) -> BenchResult<f64> {
        let volts = self.daq.sense_volts(self.channel).await?;
        let rh = volts * PERCENT_PER_VOLT;
        if !(0.0..=100.0).contains(&rh) {
            warn!("bad reading from RH sensor: {rh}%");
            return Err(BenchError::BadReading {
                instrument: "RH sensor",
                detail: format!("{rh}%"),
            });
        }
        Ok(rh)
    }
}
