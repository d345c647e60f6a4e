//! Hart Scientific PRT reference thermometer.
//!
//! The reply to `READ?` carries the temperature digits at a fixed offset;
//! anything that does not parse to a positive number there is a transient
//! bad reading, left to the caller's retry policy.

use crate::channel::Channel;
use crate::error::{BenchError, BenchResult};
use crate::instrument::TemperatureUnit;
use crate::monitor::TemperatureSource;
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

/// Byte range of the reply that holds the temperature digits.
const TEMP_DIGITS: std::ops::Range<usize> = 5..11;

pub struct Prt {
    channel: Arc<dyn Channel>,
}

impl Prt {
    /// Wraps the channel and sets the output units to Celsius.
    pub async fn connect(channel: Arc<dyn Channel>) -> BenchResult<Self> {
        let prt = Self { channel };
        prt.set_units(TemperatureUnit::Celsius).await?;
        Ok(prt)
    }

    /// Changes the output units.
    pub async fn set_units(&self, units: TemperatureUnit) -> BenchResult<()> {
        self.channel
            .command(&format!("UNIT:TEMP {}", units.code()))
            .await?;
        info!("PRT units set to {}", units.code());
        Ok(())
    }

    /// Reads one temperature.
    pub async fn read_temp(&self) -> BenchResult<f64> {
        self.channel.clear().await?;
        let reply = self.channel.query("READ?").await?;
        let digits = reply.get(TEMP_DIGITS).ok_or_else(|| bad_reading(&reply))?;
        let value: f64 = digits.trim().parse().map_err(|_| bad_reading(&reply))?;
        if value <= 0.0 {
            warn!("bad reading from PRT: '{reply}'");
            return Err(bad_reading(&reply));
        }
        Ok(value)
    }
}

fn bad_reading(reply: &str) -> BenchError {
    BenchError::BadReading {
        instrument: "PRT",
        detail: format!("reply '{reply}'"),
    }
}

#[async_trait]
impl TemperatureSource for Prt {
    async fn read_temp(&self) -> BenchResult<f64> {
        Prt::read_temp(self).await
    }
}
