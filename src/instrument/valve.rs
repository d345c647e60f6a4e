//! Belimo proportional flow valve driven by a DAQ DC output.
//!
//! The valve takes a 0-10 V control signal, 1 V per gallon-per-minute of
//! flow. A requested rate that maps outside the control range is a hard
//! error before anything touches the bus; it is never clamped.

use crate::error::{BenchError, BenchResult};
use crate::instrument::Daq;
use crate::pace::Sleeper;
use log::info;
use std::sync::Arc;
use std::time::Duration;

const VOLTS_PER_GPM: f64 = 1.0;
const MIN_VOLTS: f64 = 0.0;
const MAX_VOLTS: f64 = 10.0;

/// Time the valve needs to travel to a new position.
const SETTLE: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct FlowValve {
    daq: Arc<Daq>,
    channel: u16,
    sleeper: Arc<dyn Sleeper>,
}

impl FlowValve {
    pub fn new(daq: Arc<Daq>, channel: u16, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            daq,
            channel,
            sleeper,
        }
    }

    /// Commands the valve to the given flow rate.
    pub async fn set_rate(&self, rate_gpm: f64) -> BenchResult<()> {
        let volts = rate_gpm * VOLTS_PER_GPM;
        if !(MIN_VOLTS..=MAX_VOLTS).contains(&volts) {
            return Err(BenchError::InvalidSetpoint {
                value: volts,
                min: MIN_VOLTS,
                max: MAX_VOLTS,
            });
        }
        self.daq.set_output_volts(self.channel, volts).await?;
        info!("flow valve @{} set to {rate_gpm} gpm", self.channel);
        Ok(())
    }

    /// Drives the valve closed and waits for it to settle.
    pub async fn reset(&self) -> BenchResult<()> {
        self.set_rate(0.0).await?;
        self.sleeper.sleep(SETTLE).await;
        Ok(())
    }
}
