//! Thermo AC25 temperature-controlled bath.
//!
//! The bath speaks a terse vendor protocol, not SCPI: `W GO 1` to start,
//! `W RR -1` to stop, `W SP <temp>` to set the set-point, `R T1` to read
//! the loop temperature. The `R T1` reply wraps the digits in a prefix and
//! a trailing unit tag.

use crate::channel::Channel;
use crate::error::{BenchError, BenchResult};
use log::info;
use std::sync::Arc;

pub struct Bath {
    channel: Arc<dyn Channel>,
}

impl Bath {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self { channel }
    }

    /// Starts circulation and control.
    pub async fn start(&self) -> BenchResult<()> {
        self.channel.command("W GO 1").await?;
        info!("bath started");
        Ok(())
    }

    /// Stops the bath.
    pub async fn stop(&self) -> BenchResult<()> {
        self.channel.command("W RR -1").await?;
        info!("bath stopped");
        Ok(())
    }

    /// Commands a new temperature set-point.
    pub async fn set_temp(&self, temp: f64) -> BenchResult<()> {
        self.channel.command(&format!("W SP {temp:.2}")).await?;
        info!("bath set to {temp}C");
        Ok(())
    }

    /// Reads the current bath temperature.
    pub async fn read_temp(&self) -> BenchResult<f64> {
        let reply = self.channel.query("R T1").await?;
        // Reply shape: 3-char prefix, digits, 4-char unit tail.
        let digits = (reply.len() > 7)
            .then(|| reply.get(3..reply.len() - 4))
            .flatten()
            .ok_or_else(|| bad_reading(&reply))?;
        digits.trim().parse().map_err(|_| bad_reading(&reply))
    }
}

fn bad_reading(reply: &str) -> BenchError {
    BenchError::BadReading {
        instrument: "bath",
        detail: format!("reply '{reply}'"),
    }
}
