//! Yokogawa power meter.
//!
//! Each read reprograms the normal-measurement item list for the wanted
//! quantity, then queries the value. Energy comes from the meter's own
//! integrator, controlled with the `INTEG:*` commands.

use crate::channel::Channel;
use crate::error::{BenchError, BenchResult};
use log::info;
use std::sync::Arc;

pub struct PowerMeter {
    channel: Arc<dyn Channel>,
}

impl PowerMeter {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self { channel }
    }

    async fn read_item(&self, item: &str) -> BenchResult<f64> {
        self.channel.command("MEAS:NORM:ITEM:PRES CLE").await?;
        self.channel
            .command(&format!("MEAS:NORM:ITEM:{item}:ELEMENT1"))
            .await?;
        self.channel.command("ON").await?;
        let values = self.channel.query_values("MEAS:NORM:VAL?").await?;
        values.first().copied().ok_or(BenchError::BadReading {
            instrument: "power meter",
            detail: format!("empty reply for item {item}"),
        })
    }

    /// Reads instantaneous power in watts.
    pub async fn read_watts(&self) -> BenchResult<f64> {
        self.read_item("W").await
    }

    /// Reads accumulated energy from the integrator.
    pub async fn read_energy(&self) -> BenchResult<f64> {
        self.read_item("WH").await
    }

    /// Reads instantaneous voltage.
    pub async fn read_volts(&self) -> BenchResult<f64> {
        self.read_item("V").await
    }

    /// Reads instantaneous current.
    pub async fn read_amps(&self) -> BenchResult<f64> {
        self.read_item("A").await
    }

    pub async fn reset_integration(&self) -> BenchResult<()> {
        self.channel.command("INTEG:RESET").await?;
        info!("power integration reset");
        Ok(())
    }

    pub async fn start_integration(&self) -> BenchResult<()> {
        self.channel.command("INTEG:START").await?;
        info!("power integration started");
        Ok(())
    }

    pub async fn stop_integration(&self) -> BenchResult<()> {
        self.channel.command("INTEG:STOP").await?;
        info!("power integration stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;

    #[tokio::test]
    async fn reads_each_quantity() {
        let chan = Arc::new(MockChannel::new());
        for reply in ["4500.0", "1200.5", "240.1", "18.7"] {
            chan.push_reply("MEAS:NORM:VAL?", reply).await;
        }
        let meter = PowerMeter::new(chan.clone());
        assert_eq!(meter.read_watts().await.unwrap(), 4500.0);
        assert_eq!(meter.read_energy().await.unwrap(), 1200.5);
        assert_eq!(meter.read_volts().await.unwrap(), 240.1);
        assert_eq!(meter.read_amps().await.unwrap(), 18.7);

        let commands = chan.commands().await;
        assert!(commands.contains(&"MEAS:NORM:ITEM:W:ELEMENT1".to_string()));
        assert!(commands.contains(&"MEAS:NORM:ITEM:WH:ELEMENT1".to_string()));
    }

    #[tokio::test]
    async fn integration_control() {
        let chan = Arc::new(MockChannel::new());
        let meter = PowerMeter::new(chan.clone());
        meter.reset_integration().await.unwrap();
        meter.start_integration().await.unwrap();
        meter.stop_integration().await.unwrap();
        assert_eq!(
            chan.commands().await,
            vec!["INTEG:RESET", "INTEG:START", "INTEG:STOP"]
        );
    }
}
