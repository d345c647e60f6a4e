//! Mettler Toledo weigh-tank scale, read as an analog voltage on the DAQ.

use crate::error::{BenchError, BenchResult};
use crate::instrument::Daq;
use std::sync::Arc;

/// Scale analog output scaling: 0-10 V over a 500 lb capacity.
const LB_PER_VOLT: f64 = 50.0;

#[derive(Clone)]
pub struct Scale {
    daq: Arc<Daq>,
    channel: u16,
}

impl Scale {
    pub fn new(daq: Arc<Daq>, channel: u16) -> Self {
        Self { daq, channel }
    }

    /// Reads the current weight in pounds.
    pub async fn weigh(&self) -> BenchResult<f64> {
        let volts = self.daq.sense_volts(self.channel).await?;
        if !volts.is_finite() || volts < 0.0 {
            return Err(BenchError::BadReading {
                instrument: "scale",
                detail: format!("sense voltage {volts}"),
            });
        }
        Ok(volts * LB_PER_VOLT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;

    #[tokio::test]
    async fn converts_volts_to_pounds() {
        let chan = Arc::new(MockChannel::new());
        let daq = Arc::new(Daq::new(chan.clone()));
        chan.push_reply("MEAS:VOLT:DC? (@205)", "1.6434").await;
        let scale = Scale::new(daq, 205);
        assert!((scale.weigh().await.unwrap() - 82.17).abs() < 1e-9);
    }

    #[tokio::test]
    async fn negative_voltage_is_bad_reading() {
        let chan = Arc::new(MockChannel::new());
        let daq = Arc::new(Daq::new(chan.clone()));
        chan.push_reply("MEAS:VOLT:DC? (@205)", "-0.2").await;
        let scale = Scale::new(daq, 205);
        assert!(scale.weigh().await.unwrap_err().is_transient());
    }
}
