//! Solenoid valve switched through a DAQ routing relay.

use crate::error::BenchResult;
use crate::instrument::Daq;
use log::info;
use std::sync::Arc;

#[derive(Clone)]
pub struct Solenoid {
    daq: Arc<Daq>,
    channel: u16,
}

impl Solenoid {
    pub fn new(daq: Arc<Daq>, channel: u16) -> Self {
        Self { daq, channel }
    }

    pub async fn open(&self) -> BenchResult<()> {
        self.daq.route_open(self.channel).await?;
        info!("solenoid @{} opened", self.channel);
        Ok(())
    }

    pub async fn close(&self) -> BenchResult<()> {
        self.daq.route_close(self.channel).await?;
        info!("solenoid @{} closed", self.channel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;

    #[tokio::test]
    async fn routes_to_its_channel() {
        let chan = Arc::new(MockChannel::new());
        let daq = Arc::new(Daq::new(chan.clone()));
        let solenoid = Solenoid::new(daq, 305);
        solenoid.open().await.unwrap();
        solenoid.close().await.unwrap();
        assert_eq!(
            chan.commands().await,
            vec!["ROUT:OPEN (@305)", "ROUT:CLOS (@305)"]
        );
    }
}
