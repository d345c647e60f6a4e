//! Per-draw sampler.
//!
//! One row per sample during a draw: elapsed seconds since the writer's
//! start reference (zero for the initial row), tank inlet and outlet
//! thermocouple readings, and the scale weight.
//!
//! Inlet and outlet land in a single summed column even when two headers
//! are declared; the rig's downstream sheets expect this layout, so it is
//! preserved rather than split. Flagged in DESIGN.md.

use crate::error::{BenchError, BenchResult};
use crate::instrument::{Daq, Scale};
use crate::writer::DataWriter;
use log::info;
use std::path::Path;
use std::sync::Arc;

pub struct DrawWriter {
    inner: DataWriter,
    daq: Arc<Daq>,
    scale: Scale,
    inlet_channel: u16,
    outlet_channel: u16,
    draw_num: u32,
}

impl DrawWriter {
    pub fn open(
        path: &Path,
        headers: &[String],
        daq: Arc<Daq>,
        scale: Scale,
        inlet_channel: u16,
        outlet_channel: u16,
    ) -> BenchResult<Self> {
        Ok(Self {
            inner: DataWriter::open(path, &["Time"], headers)?,
            daq,
            scale,
            inlet_channel,
            outlet_channel,
            draw_num: 1,
        })
    }

    /// Captures one row. `initial` forces the elapsed column to zero for
    /// the sample taken before the draw solenoid opens.
    pub async fn read_data(&mut self, initial: bool) -> BenchResult<()> {
        let temps = self.daq.read_calibrated_map().await?;
        let inlet = *temps
            .get(&self.inlet_channel)
            .ok_or_else(|| missing_channel(self.inlet_channel))?;
        let outlet = *temps
            .get(&self.outlet_channel)
            .ok_or_else(|| missing_channel(self.outlet_channel))?;
        let weight = self.scale.weigh().await?;
        let elapsed = if initial {
            0.0
        } else {
            self.inner.elapsed_secs()
        };
        self.inner.write_row(&[
            elapsed.to_string(),
            (inlet + outlet).to_string(),
            weight.to_string(),
        ])
    }

    /// Re-bases the start-time reference for a new draw.
    pub fn reset(&mut self) {
        self.inner.reset_clock();
    }

    /// Tags subsequent rows' logical context; file routing is unaffected.
    pub fn set_draw_num(&mut self, draw_num: u32) {
        self.draw_num = draw_num;
        info!("draw writer tagged for draw #{draw_num}");
    }

    pub fn draw_num(&self) -> u32 {
        self.draw_num
    }

    pub fn flush(&mut self) -> BenchResult<()> {
        self.inner.flush()
    }
}

fn missing_channel(channel: u16) -> BenchError {
    BenchError::Config(format!(
        "draw channel {channel} is not in the configured DAQ channel list"
    ))
}
