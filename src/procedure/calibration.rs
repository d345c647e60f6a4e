//! Set-point calibration sweep.

use crate::error::BenchResult;
use crate::instrument::{Bath, Daq, Prt};
use crate::monitor::SteadyStateMonitor;
use crate::writer::CalibrationWriter;
use log::{info, warn};
use std::time::Duration;

/// DAQ-vs-PRT disagreement above this is worth a warning before starting.
const SANITY_TOLERANCE: f64 = 1.0;

/// Runs the calibration sweep.
///
/// For each set-point: command the bath, block until the reference
/// thermometer reads steady, then collect one timed batch of readings.
/// The bath is stopped after the last set-point.
pub async fn setpoint_calibration(
    bath: &Bath,
    prt: &Prt,
    daq: &Daq,
    writer: &mut CalibrationWriter,
    monitor: &SteadyStateMonitor,
    set_points: &[f64],
    reads: u32,
    interval: Duration,
) -> BenchResult<()> {
    sanity_check(prt, daq).await;

    bath.start().await?;
    for &point in set_points {
        bath.set_temp(point).await?;
        info!("proceeding to set-point {point}C");
        monitor.wait_until_steady(prt).await?;
        info!("bath steady at {point}C, collecting");
        writer.collect_data(prt, daq, reads, interval).await?;
    }
    bath.stop().await?;
    info!("calibration sweep complete");
    Ok(())
}

/// Environment sanity check, not a precondition: the hottest DAQ channel
/// and the reference thermometer should roughly agree before a sweep. A
/// disagreement (or a failed read) only warns.
async fn sanity_check(prt: &Prt, daq: &Daq) {
    let readings = match (prt.read_temp().await, daq.read_uncalibrated().await) {
        (Ok(reference), Ok(raw)) => Some((reference, raw)),
        (Err(e), _) | (_, Err(e)) => {
            warn!("pre-sweep sanity check skipped: {e}");
            None
        }
    };
    if let Some((reference, raw)) = readings {
        let daq_max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if (daq_max - reference).abs() > SANITY_TOLERANCE {
            warn!(
                "DAQ max {daq_max:.2}C and PRT {reference:.2}C disagree by more \
                 than {SANITY_TOLERANCE}C; check probe placement"
            );
        }
    }
}
