//! Scheduled draw testing.
//!
//! The test loop samples the simulated-use writer on every 60-second
//! clock boundary and, when elapsed time crosses an undispatched schedule
//! entry, spawns one independent draw task carrying that entry's rate and
//! volume. The loop ends once elapsed time passes the last entry's time
//! plus a fixed grace period, then waits for any still-running draws to
//! finish naturally; a draw task has no timeout and no cancellation.

use crate::error::{BenchError, BenchResult};
use crate::instrument::{FlowValve, Scale, Solenoid};
use crate::pace::Sleeper;
use crate::procedure::schedule::ScheduleEntry;
use crate::writer::{DrawWriter, SimulatedUseWriter};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Weight of one gallon of water.
pub const POUNDS_PER_GALLON: f64 = 8.217;

/// Sampling cadence of the periodic sampler.
const SAMPLE_PERIOD: f64 = 60.0;

/// Extra time after the last scheduled draw before the test ends.
const GRACE: f64 = 60.0;

/// How long the purge solenoid stays open before a draw.
const PURGE_DWELL: Duration = Duration::from_secs(10);

/// Scale polling cadence during a draw.
const SCALE_POLL: Duration = Duration::from_secs(2);

/// Weight at which a draw of `gallons` is complete.
pub fn target_weight(gallons: f64) -> f64 {
    POUNDS_PER_GALLON * gallons
}

/// Shared plumbing handles a draw task needs. The underlying DAQ channel
/// serializes bus access, so clones are safe to use concurrently with the
/// periodic sampler.
#[derive(Clone)]
pub struct DrawHardware {
    pub draw_solenoid: Solenoid,
    pub weigh_solenoid: Solenoid,
    pub valve: FlowValve,
    pub scale: Scale,
}

/// Runs one draw to completion.
///
/// Purges stale water from the loop, zeroes the flow valve, closes the
/// weigh-tank solenoid, records an initial sample, then draws at
/// `rate_gpm` until the scale reads `target_weight(gallons)`, sampling
/// every two seconds. Runs until the target weight is reached; there is
/// deliberately no timeout. A fatal error mid-draw closes the draw
/// solenoid and zeroes the valve before the error is returned.
pub async fn draw(
    draw_num: u32,
    rate_gpm: f64,
    gallons: f64,
    hardware: DrawHardware,
    writer: Arc<Mutex<DrawWriter>>,
    drawing: Arc<AtomicBool>,
    sleeper: Arc<dyn Sleeper>,
) -> BenchResult<()> {
    info!("draw #{draw_num}: {gallons} gal at {rate_gpm} gpm");

    // Purge stale water sitting in the loop.
    hardware.draw_solenoid.open().await?;
    sleeper.sleep(PURGE_DWELL).await;
    hardware.draw_solenoid.close().await?;

    hardware.valve.reset().await?;
    hardware.weigh_solenoid.close().await?;

    {
        let mut writer = writer.lock().await;
        writer.set_draw_num(draw_num);
        writer.reset();
        loop {
            match writer.read_data(true).await {
                Ok(()) => break,
                Err(e) if e.is_transient() => warn!("initial draw sample failed, retrying: {e}"),
                Err(e) => return Err(e),
            }
        }
    }

    hardware.valve.set_rate(rate_gpm).await?;
    hardware.draw_solenoid.open().await?;
    drawing.store(true, Ordering::Relaxed);

    let result = sample_until_target(target_weight(gallons), &hardware, &writer, &sleeper).await;
    drawing.store(false, Ordering::Relaxed);

    if let Err(e) = result {
        // Water is flowing; secure the plumbing before surfacing the error.
        warn!("draw #{draw_num} aborted: {e}; securing plumbing");
        if let Err(close_err) = hardware.draw_solenoid.close().await {
            warn!("draw solenoid close failed during abort: {close_err}");
        }
        if let Err(valve_err) = hardware.valve.reset().await {
            warn!("valve reset failed during abort: {valve_err}");
        }
        return Err(e);
    }

    hardware.draw_solenoid.close().await?;
    hardware.valve.reset().await?;
    writer.lock().await.flush()?;
    info!("draw #{draw_num} complete");
    Ok(())
}

/// Samples and weighs on the scale-poll cadence until the target weight
/// is reached. Transient errors retry on the next poll.
async fn sample_until_target(
    target: f64,
    hardware: &DrawHardware,
    writer: &Mutex<DrawWriter>,
    sleeper: &Arc<dyn Sleeper>,
) -> BenchResult<()> {
    loop {
        sleeper.sleep(SCALE_POLL).await;
        {
            let mut writer = writer.lock().await;
            if let Err(e) = writer.read_data(false).await {
                if e.is_transient() {
                    warn!("draw sample failed, retrying: {e}");
                    continue;
                }
                return Err(e);
            }
        }
        match hardware.scale.weigh().await {
            Ok(weight) if weight >= target => return Ok(()),
            Ok(_) => {}
            Err(e) if e.is_transient() => warn!("scale read failed, retrying: {e}"),
            Err(e) => return Err(e),
        }
    }
}

/// Schedule entries due at `elapsed` that have not been dispatched yet.
pub(crate) fn due_entries(
    schedule: &[ScheduleEntry],
    dispatched: &[bool],
    elapsed: f64,
) -> Vec<usize> {
    schedule
        .iter()
        .enumerate()
        .filter(|(i, entry)| !dispatched[*i] && elapsed >= entry.at_secs)
        .map(|(i, _)| i)
        .collect()
}

/// Runs the full draw test against a loaded schedule.
///
/// The periodic sampler runs on every minute boundary of the wall clock,
/// not a fixed delay after each sample. Each due entry gets exactly one
/// spawned draw task; the test ends once elapsed time exceeds the last
/// entry's time plus a one-minute grace period and every spawned draw has
/// finished.
pub async fn run_draw_test(
    schedule: &[ScheduleEntry],
    hardware: DrawHardware,
    draw_writer: Arc<Mutex<DrawWriter>>,
    sampler: &mut SimulatedUseWriter,
    sleeper: Arc<dyn Sleeper>,
) -> BenchResult<()> {
    let last = schedule
        .last()
        .ok_or_else(|| BenchError::Schedule("schedule is empty".to_string()))?;
    let end = last.at_secs + GRACE;
    let start = Instant::now();
    let mut dispatched = vec![false; schedule.len()];
    let mut tasks: Vec<JoinHandle<BenchResult<()>>> = Vec::new();

    info!(
        "draw test started: {} draws over {}s",
        schedule.len(),
        last.at_secs
    );

    loop {
        if let Err(e) = sampler.read_data().await {
            if e.is_transient() {
                warn!("periodic sample failed, continuing: {e}");
            } else {
                return Err(e);
            }
        }

        let elapsed = start.elapsed().as_secs_f64();
        for index in due_entries(schedule, &dispatched, elapsed) {
            dispatched[index] = true;
            let entry = schedule[index];
            info!(
                "dispatching draw #{}: {} gal at {} gpm",
                index + 1,
                entry.volume_gal,
                entry.rate_gpm
            );
            tasks.push(tokio::spawn(draw(
                (index + 1) as u32,
                entry.rate_gpm,
                entry.volume_gal,
                hardware.clone(),
                draw_writer.clone(),
                sampler.drawing_flag(),
                sleeper.clone(),
            )));
        }

        if elapsed > end {
            break;
        }

        // Wake on the next minute boundary of the test clock.
        let into_period = start.elapsed().as_secs_f64() % SAMPLE_PERIOD;
        sleeper
            .sleep(Duration::from_secs_f64(SAMPLE_PERIOD - into_period))
            .await;
    }

    for task in tasks {
        task.await
            .map_err(|e| BenchError::Task(format!("draw task aborted: {e}")))??;
    }
    sampler.flush()?;
    info!("draw test complete");
    Ok(())
}
