//! Command-line entry point for the bench.
//!
//! Two procedures (`calibrate`, `draw-test`) plus a `scan` helper that
//! identifies whatever is listening on the listed bus resources. Settings
//! come from a TOML config file and the environment, with CLI flags
//! winning over both. Any failure during a procedure is logged with its
//! category and exits non-zero.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tc_bench::channel::open_bus;
use tc_bench::config::Settings;
use tc_bench::error::BenchError;
use tc_bench::instrument::{
    Bath, Daq, FlowValve, HumiditySensor, PowerMeter, Prt, Scale, Solenoid, TemperatureUnit,
};
use tc_bench::monitor::SteadyStateMonitor;
use tc_bench::pace::{Sleeper, TokioSleeper};
use tc_bench::procedure::{parse_schedule, run_draw_test, setpoint_calibration, DrawHardware};
use tc_bench::writer::{CalibrationWriter, DrawWriter, SimulatedUseWriter};
use tokio::sync::Mutex;

#[derive(Parser)]
#[command(name = "tc_bench", about = "Thermocouple calibration and water-heater draw testing")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the set-point calibration sweep.
    Calibrate {
        /// VISA address of the DAQ.
        #[arg(long)]
        daq_address: Option<String>,
        /// VISA address of the PRT.
        #[arg(long)]
        prt_address: Option<String>,
        /// VISA address of the bath.
        #[arg(long)]
        bath_address: Option<String>,
        /// Output file name or path.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Bath set-points, in sweep order.
        #[arg(long, num_args = 1..)]
        set_points: Option<Vec<f64>>,
        /// DAQ channels to read.
        #[arg(long, num_args = 1..)]
        channels: Option<Vec<u16>>,
        /// Headers for the output file, in the same order as the channels.
        #[arg(long, num_args = 1..)]
        headers: Option<Vec<String>>,
    },
    /// Run the scheduled draw test.
    DrawTest {
        /// VISA address of the DAQ.
        #[arg(long)]
        daq_address: Option<String>,
        /// VISA address of the power meter.
        #[arg(long)]
        power_meter_address: Option<String>,
        /// Minutely output file name or path.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Per-draw output file name or path.
        #[arg(long)]
        draw_output: Option<PathBuf>,
        /// Draw schedule file.
        #[arg(long)]
        schedule: Option<PathBuf>,
    },
    /// Send *IDN? to each listed resource and print what answers.
    Scan {
        /// VISA resource strings to probe.
        #[arg(num_args = 1..)]
        resources: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        let category = e
            .downcast_ref::<BenchError>()
            .map_or("unexpected", BenchError::category);
        log::error!("{category} failure: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    match cli.command {
        Command::Calibrate {
            daq_address,
            prt_address,
            bath_address,
            output,
            set_points,
            channels,
            headers,
        } => {
            apply(&mut settings.instruments.daq_address, daq_address);
            apply(&mut settings.instruments.prt_address, prt_address);
            apply(&mut settings.instruments.bath_address, bath_address);
            apply(&mut settings.files.output, output);
            apply(&mut settings.procedure.set_points, set_points);
            apply(&mut settings.procedure.channels, channels);
            if headers.is_some() {
                settings.files.headers = headers;
            }
            settings.validate()?;
            calibrate(settings).await
        }
        Command::DrawTest {
            daq_address,
            power_meter_address,
            output,
            draw_output,
            schedule,
        } => {
            apply(&mut settings.instruments.daq_address, daq_address);
            apply(
                &mut settings.instruments.power_meter_address,
                power_meter_address,
            );
            apply(&mut settings.files.output, output);
            apply(&mut settings.files.draw_output, draw_output);
            apply(&mut settings.files.schedule, schedule);
            settings.validate()?;
            draw_test(settings).await
        }
        Command::Scan { resources } => scan(&resources).await,
    }
}

fn apply<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

async fn calibrate(settings: Settings) -> Result<()> {
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

    let daq = Daq::new(open_bus(&settings.instruments.daq_address).context("DAQ initialization")?);
    daq.configure_channels(&settings.procedure.channels, TemperatureUnit::Celsius)
        .await?;
    info!("DAQ initialized");
    let prt = Prt::connect(
        open_bus(&settings.instruments.prt_address).context("PRT initialization")?,
    )
    .await?;
    info!("PRT initialized");
    let bath = Bath::new(open_bus(&settings.instruments.bath_address).context("bath initialization")?);
    info!("bath initialized");

    let headers = settings.resolved_headers();
    let mut writer =
        CalibrationWriter::open(&settings.files.output, &headers, sleeper.clone())
            .context("output file initialization")?;
    let monitor = SteadyStateMonitor::new(sleeper)
        .with_steady_delta(settings.procedure.steady_delta)
        .with_window(settings.procedure.steady_window)
        .with_poll_interval(Duration::from_secs(settings.procedure.poll_interval_secs));

    setpoint_calibration(
        &bath,
        &prt,
        &daq,
        &mut writer,
        &monitor,
        &settings.procedure.set_points,
        settings.procedure.reads,
        Duration::from_secs(settings.procedure.read_interval_secs),
    )
    .await?;
    info!("calibration successful");
    Ok(())
}

async fn draw_test(settings: Settings) -> Result<()> {
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let procedure = &settings.procedure;

    // The sampler and the draw writer both read calibrated temperatures,
    // so the inlet/outlet thermocouples must be in the configured list.
    let mut channels = procedure.channels.clone();
    let mut headers = settings.resolved_headers();
    for (channel, label) in [
        (procedure.inlet_channel, "Inlet"),
        (procedure.outlet_channel, "Outlet"),
    ] {
        if !channels.contains(&channel) {
            channels.push(channel);
            headers.push(label.to_string());
        }
    }

    let daq = Arc::new(Daq::new(
        open_bus(&settings.instruments.daq_address).context("DAQ initialization")?,
    ));
    daq.configure_channels(&channels, TemperatureUnit::Celsius)
        .await?;
    info!("DAQ initialized");
    let power = PowerMeter::new(
        open_bus(&settings.instruments.power_meter_address)
            .context("power meter initialization")?,
    );
    info!("power meter initialized");

    let humidity = HumiditySensor::new(daq.clone(), procedure.rh_channel);
    let scale = Scale::new(daq.clone(), procedure.scale_channel);
    let hardware = DrawHardware {
        draw_solenoid: Solenoid::new(daq.clone(), procedure.draw_solenoid_channel),
        weigh_solenoid: Solenoid::new(daq.clone(), procedure.weigh_solenoid_channel),
        valve: FlowValve::new(daq.clone(), procedure.valve_channel, sleeper.clone()),
        scale: scale.clone(),
    };

    let schedule =
        parse_schedule(&settings.files.schedule).context("schedule initialization")?;

    let draw_writer = Arc::new(Mutex::new(
        DrawWriter::open(
            &settings.files.draw_output,
            &settings.files.draw_headers,
            daq.clone(),
            scale,
            procedure.inlet_channel,
            procedure.outlet_channel,
        )
        .context("draw file initialization")?,
    ));

    let mut sampler_headers = vec!["Elapsed".to_string(), "Draw Status".to_string()];
    sampler_headers.extend(headers);
    sampler_headers.extend(
        ["RH", "Power", "Energy", "Volts", "Amps"].map(String::from),
    );
    let mut sampler = SimulatedUseWriter::open(
        &settings.files.output,
        &sampler_headers,
        daq,
        humidity,
        power,
        sleeper.clone(),
    )
    .context("output file initialization")?;

    run_draw_test(&schedule, hardware, draw_writer, &mut sampler, sleeper).await?;
    info!("draw test successful");
    Ok(())
}

async fn scan(resources: &[String]) -> Result<()> {
    #[cfg(feature = "instrument_visa")]
    {
        for (resource, identity) in tc_bench::channel::visa::scan_resources(resources).await {
            println!("{resource}\n  {identity}");
        }
        Ok(())
    }

    #[cfg(not(feature = "instrument_visa"))]
    {
        let _ = resources;
        Err(BenchError::FeatureNotEnabled("instrument_visa").into())
    }
}
