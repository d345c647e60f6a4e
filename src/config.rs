//! Configuration loading.
//!
//! Strongly-typed settings loaded with Figment from a TOML file plus
//! `TCBENCH_`-prefixed environment variables, with CLI flags applied on
//! top by the binary. Defaults mirror the bench's standing wiring, so a
//! bare config file is enough for a normal run; when no `--config` path is
//! given and `tc_bench.toml` does not exist, one is written with the
//! defaults for the operator to edit.
//!
//! ```toml
//! [files]
//! output = "data.csv"
//! draw_output = "draws.csv"
//! schedule = "schedule.csv"
//!
//! [instruments]
//! daq_address = "GPIB0::9::INSTR"
//! prt_address = "ASRL1::INSTR"
//! bath_address = "COM4"
//!
//! [procedure]
//! set_points = [5.0, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0]
//! channels = [101, 102, 103]
//! ```

use crate::error::{BenchError, BenchResult};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File consulted when no `--config` path is given. Seeded with defaults
/// on first run so the operator has something to edit.
const DEFAULT_CONFIG_FILE: &str = "tc_bench.toml";

/// Top-level bench configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub files: FilesConfig,
    pub instruments: InstrumentsConfig,
    pub procedure: ProcedureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Calibration / simulated-use output file.
    pub output: PathBuf,
    /// Per-draw output file.
    pub draw_output: PathBuf,
    /// Draw schedule file.
    pub schedule: PathBuf,
    /// Column headers for the output file, in channel order. `None` reuses
    /// the channel numbers as headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
    /// Column headers for the per-draw output file.
    #[serde(default = "default_draw_headers")]
    pub draw_headers: Vec<String>,
}

fn default_draw_headers() -> Vec<String> {
    [
        "Elapsed",
        "Inlet Temperature",
        "Outlet Temperature",
        "Scale Weight",
    ]
    .map(String::from)
    .to_vec()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("data.csv"),
            draw_output: PathBuf::from("draws.csv"),
            schedule: PathBuf::from("schedule.csv"),
            headers: None,
            draw_headers: default_draw_headers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentsConfig {
    pub daq_address: String,
    pub prt_address: String,
    pub bath_address: String,
    pub power_meter_address: String,
}

impl Default for InstrumentsConfig {
    fn default() -> Self {
        Self {
            daq_address: "GPIB0::9::INSTR".to_string(),
            prt_address: "ASRL1::INSTR".to_string(),
            bath_address: "COM4".to_string(),
            power_meter_address: "ASRL2::INSTR".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureConfig {
    /// Bath set-points for the calibration sweep, in sweep order.
    pub set_points: Vec<f64>,
    /// DAQ thermocouple channels to read.
    pub channels: Vec<u16>,
    /// Successful rows per calibration batch.
    pub reads: u32,
    /// Seconds between successful calibration rows.
    pub read_interval_secs: u64,
    /// Steady-state tolerance in degrees over the observation window.
    pub steady_delta: f64,
    /// Steady-state window size in samples.
    pub steady_window: usize,
    /// Seconds between steady-state polls.
    pub poll_interval_secs: u64,
    // Draw-test wiring.
    pub inlet_channel: u16,
    pub outlet_channel: u16,
    pub scale_channel: u16,
    pub rh_channel: u16,
    pub draw_solenoid_channel: u16,
    pub weigh_solenoid_channel: u16,
    pub valve_channel: u16,
}

impl Default for ProcedureConfig {
    fn default() -> Self {
        Self {
            set_points: vec![5.0, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0],
            channels: vec![101, 102, 103],
            reads: 10,
            read_interval_secs: 30,
            steady_delta: 0.1,
            steady_window: 60,
            poll_interval_secs: 10,
            inlet_channel: 108,
            outlet_channel: 109,
            scale_channel: 205,
            rh_channel: 221,
            draw_solenoid_channel: 301,
            weigh_solenoid_channel: 302,
            valve_channel: 210,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            files: FilesConfig::default(),
            instruments: InstrumentsConfig::default(),
            procedure: ProcedureConfig::default(),
        }
    }
}

impl Settings {
    /// Loads settings from defaults, an optional TOML file, and the
    /// environment, then validates them.
    pub fn load(config_file: Option<&Path>) -> BenchResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(BenchError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        } else {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if !default_path.is_file() {
                Settings::default().seed(default_path)?;
            }
            figment = figment.merge(Toml::file(default_path));
        }
        let settings: Settings = figment
            .merge(Env::prefixed("TCBENCH_").split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Writes these settings to `path` as TOML, for first-run seeding.
    pub fn seed(&self, path: &Path) -> BenchResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| BenchError::Config(format!("cannot serialize settings: {e}")))?;
        std::fs::write(path, contents)?;
        info!("seeded config file at {}", path.display());
        Ok(())
    }

    /// Semantic validation, run before any instrument I/O.
    pub fn validate(&self) -> BenchResult<()> {
        if self.procedure.channels.is_empty() {
            return Err(BenchError::Config("channel list is empty".to_string()));
        }
        if self.procedure.set_points.is_empty() {
            return Err(BenchError::Config("set-point list is empty".to_string()));
        }
        if let Some(headers) = &self.files.headers {
            if headers.len() != self.procedure.channels.len() {
                return Err(BenchError::Config(format!(
                    "{} headers for {} channels; counts must match",
                    headers.len(),
                    self.procedure.channels.len()
                )));
            }
        }
        Ok(())
    }

    /// Output column headers: the configured list, or the channel numbers.
    pub fn resolved_headers(&self) -> Vec<String> {
        self.files.headers.clone().unwrap_or_else(|| {
            self.procedure
                .channels
                .iter()
                .map(u16::to_string)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.procedure.set_points.len(), 8);
        assert_eq!(settings.resolved_headers(), vec!["101", "102", "103"]);
    }

    #[test]
    fn header_channel_mismatch_is_rejected() {
        let mut settings = Settings::default();
        settings.files.headers = Some(vec!["Tank 1".to_string()]);
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn explicit_headers_win() {
        let mut settings = Settings::default();
        settings.files.headers = Some(vec![
            "Tank 1".to_string(),
            "Tank 2".to_string(),
            "Ambient".to_string(),
        ]);
        settings.validate().unwrap();
        assert_eq!(settings.resolved_headers()[2], "Ambient");
    }

    #[test]
    fn toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        std::fs::write(
            &path,
            "[procedure]\nset_points = [25.0]\nchannels = [101]\n",
        )
        .unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.procedure.set_points, vec![25.0]);
        assert_eq!(settings.procedure.channels, vec![101]);
        // Untouched sections keep their defaults.
        assert_eq!(settings.instruments.daq_address, "GPIB0::9::INSTR");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/bench.toml"))).unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn seeded_file_loads_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeded.toml");
        Settings::default().seed(&path).unwrap();
        assert!(path.is_file());
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.procedure.set_points, Settings::default().procedure.set_points);
        assert_eq!(settings.files.draw_headers, default_draw_headers());
        assert_eq!(settings.instruments.bath_address, "COM4");
    }
}
