//! Device drivers for the bench instruments.
//!
//! Each driver is a thin semantic wrapper over a shared
//! `Arc<dyn Channel>`: composition, not an inheritance hierarchy. Devices
//! wired through the DAQ (solenoids, flow valve, scale, humidity sensor)
//! hold an `Arc<Daq>` and address a channel number on it.

pub mod bath;
pub mod daq;
pub mod humidity;
pub mod power;
pub mod prt;
pub mod scale;
pub mod solenoid;
pub mod valve;

pub use bath::Bath;
pub use daq::{Calibration, Daq};
pub use humidity::HumiditySensor;
pub use power::PowerMeter;
pub use prt::Prt;
pub use scale::Scale;
pub use solenoid::Solenoid;
pub use valve::FlowValve;

/// Temperature units supported by the thermometer and DAQ.
///
/// Invalid units are unrepresentable, so no runtime validation is needed
/// where a unit is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Kelvin,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Single-letter unit code used in instrument commands.
    pub fn code(self) -> char {
        match self {
            TemperatureUnit::Celsius => 'C',
            TemperatureUnit::Kelvin => 'K',
            TemperatureUnit::Fahrenheit => 'F',
        }
    }
}

/// Formats a channel list for a `(@...)` command suffix.
pub(crate) fn channel_list(channels: &[u16]) -> String {
    channels
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
