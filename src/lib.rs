//! Core library for the tc-bench application.
//!
//! tc-bench automates two laboratory procedures for water-heater testing:
//! thermocouple/PRT calibration against a temperature-controlled bath, and
//! scheduled draw testing with continuous data logging. Instruments are
//! driven over an opaque command/query bus (VISA in production, a scripted
//! mock in tests), and readings are appended to CSV files on a fixed
//! cadence.

pub mod channel;
pub mod config;
pub mod error;
pub mod instrument;
pub mod monitor;
pub mod pace;
pub mod procedure;
pub mod writer;
