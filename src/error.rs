//! Custom error types for the application.
//!
//! `BenchError` consolidates every failure the bench can hit, from bus
//! transport problems to malformed instrument replies. The split that
//! matters operationally is transient vs. fatal: a transient error (a bad
//! reading, a flaky bus reply) is recovered locally by the caller's retry
//! policy, while a fatal error (unconfigured channels, an out-of-range
//! setpoint, a broken config) aborts the operation that hit it.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[derive(Error, Debug)]
pub enum BenchError {
    /// Malformed or out-of-range instrument reply. Transient; callers retry.
    #[error("bad reading from {instrument}: {detail}")]
    BadReading {
        instrument: &'static str,
        detail: String,
    },

    /// Bus-level communication failure. Transient; callers retry.
    #[error("transport error: {0}")]
    Transport(String),

    /// Acquisition was requested before the DAQ channel list was set.
    #[error("DAQ channels not configured; set channels before reading")]
    ChannelsNotConfigured,

    /// A command argument outside the device's hard limits. Rejected before
    /// transmission, never clamped.
    #[error("setpoint {value} outside allowed range {min}..={max}")]
    InvalidSetpoint { value: f64, min: f64, max: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration load error: {0}")]
    ConfigLoad(#[from] Box<figment::Error>),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("schedule error: {0}")]
    Schedule(String),

    #[error("retries exhausted after {0} attempts")]
    RetriesExhausted(u32),

    #[error("concurrent task failed: {0}")]
    Task(String),

    #[error("feature '{0}' is not enabled. Rebuild with --features {0}")]
    FeatureNotEnabled(&'static str),
}

impl From<figment::Error> for BenchError {
    fn from(e: figment::Error) -> Self {
        BenchError::ConfigLoad(Box::new(e))
    }
}

impl BenchError {
    /// Whether the error is expected to clear on its own and is safe to
    /// retry at the acquisition layer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BenchError::BadReading { .. } | BenchError::Transport(_)
        )
    }

    /// Coarse category label used when logging a top-level failure.
    pub fn category(&self) -> &'static str {
        match self {
            BenchError::BadReading { .. } => "bad reading",
            BenchError::Transport(_) => "transport",
            BenchError::ChannelsNotConfigured => "precondition",
            BenchError::InvalidSetpoint { .. } => "invalid setpoint",
            BenchError::Io(_) => "io",
            BenchError::Csv(_) => "csv",
            BenchError::ConfigLoad(_) | BenchError::Config(_) => "configuration",
            BenchError::Schedule(_) => "schedule",
            BenchError::RetriesExhausted(_) => "retries exhausted",
            BenchError::Task(_) => "task",
            BenchError::FeatureNotEnabled(_) => "feature disabled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(BenchError::BadReading {
            instrument: "PRT",
            detail: "garbage".into()
        }
        .is_transient());
        assert!(BenchError::Transport("timeout".into()).is_transient());
        assert!(!BenchError::ChannelsNotConfigured.is_transient());
        assert!(!BenchError::InvalidSetpoint {
            value: 12.0,
            min: 0.0,
            max: 10.0
        }
        .is_transient());
    }

    #[test]
    fn category_labels() {
        assert_eq!(BenchError::ChannelsNotConfigured.category(), "precondition");
        assert_eq!(BenchError::Schedule("bad row".into()).category(), "schedule");
    }
}
