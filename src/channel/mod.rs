//! Instrument bus transports.
//!
//! This module contains implementations of the [`Channel`] trait, the
//! low-level command/query abstraction every device driver sits on. The
//! transport is opaque to the drivers: serial, GPIB, or Ethernet resources
//! all look the same through it.
//!
//! A channel handle is shared as `Arc<dyn Channel>`; implementations
//! serialize bus access internally, so a draw task and the periodic
//! sampler can hold the same DAQ handle without interleaving commands.

pub mod mock;
#[cfg(feature = "instrument_visa")]
pub mod visa;

pub use mock::MockChannel;
#[cfg(feature = "instrument_visa")]
pub use visa::VisaChannel;

use crate::error::{BenchError, BenchResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Opaque command/query transport to one instrument.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Fire-and-forget write.
    async fn command(&self, text: &str) -> BenchResult<()>;

    /// Write a query and read back one reply, trimmed.
    async fn query(&self, text: &str) -> BenchResult<String>;

    /// Write a query and parse the reply as comma-separated ASCII values.
    async fn query_values(&self, text: &str) -> BenchResult<Vec<f64>> {
        let reply = self.query(text).await?;
        parse_ascii_values(&reply)
    }

    /// Device clear, issued before a fresh read on flaky instruments.
    async fn clear(&self) -> BenchResult<()>;
}

/// Parses a comma-separated ASCII value reply (`"+2.5013E+01,+2.4987E+01"`).
pub fn parse_ascii_values(reply: &str) -> BenchResult<Vec<f64>> {
    reply
        .split(',')
        .map(|field| {
            field.trim().parse::<f64>().map_err(|_| BenchError::BadReading {
                instrument: "bus",
                detail: format!("unparseable value '{}' in '{}'", field.trim(), reply),
            })
        })
        .collect()
}

/// Opens a bus channel for the given resource string.
///
/// Requires the `instrument_visa` feature; without it this returns a clear
/// error rather than silently falling back to anything.
pub fn open_bus(resource: &str) -> BenchResult<Arc<dyn Channel>> {
    #[cfg(feature = "instrument_visa")]
    {
        Ok(Arc::new(VisaChannel::open(resource)?))
    }

    #[cfg(not(feature = "instrument_visa"))]
    {
        let _ = resource;
        Err(BenchError::FeatureNotEnabled("instrument_visa"))
    }
}
