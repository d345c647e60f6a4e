//! VISA bus transport for GPIB/serial/Ethernet instruments.
//!
//! Wraps the `visa-rs` crate and provides async I/O by executing the
//! blocking VISA calls on Tokio's blocking thread pool. Supports resource
//! strings like:
//! - `"GPIB0::9::INSTR"` (GPIB interface)
//! - `"ASRL1::INSTR"` (serial)
//! - `"TCPIP0::192.168.1.100::INSTR"` (Ethernet/LXI)
//!
//! A pacing delay is inserted before every write: the bench instruments
//! mis-handle rapid back-to-back writes on the bus.

use crate::channel::{parse_ascii_values, Channel};
use crate::error::{BenchError, BenchResult};
use async_trait::async_trait;
use log::debug;
use std::ffi::CString;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use visa_rs::prelude::*;

pub struct VisaChannel {
    resource: String,
    /// Guard delay before each write.
    pacing: Duration,
    /// Line terminator for commands (typically "\n" for SCPI).
    terminator: String,
    session: Arc<Mutex<visa_rs::Instrument>>,
}

impl VisaChannel {
    /// Opens the VISA resource with default pacing and terminator.
    pub fn open(resource: &str) -> BenchResult<Self> {
        let rm = DefaultRM::new().map_err(|e| BenchError::Transport(e.to_string()))?;
        let c_string = CString::new(resource)
            .map_err(|e| BenchError::Transport(format!("invalid resource string: {e}")))?;
        let visa_string = visa_rs::VisaString::from(c_string);
        let session = rm
            .open(&visa_string, AccessMode::NO_LOCK, TIMEOUT_IMMEDIATE)
            .map_err(|e| {
                BenchError::Transport(format!("failed to open VISA resource '{resource}': {e}"))
            })?;
        debug!("VISA resource '{resource}' opened");
        Ok(Self {
            resource: resource.to_string(),
            pacing: Duration::from_secs(1),
            terminator: "\n".to_string(),
            session: Arc::new(Mutex::new(session)),
        })
    }

    /// Set the guard delay inserted before each write.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the line terminator appended to commands.
    pub fn with_terminator(mut self, terminator: String) -> Self {
        self.terminator = terminator;
        self
    }

    fn join_err(e: tokio::task::JoinError) -> BenchError {
        BenchError::Transport(format!("bus I/O task panicked: {e}"))
    }
}

#[async_trait]
impl Channel for VisaChannel {
    async fn command(&self, text: &str) -> BenchResult<()> {
        tokio::time::sleep(self.pacing).await;
        let session = self.session.clone();
        let line = format!("{}{}", text, self.terminator);
        tokio::task::spawn_blocking(move || {
            let mut session = session.blocking_lock();
            session.write_all(line.as_bytes())
        })
        .await
        .map_err(Self::join_err)??;
        debug!("'{}' <- {}", self.resource, text);
        Ok(())
    }

    async fn query(&self, text: &str) -> BenchResult<String> {
        tokio::time::sleep(self.pacing).await;
        let session = self.session.clone();
        let line = format!("{}{}", text, self.terminator);
        let reply = tokio::task::spawn_blocking(move || {
            let mut session = session.blocking_lock();
            session.write_all(line.as_bytes())?;
            let mut buf = [0u8; 1024];
            let bytes_read = session.read(&mut buf)?;
            Ok::<String, std::io::Error>(String::from_utf8_lossy(&buf[..bytes_read]).trim().to_string())
        })
        .await
        .map_err(Self::join_err)??;
        debug!("'{}' query {} -> {}", self.resource, text, reply);
        Ok(reply)
    }

    async fn query_values(&self, text: &str) -> BenchResult<Vec<f64>> {
        let reply = self.query(text).await?;
        parse_ascii_values(&reply)
    }

    async fn clear(&self) -> BenchResult<()> {
        // VISA device clear, not SCPI *CLS: this flushes the instrument's
        // I/O buffers, which is what a retry after a garbled reply needs.
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || {
            let session = session.blocking_lock();
            session.clear()
        })
        .await
        .map_err(Self::join_err)?
        .map_err(|e| BenchError::Transport(format!("device clear failed: {e}")))?;
        debug!("'{}' device clear", self.resource);
        Ok(())
    }
}

/// Sends `*IDN?` to each listed resource and returns `(resource, reply)`
/// pairs; a resource that fails to open or answer reports the error text
/// in place of an identity.
pub async fn scan_resources(resources: &[String]) -> Vec<(String, String)> {
    let mut results = Vec::with_capacity(resources.len());
    for resource in resources {
        let identity = match VisaChannel::open(resource) {
            Ok(channel) => match channel.query("*IDN?").await {
                Ok(reply) => reply,
                Err(e) => format!("read error: {e}"),
            },
            Err(e) => format!("open error: {e}"),
        };
        results.push((resource.clone(), identity));
    }
    results
}
