//! Steady-state detection for the calibration bath.
//!
//! The monitor polls a temperature source on a fixed cadence and keeps the
//! most recent readings in a fixed-capacity FIFO window. The bath counts
//! as steady exactly when the window is full and its max-min spread is
//! within tolerance; a partially filled window never converges, however
//! small its spread. A failed read is skipped without touching the window
//! and retried on the next poll, by default forever.

use crate::error::{BenchError, BenchResult};
use crate::pace::{RetryPolicy, Sleeper};
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Anything the monitor can poll for a temperature.
#[async_trait]
pub trait TemperatureSource: Send + Sync {
    async fn read_temp(&self) -> BenchResult<f64>;
}

/// Fixed-capacity FIFO of recent temperature readings.
///
/// Pushing at capacity evicts exactly the oldest sample, so the window
/// never exceeds its capacity and never shrinks once full.
#[derive(Debug)]
pub struct TemperatureWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl TemperatureWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// `max - min` over the window; 0.0 while empty.
    pub fn spread(&self) -> f64 {
        let mut iter = self.samples.iter();
        let Some(&first) = iter.next() else {
            return 0.0;
        };
        let (min, max) = iter.fold((first, first), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
        max - min
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }
}

/// Sliding-window convergence monitor.
pub struct SteadyStateMonitor {
    steady_delta: f64,
    window: usize,
    poll_interval: Duration,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl SteadyStateMonitor {
    /// Default tuning: 0.1 degree tolerance over a 60-sample window at a
    /// 10-second poll, i.e. ten minutes of agreement.
    pub fn new(sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            steady_delta: 0.1,
            window: 60,
            poll_interval: Duration::from_secs(10),
            retry: RetryPolicy::unlimited(),
            sleeper,
        }
    }

    pub fn with_steady_delta(mut self, steady_delta: f64) -> Self {
        self.steady_delta = steady_delta;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Blocks until the source reads steady.
    ///
    /// Only a fatal (non-transient) source error, or an explicitly capped
    /// retry policy running out, ends the wait early. The poll-interval
    /// sleep happens on every iteration, success or failure, to rate-limit
    /// the physical bus.
    pub async fn wait_until_steady(&self, source: &dyn TemperatureSource) -> BenchResult<()> {
        let mut window = TemperatureWindow::new(self.window);
        let mut failures = 0u32;
        loop {
            match source.read_temp().await {
                Ok(reading) => {
                    window.push(reading);
                    let spread = window.spread();
                    debug!(
                        "steady-state poll: {reading:.3} (window {}/{}, spread {spread:.3})",
                        window.len(),
                        self.window
                    );
                    if window.is_full() && spread <= self.steady_delta {
                        return Ok(());
                    }
                }
                Err(e) if e.is_transient() => {
                    failures += 1;
                    warn!("steady-state read failed, retrying: {e}");
                    if self.retry.exhausted(failures) {
                        return Err(BenchError::RetriesExhausted(failures));
                    }
                }
                Err(e) => return Err(e),
            }
            self.sleeper.sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_never_exceeds_capacity() {
        let mut window = TemperatureWindow::new(60);
        for i in 0..1000 {
            window.push(f64::from(i));
            assert!(window.len() <= 60);
        }
        assert_eq!(window.len(), 60);
        assert!(window.is_full());
    }

    #[test]
    fn eviction_is_strict_fifo() {
        let mut window = TemperatureWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            window.push(v);
        }
        // 1.0 evicted; spread over [2, 3, 4]
        assert_eq!(window.spread(), 2.0);
    }

    #[test]
    fn empty_window_has_zero_spread() {
        let window = TemperatureWindow::new(10);
        assert!(window.is_empty());
        assert_eq!(window.spread(), 0.0);
    }

    #[test]
    fn partial_window_is_not_full() {
        let mut window = TemperatureWindow::new(60);
        for _ in 0..59 {
            window.push(25.0);
        }
        assert!(!window.is_full());
        assert_eq!(window.spread(), 0.0);
    }
}
