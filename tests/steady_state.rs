//! Convergence semantics of the steady-state monitor against a scripted
//! temperature source.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tc_bench::error::{BenchError, BenchResult};
use tc_bench::monitor::{SteadyStateMonitor, TemperatureSource};
use tc_bench::pace::{NoopSleeper, RetryPolicy};
use tokio::sync::Mutex;

/// Yields scripted outcomes in order. Running off the end of the script
/// is a fatal error so a test that would otherwise spin forever fails
/// instead.
struct ScriptedSource {
    script: Mutex<VecDeque<Result<f64, ()>>>,
    reads: AtomicUsize,
}

impl ScriptedSource {
    fn new(script: impl IntoIterator<Item = Result<f64, ()>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            reads: AtomicUsize::new(0),
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TemperatureSource for ScriptedSource {
    async fn read_temp(&self) -> BenchResult<f64> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        match self.script.lock().await.pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(())) => Err(BenchError::BadReading {
                instrument: "scripted",
                detail: "scripted failure".to_string(),
            }),
            None => Err(BenchError::Config("script exhausted".to_string())),
        }
    }
}

fn monitor() -> SteadyStateMonitor {
    SteadyStateMonitor::new(Arc::new(NoopSleeper))
}

#[tokio::test]
async fn converges_only_once_the_window_is_full() {
    // 60 identical readings: steady on exactly the 60th poll, not before.
    let source = ScriptedSource::new((0..60).map(|_| Ok(25.0)));
    monitor().wait_until_steady(&source).await.unwrap();
    assert_eq!(source.reads(), 60);
}

#[tokio::test]
async fn single_outlier_restarts_the_wait() {
    // 59 steady readings, one outlier, then 60 more steady. The window is
    // only within tolerance again once the outlier has been evicted, which
    // takes a further full window of samples.
    let script = (0..59)
        .map(|_| Ok(25.0))
        .chain(std::iter::once(Ok(26.0)))
        .chain((0..60).map(|_| Ok(25.0)));
    let source = ScriptedSource::new(script);
    monitor().wait_until_steady(&source).await.unwrap();
    assert_eq!(source.reads(), 120);
}

#[tokio::test]
async fn spread_at_the_tolerance_counts_as_steady() {
    // max - min equals the tolerance exactly; the comparison is inclusive.
    let script = (0..59).map(|_| Ok(25.0)).chain(std::iter::once(Ok(25.5)));
    let source = ScriptedSource::new(script);
    monitor()
        .with_steady_delta(0.5)
        .wait_until_steady(&source)
        .await
        .unwrap();
    assert_eq!(source.reads(), 60);
}

#[tokio::test]
async fn failed_reads_do_not_touch_the_window() {
    // Failures interleaved with good readings: convergence still needs
    // exactly 5 successes for a 5-sample window, and the earlier successes
    // are not lost to the failures in between.
    let script = vec![
        Ok(25.0),
        Err(()),
        Ok(25.0),
        Err(()),
        Err(()),
        Ok(25.0),
        Ok(25.0),
        Ok(25.0),
    ];
    let source = ScriptedSource::new(script);
    monitor()
        .with_window(5)
        .wait_until_steady(&source)
        .await
        .unwrap();
    assert_eq!(source.reads(), 8);
}

#[tokio::test]
async fn capped_retry_gives_up_after_the_limit() {
    let source = ScriptedSource::new((0..10).map(|_| Err(())));
    let err = monitor()
        .with_retry(RetryPolicy::capped(3))
        .wait_until_steady(&source)
        .await
        .unwrap_err();
    assert!(matches!(err, BenchError::RetriesExhausted(3)));
    assert_eq!(source.reads(), 3);
}

#[tokio::test]
async fn fatal_error_ends_the_wait() {
    // Script exhaustion surfaces as a non-transient error and is returned
    // rather than retried.
    let source = ScriptedSource::new([Ok(25.0)]);
    let err = monitor()
        .with_window(3)
        .wait_until_steady(&source)
        .await
        .unwrap_err();
    assert!(!err.is_transient());
    assert_eq!(source.reads(), 2);
}
