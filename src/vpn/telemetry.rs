//! Telemetry Simulator
//!
//! Produces synthetic throughput samples on a fixed cadence while a session is
//! connected. Nothing is measured; rates are drawn uniformly from configured
//! ranges.
//!
//! # Invariants
//! - At most one sampling loop per simulator. `start()` stops the previous loop first.
//! - After `stop()` returns, the loop never invokes its callback again.
//! - Tick numbers within a run are strictly increasing from 1.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::types::TelemetrySample;
use crate::config::TelemetrySettings;

/// Default sampling cadence
const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Sampling cadence and rate ranges (MB/s)
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    pub interval: Duration,
    pub download: Range<f64>,
    pub upload: Range<f64>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            download: 10.0..60.0,
            upload: 5.0..25.0,
        }
    }
}

impl From<&TelemetrySettings> for TelemetryConfig {
    fn from(settings: &TelemetrySettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.interval_ms),
            download: settings.download_min..settings.download_max,
            upload: settings.upload_min..settings.upload_max,
        }
    }
}

/// Counts sampling loops that are alive (spawned and not yet dropped)
struct LoopGuard(Arc<AtomicUsize>);

impl LoopGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ActiveRun {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Periodic generator of synthetic samples
pub struct TelemetrySimulator {
    config: TelemetryConfig,
    active: Option<ActiveRun>,
    live_loops: Arc<AtomicUsize>,
}

impl TelemetrySimulator {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            config,
            active: None,
            live_loops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start sampling. `on_tick` runs once per interval; returning `false`
    /// ends the loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&mut self, on_tick: F)
    where
        F: FnMut(TelemetrySample) -> bool + Send + 'static,
    {
        self.stop();

        let (stop_tx, stop_rx) = oneshot::channel();
        let guard = LoopGuard::new(self.live_loops.clone());
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            sampling_loop(config, on_tick, stop_rx).await;
        });

        self.active = Some(ActiveRun { stop_tx, handle });
    }

    /// Stop sampling. No-op when not started.
    pub fn stop(&mut self) {
        if let Some(run) = self.active.take() {
            let _ = run.stop_tx.send(());
            run.handle.abort();
            debug!("Telemetry stop requested");
        }
    }

    /// Whether a loop has been started and not stopped or finished
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .map(|run| !run.handle.is_finished())
            .unwrap_or(false)
    }

    /// Number of sampling tasks still alive. Aborted tasks are counted until
    /// the runtime drops them.
    pub fn live_loops(&self) -> usize {
        self.live_loops.load(Ordering::SeqCst)
    }
}

impl Default for TelemetrySimulator {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}

impl Drop for TelemetrySimulator {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sampling_loop<F>(
    config: TelemetryConfig,
    mut on_tick: F,
    mut stop_rx: oneshot::Receiver<()>,
) where
    F: FnMut(TelemetrySample) -> bool,
{
    let mut interval = tokio::time::interval(config.interval);
    // Skip the immediate first tick
    interval.tick().await;

    let mut tick: u64 = 0;
    debug!("Telemetry sampling started (interval {:?})", config.interval);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                debug!("Telemetry sampling stopped after {} ticks", tick);
                break;
            }
            _ = interval.tick() => {
                tick += 1;
                let sample = draw_sample(tick, &config);
                trace!(
                    "Telemetry tick {}: down={:.1} up={:.1}",
                    tick, sample.download_rate, sample.upload_rate
                );
                if !on_tick(sample) {
                    debug!("Telemetry consumer detached at tick {}", tick);
                    break;
                }
            }
        }
    }
}

fn draw_sample(tick: u64, config: &TelemetryConfig) -> TelemetrySample {
    let mut rng = rand::thread_rng();
    TelemetrySample {
        tick,
        download_rate: uniform(&mut rng, &config.download),
        upload_rate: uniform(&mut rng, &config.upload),
    }
}

fn uniform<R: Rng>(rng: &mut R, range: &Range<f64>) -> f64 {
    if range.start < range.end {
        rng.gen_range(range.clone())
    } else {
        range.start
    }
}
