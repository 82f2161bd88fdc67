//! Fixed-cadence tick loop on a dedicated thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use fc_controls::SampleClock;
use fc_core::StopSignal;
use tracing::{error, info};

use crate::error::ServiceResult;
use crate::service::FanService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Time between ticks.
    pub period: Duration,
    /// Stop on its own after this many ticks.
    pub max_ticks: Option<u64>,
}

impl RunnerOptions {
    /// Tick once per configured fetch interval, forever.
    pub fn for_service(service: &FanService) -> Self {
        Self {
            period: Duration::from_secs(service.get_sensor_fetch_frequency().max(1)),
            max_ticks: None,
        }
    }
}

/// Handle to the tick thread. Dropping it stops the loop.
pub struct ServiceRunner {
    stop: Arc<StopSignal>,
    ticks: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl ServiceRunner {
    /// First tick runs one period after start.
    pub fn start(service: Arc<FanService>, options: RunnerOptions) -> ServiceResult<Self> {
        let mut cadence = SampleClock::new(options.period.as_secs_f64(), 0.0)?;
        let stop = Arc::new(StopSignal::new());
        let ticks = Arc::new(AtomicU64::new(0));

        let remote_stop = Arc::clone(&stop);
        let remote_ticks = Arc::clone(&ticks);
        let handle = thread::Builder::new()
            .name("fc-control-loop".to_string())
            .spawn(move || {
                let started = Instant::now();
                info!(period_ms = options.period.as_millis() as u64, "control loop started");
                loop {
                    let now = started.elapsed().as_secs_f64();
                    if !cadence.should_sample(now) {
                        let wait = Duration::from_secs_f64(cadence.time_until_sample(now));
                        if remote_stop.sleep(wait) {
                            break;
                        }
                        continue;
                    }
                    cadence.advance(now);
                    // A stop requested during the sleep wins over a due tick.
                    if remote_stop.is_stopped() {
                        break;
                    }
                    service.control_fan();
                    let done = remote_ticks.fetch_add(1, Ordering::SeqCst) + 1;
                    if options.max_ticks.is_some_and(|max| done >= max) {
                        break;
                    }
                }
                info!(
                    ticks = remote_ticks.load(Ordering::SeqCst),
                    "control loop stopped"
                );
            })?;

        Ok(Self {
            stop,
            ticks,
            handle: Some(handle),
        })
    }

    /// Ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Block until the loop ends on its own (`max_ticks`) or is stopped.
    pub fn wait(&mut self) -> u64 {
        self.join();
        self.ticks()
    }

    /// Stop the loop and wait for the current tick to finish.
    pub fn stop(&mut self) {
        self.stop.stop();
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("control loop thread panicked");
            }
        }
    }
}

impl Drop for ServiceRunner {
    fn drop(&mut self) {
        self.stop();
    }
}
