//! Scale monitor service — leader-gated periodic metrics sampling.
//!
//! A single background task sleeps for the sampling interval, runs one tick,
//! and only then sleeps again, so ticks never overlap even when sampling
//! takes longer than the interval. Stopping signals the task through a
//! `watch` channel; an in-flight tick runs to completion and does not
//! re-arm. A loop started after a stop first joins the previous task, and
//! every tick body, scheduled or manual, runs under one async lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use warpscale_core::config::DEFAULT_SAMPLING_INTERVAL;
use warpscale_core::{LeadershipOracle, MetricsRepository, MonitorRegistry, ScaleError, ScaleResult};

/// Lifecycle state of the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Running,
}

/// Collaborators shared between the service handle and its task.
struct Sampler {
    registry: Arc<dyn MonitorRegistry>,
    repository: Arc<dyn MetricsRepository>,
    leadership: Arc<dyn LeadershipOracle>,
    /// Held for the whole tick body.
    in_flight: tokio::sync::Mutex<()>,
}

impl Sampler {
    /// One tick body. Returns the number of monitors sampled.
    async fn tick(&self) -> ScaleResult<usize> {
        let _guard = self.in_flight.lock().await;

        // Leadership is read once per tick and never cached across ticks.
        if !self.leadership.is_primary() {
            debug!("not primary host, skipping metrics sample");
            return Ok(0);
        }

        let monitors = self.registry.get_monitors()?;
        self.repository.sample(&monitors).await?;
        Ok(monitors.len())
    }
}

/// Handle to a running sampling task.
struct Worker {
    shutdown_tx: watch::Sender<bool>,
}

impl Worker {
    fn is_running(&self) -> bool {
        // The task owns the only receiver; it is dropped when the loop exits.
        !self.shutdown_tx.is_closed()
    }
}

/// Takes periodic metrics samples for all active monitors on the primary host.
pub struct ScaleMonitorService {
    sampler: Arc<Sampler>,
    interval: Duration,
    worker: Mutex<Option<Worker>>,
    handle: Mutex<Option<JoinHandle<ScaleResult<()>>>>,
    disposed: AtomicBool,
}

impl ScaleMonitorService {
    /// Create a stopped service sampling every 10 seconds.
    pub fn new(
        registry: Arc<dyn MonitorRegistry>,
        repository: Arc<dyn MetricsRepository>,
        leadership: Arc<dyn LeadershipOracle>,
    ) -> Self {
        Self {
            sampler: Arc::new(Sampler {
                registry,
                repository,
                leadership,
                in_flight: tokio::sync::Mutex::new(()),
            }),
            interval: DEFAULT_SAMPLING_INTERVAL,
            worker: Mutex::new(None),
            handle: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    /// Set the sampling interval (minimum 1ms).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> ServiceState {
        match lock(&self.worker).as_ref() {
            Some(worker) if worker.is_running() => ServiceState::Running,
            _ => ServiceState::Stopped,
        }
    }

    /// Arm the sampling loop. The first tick fires one interval from now.
    ///
    /// Starting a running service is a no-op. Must be called from within a
    /// Tokio runtime. After a stop, the new loop waits for the previous task
    /// to exit; if that task ended on an unrecoverable error nobody waited
    /// for, the new loop ends with the same error instead of sampling.
    pub fn start(&self) -> ScaleResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(ScaleError::Disposed);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ScaleError::Config(format!("no tokio runtime to start sampling on: {e}")))?;

        let mut worker = lock(&self.worker);
        if worker.as_ref().is_some_and(Worker::is_running) {
            debug!("scale monitor service already running");
            return Ok(());
        }

        // The previous task may still be finishing a tick after a stop.
        let mut handle = lock(&self.handle);
        let previous = handle.take();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sampler = Arc::clone(&self.sampler);
        let interval = self.interval;
        *handle = Some(runtime.spawn(async move {
            if let Some(previous) = previous {
                join_sampling_task(previous).await?;
            }
            run_sampling_loop(sampler, interval, shutdown_rx).await
        }));

        *worker = Some(Worker { shutdown_tx });

        info!(interval_ms = self.interval.as_millis() as u64, "scale monitor service started");
        Ok(())
    }

    /// Disarm the sampling loop. Safe to call repeatedly.
    ///
    /// A tick already in progress finishes but does not schedule another.
    pub fn stop(&self) {
        if let Some(worker) = lock(&self.worker).take() {
            // Fails only if the task already exited.
            let _ = worker.shutdown_tx.send(true);
            info!("scale monitor service stopped");
        }
    }

    /// Stop the loop and release the task handle. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop();
        drop(lock(&self.handle).take());
        debug!("scale monitor service disposed");
    }

    /// Run one tick immediately, outside the schedule.
    ///
    /// Waits for a scheduled tick in progress to finish first.
    pub async fn tick(&self) -> ScaleResult<usize> {
        self.sampler.tick().await
    }

    /// Wait for the sampling loop to end.
    ///
    /// Returns `Ok(())` after a clean stop, or the unrecoverable error (or
    /// panic) that terminated the loop.
    pub async fn wait(&self) -> ScaleResult<()> {
        let handle = lock(&self.handle).take();
        let Some(handle) = handle else {
            return Ok(());
        };

        join_sampling_task(handle).await
    }
}

/// Await a sampling task, mapping a panic to `Unrecoverable`.
async fn join_sampling_task(handle: JoinHandle<ScaleResult<()>>) -> ScaleResult<()> {
    match handle.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(ScaleError::Unrecoverable(format!(
            "metrics sampling task panicked: {e}"
        ))),
        Err(_) => Ok(()),
    }
}

impl Drop for ScaleMonitorService {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// The sampling loop. Exits on shutdown or on an unrecoverable error.
async fn run_sampling_loop(
    sampler: Arc<Sampler>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> ScaleResult<()> {
    debug!(interval_ms = interval.as_millis() as u64, "metrics sampling loop starting");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                debug!("metrics sampling loop shutting down");
                return Ok(());
            }
        }

        match sampler.tick().await {
            Ok(sampled) => debug!(monitors = sampled, "metrics sample tick complete"),
            Err(e) if e.is_fatal() => {
                error!(error = %e, "unrecoverable failure during metrics sampling, stopping loop");
                return Err(e);
            }
            Err(e) => error!(error = %e, "failed to collect/persist metrics sample"),
        }

        // A stop that raced with the tick wins; do not re-arm.
        if *shutdown.borrow() {
            debug!("metrics sampling loop stopped during tick");
            return Ok(());
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
