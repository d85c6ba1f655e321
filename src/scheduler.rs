//! Background decay scheduler.
//!
//! A dedicated thread wakes on a fixed interval and sweeps the whole store:
//! one exclusive hold, `apply_decay` then `apply_growth` on every plant. Tests
//! call [`DecayScheduler::tick`] directly and move a `ManualClock` instead of
//! waiting for the thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Sender};
use tracing::{debug, error, info, warn};

use crate::error::{GardenError, GardenResult};
use crate::lifecycle::{apply_decay, apply_growth, DecayOutcome, LifecycleConfig};
use crate::plant::Plant;
use crate::storage::{NoopSink, PlantSink, PlantStore};
use crate::time::Clock;

/// Counters for a single sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Plants visited.
    pub visited: usize,
    /// Plants that lost health and moved to `Decayed`.
    pub decayed: usize,
    /// Plants that died during this sweep.
    pub died: usize,
    /// Plants that advanced a growth stage.
    pub grew: usize,
}

/// Periodic decay and growth sweep over a plant store.
#[derive(Clone)]
pub struct DecayScheduler {
    store: Arc<dyn PlantStore>,
    clock: Arc<dyn Clock>,
    lifecycle: LifecycleConfig,
    interval: Duration,
    sink: Arc<dyn PlantSink>,
}

impl std::fmt::Debug for DecayScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecayScheduler")
            .field("lifecycle", &self.lifecycle)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl DecayScheduler {
    /// Create a scheduler; nothing runs until [`start`](Self::start).
    #[must_use]
    pub fn new(
        store: Arc<dyn PlantStore>,
        clock: Arc<dyn Clock>,
        lifecycle: LifecycleConfig,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            lifecycle,
            interval,
            sink: Arc::new(NoopSink),
        }
    }

    /// Attach a persistence sink that receives every plant a sweep changed.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn PlantSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The wake interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one sweep now.
    ///
    /// Never fails: a store error is logged and reported as an empty sweep.
    pub fn tick(&self) -> SweepReport {
        let now = self.clock.now();
        let lifecycle = self.lifecycle;
        let mut report = SweepReport::default();

        let swept = self.store.for_each(&mut |plant: &mut Plant| {
            report.visited += 1;
            let decay = apply_decay(plant, now, &lifecycle);
            match decay {
                DecayOutcome::Untouched => {}
                DecayOutcome::Decayed => report.decayed += 1,
                DecayOutcome::Died => report.died += 1,
            }
            let grew = apply_growth(plant);
            if grew {
                report.grew += 1;
            }
            grew || decay != DecayOutcome::Untouched
        });

        let changed = match swept {
            Ok(changed) => changed,
            Err(e) => {
                error!(error = %e, "decay sweep failed");
                return SweepReport::default();
            }
        };

        for plant in &changed {
            if let Err(e) = self.sink.save(plant) {
                warn!(owner = %plant.owner_id, plant = %plant.id, error = %e, "failed to persist swept plant");
            }
        }

        report
    }

    /// Start the background thread.
    ///
    /// The returned handle stops and joins the thread when stopped or dropped.
    pub fn start(self) -> GardenResult<SchedulerHandle> {
        let interval = self.interval.max(Duration::from_millis(1));
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticks = Arc::new(AtomicU64::new(0));
        let thread_ticks = Arc::clone(&ticks);

        let join = thread::Builder::new()
            .name("verdant-decay".to_string())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(interval);
                let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
                info!(interval_ms, "decay scheduler started");
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            let report = self.tick();
                            thread_ticks.fetch_add(1, Ordering::Relaxed);
                            debug!(
                                visited = report.visited,
                                decayed = report.decayed,
                                died = report.died,
                                grew = report.grew,
                                "decay sweep"
                            );
                        }
                    }
                }
                info!("decay scheduler stopped");
            })
            .map_err(|e| GardenError::internal(format!("failed to spawn decay scheduler: {e}")))?;

        Ok(SchedulerHandle {
            stop_tx: Some(stop_tx),
            join: Some(join),
            ticks,
        })
    }
}

/// Handle to a running decay scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop_tx: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl SchedulerHandle {
    /// Number of sweeps completed so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// True while the scheduler thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Stop the scheduler and wait for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the stop channel, which the loop
        // treats the same as an explicit stop.
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("decay scheduler thread panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
