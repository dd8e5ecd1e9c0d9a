//! Adaptive memory management over the object pool
//!
//! Two independent background cycles drive all eviction: a slow cleanup
//! cycle (TTL sweep, hard-cap shrink, gentle pressure hint) and a faster
//! monitor cycle that reacts to heap pressure, up to dropping the whole
//! pool. Both run on dedicated threads cancelled through a timed condition
//! variable, so shutdown wakes them immediately but a pass in progress is
//! always allowed to finish.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::core::pool::ObjectPool;
use crate::traits::HeapProbe;

/// How hard the relief hook is being asked to work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressureLevel {
    /// Cleanup-cycle hint: heap ratio above the gentle threshold.
    Elevated,
    /// Monitor-cycle escalation: the pool has just been dropped entirely.
    Critical,
}

/// Callback asked to relieve memory pressure at the runtime boundary.
///
/// A policy hook rather than a literal collector call; the default
/// implementation only logs.
pub type ReliefHook = dyn Fn(PressureLevel) + Send + Sync;

#[derive(Clone, Debug)]
pub struct MemoryConfig {
    pub cleanup_interval: Duration,
    pub monitor_interval: Duration,
    /// Cleanup-cycle cap; above this the pool is halved.
    pub pool_hard_cap: usize,
    /// Monitor-cycle cap used during an elevated-pressure pass.
    pub pool_soft_cap: usize,
    /// Cleanup-cycle heap ratio that triggers a relief hint.
    pub relief_hint_ratio: f64,
    /// Monitor-cycle heap ratio that triggers forced cleanup.
    pub forced_cleanup_ratio: f64,
    /// Monitor-cycle heap ratio that triggers the lighter pass.
    pub elevated_ratio: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(300),
            monitor_interval: Duration::from_secs(60),
            pool_hard_cap: 1000,
            pool_soft_cap: 500,
            relief_hint_ratio: 0.85,
            forced_cleanup_ratio: 0.90,
            elevated_ratio: 0.75,
        }
    }
}

/// Shutdown signal shared with the worker threads.
struct Shutdown {
    stopped: Mutex<bool>,
    signal: Condvar,
}

/// State shared between the optimizer handle and its worker threads.
struct Cycles<P: HeapProbe> {
    pool: Arc<ObjectPool>,
    probe: Arc<P>,
    relief: Arc<ReliefHook>,
    config: MemoryConfig,
}

impl<P: HeapProbe> Cycles<P> {
    /// One cleanup-cycle pass: TTL sweep, hard-cap shrink, gentle hint.
    fn cleanup_pass(&self) {
        let evicted = self.pool.evict_expired();
        if evicted > 0 {
            debug!("Evicted {evicted} expired pool entries");
        }

        if self.pool.len() > self.config.pool_hard_cap {
            let removed = self.pool.shrink_by_half();
            debug!("Pool over hard cap, evicted {removed} entries");
        }

        if let Some(sample) = self.probe.sample() {
            if sample.ratio() > self.config.relief_hint_ratio {
                debug!(
                    "Heap ratio {:.2} above hint threshold, requesting relief",
                    sample.ratio()
                );
                (self.relief)(PressureLevel::Elevated);
            }
        }
    }

    /// One monitor-cycle pass: react to heap pressure.
    fn monitor_pass(&self) {
        let Some(sample) = self.probe.sample() else {
            return;
        };
        let ratio = sample.ratio();

        if ratio > self.config.forced_cleanup_ratio {
            warn!("Heap ratio {ratio:.2} critical, dropping the staging pool");
            self.pool.clear();
            (self.relief)(PressureLevel::Critical);
        } else if ratio > self.config.elevated_ratio {
            self.pool.evict_expired();
            if self.pool.len() > self.config.pool_soft_cap {
                self.pool.shrink_by_half();
            }
        }
    }
}

/// Owner of the two background cycles.
pub struct MemoryOptimizer<P: HeapProbe + 'static> {
    cycles: Arc<Cycles<P>>,
    shutdown: Arc<Shutdown>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl<P: HeapProbe + 'static> MemoryOptimizer<P> {
    pub fn new(pool: Arc<ObjectPool>, probe: Arc<P>) -> Self {
        Self {
            cycles: Arc::new(Cycles {
                pool,
                probe,
                relief: Arc::new(|level: PressureLevel| {
                    debug!("Memory pressure relief requested: {level:?}");
                }),
                config: MemoryConfig::default(),
            }),
            shutdown: Arc::new(Shutdown {
                stopped: Mutex::new(false),
                signal: Condvar::new(),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Replace the tuning knobs (fluent API).
    pub fn with_config(mut self, config: MemoryConfig) -> Self {
        let cycles = Arc::get_mut(&mut self.cycles)
            .expect("with_config must be called before start");
        cycles.config = config;
        self
    }

    /// Replace the relief hook (fluent API).
    pub fn with_relief_hook(
        mut self,
        hook: impl Fn(PressureLevel) + Send + Sync + 'static,
    ) -> Self {
        let cycles = Arc::get_mut(&mut self.cycles)
            .expect("with_relief_hook must be called before start");
        cycles.relief = Arc::new(hook);
        self
    }

    /// Launch the cleanup and monitor threads.
    pub fn start(&self) {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return;
        }

        let cleanup_interval = self.cycles.config.cleanup_interval;
        let monitor_interval = self.cycles.config.monitor_interval;

        workers.push(Self::spawn_cycle(
            "pool-cleanup",
            cleanup_interval,
            Arc::clone(&self.cycles),
            Arc::clone(&self.shutdown),
            Cycles::cleanup_pass,
        ));
        workers.push(Self::spawn_cycle(
            "pool-monitor",
            monitor_interval,
            Arc::clone(&self.cycles),
            Arc::clone(&self.shutdown),
            Cycles::monitor_pass,
        ));
    }

    fn spawn_cycle(
        name: &str,
        interval: Duration,
        cycles: Arc<Cycles<P>>,
        shutdown: Arc<Shutdown>,
        pass: fn(&Cycles<P>),
    ) -> thread::JoinHandle<()> {
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || loop {
                {
                    let mut stopped = shutdown.stopped.lock();
                    if *stopped {
                        break;
                    }
                    shutdown.signal.wait_for(&mut stopped, interval);
                    if *stopped {
                        break;
                    }
                }
                pass(&cycles);
            })
            .expect("failed to spawn memory cycle thread")
    }

    /// Run one cleanup pass immediately on the caller's thread.
    pub fn run_cleanup_pass(&self) {
        self.cycles.cleanup_pass();
    }

    /// Run one monitor pass immediately on the caller's thread.
    pub fn run_monitor_pass(&self) {
        self.cycles.monitor_pass();
    }

    /// Cancel both cycles, wait for them, and drop the pool contents.
    pub fn shutdown(&self) {
        {
            let mut stopped = self.shutdown.stopped.lock();
            *stopped = true;
        }
        self.shutdown.signal.notify_all();

        for worker in self.workers.lock().drain(..) {
            if worker.join().is_err() {
                warn!("Memory cycle thread panicked during shutdown");
            }
        }

        self.cycles.pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{HeapSample, MockHeapProbe};
    use serde_json::json;

    fn probe_with_ratio(ratio: f64) -> MockHeapProbe {
        let mut probe = MockHeapProbe::new();
        probe.expect_sample().returning(move || {
            Some(HeapSample {
                used_bytes: (ratio * 1000.0) as u64,
                max_bytes: 1000,
            })
        });
        probe
    }

    fn recording_hook() -> (
        Arc<parking_lot::Mutex<Vec<PressureLevel>>>,
        impl Fn(PressureLevel) + Send + Sync + 'static,
    ) {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |level| sink.lock().push(level))
    }

    #[test]
    fn critical_ratio_forces_the_pool_empty() {
        let pool = Arc::new(ObjectPool::new());
        for i in 0..50 {
            pool.insert(format!("k{i}"), json!(i));
        }

        let (seen, hook) = recording_hook();
        let optimizer = MemoryOptimizer::new(Arc::clone(&pool), Arc::new(probe_with_ratio(0.92)))
            .with_relief_hook(hook);

        optimizer.run_monitor_pass();

        assert!(pool.is_empty(), "forced cleanup ignores TTLs entirely");
        assert_eq!(seen.lock().as_slice(), &[PressureLevel::Critical]);
    }

    #[test]
    fn elevated_ratio_runs_the_lighter_pass() {
        let pool = Arc::new(ObjectPool::new());
        for i in 0..600 {
            pool.insert(format!("k{i}"), json!(i));
        }

        let (seen, hook) = recording_hook();
        let optimizer = MemoryOptimizer::new(Arc::clone(&pool), Arc::new(probe_with_ratio(0.80)))
            .with_relief_hook(hook);

        optimizer.run_monitor_pass();

        // over the 500 soft cap, so the pass halves the pool
        assert_eq!(pool.len(), 300);
        assert!(seen.lock().is_empty(), "no relief request below 0.90");
    }

    #[test]
    fn comfortable_ratio_leaves_the_pool_alone() {
        let pool = Arc::new(ObjectPool::new());
        for i in 0..600 {
            pool.insert(format!("k{i}"), json!(i));
        }

        let optimizer = MemoryOptimizer::new(Arc::clone(&pool), Arc::new(probe_with_ratio(0.50)));
        optimizer.run_monitor_pass();

        assert_eq!(pool.len(), 600);
    }

    #[test]
    fn cleanup_pass_halves_an_over_cap_pool_and_hints() {
        let pool = Arc::new(ObjectPool::new());
        for i in 0..1200 {
            pool.insert(format!("k{i}"), json!(i));
        }

        let (seen, hook) = recording_hook();
        let optimizer = MemoryOptimizer::new(Arc::clone(&pool), Arc::new(probe_with_ratio(0.86)))
            .with_relief_hook(hook);

        optimizer.run_cleanup_pass();

        assert_eq!(pool.len(), 600);
        assert_eq!(seen.lock().as_slice(), &[PressureLevel::Elevated]);
    }

    #[test]
    fn shutdown_stops_the_cycles_and_drops_the_pool() {
        let pool = Arc::new(ObjectPool::new());
        pool.insert("k".to_string(), json!(1));

        let optimizer = MemoryOptimizer::new(Arc::clone(&pool), Arc::new(probe_with_ratio(0.10)))
            .with_config(MemoryConfig {
                cleanup_interval: Duration::from_millis(10),
                monitor_interval: Duration::from_millis(10),
                ..MemoryConfig::default()
            });

        optimizer.start();
        optimizer.shutdown();

        assert!(pool.is_empty());
    }
}
