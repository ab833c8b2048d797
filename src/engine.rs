use std::sync::{Arc, Mutex, MutexGuard, Weak};

use log::{debug, error, warn};

use crate::config::SamplerConfig;
use crate::metrics::{MetricStatsTable, MetricsSink};
use crate::samplers::{poll, BackgroundScheduler, PollReport, SamplerHandle, SamplerSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    Added,
    Duplicate,
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    NoPeriodicSamplers,
    Unavailable,
    Disabled,
}

/// Registration surface shared by the real engine and the disabled-agent shim.
pub trait SamplerHost {
    fn add_periodic_sampler(&self, sampler: SamplerHandle) -> Registration;
    fn add_harvest_sampler(&self, sampler: SamplerHandle) -> Registration;
    fn start_background_scheduler(&self) -> StartOutcome;
}

/// Owns the periodic and harvest sampler sets and the background task that
/// drives the periodic one.
pub struct StatsEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: SamplerConfig,
    periodic: Arc<SamplerSet>,
    harvest: SamplerSet,
    sink: Arc<dyn MetricsSink>,
    scheduler: Mutex<Option<BackgroundScheduler>>,
}

impl StatsEngine {
    pub fn new(config: SamplerConfig) -> Self {
        Self::with_sink(config, Arc::new(MetricStatsTable::new()))
    }

    pub fn with_sink(config: SamplerConfig, sink: Arc<dyn MetricsSink>) -> Self {
        StatsEngine {
            inner: Arc::new(EngineInner {
                config,
                periodic: Arc::new(SamplerSet::new()),
                harvest: SamplerSet::new(),
                sink,
                scheduler: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.inner.config
    }

    pub fn metrics_sink(&self) -> Arc<dyn MetricsSink> {
        Arc::clone(&self.inner.sink)
    }

    pub fn periodic_samplers(&self) -> &SamplerSet {
        &self.inner.periodic
    }

    pub fn harvest_samplers(&self) -> &SamplerSet {
        &self.inner.harvest
    }

    /// Runs one pass over the harvest-time samplers. Called by the harvest
    /// driver right before it flushes.
    pub fn poll_harvest_samplers(&self) -> PollReport {
        poll(&self.inner.harvest)
    }

    pub fn scheduler_running(&self) -> bool {
        self.scheduler_slot()
            .as_ref()
            .map_or(false, |scheduler| scheduler.is_alive())
    }

    pub fn engine_ref(&self) -> EngineRef {
        EngineRef {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn add_periodic_sampler(&self, sampler: SamplerHandle) -> Registration {
        self.add_sampler_to(&self.inner.periodic, sampler, "periodic")
    }

    pub fn add_harvest_sampler(&self, sampler: SamplerHandle) -> Registration {
        self.add_sampler_to(&self.inner.harvest, sampler, "harvest-time")
    }

    /// Starts the background poll task unless one is alive already or there
    /// is nothing to poll. Registering periodic samplers later does not
    /// start it; call this again once they are in.
    pub fn start_background_scheduler(&self) -> StartOutcome {
        let mut slot = self.scheduler_slot();
        if slot.as_ref().map_or(false, |scheduler| scheduler.is_alive()) {
            return StartOutcome::AlreadyRunning;
        }
        if self.inner.periodic.is_empty() {
            return StartOutcome::NoPeriodicSamplers;
        }

        match BackgroundScheduler::spawn(
            Arc::clone(&self.inner.periodic),
            Arc::clone(&self.inner.sink),
        ) {
            Ok(scheduler) => {
                *slot = Some(scheduler);
                debug!(
                    "Started sampler task for {} periodic samplers",
                    self.inner.periodic.len()
                );
                StartOutcome::Started
            }
            Err(err) => {
                error!("Unable to start sampler task: {}", err);
                StartOutcome::Unavailable
            }
        }
    }

    fn scheduler_slot(&self) -> MutexGuard<'_, Option<BackgroundScheduler>> {
        self.inner
            .scheduler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn add_sampler_to(
        &self,
        set: &SamplerSet,
        sampler: SamplerHandle,
        label: &str,
    ) -> Registration {
        if self.inner.config.is_disabled(sampler.kind()) {
            debug!(
                "Skipping {} sampler {}: disabled by configuration",
                label,
                sampler.id()
            );
            return Registration::Disabled;
        }

        // Attach under the set lock so a concurrent pass never polls it detached.
        let accepted = set.insert_with(SamplerHandle::clone(&sampler), |new_sampler| {
            new_sampler.attach(self.engine_ref())
        });
        if !accepted {
            warn!(
                "Ignoring addition of {} because it is already registered.",
                sampler.id()
            );
            return Registration::Duplicate;
        }

        debug!("Adding {} sampler: {}", label, sampler.id());
        Registration::Added
    }
}

impl SamplerHost for StatsEngine {
    fn add_periodic_sampler(&self, sampler: SamplerHandle) -> Registration {
        StatsEngine::add_periodic_sampler(self, sampler)
    }

    fn add_harvest_sampler(&self, sampler: SamplerHandle) -> Registration {
        StatsEngine::add_harvest_sampler(self, sampler)
    }

    fn start_background_scheduler(&self) -> StartOutcome {
        StatsEngine::start_background_scheduler(self)
    }
}

impl Default for StatsEngine {
    fn default() -> Self {
        StatsEngine::new(SamplerConfig::default())
    }
}

impl std::fmt::Debug for StatsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsEngine")
            .field("periodic", &self.inner.periodic)
            .field("harvest", &self.inner.harvest)
            .finish_non_exhaustive()
    }
}

/// Weak back-reference handed to samplers on registration.
///
/// Holding one does not keep the engine alive.
#[derive(Clone, Debug)]
pub struct EngineRef {
    inner: Weak<EngineInner>,
}

impl EngineRef {
    /// Records an observation into the engine's sink. Returns `false` once
    /// the engine has been dropped.
    pub fn record_metric(&self, name: &str, value: f64) -> bool {
        match self.inner.upgrade() {
            Some(engine) => {
                engine.sink.record_metric(name, value);
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

/// Stand-in used when the agent is disabled; every call is a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShimEngine;

impl SamplerHost for ShimEngine {
    fn add_periodic_sampler(&self, _sampler: SamplerHandle) -> Registration {
        Registration::Disabled
    }

    fn add_harvest_sampler(&self, _sampler: SamplerHandle) -> Registration {
        Registration::Disabled
    }

    fn start_background_scheduler(&self) -> StartOutcome {
        StartOutcome::Disabled
    }
}
