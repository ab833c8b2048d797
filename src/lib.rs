mod config;
mod engine;
mod metrics;
mod samplers;

pub use config::{ConfigError, SamplerConfig, CONFIG_ENV};
pub use engine::{EngineRef, Registration, SamplerHost, ShimEngine, StartOutcome, StatsEngine};
pub use metrics::{MetricStats, MetricStatsTable, MetricsSink, MetricsSnapshot, NamedStats};
pub use samplers::{
    poll, BackgroundScheduler, PollReport, Sampler, SamplerError, SamplerHandle, SamplerKind,
    SamplerSet, POLL_PERIOD, SAMPLER_METRIC,
};
