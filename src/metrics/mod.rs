mod sink;
mod types;

pub use sink::{MetricStatsTable, MetricsSink};
pub use types::{MetricStats, MetricsSnapshot, NamedStats};
