use chrono::Utc;
use dashmap::DashMap;

use super::types::{MetricStats, MetricsSnapshot, NamedStats};

/// Destination for numeric observations, e.g. the agent's stats engine.
pub trait MetricsSink: Send + Sync {
    fn record_metric(&self, name: &str, value: f64);
}

/// In-memory sink that aggregates observations per metric name.
#[derive(Default)]
pub struct MetricStatsTable {
    stats: DashMap<String, MetricStats>,
}

impl MetricStatsTable {
    pub fn new() -> Self {
        MetricStatsTable {
            stats: DashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<MetricStats> {
        self.stats.get(name).map(|entry| entry.value().clone())
    }

    pub fn call_count(&self, name: &str) -> u64 {
        self.stats
            .get(name)
            .map(|entry| entry.call_count)
            .unwrap_or(0)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stats.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut metrics: Vec<NamedStats> = self
            .stats
            .iter()
            .map(|entry| NamedStats {
                name: entry.key().clone(),
                stats: entry.value().clone(),
            })
            .collect();
        metrics.sort_by(|a, b| a.name.cmp(&b.name));
        MetricsSnapshot {
            captured_at: Utc::now(),
            metrics,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    pub fn clear(&self) {
        self.stats.clear();
    }
}

impl MetricsSink for MetricStatsTable {
    fn record_metric(&self, name: &str, value: f64) {
        let now = Utc::now();
        self.stats
            .entry(name.to_string())
            .and_modify(|stats| stats.record(value, now))
            .or_insert_with(|| MetricStats::first(value, now));
    }
}
