use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MetricStats {
    pub call_count: u64,
    pub total: f64,
    pub min: f64,
    pub max: f64,
    pub sum_of_squares: f64,
    pub last_recorded_at: DateTime<Utc>,
}

impl MetricStats {
    pub fn first(value: f64, recorded_at: DateTime<Utc>) -> Self {
        MetricStats {
            call_count: 1,
            total: value,
            min: value,
            max: value,
            sum_of_squares: value * value,
            last_recorded_at: recorded_at,
        }
    }

    pub fn record(&mut self, value: f64, recorded_at: DateTime<Utc>) {
        self.call_count = self.call_count.saturating_add(1);
        self.total += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum_of_squares += value * value;
        self.last_recorded_at = recorded_at;
    }

    pub fn mean(&self) -> f64 {
        if self.call_count == 0 {
            0.0
        } else {
            self.total / self.call_count as f64
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub captured_at: DateTime<Utc>,
    pub metrics: Vec<NamedStats>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NamedStats {
    pub name: String,
    #[serde(flatten)]
    pub stats: MetricStats,
}
