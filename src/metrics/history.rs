// Rolling metrics history
// Bounded per-category store, appended once per cycle by the engine

use super::{CategoryReading, MetricCategory, MetricKey, MetricsSample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Default look-back window for history queries
pub const DEFAULT_QUERY_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Default number of rows kept per category
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// One stored row of a single category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub reading: CategoryReading,
}

/// Capacity-bounded, append-only history keyed by category
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    capacity: usize,
    rows: HashMap<MetricCategory, VecDeque<HistoryEntry>>,
}

impl MetricsHistory {
    /// Create an empty history. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let rows = MetricCategory::ALL
            .iter()
            .map(|category| (*category, VecDeque::with_capacity(capacity.min(1024))))
            .collect();
        Self { capacity, rows }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one row per category, evicting the oldest rows above capacity
    pub fn store(&mut self, timestamp: DateTime<Utc>, sample: &MetricsSample) {
        for reading in sample.readings() {
            let rows = self.rows.entry(reading.category()).or_default();
            rows.push_back(HistoryEntry { timestamp, reading });
            while rows.len() > self.capacity {
                rows.pop_front();
            }
        }
    }

    /// Rows within `window` of now, optionally restricted to one category
    pub fn query(&self, category: Option<MetricCategory>, window: Duration) -> Vec<HistoryEntry> {
        self.query_at(Utc::now(), category, window)
    }

    /// Rows with `now - window <= timestamp <= now`, oldest first
    pub fn query_at(
        &self,
        now: DateTime<Utc>,
        category: Option<MetricCategory>,
        window: Duration,
    ) -> Vec<HistoryEntry> {
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        let since = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let categories: Vec<MetricCategory> = match category {
            Some(category) => vec![category],
            None => MetricCategory::ALL.to_vec(),
        };

        let mut entries: Vec<HistoryEntry> = categories
            .iter()
            .filter_map(|category| self.rows.get(category))
            .flat_map(|rows| rows.iter())
            .filter(|entry| entry.timestamp >= since && entry.timestamp <= now)
            .cloned()
            .collect();

        // Stable, so rows sharing a timestamp keep category order
        entries.sort_by_key(|entry| entry.timestamp);
        entries
    }

    /// The most recent `last_n` values of one metric, oldest first
    pub fn series(&self, key: MetricKey, last_n: usize) -> Vec<f64> {
        let Some(rows) = self.rows.get(&key.category()) else {
            return Vec::new();
        };
        let skip = rows.len().saturating_sub(last_n);
        rows.iter()
            .skip(skip)
            .filter_map(|entry| entry.reading.value(key))
            .collect()
    }

    /// Number of rows stored for a category
    pub fn len(&self, category: MetricCategory) -> usize {
        self.rows.get(&category).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.values().all(VecDeque::is_empty)
    }

    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows
            .values()
            .filter_map(|rows| rows.back())
            .map(|entry| entry.timestamp)
            .max()
    }
}

impl Default for MetricsHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
