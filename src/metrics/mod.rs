// Metrics model for the analytics engine
// One sample covers four fixed categories: system, application, database, services

use crate::utils::error::{AnalyticsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod collectors;
pub mod history;

#[cfg(test)]
mod tests;

pub use collectors::{MetricsCollector, SimulatedCollector};
pub use history::{HistoryEntry, MetricsHistory, DEFAULT_QUERY_WINDOW};

/// One timestamped reading across all four categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Host level readings
    pub system: SystemMetrics,
    /// Request path readings
    pub application: ApplicationMetrics,
    /// Database readings
    pub database: DatabaseMetrics,
    /// Downstream service readings
    pub services: ServiceMetrics,
}

/// Host level readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// CPU usage (percentage)
    pub cpu_usage: f64,
    /// Memory usage (percentage)
    pub memory_usage: f64,
    /// Disk usage (percentage)
    pub disk_usage: f64,
    /// Network latency (milliseconds)
    pub network_latency: f64,
}

/// Request path readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationMetrics {
    /// Average response time (milliseconds)
    pub response_time: f64,
    /// Error rate (percentage)
    pub error_rate: f64,
    /// Requests per second
    pub throughput: f64,
    /// Requests rejected by rate limiting since the last sample
    pub rate_limit_hits: u64,
}

/// Database readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseMetrics {
    /// Average query time (milliseconds)
    pub query_time: f64,
    /// Connection pool usage (percentage)
    pub connection_pool_usage: f64,
    /// Average lock wait time (milliseconds)
    pub lock_wait_time: f64,
    /// Slow queries since the last sample
    pub slow_queries: u64,
}

/// Downstream service readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    /// Pending jobs in the work queue
    pub queue_length: u64,
    /// Circuit breaker trips since the last sample
    pub circuit_breaker_trips: u64,
    /// Cache hit rate (percentage)
    pub cache_hit_rate: f64,
}

/// The four fixed metric categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    System,
    Application,
    Database,
    Services,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 4] = [
        MetricCategory::System,
        MetricCategory::Application,
        MetricCategory::Database,
        MetricCategory::Services,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::System => "system",
            MetricCategory::Application => "application",
            MetricCategory::Database => "database",
            MetricCategory::Services => "services",
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a single numeric field of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    CpuUsage,
    MemoryUsage,
    DiskUsage,
    NetworkLatency,
    ResponseTime,
    ErrorRate,
    Throughput,
    RateLimitHits,
    QueryTime,
    ConnectionPoolUsage,
    LockWaitTime,
    SlowQueries,
    QueueLength,
    CircuitBreakerTrips,
    CacheHitRate,
}

impl MetricKey {
    pub const ALL: [MetricKey; 15] = [
        MetricKey::CpuUsage,
        MetricKey::MemoryUsage,
        MetricKey::DiskUsage,
        MetricKey::NetworkLatency,
        MetricKey::ResponseTime,
        MetricKey::ErrorRate,
        MetricKey::Throughput,
        MetricKey::RateLimitHits,
        MetricKey::QueryTime,
        MetricKey::ConnectionPoolUsage,
        MetricKey::LockWaitTime,
        MetricKey::SlowQueries,
        MetricKey::QueueLength,
        MetricKey::CircuitBreakerTrips,
        MetricKey::CacheHitRate,
    ];

    /// Snake case field name, as used in findings and config files
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::CpuUsage => "cpu_usage",
            MetricKey::MemoryUsage => "memory_usage",
            MetricKey::DiskUsage => "disk_usage",
            MetricKey::NetworkLatency => "network_latency",
            MetricKey::ResponseTime => "response_time",
            MetricKey::ErrorRate => "error_rate",
            MetricKey::Throughput => "throughput",
            MetricKey::RateLimitHits => "rate_limit_hits",
            MetricKey::QueryTime => "query_time",
            MetricKey::ConnectionPoolUsage => "connection_pool_usage",
            MetricKey::LockWaitTime => "lock_wait_time",
            MetricKey::SlowQueries => "slow_queries",
            MetricKey::QueueLength => "queue_length",
            MetricKey::CircuitBreakerTrips => "circuit_breaker_trips",
            MetricKey::CacheHitRate => "cache_hit_rate",
        }
    }

    pub fn category(&self) -> MetricCategory {
        match self {
            MetricKey::CpuUsage
            | MetricKey::MemoryUsage
            | MetricKey::DiskUsage
            | MetricKey::NetworkLatency => MetricCategory::System,
            MetricKey::ResponseTime
            | MetricKey::ErrorRate
            | MetricKey::Throughput
            | MetricKey::RateLimitHits => MetricCategory::Application,
            MetricKey::QueryTime
            | MetricKey::ConnectionPoolUsage
            | MetricKey::LockWaitTime
            | MetricKey::SlowQueries => MetricCategory::Database,
            MetricKey::QueueLength | MetricKey::CircuitBreakerTrips | MetricKey::CacheHitRate => {
                MetricCategory::Services
            }
        }
    }

    /// Whether the field is bounded to [0, 100]
    pub fn is_percentage(&self) -> bool {
        matches!(
            self,
            MetricKey::CpuUsage
                | MetricKey::MemoryUsage
                | MetricKey::DiskUsage
                | MetricKey::ErrorRate
                | MetricKey::ConnectionPoolUsage
                | MetricKey::CacheHitRate
        )
    }

    /// Whether an increase of this metric is an improvement
    pub fn higher_is_better(&self) -> bool {
        matches!(self, MetricKey::Throughput | MetricKey::CacheHitRate)
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slice of a sample belonging to one category, as kept in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum CategoryReading {
    System(SystemMetrics),
    Application(ApplicationMetrics),
    Database(DatabaseMetrics),
    Services(ServiceMetrics),
}

impl CategoryReading {
    pub fn category(&self) -> MetricCategory {
        match self {
            CategoryReading::System(_) => MetricCategory::System,
            CategoryReading::Application(_) => MetricCategory::Application,
            CategoryReading::Database(_) => MetricCategory::Database,
            CategoryReading::Services(_) => MetricCategory::Services,
        }
    }

    /// Read one metric; `None` when the key belongs to another category
    pub fn value(&self, key: MetricKey) -> Option<f64> {
        match (self, key) {
            (CategoryReading::System(s), MetricKey::CpuUsage) => Some(s.cpu_usage),
            (CategoryReading::System(s), MetricKey::MemoryUsage) => Some(s.memory_usage),
            (CategoryReading::System(s), MetricKey::DiskUsage) => Some(s.disk_usage),
            (CategoryReading::System(s), MetricKey::NetworkLatency) => Some(s.network_latency),
            (CategoryReading::Application(a), MetricKey::ResponseTime) => Some(a.response_time),
            (CategoryReading::Application(a), MetricKey::ErrorRate) => Some(a.error_rate),
            (CategoryReading::Application(a), MetricKey::Throughput) => Some(a.throughput),
            (CategoryReading::Application(a), MetricKey::RateLimitHits) => {
                Some(a.rate_limit_hits as f64)
            }
            (CategoryReading::Database(d), MetricKey::QueryTime) => Some(d.query_time),
            (CategoryReading::Database(d), MetricKey::ConnectionPoolUsage) => {
                Some(d.connection_pool_usage)
            }
            (CategoryReading::Database(d), MetricKey::LockWaitTime) => Some(d.lock_wait_time),
            (CategoryReading::Database(d), MetricKey::SlowQueries) => Some(d.slow_queries as f64),
            (CategoryReading::Services(s), MetricKey::QueueLength) => Some(s.queue_length as f64),
            (CategoryReading::Services(s), MetricKey::CircuitBreakerTrips) => {
                Some(s.circuit_breaker_trips as f64)
            }
            (CategoryReading::Services(s), MetricKey::CacheHitRate) => Some(s.cache_hit_rate),
            _ => None,
        }
    }
}

impl MetricsSample {
    /// Read one metric as a float
    pub fn value(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::CpuUsage => self.system.cpu_usage,
            MetricKey::MemoryUsage => self.system.memory_usage,
            MetricKey::DiskUsage => self.system.disk_usage,
            MetricKey::NetworkLatency => self.system.network_latency,
            MetricKey::ResponseTime => self.application.response_time,
            MetricKey::ErrorRate => self.application.error_rate,
            MetricKey::Throughput => self.application.throughput,
            MetricKey::RateLimitHits => self.application.rate_limit_hits as f64,
            MetricKey::QueryTime => self.database.query_time,
            MetricKey::ConnectionPoolUsage => self.database.connection_pool_usage,
            MetricKey::LockWaitTime => self.database.lock_wait_time,
            MetricKey::SlowQueries => self.database.slow_queries as f64,
            MetricKey::QueueLength => self.services.queue_length as f64,
            MetricKey::CircuitBreakerTrips => self.services.circuit_breaker_trips as f64,
            MetricKey::CacheHitRate => self.services.cache_hit_rate,
        }
    }

    /// Split the sample into its per-category rows
    pub fn readings(&self) -> [CategoryReading; 4] {
        [
            CategoryReading::System(self.system.clone()),
            CategoryReading::Application(self.application.clone()),
            CategoryReading::Database(self.database.clone()),
            CategoryReading::Services(self.services.clone()),
        ]
    }

    /// Reject negative, non-finite and out-of-range readings
    pub fn validate(&self) -> Result<()> {
        for key in MetricKey::ALL {
            let value = self.value(key);
            if !value.is_finite() {
                return Err(AnalyticsError::invalid_input(format!(
                    "{} is not a finite number",
                    key
                )));
            }
            if value < 0.0 {
                return Err(AnalyticsError::invalid_input(format!(
                    "{} must be non-negative, got {}",
                    key, value
                )));
            }
            if key.is_percentage() && value > 100.0 {
                return Err(AnalyticsError::invalid_input(format!(
                    "{} must be a percentage, got {}",
                    key, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self {
            cpu_usage: 45.0,
            memory_usage: 55.0,
            disk_usage: 60.0,
            network_latency: 20.0,
        }
    }
}

impl Default for ApplicationMetrics {
    fn default() -> Self {
        Self {
            response_time: 120.0,
            error_rate: 0.5,
            throughput: 250.0,
            rate_limit_hits: 5,
        }
    }
}

impl Default for DatabaseMetrics {
    fn default() -> Self {
        Self {
            query_time: 25.0,
            connection_pool_usage: 40.0,
            lock_wait_time: 1.0,
            slow_queries: 0,
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self {
            queue_length: 5,
            circuit_breaker_trips: 0,
            cache_hit_rate: 92.0,
        }
    }
}

impl Default for MetricsSample {
    /// A healthy mid-range sample captured now
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            system: SystemMetrics::default(),
            application: ApplicationMetrics::default(),
            database: DatabaseMetrics::default(),
            services: ServiceMetrics::default(),
        }
    }
}
