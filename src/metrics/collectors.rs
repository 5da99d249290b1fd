// Metrics collection boundary
// The engine only knows the trait; real probes live with the deployment

use super::{
    ApplicationMetrics, DatabaseMetrics, MetricsSample, ServiceMetrics, SystemMetrics,
};
use crate::utils::error::{AnalyticsError, Result};
use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of metrics samples, called once per engine cycle
#[async_trait::async_trait]
pub trait MetricsCollector: Send + Sync {
    /// Get collector name
    fn name(&self) -> &str;

    /// Capture one sample across all four categories
    async fn collect(&self) -> Result<MetricsSample>;
}

/// Randomized collector for demos and local runs.
///
/// Each reading wanders around a baseline by up to `jitter` (a fraction of the
/// baseline value). With probability `spike_probability` a sample is pushed into
/// overload territory so the analyzers have something to report.
pub struct SimulatedCollector {
    baseline: MetricsSample,
    jitter: f64,
    spike_probability: f64,
    collected: AtomicU64,
}

impl SimulatedCollector {
    pub fn new(baseline: MetricsSample, jitter: f64, spike_probability: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&jitter) {
            return Err(AnalyticsError::config(format!(
                "jitter must be between 0.0 and 1.0, got {}",
                jitter
            )));
        }
        if !(0.0..=1.0).contains(&spike_probability) {
            return Err(AnalyticsError::config(format!(
                "spike_probability must be between 0.0 and 1.0, got {}",
                spike_probability
            )));
        }

        Ok(Self {
            baseline,
            jitter,
            spike_probability,
            collected: AtomicU64::new(0),
        })
    }

    /// Number of samples produced so far
    pub fn collected(&self) -> u64 {
        self.collected.load(Ordering::Relaxed)
    }

    fn next_sample(&self) -> MetricsSample {
        let mut rng = rand::thread_rng();
        let spike = rng.gen_bool(self.spike_probability);
        let jitter = self.jitter;

        let mut wander = |base: f64| -> f64 {
            if jitter == 0.0 {
                return base;
            }
            let delta = base * jitter;
            (base + rng.gen_range(-delta..=delta)).max(0.0)
        };
        let percent = |value: f64| value.clamp(0.0, 100.0);

        let base = &self.baseline;
        let mut sample = MetricsSample {
            timestamp: Utc::now(),
            system: SystemMetrics {
                cpu_usage: percent(wander(base.system.cpu_usage)),
                memory_usage: percent(wander(base.system.memory_usage)),
                disk_usage: percent(wander(base.system.disk_usage)),
                network_latency: wander(base.system.network_latency),
            },
            application: ApplicationMetrics {
                response_time: wander(base.application.response_time),
                error_rate: percent(wander(base.application.error_rate)),
                throughput: wander(base.application.throughput),
                rate_limit_hits: wander(base.application.rate_limit_hits as f64).round() as u64,
            },
            database: DatabaseMetrics {
                query_time: wander(base.database.query_time),
                connection_pool_usage: percent(wander(base.database.connection_pool_usage)),
                lock_wait_time: wander(base.database.lock_wait_time),
                slow_queries: wander(base.database.slow_queries as f64).round() as u64,
            },
            services: ServiceMetrics {
                queue_length: wander(base.services.queue_length as f64).round() as u64,
                circuit_breaker_trips: wander(base.services.circuit_breaker_trips as f64).round()
                    as u64,
                cache_hit_rate: percent(wander(base.services.cache_hit_rate)),
            },
        };

        if spike {
            sample.system.cpu_usage = rng.gen_range(91.0..=99.0);
            sample.application.response_time = rng.gen_range(320.0..=800.0);
            sample.application.error_rate = rng.gen_range(3.5..=12.0);
            sample.services.queue_length = rng.gen_range(35..=120);
        }

        sample
    }
}

impl Default for SimulatedCollector {
    fn default() -> Self {
        Self {
            baseline: MetricsSample::default(),
            jitter: 0.15,
            spike_probability: 0.1,
            collected: AtomicU64::new(0),
        }
    }
}

#[async_trait::async_trait]
impl MetricsCollector for SimulatedCollector {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn collect(&self) -> Result<MetricsSample> {
        let sample = self.next_sample();
        self.collected.fetch_add(1, Ordering::Relaxed);
        Ok(sample)
    }
}
