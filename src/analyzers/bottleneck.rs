// Bottleneck classification
// Independent threshold rules sorting findings into critical, warning and info tiers

use crate::metrics::{MetricKey, MetricsSample};
use serde::{Deserialize, Serialize};

/// Severity tier of a bottleneck finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckTier {
    Critical,
    Warning,
    Info,
}

/// A subsystem condition past its configured threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckFinding {
    pub finding_type: String,
    pub metric: MetricKey,
    pub value: f64,
    pub description: String,
    pub recommendation: String,
    pub tier: BottleneckTier,
}

/// Findings grouped by tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BottleneckReport {
    pub critical: Vec<BottleneckFinding>,
    pub warning: Vec<BottleneckFinding>,
    pub info: Vec<BottleneckFinding>,
}

impl BottleneckReport {
    pub fn total(&self) -> usize {
        self.critical.len() + self.warning.len() + self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn push(&mut self, finding: BottleneckFinding) {
        match finding.tier {
            BottleneckTier::Critical => self.critical.push(finding),
            BottleneckTier::Warning => self.warning.push(finding),
            BottleneckTier::Info => self.info.push(finding),
        }
    }
}

/// Rule thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BottleneckThresholds {
    /// CPU usage above which the host is overloaded (percentage)
    pub cpu_critical: f64,
    /// Memory usage above which the host is under pressure (percentage)
    pub memory_critical: f64,
    /// Disk usage above which storage is saturated (percentage)
    pub disk_critical: f64,
    /// Response time (milliseconds)
    pub response_time_warning: f64,
    /// Error rate (percentage)
    pub error_rate_warning: f64,
    /// Query time (milliseconds)
    pub query_time_warning: f64,
    /// Lock wait time (milliseconds)
    pub lock_wait_warning: f64,
    /// Queue length (jobs)
    pub queue_length_warning: f64,
    /// Circuit breaker trips per sample
    pub circuit_breaker_warning: f64,
    /// Connection pool usage (percentage)
    pub connection_pool_info: f64,
    /// Cache hit rate below which caching is ineffective (percentage)
    pub cache_hit_rate_info: f64,
}

impl Default for BottleneckThresholds {
    fn default() -> Self {
        Self {
            cpu_critical: 90.0,
            memory_critical: 85.0,
            disk_critical: 95.0,
            response_time_warning: 300.0,
            error_rate_warning: 3.0,
            query_time_warning: 80.0,
            lock_wait_warning: 5.0,
            queue_length_warning: 30.0,
            circuit_breaker_warning: 3.0,
            connection_pool_info: 75.0,
            cache_hit_rate_info: 80.0,
        }
    }
}

enum Bound {
    Above(f64),
    Below(f64),
}

struct Rule {
    finding_type: &'static str,
    metric: MetricKey,
    bound: Bound,
    tier: BottleneckTier,
    describe: fn(f64, f64) -> String,
    recommendation: &'static str,
}

/// Classifies the current sample into bottleneck tiers
#[derive(Debug, Clone, Default)]
pub struct BottleneckAnalyzer {
    thresholds: BottleneckThresholds,
}

impl BottleneckAnalyzer {
    pub fn new(thresholds: BottleneckThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &BottleneckThresholds {
        &self.thresholds
    }

    /// Evaluate every rule against the sample; all rules may fire at once
    pub fn analyze(&self, sample: &MetricsSample) -> BottleneckReport {
        let mut report = BottleneckReport::default();

        for rule in self.rules() {
            let value = sample.value(rule.metric);
            let (fired, limit) = match rule.bound {
                Bound::Above(limit) => (value > limit, limit),
                Bound::Below(limit) => (value < limit, limit),
            };
            if fired {
                report.push(BottleneckFinding {
                    finding_type: rule.finding_type.to_string(),
                    metric: rule.metric,
                    value,
                    description: (rule.describe)(value, limit),
                    recommendation: rule.recommendation.to_string(),
                    tier: rule.tier,
                });
            }
        }

        report
    }

    fn rules(&self) -> [Rule; 11] {
        let t = &self.thresholds;
        [
            Rule {
                finding_type: "cpu_overload",
                metric: MetricKey::CpuUsage,
                bound: Bound::Above(t.cpu_critical),
                tier: BottleneckTier::Critical,
                describe: |v, l| format!("CPU usage at {:.1}% exceeds {:.1}%", v, l),
                recommendation: "Scale out compute or move CPU-heavy work off the hot path",
            },
            Rule {
                finding_type: "memory_pressure",
                metric: MetricKey::MemoryUsage,
                bound: Bound::Above(t.memory_critical),
                tier: BottleneckTier::Critical,
                describe: |v, l| format!("Memory usage at {:.1}% exceeds {:.1}%", v, l),
                recommendation: "Check for leaks, tune caches or add memory",
            },
            Rule {
                finding_type: "disk_saturation",
                metric: MetricKey::DiskUsage,
                bound: Bound::Above(t.disk_critical),
                tier: BottleneckTier::Critical,
                describe: |v, l| format!("Disk usage at {:.1}% exceeds {:.1}%", v, l),
                recommendation: "Free space, rotate logs or expand the volume",
            },
            Rule {
                finding_type: "slow_response",
                metric: MetricKey::ResponseTime,
                bound: Bound::Above(t.response_time_warning),
                tier: BottleneckTier::Warning,
                describe: |v, l| format!("Response time {:.0}ms is above {:.0}ms", v, l),
                recommendation: "Profile slow endpoints and add caching where reads dominate",
            },
            Rule {
                finding_type: "elevated_error_rate",
                metric: MetricKey::ErrorRate,
                bound: Bound::Above(t.error_rate_warning),
                tier: BottleneckTier::Warning,
                describe: |v, l| format!("Error rate {:.2}% is above {:.2}%", v, l),
                recommendation: "Inspect recent deploys and failing dependencies",
            },
            Rule {
                finding_type: "slow_queries",
                metric: MetricKey::QueryTime,
                bound: Bound::Above(t.query_time_warning),
                tier: BottleneckTier::Warning,
                describe: |v, l| format!("Average query time {:.0}ms is above {:.0}ms", v, l),
                recommendation: "Review query plans and add missing indexes",
            },
            Rule {
                finding_type: "lock_contention",
                metric: MetricKey::LockWaitTime,
                bound: Bound::Above(t.lock_wait_warning),
                tier: BottleneckTier::Warning,
                describe: |v, l| format!("Lock wait time {:.1}ms is above {:.1}ms", v, l),
                recommendation: "Shorten transactions and avoid hot-row updates",
            },
            Rule {
                finding_type: "queue_backlog",
                metric: MetricKey::QueueLength,
                bound: Bound::Above(t.queue_length_warning),
                tier: BottleneckTier::Warning,
                describe: |v, l| format!("Queue holds {:.0} jobs, above {:.0}", v, l),
                recommendation: "Add workers or throttle producers",
            },
            Rule {
                finding_type: "circuit_breaker_tripping",
                metric: MetricKey::CircuitBreakerTrips,
                bound: Bound::Above(t.circuit_breaker_warning),
                tier: BottleneckTier::Warning,
                describe: |v, l| format!("Circuit breakers tripped {:.0} times, above {:.0}", v, l),
                recommendation: "Check health of downstream services behind the open breakers",
            },
            Rule {
                finding_type: "connection_pool_saturation",
                metric: MetricKey::ConnectionPoolUsage,
                bound: Bound::Above(t.connection_pool_info),
                tier: BottleneckTier::Info,
                describe: |v, l| format!("Connection pool {:.1}% in use, above {:.1}%", v, l),
                recommendation: "Consider a larger pool or shorter connection hold times",
            },
            Rule {
                finding_type: "low_cache_hit_rate",
                metric: MetricKey::CacheHitRate,
                bound: Bound::Below(t.cache_hit_rate_info),
                tier: BottleneckTier::Info,
                describe: |v, l| format!("Cache hit rate {:.1}% is below {:.1}%", v, l),
                recommendation: "Revisit cache keys and expiry",
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_sample(cpu: f64) -> MetricsSample {
        let mut sample = MetricsSample::default();
        sample.system.cpu_usage = cpu;
        sample.system.memory_usage = 60.0;
        sample.system.disk_usage = 40.0;
        sample.application.response_time = 50.0;
        sample.application.error_rate = 0.5;
        sample
    }

    #[test]
    fn test_cpu_overload_scenario() {
        let report = BottleneckAnalyzer::default().analyze(&scenario_sample(95.0));

        assert_eq!(report.critical.len(), 1);
        let finding = &report.critical[0];
        assert_eq!(finding.finding_type, "cpu_overload");
        assert_eq!(finding.value, 95.0);
        assert_eq!(finding.tier, BottleneckTier::Critical);
        assert!(!finding.description.is_empty());
        assert!(!finding.recommendation.is_empty());
        assert!(report.warning.is_empty());
        assert!(report.info.is_empty());
    }

    #[test]
    fn test_exactly_one_cpu_overload_above_ninety() {
        let analyzer = BottleneckAnalyzer::default();
        for cpu in [90.01, 91.0, 95.5, 99.9, 100.0] {
            let report = analyzer.analyze(&scenario_sample(cpu));
            let count = report
                .critical
                .iter()
                .filter(|f| f.finding_type == "cpu_overload")
                .count();
            assert_eq!(count, 1, "cpu {}", cpu);
        }
        // The bound is strict
        assert!(analyzer.analyze(&scenario_sample(90.0)).critical.is_empty());
    }

    #[test]
    fn test_healthy_sample_has_no_findings() {
        let report = BottleneckAnalyzer::default().analyze(&MetricsSample::default());
        assert!(report.is_empty());
    }

    #[test]
    fn test_all_rules_fire_together() {
        let mut sample = MetricsSample::default();
        sample.system.cpu_usage = 99.0;
        sample.system.memory_usage = 90.0;
        sample.system.disk_usage = 97.0;
        sample.application.response_time = 450.0;
        sample.application.error_rate = 4.0;
        sample.database.query_time = 120.0;
        sample.database.lock_wait_time = 9.0;
        sample.database.connection_pool_usage = 80.0;
        sample.services.queue_length = 31;
        sample.services.circuit_breaker_trips = 4;
        sample.services.cache_hit_rate = 50.0;

        let report = BottleneckAnalyzer::default().analyze(&sample);
        assert_eq!(report.critical.len(), 3);
        assert_eq!(report.warning.len(), 6);
        assert_eq!(report.info.len(), 2);
        assert_eq!(report.total(), 11);

        let types: Vec<&str> = report
            .warning
            .iter()
            .map(|f| f.finding_type.as_str())
            .collect();
        assert!(types.contains(&"queue_backlog"));
        assert!(types.contains(&"circuit_breaker_tripping"));
        assert!(types.contains(&"lock_contention"));
    }

    #[test]
    fn test_custom_thresholds() {
        let analyzer = BottleneckAnalyzer::new(BottleneckThresholds {
            cpu_critical: 40.0,
            ..BottleneckThresholds::default()
        });
        let report = analyzer.analyze(&MetricsSample::default());
        assert_eq!(report.critical.len(), 1);
        assert_eq!(report.critical[0].metric, MetricKey::CpuUsage);
    }
}
