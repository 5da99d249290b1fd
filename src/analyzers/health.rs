// Aggregate health score

use super::anomaly::Anomaly;
use super::bottleneck::BottleneckReport;
use crate::metrics::MetricsSample;
use serde::{Deserialize, Serialize};

/// Thresholds and deductions for the health score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub cpu_threshold: f64,
    pub cpu_penalty: f64,
    pub memory_threshold: f64,
    pub memory_penalty: f64,
    pub error_rate_threshold: f64,
    pub error_rate_penalty: f64,
    pub response_time_threshold: f64,
    pub response_time_penalty: f64,
    /// Deduction per anomaly
    pub anomaly_penalty: f64,
    /// Deduction per critical bottleneck
    pub critical_penalty: f64,
    /// Deduction per warning bottleneck
    pub warning_penalty: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: 80.0,
            cpu_penalty: 10.0,
            memory_threshold: 85.0,
            memory_penalty: 10.0,
            error_rate_threshold: 2.0,
            error_rate_penalty: 15.0,
            response_time_threshold: 200.0,
            response_time_penalty: 10.0,
            anomaly_penalty: 5.0,
            critical_penalty: 10.0,
            warning_penalty: 5.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HealthScorer {
    config: HealthConfig,
}

impl HealthScorer {
    pub fn new(config: HealthConfig) -> Self {
        Self { config }
    }

    /// Start at 100 and deduct per breached metric and per finding; result in 0..=100
    pub fn score(
        &self,
        sample: &MetricsSample,
        anomalies: &[Anomaly],
        bottlenecks: &BottleneckReport,
    ) -> u8 {
        let c = &self.config;
        let mut score = 100.0;

        if sample.system.cpu_usage > c.cpu_threshold {
            score -= c.cpu_penalty;
        }
        if sample.system.memory_usage > c.memory_threshold {
            score -= c.memory_penalty;
        }
        if sample.application.error_rate > c.error_rate_threshold {
            score -= c.error_rate_penalty;
        }
        if sample.application.response_time > c.response_time_threshold {
            score -= c.response_time_penalty;
        }

        score -= c.anomaly_penalty * anomalies.len() as f64;
        score -= c.critical_penalty * bottlenecks.critical.len() as f64;
        score -= c.warning_penalty * bottlenecks.warning.len() as f64;

        score.clamp(0.0, 100.0).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::anomaly::{AnomalySeverity, AnomalyType};
    use crate::analyzers::bottleneck::BottleneckAnalyzer;
    use crate::metrics::MetricKey;

    fn anomaly() -> Anomaly {
        Anomaly {
            anomaly_type: AnomalyType::ThresholdExceeded,
            metric: MetricKey::CpuUsage,
            observed_value: 95.0,
            threshold: 90.0,
            severity: AnomalySeverity::High,
        }
    }

    #[test]
    fn test_ideal_sample_scores_100() {
        let scorer = HealthScorer::default();
        let score = scorer.score(&MetricsSample::default(), &[], &BottleneckReport::default());
        assert_eq!(score, 100);
    }

    #[test]
    fn test_deductions_add_up() {
        let mut sample = MetricsSample::default();
        sample.system.cpu_usage = 95.0;
        sample.application.response_time = 250.0;

        let bottlenecks = BottleneckAnalyzer::default().analyze(&sample);
        assert_eq!(bottlenecks.critical.len(), 1);

        // 100 - 10 (cpu) - 10 (response) - 5 (anomaly) - 10 (critical)
        let score = HealthScorer::default().score(&sample, &[anomaly()], &bottlenecks);
        assert_eq!(score, 65);
    }

    #[test]
    fn test_score_never_leaves_range() {
        let mut sample = MetricsSample::default();
        sample.system.cpu_usage = 100.0;
        sample.system.memory_usage = 100.0;
        sample.application.error_rate = 100.0;
        sample.application.response_time = 10_000.0;
        let bottlenecks = BottleneckAnalyzer::default().analyze(&sample);
        let anomalies = vec![anomaly(); 40];

        assert_eq!(HealthScorer::default().score(&sample, &anomalies, &bottlenecks), 0);

        // Negative penalties cannot push it above 100
        let generous = HealthScorer::new(HealthConfig {
            anomaly_penalty: -50.0,
            ..HealthConfig::default()
        });
        let score = generous.score(&MetricsSample::default(), &anomalies, &BottleneckReport::default());
        assert_eq!(score, 100);
    }

    #[test]
    fn test_score_range_over_many_combinations() {
        let scorer = HealthScorer::default();
        let analyzer = BottleneckAnalyzer::default();
        for cpu in [0.0, 50.0, 85.0, 100.0] {
            for error_rate in [0.0, 2.5, 50.0] {
                for anomaly_count in [0usize, 3, 30] {
                    let mut sample = MetricsSample::default();
                    sample.system.cpu_usage = cpu;
                    sample.application.error_rate = error_rate;
                    let anomalies = vec![anomaly(); anomaly_count];
                    let score = scorer.score(&sample, &anomalies, &analyzer.analyze(&sample));
                    assert!(score <= 100);
                }
            }
        }
    }
}
