// Anomaly detection: threshold breaches and abnormal volatility

use crate::metrics::{MetricKey, MetricsHistory, MetricsSample};
use serde::{Deserialize, Serialize};

/// Kind of anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    ThresholdExceeded,
    HighVolatility,
}

/// Anomaly severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

/// A metric that breached its bound in the current cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub anomaly_type: AnomalyType,
    pub metric: MetricKey,
    /// Current value for threshold anomalies, standard deviation for volatility anomalies
    pub observed_value: f64,
    pub threshold: f64,
    pub severity: AnomalySeverity,
}

/// Bounds for one monitored metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricThreshold {
    pub metric: MetricKey,
    /// Maximum acceptable value
    pub max: f64,
    /// Maximum acceptable standard deviation over the volatility window
    pub volatility: f64,
}

/// Anomaly detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Number of most recent history values used for the volatility check
    pub volatility_window: usize,
    /// Monitored metrics
    pub thresholds: Vec<MetricThreshold>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        let threshold = |metric, max, volatility| MetricThreshold {
            metric,
            max,
            volatility,
        };

        Self {
            volatility_window: 10,
            thresholds: vec![
                threshold(MetricKey::CpuUsage, 90.0, 15.0),
                threshold(MetricKey::MemoryUsage, 85.0, 10.0),
                threshold(MetricKey::DiskUsage, 95.0, 5.0),
                threshold(MetricKey::ResponseTime, 300.0, 100.0),
                threshold(MetricKey::ErrorRate, 5.0, 2.0),
                threshold(MetricKey::QueryTime, 100.0, 30.0),
                threshold(MetricKey::QueueLength, 50.0, 15.0),
            ],
        }
    }
}

/// Flags threshold breaches and volatile metrics
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Check the sample against each monitored metric. Pure.
    pub fn detect(&self, sample: &MetricsSample, history: &MetricsHistory) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        for bound in &self.config.thresholds {
            let value = sample.value(bound.metric);
            if value > bound.max {
                anomalies.push(Anomaly {
                    anomaly_type: AnomalyType::ThresholdExceeded,
                    metric: bound.metric,
                    observed_value: value,
                    threshold: bound.max,
                    severity: AnomalySeverity::High,
                });
            }

            let recent = history.series(bound.metric, self.config.volatility_window);
            if let Some(deviation) = std_dev(&recent) {
                if deviation > bound.volatility {
                    anomalies.push(Anomaly {
                        anomaly_type: AnomalyType::HighVolatility,
                        metric: bound.metric,
                        observed_value: deviation,
                        threshold: bound.volatility,
                        severity: AnomalySeverity::Medium,
                    });
                }
            }
        }

        anomalies
    }
}

/// Population standard deviation; `None` for fewer than two values
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn history_with_cpu(values: &[f64]) -> MetricsHistory {
        let mut history = MetricsHistory::new(100);
        let start = Utc::now() - Duration::minutes(values.len() as i64);
        for (i, cpu) in values.iter().enumerate() {
            let mut sample = MetricsSample::default();
            sample.system.cpu_usage = *cpu;
            sample.timestamp = start + Duration::minutes(i as i64);
            history.store(sample.timestamp, &sample);
        }
        history
    }

    #[test]
    fn test_safe_sample_with_empty_history_has_no_anomalies() {
        let detector = AnomalyDetector::default();
        let anomalies = detector.detect(&MetricsSample::default(), &MetricsHistory::default());
        assert!(anomalies.is_empty());
    }

    #[test]
    fn test_safe_sample_with_steady_history_has_no_anomalies() {
        let detector = AnomalyDetector::default();
        let history = history_with_cpu(&[44.0, 45.0, 46.0, 45.0, 44.0, 46.0]);
        assert!(detector
            .detect(&MetricsSample::default(), &history)
            .is_empty());
    }

    #[test]
    fn test_threshold_exceeded_is_high_severity() {
        let detector = AnomalyDetector::default();
        let mut sample = MetricsSample::default();
        sample.system.cpu_usage = 97.0;
        sample.application.error_rate = 6.0;

        let anomalies = detector.detect(&sample, &MetricsHistory::default());
        assert_eq!(anomalies.len(), 2);
        assert!(anomalies
            .iter()
            .all(|a| a.anomaly_type == AnomalyType::ThresholdExceeded
                && a.severity == AnomalySeverity::High));

        let cpu = anomalies
            .iter()
            .find(|a| a.metric == MetricKey::CpuUsage)
            .unwrap();
        assert_eq!(cpu.observed_value, 97.0);
        assert_eq!(cpu.threshold, 90.0);
    }

    #[test]
    fn test_volatility_uses_only_the_recent_window() {
        let detector = AnomalyDetector::default();

        // Wild swings, then ten calm readings
        let mut values = vec![5.0, 95.0, 5.0, 95.0, 5.0, 95.0];
        values.extend(std::iter::repeat(45.0).take(10));
        let history = history_with_cpu(&values);
        assert!(detector
            .detect(&MetricsSample::default(), &history)
            .is_empty());

        let history = history_with_cpu(&[10.0, 80.0, 10.0, 80.0, 10.0, 80.0]);
        let anomalies = detector.detect(&MetricsSample::default(), &history);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::HighVolatility);
        assert_eq!(anomalies[0].severity, AnomalySeverity::Medium);
        assert!((anomalies[0].observed_value - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_thresholds() {
        let detector = AnomalyDetector::new(AnomalyConfig {
            volatility_window: 5,
            thresholds: vec![MetricThreshold {
                metric: MetricKey::NetworkLatency,
                max: 10.0,
                volatility: 1.0,
            }],
        });

        let anomalies = detector.detect(&MetricsSample::default(), &MetricsHistory::default());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].metric, MetricKey::NetworkLatency);
    }

    #[test]
    fn test_std_dev() {
        assert!(std_dev(&[]).is_none());
        assert!(std_dev(&[3.0]).is_none());
        assert_eq!(std_dev(&[2.0, 2.0, 2.0]), Some(0.0));
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.0).abs() < 1e-12);
    }
}
