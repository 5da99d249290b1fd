// Cost analysis: waste from resources running below their target utilization

use crate::metrics::{MetricKey, MetricsSample};
use serde::{Deserialize, Serialize};

/// Utilization target for one billable resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTarget {
    /// Resource label, e.g. "compute"
    pub resource: String,
    /// Metric carrying the resource's utilization (percentage)
    pub metric: MetricKey,
    /// Utilization the resource should reach (percentage)
    pub target_utilization: f64,
    /// Dollars per percentage point of idle capacity
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub targets: Vec<CostTarget>,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                CostTarget {
                    resource: "compute".to_string(),
                    metric: MetricKey::CpuUsage,
                    target_utilization: 70.0,
                    rate: 10.0,
                },
                CostTarget {
                    resource: "storage".to_string(),
                    metric: MetricKey::DiskUsage,
                    target_utilization: 80.0,
                    rate: 5.0,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostFinding {
    pub finding_type: String,
    pub resource: String,
    pub description: String,
    pub estimated_savings: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub potential_savings: f64,
    pub waste_detected: bool,
    pub recommendations: Vec<CostFinding>,
}

/// Estimates savings from under-utilized resources
#[derive(Debug, Clone, Default)]
pub struct CostOptimizer {
    config: CostConfig,
}

impl CostOptimizer {
    pub fn new(config: CostConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, sample: &MetricsSample) -> CostAnalysis {
        let mut analysis = CostAnalysis::default();

        for target in &self.config.targets {
            let utilization = sample.value(target.metric);
            if utilization >= target.target_utilization {
                continue;
            }

            let waste = target.target_utilization - utilization;
            let savings = waste * target.rate;
            analysis.potential_savings += savings;
            analysis.recommendations.push(CostFinding {
                finding_type: format!("underutilized_{}", target.resource),
                resource: target.resource.clone(),
                description: format!(
                    "{} running at {:.1}% against a {:.1}% target; right-size to save about ${:.2}",
                    target.resource, utilization, target.target_utilization, savings
                ),
                estimated_savings: savings,
            });
        }

        analysis.waste_detected = analysis.potential_savings > 0.0;
        analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_savings_scenario() {
        let mut sample = MetricsSample::default();
        sample.system.cpu_usage = 40.0;
        sample.system.disk_usage = 50.0;

        let analysis = CostOptimizer::default().analyze(&sample);

        assert!(analysis.waste_detected);
        assert_eq!(analysis.potential_savings, 450.0);
        assert_eq!(analysis.recommendations.len(), 2);
        assert_eq!(analysis.recommendations[0].resource, "compute");
        assert_eq!(analysis.recommendations[0].estimated_savings, 300.0);
        assert_eq!(analysis.recommendations[1].finding_type, "underutilized_storage");
        assert_eq!(analysis.recommendations[1].estimated_savings, 150.0);
    }

    #[test]
    fn test_well_utilized_resources_waste_nothing() {
        let mut sample = MetricsSample::default();
        sample.system.cpu_usage = 70.0;
        sample.system.disk_usage = 92.0;

        let analysis = CostOptimizer::default().analyze(&sample);
        assert!(!analysis.waste_detected);
        assert_eq!(analysis.potential_savings, 0.0);
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn test_zero_rate_is_not_waste() {
        let optimizer = CostOptimizer::new(CostConfig {
            targets: vec![CostTarget {
                resource: "memory".to_string(),
                metric: MetricKey::MemoryUsage,
                target_utilization: 90.0,
                rate: 0.0,
            }],
        });

        let analysis = optimizer.analyze(&MetricsSample::default());
        assert!(!analysis.waste_detected);
        assert_eq!(analysis.recommendations.len(), 1);
    }
}
