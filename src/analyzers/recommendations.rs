// Recommendation synthesis
// Merges analyzer outputs into one list ordered critical > high > medium > low

use super::anomaly::Anomaly;
use super::bottleneck::BottleneckReport;
use super::cost::CostAnalysis;
use super::prediction::Predictions;
use super::security::SecurityInsights;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recommendation priority. Declaration order is sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub title: String,
    pub description: String,
    pub action: String,
    pub impact: String,
}

/// Borrowed view of one cycle's analyzer results
#[derive(Debug, Clone, Copy)]
pub struct AnalyzerOutputs<'a> {
    pub anomalies: &'a [Anomaly],
    pub predictions: &'a Predictions,
    pub bottlenecks: &'a BottleneckReport,
    pub cost_analysis: &'a CostAnalysis,
    pub security_insights: &'a SecurityInsights,
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationSynthesizer;

impl RecommendationSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(&self, outputs: &AnalyzerOutputs<'_>) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        let critical = &outputs.bottlenecks.critical;
        if !critical.is_empty() {
            let kinds: Vec<&str> = critical.iter().map(|f| f.finding_type.as_str()).collect();
            recommendations.push(Recommendation {
                priority: Priority::Critical,
                category: "performance".to_string(),
                title: "Resolve critical bottlenecks".to_string(),
                description: format!(
                    "{} critical bottleneck(s) detected: {}",
                    critical.len(),
                    kinds.join(", ")
                ),
                action: critical
                    .iter()
                    .map(|f| f.recommendation.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
                impact: "Prevents outages and restores normal latency".to_string(),
            });
        }

        let predictions = outputs.predictions;
        if predictions.scaling_needed {
            recommendations.push(Recommendation {
                priority: Priority::High,
                category: "scaling".to_string(),
                title: "Scale ahead of forecast load".to_string(),
                description: format!(
                    "Load is forecast to reach {:.1}% within the hour",
                    predictions.next_hour_load
                ),
                action: format!(
                    "Provision capacity to about {:.0}% of current",
                    predictions.capacity_forecast.recommended_capacity
                ),
                impact: "Keeps headroom for the expected peak".to_string(),
            });
        }

        let cost = outputs.cost_analysis;
        if cost.waste_detected {
            let resources: Vec<&str> = cost
                .recommendations
                .iter()
                .filter(|f| f.estimated_savings > 0.0)
                .map(|f| f.resource.as_str())
                .collect();
            recommendations.push(Recommendation {
                priority: Priority::Medium,
                category: "cost".to_string(),
                title: "Right-size under-utilized resources".to_string(),
                description: format!(
                    "Estimated ${:.2} in potential savings from {}",
                    cost.potential_savings,
                    resources.join(", ")
                ),
                action: "Reduce allocation for resources running below target utilization"
                    .to_string(),
                impact: format!("Save about ${:.2}", cost.potential_savings),
            });
        }

        let security = outputs.security_insights;
        if !security.risks.is_empty() {
            let kinds: Vec<&str> = security.risks.iter().map(|r| r.risk_type.as_str()).collect();
            recommendations.push(Recommendation {
                priority: Priority::High,
                category: "security".to_string(),
                title: "Investigate security risks".to_string(),
                description: format!(
                    "Risk score {} from: {}",
                    security.risk_score,
                    kinds.join(", ")
                ),
                action: security.recommendations.join("; "),
                impact: "Reduces exposure to abuse and attack".to_string(),
            });
        }

        if !outputs.anomalies.is_empty() {
            let mut metrics: Vec<String> = outputs
                .anomalies
                .iter()
                .map(|a| a.metric.to_string())
                .collect();
            metrics.dedup();
            recommendations.push(Recommendation {
                priority: Priority::Medium,
                category: "stability".to_string(),
                title: "Review anomalous metrics".to_string(),
                description: format!(
                    "{} anomaly(ies) on: {}",
                    outputs.anomalies.len(),
                    metrics.join(", ")
                ),
                action: "Correlate the anomalies with recent changes and traffic".to_string(),
                impact: "Catches regressions before they become bottlenecks".to_string(),
            });
        }

        // Stable, so rule order breaks ties
        recommendations.sort_by_key(|r| r.priority);
        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::bottleneck::BottleneckAnalyzer;
    use crate::analyzers::cost::CostOptimizer;
    use crate::analyzers::prediction::{CapacityForecast, ScalingTimeline};
    use crate::analyzers::security::SecurityAnalyzer;
    use crate::metrics::MetricsSample;

    fn predictions(scaling_needed: bool) -> Predictions {
        Predictions {
            model: "linear".to_string(),
            next_hour_load: if scaling_needed { 92.0 } else { 40.0 },
            next_day_load: 40.0,
            scaling_needed,
            scaling_timeline: ScalingTimeline::default(),
            trends: Vec::new(),
            capacity_forecast: CapacityForecast::default(),
        }
    }

    #[test]
    fn test_quiet_cycle_has_no_recommendations() {
        let outputs = AnalyzerOutputs {
            anomalies: &[],
            predictions: &predictions(false),
            bottlenecks: &BottleneckReport::default(),
            cost_analysis: &CostAnalysis::default(),
            security_insights: &SecurityInsights::default(),
        };
        assert!(RecommendationSynthesizer::new().synthesize(&outputs).is_empty());
    }

    #[test]
    fn test_every_rule_fires_and_is_sorted() {
        let mut sample = MetricsSample::default();
        sample.system.cpu_usage = 95.0;
        sample.system.disk_usage = 50.0;
        sample.application.rate_limit_hits = 80;

        let bottlenecks = BottleneckAnalyzer::default().analyze(&sample);
        let cost = CostOptimizer::default().analyze(&sample);
        let security = SecurityAnalyzer::default().analyze(&sample);
        let predictions = predictions(true);

        let outputs = AnalyzerOutputs {
            anomalies: &[],
            predictions: &predictions,
            bottlenecks: &bottlenecks,
            cost_analysis: &cost,
            security_insights: &security,
        };
        let recommendations = RecommendationSynthesizer::new().synthesize(&outputs);

        let summary: Vec<(Priority, &str)> = recommendations
            .iter()
            .map(|r| (r.priority, r.category.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Priority::Critical, "performance"),
                (Priority::High, "scaling"),
                (Priority::High, "security"),
                (Priority::Medium, "cost"),
            ]
        );
        assert!(recommendations[0].description.starts_with("1 critical"));
        assert!(recommendations[3].description.contains("$150.00"));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert_eq!(Priority::Critical.to_string(), "critical");
    }
}
