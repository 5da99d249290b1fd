// Per-cycle analysis report

use crate::analyzers::{
    Anomaly, BottleneckReport, CostAnalysis, Predictions, Priority, Recommendation,
    SecurityInsights,
};
use crate::metrics::MetricsSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything one cycle learned about the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    /// Cycle number, starting at 1 for each engine
    pub cycle: u64,
    pub timestamp: DateTime<Utc>,
    pub sample: MetricsSample,
    pub anomalies: Vec<Anomaly>,
    pub predictions: Predictions,
    pub bottlenecks: BottleneckReport,
    pub cost_analysis: CostAnalysis,
    pub security_insights: SecurityInsights,
    /// 0..=100, higher is healthier
    pub overall_health: u8,
    /// Ordered critical first
    pub recommendations: Vec<Recommendation>,
}

impl AnalysisReport {
    /// Recommendations at or above the given priority
    pub fn recommendations_at_least(&self, priority: Priority) -> impl Iterator<Item = &Recommendation> {
        self.recommendations
            .iter()
            .filter(move |r| r.priority <= priority)
    }

    pub fn has_critical_findings(&self) -> bool {
        !self.bottlenecks.critical.is_empty()
    }

    /// Serialize to pretty JSON for export
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
