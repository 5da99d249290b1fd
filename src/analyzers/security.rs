// Security insights: additive rule scoring over traffic and error patterns

use crate::metrics::MetricsSample;
use serde::{Deserialize, Serialize};

/// Risk severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRisk {
    pub risk_type: String,
    pub severity: RiskSeverity,
    pub description: String,
    pub mitigation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityInsights {
    /// Sum of rule weights, clamped to 0..=100
    pub risk_score: u8,
    pub risks: Vec<SecurityRisk>,
    /// One mitigation per risk, same order
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Rate limit hits per sample above which traffic looks abusive
    pub rate_limit_threshold: f64,
    pub rate_limit_weight: f64,
    /// Error rate (percentage) above which errors look like probing or attack
    pub error_spike_threshold: f64,
    pub error_spike_weight: f64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            rate_limit_threshold: 50.0,
            rate_limit_weight: 25.0,
            error_spike_threshold: 10.0,
            error_spike_weight: 40.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SecurityAnalyzer {
    config: SecurityConfig,
}

impl SecurityAnalyzer {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, sample: &MetricsSample) -> SecurityInsights {
        let mut score = 0.0;
        let mut risks = Vec::new();

        let rate_limit_hits = sample.application.rate_limit_hits as f64;
        if rate_limit_hits > self.config.rate_limit_threshold {
            score += self.config.rate_limit_weight;
            risks.push(SecurityRisk {
                risk_type: "high_rate_limiting".to_string(),
                severity: RiskSeverity::Medium,
                description: format!(
                    "{} requests were rate limited, above {}",
                    rate_limit_hits, self.config.rate_limit_threshold
                ),
                mitigation: "Review client traffic and block abusive sources at the edge"
                    .to_string(),
            });
        }

        let error_rate = sample.application.error_rate;
        if error_rate > self.config.error_spike_threshold {
            score += self.config.error_spike_weight;
            risks.push(SecurityRisk {
                risk_type: "error_spike".to_string(),
                severity: RiskSeverity::High,
                description: format!(
                    "Error rate {:.2}% exceeds {:.2}%, possible probing or attack",
                    error_rate, self.config.error_spike_threshold
                ),
                mitigation: "Audit failing requests for scanning patterns and tighten input validation"
                    .to_string(),
            });
        }

        SecurityInsights {
            risk_score: score.clamp(0.0, 100.0).round() as u8,
            recommendations: risks.iter().map(|r| r.mitigation.clone()).collect(),
            risks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_traffic_has_no_risk() {
        let insights = SecurityAnalyzer::default().analyze(&MetricsSample::default());
        assert_eq!(insights.risk_score, 0);
        assert!(insights.risks.is_empty());
        assert!(insights.recommendations.is_empty());
    }

    #[test]
    fn test_rules_are_additive() {
        let mut sample = MetricsSample::default();
        sample.application.rate_limit_hits = 51;
        let insights = SecurityAnalyzer::default().analyze(&sample);
        assert_eq!(insights.risk_score, 25);
        assert_eq!(insights.risks[0].risk_type, "high_rate_limiting");
        assert_eq!(insights.risks[0].severity, RiskSeverity::Medium);

        sample.application.error_rate = 12.0;
        let insights = SecurityAnalyzer::default().analyze(&sample);
        assert_eq!(insights.risk_score, 65);
        assert_eq!(insights.risks.len(), 2);
        assert_eq!(insights.recommendations.len(), 2);
        assert_eq!(insights.risks[1].severity, RiskSeverity::High);
        assert_eq!(insights.recommendations[1], insights.risks[1].mitigation);
    }

    #[test]
    fn test_score_is_clamped() {
        let analyzer = SecurityAnalyzer::new(SecurityConfig {
            rate_limit_weight: 80.0,
            error_spike_weight: 90.0,
            ..SecurityConfig::default()
        });
        let mut sample = MetricsSample::default();
        sample.application.rate_limit_hits = 500;
        sample.application.error_rate = 50.0;

        assert_eq!(analyzer.analyze(&sample).risk_score, 100);
    }
}
