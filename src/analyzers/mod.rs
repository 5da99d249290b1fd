// Analyzer modules run by the engine each cycle
// Each analyzer is a pure function of the cycle's sample and history snapshot

use crate::config::EngineConfig;

pub mod anomaly;
pub mod bottleneck;
pub mod cost;
pub mod health;
pub mod prediction;
pub mod recommendations;
pub mod security;

pub use anomaly::{Anomaly, AnomalyConfig, AnomalyDetector, AnomalySeverity, AnomalyType, MetricThreshold};
pub use bottleneck::{BottleneckAnalyzer, BottleneckFinding, BottleneckReport, BottleneckThresholds, BottleneckTier};
pub use cost::{CostAnalysis, CostConfig, CostFinding, CostOptimizer, CostTarget};
pub use health::{HealthConfig, HealthScorer};
pub use prediction::{
    CapacityForecast, ForecastModel, ForecastStrategy, HoltSmoothing, LinearTrend, MetricTrend,
    PerformancePredictor, PredictionConfig, Predictions, ScalingTimeline, SeasonalNaive,
    TrendDirection,
};
pub use recommendations::{AnalyzerOutputs, Priority, Recommendation, RecommendationSynthesizer};
pub use security::{RiskSeverity, SecurityAnalyzer, SecurityConfig, SecurityInsights, SecurityRisk};

/// The full set of analyzers one engine runs, built once from configuration
#[derive(Debug, Clone)]
pub struct AnalyzerSuite {
    pub anomaly: AnomalyDetector,
    pub prediction: PerformancePredictor,
    pub bottleneck: BottleneckAnalyzer,
    pub cost: CostOptimizer,
    pub security: SecurityAnalyzer,
    pub health: HealthScorer,
    pub recommendations: RecommendationSynthesizer,
}

impl AnalyzerSuite {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            anomaly: AnomalyDetector::new(config.anomaly.clone()),
            prediction: PerformancePredictor::new(
                config.prediction.clone(),
                config.engine.cycle_interval(),
            ),
            bottleneck: BottleneckAnalyzer::new(config.bottleneck.clone()),
            cost: CostOptimizer::new(config.cost.clone()),
            security: SecurityAnalyzer::new(config.security.clone()),
            health: HealthScorer::new(config.health.clone()),
            recommendations: RecommendationSynthesizer::new(),
        }
    }

    /// Replace the configured forecast strategy with a custom model
    pub fn with_forecast_model(
        mut self,
        config: &EngineConfig,
        model: std::sync::Arc<dyn ForecastModel>,
    ) -> Self {
        self.prediction = PerformancePredictor::with_model(
            config.prediction.clone(),
            config.engine.cycle_interval(),
            model,
        );
        self
    }
}
