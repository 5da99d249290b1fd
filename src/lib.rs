//! # Ops Analytics
//!
//! A periodic analytics engine for operational metrics. Each cycle collects one
//! sample from an injected collector, appends it to a bounded history and runs a
//! suite of analyzers over it, producing a single report with a health score and
//! prioritized recommendations.
//!
//! ## Features
//!
//! - **Anomaly Detection**: Static thresholds plus volatility over recent history
//! - **Performance Prediction**: Pluggable forecast models, scaling timeline and capacity outlook
//! - **Bottleneck Analysis**: Tiered findings across system, database and service metrics
//! - **Cost and Security Insights**: Waste estimates and additive risk scoring
//! - **Notifications**: Callback and stream subscribers for every cycle's outcome
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ops_analytics::{AnalyticsEngine, EngineConfig, EngineEvent, SimulatedCollector};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = AnalyticsEngine::new(
//!         EngineConfig::default(),
//!         Arc::new(SimulatedCollector::default()),
//!     )?;
//!
//!     engine
//!         .subscribe(|event: &EngineEvent| {
//!             if let Some(report) = event.report() {
//!                 println!("cycle {} health {}", report.cycle, report.overall_health);
//!             }
//!         })
//!         .await;
//!
//!     engine.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     engine.stop().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod analyzers;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod utils;

// Re-export main types for convenience
pub use config::{EngineConfig, EngineSettings, HistorySettings};
pub use engine::{
    AnalysisReport, AnalyticsEngine, CycleFailure, EngineEvent, EngineStats, FailureStage,
    SubscriptionId,
};
pub use utils::error::{AnalyticsError, Result};

// Re-export metrics types
pub use metrics::{MetricCategory, MetricKey, MetricsCollector, MetricsHistory, MetricsSample, SimulatedCollector};

// Re-export analyzer output types
pub use analyzers::{Anomaly, BottleneckReport, CostAnalysis, Predictions, Priority, Recommendation, SecurityInsights};

/// Initialize the analytics system with default logging
pub async fn init() -> Result<()> {
    utils::logging::init_logging()?;
    Ok(())
}

/// Initialize the analytics system with custom logging configuration
pub async fn init_with_logging(level: tracing::Level) -> Result<()> {
    utils::logging::init_logging_with_level(level)?;
    Ok(())
}
