//! Engine Integration Tests
//!
//! End-to-end cycles through the public API: configuration files, scripted
//! collectors, concurrent manual cycles and the scheduled loop.

use async_trait::async_trait;
use chrono::Utc;
use ops_analytics::analyzers::{AnomalyType, ForecastStrategy, TrendDirection};
use ops_analytics::{
    AnalyticsEngine, EngineConfig, EngineEvent, MetricCategory, MetricKey, MetricsCollector,
    MetricsSample, Priority, Result,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_stream::StreamExt;
use tokio_test::{assert_err, assert_ok};

/// Replays a fixed list of samples, wrapping around at the end
struct ScriptedCollector {
    samples: Vec<MetricsSample>,
    next: AtomicUsize,
}

impl ScriptedCollector {
    fn new(samples: Vec<MetricsSample>) -> Arc<Self> {
        Arc::new(Self {
            samples,
            next: AtomicUsize::new(0),
        })
    }

    fn repeating(sample: MetricsSample) -> Arc<Self> {
        Self::new(vec![sample])
    }
}

#[async_trait]
impl MetricsCollector for ScriptedCollector {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn collect(&self) -> Result<MetricsSample> {
        let index = self.next.fetch_add(1, Ordering::SeqCst) % self.samples.len();
        let mut sample = self.samples[index].clone();
        sample.timestamp = Utc::now();
        Ok(sample)
    }
}

fn with_cpu(cpu: f64) -> MetricsSample {
    let mut sample = MetricsSample::default();
    sample.system.cpu_usage = cpu;
    sample
}

#[tokio::test]
async fn test_engine_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("analytics.toml");

    let mut config = EngineConfig::default().with_history_capacity(3);
    config.bottleneck.cpu_critical = 40.0;
    assert_ok!(config.save_to_file(&path));

    let loaded = assert_ok!(EngineConfig::from_file(&path));
    let engine = assert_ok!(AnalyticsEngine::new(
        loaded,
        ScriptedCollector::repeating(MetricsSample::default())
    ));

    for _ in 0..5 {
        assert_ok!(engine.run_cycle().await);
    }

    // Default cpu 45 trips the lowered threshold
    let report = engine.latest_report().await.unwrap();
    assert_eq!(report.bottlenecks.critical.len(), 1);
    assert_eq!(report.recommendations[0].priority, Priority::Critical);

    let history = engine.history_snapshot().await;
    assert_eq!(history.len(MetricCategory::Database), 3);
    assert_eq!(history.capacity(), 3);
}

#[tokio::test]
async fn test_invalid_config_never_builds_an_engine() {
    let mut config = EngineConfig::default();
    config.history.query_window_secs = 0;

    let err = assert_err!(AnalyticsEngine::new(
        config,
        ScriptedCollector::repeating(MetricsSample::default())
    ));
    assert!(err.is_config_error());
}

#[tokio::test]
async fn test_concurrent_manual_cycles_are_serialized() {
    let engine = AnalyticsEngine::new(
        EngineConfig::default(),
        ScriptedCollector::repeating(MetricsSample::default()),
    )
    .unwrap();

    let runs = (0..5).map(|_| {
        let engine = engine.clone();
        async move { engine.run_cycle().await }
    });
    let reports = futures::future::join_all(runs).await;

    let mut cycles: Vec<u64> = reports
        .into_iter()
        .map(|report| report.unwrap().cycle)
        .collect();
    cycles.sort();
    assert_eq!(cycles, vec![1, 2, 3, 4, 5]);
    assert_eq!(
        engine.history_snapshot().await.len(MetricCategory::System),
        5
    );
    assert_eq!(engine.stats().await.cycles_completed, 5);
}

#[tokio::test]
async fn test_rising_load_forecast() {
    let mut config = EngineConfig::default();
    config.prediction.strategy = ForecastStrategy::Linear;
    let samples = [40.0, 45.0, 50.0, 55.0, 60.0, 65.0]
        .into_iter()
        .map(with_cpu)
        .collect();
    let engine = AnalyticsEngine::new(config, ScriptedCollector::new(samples)).unwrap();

    let mut last = None;
    for _ in 0..6 {
        last = Some(engine.run_cycle().await.unwrap());
    }
    let report = last.unwrap();
    let predictions = &report.predictions;

    assert_eq!(predictions.model, "linear");
    assert!(predictions.scaling_needed);
    assert!(predictions.scaling_timeline.within_1h);
    assert!(predictions.scaling_timeline.within_24h);
    assert_eq!(predictions.next_hour_load, 100.0);

    // Five points per 30s cycle leaves 35 points: seven cycles
    assert_eq!(predictions.capacity_forecast.time_to_exhaustion_secs, Some(210));
    assert_eq!(predictions.capacity_forecast.current_utilization, 65.0);

    let cpu_trend = predictions
        .trends
        .iter()
        .find(|t| t.metric == MetricKey::CpuUsage)
        .unwrap();
    assert_eq!(cpu_trend.direction, TrendDirection::Degrading);

    assert!(report
        .recommendations
        .iter()
        .any(|r| r.category == "scaling" && r.priority == Priority::High));
}

#[tokio::test]
async fn test_volatile_response_time() {
    let samples = [20.0, 280.0]
        .into_iter()
        .map(|response_time| {
            let mut sample = MetricsSample::default();
            sample.application.response_time = response_time;
            sample
        })
        .collect();
    let engine = AnalyticsEngine::new(EngineConfig::default(), ScriptedCollector::new(samples))
        .unwrap();

    let first = engine.run_cycle().await.unwrap();
    assert!(first.anomalies.is_empty());

    let second = engine.run_cycle().await.unwrap();
    assert_eq!(second.anomalies.len(), 1);
    let anomaly = &second.anomalies[0];
    assert_eq!(anomaly.anomaly_type, AnomalyType::HighVolatility);
    assert_eq!(anomaly.metric, MetricKey::ResponseTime);
    assert!((anomaly.observed_value - 130.0).abs() < 1e-9);

    assert!(second
        .recommendations
        .iter()
        .any(|r| r.category == "stability" && r.priority == Priority::Medium));
    // 280ms is above the 200ms health threshold
    assert_eq!(second.overall_health, 85);
}

#[tokio::test]
async fn test_security_risk_report() {
    let mut sample = MetricsSample::default();
    sample.application.rate_limit_hits = 60;
    sample.application.error_rate = 12.0;
    let engine = AnalyticsEngine::new(
        EngineConfig::default(),
        ScriptedCollector::repeating(sample),
    )
    .unwrap();

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.security_insights.risk_score, 65);
    assert_eq!(report.security_insights.risks.len(), 2);
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.category == "security" && r.priority == Priority::High));

    let json = report.to_json().unwrap();
    assert!(json.contains("\"risk_score\": 65"));
}

#[tokio::test]
async fn test_scheduled_run_delivers_reports() {
    let config = EngineConfig::default().with_cycle_interval(Duration::from_millis(20));
    let engine = AnalyticsEngine::new(
        config,
        ScriptedCollector::new(vec![with_cpu(30.0), with_cpu(95.0)]),
    )
    .unwrap();
    let (id, mut events) = engine.subscribe_stream().await;

    assert_ok!(engine.start().await);
    let mut reports = Vec::new();
    while reports.len() < 4 {
        let event = tokio::time::timeout(Duration::from_secs(2), events.next())
            .await
            .expect("engine stalled")
            .expect("stream closed");
        if let EngineEvent::Report(report) = event {
            reports.push(report);
        }
    }
    assert_ok!(engine.stop().await);
    assert!(engine.unsubscribe(id).await);

    let cycles: Vec<u64> = reports.iter().map(|r| r.cycle).collect();
    assert_eq!(cycles, vec![1, 2, 3, 4]);
    assert!(reports[0].bottlenecks.critical.is_empty());
    assert_eq!(reports[1].bottlenecks.critical.len(), 1);

    let stats = engine.stats().await;
    assert!(stats.cycles_completed >= 4);
    assert!(stats.last_cycle_at.is_some());
}
