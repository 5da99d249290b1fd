// Tests for the metrics model, history and collectors

use super::*;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::time::Duration;

fn sample_at(seconds: i64, cpu: f64) -> MetricsSample {
    let mut sample = MetricsSample::default();
    sample.timestamp = Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap();
    sample.system.cpu_usage = cpu;
    sample
}

#[test]
fn test_sample_value_lookup() {
    let sample = MetricsSample::default();

    assert_eq!(sample.value(MetricKey::CpuUsage), sample.system.cpu_usage);
    assert_eq!(sample.value(MetricKey::QueueLength), 5.0);
    assert_eq!(sample.value(MetricKey::CacheHitRate), 92.0);
    for key in MetricKey::ALL {
        let reading = sample
            .readings()
            .into_iter()
            .find(|r| r.category() == key.category())
            .unwrap();
        assert_eq!(reading.value(key), Some(sample.value(key)), "{}", key);
    }
}

#[test]
fn test_reading_rejects_foreign_keys() {
    let reading = CategoryReading::System(SystemMetrics::default());
    assert!(reading.value(MetricKey::QueryTime).is_none());
    assert!(reading.value(MetricKey::CpuUsage).is_some());
}

#[test]
fn test_sample_validation() {
    assert!(MetricsSample::default().validate().is_ok());

    let mut sample = MetricsSample::default();
    sample.system.cpu_usage = 120.0;
    assert!(sample.validate().is_err());

    let mut sample = MetricsSample::default();
    sample.database.query_time = -1.0;
    assert!(sample.validate().is_err());

    let mut sample = MetricsSample::default();
    sample.application.response_time = f64::NAN;
    assert!(sample.validate().is_err());

    // Latency has no upper bound
    let mut sample = MetricsSample::default();
    sample.system.network_latency = 5_000.0;
    assert!(sample.validate().is_ok());
}

#[test]
fn test_metric_key_metadata() {
    assert_eq!(MetricKey::CpuUsage.category(), MetricCategory::System);
    assert_eq!(MetricKey::RateLimitHits.category(), MetricCategory::Application);
    assert_eq!(MetricKey::LockWaitTime.category(), MetricCategory::Database);
    assert_eq!(MetricKey::CircuitBreakerTrips.category(), MetricCategory::Services);
    assert!(MetricKey::CacheHitRate.higher_is_better());
    assert!(!MetricKey::ResponseTime.higher_is_better());
    assert_eq!(
        serde_json::to_string(&MetricKey::LockWaitTime).unwrap(),
        "\"lock_wait_time\""
    );
}

#[test]
fn test_history_store_appends_one_row_per_category() {
    let mut history = MetricsHistory::new(10);
    assert!(history.is_empty());

    let sample = sample_at(0, 50.0);
    history.store(sample.timestamp, &sample);

    for category in MetricCategory::ALL {
        assert_eq!(history.len(category), 1);
    }
    assert_eq!(history.latest_timestamp(), Some(sample.timestamp));
}

#[test]
fn test_history_never_exceeds_capacity() {
    let mut history = MetricsHistory::new(25);

    for i in 0..500 {
        let sample = sample_at(i, (i % 100) as f64);
        history.store(sample.timestamp, &sample);
        for category in MetricCategory::ALL {
            assert!(history.len(category) <= 25);
        }
    }

    assert_eq!(history.len(MetricCategory::System), 25);
    // Oldest rows were evicted first
    let series = history.series(MetricKey::CpuUsage, 25);
    assert_eq!(series.first().copied(), Some(75.0));
    assert_eq!(series.last().copied(), Some(99.0));
}

#[test]
fn test_history_query_window_and_category() {
    let mut history = MetricsHistory::new(100);
    for minutes in [0, 30, 50, 70, 90] {
        let sample = sample_at(minutes * 60, minutes as f64);
        history.store(sample.timestamp, &sample);
    }

    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + ChronoDuration::minutes(90);

    let system = history.query_at(now, Some(MetricCategory::System), DEFAULT_QUERY_WINDOW);
    // 30, 50, 70 and 90 minutes fall within the last hour
    assert_eq!(system.len(), 4);
    assert!(system
        .iter()
        .all(|entry| entry.reading.category() == MetricCategory::System));
    assert!(system.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let everything = history.query_at(now, None, DEFAULT_QUERY_WINDOW);
    assert_eq!(everything.len(), 16);

    let narrow = history.query_at(now, None, Duration::from_secs(60));
    assert_eq!(narrow.len(), 4);
}

#[test]
fn test_history_series_returns_latest_values() {
    let mut history = MetricsHistory::new(100);
    for i in 0..20 {
        let sample = sample_at(i, i as f64);
        history.store(sample.timestamp, &sample);
    }

    assert_eq!(history.series(MetricKey::CpuUsage, 3), vec![17.0, 18.0, 19.0]);
    assert_eq!(history.series(MetricKey::CpuUsage, 100).len(), 20);
    assert!(MetricsHistory::default()
        .series(MetricKey::CpuUsage, 10)
        .is_empty());
}

#[tokio::test]
async fn test_simulated_collector_produces_valid_samples() {
    let collector = SimulatedCollector::default();

    for _ in 0..200 {
        let sample = collector.collect().await.unwrap();
        assert!(sample.validate().is_ok(), "{:?}", sample);
    }
    assert_eq!(collector.collected(), 200);
    assert_eq!(collector.name(), "simulated");
}

#[tokio::test]
async fn test_simulated_collector_without_jitter_is_stable() {
    let baseline = MetricsSample::default();
    let collector = SimulatedCollector::new(baseline.clone(), 0.0, 0.0).unwrap();

    let sample = collector.collect().await.unwrap();
    assert_eq!(sample.system, baseline.system);
    assert_eq!(sample.services, baseline.services);
}

#[test]
fn test_simulated_collector_rejects_bad_parameters() {
    assert!(SimulatedCollector::new(MetricsSample::default(), 1.5, 0.0).is_err());
    assert!(SimulatedCollector::new(MetricsSample::default(), 0.1, -0.1).is_err());
}
