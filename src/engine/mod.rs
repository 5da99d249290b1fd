// Analytics engine
// Periodic collect -> store -> analyze -> score -> report loop with subscriber notifications

use crate::analyzers::{AnalyzerOutputs, AnalyzerSuite, ForecastModel};
use crate::config::EngineConfig;
use crate::metrics::{HistoryEntry, MetricCategory, MetricsCollector, MetricsHistory, MetricsSample};
use crate::utils::error::{AnalyticsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub mod events;
pub mod report;


pub use events::{CycleFailure, EngineEvent, EventCallback, FailureStage, SubscriptionId};
pub use report::AnalysisReport;

use events::SubscriberRegistry;

/// Counters describing the engine's work so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub collection_failures: u64,
    pub analyzer_failures: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_cycle_duration_ms: u64,
    /// Running mean over every cycle, failed ones included
    pub avg_cycle_duration_ms: f64,
    pub last_health_score: Option<u8>,
}

impl EngineStats {
    pub fn total_cycles(&self) -> u64 {
        self.cycles_completed + self.cycles_failed
    }

    fn record(&mut self, elapsed: Duration, outcome: &Result<Arc<AnalysisReport>>) {
        match outcome {
            Ok(report) => {
                self.cycles_completed += 1;
                self.last_health_score = Some(report.overall_health);
            }
            Err(err) => {
                self.cycles_failed += 1;
                if err.is_collection_failure() {
                    self.collection_failures += 1;
                } else if err.is_analyzer_failure() {
                    self.analyzer_failures += 1;
                }
            }
        }

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let total = self.total_cycles() as f64;
        self.avg_cycle_duration_ms += (elapsed_ms - self.avg_cycle_duration_ms) / total;
        self.last_cycle_duration_ms = elapsed.as_millis() as u64;
        self.last_cycle_at = Some(Utc::now());
    }
}

struct Scheduler {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

struct EngineInner {
    config: EngineConfig,
    collector: Arc<dyn MetricsCollector>,
    analyzers: Arc<AnalyzerSuite>,
    history: RwLock<Arc<MetricsHistory>>,
    subscribers: SubscriberRegistry,
    scheduler: Mutex<Option<Scheduler>>,
    /// Held for the whole of a cycle so scheduled and manual cycles never overlap
    cycle_lock: Mutex<()>,
    cycle_counter: AtomicU64,
    stats: RwLock<EngineStats>,
    latest_report: RwLock<Option<Arc<AnalysisReport>>>,
}

/// Periodic analytics engine
///
/// Cloning yields another handle to the same engine. Engines share no state with each other.
#[derive(Clone)]
pub struct AnalyticsEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for AnalyticsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsEngine")
            .field("collector", &self.inner.collector.name())
            .field("cycle_interval", &self.inner.config.engine.cycle_interval())
            .field("cycles", &self.inner.cycle_counter.load(Ordering::Relaxed))
            .finish()
    }
}

impl AnalyticsEngine {
    /// Create an engine; an invalid configuration is rejected here
    pub fn new(config: EngineConfig, collector: Arc<dyn MetricsCollector>) -> Result<Self> {
        config.validate()?;
        let analyzers = AnalyzerSuite::from_config(&config);
        Ok(Self::assemble(config, collector, analyzers))
    }

    /// Create an engine whose predictor uses the given forecast model
    pub fn with_forecast_model(
        config: EngineConfig,
        collector: Arc<dyn MetricsCollector>,
        model: Arc<dyn ForecastModel>,
    ) -> Result<Self> {
        config.validate()?;
        let analyzers = AnalyzerSuite::from_config(&config).with_forecast_model(&config, model);
        Ok(Self::assemble(config, collector, analyzers))
    }

    fn assemble(
        config: EngineConfig,
        collector: Arc<dyn MetricsCollector>,
        analyzers: AnalyzerSuite,
    ) -> Self {
        info!(
            "Initializing analytics engine with collector '{}' (interval {:?}, history capacity {})",
            collector.name(),
            config.engine.cycle_interval(),
            config.history.capacity
        );

        let history = MetricsHistory::new(config.history.capacity);
        Self {
            inner: Arc::new(EngineInner {
                config,
                collector,
                analyzers: Arc::new(analyzers),
                history: RwLock::new(Arc::new(history)),
                subscribers: SubscriberRegistry::default(),
                scheduler: Mutex::new(None),
                cycle_lock: Mutex::new(()),
                cycle_counter: AtomicU64::new(0),
                stats: RwLock::new(EngineStats::default()),
                latest_report: RwLock::new(None),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Start the periodic loop; the first cycle runs immediately. No-op when already running.
    pub async fn start(&self) -> Result<()> {
        let mut scheduler = self.inner.scheduler.lock().await;
        if scheduler.is_some() {
            debug!("Analytics engine already running");
            return Ok(());
        }

        let period = self.inner.config.engine.cycle_interval();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_scheduler(
            Arc::downgrade(&self.inner),
            period,
            shutdown_rx,
        ));
        *scheduler = Some(Scheduler { shutdown, task });

        info!("Analytics engine started, cycle interval {:?}", period);
        Ok(())
    }

    /// Stop the periodic loop. A cycle already underway is allowed to finish and
    /// publish; once this returns no further cycle will start. No-op when stopped.
    pub async fn stop(&self) -> Result<()> {
        let scheduler = self.inner.scheduler.lock().await.take();
        let Some(scheduler) = scheduler else {
            debug!("Analytics engine already stopped");
            return Ok(());
        };

        // Receiver may already be gone if the loop exited on its own
        let _ = scheduler.shutdown.send(true);
        if let Err(e) = scheduler.task.await {
            if e.is_panic() {
                error!("Analytics scheduler panicked: {}", e);
            }
        }

        info!("Analytics engine stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.inner.scheduler.lock().await.is_some()
    }

    /// Register a callback invoked once per cycle with its report or failure.
    /// Callbacks run on the engine's task and should return quickly.
    pub async fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(Arc::new(callback)).await
    }

    /// Receive events as a stream; the stream ends after `unsubscribe`
    pub async fn subscribe_stream(&self) -> (SubscriptionId, UnboundedReceiverStream<EngineEvent>) {
        self.inner.subscribers.subscribe_stream().await
    }

    /// Returns false when the id was not subscribed
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id).await
    }

    pub async fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len().await
    }

    pub async fn stats(&self) -> EngineStats {
        self.inner.stats.read().await.clone()
    }

    pub async fn latest_report(&self) -> Option<Arc<AnalysisReport>> {
        self.inner.latest_report.read().await.clone()
    }

    /// Immutable view of history as of the last stored sample
    pub async fn history_snapshot(&self) -> Arc<MetricsHistory> {
        Arc::clone(&*self.inner.history.read().await)
    }

    /// History rows inside the configured query window, optionally for one category
    pub async fn recent_history(&self, category: Option<MetricCategory>) -> Vec<HistoryEntry> {
        let window = self.inner.config.history.query_window();
        self.history_snapshot().await.query(category, window)
    }

    /// Run one cycle now and publish its outcome to subscribers.
    /// Waits for any cycle already in progress.
    pub async fn run_cycle(&self) -> Result<Arc<AnalysisReport>> {
        let _guard = self.inner.cycle_lock.lock().await;
        let cycle = self.inner.cycle_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();

        debug!("Starting analytics cycle {}", cycle);
        let outcome = self.execute_cycle(cycle).await.map(Arc::new);
        let elapsed = started.elapsed();

        self.inner.stats.write().await.record(elapsed, &outcome);

        let event = match &outcome {
            Ok(report) => {
                debug!(
                    "Cycle {} completed in {:?}: health {}, {} anomalies, {} recommendations",
                    cycle,
                    elapsed,
                    report.overall_health,
                    report.anomalies.len(),
                    report.recommendations.len()
                );
                if report.has_critical_findings() {
                    warn!(
                        "Cycle {} found {} critical bottleneck(s)",
                        cycle,
                        report.bottlenecks.critical.len()
                    );
                }
                *self.inner.latest_report.write().await = Some(Arc::clone(report));
                EngineEvent::Report(Arc::clone(report))
            }
            Err(e) => {
                error!("Analytics cycle {} failed: {}", cycle, e);
                EngineEvent::Error(Arc::new(CycleFailure::from_error(cycle, e)))
            }
        };

        self.inner.subscribers.publish(&event).await;
        outcome
    }

    async fn execute_cycle(&self, cycle: u64) -> Result<AnalysisReport> {
        let sample = Arc::new(self.collect().await?);

        let history = {
            let mut guard = self.inner.history.write().await;
            Arc::make_mut(&mut *guard).store(sample.timestamp, &sample);
            Arc::clone(&*guard)
        };

        let budget = self.inner.config.engine.analyzer_timeout();
        let suite = &self.inner.analyzers;

        let (anomalies, predictions, bottlenecks, cost_analysis, security_insights) = tokio::try_join!(
            run_analyzer("anomaly", budget, {
                let (suite, sample, history) = (suite.clone(), sample.clone(), history.clone());
                move || suite.anomaly.detect(&sample, &history)
            }),
            run_analyzer("prediction", budget, {
                let (suite, history) = (suite.clone(), history.clone());
                move || suite.prediction.predict(&history)
            }),
            run_analyzer("bottleneck", budget, {
                let (suite, sample) = (suite.clone(), sample.clone());
                move || suite.bottleneck.analyze(&sample)
            }),
            run_analyzer("cost", budget, {
                let (suite, sample) = (suite.clone(), sample.clone());
                move || suite.cost.analyze(&sample)
            }),
            run_analyzer("security", budget, {
                let (suite, sample) = (suite.clone(), sample.clone());
                move || suite.security.analyze(&sample)
            }),
        )?;

        let overall_health = suite.health.score(&sample, &anomalies, &bottlenecks);
        let recommendations = suite.recommendations.synthesize(&AnalyzerOutputs {
            anomalies: &anomalies,
            predictions: &predictions,
            bottlenecks: &bottlenecks,
            cost_analysis: &cost_analysis,
            security_insights: &security_insights,
        });

        Ok(AnalysisReport {
            id: Uuid::new_v4(),
            cycle,
            timestamp: Utc::now(),
            sample: MetricsSample::clone(&sample),
            anomalies,
            predictions,
            bottlenecks,
            cost_analysis,
            security_insights,
            overall_health,
            recommendations,
        })
    }

    async fn collect(&self) -> Result<MetricsSample> {
        let collector = &self.inner.collector;
        let budget = self.inner.config.engine.collector_timeout();

        let sample = match tokio::time::timeout(budget, collector.collect()).await {
            Ok(Ok(sample)) => sample,
            Ok(Err(e)) if e.is_collection_failure() => return Err(e),
            Ok(Err(e)) => {
                return Err(AnalyticsError::collection(
                    collector.name().to_string(),
                    e.to_string(),
                ))
            }
            Err(_) => {
                return Err(AnalyticsError::CollectionTimeout {
                    collector: collector.name().to_string(),
                    timeout_ms: budget.as_millis() as u64,
                })
            }
        };

        sample.validate().map_err(|e| {
            AnalyticsError::collection(collector.name().to_string(), e.to_string())
        })?;
        Ok(sample)
    }
}

/// Run one analyzer on the blocking pool; a panic or overrun becomes an analyzer error
async fn run_analyzer<T, F>(name: &'static str, budget: Duration, job: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(budget, tokio::task::spawn_blocking(job)).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(join_error)) => {
            let message = if join_error.is_panic() {
                panic_message(join_error.into_panic())
            } else {
                join_error.to_string()
            };
            Err(AnalyticsError::analyzer(name.to_string(), message))
        }
        Err(_) => Err(AnalyticsError::AnalyzerTimeout {
            analyzer: name.to_string(),
            timeout_ms: budget.as_millis() as u64,
        }),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

async fn run_scheduler(
    engine: Weak<EngineInner>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let Some(inner) = engine.upgrade() else {
            break;
        };
        // Outcome already logged and published by run_cycle
        let _ = AnalyticsEngine { inner }.run_cycle().await;
    }

    debug!("Analytics scheduler loop exited");
}
