// Engine notifications and the subscriber registry

use super::report::AnalysisReport;
use crate::utils::error::AnalyticsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error};

/// Which step of a cycle failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Collection,
    Analysis,
    Other,
}

impl FailureStage {
    pub fn of(error: &AnalyticsError) -> Self {
        if error.is_collection_failure() {
            FailureStage::Collection
        } else if error.is_analyzer_failure() {
            FailureStage::Analysis
        } else {
            FailureStage::Other
        }
    }
}

/// Why a cycle produced no report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleFailure {
    pub cycle: u64,
    pub timestamp: DateTime<Utc>,
    pub stage: FailureStage,
    pub message: String,
}

impl CycleFailure {
    pub fn from_error(cycle: u64, error: &AnalyticsError) -> Self {
        Self {
            cycle,
            timestamp: Utc::now(),
            stage: FailureStage::of(error),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for CycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle {} failed: {}", self.cycle, self.message)
    }
}

/// Delivered to every subscriber once per cycle
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Report(Arc<AnalysisReport>),
    Error(Arc<CycleFailure>),
}

impl EngineEvent {
    pub fn cycle(&self) -> u64 {
        match self {
            EngineEvent::Report(report) => report.cycle,
            EngineEvent::Error(failure) => failure.cycle,
        }
    }

    pub fn report(&self) -> Option<&Arc<AnalysisReport>> {
        match self {
            EngineEvent::Report(report) => Some(report),
            EngineEvent::Error(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Arc<CycleFailure>> {
        match self {
            EngineEvent::Error(failure) => Some(failure),
            EngineEvent::Report(_) => None,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

pub type EventCallback = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Subscribers keyed by id; delivery follows subscription order
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: RwLock<BTreeMap<SubscriptionId, EventCallback>>,
}

impl SubscriberRegistry {
    pub(crate) async fn subscribe(&self, callback: EventCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.subscribers.write().await.insert(id, callback);
        debug!("Registered subscriber {}", id);
        id
    }

    pub(crate) async fn subscribe_stream(
        &self,
    ) -> (SubscriptionId, UnboundedReceiverStream<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self
            .subscribe(Arc::new(move |event: &EngineEvent| {
                // Receiver gone means the stream was dropped; nothing to deliver to
                let _ = tx.send(event.clone());
            }))
            .await;
        (id, UnboundedReceiverStream::new(rx))
    }

    pub(crate) async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscribers.write().await.remove(&id).is_some();
        if removed {
            debug!("Removed subscriber {}", id);
        }
        removed
    }

    pub(crate) async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Deliver to a snapshot of the current subscribers; a panicking callback is logged and skipped
    pub(crate) async fn publish(&self, event: &EngineEvent) {
        let snapshot: Vec<(SubscriptionId, EventCallback)> = self
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        for (id, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!(
                    "Subscriber {} panicked while handling cycle {}",
                    id,
                    event.cycle()
                );
            }
        }
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}
