//! Concurrent snapshot assembly.
//!
//! All five collectors run on the blocking pool at the same time, each under
//! its own deadline. A collector that fails, panics or overruns contributes an
//! empty collection; the other categories are unaffected. The whole build sits
//! behind one unwind boundary so a bug here never takes the host down.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::collectors::{
    CallHistoryCollector, ContactsCollector, DocumentCollector, MediaCollector, MessagesCollector,
    RecordCollector,
};
use crate::constants::DEFAULT_COLLECTOR_TIMEOUT_SECS;
use crate::fixtures::{FixtureProvider, SampleFixtures};
use crate::models::{Category, DeviceInfo, Snapshot};
use crate::permissions::{CategoryDecision, PermissionGate, PermissionTracker};
use crate::sources::DataSource;

/// What happened to one category during a build.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryOutcome {
    Collected { count: usize },
    Substituted { count: usize },
    Denied,
    Failed { reason: String },
    TimedOut,
}

/// A snapshot together with the per-category outcomes that produced it.
#[derive(Debug, Clone)]
pub struct AggregationReport {
    pub snapshot: Snapshot,
    pub outcomes: BTreeMap<Category, CategoryOutcome>,
    pub consent: Vec<CategoryDecision>,
}

impl AggregationReport {
    fn empty(device: DeviceInfo) -> Self {
        Self {
            snapshot: Snapshot::empty(device),
            outcomes: BTreeMap::new(),
            consent: Vec::new(),
        }
    }

    /// Categories whose records came from sample fixtures
    pub fn substituted_categories(&self) -> Vec<Category> {
        self.categories_where(|o| matches!(o, CategoryOutcome::Substituted { .. }))
    }

    /// Categories that were refused by consent or by the provider
    pub fn denied_categories(&self) -> Vec<Category> {
        self.categories_where(|o| matches!(o, CategoryOutcome::Denied))
    }

    fn categories_where(&self, pred: impl Fn(&CategoryOutcome) -> bool) -> Vec<Category> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .map(|(category, _)| *category)
            .collect()
    }
}

pub struct Aggregator {
    source: Arc<dyn DataSource>,
    gate: Arc<PermissionGate>,
    fixtures: Arc<dyn FixtureProvider>,
    device: DeviceInfo,
    sample_mode: bool,
    collector_timeout: Duration,
    tracker: PermissionTracker,
}

impl Aggregator {
    pub fn new(source: Arc<dyn DataSource>, gate: Arc<PermissionGate>, device: DeviceInfo) -> Self {
        Self {
            source,
            gate,
            fixtures: Arc::new(SampleFixtures::now()),
            device,
            sample_mode: false,
            collector_timeout: Duration::from_secs(DEFAULT_COLLECTOR_TIMEOUT_SECS),
            tracker: PermissionTracker::new(),
        }
    }

    pub fn with_fixtures(mut self, fixtures: Arc<dyn FixtureProvider>) -> Self {
        self.fixtures = fixtures;
        self
    }

    /// Replace empty contacts, messages and calls with fixture records
    pub fn with_sample_mode(mut self, enabled: bool) -> Self {
        self.sample_mode = enabled;
        self
    }

    pub fn with_collector_timeout(mut self, timeout: Duration) -> Self {
        self.collector_timeout = timeout;
        self
    }

    pub fn tracker(&self) -> &PermissionTracker {
        &self.tracker
    }

    /// Build a snapshot, discarding the per-category outcomes
    pub async fn build_snapshot(&self) -> Snapshot {
        self.build().await.snapshot
    }

    pub async fn build(&self) -> AggregationReport {
        match AssertUnwindSafe(self.build_inner()).catch_unwind().await {
            Ok(report) => report,
            Err(panic) => {
                error!("Aggregation failed unexpectedly: {}", panic_message(panic.as_ref()));
                AggregationReport::empty(self.device.clone())
            }
        }
    }

    async fn build_inner(&self) -> AggregationReport {
        let consent = self.gate.audit();
        self.tracker.clear().await;
        info!("Starting collection of {} categories", Category::ALL.len());

        let deadline = self.collector_timeout;
        let source = &self.source;
        let gate = &self.gate;

        let (contacts, messages, calls, media, documents) = futures::join!(
            run_collector(ContactsCollector::new(source.clone(), gate.clone()), deadline),
            run_collector(MessagesCollector::new(source.clone(), gate.clone()), deadline),
            run_collector(CallHistoryCollector::new(source.clone(), gate.clone()), deadline),
            run_collector(MediaCollector::new(source.clone(), gate.clone()), deadline),
            run_collector(DocumentCollector::new(source.clone(), gate.clone()), deadline),
        );

        let mut outcomes = BTreeMap::new();
        let contacts = self.with_fallback(Category::Contacts, contacts, || self.fixtures.contacts(), &mut outcomes);
        let messages = self.with_fallback(Category::Messages, messages, || self.fixtures.messages(), &mut outcomes);
        let calls = self.with_fallback(Category::CallHistory, calls, || self.fixtures.calls(), &mut outcomes);
        outcomes.insert(Category::Media, media.1);
        outcomes.insert(Category::Documents, documents.1);

        for (category, outcome) in &outcomes {
            if *outcome == CategoryOutcome::Denied {
                self.tracker.record_denied(*category).await;
            }
        }

        let snapshot = Snapshot {
            contacts,
            messages,
            calls,
            media_files: media.0,
            documents: documents.0,
            device: self.device.clone(),
        };

        info!(
            "Snapshot built: {} contacts, {} messages, {} calls, {} media files, {} documents",
            snapshot.contacts.len(),
            snapshot.messages.len(),
            snapshot.calls.len(),
            snapshot.media_files.len(),
            snapshot.documents.len()
        );

        AggregationReport { snapshot, outcomes, consent }
    }

    /// Swap an empty result for fixture output when sample mode is on.
    /// Fixture records replace the result wholesale and are never merged.
    fn with_fallback<T>(
        &self,
        category: Category,
        (records, outcome): (Vec<T>, CategoryOutcome),
        fixtures: impl FnOnce() -> Vec<T>,
        outcomes: &mut BTreeMap<Category, CategoryOutcome>,
    ) -> Vec<T> {
        if self.sample_mode && records.is_empty() && category.supports_fallback() {
            let substitute = fixtures();
            warn!("Sample mode: {} replaced with {} sample records", category, substitute.len());
            outcomes.insert(category, CategoryOutcome::Substituted { count: substitute.len() });
            return substitute;
        }
        outcomes.insert(category, outcome);
        records
    }
}

/// Run one collector on the blocking pool under a deadline.
///
/// On timeout the blocking thread is left to finish on its own; its result is
/// discarded.
async fn run_collector<C>(collector: C, deadline: Duration) -> (Vec<C::Record>, CategoryOutcome)
where
    C: RecordCollector + 'static,
{
    let category = collector.category();
    let task = tokio::task::spawn_blocking(move || collector.try_collect());

    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(Ok(records))) => {
            let count = records.len();
            debug!("{} collector finished with {} records", category, count);
            (records, CategoryOutcome::Collected { count })
        }
        Ok(Ok(Err(e))) if e.is_authorization() => {
            debug!("{} not collected: {}", category, e);
            (Vec::new(), CategoryOutcome::Denied)
        }
        Ok(Ok(Err(e))) => {
            warn!("{} collector failed: {}", category, e);
            (Vec::new(), CategoryOutcome::Failed { reason: e.to_string() })
        }
        Ok(Err(join_error)) => {
            let reason = if join_error.is_panic() {
                format!("collector panicked: {}", panic_message(join_error.into_panic().as_ref()))
            } else {
                "collector task was cancelled".to_string()
            };
            error!("{} {}", category, reason);
            (Vec::new(), CategoryOutcome::Failed { reason })
        }
        Err(_) => {
            warn!("{} collector exceeded {}s deadline", category, deadline.as_secs());
            (Vec::new(), CategoryOutcome::TimedOut)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
