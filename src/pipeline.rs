//! Background export runs.
//!
//! An [`ExportWorker`] runs aggregation, serialization and delivery as one
//! task. Only one run may be in flight per worker; a second submit is refused
//! rather than queued.
//!
//! ```text
//!  submit() ──▶ tokio task ──▶ Aggregator::build ──▶ to_wire_format ──▶ DeliveryClient::deliver
//!     │                                                                        │
//!     └──────────────────────────── ExportHandle::wait() ◀─────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::aggregator::{AggregationReport, Aggregator};
use crate::delivery::{file_references, DeliveryClient, DeliveryOutcome};
use crate::models::Category;
use crate::serializer::to_wire_format;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("an export is already running")]
    AlreadyRunning,

    #[error("no async runtime is available to run the export")]
    NoRuntime,

    #[error("export task aborted: {0}")]
    Aborted(String),
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub report: AggregationReport,
    /// Wire-format snapshot; empty when serialization failed
    pub serialized: String,
    /// `None` when delivery was not requested
    pub delivery: Option<DeliveryOutcome>,
    pub denied: Vec<Category>,
}

struct WorkerInner {
    aggregator: Aggregator,
    delivery: Option<DeliveryClient>,
}

/// Clears the busy flag when a run ends, however it ends.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs exports in the background, one at a time.
#[derive(Clone)]
pub struct ExportWorker {
    inner: Arc<WorkerInner>,
    busy: Arc<AtomicBool>,
}

impl ExportWorker {
    /// `delivery` of `None` builds and serializes the snapshot without uploading it
    pub fn new(aggregator: Aggregator, delivery: Option<DeliveryClient>) -> Self {
        Self {
            inner: Arc::new(WorkerInner { aggregator, delivery }),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> Result<RunGuard, PipelineError> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| RunGuard(Arc::clone(&self.busy)))
            .map_err(|_| PipelineError::AlreadyRunning)
    }

    /// Start a run on the current runtime.
    pub fn submit(&self) -> Result<ExportHandle, PipelineError> {
        self.submit_with_callback(|_| {})
    }

    /// Start a run and invoke `on_complete` with its result before the handle resolves.
    pub fn submit_with_callback<F>(&self, on_complete: F) -> Result<ExportHandle, PipelineError>
    where
        F: FnOnce(&ExportResult) + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;
        let guard = self.acquire()?;
        let run_id = Uuid::new_v4();
        let inner = Arc::clone(&self.inner);

        info!("Export run {} submitted", run_id);
        let task = runtime.spawn(async move {
            let _guard = guard;
            let result = run_export(&inner, run_id).await;
            on_complete(&result);
            result
        });

        Ok(ExportHandle { run_id, task })
    }

    /// Run an export on the calling task.
    pub async fn run(&self) -> Result<ExportResult, PipelineError> {
        let _guard = self.acquire()?;
        Ok(run_export(&self.inner, Uuid::new_v4()).await)
    }
}

/// Handle to a submitted run.
#[derive(Debug)]
pub struct ExportHandle {
    run_id: Uuid,
    task: JoinHandle<ExportResult>,
}

impl ExportHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<ExportResult, PipelineError> {
        self.task.await.map_err(|e| {
            error!("Export run {} did not complete: {}", self.run_id, e);
            PipelineError::Aborted(e.to_string())
        })
    }
}

async fn run_export(inner: &WorkerInner, run_id: Uuid) -> ExportResult {
    let started_at = Utc::now();
    info!("Export run {} started", run_id);

    let report = inner.aggregator.build().await;
    inner.aggregator.tracker().report().await;
    let denied = report.denied_categories();

    let substituted = report.substituted_categories();
    if !substituted.is_empty() {
        let names: Vec<String> = substituted.iter().map(|c| c.to_string()).collect();
        warn!("Snapshot contains sample data for: {}", names.join(", "));
    }

    let (serialized, delivery) = match to_wire_format(&report.snapshot) {
        Ok(serialized) => {
            let delivery = match &inner.delivery {
                Some(client) => {
                    let references = file_references(&report.snapshot);
                    Some(client.deliver(&serialized, &references).await)
                }
                None => {
                    info!("Upload disabled, snapshot kept locally");
                    None
                }
            };
            (serialized, delivery)
        }
        Err(e) => {
            error!("{:#}", e);
            let outcome = inner
                .delivery
                .as_ref()
                .map(|_| DeliveryOutcome::Failed { reason: format!("{:#}", e) });
            (String::new(), outcome)
        }
    };

    let finished_at = Utc::now();
    info!(
        "Export run {} finished in {} ms",
        run_id,
        (finished_at - started_at).num_milliseconds()
    );

    ExportResult {
        run_id,
        started_at,
        finished_at,
        report,
        serialized,
        delivery,
        denied,
    }
}
