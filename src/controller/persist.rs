//! Background save queue
//!
//! Every mutating action hands its resulting record to a single worker task.
//! Jobs run one at a time in the order they were issued, so a later state of
//! a page can never be overwritten by an earlier one.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::observer::AnnotationObserver;
use crate::annotations::{PageIdentity, SiteRecord};
use crate::storage::{self, AnnotationStore};

/// How a save ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Record written
    Saved,
    /// Record was empty and has been deleted
    Deleted,
    /// Capacity check refused the write; the document keeps the change
    Denied,
    /// Store error; the document keeps the change
    Failed(String),
    /// The action changed nothing, no save was issued
    Unchanged,
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveOutcome::Saved => f.write_str("saved"),
            SaveOutcome::Deleted => f.write_str("deleted"),
            SaveOutcome::Denied => f.write_str("denied"),
            SaveOutcome::Failed(e) => write!(f, "failed: {}", e),
            SaveOutcome::Unchanged => f.write_str("unchanged"),
        }
    }
}

/// Pending result of a save
#[derive(Debug)]
pub struct Durability {
    rx: oneshot::Receiver<SaveOutcome>,
}

impl Durability {
    /// Already settled
    pub fn resolved(outcome: SaveOutcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self { rx }
    }

    /// Wait for the worker to finish this save
    pub async fn wait(self) -> SaveOutcome {
        self.rx
            .await
            .unwrap_or_else(|_| SaveOutcome::Failed("save worker stopped".to_string()))
    }
}

#[derive(Debug)]
pub(crate) enum SaveJob {
    Persist(SiteRecord),
    Delete,
}

struct SaveRequest {
    page: PageIdentity,
    job: SaveJob,
    done: oneshot::Sender<SaveOutcome>,
}

/// Handle to the save worker; the worker stops once every handle is dropped
/// and the queue has drained
#[derive(Clone)]
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<SaveRequest>,
}

impl PersistQueue {
    /// Spawn the worker. Must be called from within a tokio runtime.
    pub fn start(store: Arc<dyn AnnotationStore>, observer: Arc<dyn AnnotationObserver>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(store, observer, rx));
        Self { tx }
    }

    pub(crate) fn submit(&self, page: PageIdentity, job: SaveJob) -> Durability {
        let (done, rx) = oneshot::channel();
        if let Err(e) = self.tx.send(SaveRequest { page, job, done }) {
            tracing::error!("Save queue is closed, dropping save for {}", e.0.page);
            return Durability::resolved(SaveOutcome::Failed("save queue closed".to_string()));
        }
        Durability { rx }
    }
}

async fn run_worker(
    store: Arc<dyn AnnotationStore>,
    observer: Arc<dyn AnnotationObserver>,
    mut rx: mpsc::UnboundedReceiver<SaveRequest>,
) {
    while let Some(request) = rx.recv().await {
        let outcome = execute(store.as_ref(), &request.page, request.job).await;

        match &outcome {
            SaveOutcome::Denied => {
                tracing::warn!("Annotation limit reached, page {} was not saved", request.page)
            }
            SaveOutcome::Failed(e) => {
                tracing::error!("Failed to save annotations for page {}: {}", request.page, e)
            }
            _ => tracing::debug!("Page {} {}", request.page, outcome),
        }

        observer.durability_notice(&request.page, &outcome);
        // The action's caller may have dropped its handle
        let _ = request.done.send(outcome);
    }

    tracing::debug!("Save worker stopped");
}

async fn execute(store: &dyn AnnotationStore, page: &PageIdentity, job: SaveJob) -> SaveOutcome {
    match job {
        SaveJob::Delete => match store.delete(page).await {
            Ok(()) => SaveOutcome::Deleted,
            Err(e) => SaveOutcome::Failed(e.to_string()),
        },
        SaveJob::Persist(record) => {
            match storage::admits(store, page, &record).await {
                Ok(false) => return SaveOutcome::Denied,
                Ok(true) => {}
                Err(e) => return SaveOutcome::Failed(e.to_string()),
            }
            match store.persist(page, &record).await {
                Ok(()) => SaveOutcome::Saved,
                Err(e) => SaveOutcome::Failed(e.to_string()),
            }
        }
    }
}
