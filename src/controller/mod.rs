//! Per-document annotation controller
//!
//! One controller owns one document and everything that goes with it: the
//! page record, the marker writer, the current-selection slot and the save
//! queue. Every action changes the document synchronously and returns the
//! result right away, together with a [`Durability`] handle for the save
//! that runs in the background.

mod observer;
mod persist;

pub use observer::{AnnotationObserver, ChangeAction, TracingObserver};
pub use persist::{Durability, PersistQueue, SaveOutcome};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::anchoring::{
    encode, plan, segment, validate, AnchorExtras, MarkSpec, MarkWriter, RestorationEngine,
    RestoreReport, SelectionContext, SelectionError,
};
use crate::annotations::{new_id, AnnotationKind, PageIdentity, PageInfo, RecordError, SiteRecord};
use crate::config::EngineConfig;
use crate::dom::{Document, DomError, DomRange};
use crate::legacy::to_legacy_range;
use crate::storage::{AnnotationStore, StoreError};
use persist::SaveJob;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("No selection to act on")]
    NoSelection,

    #[error("Invalid selection: {0}")]
    InvalidSelection(#[from] SelectionError),

    #[error("Selection contains no annotatable text")]
    SegmentationEmpty,

    #[error("No annotation with mark {0}")]
    UnknownMark(String),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Result of an action: the document state it produced right away, and the
/// save it queued
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    pub durability: Durability,
}

/// A freshly created annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub highlight_id: String,
    pub mark_id: String,
    pub markers: usize,
}

/// What a clear action removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cleared {
    pub highlight_ids: Vec<String>,
    pub legacy: usize,
}

pub struct AnnotationController {
    doc: Document,
    site: SiteRecord,
    writer: MarkWriter,
    selection: SelectionContext,
    store: Arc<dyn AnnotationStore>,
    queue: PersistQueue,
    observer: Arc<dyn AnnotationObserver>,
    config: EngineConfig,
}

impl AnnotationController {
    /// Controller for `doc` loaded from `url`. Must be created inside a tokio
    /// runtime; it spawns the save worker.
    pub fn new(doc: Document, url: &str, store: Arc<dyn AnnotationStore>, config: EngineConfig) -> Self {
        Self::with_observer(doc, url, store, config, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        doc: Document,
        url: &str,
        store: Arc<dyn AnnotationStore>,
        config: EngineConfig,
        observer: Arc<dyn AnnotationObserver>,
    ) -> Self {
        let title = page_title(&doc);
        let site = SiteRecord::new(PageIdentity::from_url(url), PageInfo::new(url, &title));
        let queue = PersistQueue::start(store.clone(), observer.clone());

        Self {
            doc,
            site,
            writer: MarkWriter::new(config.marker_config()),
            selection: SelectionContext::new(),
            store,
            queue,
            observer,
            config,
        }
    }

    pub fn identity(&self) -> &PageIdentity {
        &self.site.identity
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn site(&self) -> &SiteRecord {
        &self.site
    }

    pub fn writer(&self) -> &MarkWriter {
        &self.writer
    }

    /// Serialized document, markers included
    pub fn html(&self) -> String {
        self.doc.to_html()
    }

    /// Remember `range` for the next selection-dependent action.
    /// Replaces whatever was saved before.
    pub fn select(&mut self, range: DomRange) {
        self.selection.save(range);
    }

    pub fn selection(&self) -> Option<DomRange> {
        self.selection.current()
    }

    pub fn clear_selection_slot(&mut self) {
        self.selection.clear();
    }

    /// Load the stored record and mark it in the document.
    ///
    /// Loading is retried with linear backoff while the store errors. Call
    /// once per document: a second pass would mark everything twice.
    pub async fn load_and_restore(&mut self) -> Result<RestoreReport, StoreError> {
        let page = self.site.identity.clone();
        let attempts = self.config.restore_max_attempts.max(1);

        let mut attempt = 0;
        let loaded = loop {
            attempt += 1;
            match self.store.load(&page).await {
                Ok(loaded) => break loaded,
                Err(e) if attempt < attempts => {
                    let wait = self.config.restore_backoff_ms * u64::from(attempt);
                    tracing::warn!(
                        "Loading annotations for {} failed (attempt {}/{}): {}, retrying in {}ms",
                        page,
                        attempt,
                        attempts,
                        e,
                        wait
                    );
                    tokio::time::sleep(Duration::from_millis(wait)).await;
                }
                Err(e) => return Err(e),
            }
        };

        let Some(mut site) = loaded else {
            tracing::debug!("No stored annotations for {}", page);
            return Ok(RestoreReport::default());
        };

        let report = RestorationEngine::new(&self.writer).restore(&mut self.doc, &mut site);
        tracing::info!(
            "Restored {} of {} annotations for {}",
            report.restored.len(),
            site.annotation_count(),
            page
        );
        self.site = site;
        Ok(report)
    }

    /// Mark the current selection and record it
    pub fn annotate(
        &mut self,
        kind: AnnotationKind,
        color: Option<&str>,
    ) -> Result<Applied<Annotation>, ActionError> {
        let range = self.selection.current().ok_or(ActionError::NoSelection)?;
        validate(&self.doc, &range)?;

        let legacy_range = to_legacy_range(&self.doc, &range);
        let segments = segment(&mut self.doc, &range)?;
        if segments.is_empty() {
            tracing::debug!("Selection has no annotatable text, nothing to do");
            return Err(ActionError::SegmentationEmpty);
        }

        let highlight_id = new_id();
        let mark_id = new_id();
        let markers = self.writer.apply(
            &mut self.doc,
            &segments,
            &MarkSpec {
                kind,
                color,
                highlight_id: &highlight_id,
                mark_id: &mark_id,
            },
        );
        let record = encode(
            &self.doc,
            &segments,
            AnchorExtras {
                kind,
                color,
                highlight_id: &highlight_id,
                mark_id: &mark_id,
                note_text: None,
            },
            self.config.context_chars,
        );

        if let Err(e) = self.site.add(record) {
            self.writer.remove(&mut self.doc, &highlight_id);
            return Err(e.into());
        }

        // A new annotation replaces the legacy ones it overlaps
        if let Some(legacy_range) = legacy_range {
            for legacy in self.site.remove_legacy_overlapping(&legacy_range) {
                if let Some(id) = legacy.session_highlight_id.as_deref() {
                    self.writer.remove(&mut self.doc, id);
                }
            }
        }

        self.selection.clear();
        let durability = self.commit(ChangeAction::Added);

        Ok(Applied {
            value: Annotation {
                highlight_id,
                mark_id,
                markers,
            },
            durability,
        })
    }

    /// Restyle every marker of a record
    pub fn recolor(&mut self, highlight_id: &str, color: Option<&str>) -> Applied<usize> {
        if !self.site.recolor(highlight_id, color) {
            return unchanged(0);
        }
        let markers = self.writer.recolor(&mut self.doc, highlight_id, color);
        Applied {
            value: markers,
            durability: self.commit(ChangeAction::Updated),
        }
    }

    /// Remove a record, its markers and its note
    pub fn remove(&mut self, highlight_id: &str) -> Applied<usize> {
        let markers = self.writer.remove(&mut self.doc, highlight_id);
        if self.site.remove(highlight_id).is_none() {
            return unchanged(markers);
        }
        Applied {
            value: markers,
            durability: self.commit(ChangeAction::Removed),
        }
    }

    /// Remove every record the current selection touches
    pub fn clear_selection(&mut self) -> Result<Applied<Cleared>, ActionError> {
        let range = self.selection.current().ok_or(ActionError::NoSelection)?;
        validate(&self.doc, &range)?;

        let runs = plan(&self.doc, &range);
        let touched = self.writer.highlight_ids_in(&self.doc, &runs);
        let legacy_range = to_legacy_range(&self.doc, &range);

        let mut cleared = Cleared::default();
        for id in touched {
            self.writer.remove(&mut self.doc, &id);
            if self.site.remove(&id).is_some() {
                cleared.highlight_ids.push(id);
            }
        }
        if let Some(legacy_range) = legacy_range {
            for legacy in self.site.remove_legacy_overlapping(&legacy_range) {
                if let Some(id) = legacy.session_highlight_id.as_deref() {
                    self.writer.remove(&mut self.doc, id);
                }
                cleared.legacy += 1;
            }
        }

        self.selection.clear();
        if cleared.highlight_ids.is_empty() && cleared.legacy == 0 {
            return Ok(unchanged(cleared));
        }
        Ok(Applied {
            value: cleared,
            durability: self.commit(ChangeAction::Removed),
        })
    }

    /// Attach or replace the note of a mark
    pub fn set_note(&mut self, mark_id: &str, text: &str) -> Result<Applied<()>, ActionError> {
        if !self.site.anchored().any(|r| r.mark_id == mark_id) {
            return Err(ActionError::UnknownMark(mark_id.to_string()));
        }
        self.site.upsert_note(mark_id, text);
        Ok(Applied {
            value: (),
            durability: self.commit(ChangeAction::Updated),
        })
    }

    /// Drop the note of a mark; the mark stays
    pub fn remove_note(&mut self, mark_id: &str) -> Applied<bool> {
        if !self.site.remove_note(mark_id) {
            return unchanged(false);
        }
        Applied {
            value: true,
            durability: self.commit(ChangeAction::Updated),
        }
    }

    /// Notify, then queue the save matching the record's new state
    fn commit(&mut self, action: ChangeAction) -> Durability {
        self.site.touch();
        self.observer
            .annotation_changed(&self.site.identity, action, self.site.annotation_count());

        let job = if self.site.is_empty() {
            SaveJob::Delete
        } else {
            SaveJob::Persist(self.site.clone())
        };
        self.queue.submit(self.site.identity.clone(), job)
    }
}

fn unchanged<T>(value: T) -> Applied<T> {
    Applied {
        value,
        durability: Durability::resolved(SaveOutcome::Unchanged),
    }
}

fn page_title(doc: &Document) -> String {
    doc.find_by_tag("title")
        .first()
        .map(|t| doc.text_content(*t).trim().to_string())
        .unwrap_or_default()
}
