//! Re-applying stored annotations to a freshly loaded document
//!
//! Anchored records are found by their text. Every occurrence of the anchor
//! in the flattened page text is scored by how much of the stored context
//! still surrounds it; the best score wins and ties go to the earliest
//! occurrence. When the anchor as a whole is gone, each stored segment is
//! looked up on its own.
//!
//! Legacy records replay their child-index paths from the root.
//!
//! A record that cannot be placed is skipped; the rest of the pass goes on.

use thiserror::Error;

use crate::annotations::{new_id, AnchoredRecord, AnnotationRecord, LegacyRecord, SiteRecord};
use crate::dom::{Document, DomError};
use crate::legacy::{to_dom_range, LegacyPathError};

use super::marker::{MarkSpec, MarkWriter};
use super::segmenter::segment;
use super::text_index::TextIndex;

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("Anchor text of {highlight_id} was not found on the page")]
    RelocationMiss { highlight_id: String },

    #[error("Legacy path is stale: {0}")]
    LegacyPathStale(#[from] LegacyPathError),

    #[error("Located range contains no annotatable text")]
    SegmentationEmpty,

    #[error("Record format is not recognized")]
    Unrecognized,

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// A record left out of the restore pass
#[derive(Debug)]
pub struct SkippedRecord {
    /// Position in `SiteRecord::changes`
    pub index: usize,
    pub error: RestoreError,
}

#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Group tags of the records now marked in the document
    pub restored: Vec<String>,
    pub skipped: Vec<SkippedRecord>,
}

pub struct RestorationEngine<'a> {
    writer: &'a MarkWriter,
}

impl<'a> RestorationEngine<'a> {
    pub fn new(writer: &'a MarkWriter) -> Self {
        Self { writer }
    }

    /// Mark every record of `site` in `doc`, in stored order.
    ///
    /// Legacy records get a fresh session group tag on every pass.
    pub fn restore(&self, doc: &mut Document, site: &mut SiteRecord) -> RestoreReport {
        let mut report = RestoreReport::default();

        for (index, record) in site.changes.iter_mut().enumerate() {
            let outcome = match record {
                AnnotationRecord::Anchored(rec) => self
                    .restore_anchored(doc, rec)
                    .map(|_| rec.highlight_id.clone()),
                AnnotationRecord::Legacy(rec) => self.restore_legacy(doc, rec),
                AnnotationRecord::Unrecognized(_) => Err(RestoreError::Unrecognized),
            };

            match outcome {
                Ok(highlight_id) => report.restored.push(highlight_id),
                Err(error) => {
                    tracing::debug!("Skipping stored annotation #{}: {}", index, error);
                    report.skipped.push(SkippedRecord { index, error });
                }
            }
        }

        report
    }

    fn restore_anchored(&self, doc: &mut Document, rec: &AnchoredRecord) -> Result<usize, RestoreError> {
        let spec = MarkSpec {
            kind: rec.kind,
            color: rec.color.as_deref(),
            highlight_id: &rec.highlight_id,
            mark_id: &rec.mark_id,
        };

        let preceding = rec
            .segments
            .first()
            .map_or("", |s| s.preceding_context.as_str());
        let following = rec
            .segments
            .last()
            .map_or("", |s| s.following_context.as_str());

        if let Some(marked) = self.mark_text(doc, &rec.anchor_text, preceding, following, &spec)? {
            return Ok(marked);
        }

        // The text between segments changed; place whatever is left
        let mut marked = 0;
        for descriptor in &rec.segments {
            if let Some(count) = self.mark_text(
                doc,
                &descriptor.text,
                &descriptor.preceding_context,
                &descriptor.following_context,
                &spec,
            )? {
                marked += count;
            }
        }

        if marked == 0 {
            return Err(RestoreError::RelocationMiss {
                highlight_id: rec.highlight_id.clone(),
            });
        }
        Ok(marked)
    }

    /// Locate `needle`, segment the match and mark it.
    /// `Ok(None)` when the text is not on the page.
    fn mark_text(
        &self,
        doc: &mut Document,
        needle: &str,
        preceding: &str,
        following: &str,
        spec: &MarkSpec<'_>,
    ) -> Result<Option<usize>, RestoreError> {
        let index = TextIndex::build(doc);
        let Some(at) = locate(&index, needle, preceding, following) else {
            return Ok(None);
        };
        let Some(range) = index.range(at, at + needle.chars().count()) else {
            return Ok(None);
        };

        let segments = segment(doc, &range)?;
        if segments.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.writer.apply(doc, &segments, spec)))
    }

    fn restore_legacy(&self, doc: &mut Document, rec: &mut LegacyRecord) -> Result<String, RestoreError> {
        let range = to_dom_range(doc, &rec.range)?;
        let segments = segment(doc, &range)?;
        if segments.is_empty() {
            return Err(RestoreError::SegmentationEmpty);
        }

        let highlight_id = new_id();
        self.writer.apply(
            doc,
            &segments,
            &MarkSpec {
                kind: rec.kind,
                color: rec.data.as_deref(),
                highlight_id: &highlight_id,
                mark_id: &highlight_id,
            },
        );
        rec.session_highlight_id = Some(highlight_id.clone());
        Ok(highlight_id)
    }
}

/// Best-scoring occurrence of `needle`, earliest on ties
fn locate(index: &TextIndex, needle: &str, preceding: &str, following: &str) -> Option<usize> {
    let len = needle.chars().count();
    let preceding_len = preceding.chars().count();
    let following_len = following.chars().count();

    let mut best: Option<(usize, usize)> = None;
    for at in index.find_all(needle) {
        let score = common_suffix(&index.preceding(at, preceding_len), preceding)
            + common_prefix(&index.following(at + len, following_len), following);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((at, score));
        }
    }
    best.map(|(at, _)| at)
}

fn common_prefix(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .count()
}
