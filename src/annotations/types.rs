//! Stored annotation types
//!
//! Field names follow the persisted JSON layout:
//!
//! ```text
//! { info: { url, title, hostname, lastModified },
//!   changes: AnnotationRecord[],
//!   notes: { [markId]: string } }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::identity::PageIdentity;
use crate::legacy::LegacyRange;

/// Visual style of an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Highlight,
    Underline,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Underline => "underline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "highlight" => Some(AnnotationKind::Highlight),
            "underline" => Some(AnnotationKind::Underline),
            _ => None,
        }
    }
}

/// One segment of an anchored record with the plain text around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDescriptor {
    pub text: String,
    #[serde(default)]
    pub preceding_context: String,
    #[serde(default)]
    pub following_context: String,
}

/// Current record format, located by its text on reload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchoredRecord {
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    /// Color, `None` for the default style
    #[serde(rename = "data")]
    pub color: Option<String>,
    /// Note association key
    pub mark_id: String,
    /// Group tag shared by every marker of this record
    pub highlight_id: String,
    /// Concatenation of all segment texts
    #[serde(rename = "text")]
    pub anchor_text: String,
    pub segments: Vec<SegmentDescriptor>,
    #[serde(default)]
    pub note_text: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Pre-migration record, located by child-index paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyRecord {
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    #[serde(default)]
    pub data: Option<String>,
    pub range: LegacyRange,
    /// Group tag assigned when the record is replayed; never persisted
    #[serde(skip)]
    pub session_highlight_id: Option<String>,
}

/// A stored record of either format.
///
/// The shape is decided once, when the JSON is read: anything with a `range`
/// is legacy, anything with anchor fields is current. Entries matching
/// neither are kept verbatim so a write-back never loses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationRecord {
    Legacy(LegacyRecord),
    Anchored(AnchoredRecord),
    Unrecognized(serde_json::Value),
}

impl AnnotationRecord {
    /// Group tag used for DOM lookups, if this record has one
    pub fn highlight_id(&self) -> Option<&str> {
        match self {
            AnnotationRecord::Anchored(rec) => Some(&rec.highlight_id),
            AnnotationRecord::Legacy(rec) => rec.session_highlight_id.as_deref(),
            AnnotationRecord::Unrecognized(_) => None,
        }
    }

    pub fn as_anchored(&self) -> Option<&AnchoredRecord> {
        match self {
            AnnotationRecord::Anchored(rec) => Some(rec),
            _ => None,
        }
    }
}

/// Page metadata stored next to the annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_modified: DateTime<Utc>,
}

impl PageInfo {
    pub fn new(url: &str, title: &str) -> Self {
        let hostname = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            url: url.to_string(),
            title: title.to_string(),
            hostname,
            last_modified: Utc::now(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Mark {0} already exists on this page")]
    DuplicateMark(String),
}

/// Everything stored about one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    /// Storage key; carried out of band
    #[serde(skip)]
    pub identity: PageIdentity,
    pub info: PageInfo,
    #[serde(default)]
    pub changes: Vec<AnnotationRecord>,
    /// markId -> note text
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
}

impl SiteRecord {
    pub fn new(identity: PageIdentity, info: PageInfo) -> Self {
        Self {
            identity,
            info,
            changes: Vec::new(),
            notes: BTreeMap::new(),
        }
    }

    pub fn annotation_count(&self) -> usize {
        self.changes.len()
    }

    /// No annotations and no notes: such a record must not be stored
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.notes.is_empty()
    }

    pub fn touch(&mut self) {
        self.info.last_modified = Utc::now();
    }

    pub fn anchored(&self) -> impl Iterator<Item = &AnchoredRecord> {
        self.changes.iter().filter_map(AnnotationRecord::as_anchored)
    }

    pub fn find(&self, highlight_id: &str) -> Option<&AnnotationRecord> {
        self.changes
            .iter()
            .find(|rec| rec.highlight_id() == Some(highlight_id))
    }

    /// Add a new anchored record; `markId` must be unique on the page
    pub fn add(&mut self, record: AnchoredRecord) -> Result<(), RecordError> {
        if self.anchored().any(|r| r.mark_id == record.mark_id) {
            return Err(RecordError::DuplicateMark(record.mark_id));
        }
        self.changes.push(AnnotationRecord::Anchored(record));
        Ok(())
    }

    /// Remove the record owning `highlight_id` along with its note
    pub fn remove(&mut self, highlight_id: &str) -> Option<AnnotationRecord> {
        let pos = self
            .changes
            .iter()
            .position(|rec| rec.highlight_id() == Some(highlight_id))?;
        let removed = self.changes.remove(pos);
        if let AnnotationRecord::Anchored(rec) = &removed {
            self.notes.remove(&rec.mark_id);
        }
        Some(removed)
    }

    /// Remove every legacy record whose range intersects `range`
    pub fn remove_legacy_overlapping(&mut self, range: &LegacyRange) -> Vec<LegacyRecord> {
        let mut removed = Vec::new();
        self.changes.retain(|rec| match rec {
            AnnotationRecord::Legacy(legacy) if legacy.range.overlaps(range) => {
                removed.push(legacy.clone());
                false
            }
            _ => true,
        });
        removed
    }

    /// Change the color of a record in place
    pub fn recolor(&mut self, highlight_id: &str, color: Option<&str>) -> bool {
        for rec in &mut self.changes {
            match rec {
                AnnotationRecord::Anchored(r) if r.highlight_id == highlight_id => {
                    r.color = color.map(str::to_string);
                    return true;
                }
                AnnotationRecord::Legacy(r)
                    if r.session_highlight_id.as_deref() == Some(highlight_id) =>
                {
                    r.data = color.map(str::to_string);
                    return true;
                }
                _ => {}
            }
        }
        false
    }

    /// Insert or replace the note for `mark_id`
    pub fn upsert_note(&mut self, mark_id: &str, text: &str) {
        self.notes.insert(mark_id.to_string(), text.to_string());
        if let Some(rec) = self.anchored_by_mark_mut(mark_id) {
            rec.note_text = Some(text.to_string());
        }
    }

    /// Drop the note for `mark_id`; the mark itself is untouched
    pub fn remove_note(&mut self, mark_id: &str) -> bool {
        let removed = self.notes.remove(mark_id).is_some();
        let mut cleared = false;
        if let Some(rec) = self.anchored_by_mark_mut(mark_id) {
            cleared = rec.note_text.take().is_some();
        }
        removed || cleared
    }

    pub fn note(&self, mark_id: &str) -> Option<&str> {
        self.notes.get(mark_id).map(String::as_str)
    }

    fn anchored_by_mark_mut(&mut self, mark_id: &str) -> Option<&mut AnchoredRecord> {
        self.changes.iter_mut().find_map(|rec| match rec {
            AnnotationRecord::Anchored(r) if r.mark_id == mark_id => Some(r),
            _ => None,
        })
    }
}

/// Fresh identifier for a highlight group or mark
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchored(mark: &str, highlight: &str) -> AnchoredRecord {
        AnchoredRecord {
            kind: AnnotationKind::Highlight,
            color: Some("#ffeb3b".to_string()),
            mark_id: mark.to_string(),
            highlight_id: highlight.to_string(),
            anchor_text: "quick brown".to_string(),
            segments: vec![SegmentDescriptor {
                text: "quick brown".to_string(),
                preceding_context: "The ".to_string(),
                following_context: " fox".to_string(),
            }],
            note_text: None,
            created_at: Utc::now(),
        }
    }

    fn site() -> SiteRecord {
        SiteRecord::new(
            PageIdentity::from_url("https://example.com/a"),
            PageInfo::new("https://example.com/a", "A"),
        )
    }

    #[test]
    fn test_page_info_hostname() {
        let info = PageInfo::new("https://docs.example.com/x#y", "X");
        assert_eq!(info.hostname, "docs.example.com");
        assert_eq!(PageInfo::new("not a url", "").hostname, "");
    }

    #[test]
    fn test_duplicate_mark_rejected() {
        let mut site = site();
        site.add(anchored("m1", "h1")).unwrap();

        assert_eq!(
            site.add(anchored("m1", "h2")),
            Err(RecordError::DuplicateMark("m1".to_string()))
        );
        assert_eq!(site.annotation_count(), 1);
    }

    #[test]
    fn test_remove_drops_note() {
        let mut site = site();
        site.add(anchored("m1", "h1")).unwrap();
        site.upsert_note("m1", "remember this");
        assert_eq!(site.anchored().next().unwrap().note_text.as_deref(), Some("remember this"));

        assert!(site.remove("h1").is_some());
        assert!(site.note("m1").is_none());
        assert!(site.is_empty());
    }

    #[test]
    fn test_remove_note_keeps_mark() {
        let mut site = site();
        site.add(anchored("m1", "h1")).unwrap();
        site.upsert_note("m1", "first");
        site.upsert_note("m1", "second");
        assert_eq!(site.note("m1"), Some("second"));

        assert!(site.remove_note("m1"));
        assert!(site.find("h1").is_some());
        assert!(!site.is_empty());
    }

    #[test]
    fn test_wire_format() {
        let mut site = site();
        site.add(anchored("m1", "h1")).unwrap();
        site.upsert_note("m1", "n");

        let json = serde_json::to_value(&site).unwrap();
        let change = &json["changes"][0];
        assert_eq!(change["type"], "highlight");
        assert_eq!(change["data"], "#ffeb3b");
        assert_eq!(change["markId"], "m1");
        assert_eq!(change["highlightId"], "h1");
        assert_eq!(change["text"], "quick brown");
        assert_eq!(change["segments"][0]["precedingContext"], "The ");
        assert!(change["createdAt"].is_i64());
        assert_eq!(json["notes"]["m1"], "n");
        assert!(json["info"]["lastModified"].is_i64());
        assert!(json.get("identity").is_none());
    }

    #[test]
    fn test_mixed_formats_dispatch_once() {
        let json = r#"{
            "info": {"url": "https://example.com/", "title": "", "hostname": "example.com", "lastModified": 0},
            "changes": [
                {"type": "underline", "data": null,
                 "range": {"startContainerPath": [1, 0], "endContainerPath": [1, 0], "startOffset": 0, "endOffset": 4}},
                {"type": "highlight", "data": "red", "markId": "m", "highlightId": "h",
                 "text": "abc", "segments": [{"text": "abc", "precedingContext": "", "followingContext": ""}],
                 "noteText": null, "createdAt": 1700000000000},
                {"type": "bookmark", "somethingElse": true}
            ],
            "notes": {}
        }"#;

        let site: SiteRecord = serde_json::from_str(json).unwrap();
        assert!(matches!(site.changes[0], AnnotationRecord::Legacy(_)));
        assert!(matches!(site.changes[1], AnnotationRecord::Anchored(_)));
        assert!(matches!(site.changes[2], AnnotationRecord::Unrecognized(_)));

        // Unknown entries survive a write-back untouched
        let back = serde_json::to_value(&site).unwrap();
        assert_eq!(back["changes"][2]["somethingElse"], true);
    }

    #[test]
    fn test_remove_legacy_overlapping() {
        let mut site = site();
        let legacy = |start: usize, end: usize| {
            AnnotationRecord::Legacy(LegacyRecord {
                kind: AnnotationKind::Highlight,
                data: None,
                range: LegacyRange {
                    start_container_path: vec![1, 0, 0],
                    end_container_path: vec![1, 0, 0],
                    start_offset: start,
                    end_offset: end,
                },
                session_highlight_id: None,
            })
        };
        site.changes.push(legacy(0, 4));
        site.changes.push(legacy(10, 14));

        let hit = LegacyRange {
            start_container_path: vec![1, 0, 0],
            end_container_path: vec![1, 0, 0],
            start_offset: 2,
            end_offset: 3,
        };
        let removed = site.remove_legacy_overlapping(&hit);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].range.start_offset, 0);
        assert_eq!(site.annotation_count(), 1);
    }
}
