//! Turns isolated runs into a storable anchored record

use chrono::Utc;

use crate::annotations::{AnchoredRecord, AnnotationKind, SegmentDescriptor};
use crate::dom::Document;

use super::segmenter::Segment;
use super::text_index::TextIndex;

/// Chars of surrounding text kept on each side of a segment
pub const DEFAULT_CONTEXT_CHARS: usize = 32;

/// Record fields that do not come from the runs themselves
#[derive(Debug, Clone, Copy)]
pub struct AnchorExtras<'a> {
    pub kind: AnnotationKind,
    pub color: Option<&'a str>,
    pub highlight_id: &'a str,
    pub mark_id: &'a str,
    pub note_text: Option<&'a str>,
}

/// Build the record for `segments`.
///
/// Context windows are read from the flattened page text, so the result is
/// the same whether or not the runs have been wrapped yet.
pub fn encode(
    doc: &Document,
    segments: &[Segment],
    extras: AnchorExtras<'_>,
    context_chars: usize,
) -> AnchoredRecord {
    let index = TextIndex::build(doc);

    let segments = segments
        .iter()
        .map(|segment| {
            let Some(at) = index.offset_of(segment.node) else {
                return SegmentDescriptor {
                    text: segment.text.clone(),
                    preceding_context: String::new(),
                    following_context: String::new(),
                };
            };
            let len = segment.text.chars().count();
            SegmentDescriptor {
                text: segment.text.clone(),
                preceding_context: index.preceding(at, context_chars),
                following_context: index.following(at + len, context_chars),
            }
        })
        .collect::<Vec<_>>();

    AnchoredRecord {
        kind: extras.kind,
        color: extras.color.map(str::to_string),
        mark_id: extras.mark_id.to_string(),
        highlight_id: extras.highlight_id.to_string(),
        anchor_text: segments.iter().map(|s| s.text.as_str()).collect(),
        segments,
        note_text: extras.note_text.map(str::to_string),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchoring::segmenter::{joined_text, segment};
    use crate::dom::{Boundary, DomRange};

    fn extras() -> AnchorExtras<'static> {
        AnchorExtras {
            kind: AnnotationKind::Highlight,
            color: Some("yellow"),
            highlight_id: "h1",
            mark_id: "m1",
            note_text: None,
        }
    }

    #[test]
    fn test_cross_element_record() {
        let mut doc = Document::parse_html("<p>The <b>quick brown</b> fox jumps</p>");
        let b = doc.find_by_tag("b")[0];
        let quick = doc.children(b)[0];
        let p = doc.find_by_tag("p")[0];
        let tail = doc.children(p)[2];
        let segments =
            segment(&mut doc, &DomRange::new(Boundary::new(quick, 0), Boundary::new(tail, 4))).unwrap();

        let record = encode(&doc, &segments, extras(), DEFAULT_CONTEXT_CHARS);

        assert_eq!(record.anchor_text, "quick brown fox");
        assert_eq!(record.anchor_text, joined_text(&segments));
        assert_eq!(record.segments.len(), 2);
        assert_eq!(record.segments[0].preceding_context, "The ");
        assert_eq!(record.segments[0].following_context, " fox jumps");
        assert_eq!(record.segments[1].preceding_context, "The quick brown");
        assert_eq!(record.segments[1].following_context, " jumps");
        assert_eq!(record.highlight_id, "h1");
        assert_eq!(record.color.as_deref(), Some("yellow"));
    }

    #[test]
    fn test_context_is_bounded() {
        let mut doc = Document::parse_html("<p>0123456789 target 0123456789</p>");
        let t = doc.children(doc.find_by_tag("p")[0])[0];
        let segments = segment(&mut doc, &DomRange::within(t, 11, 17)).unwrap();

        let record = encode(&doc, &segments, extras(), 4);

        assert_eq!(record.segments[0].text, "target");
        assert_eq!(record.segments[0].preceding_context, "789 ");
        assert_eq!(record.segments[0].following_context, " 012");
    }
}
