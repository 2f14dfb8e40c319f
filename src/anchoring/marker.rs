//! Marker elements
//!
//! Every isolated run of an annotation is wrapped in its own inline marker.
//! Markers of one record share a `data-highlight-id`, and all group
//! operations find their members by querying that attribute.

use crate::annotations::AnnotationKind;
use crate::dom::{Document, NodeId};

use super::segmenter::{PlannedSegment, Segment};

/// Configuration for marker elements
#[derive(Debug, Clone)]
pub struct MarkerConfig {
    /// Tag used for markers
    pub tag: String,
    /// CSS class prefix for markers
    pub class_prefix: String,
    /// Data attribute for the group tag
    pub highlight_attribute: String,
    /// Data attribute for the note association key
    pub mark_attribute: String,
    /// Data attribute for the annotation type
    pub type_attribute: String,
    /// Whether to include inline styles
    pub include_inline_styles: bool,
    /// Color used when a highlight has none
    pub default_highlight_color: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            tag: "span".to_string(),
            class_prefix: "mg-mark".to_string(),
            highlight_attribute: "data-highlight-id".to_string(),
            mark_attribute: "data-mark-id".to_string(),
            type_attribute: "data-annotation-type".to_string(),
            include_inline_styles: true,
            default_highlight_color: "#ffeb3b".to_string(),
        }
    }
}

/// What to mark a group of runs with
#[derive(Debug, Clone, Copy)]
pub struct MarkSpec<'a> {
    pub kind: AnnotationKind,
    pub color: Option<&'a str>,
    pub highlight_id: &'a str,
    pub mark_id: &'a str,
}

/// Applies, recolors and removes marker groups
#[derive(Debug, Clone, Default)]
pub struct MarkWriter {
    config: MarkerConfig,
}

impl MarkWriter {
    pub fn new(config: MarkerConfig) -> Self {
        Self { config }
    }

    /// Wrap every run in a marker. Returns the number of markers created.
    pub fn apply(&self, doc: &mut Document, segments: &[Segment], spec: &MarkSpec<'_>) -> usize {
        let class = format!(
            "{} {}-{}",
            self.config.class_prefix,
            self.config.class_prefix,
            spec.kind.as_str()
        );
        let style = self.style(spec.kind, spec.color);

        let mut created = 0;
        for segment in segments {
            let mut attrs = vec![
                ("class", class.as_str()),
                (self.config.highlight_attribute.as_str(), spec.highlight_id),
                (self.config.mark_attribute.as_str(), spec.mark_id),
                (self.config.type_attribute.as_str(), spec.kind.as_str()),
            ];
            if let Some(style) = style.as_deref() {
                attrs.push(("style", style));
            }

            let marker = doc.create_element(&self.config.tag, &attrs);
            match doc.wrap(segment.node, marker) {
                Ok(()) => created += 1,
                Err(e) => tracing::debug!("Skipping run of {}: {}", spec.highlight_id, e),
            }
        }
        created
    }

    /// Restyle every marker of a group in place
    pub fn recolor(&self, doc: &mut Document, highlight_id: &str, color: Option<&str>) -> usize {
        let markers = self.markers(doc, highlight_id);
        for marker in &markers {
            let kind = doc
                .attr(*marker, &self.config.type_attribute)
                .and_then(AnnotationKind::parse)
                .unwrap_or(AnnotationKind::Highlight);
            let restyled = match self.style(kind, color) {
                Some(style) => doc.set_attr(*marker, "style", &style),
                None => doc.remove_attr(*marker, "style").map(|_| ()),
            };
            if let Err(e) = restyled {
                tracing::debug!("Could not restyle marker of {}: {}", highlight_id, e);
            }
        }
        markers.len()
    }

    /// Unwrap every marker of a group. Adjacent text nodes are left unmerged.
    pub fn remove(&self, doc: &mut Document, highlight_id: &str) -> usize {
        let mut removed = 0;
        for marker in self.markers(doc, highlight_id) {
            match doc.unwrap(marker) {
                Ok(()) => removed += 1,
                Err(e) => tracing::debug!("Could not unwrap marker of {}: {}", highlight_id, e),
            }
        }
        removed
    }

    /// Markers of a group, in document order
    pub fn markers(&self, doc: &Document, highlight_id: &str) -> Vec<NodeId> {
        doc.find_by_attr(&self.config.highlight_attribute, highlight_id)
            .into_iter()
            .filter(|n| doc.tag_name(*n) == Some(self.config.tag.as_str()))
            .collect()
    }

    /// Group tags of the markers enclosing any of `runs`, first seen first
    pub fn highlight_ids_in(&self, doc: &Document, runs: &[PlannedSegment]) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for run in runs {
            for ancestor in doc.ancestors(run.node) {
                let Some(id) = doc.attr(ancestor, &self.config.highlight_attribute) else {
                    continue;
                };
                if !ids.iter().any(|known| known == id) {
                    ids.push(id.to_string());
                }
            }
        }
        ids
    }

    fn style(&self, kind: AnnotationKind, color: Option<&str>) -> Option<String> {
        if !self.config.include_inline_styles {
            return None;
        }
        Some(match kind {
            AnnotationKind::Highlight => format!(
                "background-color: {};",
                color.unwrap_or(&self.config.default_highlight_color)
            ),
            AnnotationKind::Underline => format!(
                "text-decoration: underline; text-decoration-color: {};",
                color.unwrap_or("currentColor")
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchoring::segmenter::{plan, segment};
    use crate::dom::{Boundary, DomRange};

    fn spec<'a>(kind: AnnotationKind, color: Option<&'a str>, id: &'a str) -> MarkSpec<'a> {
        MarkSpec {
            kind,
            color,
            highlight_id: id,
            mark_id: id,
        }
    }

    fn cross_element(doc: &mut Document) -> Vec<Segment> {
        let b = doc.find_by_tag("b")[0];
        let quick = doc.children(b)[0];
        let p = doc.find_by_tag("p")[0];
        let tail = doc.children(p)[2];
        segment(doc, &DomRange::new(Boundary::new(quick, 0), Boundary::new(tail, 4))).unwrap()
    }

    #[test]
    fn test_apply_marks_every_run() {
        let mut doc = Document::parse_html("<p>The <b>quick brown</b> fox jumps</p>");
        let writer = MarkWriter::default();
        let segments = cross_element(&mut doc);

        let count = writer.apply(&mut doc, &segments, &spec(AnnotationKind::Highlight, Some("red"), "h1"));

        assert_eq!(count, 2);
        let markers = writer.markers(&doc, "h1");
        assert_eq!(markers.len(), 2);
        assert_eq!(doc.text_content(markers[0]), "quick brown");
        assert_eq!(doc.text_content(markers[1]), " fox");
        assert_eq!(doc.attr(markers[0], "style"), Some("background-color: red;"));
        assert_eq!(doc.attr(markers[0], "class"), Some("mg-mark mg-mark-highlight"));
        assert_eq!(doc.attr(markers[0], "data-mark-id"), Some("h1"));
    }

    #[test]
    fn test_apply_then_remove_restores_text() {
        let mut doc = Document::parse_html("<p>The <b>quick brown</b> fox jumps</p>");
        let body = doc.find_by_tag("body")[0];
        let before = doc.text_content(body);
        let writer = MarkWriter::default();
        let segments = cross_element(&mut doc);

        writer.apply(&mut doc, &segments, &spec(AnnotationKind::Underline, None, "h1"));
        assert_eq!(writer.remove(&mut doc, "h1"), 2);

        assert_eq!(doc.text_content(body), before);
        assert!(writer.markers(&doc, "h1").is_empty());
        assert!(doc.find_by_tag("span").is_empty());
    }

    #[test]
    fn test_recolor_keeps_type() {
        let mut doc = Document::parse_html("<p>The <b>quick brown</b> fox jumps</p>");
        let writer = MarkWriter::default();
        let segments = cross_element(&mut doc);
        writer.apply(&mut doc, &segments, &spec(AnnotationKind::Underline, Some("blue"), "h1"));

        assert_eq!(writer.recolor(&mut doc, "h1", Some("green")), 2);

        for marker in writer.markers(&doc, "h1") {
            assert_eq!(
                doc.attr(marker, "style"),
                Some("text-decoration: underline; text-decoration-color: green;")
            );
        }
    }

    #[test]
    fn test_stale_ids_are_noops() {
        let mut doc = Document::parse_html("<p>text</p>");
        let before = doc.to_html();
        let writer = MarkWriter::default();

        assert_eq!(writer.recolor(&mut doc, "missing", Some("red")), 0);
        assert_eq!(writer.remove(&mut doc, "missing"), 0);
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn test_highlight_ids_in_selection() {
        let mut doc = Document::parse_html("<p>The <b>quick brown</b> fox jumps</p>");
        let writer = MarkWriter::default();
        let segments = cross_element(&mut doc);
        writer.apply(&mut doc, &segments, &spec(AnnotationKind::Highlight, None, "h1"));

        let p = doc.find_by_tag("p")[0];
        let whole = DomRange::new(Boundary::new(p, 0), Boundary::new(p, doc.children(p).len()));
        let runs = plan(&doc, &whole);

        assert_eq!(writer.highlight_ids_in(&doc, &runs), vec!["h1".to_string()]);
    }
}
