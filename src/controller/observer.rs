//! Change notifications

use serde::Serialize;

use super::persist::SaveOutcome;
use crate::annotations::PageIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Added,
    Updated,
    Removed,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Added => "added",
            ChangeAction::Updated => "updated",
            ChangeAction::Removed => "removed",
        }
    }
}

/// Receives every change made through a controller
pub trait AnnotationObserver: Send + Sync {
    /// Called right after the document changed; `total` is the page's record
    /// count afterwards
    fn annotation_changed(&self, page: &PageIdentity, action: ChangeAction, total: usize);

    /// Called from the save worker once a save settles
    fn durability_notice(&self, _page: &PageIdentity, _outcome: &SaveOutcome) {}
}

/// Logs changes through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl AnnotationObserver for TracingObserver {
    fn annotation_changed(&self, page: &PageIdentity, action: ChangeAction, total: usize) {
        tracing::info!(page = %page, action = action.as_str(), total, "Annotation changed");
    }
}
