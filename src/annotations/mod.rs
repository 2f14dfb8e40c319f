//! Annotation records
//!
//! - `AnchoredRecord`: current format, relocated by anchor text and context
//! - `LegacyRecord`: pre-migration format, replayed by child-index paths
//! - `SiteRecord`: everything stored about one page, keyed by `PageIdentity`
//!
//! Notes are a `markId -> text` overlay on the site record, independent of
//! the color and type of the mark they belong to.

mod identity;
mod types;

pub use identity::{strip_fragment, IdentityError, PageIdentity};
pub use types::{
    new_id, AnchoredRecord, AnnotationKind, AnnotationRecord, LegacyRecord, PageInfo, RecordError,
    SegmentDescriptor, SiteRecord,
};
