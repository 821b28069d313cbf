//! NovelStore - SQLite-backed record store for novel projects
//!
//! Holds three kinds of records, each keyed and written as a whole row:
//!
//! ```text
//! projects   (project_id)               -> plan JSON + title/blurb
//! chapters   (project_id, chapter_idx)  -> chapter artifact JSON + text/summary
//! publishes  (project_id, chapter_idx)  -> published page path/url
//! ```
//!
//! Payloads are opaque JSON to the store; the caller owns their shape.
//! Every write is `INSERT OR REPLACE`, so the last writer wins.
//!
//! # Example
//!
//! ```ignore
//! use novelstore::{Store, ProjectRecord};
//!
//! let store = Store::open("data/novels.db")?;
//! store.put_project(&record)?;
//! let plan = store.get_project("my-novel-20250101-000000")?;
//! ```

mod error;
mod records;
mod store;

pub use error::StoreError;
pub use records::{ChapterRecord, ChapterSummaryRow, ProjectRecord, ProjectSummaryRow, PublishRecord};
pub use store::Store;

/// Chapter index reserved for the book's index page in publish records
pub const INDEX_PAGE: u32 = 0;

/// Current UTC time as an RFC 3339 string
pub fn now_utc_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}
