//! Continuity between chapters
//!
//! A chapter only inherits two things from its predecessor: the summary and
//! the last paragraph of prose.

use novelstore::StoreError;
use tracing::debug;

use super::text::last_paragraph;
use crate::domain::ContinuityContext;
use crate::storage::Persistence;

/// Trailing characters of the previous chapter searched for its last paragraph
pub const DEFAULT_PREV_PARAGRAPH_WINDOW: usize = 1500;

/// Continuity for `chapter_idx`, using the default paragraph window
pub fn resolve(
    store: &dyn Persistence,
    project_id: &str,
    chapter_idx: u32,
) -> Result<ContinuityContext, StoreError> {
    resolve_with_window(store, project_id, chapter_idx, DEFAULT_PREV_PARAGRAPH_WINDOW)
}

/// Continuity for `chapter_idx`
///
/// Chapter 1 (and anything below it) has no predecessor. A missing previous
/// chapter also yields empty continuity; that is not an error.
pub fn resolve_with_window(
    store: &dyn Persistence,
    project_id: &str,
    chapter_idx: u32,
    window: usize,
) -> Result<ContinuityContext, StoreError> {
    debug!(%project_id, %chapter_idx, %window, "resolve_with_window: called");
    if chapter_idx <= 1 {
        return Ok(ContinuityContext::empty());
    }

    let Some(prev) = store.get_chapter(project_id, chapter_idx - 1)? else {
        debug!(prev = chapter_idx - 1, "resolve_with_window: previous chapter not stored");
        return Ok(ContinuityContext::empty());
    };

    Ok(ContinuityContext {
        prev_summary: prev.chapter_summary.trim().to_string(),
        prev_last_paragraph: last_paragraph(&prev.chapter_text, window),
    })
}
