//! Record types stored in the database

use serde::{Deserialize, Serialize};

/// A project row: the generated plan plus the inputs that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: String,
    pub title: String,
    pub blurb: String,
    pub created_at_utc: String,
    /// Full project plan as generated
    pub plan: serde_json::Value,
}

/// Listing view of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummaryRow {
    pub project_id: String,
    pub title: String,
    pub created_at_utc: String,
}

/// A chapter row keyed by (project_id, chapter_idx)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub project_id: String,
    pub chapter_idx: u32,
    pub title: String,
    /// Full chapter artifact
    pub artifact: serde_json::Value,
    /// Denormalized for listing and continuity lookups
    pub chapter_text: String,
    pub chapter_summary: String,
    pub updated_at_utc: String,
}

/// Listing view of a chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummaryRow {
    pub chapter_idx: u32,
    pub title: String,
    pub updated_at_utc: String,
}

/// Where a chapter (or the index page, `chapter_idx == 0`) was published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRecord {
    pub project_id: String,
    pub chapter_idx: u32,
    pub path: String,
    pub url: String,
    pub published_at_utc: String,
}
