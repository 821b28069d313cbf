//! Publishing chapters and the book index to Telegraph
//!
//! A chapter or index page is created on first publish. After that the stored
//! page path is edited in place, so the public URL never changes. Every
//! successful publish replaces the `PublishRecord` for that slot.

mod markdown;
mod telegraph;

use novelstore::{INDEX_PAGE, PublishRecord, Store, StoreError, now_utc_iso};
use thiserror::Error;
use tracing::{debug, info};

use crate::storage::Persistence;

pub use markdown::{ChapterLink, Node, index_nodes, md_to_nodes};
pub use telegraph::{API_BASE, Account, Page, PageApi, PageContent, TelegraphClient, create_account};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Telegraph HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Telegraph API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Telegraph access token not found. Set the {0} environment variable or run telegraph-init.")]
    MissingToken(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Chapter {chapter} of {project_id} not found. Run write-chapter first.")]
    ChapterNotFound { project_id: String, chapter: u32 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Byline attached to every published page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Title shown for a chapter page; falls back to "Chapter N"
pub fn chapter_page_title(title: &str, chapter: u32) -> String {
    let title = title.trim();
    if title.is_empty() {
        format!("Chapter {}", chapter)
    } else {
        title.to_string()
    }
}

/// Entry text for the index list: "Chapter N: title", or "Chapter N"
pub fn index_entry_title(chapter: u32, title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        format!("Chapter {}", chapter)
    } else {
        format!("Chapter {}: {}", chapter, title)
    }
}

/// Create or edit the page for one slot and record where it lives
async fn upsert_page(
    store: &Store,
    api: &dyn PageApi,
    project_id: &str,
    chapter_idx: u32,
    content: &PageContent<'_>,
) -> Result<PublishRecord, PublishError> {
    let page = match store.get_publish(project_id, chapter_idx)? {
        Some(existing) => {
            debug!(%project_id, %chapter_idx, path = %existing.path, "upsert_page: editing");
            api.edit_page(&existing.path, content).await?
        }
        None => {
            debug!(%project_id, %chapter_idx, "upsert_page: creating");
            api.create_page(content).await?
        }
    };

    let record = PublishRecord {
        project_id: project_id.to_string(),
        chapter_idx,
        path: page.path,
        url: page.url,
        published_at_utc: now_utc_iso(),
    };
    store.put_publish(&record)?;
    Ok(record)
}

/// Publish a stored chapter
pub async fn publish_chapter(
    store: &Store,
    api: &dyn PageApi,
    project_id: &str,
    chapter: u32,
    author: &Author,
) -> Result<PublishRecord, PublishError> {
    debug!(%project_id, %chapter, "publish_chapter: called");
    let record = store
        .get_chapter(project_id, chapter)?
        .ok_or_else(|| PublishError::ChapterNotFound {
            project_id: project_id.to_string(),
            chapter,
        })?;

    let title = chapter_page_title(&record.title, chapter);
    let nodes = md_to_nodes(&record.chapter_text);
    let content = PageContent {
        title: &title,
        nodes: &nodes,
        author_name: author.name.as_deref(),
        author_url: author.url.as_deref(),
    };

    let published = upsert_page(store, api, project_id, chapter, &content).await?;
    info!(%project_id, %chapter, url = %published.url, "publish_chapter: published");
    Ok(published)
}

/// Publish the book index, linking every outline chapter that has a page
pub async fn publish_index(
    store: &Store,
    api: &dyn PageApi,
    project_id: &str,
    author: &Author,
) -> Result<PublishRecord, PublishError> {
    debug!(%project_id, "publish_index: called");
    let plan = store
        .get_plan(project_id)?
        .ok_or_else(|| PublishError::ProjectNotFound(project_id.to_string()))?;

    let publishes = store.list_publishes(project_id)?;
    let links: Vec<ChapterLink> = plan
        .outline
        .iter()
        .map(|meta| ChapterLink {
            title: index_entry_title(meta.chapter, &meta.title),
            url: publishes
                .iter()
                .find(|p| p.chapter_idx == meta.chapter && p.chapter_idx != INDEX_PAGE)
                .map(|p| p.url.clone()),
        })
        .collect();

    let book_title = match plan.topic.title.trim() {
        "" => project_id.to_string(),
        title => title.to_string(),
    };
    let nodes = index_nodes(&book_title, plan.intro(), &links);
    let content = PageContent {
        title: &book_title,
        nodes: &nodes,
        author_name: author.name.as_deref(),
        author_url: author.url.as_deref(),
    };

    let published = upsert_page(store, api, project_id, INDEX_PAGE, &content).await?;
    info!(%project_id, url = %published.url, linked = links.iter().filter(|l| l.url.is_some()).count(), "publish_index: published");
    Ok(published)
}
