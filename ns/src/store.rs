//! Core Store implementation

use std::fs;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::records::{ChapterRecord, ChapterSummaryRow, ProjectRecord, ProjectSummaryRow, PublishRecord};

const SCHEMA: &str = r#"
PRAGMA journal_mode=WAL;

CREATE TABLE IF NOT EXISTS projects (
  project_id TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  blurb TEXT NOT NULL,
  created_at_utc TEXT NOT NULL,
  project_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chapters (
  project_id TEXT NOT NULL,
  chapter_idx INTEGER NOT NULL,
  chapter_title TEXT NOT NULL,
  chapter_json TEXT NOT NULL,
  chapter_text TEXT NOT NULL,
  chapter_summary TEXT NOT NULL,
  updated_at_utc TEXT NOT NULL,
  PRIMARY KEY (project_id, chapter_idx)
);

CREATE TABLE IF NOT EXISTS publishes (
  project_id TEXT NOT NULL,
  chapter_idx INTEGER NOT NULL,
  path TEXT NOT NULL,
  url TEXT NOT NULL,
  published_at_utc TEXT NOT NULL,
  PRIMARY KEY (project_id, chapter_idx)
);
"#;

/// SQLite-backed store for projects, chapters and publish records
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given database path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        debug!(?path, "Store::open: called");
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        info!(?path, "Opened novel store");
        Ok(store)
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("Store::open_in_memory: called");
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // Projects

    /// Insert or replace a project row
    pub fn put_project(&self, record: &ProjectRecord) -> Result<(), StoreError> {
        debug!(project_id = %record.project_id, "Store::put_project: called");
        self.conn.execute(
            "INSERT OR REPLACE INTO projects(project_id, title, blurb, created_at_utc, project_json) \
             VALUES(?1, ?2, ?3, ?4, ?5)",
            params![
                record.project_id,
                record.title,
                record.blurb,
                record.created_at_utc,
                serde_json::to_string(&record.plan)?,
            ],
        )?;
        Ok(())
    }

    /// Fetch a project row, `None` when absent
    pub fn get_project(&self, project_id: &str) -> Result<Option<ProjectRecord>, StoreError> {
        debug!(%project_id, "Store::get_project: called");
        let row = self
            .conn
            .query_row(
                "SELECT project_id, title, blurb, created_at_utc, project_json FROM projects WHERE project_id = ?1",
                params![project_id],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((project_id, title, blurb, created_at_utc, json)) => Ok(Some(ProjectRecord {
                project_id,
                title,
                blurb,
                created_at_utc,
                plan: serde_json::from_str(&json)?,
            })),
            None => {
                debug!(%project_id, "Store::get_project: not found");
                Ok(None)
            }
        }
    }

    /// List projects, newest first
    pub fn list_projects(&self) -> Result<Vec<ProjectSummaryRow>, StoreError> {
        debug!("Store::list_projects: called");
        let mut stmt = self
            .conn
            .prepare("SELECT project_id, title, created_at_utc FROM projects ORDER BY created_at_utc DESC")?;
        let rows = stmt.query_map([], |r| {
            Ok(ProjectSummaryRow {
                project_id: r.get(0)?,
                title: r.get(1)?,
                created_at_utc: r.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // Chapters

    /// Insert or replace a chapter row
    pub fn put_chapter(&self, record: &ChapterRecord) -> Result<(), StoreError> {
        debug!(project_id = %record.project_id, chapter_idx = record.chapter_idx, "Store::put_chapter: called");
        self.conn.execute(
            "INSERT OR REPLACE INTO chapters(\
               project_id, chapter_idx, chapter_title, chapter_json, chapter_text, chapter_summary, updated_at_utc\
             ) VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.project_id,
                record.chapter_idx,
                record.title,
                serde_json::to_string(&record.artifact)?,
                record.chapter_text,
                record.chapter_summary,
                record.updated_at_utc,
            ],
        )?;
        Ok(())
    }

    /// Fetch a chapter row, `None` when absent
    pub fn get_chapter(&self, project_id: &str, chapter_idx: u32) -> Result<Option<ChapterRecord>, StoreError> {
        debug!(%project_id, chapter_idx, "Store::get_chapter: called");
        let row = self
            .conn
            .query_row(
                "SELECT chapter_title, chapter_json, chapter_text, chapter_summary, updated_at_utc \
                 FROM chapters WHERE project_id = ?1 AND chapter_idx = ?2",
                params![project_id, chapter_idx],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((title, json, chapter_text, chapter_summary, updated_at_utc)) = row else {
            debug!(%project_id, chapter_idx, "Store::get_chapter: not found");
            return Ok(None);
        };

        Ok(Some(ChapterRecord {
            project_id: project_id.to_string(),
            chapter_idx,
            title,
            artifact: serde_json::from_str(&json)?,
            chapter_text,
            chapter_summary,
            updated_at_utc,
        }))
    }

    /// List chapters of a project in ascending order
    pub fn list_chapters(&self, project_id: &str) -> Result<Vec<ChapterSummaryRow>, StoreError> {
        debug!(%project_id, "Store::list_chapters: called");
        let mut stmt = self.conn.prepare(
            "SELECT chapter_idx, chapter_title, updated_at_utc FROM chapters \
             WHERE project_id = ?1 ORDER BY chapter_idx ASC",
        )?;
        let rows = stmt.query_map(params![project_id], |r| {
            Ok(ChapterSummaryRow {
                chapter_idx: r.get(0)?,
                title: r.get(1)?,
                updated_at_utc: r.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // Publishes

    /// Insert or replace a publish record
    pub fn put_publish(&self, record: &PublishRecord) -> Result<(), StoreError> {
        debug!(project_id = %record.project_id, chapter_idx = record.chapter_idx, "Store::put_publish: called");
        self.conn.execute(
            "INSERT OR REPLACE INTO publishes(project_id, chapter_idx, path, url, published_at_utc) \
             VALUES(?1, ?2, ?3, ?4, ?5)",
            params![
                record.project_id,
                record.chapter_idx,
                record.path,
                record.url,
                record.published_at_utc,
            ],
        )?;
        Ok(())
    }

    /// Fetch a publish record, `None` when never published
    pub fn get_publish(&self, project_id: &str, chapter_idx: u32) -> Result<Option<PublishRecord>, StoreError> {
        debug!(%project_id, chapter_idx, "Store::get_publish: called");
        let record = self
            .conn
            .query_row(
                "SELECT path, url, published_at_utc FROM publishes WHERE project_id = ?1 AND chapter_idx = ?2",
                params![project_id, chapter_idx],
                |r| {
                    Ok(PublishRecord {
                        project_id: project_id.to_string(),
                        chapter_idx,
                        path: r.get(0)?,
                        url: r.get(1)?,
                        published_at_utc: r.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// List publish records of a project in ascending chapter order
    pub fn list_publishes(&self, project_id: &str) -> Result<Vec<PublishRecord>, StoreError> {
        debug!(%project_id, "Store::list_publishes: called");
        let mut stmt = self.conn.prepare(
            "SELECT chapter_idx, path, url, published_at_utc FROM publishes \
             WHERE project_id = ?1 ORDER BY chapter_idx ASC",
        )?;
        let rows = stmt.query_map(params![project_id], |r| {
            Ok(PublishRecord {
                project_id: project_id.to_string(),
                chapter_idx: r.get(0)?,
                path: r.get(1)?,
                url: r.get(2)?,
                published_at_utc: r.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
