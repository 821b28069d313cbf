//! Pipeline-facing persistence
//!
//! The pipeline reads the plan and the previous chapter, and the CLI writes
//! plans and finished chapters. `novelstore::Store` backs the real binary;
//! `MemoryStore` backs tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use novelstore::{ChapterRecord, ProjectRecord, Store, StoreError, now_utc_iso};
use serde_json::Value;
use tracing::debug;

use crate::domain::{ChapterArtifact, ProjectPlan};

/// Read/write access to plans and chapter artifacts
pub trait Persistence {
    fn get_plan(&self, project_id: &str) -> Result<Option<ProjectPlan>, StoreError>;

    /// Store the plan object as the model produced it; reads go through the
    /// typed view
    fn put_plan(&self, project_id: &str, title: &str, blurb: &str, document: &Value) -> Result<(), StoreError>;

    fn get_chapter(&self, project_id: &str, chapter_idx: u32) -> Result<Option<ChapterArtifact>, StoreError>;

    /// Whole-record replace keyed by (project, chapter)
    fn put_chapter(&self, project_id: &str, artifact: &ChapterArtifact) -> Result<(), StoreError>;
}

impl Persistence for Store {
    fn get_plan(&self, project_id: &str) -> Result<Option<ProjectPlan>, StoreError> {
        debug!(%project_id, "Store::get_plan: called");
        match self.get_project(project_id)? {
            Some(record) => Ok(Some(serde_json::from_value(record.plan)?)),
            None => Ok(None),
        }
    }

    fn put_plan(&self, project_id: &str, title: &str, blurb: &str, document: &Value) -> Result<(), StoreError> {
        debug!(%project_id, "Store::put_plan: called");
        self.put_project(&ProjectRecord {
            project_id: project_id.to_string(),
            title: title.to_string(),
            blurb: blurb.to_string(),
            created_at_utc: now_utc_iso(),
            plan: document.clone(),
        })
    }

    fn get_chapter(&self, project_id: &str, chapter_idx: u32) -> Result<Option<ChapterArtifact>, StoreError> {
        debug!(%project_id, %chapter_idx, "Store::get_chapter: called");
        match Store::get_chapter(self, project_id, chapter_idx)? {
            Some(record) => Ok(Some(serde_json::from_value(record.artifact)?)),
            None => Ok(None),
        }
    }

    fn put_chapter(&self, project_id: &str, artifact: &ChapterArtifact) -> Result<(), StoreError> {
        debug!(%project_id, chapter = %artifact.chapter, "Store::put_chapter: called");
        Store::put_chapter(
            self,
            &ChapterRecord {
                project_id: project_id.to_string(),
                chapter_idx: artifact.chapter,
                title: artifact.title.clone(),
                artifact: serde_json::to_value(artifact)?,
                chapter_text: artifact.chapter_text.clone(),
                chapter_summary: artifact.chapter_summary.clone(),
                updated_at_utc: now_utc_iso(),
            },
        )
    }
}

/// In-memory persistence for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    plans: Mutex<BTreeMap<String, Value>>,
    chapters: Mutex<BTreeMap<(String, u32), ChapterArtifact>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chapter_count(&self, project_id: &str) -> usize {
        self.chapters
            .lock()
            .map(|c| c.keys().filter(|(p, _)| p == project_id).count())
            .unwrap_or(0)
    }
}

impl Persistence for MemoryStore {
    fn get_plan(&self, project_id: &str) -> Result<Option<ProjectPlan>, StoreError> {
        let document = self.plans.lock().ok().and_then(|p| p.get(project_id).cloned());
        Ok(document.map(serde_json::from_value::<ProjectPlan>).transpose()?)
    }

    fn put_plan(&self, project_id: &str, _title: &str, _blurb: &str, document: &Value) -> Result<(), StoreError> {
        if let Ok(mut plans) = self.plans.lock() {
            plans.insert(project_id.to_string(), document.clone());
        }
        Ok(())
    }

    fn get_chapter(&self, project_id: &str, chapter_idx: u32) -> Result<Option<ChapterArtifact>, StoreError> {
        Ok(self
            .chapters
            .lock()
            .ok()
            .and_then(|c| c.get(&(project_id.to_string(), chapter_idx)).cloned()))
    }

    fn put_chapter(&self, project_id: &str, artifact: &ChapterArtifact) -> Result<(), StoreError> {
        if let Ok(mut chapters) = self.chapters.lock() {
            chapters.insert((project_id.to_string(), artifact.chapter), artifact.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact(chapter: u32) -> ChapterArtifact {
        ChapterArtifact {
            chapter,
            title: format!("Chapter {}", chapter),
            chapter_text: "One.\n\nTwo.\n".to_string(),
            chapter_summary: "A summary.".to_string(),
            continuity_notes: vec!["note".to_string()],
            ..Default::default()
        }
    }

    fn plan() -> Value {
        json!({
            "topic": {"title": "Signal"},
            "characters": [{"id": "ana", "name": "Ana", "age": 34, "pov": ["close", "third"]}],
            "story_bible": {"timeline": [{"year": 2015}]},
            "target_length": {"chapters": 8}
        })
    }

    #[test]
    fn test_sqlite_plan_roundtrip_keeps_unknown_fields() {
        let store = Store::open_in_memory().unwrap();
        store.put_plan("p1", "Signal", "blurb", &plan()).unwrap();

        let loaded = Persistence::get_plan(&store, "p1").unwrap().unwrap();
        assert_eq!(loaded.topic.title, "Signal");
        assert_eq!(loaded.characters[0].name, "Ana");
        assert_eq!(loaded.extra.get("target_length"), Some(&json!({"chapters": 8})));
        assert!(Persistence::get_plan(&store, "missing").unwrap().is_none());

        let record = store.get_project("p1").unwrap().unwrap();
        assert_eq!(record.title, "Signal");
        assert_eq!(record.blurb, "blurb");
        assert_eq!(record.plan, plan());
        assert_eq!(record.plan["characters"][0]["age"], 34);
    }

    #[test]
    fn test_chapter_keeps_scene_plan_object() {
        let store = Store::open_in_memory().unwrap();
        let mut chapter = artifact(3);
        chapter.scene_plan = json!({"chapter": "第3章", "scenes": [{"pov": ["Ana", "Ben"], "weather": "rain"}]});
        Persistence::put_chapter(&store, "p1", &chapter).unwrap();

        let loaded = Persistence::get_chapter(&store, "p1", 3).unwrap().unwrap();
        assert_eq!(loaded.scene_plan, chapter.scene_plan);
    }

    #[test]
    fn test_sqlite_chapter_replace() {
        let store = Store::open_in_memory().unwrap();
        Persistence::put_chapter(&store, "p1", &artifact(2)).unwrap();

        let mut updated = artifact(2);
        updated.chapter_summary = "Rewritten.".to_string();
        Persistence::put_chapter(&store, "p1", &updated).unwrap();

        let loaded = Persistence::get_chapter(&store, "p1", 2).unwrap().unwrap();
        assert_eq!(loaded, updated);
        assert_eq!(store.list_chapters("p1").unwrap().len(), 1);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.put_chapter("p1", &artifact(1)).unwrap();
        store.put_chapter("p2", &artifact(1)).unwrap();

        assert_eq!(store.get_chapter("p1", 1).unwrap(), Some(artifact(1)));
        assert!(store.get_chapter("p1", 2).unwrap().is_none());
        assert_eq!(store.chapter_count("p1"), 1);

        store.put_plan("p1", "t", "b", &plan()).unwrap();
        let loaded = store.get_plan("p1").unwrap().unwrap();
        assert_eq!(loaded.story_bible.timeline, vec![r#"{"year":2015}"#]);
        assert!(store.get_plan("p2").unwrap().is_none());
    }
}
