//! Debug and artifact sink
//!
//! Every raw model response that fails validation, and every intermediate
//! product, is written here for inspection. The pipeline never reads it back.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to write artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize artifact {name}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Named text and JSON artifacts, scoped to one project or one chapter
pub trait ArtifactSink: Send + Sync {
    fn write_text(&self, name: &str, content: &str) -> Result<(), ArtifactError>;

    /// Pretty-printed JSON with a trailing newline
    fn write_json(&self, name: &str, value: &Value) -> Result<(), ArtifactError> {
        let mut text = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Json {
            name: name.to_string(),
            source,
        })?;
        text.push('\n');
        self.write_text(name, &text)
    }
}

/// Writes artifacts as files under one directory
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    dir: PathBuf,
}

impl FsArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `{outputs}/{project}/`
    pub fn for_project(outputs_dir: &Path, project_id: &str) -> Self {
        Self::new(outputs_dir.join(project_id))
    }

    /// `{outputs}/{project}/chapters/{NNN}/`
    pub fn for_chapter(outputs_dir: &Path, project_id: &str, chapter_idx: u32) -> Self {
        Self::new(
            outputs_dir
                .join(project_id)
                .join("chapters")
                .join(format!("{:03}", chapter_idx)),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for FsArtifactSink {
    fn write_text(&self, name: &str, content: &str) -> Result<(), ArtifactError> {
        let path = self.dir.join(name);
        debug!(?path, bytes = content.len(), "FsArtifactSink::write_text: called");
        let io_err = |source| ArtifactError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&path, content).map_err(io_err)
    }
}

/// Keeps artifacts in memory; later writes to a name replace earlier ones
#[derive(Debug, Default)]
pub struct MemoryArtifactSink {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemoryArtifactSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.files.lock().ok().and_then(|f| f.get(name).cloned())
    }

    pub fn names(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ArtifactSink for MemoryArtifactSink {
    fn write_text(&self, name: &str, content: &str) -> Result<(), ArtifactError> {
        debug!(%name, "MemoryArtifactSink::write_text: called");
        if let Ok(mut files) = self.files.lock() {
            files.insert(name.to_string(), content.to_string());
        }
        Ok(())
    }
}
