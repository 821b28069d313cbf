//! Project identifiers and the per-project manifest

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

const MAX_SLUG_CHARS: usize = 40;

/// Lowercase ascii slug; runs of anything else collapse to one `-`
pub fn slugify(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    let slug = NON_SLUG.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug.to_string()
    }
}

/// `{slug}-{YYYYmmdd-HHMMSS}` using the given UTC time
pub fn project_id_at(title: &str, at: DateTime<Utc>) -> String {
    let slug: String = slugify(title).chars().take(MAX_SLUG_CHARS).collect();
    format!("{}-{}", slug, at.format("%Y%m%d-%H%M%S"))
}

/// A fresh project id for `title`, stamped with the current UTC time
pub fn project_id_from_title(title: &str) -> String {
    project_id_at(title, Utc::now())
}

/// Small convenience file written next to a project's artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub project_id: String,
    pub title: String,
}

/// Write `{outputs_dir}/{project_id}/manifest.json`
pub fn write_manifest(outputs_dir: &Path, manifest: &Manifest) -> io::Result<PathBuf> {
    let dir = outputs_dir.join(&manifest.project_id);
    fs::create_dir_all(&dir)?;
    let path = dir.join("manifest.json");
    let json = serde_json::to_string_pretty(manifest).map_err(io::Error::other)?;
    fs::write(&path, json + "\n")?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  The Pager That Answers!  "), "the-pager-that-answers");
        assert_eq!(slugify("a -- b__c"), "a-b-c");
        assert_eq!(slugify("信号"), "project");
        assert_eq!(slugify(""), "project");
    }

    #[test]
    fn test_project_id_at() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(project_id_at("Signal", at), "signal-20250102-030405");

        let long = "word ".repeat(20);
        let id = project_id_at(&long, at);
        assert_eq!(id.len(), MAX_SLUG_CHARS + "-20250102-030405".len());
    }

    #[test]
    fn test_write_manifest() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest {
            project_id: "signal-1".to_string(),
            title: "Signal".to_string(),
        };

        let path = write_manifest(dir.path(), &manifest).unwrap();
        assert_eq!(path, dir.path().join("signal-1/manifest.json"));
        let read: Manifest = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(read, manifest);
    }
}
