//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine (HTML escaping disabled)
    hbs: Handlebars<'static>,
    /// User override directory (`storage.prompts-dir`)
    user_dir: Option<PathBuf>,
}

fn engine() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    // Prompts carry raw JSON and prose; HTML entities would corrupt both
    hbs.register_escape_fn(handlebars::no_escape);
    hbs
}

impl PromptLoader {
    /// Create a loader that checks `user_dir` before the embedded templates
    pub fn new(user_dir: Option<impl AsRef<Path>>) -> Self {
        let user_dir = user_dir.map(|d| d.as_ref().to_path_buf());
        debug!(?user_dir, "PromptLoader::new: called");

        let user_dir = match user_dir {
            Some(dir) if dir.is_dir() => {
                debug!("PromptLoader::new: user override directory found");
                Some(dir)
            }
            Some(dir) => {
                debug!(?dir, "PromptLoader::new: override directory missing, ignoring");
                None
            }
            None => None,
        };

        Self { hbs: engine(), user_dir }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: engine(),
            user_dir: None,
        }
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `{prompts-dir}/{name}.pmt`
    /// 2. Embedded fallback
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<C: Serialize>(&self, template_name: &str, context: &C) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_render_does_not_escape() {
        let loader = PromptLoader::embedded_only();
        let out = loader
            .render("summary-user", &json!({"chapter_text": "\"Run,\" she said. <door> & key"}))
            .unwrap();
        assert!(out.contains("\"Run,\" she said. <door> & key"));
        assert!(!out.contains("&quot;"));
    }

    #[test]
    fn test_render_empty_tail_placeholder() {
        let loader = PromptLoader::embedded_only();
        let out = loader
            .render(
                "scene-write-user",
                &json!({"project": "{}", "chapter": "{}", "scene": "{}", "prev_tail": ""}),
            )
            .unwrap();
        assert!(out.contains("[continuity_tail_for_reference_only]\n(none)"));
    }

    #[test]
    fn test_user_override_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("summary-user.pmt"), "CUSTOM {{chapter_text}}").unwrap();

        let loader = PromptLoader::new(Some(dir.path()));
        let out = loader.render("summary-user", &json!({"chapter_text": "abc"})).unwrap();
        assert_eq!(out, "CUSTOM abc");

        // Templates without an override still come from the embedded set
        assert!(loader.load_template("summary-system").unwrap().contains("chapter_summary"));
    }

    #[test]
    fn test_missing_override_dir_is_ignored() {
        let loader = PromptLoader::new(Some("/nonexistent/prompts"));
        assert!(loader.load_template("architect-user").is_ok());
    }

    #[test]
    fn test_prompt_loader_unknown_template() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("nonexistent-template").is_err());
    }
}
