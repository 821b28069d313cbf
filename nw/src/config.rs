//! novelwriter configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::AttemptSpec;

/// Main novelwriter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model gateway configuration
    pub llm: LlmConfig,

    /// Which model plays which role
    pub models: ModelsConfig,

    /// Sampling schedules and text limits for each stage
    pub generation: GenerationConfig,

    /// Caps applied when condensing the project plan into prompts
    pub condense: CondenseConfig,

    /// Database, outputs and prompt override locations
    pub storage: StorageConfig,

    /// Telegraph publishing
    pub publish: PublishConfig,

    /// Log level used when `--log-level` is not given
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the API key is reachable. Call this before any command that
    /// talks to the model gateway.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key().is_none() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(eyre::eyre!("LLM base URL is empty. Set llm.base-url or OPENAI_BASE_URL."));
        }
        Ok(())
    }

    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .novelwriter.yml
        let local_config = PathBuf::from(".novelwriter.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/novelwriter/novelwriter.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("novelwriter").join("novelwriter.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Environment variables win over file values
    pub fn apply_env_overrides(&mut self) {
        if let Some(base_url) = env_nonempty("OPENAI_BASE_URL").or_else(|| env_nonempty("EMBEDDINGS_BASE_URL")) {
            self.llm.base_url = base_url;
        }
        if let Some(model) = env_nonempty("NOVEL_OUTLINE_MODEL") {
            self.models.outline = model;
        }
        if let Some(model) = env_nonempty("NOVEL_WRITER_MODEL") {
            self.models.writer = model;
        }
        if let Some(path) = env_nonempty("NOVEL_DB_PATH") {
            self.storage.db_path = PathBuf::from(path);
        }
        if let Some(path) = env_nonempty("NOVEL_OUTPUTS_DIR") {
            self.storage.outputs_dir = PathBuf::from(path);
        }
        if let Some(name) = env_nonempty("TELEGRAPH_AUTHOR_NAME") {
            self.publish.author_name = Some(name);
        }
        if let Some(url) = env_nonempty("TELEGRAPH_AUTHOR_URL") {
            self.publish.author_url = Some(url);
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Which request parameter carries the output token budget
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenParam {
    #[default]
    MaxCompletionTokens,
    MaxTokens,
}

impl TokenParam {
    /// Field name in the request body
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenParam::MaxCompletionTokens => "max_completion_tokens",
            TokenParam::MaxTokens => "max_tokens",
        }
    }
}

/// Model gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL (without the `/v1/chat/completions` suffix)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    #[serde(rename = "token-param")]
    pub token_param: TokenParam,
}

impl LlmConfig {
    /// The API key from `api-key-env`, else `EMBEDDINGS_API_KEY`
    pub fn api_key(&self) -> Option<String> {
        env_nonempty(&self.api_key_env).or_else(|| env_nonempty("EMBEDDINGS_API_KEY"))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_ms: 120_000,
            token_param: TokenParam::default(),
        }
    }
}

/// Model roles: the outline model plans, the writer model drafts prose
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub outline: String,
    pub writer: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            outline: "gemini-3-pro-preview".to_string(),
            writer: "gemini-3-flash-preview".to_string(),
        }
    }
}

/// Project plan request parameters (a single attempt)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanCallConfig {
    pub temperature: f32,

    /// Omitted from the request when unset
    #[serde(rename = "max-tokens")]
    pub max_tokens: Option<u32>,
}

impl Default for PlanCallConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: None,
        }
    }
}

/// Sampling schedules and text limits for the chapter pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub plan: PlanCallConfig,

    #[serde(rename = "scene-plan-attempts")]
    pub scene_plan_attempts: Vec<AttemptSpec>,

    #[serde(rename = "scene-draft")]
    pub scene_draft: AttemptSpec,

    /// Attempts per model tier
    #[serde(rename = "summary-attempts")]
    pub summary_attempts: Vec<AttemptSpec>,

    /// Paragraphs kept from each drafted scene
    #[serde(rename = "paragraphs-per-scene")]
    pub paragraphs_per_scene: usize,

    /// Characters of the previous scene handed to the next one
    #[serde(rename = "continuity-tail-chars")]
    pub continuity_tail_chars: usize,

    /// Trailing characters of the previous chapter searched for its last paragraph
    #[serde(rename = "prev-paragraph-window")]
    pub prev_paragraph_window: usize,

    /// Prose language named in the prompts
    pub language: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            plan: PlanCallConfig::default(),
            scene_plan_attempts: vec![AttemptSpec::new(0.2, 3500), AttemptSpec::new(0.2, 4200)],
            scene_draft: AttemptSpec::new(0.6, 5000),
            summary_attempts: vec![AttemptSpec::new(0.2, 900), AttemptSpec::new(0.2, 1200)],
            paragraphs_per_scene: 2,
            continuity_tail_chars: 220,
            prev_paragraph_window: 1500,
            language: "English".to_string(),
        }
    }
}

/// List caps used by the condensed project context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CondenseConfig {
    pub contrasts: usize,
    pub mysteries: usize,
    #[serde(rename = "key-objects")]
    pub key_objects: usize,
    /// Per character
    pub secrets: usize,
    pub workflow: usize,
    /// Every other world-context list
    #[serde(rename = "world-lists")]
    pub world_lists: usize,
}

impl Default for CondenseConfig {
    fn default() -> Self {
        Self {
            contrasts: 15,
            mysteries: 6,
            key_objects: 8,
            secrets: 4,
            workflow: 5,
            world_lists: 6,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    #[serde(rename = "db-path")]
    pub db_path: PathBuf,

    /// Root of the per-project debug artifacts
    #[serde(rename = "outputs-dir")]
    pub outputs_dir: PathBuf,

    /// Directory searched for `{name}.pmt` prompt overrides
    #[serde(rename = "prompts-dir")]
    pub prompts_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/novels.db"),
            outputs_dir: PathBuf::from("./outputs"),
            prompts_dir: None,
        }
    }
}

/// Telegraph publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Environment variable containing the Telegraph access token
    #[serde(rename = "token-env")]
    pub token_env: String,

    #[serde(rename = "author-name")]
    pub author_name: Option<String>,

    #[serde(rename = "author-url")]
    pub author_url: Option<String>,

    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl PublishConfig {
    pub fn access_token(&self) -> Option<String> {
        env_nonempty(&self.token_env)
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            token_env: "TELEGRAPH_ACCESS_TOKEN".to_string(),
            author_name: None,
            author_url: None,
            timeout_ms: 60_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const OVERRIDE_VARS: [&str; 8] = [
        "OPENAI_BASE_URL",
        "EMBEDDINGS_BASE_URL",
        "NOVEL_OUTLINE_MODEL",
        "NOVEL_WRITER_MODEL",
        "NOVEL_DB_PATH",
        "NOVEL_OUTPUTS_DIR",
        "TELEGRAPH_AUTHOR_NAME",
        "TELEGRAPH_AUTHOR_URL",
    ];

    fn clear_overrides() {
        for var in OVERRIDE_VARS {
            // SAFETY: tests touching the environment are serialized
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.models.outline, "gemini-3-pro-preview");
        assert_eq!(config.models.writer, "gemini-3-flash-preview");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.llm.token_param, TokenParam::MaxCompletionTokens);
        assert_eq!(
            config.generation.scene_plan_attempts,
            vec![AttemptSpec::new(0.2, 3500), AttemptSpec::new(0.2, 4200)]
        );
        assert_eq!(config.generation.scene_draft, AttemptSpec::new(0.6, 5000));
        assert_eq!(config.generation.continuity_tail_chars, 220);
        assert_eq!(config.generation.prev_paragraph_window, 1500);
        assert_eq!(config.condense.contrasts, 15);
        assert_eq!(config.storage.db_path, PathBuf::from("./data/novels.db"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
llm:
  base-url: https://gateway.example
  token-param: max-tokens
models:
  writer: fast-writer
generation:
  summary-attempts:
    - temperature: 0.1
      max-tokens: 600
  continuity-tail-chars: 300
log-level: debug
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm.base_url, "https://gateway.example");
        assert_eq!(config.llm.token_param, TokenParam::MaxTokens);
        assert_eq!(config.llm.timeout_ms, 120_000);
        assert_eq!(config.models.writer, "fast-writer");
        assert_eq!(config.models.outline, "gemini-3-pro-preview");
        assert_eq!(config.generation.summary_attempts, vec![AttemptSpec::new(0.1, 600)]);
        assert_eq!(config.generation.continuity_tail_chars, 300);
        assert_eq!(config.generation.paragraphs_per_scene, 2);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    #[serial]
    fn test_load_explicit_path() {
        clear_overrides();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("novelwriter.yml");
        fs::write(&path, "models:\n  outline: planner-x\nstorage:\n  outputs-dir: /tmp/out\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.models.outline, "planner-x");
        assert_eq!(config.storage.outputs_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let missing = PathBuf::from("/nonexistent/novelwriter.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides_win() {
        clear_overrides();
        // SAFETY: serialized with the other env tests
        unsafe {
            std::env::set_var("EMBEDDINGS_BASE_URL", "https://fallback.example");
            std::env::set_var("NOVEL_WRITER_MODEL", "env-writer");
            std::env::set_var("NOVEL_DB_PATH", "/tmp/env.db");
            std::env::set_var("TELEGRAPH_AUTHOR_NAME", " Ana ");
        }

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.llm.base_url, "https://fallback.example");
        assert_eq!(config.models.writer, "env-writer");
        assert_eq!(config.models.outline, "gemini-3-pro-preview");
        assert_eq!(config.storage.db_path, PathBuf::from("/tmp/env.db"));
        assert_eq!(config.publish.author_name.as_deref(), Some("Ana"));
        assert_eq!(config.publish.author_url, None);

        // SAFETY: serialized with the other env tests
        unsafe { std::env::set_var("OPENAI_BASE_URL", "https://primary.example") };
        config.apply_env_overrides();
        assert_eq!(config.llm.base_url, "https://primary.example");

        clear_overrides();
    }

    #[test]
    #[serial]
    fn test_validate_requires_api_key() {
        let mut config = Config::default();
        config.llm.api_key_env = "NOVELWRITER_TEST_KEY".to_string();
        // SAFETY: serialized with the other env tests
        unsafe {
            std::env::remove_var("NOVELWRITER_TEST_KEY");
            std::env::remove_var("EMBEDDINGS_API_KEY");
        }
        assert!(config.validate().is_err());

        // SAFETY: serialized with the other env tests
        unsafe { std::env::set_var("NOVELWRITER_TEST_KEY", "sk-test") };
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.api_key().as_deref(), Some("sk-test"));

        // SAFETY: serialized with the other env tests
        unsafe { std::env::remove_var("NOVELWRITER_TEST_KEY") };
    }
}
