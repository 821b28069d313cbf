//! NovelWriter - staged LLM pipeline for serialized novels
//!
//! A project starts from a title and a one-paragraph topic. One call to the
//! outline model produces the whole project plan (world bible, cast,
//! relations, and a fixed 8-chapter outline). Each chapter is then generated
//! on demand from that plan plus the previous chapter's summary and last
//! paragraph.
//!
//! # Core Concepts
//!
//! - **Staged chapters**: scene planning, scene drafting, summarization
//! - **Validate, then retry**: malformed structured output is retried with a
//!   larger budget; transport failures are never retried
//! - **Continuity by hand-off**: chapters only see their predecessor's summary
//!   and closing paragraph
//! - **Nothing lost**: prose hits disk before any later stage can fail
//!
//! # Modules
//!
//! - [`extract`] - first-JSON-object extraction from model output
//! - [`llm`] - chat-completion client trait and OpenAI-compatible gateway
//! - [`pipeline`] - plan generator and chapter pipeline
//! - [`storage`] - pipeline-facing persistence over `novelstore`
//! - [`publish`] - Telegraph publishing
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod envfile;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod project;
pub mod prompts;
pub mod publish;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use domain::{ChapterArtifact, ContinuityContext, ProjectPlan, ScenePlan};
pub use extract::{ExtractError, extract_first_json_object};
pub use llm::{LlmClient, LlmError, create_client};
pub use pipeline::{ChapterPipeline, PipelineError, PlanGenerator};
pub use storage::{MemoryStore, Persistence};
