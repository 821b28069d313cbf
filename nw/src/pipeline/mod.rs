//! Generation pipeline
//!
//! Plan generation runs once per project. Each chapter then moves through
//! `Planning → Drafting → Summarizing → Done`; only planning can fail the
//! chapter. Drafted prose is written to the artifact sink before
//! summarization starts, so a later failure never loses it.

mod artifacts;
mod attempts;
mod chapter;
pub mod condense;
pub mod continuity;
mod planner;
mod summary;
pub mod text;

use novelstore::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::prompts::PromptLoader;

pub use artifacts::{ArtifactError, ArtifactSink, FsArtifactSink, MemoryArtifactSink};
pub use attempts::{AttemptOutcome, AttemptSequence, AttemptSpec, Step};
pub use chapter::{CHAPTER_ARTIFACT, CHAPTER_TEXT_ARTIFACT, ChapterPipeline, ChapterStage, SCENE_PLAN_ARTIFACT};
pub use planner::{GeneratedPlan, PLAN_ARTIFACT, PLAN_RAW_ARTIFACT, PlanGenerator, validate_plan};
pub use summary::{ModelTier, SummaryState};

/// Errors that end a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The plan response failed extraction or shape validation
    #[error("Invalid project plan: {0}")]
    InvalidPlanShape(String),

    #[error("Chapter {0} not found in outline")]
    ChapterNotInOutline(u32),

    /// Every scene planning attempt was rejected
    #[error("Scene plan failed after {attempts} attempts: {last_error}")]
    ScenePlanFailed { attempts: usize, last_error: String },

    #[error("Model gateway error: {0}")]
    Gateway(#[from] LlmError),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// True for transport and HTTP failures from the model gateway
    pub fn is_gateway(&self) -> bool {
        matches!(self, PipelineError::Gateway(_))
    }
}

/// Render a stage prompt
fn render<C: Serialize>(prompts: &PromptLoader, name: &str, context: &C) -> Result<String, PipelineError> {
    prompts
        .render(name, context)
        .map_err(|e| PipelineError::Prompt(e.to_string()))
}

/// One model call, returning the raw response text
async fn request_text(
    llm: &dyn LlmClient,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
    max_tokens: Option<u32>,
) -> Result<String, PipelineError> {
    debug!(%model, temperature, ?max_tokens, "request_text: called");
    let request = CompletionRequest::single_turn(model, system, user, temperature, max_tokens);
    let response = llm.complete(request).await?;
    if response.truncated() {
        warn!(%model, ?max_tokens, "request_text: response hit the token budget");
    }
    Ok(response.text().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PipelineError::ScenePlanFailed {
            attempts: 2,
            last_error: "scene plan must contain 12 scenes, found 11".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Scene plan failed after 2 attempts: scene plan must contain 12 scenes, found 11"
        );
        assert_eq!(
            PipelineError::ChapterNotInOutline(9).to_string(),
            "Chapter 9 not found in outline"
        );
    }

    #[test]
    fn test_gateway_errors_convert() {
        let err: PipelineError = LlmError::ApiError {
            status: 503,
            message: "down".to_string(),
        }
        .into();
        assert!(err.is_gateway());
        assert!(!PipelineError::InvalidPlanShape("x".to_string()).is_gateway());
    }
}
