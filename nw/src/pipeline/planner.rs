//! Project plan generation
//!
//! One request to the outline model per project. There is no retry: a plan
//! that fails validation is reported and the raw text is kept for debugging.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{ArtifactSink, PipelineError, render, request_text};
use crate::config::{Config, PlanCallConfig};
use crate::domain::{CHAPTER_COUNT, ProjectPlan};
use crate::extract::{extract_object, json_kind};
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;

/// Raw plan text, written only when validation fails
pub const PLAN_RAW_ARTIFACT: &str = "project_plan_raw.txt";
pub const PLAN_ARTIFACT: &str = "project_plan.json";

/// An accepted plan: the typed view plus the object the model sent
///
/// The object is what gets stored, so fields outside the typed schema and
/// values the typed view had to coerce survive unchanged.
#[derive(Debug, Clone)]
pub struct GeneratedPlan {
    pub plan: ProjectPlan,
    pub document: Value,
}

/// Turns a title and blurb into a full project plan
pub struct PlanGenerator {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    model: String,
    call: PlanCallConfig,
    language: String,
}

impl PlanGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, config: &Config) -> Self {
        Self {
            llm,
            prompts,
            model: config.models.outline.clone(),
            call: config.generation.plan,
            language: config.generation.language.clone(),
        }
    }

    /// Generate and validate a project plan
    ///
    /// Writes `project_plan.json` to `sink` on success. Nothing is stored;
    /// persisting the plan is the caller's job.
    pub async fn generate_project_plan(
        &self,
        title: &str,
        blurb: &str,
        sink: &dyn ArtifactSink,
    ) -> Result<GeneratedPlan, PipelineError> {
        debug!(%title, model = %self.model, "generate_project_plan: called");
        let system = render(
            &self.prompts,
            "architect-system",
            &json!({"language": self.language, "chapter_count": CHAPTER_COUNT}),
        )?;
        let user = render(
            &self.prompts,
            "architect-user",
            &json!({"title": title, "blurb": blurb, "chapter_count": CHAPTER_COUNT}),
        )?;

        let raw = request_text(
            self.llm.as_ref(),
            &self.model,
            &system,
            &user,
            self.call.temperature,
            self.call.max_tokens,
        )
        .await?;

        match validate_plan(&raw) {
            Ok((plan, document)) => {
                sink.write_json(PLAN_ARTIFACT, &document)?;
                info!(
                    %title,
                    characters = plan.characters.len(),
                    contrasts = plan.contrast_catalog.len(),
                    "generate_project_plan: plan accepted"
                );
                Ok(GeneratedPlan { plan, document })
            }
            Err(reason) => {
                warn!(%reason, "generate_project_plan: plan rejected");
                sink.write_text(PLAN_RAW_ARTIFACT, &raw)?;
                Err(PipelineError::InvalidPlanShape(reason))
            }
        }
    }
}

/// Check a raw plan response; returns the typed plan and the original object
///
/// Rejects only a missing object, an outline that is not a list of exactly 8
/// entries, and outline chapter numbers that are not 1..=8 without repeats.
pub fn validate_plan(raw: &str) -> Result<(ProjectPlan, Value), String> {
    let object = extract_object(raw).map_err(|e| e.to_string())?;

    match object.get("outline") {
        Some(Value::Array(entries)) if entries.len() == CHAPTER_COUNT => {}
        Some(Value::Array(entries)) => {
            return Err(format!(
                "outline must contain exactly {} chapters, found {}",
                CHAPTER_COUNT,
                entries.len()
            ));
        }
        Some(other) => return Err(format!("outline must be a list, found {}", json_kind(other))),
        None => return Err("plan has no outline".to_string()),
    }

    let object = Value::Object(object);
    let plan: ProjectPlan =
        serde_json::from_value(object.clone()).map_err(|e| format!("plan is not readable: {}", e))?;
    plan.validate_outline()?;
    Ok((plan, object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::pipeline::MemoryArtifactSink;

    fn plan_json(chapters: usize) -> String {
        let outline: Vec<Value> = (1..=chapters)
            .map(|n| json!({"chapter": n, "title": format!("Part {}", n), "logline": "l"}))
            .collect();
        json!({
            "topic": {"title": "Signal", "blurb": "A pager that answers back."},
            "story_bible": {"core_premise": "Messages arrive from next week."},
            "characters": [{"id": "ana", "name": "Ana"}],
            "outline": outline,
            "target_length": {"chapters": 8}
        })
        .to_string()
    }

    fn generator(client: Arc<MockLlmClient>) -> PlanGenerator {
        PlanGenerator::new(client, Arc::new(PromptLoader::embedded_only()), &Config::default())
    }

    #[test]
    fn test_validate_plan_accepts_prose_wrapped_object() {
        let raw = format!("Here is the plan:\n```json\n{}\n```", plan_json(8));
        let (plan, object) = validate_plan(&raw).unwrap();
        assert_eq!(plan.outline.len(), 8);
        assert_eq!(plan.topic.title, "Signal");
        assert_eq!(object["target_length"]["chapters"], 8);
    }

    #[test]
    fn test_validate_plan_accepts_field_drift() {
        let outline: Vec<Value> = (1..=8)
            .map(|n| json!({"chapter": format!("第{}章", n), "title": format!("Part {}", n), "must_reveal": "a name"}))
            .collect();
        let raw = json!({
            "topic": {"title": "Signal", "themes": "time"},
            "story_bible": {"timeline": [{"year": 2015, "event": "first page"}]},
            "characters": [{"id": "ana", "name": "Ana", "voice": ["dry", "quick"], "age": 34}],
            "outline": outline
        })
        .to_string();

        let (plan, object) = validate_plan(&raw).unwrap();
        assert_eq!(plan.outline[7].chapter, 8);
        assert_eq!(plan.outline[0].must_reveal, vec!["a name"]);
        assert_eq!(plan.topic.themes, vec!["time"]);
        assert_eq!(plan.story_bible.timeline.len(), 1);
        assert_eq!(plan.characters[0].voice, "dry, quick");
        assert_eq!(object["characters"][0]["age"], 34);
        assert_eq!(object["story_bible"]["timeline"][0]["year"], 2015);
    }

    #[test]
    fn test_validate_plan_rejects_nine_chapters() {
        let err = validate_plan(&plan_json(9)).unwrap_err();
        assert!(err.contains("exactly 8"));
        assert!(err.contains("found 9"));
    }

    #[test]
    fn test_validate_plan_rejections() {
        assert!(validate_plan(&plan_json(7)).unwrap_err().contains("found 7"));
        assert!(validate_plan(r#"{"outline": "soon"}"#).unwrap_err().contains("found string"));
        assert!(validate_plan(r#"{"topic": {}}"#).unwrap_err().contains("no outline"));
        assert!(validate_plan("I cannot help with that.").is_err());

        let duplicated = plan_json(8).replace("\"chapter\":8", "\"chapter\":7");
        assert!(validate_plan(&duplicated).unwrap_err().contains("unique"));
    }

    #[tokio::test]
    async fn test_generate_project_plan_single_request() {
        let client = Arc::new(MockLlmClient::new(vec![plan_json(8)]));
        let sink = MemoryArtifactSink::new();

        let generated = generator(client.clone())
            .generate_project_plan("Signal", "A pager that answers back.", &sink)
            .await
            .unwrap();

        assert_eq!(generated.plan.intro(), "Messages arrive from next week.");
        assert_eq!(generated.document["target_length"]["chapters"], 8);
        assert_eq!(client.call_count(), 1);
        let request = &client.requests()[0];
        assert_eq!(request.model, "gemini-3-pro-preview");
        assert_eq!(request.max_tokens, None);
        assert!(request.user_prompt().unwrap().contains("A pager that answers back."));
        assert!(sink.get(PLAN_ARTIFACT).is_some());
        assert!(sink.get(PLAN_RAW_ARTIFACT).is_none());
    }

    #[tokio::test]
    async fn test_generate_project_plan_invalid_shape_is_not_retried() {
        let client = Arc::new(MockLlmClient::new(vec![plan_json(6), plan_json(8)]));
        let sink = MemoryArtifactSink::new();

        let err = generator(client.clone())
            .generate_project_plan("Signal", "b", &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidPlanShape(_)));
        assert_eq!(client.call_count(), 1);
        assert_eq!(sink.get(PLAN_RAW_ARTIFACT), Some(plan_json(6)));
        assert!(sink.get(PLAN_ARTIFACT).is_none());
    }

    #[tokio::test]
    async fn test_generate_project_plan_gateway_error_propagates() {
        let client = Arc::new(MockLlmClient::scripted(vec![Err(500)]));
        let sink = MemoryArtifactSink::new();

        let err = generator(client).generate_project_plan("t", "b", &sink).await.unwrap_err();
        assert!(err.is_gateway());
        assert!(sink.names().is_empty());
    }
}
