//! Chapter generation
//!
//! Scene planning on the outline model, sequential scene drafting on the
//! writer model, then a summary with a two-tier fallback. Calls are strictly
//! sequential: each scene prompt carries the tail of the scene before it.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::condense::{compact, condensed_project, outline_short};
use super::text::{join_scenes, keep_paragraphs, tail_chars};
use super::{
    ArtifactError, ArtifactSink, AttemptOutcome, AttemptSequence, AttemptSpec, ModelTier, PipelineError, Step,
    SummaryState, render, request_text,
};
use crate::config::{CondenseConfig, Config, GenerationConfig, ModelsConfig};
use crate::domain::{
    ChapterArtifact, ChapterMeta, ChapterSummary, ContinuityContext, ProjectPlan, SCENES_PER_CHAPTER, ScenePlan,
};
use crate::extract::{extract_object, json_kind};
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;

/// Where a chapter run stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterStage {
    Planning,
    Drafting,
    Summarizing,
    Done,
    Failed,
}

impl ChapterStage {
    /// Allowed transitions; `Failed` is only reachable from `Planning`
    pub fn can_advance_to(self, next: ChapterStage) -> bool {
        use ChapterStage::*;
        matches!(
            (self, next),
            (Planning, Drafting) | (Planning, Failed) | (Drafting, Summarizing) | (Summarizing, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ChapterStage::Done | ChapterStage::Failed)
    }
}

/// Logs stage transitions for one chapter run
struct StageTracker {
    chapter: u32,
    stage: ChapterStage,
}

impl StageTracker {
    fn new(chapter: u32) -> Self {
        info!(%chapter, stage = ?ChapterStage::Planning, "chapter stage");
        Self {
            chapter,
            stage: ChapterStage::Planning,
        }
    }

    fn advance(&mut self, next: ChapterStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "invalid chapter stage transition {:?} -> {:?}",
            self.stage,
            next
        );
        info!(chapter = %self.chapter, from = ?self.stage, to = ?next, "chapter stage");
        self.stage = next;
    }
}

/// Artifact names written per chapter
pub const SCENE_PLAN_ARTIFACT: &str = "scene_plan.json";
pub const CHAPTER_TEXT_ARTIFACT: &str = "chapter.md";
pub const CHAPTER_ARTIFACT: &str = "chapter.json";

fn scene_plan_raw_artifact(attempt: usize) -> String {
    format!("scene_plan_attempt_{}_raw.txt", attempt)
}

fn scene_artifact(position: usize) -> String {
    format!("scene_{:02}.txt", position)
}

fn summary_raw_artifact(model: &str, attempt: usize) -> String {
    let model = model.replace(['/', '\\'], "_");
    format!("summary_{}_attempt_{}_raw.txt", model, attempt)
}

/// Generates one chapter from a plan and its continuity
pub struct ChapterPipeline {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    models: ModelsConfig,
    generation: GenerationConfig,
    condense: CondenseConfig,
}

impl ChapterPipeline {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, config: &Config) -> Self {
        Self {
            llm,
            prompts,
            models: config.models.clone(),
            generation: config.generation.clone(),
            condense: config.condense,
        }
    }

    /// Run the whole chapter: plan scenes, draft them, summarize
    ///
    /// The returned artifact is also written to `sink` as `chapter.json`.
    /// Storing it is left to the caller.
    pub async fn generate_chapter(
        &self,
        plan: &ProjectPlan,
        chapter_idx: u32,
        continuity: &ContinuityContext,
        sink: &dyn ArtifactSink,
    ) -> Result<ChapterArtifact, PipelineError> {
        debug!(%chapter_idx, "generate_chapter: called");
        let mut stage = StageTracker::new(chapter_idx);

        let Some(meta) = plan.chapter(chapter_idx) else {
            stage.advance(ChapterStage::Failed);
            return Err(PipelineError::ChapterNotInOutline(chapter_idx));
        };
        let project = condensed_project(plan, &self.condense);

        let (scene_plan, scene_plan_object) = match self.plan_scenes(plan, meta, &project, continuity, sink).await {
            Ok(accepted) => accepted,
            Err(e) => {
                stage.advance(ChapterStage::Failed);
                return Err(e);
            }
        };

        stage.advance(ChapterStage::Drafting);
        let chapter_text = self.draft_scenes(meta, &project, &scene_plan, continuity, sink).await?;

        stage.advance(ChapterStage::Summarizing);
        let summary = self.summarize(&chapter_text, sink).await?;

        let artifact = ChapterArtifact {
            chapter: chapter_idx,
            title: chapter_title(&scene_plan, meta, chapter_idx),
            scene_plan: scene_plan_object,
            chapter_text,
            chapter_summary: summary.chapter_summary,
            continuity_notes: summary.continuity_notes,
            next_chapter_hook: summary.next_chapter_hook,
        };
        sink.write_json(CHAPTER_ARTIFACT, &to_json(CHAPTER_ARTIFACT, &artifact)?)?;

        stage.advance(ChapterStage::Done);
        Ok(artifact)
    }

    async fn request(&self, model: &str, system: &str, user: &str, spec: AttemptSpec) -> Result<String, PipelineError> {
        request_text(
            self.llm.as_ref(),
            model,
            system,
            user,
            spec.temperature,
            Some(spec.max_tokens),
        )
        .await
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Outline => &self.models.outline,
            ModelTier::Writer => &self.models.writer,
        }
    }

    /// Request a scene plan through the escalating attempt schedule
    ///
    /// Returns the typed plan and the object the model sent.
    async fn plan_scenes(
        &self,
        plan: &ProjectPlan,
        meta: &ChapterMeta,
        project: &Value,
        continuity: &ContinuityContext,
        sink: &dyn ArtifactSink,
    ) -> Result<(ScenePlan, Value), PipelineError> {
        debug!(chapter = %meta.chapter, "plan_scenes: called");
        let system = render(
            &self.prompts,
            "scene-plan-system",
            &json!({"language": self.generation.language, "scene_count": SCENES_PER_CHAPTER}),
        )?;
        let user = render(
            &self.prompts,
            "scene-plan-user",
            &json!({
                "project": compact(project),
                "outline_short": compact(&outline_short(plan)),
                "chapter": compact(meta),
                "scene_count": SCENES_PER_CHAPTER,
                "prev_summary": continuity.prev_summary,
            }),
        )?;

        let sequence = AttemptSequence::new(self.generation.scene_plan_attempts.clone());
        let model = self.models.outline.as_str();
        let outcome = sequence
            .run(
                |spec| self.request(model, &system, &user, spec),
                parse_scene_plan,
                |n, raw| {
                    sink.write_text(&scene_plan_raw_artifact(n), raw)
                        .map_err(PipelineError::from)
                },
            )
            .await?;

        match outcome {
            AttemptOutcome::Accepted {
                value: (scene_plan, object),
                attempt,
            } => {
                info!(chapter = %meta.chapter, %attempt, "plan_scenes: scene plan accepted");
                sink.write_json(SCENE_PLAN_ARTIFACT, &object)?;
                Ok((scene_plan, object))
            }
            AttemptOutcome::Exhausted { last_error } => {
                warn!(chapter = %meta.chapter, %last_error, "plan_scenes: all attempts rejected");
                Err(PipelineError::ScenePlanFailed {
                    attempts: sequence.len(),
                    last_error,
                })
            }
        }
    }

    /// Draft every scene in order and write the assembled chapter text
    async fn draft_scenes(
        &self,
        meta: &ChapterMeta,
        project: &Value,
        scene_plan: &ScenePlan,
        continuity: &ContinuityContext,
        sink: &dyn ArtifactSink,
    ) -> Result<String, PipelineError> {
        debug!(chapter = %meta.chapter, scenes = scene_plan.scenes.len(), "draft_scenes: called");
        let system = render(
            &self.prompts,
            "scene-write-system",
            &json!({
                "language": self.generation.language,
                "paragraphs": self.generation.paragraphs_per_scene,
            }),
        )?;
        let project = compact(project);
        let chapter = compact(meta);

        let mut tail = continuity.prev_last_paragraph.clone();
        let mut scenes = Vec::with_capacity(scene_plan.scenes.len());

        for (i, card) in scene_plan.scenes.iter().enumerate() {
            let position = i + 1;
            let user = render(
                &self.prompts,
                "scene-write-user",
                &json!({
                    "project": project,
                    "chapter": chapter,
                    "scene": compact(card),
                    "prev_tail": tail,
                }),
            )?;

            let raw = self
                .request(&self.models.writer, &system, &user, self.generation.scene_draft)
                .await?;
            let text = keep_paragraphs(&raw, self.generation.paragraphs_per_scene);
            if text.is_empty() {
                warn!(chapter = %meta.chapter, %position, "draft_scenes: scene came back empty");
            }

            sink.write_text(&scene_artifact(position), &format!("{}\n", text))?;
            tail = tail_chars(&text, self.generation.continuity_tail_chars).to_string();
            debug!(%position, chars = text.chars().count(), "draft_scenes: scene drafted");
            scenes.push(text);
        }

        let chapter_text = join_scenes(&scenes);
        sink.write_text(CHAPTER_TEXT_ARTIFACT, &chapter_text)?;
        info!(chapter = %meta.chapter, chars = chapter_text.chars().count(), "draft_scenes: chapter text written");
        Ok(chapter_text)
    }

    /// Summarize the chapter, falling back through model tiers to an empty summary
    async fn summarize(&self, chapter_text: &str, sink: &dyn ArtifactSink) -> Result<ChapterSummary, PipelineError> {
        debug!(chars = chapter_text.chars().count(), "summarize: called");
        let system = render(
            &self.prompts,
            "summary-system",
            &json!({"language": self.generation.language}),
        )?;
        let user = render(&self.prompts, "summary-user", &json!({"chapter_text": chapter_text}))?;

        let sequence = AttemptSequence::new(self.generation.summary_attempts.clone());
        let mut state = SummaryState::start(sequence.len());

        loop {
            let SummaryState::Attempting { tier, attempt } = state else {
                warn!("summarize: every attempt rejected, using empty summary");
                return Ok(ChapterSummary::degraded());
            };

            let model = self.model_for(tier);
            debug!(%tier, %model, %attempt, "summarize: attempting");
            let mut call = |spec: AttemptSpec| self.request(model, &system, &user, spec);

            match sequence.attempt(attempt, &mut call, &parse_summary).await? {
                Some(Step::Accepted(summary)) => {
                    info!(%tier, %attempt, "summarize: summary accepted");
                    return Ok(summary);
                }
                Some(Step::Rejected { raw, reason }) => {
                    warn!(%tier, %attempt, %reason, "summarize: attempt rejected");
                    sink.write_text(&summary_raw_artifact(model, attempt), &raw)?;
                }
                None => {}
            }

            state = state.advance(sequence.len());
        }
    }
}

/// Scene plan validator: an object with exactly 12 scenes
///
/// Only the shape is checked. Card fields are read leniently, so a card with
/// an odd field never rejects the attempt.
fn parse_scene_plan(raw: &str) -> Result<(ScenePlan, Value), String> {
    let object = extract_object(raw).map_err(|e| e.to_string())?;

    match object.get("scenes") {
        Some(Value::Array(scenes)) if scenes.len() == SCENES_PER_CHAPTER => {}
        Some(Value::Array(scenes)) => {
            return Err(format!(
                "scene plan must contain {} scenes, found {}",
                SCENES_PER_CHAPTER,
                scenes.len()
            ));
        }
        Some(other) => return Err(format!("scenes must be a list, found {}", json_kind(other))),
        None => return Err("scene plan has no scenes".to_string()),
    }

    let object = Value::Object(object);
    let plan: ScenePlan =
        serde_json::from_value(object.clone()).map_err(|e| format!("scene plan is not readable: {}", e))?;
    Ok((plan.normalize(), object))
}

/// Summary validator: any JSON object
fn parse_summary(raw: &str) -> Result<ChapterSummary, String> {
    extract_object(raw)
        .map(|object| ChapterSummary::from_object(&object))
        .map_err(|e| e.to_string())
}

/// First non-blank of: scene plan title, outline title, "Chapter N"
fn chapter_title(scene_plan: &ScenePlan, meta: &ChapterMeta, chapter_idx: u32) -> String {
    [scene_plan.title.trim(), meta.title.trim()]
        .into_iter()
        .find(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Chapter {}", chapter_idx))
}

fn to_json<T: serde::Serialize>(name: &str, value: &T) -> Result<Value, ArtifactError> {
    serde_json::to_value(value).map_err(|source| ArtifactError::Json {
        name: name.to_string(),
        source,
    })
}
