//! Condensed project context for stage prompts
//!
//! The full plan is too large to resend with every scene. Each prompt gets a
//! trimmed view instead: identity fields, capped lists, and no timeline or
//! relation history.

use serde_json::{Value, json};
use tracing::debug;

use crate::config::CondenseConfig;
use crate::domain::ProjectPlan;

fn capped<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    items.iter().take(limit).cloned().collect()
}

/// The reduced project object sent to scene planning and scene drafting
pub fn condensed_project(plan: &ProjectPlan, limits: &CondenseConfig) -> Value {
    debug!(?limits, "condensed_project: called");
    let topic = &plan.topic;
    let world = &plan.world_context;
    let bible = &plan.story_bible;

    let characters: Vec<Value> = plan
        .characters
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "role": c.role,
                "public_face": c.public_face,
                "private_drive": c.private_drive,
                "weakness": c.weakness,
                "secrets": capped(&c.secrets, limits.secrets),
                "voice": c.voice,
            })
        })
        .collect();

    let edges: Vec<Value> = plan
        .relations
        .edges
        .iter()
        .map(|e| {
            json!({
                "a": e.a,
                "b": e.b,
                "type": e.kind,
                "tension": e.tension,
                "future_pressure": e.future_pressure,
            })
        })
        .collect();

    json!({
        "topic": {
            "title": topic.title,
            "blurb": topic.blurb,
            "genre": topic.genre,
            "tone": topic.tone,
            "themes": topic.themes,
        },
        "world_context": {
            "definition": world.definition,
            "workflow": capped(&world.workflow, limits.workflow),
            "why_it_feels_like_magic": capped(&world.why_it_feels_like_magic, limits.world_lists),
            "hidden_costs": capped(&world.hidden_costs, limits.world_lists),
            "risks": capped(&world.risks, limits.world_lists),
            "chapter_usage_guidance": capped(&world.chapter_usage_guidance, limits.world_lists),
        },
        "contrast_catalog": capped(&plan.contrast_catalog, limits.contrasts),
        "story_bible": {
            "core_premise": bible.core_premise,
            "world": bible.world,
            "main_conflict": bible.main_conflict,
            "mysteries": capped(&bible.mysteries, limits.mysteries),
            "key_objects": capped(&bible.key_objects, limits.key_objects),
        },
        "characters": characters,
        "relations": {"edges": edges},
    })
}

/// `{chapter, title, logline}` for every outline entry
pub fn outline_short(plan: &ProjectPlan) -> Value {
    Value::Array(
        plan.outline
            .iter()
            .map(|c| json!({"chapter": c.chapter, "title": c.title, "logline": c.logline}))
            .collect(),
    )
}

/// Compact single-line JSON, non-ASCII kept as is
pub fn compact<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Character, ChapterMeta, ContrastEntry};

    fn plan() -> ProjectPlan {
        let mut plan = ProjectPlan::default();
        plan.topic.title = "Signal".to_string();
        plan.world_context.workflow = (0..9).map(|i| format!("w{}", i)).collect();
        plan.world_context.risks = (0..9).map(|i| format!("r{}", i)).collect();
        plan.story_bible.mysteries = (0..9).map(|i| format!("m{}", i)).collect();
        plan.story_bible.key_objects = (0..12).map(|i| format!("k{}", i)).collect();
        plan.story_bible.timeline = vec!["t0".to_string()];
        plan.contrast_catalog = (0..20)
            .map(|i| ContrastEntry {
                id: format!("C{}", i),
                ..Default::default()
            })
            .collect();
        plan.characters = vec![Character {
            id: "ana".to_string(),
            secrets: (0..7).map(|i| format!("s{}", i)).collect(),
            skills: vec!["lockpicking".to_string()],
            ..Default::default()
        }];
        plan.outline = (1..=8)
            .map(|n| ChapterMeta {
                chapter: n,
                title: format!("T{}", n),
                logline: format!("L{}", n),
                goal: "hidden".to_string(),
                ..Default::default()
            })
            .collect();
        plan
    }

    #[test]
    fn test_condensed_project_applies_caps() {
        let out = condensed_project(&plan(), &CondenseConfig::default());

        assert_eq!(out["world_context"]["workflow"].as_array().unwrap().len(), 5);
        assert_eq!(out["world_context"]["risks"].as_array().unwrap().len(), 6);
        assert_eq!(out["story_bible"]["mysteries"].as_array().unwrap().len(), 6);
        assert_eq!(out["story_bible"]["key_objects"].as_array().unwrap().len(), 8);
        assert_eq!(out["contrast_catalog"].as_array().unwrap().len(), 15);
        assert_eq!(out["characters"][0]["secrets"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_condensed_project_drops_bulky_fields() {
        let out = condensed_project(&plan(), &CondenseConfig::default());
        assert!(out["story_bible"].get("timeline").is_none());
        assert!(out["characters"][0].get("skills").is_none());
        assert!(out.get("outline").is_none());
    }

    #[test]
    fn test_outline_short() {
        let out = outline_short(&plan());
        let entries = out.as_array().unwrap();
        assert_eq!(entries.len(), 8);
        assert_eq!(entries[2], json!({"chapter": 3, "title": "T3", "logline": "L3"}));
    }

    #[test]
    fn test_compact_keeps_unicode() {
        assert_eq!(compact(&json!({"t": "雨夜"})), r#"{"t":"雨夜"}"#);
    }
}
