//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

pub const ARCHITECT_SYSTEM: &str = include_str!("../../prompts/architect-system.pmt");
pub const ARCHITECT_USER: &str = include_str!("../../prompts/architect-user.pmt");
pub const SCENE_PLAN_SYSTEM: &str = include_str!("../../prompts/scene-plan-system.pmt");
pub const SCENE_PLAN_USER: &str = include_str!("../../prompts/scene-plan-user.pmt");
pub const SCENE_WRITE_SYSTEM: &str = include_str!("../../prompts/scene-write-system.pmt");
pub const SCENE_WRITE_USER: &str = include_str!("../../prompts/scene-write-user.pmt");
pub const SUMMARY_SYSTEM: &str = include_str!("../../prompts/summary-system.pmt");
pub const SUMMARY_USER: &str = include_str!("../../prompts/summary-user.pmt");

/// Every template name the pipeline renders
pub const TEMPLATE_NAMES: [&str; 8] = [
    "architect-system",
    "architect-user",
    "scene-plan-system",
    "scene-plan-user",
    "scene-write-system",
    "scene-write-user",
    "summary-system",
    "summary-user",
];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    let content = match name {
        "architect-system" => ARCHITECT_SYSTEM,
        "architect-user" => ARCHITECT_USER,
        "scene-plan-system" => SCENE_PLAN_SYSTEM,
        "scene-plan-user" => SCENE_PLAN_USER,
        "scene-write-system" => SCENE_WRITE_SYSTEM,
        "scene-write-user" => SCENE_WRITE_USER,
        "summary-system" => SUMMARY_SYSTEM,
        "summary-user" => SUMMARY_USER,
        _ => {
            debug!("get_embedded: no match found");
            return None;
        }
    };
    Some(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_is_embedded() {
        for name in TEMPLATE_NAMES {
            let content = get_embedded(name).unwrap_or_else(|| panic!("missing {}", name));
            assert!(!content.trim().is_empty(), "{} is empty", name);
        }
    }

    #[test]
    fn test_structured_prompts_demand_json() {
        for name in ["architect-system", "scene-plan-system", "summary-system"] {
            assert!(get_embedded(name).unwrap().contains("one JSON object"));
        }
        assert!(SCENE_PLAN_SYSTEM.contains("{{scene_count}}"));
        assert!(SCENE_WRITE_SYSTEM.contains("{{paragraphs}}"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
