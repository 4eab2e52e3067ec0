use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured reproduction steps entered through the reporting form.
/// Only `step1` and `step2` take part in the embedding text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSteps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step1: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step2: Option<String>,
}

/// The free-text fields of a bug report that are embedded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugText {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps_to_reproduce: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_steps: Option<UserSteps>,
}

impl BugText {
    /// Return the single string handed to the embedder.
    pub fn normalized(&self) -> String {
        crate::text::normalize(
            &self.title,
            &self.description,
            self.steps_to_reproduce.as_deref(),
            self.user_steps.as_ref(),
        )
    }
}

/// One entry of the corpus returned by the bug source.
///
/// Every field is optional at the type level; the bootstrap pipeline decides
/// which ones are required for routing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugRecord {
    #[serde(default)]
    pub application: Option<String>,

    #[serde(default)]
    pub bug_id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub steps_to_reproduce: Option<String>,

    #[serde(default)]
    pub user_steps: Option<UserSteps>,

    #[serde(default)]
    pub status: Option<String>,
}

impl BugRecord {
    pub fn text(&self) -> String {
        crate::text::normalize(
            self.title.as_deref().unwrap_or_default(),
            self.description.as_deref().unwrap_or_default(),
            self.steps_to_reproduce.as_deref(),
            self.user_steps.as_ref(),
        )
    }
}

/// SearchResult pairs a stored bug id with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub bug_id: String,
    pub score: f32,
}

/// Names the two independent registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Every reported bug; used for duplicate detection and semantic search.
    General,
    /// Closed bugs only; used to find resolved precedents for priority.
    Priority,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::General => f.write_str("general"),
            IndexKind::Priority => f.write_str("priority"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_backend_json() {
        let rec: BugRecord = serde_json::from_value(serde_json::json!({
            "application": "Portal",
            "bugId": "BUG-7",
            "title": "Crash",
            "description": "On save",
            "stepsToReproduce": null,
            "userSteps": {"step1": "Open", "step3": "ignored"},
            "status": "Closed",
            "priority": "High"
        }))
        .unwrap();
        assert_eq!(rec.application.as_deref(), Some("Portal"));
        assert_eq!(rec.bug_id.as_deref(), Some("BUG-7"));
        assert_eq!(rec.steps_to_reproduce, None);
        assert_eq!(rec.user_steps.as_ref().and_then(|u| u.step1.as_deref()), Some("Open"));
        assert_eq!(rec.text(), "Crash On save  Open ");
    }

    #[test]
    fn test_record_rejects_bad_nested_shape() {
        let res: Result<BugRecord, _> = serde_json::from_value(serde_json::json!({
            "application": "Portal",
            "userSteps": "not a map"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn test_search_result_wire_shape() {
        let r = SearchResult { bug_id: "BUG-1".into(), score: 0.5 };
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            serde_json::json!({"bug_id": "BUG-1", "score": 0.5})
        );
    }

    #[test]
    fn test_index_kind_display() {
        assert_eq!(IndexKind::General.to_string(), "general");
        assert_eq!(IndexKind::Priority.to_string(), "priority");
    }
}
