use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::profile::SectionKey;

/// Overall verdict the analyzer reached about the current profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    /// The profile already matches the feedback; nothing actionable.
    #[default]
    Good,
    /// The feedback suggests the profile needs changes.
    NeedsTuning,
}

/// The analyzer's prose summary of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AnalysisSummary {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default)]
    pub config_alignment: Alignment,
}

/// One batch of recommendations produced by a single analyzer call.
///
/// Immutable after creation; a fresh generation run always produces a new
/// set, never rewrites an old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub id: String,
    pub project_id: String,
    /// ISO 8601 / RFC 3339 timestamp
    pub generated_at: String,
    pub analysis_summary: AnalysisSummary,
    /// IDs of the evidence comments this set consumed. Lets the
    /// `since-last-set` evidence policy compute coverage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comment_ids: Vec<String>,
}

/// The proposed edit, tagged by type. Each variant carries exactly the
/// fields its type requires; analyzer drafts missing them never get this far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Edit {
    Add { added_content: String },
    Remove { removed_content: String },
    Modify { modified_from: String, modified_to: String },
}

impl Edit {
    pub fn type_str(&self) -> &'static str {
        match self {
            Edit::Add { .. } => "add",
            Edit::Remove { .. } => "remove",
            Edit::Modify { .. } => "modify",
        }
    }
}

/// Recommendation lifecycle. Transitions are one-way:
/// pending -> applied or pending -> dismissed, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecStatus {
    #[default]
    Pending,
    Applied,
    Dismissed,
}

/// A single proposed edit to one profile section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub set_id: String,
    pub project_id: String,
    pub target_section: SectionKey,
    #[serde(flatten)]
    pub edit: Edit,
    #[serde(default)]
    pub status: RecStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_comment_ids: Vec<String>,
    /// Section content as it stood when this recommendation was generated.
    /// Doubles as the display "before" text and the staleness reference.
    pub preview_before: String,
    /// Section content with this one edit applied in isolation.
    pub preview_after: String,
    /// ISO 8601 / RFC 3339 timestamp
    pub created_at: String,
}

impl Recommendation {
    pub fn is_pending(&self) -> bool {
        self.status == RecStatus::Pending
    }
}

/// Short content hash for entity IDs (SHA-256, hex, truncated).
pub fn short_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0]);
    }
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_tagged_serialization() {
        let edit = Edit::Modify {
            modified_from: "growth metrics".to_string(),
            modified_to: "growth metrics and risk factors".to_string(),
        };
        let json = serde_json::to_string(&edit).unwrap();
        assert!(json.contains("\"type\":\"modify\""));
        assert!(json.contains("modified_from"));

        let back: Edit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, edit);
    }

    #[test]
    fn test_edit_missing_required_field_fails() {
        // A "remove" without removed_content must not deserialize.
        let result = serde_json::from_str::<Edit>(r#"{"type":"remove"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_edit_unknown_type_fails() {
        let result = serde_json::from_str::<Edit>(r#"{"type":"rewrite","content":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_recommendation_roundtrip_with_flattened_edit() {
        let rec = Recommendation {
            id: "rec-abc".to_string(),
            set_id: "set-def".to_string(),
            project_id: "p1".to_string(),
            target_section: SectionKey::ContentPriorities,
            edit: Edit::Add {
                added_content: "Cover risk factors.".to_string(),
            },
            status: RecStatus::Pending,
            related_comment_ids: vec!["c1".to_string()],
            preview_before: "Focus on growth.".to_string(),
            preview_after: "Focus on growth.\n\nCover risk factors.".to_string(),
            created_at: "2024-01-15T10:30:00Z".to_string(),
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"type\":\"add\""));
        assert!(json.contains("\"target_section\":\"content-priorities\""));
        assert!(json.contains("\"status\":\"pending\""));

        let back: Recommendation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&RecStatus::Dismissed).unwrap(),
            "\"dismissed\""
        );
    }

    #[test]
    fn test_alignment_default_is_good() {
        let summary: AnalysisSummary = serde_json::from_str("{}").unwrap();
        assert_eq!(summary.config_alignment, Alignment::Good);
        assert_eq!(
            serde_json::to_string(&Alignment::NeedsTuning).unwrap(),
            "\"needs-tuning\""
        );
    }

    #[test]
    fn test_short_hash_is_stable_and_distinct() {
        let a = short_hash(&["p1", "2024-01-15T10:30:00Z"]);
        let b = short_hash(&["p1", "2024-01-15T10:30:00Z"]);
        let c = short_hash(&["p1", "2024-01-15T10:30:01Z"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn test_short_hash_separator_prevents_collisions() {
        assert_ne!(short_hash(&["ab", "c"]), short_hash(&["a", "bc"]));
    }
}
