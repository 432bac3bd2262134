use serde::{Deserialize, Serialize};

/// The five fixed sections of a behavioral profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKey {
    IdentityRole,
    CommunicationStyle,
    ContentPriorities,
    EngagementApproach,
    KeyFramings,
}

impl SectionKey {
    pub const ALL: [SectionKey; 5] = [
        SectionKey::IdentityRole,
        SectionKey::CommunicationStyle,
        SectionKey::ContentPriorities,
        SectionKey::EngagementApproach,
        SectionKey::KeyFramings,
    ];

    /// Canonical kebab-case name (matches the serialized form).
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::IdentityRole => "identity-role",
            SectionKey::CommunicationStyle => "communication-style",
            SectionKey::ContentPriorities => "content-priorities",
            SectionKey::EngagementApproach => "engagement-approach",
            SectionKey::KeyFramings => "key-framings",
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            SectionKey::IdentityRole => "Identity & Role",
            SectionKey::CommunicationStyle => "Communication Style",
            SectionKey::ContentPriorities => "Content Priorities",
            SectionKey::EngagementApproach => "Engagement Approach",
            SectionKey::KeyFramings => "Key Framings",
        }
    }

    /// Parse a section name as emitted by users or the analyzer.
    ///
    /// Accepts the canonical kebab-case form plus camelCase and snake_case
    /// spellings; anything else is an unknown section. The analyzer's output
    /// is untrusted, so unknown names are rejected here rather than coerced.
    pub fn parse(name: &str) -> Option<SectionKey> {
        match name.trim() {
            "identity-role" | "identityRole" | "identity_role" => Some(SectionKey::IdentityRole),
            "communication-style" | "communicationStyle" | "communication_style" => {
                Some(SectionKey::CommunicationStyle)
            }
            "content-priorities" | "contentPriorities" | "content_priorities" => {
                Some(SectionKey::ContentPriorities)
            }
            "engagement-approach" | "engagementApproach" | "engagement_approach" => {
                Some(SectionKey::EngagementApproach)
            }
            "key-framings" | "keyFramings" | "key_framings" => Some(SectionKey::KeyFramings),
            _ => None,
        }
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The behavioral profile: five plain-text sections.
///
/// A profile is a derived view, the content of the highest-numbered
/// `ProfileVersion`. It is never stored as a mutable row of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentProfile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub identity_role: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub communication_style: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_priorities: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub engagement_approach: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_framings: String,
}

impl AgentProfile {
    pub fn section(&self, key: SectionKey) -> &str {
        match key {
            SectionKey::IdentityRole => &self.identity_role,
            SectionKey::CommunicationStyle => &self.communication_style,
            SectionKey::ContentPriorities => &self.content_priorities,
            SectionKey::EngagementApproach => &self.engagement_approach,
            SectionKey::KeyFramings => &self.key_framings,
        }
    }

    pub fn set_section(&mut self, key: SectionKey, content: String) {
        match key {
            SectionKey::IdentityRole => self.identity_role = content,
            SectionKey::CommunicationStyle => self.communication_style = content,
            SectionKey::ContentPriorities => self.content_priorities = content,
            SectionKey::EngagementApproach => self.engagement_approach = content,
            SectionKey::KeyFramings => self.key_framings = content,
        }
    }

    /// Iterate sections in their fixed order.
    pub fn sections(&self) -> impl Iterator<Item = (SectionKey, &str)> {
        SectionKey::ALL.iter().map(|k| (*k, self.section(*k)))
    }
}

/// What caused a version to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionSource {
    /// Initial interview completion.
    Interview,
    /// Direct owner edit of one section.
    Manual,
    /// A successful apply-all recommendation batch.
    Recommendation,
    /// Restoring the content of an earlier version.
    Rollback,
}

/// One immutable, numbered snapshot of the profile.
///
/// For a fixed project, version numbers are a contiguous sequence starting
/// at 1. Versions are never edited or deleted; the highest number is the
/// current profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileVersion {
    pub project_id: String,
    pub version: u32,
    pub sections: AgentProfile,
    pub source: VersionSource,
    /// ISO 8601 / RFC 3339 timestamp
    pub created_at: String,
}
