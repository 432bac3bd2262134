use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::analyzer::{Analyzer, AnalyzerError, AnalyzerReply, AnalyzerRequest, RawDraft};
use crate::evidence::{TestComment, append_comment, comments_path};
use crate::ops::{self, ProfileSnapshot};
use crate::profile::AgentProfile;

/// A profile with every section filled, suitable as an interview result.
pub fn sample_profile() -> AgentProfile {
    AgentProfile {
        identity_role: "Growth advisor for an early-stage startup.".to_string(),
        communication_style: "Direct and concise.".to_string(),
        content_priorities: "Focus on growth metrics.".to_string(),
        engagement_approach: "Ask clarifying questions before advising.".to_string(),
        key_framings: "Treat churn as the primary risk.".to_string(),
    }
}

/// Initialize a project at `dir` with [`sample_profile`] as version 1.
pub fn setup_project(dir: &Path) -> ProfileSnapshot {
    ops::init(dir, "test-project", sample_profile()).unwrap()
}

/// Append a test comment with the given id and text to the project's
/// comment log.
pub fn add_comment(dir: &Path, id: &str, text: &str) -> TestComment {
    let comment = TestComment {
        id: id.to_string(),
        project_id: "test-project".to_string(),
        response_excerpt: None,
        text: text.to_string(),
        created_at: "2025-01-01T00:00:00Z".to_string(),
    };
    append_comment(comments_path(dir), &comment).unwrap();
    comment
}

/// A draft of the given type with only its required content fields set.
pub fn make_draft(draft_type: &str, section: &str, from: &str, to: &str) -> RawDraft {
    RawDraft {
        draft_type: Some(draft_type.to_string()),
        target_section: Some(section.to_string()),
        added_content: (draft_type == "add").then(|| to.to_string()),
        removed_content: (draft_type == "remove").then(|| from.to_string()),
        modified_from: (draft_type == "modify").then(|| from.to_string()),
        modified_to: (draft_type == "modify").then(|| to.to_string()),
        related_comment_ids: Vec::new(),
    }
}

/// Scripted analyzer responses for tests that never shell out.
pub enum MockBehavior {
    Reply(AnalyzerReply),
    Timeout(u64),
    Unparseable,
}

/// Analyzer stand-in that returns a scripted response and counts calls.
pub struct MockAnalyzer {
    behavior: MockBehavior,
    calls: AtomicUsize,
}

impl MockAnalyzer {
    pub fn new(behavior: MockBehavior) -> Self {
        MockAnalyzer {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn replying(drafts: Vec<RawDraft>, summary: &str, alignment: Option<&str>) -> Self {
        Self::new(MockBehavior::Reply(AnalyzerReply {
            recommendations: drafts,
            summary: summary.to_string(),
            config_alignment: alignment.map(|a| a.to_string()),
        }))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Analyzer for MockAnalyzer {
    fn analyze(&self, _request: &AnalyzerRequest) -> Result<AnalyzerReply, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Reply(reply) => Ok(reply.clone()),
            MockBehavior::Timeout(secs) => Err(AnalyzerError::Timeout(*secs)),
            MockBehavior::Unparseable => Err(AnalyzerError::Unparseable),
        }
    }
}
