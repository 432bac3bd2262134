//! Recommendation generation: turning an analyzer reply into a persisted
//! set of pending recommendations.
//!
//! The analyzer's drafts are an untrusted tagged union. Each draft is
//! validated against per-type required fields and the current profile;
//! non-conforming drafts are dropped with a warning, never coerced, and a
//! batch with dropped drafts still succeeds with a smaller set.

use crate::analyzer::{AnalyzerReply, RawDraft};
use crate::apply::apply_edit;
use crate::diff::{is_effective_change, find_normalized, normalize_ws};
use crate::evidence::TestComment;
use crate::profile::{AgentProfile, SectionKey};
use crate::recommendation::{
    Alignment, AnalysisSummary, Edit, RecStatus, Recommendation, RecommendationSet, short_hash,
};

/// A draft the validator rejected, with the position it held in the
/// analyzer's reply and why it was dropped.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DroppedDraft {
    pub index: usize,
    pub reason: String,
}

/// Result of one generation run.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub set: RecommendationSet,
    pub recommendations: Vec<Recommendation>,
    pub dropped: Vec<DroppedDraft>,
}

/// Validate one draft against the current profile. Returns the typed edit
/// and target section, or the reason it must be dropped.
fn validate_draft(draft: &RawDraft, profile: &AgentProfile) -> Result<(SectionKey, Edit), String> {
    let draft_type = draft
        .draft_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("missing type tag")?;

    let section_name = draft.target_section.as_deref().unwrap_or("");
    let section = SectionKey::parse(section_name)
        .ok_or_else(|| format!("unknown target section '{}'", section_name))?;

    let nonempty = |field: &Option<String>| -> Option<String> {
        field
            .as_deref()
            .filter(|s| !normalize_ws(s).is_empty())
            .map(str::to_string)
    };

    let edit = match draft_type {
        "add" => Edit::Add {
            added_content: nonempty(&draft.added_content)
                .ok_or("add draft missing added_content")?,
        },
        "remove" => Edit::Remove {
            removed_content: nonempty(&draft.removed_content)
                .ok_or("remove draft missing removed_content")?,
        },
        "modify" => {
            let from = nonempty(&draft.modified_from)
                .ok_or("modify draft missing modified_from")?;
            let to = nonempty(&draft.modified_to).ok_or("modify draft missing modified_to")?;
            if !is_effective_change(&from, &to) {
                return Err("modify draft changes nothing after normalization".to_string());
            }
            // A modify whose source text is not in the section is incoherent
            // from the start; drop it rather than persisting a recommendation
            // that can only ever conflict.
            if find_normalized(profile.section(section), &from).is_none() {
                return Err(format!(
                    "modified_from not found in current {} content",
                    section
                ));
            }
            Edit::Modify {
                modified_from: from,
                modified_to: to,
            }
        }
        other => return Err(format!("unknown recommendation type '{}'", other)),
    };

    Ok((section, edit))
}

fn alignment_from_reply(reported: Option<&str>, has_recommendations: bool) -> Alignment {
    match reported.map(str::trim) {
        Some("good") => Alignment::Good,
        Some(_) => Alignment::NeedsTuning,
        None if has_recommendations => Alignment::NeedsTuning,
        None => Alignment::Good,
    }
}

/// Build a recommendation set from an analyzer reply, validating every
/// draft against the profile as it stands right now.
///
/// `preview_before` is the target section's current content;
/// `preview_after` is that content with the one edit applied in isolation.
pub fn build_set(
    project_id: &str,
    profile: &AgentProfile,
    reply: &AnalyzerReply,
    evidence: &[TestComment],
    now: &str,
) -> GenerateOutcome {
    let set_id = format!("set-{}", short_hash(&[project_id, now, &reply.summary]));

    let mut recommendations = Vec::new();
    let mut dropped = Vec::new();

    for (index, draft) in reply.recommendations.iter().enumerate() {
        let (section, edit) = match validate_draft(draft, profile) {
            Ok(v) => v,
            Err(reason) => {
                eprintln!("Warning: dropping draft {}: {}", index + 1, reason);
                dropped.push(DroppedDraft { index, reason });
                continue;
            }
        };

        let before = profile.section(section).to_string();
        // The edit was validated against current content, so only an add to
        // a conflicting state could fail here; fall back to the unchanged
        // text for display.
        let after = apply_edit(&before, &edit).unwrap_or_else(|| before.clone());

        // Only keep references to comments that were actually in evidence.
        let known: std::collections::HashSet<&str> =
            evidence.iter().map(|c| c.id.as_str()).collect();
        let related: Vec<String> = draft
            .related_comment_ids
            .iter()
            .filter(|id| known.contains(id.as_str()))
            .cloned()
            .collect();

        let rec_id = format!(
            "rec-{}",
            short_hash(&[&set_id, &index.to_string(), section.as_str()])
        );

        recommendations.push(Recommendation {
            id: rec_id,
            set_id: set_id.clone(),
            project_id: project_id.to_string(),
            target_section: section,
            edit,
            status: RecStatus::Pending,
            related_comment_ids: related,
            preview_before: before,
            preview_after: after,
            created_at: now.to_string(),
        });
    }

    let set = RecommendationSet {
        id: set_id,
        project_id: project_id.to_string(),
        generated_at: now.to_string(),
        analysis_summary: AnalysisSummary {
            summary: reply.summary.clone(),
            config_alignment: alignment_from_reply(
                reply.config_alignment.as_deref(),
                !recommendations.is_empty(),
            ),
        },
        comment_ids: evidence.iter().map(|c| c.id.clone()).collect(),
    };

    GenerateOutcome {
        set,
        recommendations,
        dropped,
    }
}

/// The set persisted when the evidence policy selects no comments at all:
/// nothing to analyze means the profile is aligned by definition, and the
/// analyzer is not called.
pub fn empty_outcome(project_id: &str, now: &str) -> GenerateOutcome {
    let set_id = format!("set-{}", short_hash(&[project_id, now, "no-evidence"]));
    GenerateOutcome {
        set: RecommendationSet {
            id: set_id,
            project_id: project_id.to_string(),
            generated_at: now.to_string(),
            analysis_summary: AnalysisSummary {
                summary: "No new feedback to analyze.".to_string(),
                config_alignment: Alignment::Good,
            },
            comment_ids: vec![],
        },
        recommendations: vec![],
        dropped: vec![],
    }
}
