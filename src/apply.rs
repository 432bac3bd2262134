//! Applying recommendation batches to the profile.
//!
//! Apply-all walks a set's pending recommendations in creation order
//! against a working copy of the current profile, so later edits in the
//! batch see earlier ones. Preconditions are checked against the working
//! copy, not the stale previews: a recommendation whose target text has
//! drifted is skipped (left pending) with reason `conflict`, and the rest
//! of the batch proceeds. The commit - one new version plus all status
//! flips - is the caller's single atomic store save.

use serde::Serialize;

use crate::diff::find_normalized;
use crate::ops::OpError;
use crate::profile::{AgentProfile, ProfileVersion, VersionSource};
use crate::recommendation::{Edit, RecStatus};
use crate::store::ProfileStore;

/// Why a recommendation was skipped during apply-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// The expected target text no longer matches the live section.
    Conflict,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecommendation {
    pub id: String,
    pub reason: SkipReason,
}

/// Structured result of apply-all. Returned even on full success so callers
/// can explain partial outcomes without treating them as errors.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// IDs of recommendations applied, in the order they were applied.
    pub applied: Vec<String>,
    pub skipped: Vec<SkippedRecommendation>,
    /// The version created by this batch; `None` when everything skipped.
    pub new_version: Option<u32>,
    /// The profile after the batch (unchanged if nothing applied).
    pub profile: AgentProfile,
}

impl ApplyOutcome {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// Apply one edit to section content. `None` means the precondition failed:
/// the text the edit expects is not present.
pub fn apply_edit(current: &str, edit: &Edit) -> Option<String> {
    match edit {
        Edit::Add { added_content } => {
            let added = added_content.trim();
            if current.trim().is_empty() {
                Some(added.to_string())
            } else {
                Some(format!("{}\n\n{}", current.trim_end(), added))
            }
        }
        Edit::Remove { removed_content } => {
            let range = find_normalized(current, removed_content)?;
            let before = current[..range.start].trim_end();
            let after = current[range.end..].trim_start();
            Some(if before.is_empty() {
                after.to_string()
            } else if after.is_empty() {
                before.to_string()
            } else {
                format!("{} {}", before, after)
            })
        }
        Edit::Modify {
            modified_from,
            modified_to,
        } => {
            let range = find_normalized(current, modified_from)?;
            Some(format!(
                "{}{}{}",
                &current[..range.start],
                modified_to,
                &current[range.end..]
            ))
        }
    }
}

/// Run apply-all for a set against an in-memory store. The caller persists
/// the store afterwards; since the store saves in a single atomic rename,
/// the version append and every status flip commit together.
pub(crate) fn apply_all_in_store(
    store: &mut ProfileStore,
    set_id: &str,
    now: &str,
) -> Result<ApplyOutcome, OpError> {
    if store.set(set_id).is_none() {
        return Err(OpError::SetNotFound(set_id.to_string()));
    }
    let current = store.current_version().ok_or(OpError::NotInitialized)?;
    let project_id = current.project_id.clone();
    let next_version = current.version + 1;
    let mut working = current.sections.clone();

    // Creation order is the stable application order within a batch.
    let pending: Vec<(String, crate::profile::SectionKey, Edit)> = store
        .recommendations_for_set(set_id)
        .into_iter()
        .filter(|r| r.is_pending())
        .map(|r| (r.id.clone(), r.target_section, r.edit.clone()))
        .collect();

    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    for (id, section, edit) in pending {
        // Precondition check runs against the working copy, not the stale
        // preview_before snapshot.
        match apply_edit(working.section(section), &edit) {
            Some(updated) => {
                working.set_section(section, updated);
                applied.push(id);
            }
            None => skipped.push(SkippedRecommendation {
                id,
                reason: SkipReason::Conflict,
            }),
        }
    }

    if applied.is_empty() {
        return Ok(ApplyOutcome {
            applied,
            skipped,
            new_version: None,
            profile: working,
        });
    }

    store.append_version(ProfileVersion {
        project_id,
        version: next_version,
        sections: working.clone(),
        source: VersionSource::Recommendation,
        created_at: now.to_string(),
    })?;

    for id in &applied {
        if let Some(rec) = store.recommendation_mut(id) {
            rec.status = RecStatus::Applied;
        }
    }

    Ok(ApplyOutcome {
        applied,
        skipped,
        new_version: Some(next_version),
        profile: working,
    })
}

/// Dismiss a pending recommendation. Calling this on an applied or already
/// dismissed recommendation is an error so callers can detect stale UI
/// state, not a silent no-op.
pub(crate) fn dismiss_in_store(store: &mut ProfileStore, rec_id: &str) -> Result<(), OpError> {
    let rec = store
        .recommendation_mut(rec_id)
        .ok_or_else(|| OpError::RecommendationNotFound(rec_id.to_string()))?;
    if rec.status != RecStatus::Pending {
        return Err(OpError::InvalidState {
            id: rec_id.to_string(),
            status: rec.status,
        });
    }
    rec.status = RecStatus::Dismissed;
    Ok(())
}
