//! The operation surface exposed to the rest of the system.
//!
//! Every mutating operation holds the project's mutation lock across its
//! whole load-modify-save cycle, then commits through the store's single
//! atomic save. Mutating operations return the resulting profile snapshot
//! and version number so callers can resynchronize without a separate read.

use chrono::Utc;
use std::path::Path;
use thiserror::Error;

use crate::analyzer::{Analyzer, AnalyzerError, AnalyzerRequest};
use crate::apply::{ApplyOutcome, apply_all_in_store, dismiss_in_store};
use crate::config::Config;
use crate::diff::normalize_ws;
use crate::evidence::{self, EvidenceError};
use crate::generate::{GenerateOutcome, build_set, empty_outcome};
use crate::profile::{AgentProfile, ProfileVersion, SectionKey, VersionSource};
use crate::recommendation::{RecStatus, Recommendation};
use crate::store::{
    ProfileStore, StoreError, load_store, lock_mutations, save_store, store_path,
};

#[derive(Error, Debug)]
pub enum OpError {
    #[error("Profile not initialized. Run 'pk init' first.")]
    NotInitialized,
    #[error("Profile already initialized")]
    AlreadyInitialized,
    #[error("Recommendation '{0}' not found")]
    RecommendationNotFound(String),
    #[error("Recommendation set '{0}' not found")]
    SetNotFound(String),
    #[error("Version {0} does not exist")]
    VersionNotFound(u32),
    #[error("Recommendation '{id}' is {status:?}, not pending")]
    InvalidState { id: String, status: RecStatus },
    #[error("Edit does not change the section content")]
    NoChange,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Evidence(#[from] EvidenceError),
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

/// The current profile and its version number, returned by every mutating
/// operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSnapshot {
    pub version: u32,
    pub profile: AgentProfile,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn load(dir: &Path) -> Result<ProfileStore, OpError> {
    let path = store_path(dir);
    if !path.exists() {
        return Err(OpError::NotInitialized);
    }
    Ok(load_store(&path)?)
}

fn snapshot(store: &ProfileStore) -> Result<ProfileSnapshot, OpError> {
    let current = store.current_version().ok_or(OpError::NotInitialized)?;
    Ok(ProfileSnapshot {
        version: current.version,
        profile: current.sections.clone(),
    })
}

/// Create the project: version 1 (source=interview) from the completed
/// interview's sections.
pub fn init(
    dir: &Path,
    project_id: &str,
    sections: AgentProfile,
) -> Result<ProfileSnapshot, OpError> {
    std::fs::create_dir_all(dir).map_err(StoreError::Io)?;
    let path = store_path(dir);
    if path.exists() {
        return Err(OpError::AlreadyInitialized);
    }

    let _guard = lock_mutations(dir)?;
    let mut store = ProfileStore::new();
    store.append_version(ProfileVersion {
        project_id: project_id.to_string(),
        version: 1,
        sections,
        source: VersionSource::Interview,
        created_at: now(),
    })?;
    save_store(&store, &path)?;
    snapshot(&store)
}

/// The derived profile view: content of the current version.
pub fn current_profile(dir: &Path) -> Result<ProfileSnapshot, OpError> {
    snapshot(&load(dir)?)
}

/// All versions, ascending.
pub fn list_versions(dir: &Path) -> Result<Vec<ProfileVersion>, OpError> {
    Ok(load(dir)?.versions().to_vec())
}

/// All pending recommendations, in creation order.
pub fn list_pending_recommendations(dir: &Path) -> Result<Vec<Recommendation>, OpError> {
    Ok(load(dir)?
        .pending_recommendations()
        .into_iter()
        .cloned()
        .collect())
}

/// Direct owner edit of one section: appends a manual version. Content
/// identical to the current section (after whitespace normalization) is
/// rejected rather than recorded as a noise version.
pub fn manual_edit(
    dir: &Path,
    section: SectionKey,
    content: &str,
) -> Result<ProfileSnapshot, OpError> {
    let _guard = lock_mutations(dir)?;
    let mut store = load(dir)?;
    let current = store.current_version().ok_or(OpError::NotInitialized)?;

    if normalize_ws(current.sections.section(section)) == normalize_ws(content) {
        return Err(OpError::NoChange);
    }

    let mut sections = current.sections.clone();
    sections.set_section(section, content.to_string());
    let version = ProfileVersion {
        project_id: current.project_id.clone(),
        version: current.version + 1,
        sections,
        source: VersionSource::Manual,
        created_at: now(),
    };
    store.append_version(version)?;
    save_store(&store, store_path(dir))?;
    snapshot(&store)
}

/// Run the Generator: gather evidence per the configured policy, call the
/// analyzer once (without holding any lock), validate its drafts, and
/// persist the resulting set with its recommendations pending.
///
/// When the policy selects no comments the analyzer is not called at all;
/// an empty aligned-by-definition set is persisted instead. A timed-out or
/// failed analyzer call persists nothing.
pub fn generate_recommendations(
    dir: &Path,
    analyzer: &dyn Analyzer,
) -> Result<GenerateOutcome, OpError> {
    let config = Config::load(dir).unwrap_or_default();

    // Read-only snapshot for the (potentially slow) analyzer call.
    let store = load(dir)?;
    let profile = store
        .current_profile()
        .ok_or(OpError::NotInitialized)?
        .clone();

    let comments = evidence::load_comments(evidence::comments_path(dir))?;
    let selected = evidence::select_evidence(comments, store.sets(), config.evidence.policy);
    drop(store);

    let reply = if selected.is_empty() {
        None
    } else {
        let request = AnalyzerRequest {
            profile,
            evidence: selected.clone(),
        };
        Some(analyzer.analyze(&request)?)
    };

    // Persist under the mutation lock, re-reading the store so validation
    // and previews run against the profile as it stands at commit time.
    let _guard = lock_mutations(dir)?;
    let mut store = load(dir)?;
    let current = store.current_version().ok_or(OpError::NotInitialized)?;
    let project_id = current.project_id.clone();
    let fresh_profile = current.sections.clone();
    let timestamp = now();

    let outcome = match reply {
        Some(reply) => build_set(&project_id, &fresh_profile, &reply, &selected, &timestamp),
        None => empty_outcome(&project_id, &timestamp),
    };

    store.add_set(outcome.set.clone());
    for rec in &outcome.recommendations {
        store.add_recommendation(rec.clone());
    }
    save_store(&store, store_path(dir))?;

    Ok(outcome)
}

/// Apply every pending recommendation in a set. See `apply::ApplyOutcome`
/// for the result shape; partial application at the recommendation level
/// (some applied, some skipped) is a normal outcome, but the commit itself
/// is all-or-nothing.
pub fn apply_all_recommendations(dir: &Path, set_id: &str) -> Result<ApplyOutcome, OpError> {
    let _guard = lock_mutations(dir)?;
    let mut store = load(dir)?;
    let timestamp = now();

    let outcome = apply_all_in_store(&mut store, set_id, &timestamp)?;
    if outcome.new_version.is_some() {
        save_store(&store, store_path(dir))?;
    }
    Ok(outcome)
}

/// Dismiss one pending recommendation.
pub fn dismiss_recommendation(dir: &Path, rec_id: &str) -> Result<(), OpError> {
    let _guard = lock_mutations(dir)?;
    let mut store = load(dir)?;
    dismiss_in_store(&mut store, rec_id)?;
    save_store(&store, store_path(dir))?;
    Ok(())
}

/// Restore an earlier version's content by appending a new version
/// (source=rollback). History is never truncated: the counter keeps
/// advancing, and rolling back to the current version is legal (it just
/// creates a duplicate snapshot).
pub fn rollback(dir: &Path, target_version: u32) -> Result<ProfileSnapshot, OpError> {
    let _guard = lock_mutations(dir)?;
    let mut store = load(dir)?;

    let target = store
        .version(target_version)
        .ok_or(OpError::VersionNotFound(target_version))?;
    let sections = target.sections.clone();
    let current = store.current_version().ok_or(OpError::NotInitialized)?;

    let version = ProfileVersion {
        project_id: current.project_id.clone(),
        version: current.version + 1,
        sections,
        source: VersionSource::Rollback,
        created_at: now(),
    };
    store.append_version(version)?;
    save_store(&store, store_path(dir))?;
    snapshot(&store)
}
