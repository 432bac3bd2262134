//! Reviewer feedback comments: the evidence recommendations are generated
//! from.
//!
//! Comments are produced by the surrounding platform's feedback sessions
//! and are read-only to this subsystem; they live in `comments.jsonl` in
//! the project directory. `append_comment` exists so evidence can be seeded
//! from the CLI, but nothing here ever mutates or deletes a comment.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::recommendation::RecommendationSet;

#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error on line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
}

/// A reviewer comment attached to one AI response during a feedback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestComment {
    pub id: String,
    pub project_id: String,
    /// Excerpt of the AI response the comment refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_excerpt: Option<String>,
    pub text: String,
    /// ISO 8601 / RFC 3339 timestamp
    pub created_at: String,
}

/// Which comments feed a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EvidencePolicy {
    /// Every comment ever recorded for the project.
    All,
    /// Only comments no prior recommendation set has consumed.
    #[default]
    SinceLastSet,
}

/// Path of the evidence file inside a project directory.
pub fn comments_path(dir: &Path) -> PathBuf {
    dir.join("comments.jsonl")
}

/// Load all comments. A missing file means no evidence yet, not an error.
pub fn load_comments<P: AsRef<Path>>(path: P) -> Result<Vec<TestComment>, EvidenceError> {
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let reader = BufReader::new(file);
    let mut comments = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let comment: TestComment =
            serde_json::from_str(trimmed).map_err(|e| EvidenceError::Json {
                line: line_num + 1,
                source: e,
            })?;
        comments.push(comment);
    }

    Ok(comments)
}

/// Append one comment to the evidence file.
pub fn append_comment<P: AsRef<Path>>(
    path: P,
    comment: &TestComment,
) -> Result<(), EvidenceError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    let json = serde_json::to_string(comment).map_err(|e| EvidenceError::Json {
        line: 0,
        source: e,
    })?;
    writeln!(file, "{}", json)?;
    Ok(())
}

/// Select the comments a new generation run should consume, per policy.
pub fn select_evidence(
    comments: Vec<TestComment>,
    sets: &[RecommendationSet],
    policy: EvidencePolicy,
) -> Vec<TestComment> {
    match policy {
        EvidencePolicy::All => comments,
        EvidencePolicy::SinceLastSet => {
            let covered: std::collections::HashSet<&str> = sets
                .iter()
                .flat_map(|s| s.comment_ids.iter().map(|id| id.as_str()))
                .collect();
            comments
                .into_iter()
                .filter(|c| !covered.contains(c.id.as_str()))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_comment(id: &str, text: &str) -> TestComment {
        TestComment {
            id: id.to_string(),
            project_id: "p1".to_string(),
            response_excerpt: None,
            text: text.to_string(),
            created_at: "2024-01-15T10:30:00Z".to_string(),
        }
    }

    fn make_set(id: &str, comment_ids: &[&str]) -> RecommendationSet {
        RecommendationSet {
            id: id.to_string(),
            project_id: "p1".to_string(),
            generated_at: "2024-01-15T10:30:00Z".to_string(),
            analysis_summary: Default::default(),
            comment_ids: comment_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let comments = load_comments("/nonexistent/comments.jsonl").unwrap();
        assert!(comments.is_empty());
    }

    #[test]
    fn test_append_and_load_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        append_comment(file.path(), &make_comment("c1", "Too verbose")).unwrap();
        append_comment(file.path(), &make_comment("c2", "Missing risk angle")).unwrap();

        let comments = load_comments(file.path()).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "Too verbose");
        assert_eq!(comments[1].id, "c2");
    }

    #[test]
    fn test_load_invalid_json_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "garbage").unwrap();

        let result = load_comments(file.path());
        assert!(matches!(
            result.unwrap_err(),
            EvidenceError::Json { line: 1, .. }
        ));
    }

    #[test]
    fn test_select_evidence_all_policy() {
        let comments = vec![make_comment("c1", "a"), make_comment("c2", "b")];
        let sets = vec![make_set("set-1", &["c1"])];

        let selected = select_evidence(comments, &sets, EvidencePolicy::All);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_select_evidence_since_last_set_skips_covered() {
        let comments = vec![
            make_comment("c1", "a"),
            make_comment("c2", "b"),
            make_comment("c3", "c"),
        ];
        let sets = vec![make_set("set-1", &["c1"]), make_set("set-2", &["c2"])];

        let selected = select_evidence(comments, &sets, EvidencePolicy::SinceLastSet);
        let ids: Vec<&str> = selected.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3"]);
    }

    #[test]
    fn test_select_evidence_no_prior_sets_takes_everything() {
        let comments = vec![make_comment("c1", "a")];
        let selected = select_evidence(comments, &[], EvidencePolicy::SinceLastSet);
        assert_eq!(selected.len(), 1);
    }
}
