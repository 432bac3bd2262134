//! External analyzer boundary.
//!
//! The analyzer is a large-language-model CLI invoked once per generation
//! run (non-interactive `--print` mode). Its output is untrusted free-form
//! text that should contain a JSON object; parsing here is tolerant of
//! markdown fences and surrounding prose, but individual drafts are never
//! coerced - validation happens downstream in `generate`.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::evidence::TestComment;
use crate::profile::AgentProfile;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("analyzer call exceeded time budget of {0} seconds")]
    Timeout(u64),
    #[error("analyzer command failed (exit code {code:?}):\n{stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("analyzer output contained no parseable JSON object")]
    Unparseable,
    #[error("failed to run analyzer command '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("IO error talking to analyzer: {0}")]
    Io(#[from] std::io::Error),
}

/// What the Generator hands the analyzer: the profile as it stands plus the
/// evidence comments to analyze.
#[derive(Debug, Clone)]
pub struct AnalyzerRequest {
    pub profile: AgentProfile,
    pub evidence: Vec<TestComment>,
}

/// One draft recommendation as the analyzer emitted it. Every field is
/// optional at this boundary; required-field checks per declared type
/// happen in validation, where non-conforming drafts are dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDraft {
    #[serde(rename = "type")]
    pub draft_type: Option<String>,
    pub target_section: Option<String>,
    pub added_content: Option<String>,
    pub removed_content: Option<String>,
    pub modified_from: Option<String>,
    pub modified_to: Option<String>,
    #[serde(default)]
    pub related_comment_ids: Vec<String>,
}

/// The analyzer's whole reply: draft recommendations plus a summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerReply {
    #[serde(default)]
    pub recommendations: Vec<RawDraft>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub config_alignment: Option<String>,
}

/// Anything that can play the analyzer role. The production implementation
/// shells out to an LLM CLI; tests substitute a mock.
pub trait Analyzer {
    fn analyze(&self, request: &AnalyzerRequest) -> Result<AnalyzerReply, AnalyzerError>;
}

/// Render the analyzer prompt: current profile sections, evidence comments,
/// and the output contract.
pub fn render_prompt(request: &AnalyzerRequest) -> String {
    let mut out = String::new();

    out.push_str(
        "You are reviewing the behavioral profile of an AI document assistant \
         against reviewer feedback from test sessions.\n\n",
    );

    out.push_str("## Current Profile\n\n");
    for (key, content) in request.profile.sections() {
        out.push_str(&format!("### {} ({})\n", key.label(), key.as_str()));
        if content.trim().is_empty() {
            out.push_str("(empty)\n\n");
        } else {
            out.push_str(&format!("{}\n\n", content));
        }
    }

    out.push_str("## Reviewer Feedback\n\n");
    for comment in &request.evidence {
        out.push_str(&format!("- [{}] {}", comment.id, comment.text));
        if let Some(ref excerpt) = comment.response_excerpt {
            out.push_str(&format!(" (about: \"{}\")", excerpt));
        }
        out.push('\n');
    }

    out.push_str(
        r#"
## Output Format

Respond with only a JSON object:

{
  "summary": "<one-paragraph analysis of how the profile aligns with the feedback>",
  "config_alignment": "good" | "needs-tuning",
  "recommendations": [
    {
      "type": "add" | "remove" | "modify",
      "target_section": "identity-role" | "communication-style" | "content-priorities" | "engagement-approach" | "key-framings",
      "added_content": "<required for add>",
      "removed_content": "<required for remove; must quote existing section text>",
      "modified_from": "<required for modify; must quote existing section text>",
      "modified_to": "<required for modify>",
      "related_comment_ids": ["<comment id>"]
    }
  ]
}

If the profile already matches the feedback, return an empty recommendations
array with "config_alignment": "good".
"#,
    );

    out
}

/// Extract a JSON object from potentially noisy LLM output.
///
/// The analyzer is instructed to return only JSON, but it may wrap it in
/// markdown fences or include leading/trailing commentary. This function
/// finds the first `{...}` that parses as valid JSON.
pub fn extract_json(raw: &str) -> Option<String> {
    // Try the whole string first (ideal case)
    let trimmed = raw.trim();
    if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Some(trimmed.to_string());
    }

    // Strip markdown code fences if present
    let stripped = if trimmed.starts_with("```") {
        let inner = trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        if serde_json::from_str::<serde_json::Value>(inner).is_ok() {
            return Some(inner.to_string());
        }
        inner
    } else {
        trimmed
    };

    // Find the first { and last } and try to parse
    if let Some(start) = stripped.find('{') {
        if let Some(end) = stripped.rfind('}') {
            let candidate = &stripped[start..=end];
            if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
                return Some(candidate.to_string());
            }
        }
    }

    None
}

/// Parse raw analyzer output into a reply. Fails only when no JSON object
/// can be found or the object is not reply-shaped at all; malformed
/// individual drafts survive as `RawDraft`s with missing fields and are
/// dropped later.
pub fn parse_reply(raw: &str) -> Result<AnalyzerReply, AnalyzerError> {
    let json = extract_json(raw).ok_or(AnalyzerError::Unparseable)?;
    serde_json::from_str(&json).map_err(|_| AnalyzerError::Unparseable)
}

/// Production analyzer: spawns an LLM CLI in non-interactive mode with a
/// wall-clock timeout. The call holds no store locks - it only reads the
/// snapshot baked into the request.
pub struct CommandAnalyzer {
    command: String,
    model: Option<String>,
    timeout: Duration,
}

impl CommandAnalyzer {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            model: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Analyzer for CommandAnalyzer {
    fn analyze(&self, request: &AnalyzerRequest) -> Result<AnalyzerReply, AnalyzerError> {
        let prompt = render_prompt(request);

        let mut cmd = Command::new(&self.command);
        if let Some(ref model) = self.model {
            cmd.arg("--model").arg(model);
        }
        cmd.arg("--print")
            .arg(&prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| AnalyzerError::Spawn {
            command: self.command.clone(),
            source: e,
        })?;

        // Drain stdout/stderr on threads so a chatty child cannot block on
        // a full pipe while we poll for exit.
        let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr was piped");
        let stdout_thread = std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stdout_pipe.read_to_string(&mut buf);
            buf
        });
        let stderr_thread = std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr_pipe.read_to_string(&mut buf);
            buf
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AnalyzerError::Timeout(self.timeout.as_secs()));
            }
            std::thread::sleep(Duration::from_millis(50));
        };

        let stdout = stdout_thread.join().unwrap_or_default();
        let stderr = stderr_thread.join().unwrap_or_default();

        if !status.success() {
            return Err(AnalyzerError::Failed {
                code: status.code(),
                stderr,
            });
        }

        parse_reply(&stdout)
    }
}
