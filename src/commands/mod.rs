pub mod apply;
pub mod comment;
pub mod diff_cmd;
pub mod dismiss;
pub mod edit;
pub mod generate;
pub mod init;
pub mod recs;
pub mod rollback;
pub mod show;
pub mod versions;

use profilekit::diff::{DiffOp, DiffSpan};
use profilekit::profile::SectionKey;

/// Parse a section name argument, listing the valid names on failure.
pub fn parse_section(name: &str) -> anyhow::Result<SectionKey> {
    SectionKey::parse(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown section: '{}'. Valid sections: {}",
            name,
            SectionKey::ALL
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}

/// Render a word diff for terminal output: added words as `+word`,
/// removed words as `-word`, unchanged text as-is.
pub fn render_diff(spans: &[DiffSpan]) -> String {
    let mut parts = Vec::new();
    for span in spans {
        for word in span.text.split_whitespace() {
            match span.op {
                DiffOp::Unchanged => parts.push(word.to_string()),
                DiffOp::Added => parts.push(format!("+{word}")),
                DiffOp::Removed => parts.push(format!("-{word}")),
            }
        }
    }
    parts.join(" ")
}
