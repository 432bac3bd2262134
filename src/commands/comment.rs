use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use profilekit::config::Config;
use profilekit::evidence::{TestComment, append_comment, comments_path};
use profilekit::recommendation::short_hash;

pub fn run(dir: &Path, text: &str, excerpt: Option<&str>, id: Option<&str>) -> Result<()> {
    let config = Config::load(dir).unwrap_or_default();
    let now = Utc::now().to_rfc3339();

    let id = match id {
        Some(id) => id.to_string(),
        None => format!("c-{}", short_hash(&[&config.project.id, &now, text])),
    };

    let comment = TestComment {
        id: id.clone(),
        project_id: config.project.id,
        response_excerpt: excerpt.map(|e| e.to_string()),
        text: text.to_string(),
        created_at: now,
    };
    append_comment(comments_path(dir), &comment)?;

    println!("Recorded comment {id}");
    Ok(())
}
