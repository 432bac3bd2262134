use anyhow::Result;
use std::path::Path;

use profilekit::diff::diff_words;
use profilekit::ops;
use profilekit::recommendation::Edit;

use super::render_diff;

pub fn run(dir: &Path, set_filter: Option<&str>, show_diff: bool, json: bool) -> Result<()> {
    let pending = ops::list_pending_recommendations(dir)?;
    let pending: Vec<_> = pending
        .into_iter()
        .filter(|r| set_filter.is_none_or(|s| r.set_id == s))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }

    if pending.is_empty() {
        println!("No pending recommendations");
        return Ok(());
    }

    for rec in &pending {
        println!(
            "{} [{}] {} (set {})",
            rec.id,
            rec.edit.type_str(),
            rec.target_section.label(),
            rec.set_id
        );
        match &rec.edit {
            Edit::Add { added_content } => println!("  add: {added_content}"),
            Edit::Remove { removed_content } => println!("  remove: {removed_content}"),
            Edit::Modify {
                modified_from,
                modified_to,
            } => {
                println!("  from: {modified_from}");
                println!("  to:   {modified_to}");
            }
        }
        if !rec.related_comment_ids.is_empty() {
            println!("  evidence: {}", rec.related_comment_ids.join(", "));
        }
        if show_diff {
            let spans = diff_words(&rec.preview_before, &rec.preview_after);
            println!("  diff: {}", render_diff(&spans));
        }
        println!();
    }
    Ok(())
}
