use anyhow::{Context, Result};
use std::path::Path;

use profilekit::diff::diff_words;
use profilekit::store::{load_store, store_path};

use super::{parse_section, render_diff};

pub fn run(dir: &Path, section: &str, from: u32, to: Option<u32>, json: bool) -> Result<()> {
    let key = parse_section(section)?;

    let path = store_path(dir);
    if !path.exists() {
        anyhow::bail!("Profile not initialized. Run 'pk init' first.");
    }
    let store = load_store(&path).context("Failed to load profile store")?;

    let to = match to {
        Some(v) => v,
        None => store
            .current_version()
            .map(|v| v.version)
            .context("Profile store is empty")?,
    };
    let before = store
        .version(from)
        .ok_or_else(|| anyhow::anyhow!("Version {} does not exist", from))?
        .sections
        .section(key);
    let after = store
        .version(to)
        .ok_or_else(|| anyhow::anyhow!("Version {} does not exist", to))?
        .sections
        .section(key);

    let spans = diff_words(before, after);

    if json {
        let output = serde_json::json!({
            "section": key,
            "from": from,
            "to": to,
            "spans": spans,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} (v{} -> v{})", key.label(), from, to);
        println!("{}", render_diff(&spans));
    }
    Ok(())
}
