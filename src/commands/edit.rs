use anyhow::Result;
use std::path::Path;

use profilekit::ops;

use super::parse_section;

pub fn run(dir: &Path, section: &str, content: &str, json: bool) -> Result<()> {
    let key = parse_section(section)?;
    let snapshot = ops::manual_edit(dir, key, content)?;

    if json {
        let output = serde_json::json!({
            "version": snapshot.version,
            "section": key,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Updated {} (now version {})",
            key.label(),
            snapshot.version
        );
    }
    Ok(())
}
