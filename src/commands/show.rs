use anyhow::Result;
use std::path::Path;

use profilekit::ops;

pub fn run(dir: &Path, json: bool) -> Result<()> {
    let snapshot = ops::current_profile(dir)?;

    if json {
        let output = serde_json::json!({
            "version": snapshot.version,
            "profile": snapshot.profile,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Profile (version {})", snapshot.version);
    for (key, content) in snapshot.profile.sections() {
        println!();
        println!("## {}", key.label());
        if content.is_empty() {
            println!("(empty)");
        } else {
            println!("{content}");
        }
    }
    Ok(())
}
