use anyhow::Result;
use std::path::Path;

use profilekit::ops;

pub fn run(dir: &Path, target: u32, json: bool) -> Result<()> {
    let snapshot = ops::rollback(dir, target)?;

    if json {
        let output = serde_json::json!({
            "restored": target,
            "version": snapshot.version,
            "profile": snapshot.profile,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Restored version {} as version {}",
            target, snapshot.version
        );
    }
    Ok(())
}
