use anyhow::{Context, Result};
use std::path::Path;

use profilekit::ops;
use profilekit::store::{load_store, store_path};

pub fn run(dir: &Path, set_id: Option<&str>, json: bool) -> Result<()> {
    let set_id = match set_id {
        Some(id) => id.to_string(),
        None => {
            let path = store_path(dir);
            if !path.exists() {
                anyhow::bail!("Profile not initialized. Run 'pk init' first.");
            }
            let store = load_store(&path).context("Failed to load profile store")?;
            match store.latest_set() {
                Some(set) => set.id.clone(),
                None => anyhow::bail!("No recommendation sets. Run 'pk generate' first."),
            }
        }
    };

    let outcome = ops::apply_all_recommendations(dir, &set_id)?;

    if json {
        let output = serde_json::json!({
            "set_id": set_id,
            "applied": outcome.applied,
            "skipped": outcome.skipped,
            "new_version": outcome.new_version,
            "profile": outcome.profile,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if outcome.applied.is_empty() && outcome.skipped.is_empty() {
        println!("No pending recommendations in set {set_id}");
        return Ok(());
    }

    for id in &outcome.applied {
        println!("Applied {id}");
    }
    for skip in &outcome.skipped {
        let reason = match skip.reason {
            profilekit::apply::SkipReason::Conflict => "conflict",
        };
        println!("Skipped {} ({reason})", skip.id);
    }
    match outcome.new_version {
        Some(v) => println!(
            "{} applied, {} skipped. Profile is now version {}",
            outcome.applied_count(),
            outcome.skipped.len(),
            v
        ),
        None => println!("Nothing applied; profile unchanged"),
    }
    Ok(())
}
