use anyhow::Result;
use std::path::Path;

use profilekit::ops;
use profilekit::profile::VersionSource;

pub fn run(dir: &Path, json: bool) -> Result<()> {
    let versions = ops::list_versions(dir)?;

    if json {
        let output: Vec<_> = versions
            .iter()
            .map(|v| {
                serde_json::json!({
                    "version": v.version,
                    "source": v.source,
                    "created_at": v.created_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for v in &versions {
        let source = match v.source {
            VersionSource::Interview => "interview",
            VersionSource::Manual => "manual",
            VersionSource::Recommendation => "recommendation",
            VersionSource::Rollback => "rollback",
        };
        println!("v{:<4} {:<16} {}", v.version, source, v.created_at);
    }
    Ok(())
}
