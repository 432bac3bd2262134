use anyhow::Result;
use std::path::Path;

use profilekit::config::Config;
use profilekit::ops;
use profilekit::profile::AgentProfile;

#[allow(clippy::too_many_arguments)]
pub fn run(
    dir: &Path,
    project_id: &str,
    identity_role: Option<&str>,
    communication_style: Option<&str>,
    content_priorities: Option<&str>,
    engagement_approach: Option<&str>,
    key_framings: Option<&str>,
) -> Result<()> {
    let sections = AgentProfile {
        identity_role: identity_role.unwrap_or_default().to_string(),
        communication_style: communication_style.unwrap_or_default().to_string(),
        content_priorities: content_priorities.unwrap_or_default().to_string(),
        engagement_approach: engagement_approach.unwrap_or_default().to_string(),
        key_framings: key_framings.unwrap_or_default().to_string(),
    };

    let snapshot = ops::init(dir, project_id, sections)?;

    let mut config = Config::default();
    config.project.id = project_id.to_string();
    config.save(dir)?;

    println!(
        "Initialized profile '{}' at {} (version {})",
        project_id,
        dir.display(),
        snapshot.version
    );
    Ok(())
}
