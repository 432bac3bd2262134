use anyhow::Result;
use std::path::Path;

use profilekit::ops;

pub fn run(dir: &Path, id: &str) -> Result<()> {
    ops::dismiss_recommendation(dir, id)?;
    println!("Dismissed {id}");
    Ok(())
}
