use std::path::Path;

use imagepress_build::{context, repo};
use imagepress_core::{Error, Manifest};

/// Remove the scratch directory and any stamp copies staged into
/// component contexts. Tolerates a missing manifest and skips
/// validation, so a half-dismantled tree can still be cleaned.
pub async fn clean() -> anyhow::Result<()> {
    let root = repo::toplevel(Path::new("."))?;

    // No manifest means nothing staged to look for; the scratch
    // directory can still go.
    let components = match Manifest::load(&root) {
        Ok(manifest) => manifest.select(&[])?,
        Err(Error::ManifestMissing(_)) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let removed = context::clean(&root, &components)?;
    if removed.is_empty() {
        println!("Nothing to clean.");
    } else {
        for path in &removed {
            println!("Removed {}", path.display());
        }
    }

    Ok(())
}
