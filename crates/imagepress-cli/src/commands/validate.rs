use std::path::Path;

use imagepress_build::repo;
use imagepress_core::Manifest;

/// Check the manifest against the repository layout without building
/// anything: every component needs a unique valid name, an existing
/// directory, and an existing descriptor.
pub async fn validate() -> anyhow::Result<()> {
    let root = repo::toplevel(Path::new("."))?;

    let manifest = Manifest::load(&root)?;
    manifest.validate(&root)?;
    let components = manifest.select(&[])?;

    println!("Manifest OK: {} component(s)", components.len());
    for component in &components {
        println!(
            "  {:<20} dir={} descriptor={}",
            component.name,
            component.dir.display(),
            component.descriptor.display()
        );
    }

    Ok(())
}
