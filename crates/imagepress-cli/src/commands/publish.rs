use std::path::Path;

use imagepress_build::repo;
use imagepress_container::{PodmanClient, RegistrySettings};
use imagepress_core::{BuildStamp, Manifest};

use super::pipeline::{self, BuiltImages, FailurePolicy};

/// Tag and push previously built images to the remote registry.
///
/// Registry settings are resolved up front, so missing credentials fail
/// before podman is invoked at all. The local references are rebuilt
/// from the manifest and checked against local image storage, since a
/// standalone `publish` has no build stage to hand them over.
pub async fn publish(targets: &[String], keep_going: bool) -> anyhow::Result<()> {
    repo::require_toplevel(Path::new("."))?;
    let root = Path::new(".");

    let manifest = Manifest::load(root)?;
    manifest.validate(root)?;
    let components = manifest.select(targets)?;

    let stamp = BuildStamp::load(root)?;
    let settings = RegistrySettings::resolve(&manifest.registry)?;

    let client = PodmanClient::new();
    let images = BuiltImages::from_components(&manifest.local.namespace, &components);
    for (component, local) in images.iter() {
        if !client.image_exists(local).await {
            anyhow::bail!(
                "local image '{local}' for component '{}' not found — run `imagepress build` first",
                component.name
            );
        }
    }

    let summary = pipeline::run_publish(
        &client,
        &settings,
        &stamp,
        &images,
        FailurePolicy::from_keep_going(keep_going),
    )
    .await?;

    summary.print("Publish");
    if summary.failures() > 0 {
        anyhow::bail!("{} component publish(es) failed", summary.failures());
    }
    Ok(())
}
