use std::path::Path;

use imagepress_build::repo;
use imagepress_container::PodmanClient;
use imagepress_core::{BuildStamp, Manifest};

use super::pipeline::{self, FailurePolicy};

/// Build the selected component images against the persisted stamp.
///
/// Must run from the repository top level: the whole tree is the build
/// context, so descriptors can pull in shared files from anywhere in it.
pub async fn build(targets: &[String], keep_going: bool) -> anyhow::Result<()> {
    let info = repo::require_toplevel(Path::new("."))?;
    let root = Path::new(".");

    let manifest = Manifest::load(root)?;
    manifest.validate(root)?;
    let components = manifest.select(targets)?;

    let stamp = BuildStamp::load(root)?;
    if stamp.commit != info.head {
        tracing::warn!(
            stamp = %stamp.commit,
            head = %info.head,
            "HEAD has moved since the stamp was taken; images will carry the stamp commit"
        );
    }

    let client = PodmanClient::new();
    let (summary, _) = pipeline::run_build(
        &client,
        root,
        &manifest.local.namespace,
        &stamp,
        &components,
        FailurePolicy::from_keep_going(keep_going),
    )
    .await;

    summary.print("Build");
    if summary.failures() > 0 {
        anyhow::bail!("{} component build(s) failed", summary.failures());
    }
    Ok(())
}
