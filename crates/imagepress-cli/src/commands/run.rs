use std::path::Path;

use imagepress_build::repo;
use imagepress_container::{PodmanClient, RegistrySettings};
use imagepress_core::{BuildStamp, Manifest};

use super::pipeline::{self, FailurePolicy};

/// The full pipeline in one process: stamp, build, publish.
///
/// The stamp and the built-image map flow forward in memory, so every
/// stage reports the same commit even if the branch moves mid-run. The
/// stamp is still persisted for standalone commands and CI logs.
///
/// Registry settings are resolved before any image is built: a publish
/// that cannot succeed should not cost a build first.
pub async fn run(targets: &[String], skip_publish: bool, keep_going: bool) -> anyhow::Result<()> {
    let info = repo::require_toplevel(Path::new("."))?;
    let root = Path::new(".");

    let manifest = Manifest::load(root)?;
    manifest.validate(root)?;
    let components = manifest.select(targets)?;
    let policy = FailurePolicy::from_keep_going(keep_going);

    let settings = if skip_publish {
        None
    } else {
        Some(RegistrySettings::resolve(&manifest.registry)?)
    };

    let stamp = BuildStamp::now(info.head);
    let path = stamp.write(root)?;
    println!("Stamped {} (commit {})", stamp.timestamp, stamp.commit);
    println!("  {}", path.display());
    println!();

    let client = PodmanClient::new();
    let (build_summary, built) = pipeline::run_build(
        &client,
        root,
        &manifest.local.namespace,
        &stamp,
        &components,
        policy,
    )
    .await;
    build_summary.print("Build");

    if build_summary.failures() > 0 && policy == FailurePolicy::Abort {
        anyhow::bail!("{} component build(s) failed", build_summary.failures());
    }

    let Some(settings) = settings else {
        if build_summary.failures() > 0 {
            anyhow::bail!("{} component build(s) failed", build_summary.failures());
        }
        println!();
        println!("Publish skipped (--skip-publish).");
        return Ok(());
    };

    println!();
    let publish_summary = pipeline::run_publish(&client, &settings, &stamp, &built, policy).await?;
    publish_summary.print("Publish");

    let failures = build_summary.failures() + publish_summary.failures();
    if failures > 0 {
        anyhow::bail!("{failures} pipeline step(s) failed");
    }

    println!();
    println!("Pipeline complete: {} component(s) published.", built.len());
    Ok(())
}
