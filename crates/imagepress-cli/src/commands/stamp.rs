use std::path::Path;

use imagepress_build::repo;
use imagepress_core::BuildStamp;

/// Record the build identity for the repository: current UTC time plus
/// the abbreviated commit of `HEAD`, persisted under the scratch
/// directory at the repository top level.
///
/// Runs from anywhere inside the repository; re-running overwrites the
/// previous stamp.
pub async fn stamp() -> anyhow::Result<()> {
    let info = repo::discover(Path::new("."))?;

    let stamp = BuildStamp::now(info.head);
    let path = stamp.write(&info.toplevel)?;

    println!("Stamped {} (commit {})", stamp.timestamp, stamp.commit);
    println!("  {}", path.display());

    Ok(())
}
