use std::fmt;
use std::path::Path;

use imagepress_build::repo;
use imagepress_container::{PodmanClient, RegistrySettings};
use imagepress_core::{BuildStamp, Manifest};

/// Readiness report for everything the pipeline touches.
#[derive(Debug, Default)]
struct DoctorReport {
    git: CheckResult,
    podman: CheckResult,
    manifest: CheckResult,
    registry: CheckResult,
}

impl DoctorReport {
    fn all_passed(&self) -> bool {
        self.git.passed && self.podman.passed && self.manifest.passed && self.registry.passed
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  [{}] git       {}", self.git.icon(), self.git.detail)?;
        writeln!(f, "  [{}] podman    {}", self.podman.icon(), self.podman.detail)?;
        writeln!(f, "  [{}] manifest  {}", self.manifest.icon(), self.manifest.detail)?;
        write!(f, "  [{}] registry  {}", self.registry.icon(), self.registry.detail)
    }
}

#[derive(Debug, Default)]
struct CheckResult {
    passed: bool,
    detail: String,
}

impl CheckResult {
    fn ok(detail: impl Into<String>) -> Self {
        Self { passed: true, detail: detail.into() }
    }

    fn fail(detail: impl Into<String>) -> Self {
        Self { passed: false, detail: detail.into() }
    }

    fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

/// Check the tooling and configuration the pipeline depends on: git and
/// the repository, the podman CLI, the manifest, and registry settings.
pub async fn doctor() -> anyhow::Result<()> {
    let mut report = DoctorReport::default();

    let root = match repo::discover(Path::new(".")) {
        Ok(info) => {
            report.git = CheckResult::ok(format!("repository at {}", info.toplevel.display()));
            Some(info.toplevel)
        }
        Err(e) => {
            report.git = CheckResult::fail(e.to_string());
            None
        }
    };

    let client = PodmanClient::new();
    report.podman = match client.version().await {
        Ok(version) => CheckResult::ok(format!("client {version}")),
        Err(e) => CheckResult::fail(e.to_string()),
    };

    if let Some(root) = &root {
        let loaded = Manifest::load(root).and_then(|manifest| {
            manifest.validate(root)?;
            Ok(manifest)
        });
        match loaded {
            Ok(manifest) => {
                report.manifest =
                    CheckResult::ok(format!("{} component(s)", manifest.components.len()));
                report.registry = match RegistrySettings::resolve(&manifest.registry) {
                    Ok(settings) => CheckResult::ok(format!(
                        "{}/{}/{}",
                        settings.location, settings.project, settings.repository
                    )),
                    Err(e) => CheckResult::fail(e.to_string()),
                };
            }
            Err(e) => {
                report.manifest = CheckResult::fail(e.to_string());
                report.registry = CheckResult::fail("skipped (manifest unavailable)");
            }
        }
    } else {
        report.manifest = CheckResult::fail("skipped (no repository)");
        report.registry = CheckResult::fail("skipped (no repository)");
    }

    println!();
    println!("{report}");

    // The stamp is run state, not a readiness check: absence just means
    // nothing has been stamped yet.
    if let Some(root) = &root {
        println!();
        match BuildStamp::load(root) {
            Ok(stamp) => println!("Current stamp: {} (commit {})", stamp.timestamp, stamp.commit),
            Err(e) => {
                tracing::debug!(error = %e, "stamp not loadable");
                println!("Current stamp: none (run `imagepress stamp`)");
            }
        }
    }

    if !report.all_passed() {
        anyhow::bail!("some checks failed — see the report above");
    }
    Ok(())
}
