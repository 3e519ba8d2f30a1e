//! Stage engine shared by `build`, `publish`, and `run`.
//!
//! Each stage walks the selected components in manifest order, records a
//! per-component outcome, and decides from the failure policy whether a
//! failure aborts the rest of the selection or only marks the one target.

use std::path::Path;

use imagepress_build::context;
use imagepress_container::{PodmanClient, PodmanExecutor, RegistrySettings};
use imagepress_core::{BuildStamp, Component};

/// What happens to the remaining selection after a component fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailurePolicy {
    /// Stop before the next component. The default.
    Abort,
    /// Process every component and report all failures at the end.
    KeepGoing,
}

impl FailurePolicy {
    pub(crate) fn from_keep_going(keep_going: bool) -> Self {
        if keep_going { Self::KeepGoing } else { Self::Abort }
    }
}

/// Outcome of one component within a stage.
#[derive(Debug)]
pub(crate) enum TargetStatus {
    /// Succeeded; the detail is the reference (or references) produced.
    Ok(String),
    /// Failed; the detail is the rendered error.
    Failed(String),
    /// Never attempted because an earlier failure aborted the stage.
    Skipped,
}

#[derive(Debug)]
pub(crate) struct TargetReport {
    pub name: String,
    pub status: TargetStatus,
}

/// Accumulated outcomes of one stage, printed as a closing summary.
#[derive(Debug, Default)]
pub(crate) struct StageSummary {
    pub reports: Vec<TargetReport>,
}

impl StageSummary {
    fn ok(&mut self, name: &str, detail: String) {
        self.reports.push(TargetReport {
            name: name.to_owned(),
            status: TargetStatus::Ok(detail),
        });
    }

    fn failed(&mut self, name: &str, detail: String) {
        self.reports.push(TargetReport {
            name: name.to_owned(),
            status: TargetStatus::Failed(detail),
        });
    }

    fn skipped(&mut self, name: &str) {
        self.reports.push(TargetReport {
            name: name.to_owned(),
            status: TargetStatus::Skipped,
        });
    }

    pub(crate) fn failures(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, TargetStatus::Failed(_)))
            .count()
    }

    pub(crate) fn print(&self, stage: &str) {
        println!();
        println!("{stage} summary:");
        for report in &self.reports {
            match &report.status {
                TargetStatus::Ok(detail) => println!("  ok       {:<20} {detail}", report.name),
                TargetStatus::Failed(detail) => {
                    println!("  failed   {:<20} {detail}", report.name);
                }
                TargetStatus::Skipped => println!("  skipped  {}", report.name),
            }
        }
    }
}

/// Component-to-local-reference map handed from the build stage to the
/// publisher, in selection order. Only successfully built components are
/// in here, so a `--keep-going` run publishes exactly what it built.
#[derive(Debug, Default)]
pub(crate) struct BuiltImages {
    entries: Vec<(Component, String)>,
}

impl BuiltImages {
    /// Reconstruct the map from the manifest for a standalone `publish`.
    /// Callers verify the references actually exist in local storage.
    pub(crate) fn from_components(namespace: &str, components: &[Component]) -> Self {
        Self {
            entries: components
                .iter()
                .map(|c| (c.clone(), c.local_reference(namespace)))
                .collect(),
        }
    }

    fn push(&mut self, component: Component, reference: String) {
        self.entries.push((component, reference));
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &(Component, String)> {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Stage the stamp into each component context and build its image.
///
/// The stamp itself is staged from the persisted file under the scratch
/// directory; the in-memory copy pins the commit the whole run reports.
pub(crate) async fn run_build<E: PodmanExecutor>(
    client: &PodmanClient<E>,
    root: &Path,
    namespace: &str,
    stamp: &BuildStamp,
    components: &[Component],
    policy: FailurePolicy,
) -> (StageSummary, BuiltImages) {
    tracing::debug!(commit = %stamp.commit, count = components.len(), "starting build stage");

    let mut summary = StageSummary::default();
    let mut built = BuiltImages::default();
    let mut aborted = false;

    for component in components {
        if aborted {
            summary.skipped(&component.name);
            continue;
        }

        let reference = component.local_reference(namespace);
        println!("Building {} ({reference})...", component.name);

        let result = match context::stage_stamp(root, component) {
            Ok(_) => client
                .build_image(&component.descriptor, &reference, root)
                .await
                .map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e)),
        };

        match result {
            Ok(()) => {
                summary.ok(&component.name, reference.clone());
                built.push(component.clone(), reference);
            }
            Err(e) => {
                summary.failed(&component.name, format!("{e:#}"));
                if policy == FailurePolicy::Abort {
                    aborted = true;
                }
            }
        }
    }

    (summary, built)
}

/// Log in to the registry once, then tag and push every built image.
///
/// A failed login aborts the whole stage: nothing can be pushed without
/// it, so per-component policy does not apply there.
pub(crate) async fn run_publish<E: PodmanExecutor>(
    client: &PodmanClient<E>,
    settings: &RegistrySettings,
    stamp: &BuildStamp,
    images: &BuiltImages,
    policy: FailurePolicy,
) -> anyhow::Result<StageSummary> {
    println!("Logging in to {}...", settings.location);
    client
        .login(&settings.location, &settings.username, &settings.key)
        .await?;

    let mut summary = StageSummary::default();
    let mut aborted = false;

    for (component, local) in images.iter() {
        if aborted {
            summary.skipped(&component.name);
            continue;
        }

        println!("Publishing {}...", component.name);
        match publish_one(client, settings, stamp, component, local).await {
            Ok(pushed) => summary.ok(&component.name, pushed.join(", ")),
            Err(e) => {
                summary.failed(&component.name, format!("{e:#}"));
                if policy == FailurePolicy::Abort {
                    aborted = true;
                }
            }
        }
    }

    Ok(summary)
}

/// Tag and push both remote references for one component: the stamp's
/// commit hash first, then `latest`.
async fn publish_one<E: PodmanExecutor>(
    client: &PodmanClient<E>,
    settings: &RegistrySettings,
    stamp: &BuildStamp,
    component: &Component,
    local: &str,
) -> anyhow::Result<Vec<String>> {
    let mut pushed = Vec::new();
    for tag in [stamp.commit.as_str(), "latest"] {
        let remote = settings.remote_reference(&component.name, tag);
        client.tag_image(local, &remote).await?;
        client.push_image(&remote).await?;
        pushed.push(remote);
    }
    Ok(pushed)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use imagepress_container::PodmanError;
    use secrecy::SecretString;
    use tempfile::TempDir;

    use super::*;

    /// Records every invocation; fails any whose arguments contain the
    /// configured substring.
    struct ScriptedExecutor {
        calls: Mutex<Vec<Vec<String>>>,
        fail_on: Option<String>,
    }

    impl ScriptedExecutor {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_on(pattern: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on: Some(pattern.to_owned()),
            }
        }

        fn record(&self, args: &[String]) -> Result<(), PodmanError> {
            self.calls.lock().unwrap().push(args.to_vec());
            if let Some(pattern) = &self.fail_on
                && args.iter().any(|a| a.contains(pattern.as_str()))
            {
                return Err(PodmanError::CommandFailed {
                    args: args.to_vec(),
                    stderr: "scripted failure".to_owned(),
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    // Implemented on the reference so tests keep hold of the call log
    // while the client owns its executor.
    impl PodmanExecutor for &ScriptedExecutor {
        async fn exec(&self, args: &[String]) -> Result<String, PodmanError> {
            self.record(args)?;
            Ok(String::new())
        }

        async fn exec_streaming(&self, args: &[String]) -> Result<(), PodmanError> {
            self.record(args)
        }

        async fn exec_with_stdin(
            &self,
            args: &[String],
            _stdin_data: &[u8],
        ) -> Result<String, PodmanError> {
            self.record(args)?;
            Ok(String::new())
        }
    }

    fn component(name: &str) -> Component {
        Component {
            name: name.to_owned(),
            dir: PathBuf::from(name),
            descriptor: PathBuf::from(name).join("Dockerfile"),
        }
    }

    /// Repository root with component dirs and a persisted stamp, so
    /// staging has something to copy.
    fn stamped_root(stamp: &BuildStamp, names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            std::fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        stamp.write(dir.path()).unwrap();
        dir
    }

    fn settings() -> RegistrySettings {
        RegistrySettings {
            location: "reg.example.dev".to_owned(),
            project: "acme-lab".to_owned(),
            username: "_json_key".to_owned(),
            repository: "images".to_owned(),
            key: SecretString::from("{\"type\":\"service_account\"}".to_owned()),
        }
    }

    #[test]
    fn failure_policy_maps_the_flag() {
        assert_eq!(FailurePolicy::from_keep_going(false), FailurePolicy::Abort);
        assert_eq!(FailurePolicy::from_keep_going(true), FailurePolicy::KeepGoing);
    }

    #[tokio::test]
    async fn build_stage_walks_components_in_order() {
        let stamp = BuildStamp::now("abc1234");
        let root = stamped_root(&stamp, &["exporter", "web"]);
        let components = vec![component("exporter"), component("web")];

        let exec = ScriptedExecutor::new();
        let client = PodmanClient::with_executor(&exec);
        let (summary, built) = run_build(
            &client,
            root.path(),
            "imagepress",
            &stamp,
            &components,
            FailurePolicy::Abort,
        )
        .await;

        assert_eq!(summary.failures(), 0);
        assert_eq!(built.len(), 2);
        let refs: Vec<&str> = built.iter().map(|(_, r)| r.as_str()).collect();
        assert_eq!(
            refs,
            ["localhost/imagepress/exporter:latest", "localhost/imagepress/web:latest"]
        );

        let calls = exec.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].iter().any(|a| a == "exporter/Dockerfile"));
        assert!(calls[1].iter().any(|a| a == "web/Dockerfile"));

        // The staged stamp landed inside each context.
        for name in ["exporter", "web"] {
            let staged = root.path().join(name).join("imagepress-stamp.toml");
            let contents = std::fs::read_to_string(staged).unwrap();
            assert!(contents.contains("abc1234"));
        }
    }

    #[tokio::test]
    async fn build_abort_policy_skips_everything_after_a_failure() {
        let stamp = BuildStamp::now("abc1234");
        let root = stamped_root(&stamp, &["a", "b", "c"]);
        let components = vec![component("a"), component("b"), component("c")];

        let exec = ScriptedExecutor::failing_on("/b:latest");
        let client = PodmanClient::with_executor(&exec);
        let (summary, built) = run_build(
            &client,
            root.path(),
            "imagepress",
            &stamp,
            &components,
            FailurePolicy::Abort,
        )
        .await;

        assert!(matches!(summary.reports[0].status, TargetStatus::Ok(_)));
        assert!(matches!(summary.reports[1].status, TargetStatus::Failed(_)));
        assert!(matches!(summary.reports[2].status, TargetStatus::Skipped));
        assert_eq!(built.len(), 1);

        // c was never attempted.
        let calls = exec.calls();
        assert!(!calls.iter().flatten().any(|a| a.contains("/c:latest")));
    }

    #[tokio::test]
    async fn build_keep_going_reaches_the_last_component() {
        let stamp = BuildStamp::now("abc1234");
        let root = stamped_root(&stamp, &["a", "b", "c"]);
        let components = vec![component("a"), component("b"), component("c")];

        let exec = ScriptedExecutor::failing_on("/b:latest");
        let client = PodmanClient::with_executor(&exec);
        let (summary, built) = run_build(
            &client,
            root.path(),
            "imagepress",
            &stamp,
            &components,
            FailurePolicy::KeepGoing,
        )
        .await;

        assert_eq!(summary.failures(), 1);
        assert_eq!(built.len(), 2);
        let calls = exec.calls();
        assert!(calls.iter().flatten().any(|a| a.contains("/c:latest")));
    }

    #[tokio::test]
    async fn publish_tags_commit_then_latest_for_each_component() {
        let stamp = BuildStamp::now("abc1234");
        let images = BuiltImages::from_components("imagepress", &[component("exporter")]);

        let exec = ScriptedExecutor::new();
        let client = PodmanClient::with_executor(&exec);
        let summary = run_publish(&client, &settings(), &stamp, &images, FailurePolicy::Abort)
            .await
            .unwrap();

        assert_eq!(summary.failures(), 0);

        let calls = exec.calls();
        let flat: Vec<String> = calls.iter().map(|c| c.join(" ")).collect();
        assert_eq!(
            flat,
            [
                "login -u _json_key --password-stdin reg.example.dev",
                "tag localhost/imagepress/exporter:latest reg.example.dev/acme-lab/images/exporter:abc1234",
                "push reg.example.dev/acme-lab/images/exporter:abc1234",
                "tag localhost/imagepress/exporter:latest reg.example.dev/acme-lab/images/exporter:latest",
                "push reg.example.dev/acme-lab/images/exporter:latest",
            ]
        );
    }

    #[tokio::test]
    async fn publish_login_failure_aborts_before_any_push() {
        let stamp = BuildStamp::now("abc1234");
        let images = BuiltImages::from_components("imagepress", &[component("exporter")]);

        let exec = ScriptedExecutor::failing_on("login");
        let client = PodmanClient::with_executor(&exec);
        let result = run_publish(&client, &settings(), &stamp, &images, FailurePolicy::Abort).await;

        assert!(result.is_err());
        assert_eq!(exec.calls().len(), 1);
    }

    #[tokio::test]
    async fn publish_abort_policy_skips_after_a_failure() {
        let stamp = BuildStamp::now("abc1234");
        let components = [component("a"), component("b"), component("c")];
        let images = BuiltImages::from_components("imagepress", &components);

        let exec = ScriptedExecutor::failing_on("images/b:");
        let client = PodmanClient::with_executor(&exec);
        let summary = run_publish(&client, &settings(), &stamp, &images, FailurePolicy::Abort)
            .await
            .unwrap();

        assert!(matches!(summary.reports[1].status, TargetStatus::Failed(_)));
        assert!(matches!(summary.reports[2].status, TargetStatus::Skipped));
        let calls = exec.calls();
        assert!(!calls.iter().flatten().any(|a| a.contains("images/c:")));
    }
}
