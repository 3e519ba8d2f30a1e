use std::path::Path;

use imagepress_build::repo;
use imagepress_container::RegistrySettings;
use imagepress_container::settings::{ENV_PROJECT, ENV_REGISTRY, ENV_SA_KEY};
use imagepress_core::Manifest;
use secrecy::ExposeSecret;

/// Workflow file location, relative to the repository top level.
const WORKFLOW_PATH: &str = ".github/workflows/imagepress.yml";

/// Generate the GitHub Actions workflow that runs the pipeline: stamp
/// and build on every push and pull request, publish only for pushes.
pub async fn ci_init(force: bool) -> anyhow::Result<()> {
    let root = repo::toplevel(Path::new("."))?;

    let workflow_path = root.join(WORKFLOW_PATH);
    if workflow_path.exists() && !force {
        anyhow::bail!(
            "workflow already exists at {WORKFLOW_PATH} — edit it directly, or pass --force to regenerate"
        );
    }

    if let Some(parent) = workflow_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&workflow_path, generate_workflow_yaml())?;

    println!("Generated: {WORKFLOW_PATH}");
    println!();
    println!("Store the registry secrets with: imagepress ci setup");

    Ok(())
}

/// Store the resolved registry settings as GitHub Actions secrets so the
/// generated workflow can publish. Secret values go to `gh` over stdin.
pub async fn ci_setup() -> anyhow::Result<()> {
    let root = repo::toplevel(Path::new("."))?;

    println!("Checking prerequisites...");

    let gh_version = exec_gh(&["--version"])
        .await
        .map_err(|_| anyhow::anyhow!("gh CLI not found. Install: https://cli.github.com"))?;
    println!("  gh CLI: {}", gh_version.lines().next().unwrap_or("unknown").trim());

    exec_gh(&["auth", "status"])
        .await
        .map_err(|_| anyhow::anyhow!("not authenticated with GitHub. Run: gh auth login"))?;
    println!("  gh auth: OK");

    let url = repo::remote_url(&root, "origin")?;
    let github_repo = parse_github_repo(&url)
        .ok_or_else(|| anyhow::anyhow!("remote '{url}' is not a GitHub repository"))?;
    println!("  Repository: {github_repo}");

    let manifest = Manifest::load(&root)?;
    let settings = RegistrySettings::resolve(&manifest.registry)?;
    println!("  Registry: {}/{}", settings.location, settings.project);

    println!();
    println!("Configuring GitHub secrets...");

    set_gh_secret(ENV_REGISTRY, settings.location.as_bytes()).await?;
    println!("  {ENV_REGISTRY}");
    set_gh_secret(ENV_PROJECT, settings.project.as_bytes()).await?;
    println!("  {ENV_PROJECT}");
    set_gh_secret(ENV_SA_KEY, settings.key.expose_secret().as_bytes()).await?;
    println!("  {ENV_SA_KEY}");

    println!();
    println!("Secrets set for {github_repo}. Generate the workflow with: imagepress ci init");

    Ok(())
}

async fn exec_gh(args: &[&str]) -> anyhow::Result<String> {
    let output = tokio::process::Command::new("gh")
        .args(args)
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("failed to run gh: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("gh {} failed: {}", args.join(" "), stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// The value goes over stdin, never through the argument list.
async fn set_gh_secret(name: &str, value: &[u8]) -> anyhow::Result<()> {
    use std::process::Stdio;
    use tokio::io::AsyncWriteExt;

    let mut child = tokio::process::Command::new("gh")
        .args(["secret", "set", name])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| anyhow::anyhow!("failed to run gh: {e}"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(value).await?;
        stdin.shutdown().await?;
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("failed to set secret {name}: {}", stderr.trim());
    }
    Ok(())
}

/// `owner/name` from an SSH or HTTPS GitHub remote URL.
fn parse_github_repo(url: &str) -> Option<String> {
    let url = url.trim();
    let rest = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("https://github.com/"))
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))?;

    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let (owner, name) = rest.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some(format!("{owner}/{name}"))
}

fn generate_workflow_yaml() -> String {
    r#"# Generated by: imagepress ci init
name: Images

on:
  push:
    branches: [main]
    tags: ["**"]
  pull_request:
  workflow_dispatch:

jobs:
  images:
    runs-on: ubuntu-latest

    steps:
      - uses: actions/checkout@v4

      - name: Install Rust
        uses: dtolnay/rust-toolchain@stable

      - name: Cache imagepress binary
        uses: actions/cache@v4
        with:
          path: ~/.cargo/bin/imagepress
          key: imagepress-cli-${{ runner.os }}

      - name: Install imagepress
        run: |
          if ! command -v imagepress &> /dev/null; then
            cargo install imagepress-cli
          fi

      - name: Stamp
        run: imagepress stamp

      - name: Build images
        run: imagepress build

      - name: Publish images
        if: github.event_name != 'pull_request'
        env:
          IMAGEPRESS_REGISTRY: ${{ secrets.IMAGEPRESS_REGISTRY }}
          IMAGEPRESS_PROJECT: ${{ secrets.IMAGEPRESS_PROJECT }}
          IMAGEPRESS_SA_KEY: ${{ secrets.IMAGEPRESS_SA_KEY }}
        run: imagepress publish
"#
    .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ssh_remote() {
        assert_eq!(
            parse_github_repo("git@github.com:acme/exporter.git"),
            Some("acme/exporter".to_owned())
        );
    }

    #[test]
    fn parses_https_remote_with_and_without_suffix() {
        assert_eq!(
            parse_github_repo("https://github.com/acme/exporter.git"),
            Some("acme/exporter".to_owned())
        );
        assert_eq!(
            parse_github_repo("https://github.com/acme/exporter"),
            Some("acme/exporter".to_owned())
        );
    }

    #[test]
    fn rejects_non_github_remotes() {
        assert_eq!(parse_github_repo("https://gitlab.com/acme/exporter.git"), None);
        assert_eq!(parse_github_repo("git@github.com:just-an-owner"), None);
        assert_eq!(parse_github_repo(""), None);
    }

    #[test]
    fn workflow_builds_everywhere_but_publishes_only_on_push() {
        let yaml = generate_workflow_yaml();

        assert!(yaml.contains("run: imagepress stamp"));
        assert!(yaml.contains("run: imagepress build"));
        assert!(yaml.contains("run: imagepress publish"));
        assert!(yaml.contains("if: github.event_name != 'pull_request'"));
        assert!(yaml.contains("pull_request:"));
        assert!(yaml.contains("workflow_dispatch:"));
    }

    #[test]
    fn workflow_injects_every_registry_secret() {
        let yaml = generate_workflow_yaml();

        for name in [ENV_REGISTRY, ENV_PROJECT, ENV_SA_KEY] {
            assert!(yaml.contains(&format!("{name}: ${{{{ secrets.{name} }}}}")));
        }
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn parse_never_panics(url in "\\PC*") {
                let _ = parse_github_repo(&url);
            }

            #[test]
            fn parsed_ssh_remotes_round_trip(
                owner in "[a-zA-Z0-9][a-zA-Z0-9-]{0,20}",
                name in "[a-zA-Z0-9][a-zA-Z0-9._-]{0,20}",
            ) {
                let url = format!("git@github.com:{owner}/{name}.git");
                prop_assert_eq!(parse_github_repo(&url), Some(format!("{owner}/{name}")));
            }
        }
    }
}
