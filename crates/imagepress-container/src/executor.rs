use std::process::{Output, Stdio};

use tokio::io::AsyncWriteExt;

use crate::podman::PodmanError;

/// How the rest of the crate reaches podman.
///
/// [`PodmanClient`](crate::PodmanClient) is generic over this trait so
/// tests can substitute a scripted implementation; production code runs
/// the installed CLI through [`RealExecutor`].
#[allow(async_fn_in_trait)]
pub trait PodmanExecutor: Send + Sync {
    /// Run podman and capture stdout.
    async fn exec(&self, args: &[String]) -> Result<String, PodmanError>;

    /// Run podman with stdout and stderr left on the terminal. Builds
    /// and pushes go through here so their progress stays visible.
    async fn exec_streaming(&self, args: &[String]) -> Result<(), PodmanError>;

    /// Run podman with `stdin_data` piped to its stdin, capturing
    /// stdout. Credential material goes through here so it never
    /// enters argv.
    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, PodmanError>;
}

const PODMAN: &str = "podman";

/// Executor backed by the installed podman CLI.
pub struct RealExecutor;

fn podman(args: &[String]) -> tokio::process::Command {
    let mut command = tokio::process::Command::new(PODMAN);
    command.args(args);
    command
}

/// Map a finished captured invocation to its stdout.
fn read_stdout(args: &[String], output: Output) -> Result<String, PodmanError> {
    if !output.status.success() {
        return Err(PodmanError::CommandFailed {
            args: args.to_vec(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    String::from_utf8(output.stdout).map_err(|e| PodmanError::InvalidUtf8 { source: e })
}

impl PodmanExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, PodmanError> {
        let output = podman(args)
            .output()
            .await
            .map_err(|e| PodmanError::NotFound { source: e })?;
        read_stdout(args, output)
    }

    async fn exec_streaming(&self, args: &[String]) -> Result<(), PodmanError> {
        let status = podman(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| PodmanError::NotFound { source: e })?;

        if !status.success() {
            return Err(PodmanError::CommandFailed {
                args: args.to_vec(),
                stderr: format!("exit code: {status}"),
            });
        }
        Ok(())
    }

    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, PodmanError> {
        let mut child = podman(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PodmanError::NotFound { source: e })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(stdin_data)
                .await
                .map_err(|e| PodmanError::StdinWrite { source: e })?;
            stdin
                .shutdown()
                .await
                .map_err(|e| PodmanError::StdinWrite { source: e })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PodmanError::NotFound { source: e })?;
        read_stdout(args, output)
    }
}
