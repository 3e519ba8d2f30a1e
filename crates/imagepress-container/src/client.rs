use std::path::Path;

use secrecy::{ExposeSecret, SecretString};

use crate::executor::{PodmanExecutor, RealExecutor};
use crate::podman::PodmanError;

/// Podman operations client, parameterized over the executor for testability.
pub struct PodmanClient<E: PodmanExecutor = RealExecutor> {
    executor: E,
}

impl PodmanClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for PodmanClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: PodmanExecutor> PodmanClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Build ──

    /// Build an image from `descriptor`, tagging it `reference`, with
    /// `context` as the build context.
    ///
    /// Output streams to the terminal; a relative descriptor path resolves
    /// against the caller's working directory, which the CLI pins to the
    /// repository top level.
    pub async fn build_image(
        &self,
        descriptor: &Path,
        reference: &str,
        context: &Path,
    ) -> Result<(), BuildError> {
        let descriptor_str = descriptor
            .to_str()
            .ok_or_else(|| BuildError::InvalidPath(descriptor.to_path_buf()))?;
        let context_str = context
            .to_str()
            .ok_or_else(|| BuildError::InvalidPath(context.to_path_buf()))?;

        tracing::debug!(descriptor = descriptor_str, reference, "building image");
        self.executor
            .exec_streaming(&args([
                "build",
                "-f",
                descriptor_str,
                "-t",
                reference,
                context_str,
            ]))
            .await
            .map_err(|e| BuildError::Build { source: e })
    }

    /// Whether a local image with this reference exists.
    ///
    /// Treats any podman failure as absence; callers that need to tell a
    /// missing image from a missing podman run [`version`](Self::version)
    /// first.
    pub async fn image_exists(&self, reference: &str) -> bool {
        self.executor
            .exec(&args(["image", "exists", reference]))
            .await
            .is_ok()
    }

    // ── Publish ──

    /// Authenticate to the registry, piping the key material over stdin.
    ///
    /// The key never enters the argument list, so command failures and
    /// debug logs only ever show the registry host and username.
    pub async fn login(
        &self,
        location: &str,
        username: &str,
        key: &SecretString,
    ) -> Result<(), PublishError> {
        self.executor
            .exec_with_stdin(
                &args(["login", "-u", username, "--password-stdin", location]),
                key.expose_secret().as_bytes(),
            )
            .await
            .map_err(|e| PublishError::Login { source: e })?;

        tracing::debug!(location, username, "registry login succeeded");
        Ok(())
    }

    pub async fn tag_image(&self, src: &str, dst: &str) -> Result<(), PublishError> {
        self.executor
            .exec(&args(["tag", src, dst]))
            .await
            .map_err(|e| PublishError::Tag { source: e })?;
        Ok(())
    }

    /// Push a reference to its registry, streaming progress to the terminal.
    pub async fn push_image(&self, reference: &str) -> Result<(), PublishError> {
        self.executor
            .exec_streaming(&args(["push", reference]))
            .await
            .map_err(|e| PublishError::Push { source: e })
    }

    // ── Diagnostics ──

    /// Client version string, as reported by podman itself.
    pub async fn version(&self) -> Result<String, PodmanError> {
        let output = self
            .executor
            .exec(&args(["version", "--format", "{{.Client.Version}}"]))
            .await?;
        Ok(output.trim().to_owned())
    }
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(std::path::PathBuf),

    #[error("image build failed")]
    Build { source: PodmanError },
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("registry login failed")]
    Login { source: PodmanError },

    #[error("failed to tag image")]
    Tag { source: PodmanError },

    #[error("image push failed")]
    Push { source: PodmanError },
}
