use std::fmt;

use imagepress_core::RegistryConfig;
use secrecy::SecretString;

/// Environment variable naming the registry host.
pub const ENV_REGISTRY: &str = "IMAGEPRESS_REGISTRY";
/// Environment variable naming the project id under the registry.
pub const ENV_PROJECT: &str = "IMAGEPRESS_PROJECT";
/// Environment variable carrying the service-account key material.
pub const ENV_SA_KEY: &str = "IMAGEPRESS_SA_KEY";

/// Resolved publisher settings: registry host, project id, login identity.
///
/// Locally reads from `.env` via dotenvy, in CI from injected secrets.
/// The key is wrapped in [`SecretString`]: it reaches podman over stdin
/// only and never appears in argument lists, logs, or debug output.
#[derive(Clone)]
pub struct RegistrySettings {
    pub location: String,
    pub project: String,
    pub username: String,
    pub repository: String,
    pub key: SecretString,
}

impl fmt::Debug for RegistrySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySettings")
            .field("location", &self.location)
            .field("project", &self.project)
            .field("username", &self.username)
            .field("repository", &self.repository)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl RegistrySettings {
    /// Resolve settings from the environment, falling back to the manifest
    /// `[registry]` section for the non-secret fields.
    ///
    /// # Errors
    ///
    /// Each missing value fails with the env var and manifest key to set,
    /// before any registry call is attempted.
    pub fn resolve(config: &RegistryConfig) -> Result<Self, SettingsError> {
        let dotenv_loaded = dotenvy::dotenv().is_ok();
        tracing::debug!(dotenv = dotenv_loaded, "resolving registry settings");

        Self::from_lookup(config, |key| {
            // arch-lint: allow(no-silent-result-drop) reason="env var absence falls through to the manifest value or a MissingX error"
            std::env::var(key).ok()
        })
    }

    fn from_lookup(
        config: &RegistryConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let location = non_empty(lookup(ENV_REGISTRY))
            .or_else(|| config.location.clone())
            .ok_or(SettingsError::MissingLocation)?;
        let project = non_empty(lookup(ENV_PROJECT))
            .or_else(|| config.project.clone())
            .ok_or(SettingsError::MissingProject)?;
        let key = non_empty(lookup(ENV_SA_KEY))
            .map(SecretString::from)
            .ok_or(SettingsError::MissingKey)?;

        Ok(Self {
            location,
            project,
            username: config.username.clone(),
            repository: config.repository.clone(),
            key,
        })
    }

    /// Remote reference for a component image:
    /// `<location>/<project>/<repository>/<name>:<tag>`.
    pub fn remote_reference(&self, name: &str, tag: &str) -> String {
        format!(
            "{}/{}/{}/{}:{}",
            self.location, self.project, self.repository, name, tag
        )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(
        "registry location not set — set IMAGEPRESS_REGISTRY or [registry].location in imagepress.toml"
    )]
    MissingLocation,

    #[error(
        "registry project not set — set IMAGEPRESS_PROJECT or [registry].project in imagepress.toml"
    )]
    MissingProject,

    #[error("service-account key not set — set IMAGEPRESS_SA_KEY to the contents of the key file")]
    MissingKey,
}
