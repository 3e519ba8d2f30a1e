use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Manifest file name, expected at the repository root.
pub const MANIFEST_FILE: &str = "imagepress.toml";

/// imagepress.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default, rename = "component")]
    pub components: Vec<ComponentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry host, e.g. "us-central1-docker.pkg.dev"
    /// (IMAGEPRESS_REGISTRY overrides)
    pub location: Option<String>,
    /// Project id under the registry (IMAGEPRESS_PROJECT overrides)
    pub project: Option<String>,
    /// Login user for key-based authentication
    #[serde(default = "default_username")]
    pub username: String,
    /// Path segment between project id and image name
    #[serde(default = "default_repository")]
    pub repository: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Namespace for locally tagged images: localhost/<namespace>/<name>:latest
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Image name, also the default context directory
    pub name: String,
    /// Context directory relative to the repository root (defaults to name)
    pub dir: Option<String>,
    /// Container descriptor relative to the repository root
    /// (defaults to <dir>/Dockerfile)
    pub descriptor: Option<String>,
}

/// A component with its paths resolved, still relative to the repository
/// root. Callers join with the root before touching the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub dir: PathBuf,
    pub descriptor: PathBuf,
}

impl ComponentConfig {
    fn resolve(&self) -> Component {
        let dir = PathBuf::from(self.dir.clone().unwrap_or_else(|| self.name.clone()));
        let descriptor = match &self.descriptor {
            Some(d) => PathBuf::from(d),
            None => dir.join("Dockerfile"),
        };
        Component {
            name: self.name.clone(),
            dir,
            descriptor,
        }
    }
}

impl Component {
    /// Local image reference: localhost/<namespace>/<name>:latest
    pub fn local_reference(&self, namespace: &str) -> String {
        format!("localhost/{}/{}:latest", namespace, self.name)
    }
}

impl Manifest {
    /// Load imagepress.toml from the repository root.
    ///
    /// There is no implicit default: a pipeline without declared components
    /// has nothing to build, so a missing manifest is an error.
    pub fn load(root: &Path) -> crate::Result<Self> {
        let path = root.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(crate::Error::ManifestMissing(path));
        }
        let content = std::fs::read_to_string(&path).map_err(|e| crate::Error::ManifestLoad {
            path: path.clone(),
            source: e,
        })?;
        let manifest: Self = toml::from_str(&content).map_err(|e| crate::Error::ManifestParse {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(
            path = %path.display(),
            components = manifest.components.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    /// Resolve the build selection.
    ///
    /// An empty target list selects every component in manifest order.
    /// Explicit targets select exactly those, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTarget`](crate::Error::UnknownTarget) for a
    /// target name not declared in the manifest.
    pub fn select(&self, targets: &[String]) -> crate::Result<Vec<Component>> {
        if targets.is_empty() {
            return Ok(self.components.iter().map(ComponentConfig::resolve).collect());
        }
        let mut selected = Vec::with_capacity(targets.len());
        for target in targets {
            let config = self
                .components
                .iter()
                .find(|c| &c.name == target)
                .ok_or_else(|| crate::Error::UnknownTarget {
                    name: target.clone(),
                    known: self.component_names(),
                })?;
            selected.push(config.resolve());
        }
        Ok(selected)
    }

    pub fn component_names(&self) -> Vec<String> {
        self.components.iter().map(|c| c.name.clone()).collect()
    }

    /// Validate the manifest against the repository layout.
    ///
    /// Rejects an empty component list, duplicate or malformed names, and
    /// components whose directory or descriptor does not exist under `root`.
    /// Runs before any build or publish work starts.
    pub fn validate(&self, root: &Path) -> crate::Result<()> {
        if self.components.is_empty() {
            return Err(crate::Error::NoComponents(root.join(MANIFEST_FILE)));
        }
        let mut seen = HashSet::new();
        for config in &self.components {
            if let Some(reason) = name_violation(&config.name) {
                return Err(crate::Error::InvalidComponentName {
                    name: config.name.clone(),
                    reason,
                });
            }
            if !seen.insert(config.name.as_str()) {
                return Err(crate::Error::DuplicateComponent(config.name.clone()));
            }
            let component = config.resolve();
            let dir = root.join(&component.dir);
            if !dir.is_dir() {
                return Err(crate::Error::ComponentDirMissing {
                    name: component.name,
                    path: dir,
                });
            }
            let descriptor = root.join(&component.descriptor);
            if !descriptor.is_file() {
                return Err(crate::Error::DescriptorMissing {
                    name: component.name,
                    path: descriptor,
                });
            }
        }
        Ok(())
    }
}

/// Component names become image path segments, so they follow the container
/// name grammar: lowercase alphanumeric runs separated by single '.', '_',
/// or '-' characters.
fn name_violation(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("name is empty");
    }
    let valid = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit() || separator(*b);
    if !name.as_bytes().iter().all(valid) {
        return Some("only lowercase letters, digits, '.', '_' and '-' are allowed");
    }
    let bytes = name.as_bytes();
    if separator(bytes[0]) {
        return Some("must start with a lowercase letter or digit");
    }
    if separator(bytes[bytes.len() - 1]) {
        return Some("must end with a lowercase letter or digit");
    }
    if bytes.windows(2).any(|w| separator(w[0]) && separator(w[1])) {
        return Some("separators must not be adjacent");
    }
    None
}

fn separator(b: u8) -> bool {
    matches!(b, b'.' | b'_' | b'-')
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            location: None,
            project: None,
            username: default_username(),
            repository: default_repository(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

fn default_username() -> String {
    "_json_key".to_owned()
}

fn default_repository() -> String {
    "images".to_owned()
}

fn default_namespace() -> String {
    "imagepress".to_owned()
}
