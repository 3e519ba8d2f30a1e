use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no imagepress.toml found at {0}")]
    ManifestMissing(PathBuf),

    #[error("failed to load manifest from {path}")]
    ManifestLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest at {path}")]
    ManifestParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Manifest validation ──
    #[error("manifest declares no components; add a [[component]] entry to {0}")]
    NoComponents(PathBuf),

    #[error("duplicate component name '{0}'")]
    DuplicateComponent(String),

    #[error("invalid component name '{name}': {reason}")]
    InvalidComponentName { name: String, reason: &'static str },

    #[error("component '{name}': directory {path} does not exist")]
    ComponentDirMissing { name: String, path: PathBuf },

    #[error("component '{name}': descriptor {path} does not exist")]
    DescriptorMissing { name: String, path: PathBuf },

    #[error("unknown target '{name}'; known components: {}", format_names(known))]
    UnknownTarget { name: String, known: Vec<String> },

    // ── Build stamp ──
    #[error("no build stamp at {0}; run `imagepress stamp` first")]
    StampMissing(PathBuf),

    #[error("failed to read build stamp from {path}")]
    StampRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse build stamp at {path}")]
    StampParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to encode build stamp")]
    StampEncode { source: toml::ser::Error },

    #[error("failed to write build stamp to {path}")]
    StampWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn format_names(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_owned()
    } else {
        names.join(", ")
    }
}
