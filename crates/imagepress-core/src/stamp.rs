use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scratch directory at the repository root.
pub const SCRATCH_DIR: &str = ".imagepress";
/// Stamp state file inside [`SCRATCH_DIR`].
pub const STAMP_FILE: &str = "stamp.toml";

/// Compact UTC layout, second precision, e.g. `20260826T143501Z`.
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Build identity captured once per pipeline run.
///
/// The commit recorded here is authoritative for every later stage: the
/// builder and publisher load the stamp instead of re-reading `HEAD`, so
/// images built and pushed in one run always carry the same revision tag
/// even if the branch moves underneath.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStamp {
    /// UTC wall-clock time at stamp creation, `YYYYMMDDThhmmssZ`.
    pub timestamp: String,
    /// Abbreviated commit hash of `HEAD` at stamp creation.
    pub commit: String,
}

impl BuildStamp {
    /// Stamp the given commit with the current UTC time.
    pub fn now(commit: impl Into<String>) -> Self {
        Self::at(Utc::now(), commit)
    }

    fn at(when: DateTime<Utc>, commit: impl Into<String>) -> Self {
        Self {
            timestamp: when.format(TIMESTAMP_FORMAT).to_string(),
            commit: commit.into(),
        }
    }

    /// Path of the stamp state file under `root`.
    pub fn path(root: &Path) -> PathBuf {
        root.join(SCRATCH_DIR).join(STAMP_FILE)
    }

    /// Persist to `.imagepress/stamp.toml` under `root`, creating the
    /// scratch directory if needed. Overwrites any previous stamp.
    pub fn write(&self, root: &Path) -> crate::Result<PathBuf> {
        let scratch = root.join(SCRATCH_DIR);
        std::fs::create_dir_all(&scratch).map_err(|e| crate::Error::StampWrite {
            path: scratch.clone(),
            source: e,
        })?;
        let path = scratch.join(STAMP_FILE);
        let content = toml::to_string(self).map_err(|e| crate::Error::StampEncode { source: e })?;
        std::fs::write(&path, content).map_err(|e| crate::Error::StampWrite {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), commit = %self.commit, "wrote build stamp");
        Ok(path)
    }

    /// Load the stamp persisted by `imagepress stamp`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StampMissing`](crate::Error::StampMissing) when no
    /// stamp file exists, which the CLI surfaces as a hint to run the stamp
    /// step first.
    pub fn load(root: &Path) -> crate::Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            return Err(crate::Error::StampMissing(path));
        }
        let content = std::fs::read_to_string(&path).map_err(|e| crate::Error::StampRead {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| crate::Error::StampParse { path, source: e })
    }

    /// Parse the recorded timestamp back into a UTC instant.
    ///
    /// Returns `None` for a hand-edited stamp that no longer matches the
    /// `YYYYMMDDThhmmssZ` layout.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}
