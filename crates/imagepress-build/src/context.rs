use std::path::{Path, PathBuf};

use imagepress_core::stamp::SCRATCH_DIR;
use imagepress_core::{BuildStamp, Component};

/// File name of the stamp copy staged into each component's context
/// directory. Dockerfiles reference it with a root-relative `COPY`.
pub const CONTEXT_STAMP_FILE: &str = "imagepress-stamp.toml";

/// Stage the persisted stamp into a component's context directory so the
/// image build can embed build provenance.
pub fn stage_stamp(root: &Path, component: &Component) -> Result<PathBuf, ContextError> {
    let src = BuildStamp::path(root);
    let dst = root.join(&component.dir).join(CONTEXT_STAMP_FILE);
    std::fs::copy(&src, &dst).map_err(|e| ContextError::StageStamp {
        component: component.name.clone(),
        path: dst.clone(),
        source: e,
    })?;
    tracing::debug!(component = %component.name, path = %dst.display(), "staged build stamp");
    Ok(dst)
}

/// Remove the scratch directory and any staged stamp copies, returning the
/// paths actually removed.
///
/// Staged copies sit inside component context directories; left behind,
/// they would go stale and leak an old stamp into later image builds.
pub fn clean(root: &Path, components: &[Component]) -> Result<Vec<PathBuf>, ContextError> {
    let mut removed = Vec::new();

    let scratch = root.join(SCRATCH_DIR);
    if scratch.exists() {
        std::fs::remove_dir_all(&scratch).map_err(|e| ContextError::Cleanup {
            path: scratch.clone(),
            source: e,
        })?;
        removed.push(scratch);
    }

    for component in components {
        let staged = root.join(&component.dir).join(CONTEXT_STAMP_FILE);
        if staged.exists() {
            std::fs::remove_file(&staged).map_err(|e| ContextError::Cleanup {
                path: staged.clone(),
                source: e,
            })?;
            removed.push(staged);
        }
    }

    Ok(removed)
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to stage build stamp for '{component}' at {path}")]
    StageStamp {
        component: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to clean up {path}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
}
