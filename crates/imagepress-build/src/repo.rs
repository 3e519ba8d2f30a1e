use std::path::{Path, PathBuf};
use std::process::Command;

/// Identity of the enclosing git working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Top-level directory of the working tree.
    pub toplevel: PathBuf,
    /// Abbreviated commit hash of `HEAD`.
    pub head: String,
}

/// Discover the working tree enclosing `dir`.
pub fn discover(dir: &Path) -> Result<RepoInfo, RepoError> {
    Ok(RepoInfo {
        toplevel: toplevel(dir)?,
        head: short_head(dir)?,
    })
}

/// Top-level directory of the working tree enclosing `dir`.
pub fn toplevel(dir: &Path) -> Result<PathBuf, RepoError> {
    let stdout = git(dir, &["rev-parse", "--show-toplevel"])?;
    Ok(PathBuf::from(stdout))
}

/// Abbreviated commit hash of `HEAD`, as printed by
/// `git rev-parse --short HEAD`.
pub fn short_head(dir: &Path) -> Result<String, RepoError> {
    git(dir, &["rev-parse", "--short", "HEAD"])
}

/// Fetch URL of the named remote.
pub fn remote_url(dir: &Path, remote: &str) -> Result<String, RepoError> {
    git(dir, &["remote", "get-url", remote])
}

/// Require that `cwd` is the top level of its working tree.
///
/// # Errors
///
/// Returns [`RepoError::NotRepoRoot`] naming both directories when `cwd`
/// sits deeper in the tree. The CLI maps that variant to exit code 2.
pub fn require_toplevel(cwd: &Path) -> Result<RepoInfo, RepoError> {
    let info = discover(cwd)?;
    let current = canonical(cwd)?;
    let toplevel = canonical(&info.toplevel)?;
    if current != toplevel {
        return Err(RepoError::NotRepoRoot { current, toplevel });
    }
    Ok(info)
}

fn canonical(path: &Path) -> Result<PathBuf, RepoError> {
    path.canonicalize().map_err(|e| RepoError::Resolve {
        path: path.to_path_buf(),
        source: e,
    })
}

fn git(dir: &Path, args: &[&str]) -> Result<String, RepoError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| RepoError::GitCommand {
            detail: format!("failed to execute git {}", args.join(" ")),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RepoError::GitFailed {
            detail: format!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            ),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.trim().to_owned())
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("git command failed: {detail}")]
    GitCommand {
        detail: String,
        source: std::io::Error,
    },

    #[error("git failed: {detail}")]
    GitFailed { detail: String },

    #[error("failed to resolve {path}")]
    Resolve {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("must run from the repository top level {toplevel}, but the current directory is {current}")]
    NotRepoRoot { current: PathBuf, toplevel: PathBuf },
}
