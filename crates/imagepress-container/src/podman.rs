#[derive(Debug, thiserror::Error)]
pub enum PodmanError {
    #[error("podman CLI not found — install: https://podman.io/docs/installation")]
    NotFound { source: std::io::Error },

    #[error("podman command failed: {args:?}\n{stderr}")]
    CommandFailed { args: Vec<String>, stderr: String },

    #[error("podman output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },

    #[error("failed to write to podman stdin")]
    StdinWrite { source: std::io::Error },
}
