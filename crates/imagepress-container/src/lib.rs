pub mod client;
pub mod executor;
pub mod podman;
pub mod settings;

pub use client::{BuildError, PodmanClient, PublishError};
pub use executor::{PodmanExecutor, RealExecutor};
pub use podman::PodmanError;
pub use settings::{RegistrySettings, SettingsError};
