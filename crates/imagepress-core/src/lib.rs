//! Core types and configuration for imagepress.
//!
//! This crate defines the `imagepress.toml` schema ([`Manifest`]), the
//! build stamp state file ([`BuildStamp`]), and shared error types.

pub mod config;
pub mod error;
pub mod stamp;

pub use config::{Component, ComponentConfig, LocalConfig, Manifest, RegistryConfig};
pub use error::{Error, Result};
pub use stamp::BuildStamp;
