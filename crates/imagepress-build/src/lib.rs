//! Git repository discovery and build-context staging for imagepress.
//!
//! # Pipeline position
//!
//! ```text
//! imagepress run
//!   1. Stamp    ── git rev-parse --short HEAD → .imagepress/stamp.toml
//!   2. Stage    ── stamp copy → <component dir>/imagepress-stamp.toml
//!   3. Build    ── podman build (repository top level as context)
//!   4. Publish  ── podman tag / push (commit tag + latest)
//! ```
//!
//! # Working-directory contract
//!
//! `build` and `publish` refuse to run anywhere but the top level of the
//! git working tree: descriptors address the build context with paths
//! relative to the top level, so running deeper would silently build the
//! wrong context. [`repo::require_toplevel`] enforces this before any side
//! effect, and the CLI maps the violation to exit code 2.

pub mod context;
pub mod repo;

pub use repo::RepoInfo;
