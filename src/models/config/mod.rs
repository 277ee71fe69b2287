//! Loading of the process settings file.
//!
//! Settings are read once at startup (and by `--check`); a [`ConfigError`] from here is
//! always fatal.

#![allow(clippy::result_large_err)]

use async_trait::async_trait;
use std::path::Path;

mod error;
mod settings_config;

pub use error::ConfigError;

/// A configuration document that can be read from disk, have its secrets resolved and be
/// checked before any service is built from it
#[async_trait]
pub trait ConfigLoader: Sized {
	/// Read, resolve and validate in one step
	async fn load_from_path(path: &Path) -> Result<Self, ConfigError>;

	/// Reports the first problem found
	fn validate(&self) -> Result<(), ConfigError>;

	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
	}

	/// Replace environment-sourced secrets with their values
	async fn resolve_secrets(&self) -> Result<Self, ConfigError>;
}
