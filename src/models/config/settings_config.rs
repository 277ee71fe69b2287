//! Settings configuration loading and validation.
//!
//! Implements the ConfigLoader trait for the process settings file.

use async_trait::async_trait;
use std::{collections::HashMap, path::Path};
use url::Url;

use crate::models::{
	config::error::ConfigError, ConfigLoader, ProviderKind, SecretValue, Settings,
};

/// Telegram refuses long-poll timeouts above this value
const MAX_POLL_TIMEOUT_SECS: u64 = 50;

fn validate_url(field: &str, raw: &str, schemes: &[&str]) -> Result<(), ConfigError> {
	let metadata = Some(HashMap::from([(field.to_string(), raw.to_string())]));

	let url = Url::parse(raw).map_err(|e| {
		ConfigError::validation_error(
			format!("{} is not a valid URL", field),
			Some(Box::new(e)),
			metadata.clone(),
		)
	})?;

	if !schemes.contains(&url.scheme()) {
		return Err(ConfigError::validation_error(
			format!("{} must use one of: {}", field, schemes.join(", ")),
			None,
			metadata,
		));
	}

	Ok(())
}

#[async_trait]
impl ConfigLoader for Settings {
	/// Resolve the bot token into a plain secret
	async fn resolve_secrets(&self) -> Result<Self, ConfigError> {
		dotenvy::dotenv().ok();
		let mut settings = self.clone();

		let token = settings.telegram.token.resolve().await.map_err(|e| {
			ConfigError::parse_error(
				format!("failed to resolve telegram token: {}", e),
				Some(e),
				None,
			)
		})?;
		settings.telegram.token = SecretValue::Plain(token);

		Ok(settings)
	}

	/// Load the settings file, resolve its secrets and validate it
	async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let path_metadata = || {
			Some(HashMap::from([(
				"path".to_string(),
				path.display().to_string(),
			)]))
		};

		if !Self::is_json_file(path) {
			return Err(ConfigError::file_error(
				"settings file must have a .json extension",
				None,
				path_metadata(),
			));
		}

		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::file_error(
				format!("failed to open settings file: {}", e),
				Some(Box::new(e)),
				path_metadata(),
			)
		})?;

		let settings: Settings = serde_json::from_str(&content).map_err(|e| {
			ConfigError::parse_error(
				format!("failed to parse settings: {}", e),
				Some(Box::new(e)),
				path_metadata(),
			)
		})?;

		let settings = settings.resolve_secrets().await?;
		settings.validate()?;

		Ok(settings)
	}

	/// Validate the settings
	///
	/// Ensures that:
	/// - Endpoint overrides are well-formed URLs with the right scheme
	/// - Push endpoints are only configured for push providers
	/// - Timeouts and failure ceilings are positive
	fn validate(&self) -> Result<(), ConfigError> {
		let provider = &self.provider;

		if let Some(base_url) = &provider.base_url {
			validate_url("provider.base_url", base_url, &["http", "https"])?;
		}

		let push_overrides = [
			(
				"provider.testnet_base_url",
				&provider.testnet_base_url,
				&["http", "https"],
			),
			(
				"provider.websocket_url",
				&provider.websocket_url,
				&["ws", "wss"],
			),
			(
				"provider.testnet_websocket_url",
				&provider.testnet_websocket_url,
				&["ws", "wss"],
			),
		];
		for (field, value, schemes) in push_overrides {
			let Some(value) = value else { continue };
			if provider.name != ProviderKind::Mempool {
				return Err(ConfigError::validation_error(
					format!("{} is only supported by push providers", field),
					None,
					Some(HashMap::from([(
						"provider".to_string(),
						provider.name.to_string(),
					)])),
				));
			}
			validate_url(field, value, schemes)?;
		}

		if self.telegram.token.is_empty() {
			return Err(ConfigError::validation_error(
				"telegram.token is required",
				None,
				None,
			));
		}
		validate_url("telegram.api_url", &self.telegram.api_url, &["http", "https"])?;

		if self.telegram.poll_timeout_secs > MAX_POLL_TIMEOUT_SECS {
			return Err(ConfigError::validation_error(
				format!(
					"telegram.poll_timeout_secs must not exceed {}",
					MAX_POLL_TIMEOUT_SECS
				),
				None,
				None,
			));
		}

		if self.proxies.enabled && self.proxies.timeout_seconds == 0 {
			return Err(ConfigError::validation_error(
				"proxies.timeout_seconds must be greater than 0",
				None,
				None,
			));
		}

		if self.monitor.max_consecutive_failures == Some(0) {
			return Err(ConfigError::validation_error(
				"monitor.max_consecutive_failures must be greater than 0 when set",
				None,
				None,
			));
		}

		if self.registry_path.as_os_str().is_empty() {
			return Err(ConfigError::validation_error(
				"registry_path is required",
				None,
				None,
			));
		}

		Ok(())
	}
}
