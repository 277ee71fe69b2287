//! Test helper utilities for Settings
//!
//! - `SettingsBuilder`: Builder for creating test Settings instances

use std::path::PathBuf;

use crate::{
	models::{
		MonitorSettings, ProviderKind, ProviderSettings, ProxySettings, SecretString,
		SecretValue, Settings, TelegramSettings,
	},
	utils::RetryConfig,
};

/// Builder for creating test Settings instances
pub struct SettingsBuilder {
	provider: ProviderSettings,
	telegram: TelegramSettings,
	proxies: ProxySettings,
	registry_path: PathBuf,
	monitor: MonitorSettings,
	http_retry: RetryConfig,
}

impl Default for SettingsBuilder {
	fn default() -> Self {
		Self {
			provider: ProviderSettings {
				name: ProviderKind::BlockCypher,
				base_url: None,
				testnet_base_url: None,
				websocket_url: None,
				testnet_websocket_url: None,
			},
			telegram: TelegramSettings {
				token: SecretValue::Plain(SecretString::new("123456:test-token".to_string())),
				api_url: "https://api.telegram.org".to_string(),
				poll_timeout_secs: 30,
			},
			proxies: ProxySettings::default(),
			registry_path: PathBuf::from("data/tracked_transactions.json"),
			monitor: MonitorSettings {
				max_consecutive_failures: None,
				minimum_poll_interval_ms: 0,
			},
			http_retry: RetryConfig::no_retries(),
		}
	}
}

impl SettingsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn provider(mut self, name: ProviderKind) -> Self {
		self.provider.name = name;
		self
	}

	pub fn base_url(mut self, url: &str) -> Self {
		self.provider.base_url = Some(url.to_string());
		self
	}

	pub fn testnet_base_url(mut self, url: &str) -> Self {
		self.provider.testnet_base_url = Some(url.to_string());
		self
	}

	pub fn websocket_url(mut self, url: &str) -> Self {
		self.provider.websocket_url = Some(url.to_string());
		self
	}

	pub fn testnet_websocket_url(mut self, url: &str) -> Self {
		self.provider.testnet_websocket_url = Some(url.to_string());
		self
	}

	pub fn telegram_api_url(mut self, url: &str) -> Self {
		self.telegram.api_url = url.to_string();
		self
	}

	pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
		self.telegram.poll_timeout_secs = secs;
		self
	}

	pub fn proxies(mut self, path: PathBuf, timeout_seconds: u64) -> Self {
		self.proxies = ProxySettings {
			enabled: true,
			timeout_seconds,
			path,
		};
		self
	}

	pub fn registry_path(mut self, path: PathBuf) -> Self {
		self.registry_path = path;
		self
	}

	pub fn max_consecutive_failures(mut self, max: u32) -> Self {
		self.monitor.max_consecutive_failures = Some(max);
		self
	}

	pub fn minimum_poll_interval_ms(mut self, ms: u64) -> Self {
		self.monitor.minimum_poll_interval_ms = ms;
		self
	}

	pub fn build(self) -> Settings {
		Settings {
			provider: self.provider,
			telegram: self.telegram,
			proxies: self.proxies,
			registry_path: self.registry_path,
			monitor: self.monitor,
			http_retry: self.http_retry,
		}
	}
}
