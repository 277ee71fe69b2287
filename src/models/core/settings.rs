use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

use crate::{
	models::SecretValue,
	utils::{constants::DEFAULT_REGISTRY_PATH, RetryConfig},
};

/// The data source every monitor in this process talks to.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
	#[serde(alias = "BlockCypher", alias = "BLOCKCYPHER")]
	BlockCypher,
	#[serde(alias = "SoChain", alias = "SOCHAIN")]
	SoChain,
	#[serde(alias = "Mempool", alias = "MEMPOOL")]
	Mempool,
}

impl ProviderKind {
	/// Lowercased name stored in every registry entry
	pub fn as_str(&self) -> &'static str {
		match self {
			ProviderKind::BlockCypher => "blockcypher",
			ProviderKind::SoChain => "sochain",
			ProviderKind::Mempool => "mempool",
		}
	}
}

impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Provider selection plus optional endpoint overrides
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
	pub name: ProviderKind,

	/// REST base URL; defaults to the provider's public API
	#[serde(default)]
	pub base_url: Option<String>,

	/// REST base URL for the test network (push providers only)
	#[serde(default)]
	pub testnet_base_url: Option<String>,

	/// Push bridge endpoint for the main network (push providers only)
	#[serde(default)]
	pub websocket_url: Option<String>,

	/// Push bridge endpoint for the test network (push providers only)
	#[serde(default)]
	pub testnet_websocket_url: Option<String>,
}

fn default_telegram_api_url() -> String {
	"https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
	30
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelegramSettings {
	/// Bot token
	pub token: SecretValue,

	#[serde(default = "default_telegram_api_url")]
	pub api_url: String,

	/// Long-poll timeout passed to `getUpdates`
	#[serde(default = "default_poll_timeout_secs")]
	pub poll_timeout_secs: u64,
}

fn default_proxy_timeout_seconds() -> u64 {
	10
}

fn default_proxy_path() -> PathBuf {
	PathBuf::from("config/proxies.txt")
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProxySettings {
	/// Route provider traffic through the proxy list; an empty list is then fatal
	#[serde(default)]
	pub enabled: bool,

	#[serde(default = "default_proxy_timeout_seconds")]
	pub timeout_seconds: u64,

	/// File with one `host:port[:user:pass]` entry per line
	#[serde(default = "default_proxy_path")]
	pub path: PathBuf,
}

impl Default for ProxySettings {
	fn default() -> Self {
		Self {
			enabled: false,
			timeout_seconds: default_proxy_timeout_seconds(),
			path: default_proxy_path(),
		}
	}
}

fn default_minimum_poll_interval_ms() -> u64 {
	1000
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MonitorSettings {
	/// Consecutive failed iterations after which a monitor is abandoned; unset retries forever
	#[serde(default)]
	pub max_consecutive_failures: Option<u32>,

	/// Lower bound on the pause between two iterations of one monitor
	#[serde(default = "default_minimum_poll_interval_ms")]
	pub minimum_poll_interval_ms: u64,
}

impl Default for MonitorSettings {
	fn default() -> Self {
		Self {
			max_consecutive_failures: None,
			minimum_poll_interval_ms: default_minimum_poll_interval_ms(),
		}
	}
}

fn default_registry_path() -> PathBuf {
	PathBuf::from(DEFAULT_REGISTRY_PATH)
}

/// Process-wide settings, loaded once from a JSON file at startup.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
	pub provider: ProviderSettings,

	pub telegram: TelegramSettings,

	#[serde(default)]
	pub proxies: ProxySettings,

	/// Location of the persistent registry file
	#[serde(default = "default_registry_path")]
	pub registry_path: PathBuf,

	#[serde(default)]
	pub monitor: MonitorSettings,

	/// Retry policy for provider and chat API calls
	#[serde(default)]
	pub http_retry: RetryConfig,
}
