//! Domain models and data structures for transaction confirmation monitoring.
//!
//! - `config`: Configuration loading and validation
//! - `core`: Core domain models (TrackedTransaction, Notification, Settings)
//! - `security`: Security models (Secret)

mod config;
mod core;
mod security;

// Re-export core types
pub use core::{
	AlertButton, AlertOptions, AlertRef, MonitorSettings, Notification, ProviderKind,
	ProviderSettings, Proxy, ProxyCredentials, ProxySettings, Recipient, RequesterIdentity,
	Settings, SupportedChains, TelegramSettings, TrackedTransaction, TransactionIdentity,
	TransactionStatus,
};

// Re-export config types
pub use config::{ConfigError, ConfigLoader};

// Re-export security types
pub use security::{SecretString, SecretValue, SecurityError, SecurityResult};
