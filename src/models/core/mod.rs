//! Core domain models for the confirmation monitor.
//!
//! - Transactions: tracked entries, their identity and provider-reported status
//! - Notifications: messages sent back to requesters and their presentation options
//! - Settings: process configuration, including proxies

mod notification;
mod proxy;
mod settings;
mod transaction;

pub use notification::{AlertButton, AlertOptions, Notification, Recipient, SupportedChains};
pub use proxy::{Proxy, ProxyCredentials};
pub use settings::{
	MonitorSettings, ProviderKind, ProviderSettings, ProxySettings, Settings, TelegramSettings,
};
pub use transaction::{
	AlertRef, RequesterIdentity, TrackedTransaction, TransactionIdentity, TransactionStatus,
};
