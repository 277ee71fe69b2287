//! Constants shared across the service.

/// Largest confirmation target a requester may ask for
pub const MAX_TARGET_CONFIRMATIONS: u64 = 50;

/// Confirmation target used when a request does not specify one
pub const DEFAULT_TARGET_CONFIRMATIONS: u64 = 1;

/// Callback action attached to "new block, not included" alerts
pub const TOGGLE_BLOCK_ALERTS_ACTION: &str = "toggleBlockAlerts";

/// Default location of the settings file
pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";

/// Default location of the persistent registry
pub const DEFAULT_REGISTRY_PATH: &str = "data/tracked_transactions.json";

/// Interval between keepalive frames on push-bridge connections
pub const PUSH_BRIDGE_KEEPALIVE_SECS: u64 = 30;

/// Project documentation referenced from startup errors
pub const DOCUMENTATION_PATH: &str = "README.md";
