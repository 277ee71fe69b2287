use serde::{Deserialize, Serialize};

/// Where a notification goes: a chat, optionally as a reply to a specific message.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct Recipient {
	pub chat_id: i64,
	pub reply_to_message_id: Option<i64>,
}

impl Recipient {
	pub fn chat(chat_id: i64) -> Self {
		Self {
			chat_id,
			reply_to_message_id: None,
		}
	}

	pub fn reply(chat_id: i64, message_id: i64) -> Self {
		Self {
			chat_id,
			reply_to_message_id: Some(message_id),
		}
	}
}

/// Chains a provider can locate transactions on, already formatted for display.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SupportedChains {
	pub main: Vec<String>,
	pub test: Vec<String>,
}

/// Every message the service can send to a requester.
///
/// Variants carry only the data needed to render them; the notifier decides on markup.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
	/// Greeting; `name` falls back to a generic salutation
	Welcome {
		name: Option<String>,
		private_chat: bool,
	},
	/// Command syntax reminder
	Usage {
		command: String,
		arguments: String,
	},
	Locating,
	Located {
		chain: String,
		testnet: bool,
	},
	NotLocated {
		supported: SupportedChains,
	},
	UnsupportedChain {
		supported: SupportedChains,
	},
	InvalidConfirmations {
		max: u64,
	},
	AlreadyTracking,
	AlreadyReached {
		confirmations: u64,
	},
	CurrentConfirmations {
		confirmations: u64,
	},
	TrackingStarted {
		target: u64,
		has_confirmations: bool,
	},
	Confirmed {
		confirmations: u64,
	},
	DoubleSpent {
		replacement_txid: Option<String>,
	},
	BlockNotIncluded {
		height: u64,
	},
	Included {
		height: u64,
		target: u64,
	},
	ResubmitRequired,
}

impl Notification {
	/// Label used for metrics and logs
	pub fn kind(&self) -> &'static str {
		match self {
			Notification::Welcome { .. } => "welcome",
			Notification::Usage { .. } => "usage",
			Notification::Locating => "locating",
			Notification::Located { .. } => "located",
			Notification::NotLocated { .. } => "not_located",
			Notification::UnsupportedChain { .. } => "unsupported_chain",
			Notification::InvalidConfirmations { .. } => "invalid_confirmations",
			Notification::AlreadyTracking => "already_tracking",
			Notification::AlreadyReached { .. } => "already_reached",
			Notification::CurrentConfirmations { .. } => "current_confirmations",
			Notification::TrackingStarted { .. } => "tracking_started",
			Notification::Confirmed { .. } => "confirmed",
			Notification::DoubleSpent { .. } => "double_spent",
			Notification::BlockNotIncluded { .. } => "block_not_included",
			Notification::Included { .. } => "included",
			Notification::ResubmitRequired => "resubmit_required",
		}
	}
}

/// Inline button attached to an alert
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AlertButton {
	pub label: String,
	pub callback_data: String,
}

/// Extra presentation options for a notification
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AlertOptions {
	pub buttons: Vec<AlertButton>,
}

impl AlertOptions {
	/// Options carrying the single mute/unmute button of a block alert.
	///
	/// # Arguments
	/// * `stable_hash` - Stable hash of the tracked transaction the button toggles
	/// * `muted` - Current mute state; the label offers the opposite action
	pub fn block_alert_toggle(stable_hash: &str, muted: bool) -> Self {
		let label = if muted {
			"🔔 Unmute block alerts"
		} else {
			"🔕 Mute block alerts"
		};
		Self {
			buttons: vec![AlertButton {
				label: label.to_string(),
				callback_data: format!(
					"{}:{}",
					crate::utils::constants::TOGGLE_BLOCK_ALERTS_ACTION,
					stable_hash
				),
			}],
		}
	}

	/// Options that strip every button from an alert
	pub fn none() -> Self {
		Self::default()
	}
}
