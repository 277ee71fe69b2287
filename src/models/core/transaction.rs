use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The chat participant who asked for a transaction to be watched.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct RequesterIdentity {
	/// Chat the request was sent from; notifications go back here
	pub chat_id: i64,

	/// User who sent the request; the only one allowed to toggle its alerts
	pub user_id: i64,
}

/// Uniquely identifies one tracking request.
///
/// The registry never holds two entries with the same identity.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct TransactionIdentity {
	/// Provider name, always lowercased
	pub provider: String,

	/// Provider-specific chain identifier (e.g. `btc/main`, `DOGETEST`, `main`)
	pub chain: String,

	/// Transaction id as submitted, `0x` prefix included for ETH-like chains
	pub txid: String,

	/// Confirmation count at which the requester wants to be notified
	pub target_confirmations: u64,

	pub requester: RequesterIdentity,
}

impl TransactionIdentity {
	pub fn new(
		provider: &str,
		chain: &str,
		txid: &str,
		target_confirmations: u64,
		requester: RequesterIdentity,
	) -> Self {
		Self {
			provider: provider.to_lowercase(),
			chain: chain.to_string(),
			txid: txid.to_string(),
			target_confirmations,
			requester,
		}
	}

	/// Canonical `provider|chain|txid|target|chat_id|user_id` form the stable hash is taken over
	pub fn canonical_form(&self) -> String {
		format!(
			"{}|{}|{}|{}|{}|{}",
			self.provider,
			self.chain,
			self.txid,
			self.target_confirmations,
			self.requester.chat_id,
			self.requester.user_id
		)
	}

	/// Short, process-independent key for this identity.
	///
	/// The first 8 bytes of the SHA-256 of [`Self::canonical_form`], hex encoded. Chat
	/// callback payloads are size-limited, so this is what goes into button data.
	///
	/// # Returns
	/// * `String` - 16 lowercase hex characters
	pub fn stable_hash(&self) -> String {
		let digest = Sha256::digest(self.canonical_form().as_bytes());
		hex::encode(&digest[..8])
	}
}

/// Handle to a message previously delivered by the notifier.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct AlertRef {
	pub chat_id: i64,
	pub message_id: i64,
}

/// A transaction being watched, as persisted in the registry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TrackedTransaction {
	#[serde(flatten)]
	pub identity: TransactionIdentity,

	/// Message the requester sent; notifications are posted as replies to it
	pub request_message_id: i64,

	/// Last chain height a monitor acted on, 0 when not yet observed
	#[serde(default)]
	pub last_known_height: u64,

	/// Whether "new block, not included" alerts are suppressed
	#[serde(default)]
	pub block_alerts_muted: bool,

	/// Most recent "new block, not included" alert, retracted when superseded
	#[serde(default)]
	pub pending_block_alert: Option<AlertRef>,
}

impl TrackedTransaction {
	pub fn new(identity: TransactionIdentity, request_message_id: i64) -> Self {
		Self {
			identity,
			request_message_id,
			last_known_height: 0,
			block_alerts_muted: false,
			pending_block_alert: None,
		}
	}

	pub fn stable_hash(&self) -> String {
		self.identity.stable_hash()
	}

	pub fn txid(&self) -> &str {
		&self.identity.txid
	}

	pub fn chain(&self) -> &str {
		&self.identity.chain
	}
}

/// Point-in-time view of a transaction as reported by a provider.
///
/// Never persisted; a missing transaction is `found == false`, not an error.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TransactionStatus {
	pub found: bool,
	pub confirmations: u64,
	pub double_spent: bool,
	pub double_spent_txid: Option<String>,
}

impl TransactionStatus {
	/// Status for a transaction the provider does not know about
	pub fn not_found() -> Self {
		Self::default()
	}

	/// Status for a known, not double-spent transaction
	pub fn with_confirmations(confirmations: u64) -> Self {
		Self {
			found: true,
			confirmations,
			..Self::default()
		}
	}
}
