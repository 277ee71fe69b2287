//! Test helper utilities for tracked transactions
//!
//! - `TrackedTransactionBuilder`: Builder for creating test TrackedTransaction instances

use crate::models::{AlertRef, RequesterIdentity, TrackedTransaction, TransactionIdentity};

/// Builder for creating test TrackedTransaction instances
pub struct TrackedTransactionBuilder {
	provider: String,
	chain: String,
	txid: String,
	target_confirmations: u64,
	chat_id: i64,
	user_id: i64,
	request_message_id: i64,
	last_known_height: u64,
	block_alerts_muted: bool,
	pending_block_alert: Option<AlertRef>,
}

impl Default for TrackedTransactionBuilder {
	fn default() -> Self {
		Self {
			provider: "blockcypher".to_string(),
			chain: "btc/main".to_string(),
			txid: "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16".to_string(),
			target_confirmations: 1,
			chat_id: 1001,
			user_id: 42,
			request_message_id: 7,
			last_known_height: 0,
			block_alerts_muted: false,
			pending_block_alert: None,
		}
	}
}

impl TrackedTransactionBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn provider(mut self, provider: &str) -> Self {
		self.provider = provider.to_string();
		self
	}

	pub fn chain(mut self, chain: &str) -> Self {
		self.chain = chain.to_string();
		self
	}

	pub fn txid(mut self, txid: &str) -> Self {
		self.txid = txid.to_string();
		self
	}

	pub fn target_confirmations(mut self, target: u64) -> Self {
		self.target_confirmations = target;
		self
	}

	pub fn requester(mut self, chat_id: i64, user_id: i64) -> Self {
		self.chat_id = chat_id;
		self.user_id = user_id;
		self
	}

	pub fn request_message_id(mut self, message_id: i64) -> Self {
		self.request_message_id = message_id;
		self
	}

	pub fn last_known_height(mut self, height: u64) -> Self {
		self.last_known_height = height;
		self
	}

	pub fn muted(mut self, muted: bool) -> Self {
		self.block_alerts_muted = muted;
		self
	}

	pub fn pending_block_alert(mut self, chat_id: i64, message_id: i64) -> Self {
		self.pending_block_alert = Some(AlertRef {
			chat_id,
			message_id,
		});
		self
	}

	pub fn build(self) -> TrackedTransaction {
		TrackedTransaction {
			identity: TransactionIdentity::new(
				&self.provider,
				&self.chain,
				&self.txid,
				self.target_confirmations,
				RequesterIdentity {
					chat_id: self.chat_id,
					user_id: self.user_id,
				},
			),
			request_message_id: self.request_message_id,
			last_known_height: self.last_known_height,
			block_alerts_muted: self.block_alerts_muted,
			pending_block_alert: self.pending_block_alert,
		}
	}
}
