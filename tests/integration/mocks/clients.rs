//! Mock implementations of provider clients.
//!
//! - [`MockProviderClient`] - Mock of the uniform provider interface
//! - [`MockPushBridge`] - Mock of a push bridge subscription handle

use std::{
	collections::VecDeque,
	sync::{Arc, Mutex},
};

use async_trait::async_trait;
use mockall::mock;

use txconfirm_monitor::{
	models::TransactionStatus,
	services::blockchain::{BlockChainError, ProviderClient, PushBridge},
};

mock! {
	/// Mock implementation of the provider client trait.
	pub ProviderClient {}

	#[async_trait]
	impl ProviderClient for ProviderClient {
		fn name(&self) -> &'static str;
		fn main_chains(&self) -> Vec<String>;
		fn test_chains(&self) -> Vec<String>;
		fn format_chain_name(&self, chain: &str) -> String;
		fn supports_ethereum_like_chains(&self) -> bool;
		fn max_requests_per_hour(&self) -> u32;
		async fn get_transaction(
			&self,
			chain: &str,
			txid: &str,
		) -> Result<TransactionStatus, anyhow::Error>;
		async fn get_chain_height(&self, chain: &str) -> Result<u64, anyhow::Error>;
	}
}

mock! {
	/// Mock implementation of a push bridge.
	pub PushBridge {}

	#[async_trait]
	impl PushBridge for PushBridge {
		async fn track_transaction(&self, txid: &str) -> Result<(), BlockChainError>;
		async fn untrack_transaction(&self, txid: &str) -> Result<(), BlockChainError>;
	}
}

/// A provider shaped like BlockCypher (`btc/main` then `btc/test3`), unlimited budget
///
/// Transaction and height expectations are left to the caller.
pub fn create_btc_provider() -> MockProviderClient {
	let mut provider = MockProviderClient::new();
	provider.expect_name().return_const("blockcypher");
	provider
		.expect_main_chains()
		.returning(|| vec!["btc/main".to_string()]);
	provider
		.expect_test_chains()
		.returning(|| vec!["btc/test3".to_string()]);
	provider
		.expect_format_chain_name()
		.returning(|chain| chain.split('/').next().unwrap_or(chain).to_uppercase());
	provider
		.expect_supports_ethereum_like_chains()
		.return_const(false);
	provider.expect_max_requests_per_hour().return_const(0u32);
	provider
}

/// Serves queued values in order, repeating the last one once the queue runs dry
#[derive(Clone)]
pub struct Script<T: Clone> {
	queue: Arc<Mutex<VecDeque<T>>>,
}

impl<T: Clone> Script<T> {
	pub fn new(values: Vec<T>) -> Self {
		Self {
			queue: Arc::new(Mutex::new(values.into())),
		}
	}

	pub fn next(&self) -> T {
		let mut queue = self.queue.lock().unwrap();
		if queue.len() > 1 {
			queue.pop_front().unwrap()
		} else {
			queue.front().cloned().expect("script must not be empty")
		}
	}
}
