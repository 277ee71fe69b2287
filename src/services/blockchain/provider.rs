//! The configured provider.
//!
//! A process talks to exactly one provider. [`ProviderClientType`] wraps the concrete
//! client selected by the settings and forwards every [`ProviderClient`] call to it, so
//! callers stay generic over a single concrete type.

use async_trait::async_trait;
use std::sync::Arc;

use crate::{
	models::{ProviderKind, Settings, TransactionStatus},
	services::blockchain::{
		bridge::WebSocketBridge,
		client::ProviderClient,
		clients::{BlockCypherClient, MempoolClient, SoChainClient},
		transports::RequestDistributor,
		BlockChainError,
	},
};

/// Every supported provider
pub enum ProviderClientType {
	BlockCypher(BlockCypherClient),
	SoChain(SoChainClient),
	Mempool(MempoolClient<WebSocketBridge>),
}

impl ProviderClientType {
	/// Builds the provider named in the settings
	///
	/// # Arguments
	/// * `settings` - Process settings; provider overrides, proxies and retry policy apply
	///
	/// # Returns
	/// * `Result<Self, BlockChainError>` - The provider, or a configuration error (for
	///   instance when proxies are enabled but none are listed)
	pub async fn from_settings(settings: &Settings) -> Result<Self, BlockChainError> {
		let distributor = RequestDistributor::from_settings(&settings.proxies, &settings.http_retry)
			.await
			.map_err(|e| {
				BlockChainError::configuration_error(
					format!("Failed to set up {} transports", settings.provider.name),
					Some(Box::new(e)),
					None,
				)
			})?;
		let distributor = Arc::new(distributor);
		let provider = &settings.provider;

		let client = match provider.name {
			ProviderKind::BlockCypher => {
				Self::BlockCypher(BlockCypherClient::new(distributor, provider.base_url.clone()))
			}
			ProviderKind::SoChain => {
				Self::SoChain(SoChainClient::new(distributor, provider.base_url.clone()))
			}
			ProviderKind::Mempool => Self::Mempool(MempoolClient::new(distributor, provider)),
		};

		tracing::info!(
			provider = client.name(),
			budget = client.max_requests_per_hour(),
			"provider initialized"
		);

		Ok(client)
	}

	fn inner(&self) -> &dyn ProviderClient {
		match self {
			Self::BlockCypher(client) => client,
			Self::SoChain(client) => client,
			Self::Mempool(client) => client,
		}
	}
}

#[async_trait]
impl ProviderClient for ProviderClientType {
	fn name(&self) -> &'static str {
		self.inner().name()
	}

	fn main_chains(&self) -> Vec<String> {
		self.inner().main_chains()
	}

	fn test_chains(&self) -> Vec<String> {
		self.inner().test_chains()
	}

	fn format_chain_name(&self, chain: &str) -> String {
		self.inner().format_chain_name(chain)
	}

	fn supports_ethereum_like_chains(&self) -> bool {
		self.inner().supports_ethereum_like_chains()
	}

	fn max_requests_per_hour(&self) -> u32 {
		self.inner().max_requests_per_hour()
	}

	async fn get_transaction(
		&self,
		chain: &str,
		txid: &str,
	) -> Result<TransactionStatus, anyhow::Error> {
		self.inner().get_transaction(chain, txid).await
	}

	async fn get_chain_height(&self, chain: &str) -> Result<u64, anyhow::Error> {
		self.inner().get_chain_height(chain).await
	}

	async fn retain(&self, chain: &str, txid: &str) {
		self.inner().retain(chain, txid).await
	}

	async fn release(&self, chain: &str, txid: &str) {
		self.inner().release(chain, txid).await
	}
}
