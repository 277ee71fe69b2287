//! Core provider client interface.
//!
//! Every data source (polling or push-driven) implements [`ProviderClient`], so the
//! monitor state machine sees one contract regardless of how status updates arrive.

use async_trait::async_trait;

use crate::models::{SupportedChains, TransactionStatus};

/// Defines the interface of a transaction data provider
///
/// Implementations must treat "transaction not found" as `found == false` and reserve
/// errors for transport faults and unexpected responses.
#[async_trait]
pub trait ProviderClient: Send + Sync {
	/// Lowercase provider name stored in registry entries
	fn name(&self) -> &'static str;

	/// Main network chain identifiers, highest locate priority first
	fn main_chains(&self) -> Vec<String>;

	/// Test network chain identifiers, highest locate priority first
	fn test_chains(&self) -> Vec<String>;

	/// Human readable name of a chain identifier
	fn format_chain_name(&self, chain: &str) -> String;

	/// Whether `0x`-prefixed transaction ids can be located
	fn supports_ethereum_like_chains(&self) -> bool;

	/// Effective hourly request budget across all egress paths, 0 for unlimited
	fn max_requests_per_hour(&self) -> u32;

	/// Retrieves the status of a transaction on a chain
	///
	/// # Arguments
	/// * `chain` - Provider-specific chain identifier
	/// * `txid` - Transaction id as submitted
	///
	/// # Returns
	/// * `Result<TransactionStatus, anyhow::Error>` - The status (possibly not found) or a
	///   transient error
	async fn get_transaction(
		&self,
		chain: &str,
		txid: &str,
	) -> Result<TransactionStatus, anyhow::Error>;

	/// Retrieves the current height of a chain
	///
	/// # Returns
	/// * `Result<u64, anyhow::Error>` - The latest block height or an error
	async fn get_chain_height(&self, chain: &str) -> Result<u64, anyhow::Error>;

	/// Registers interest in a transaction ahead of status lookups.
	///
	/// Every `retain` is paired with one [`ProviderClient::release`]. Polling providers
	/// keep no per-transaction state and ignore both.
	async fn retain(&self, _chain: &str, _txid: &str) {}

	/// Drops interest in a transaction; the last release frees any state kept for it
	async fn release(&self, _chain: &str, _txid: &str) {}
}

/// Whether `chain` is one of the provider's test network chains
pub fn is_test_chain<P: ProviderClient + ?Sized>(provider: &P, chain: &str) -> bool {
	provider.test_chains().iter().any(|c| c == chain)
}

/// Display names of every chain the provider can locate transactions on
pub fn supported_chains<P: ProviderClient + ?Sized>(provider: &P) -> SupportedChains {
	SupportedChains {
		main: provider
			.main_chains()
			.iter()
			.map(|chain| provider.format_chain_name(chain))
			.collect(),
		test: provider
			.test_chains()
			.iter()
			.map(|chain| provider.format_chain_name(chain))
			.collect(),
	}
}
