//! Finds the chain a transaction lives on.

use crate::{
	models::TransactionStatus,
	services::blockchain::{is_test_chain, ProviderClient},
};

/// A transaction found on one of the provider's chains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedTransaction {
	/// Provider-specific chain identifier
	pub chain: String,
	/// Whether the chain is a test network
	pub testnet: bool,
	/// Status reported by the lookup that found it
	pub status: TransactionStatus,
}

/// Queries main chains, then test chains, in priority order until one knows the txid.
///
/// A failing lookup is logged and treated as "not on this chain".
///
/// # Returns
/// * `Option<LocatedTransaction>` - The first chain reporting `found`, if any
pub async fn locate_transaction<P>(provider: &P, txid: &str) -> Option<LocatedTransaction>
where
	P: ProviderClient + ?Sized,
{
	let chains = provider
		.main_chains()
		.into_iter()
		.chain(provider.test_chains());

	for chain in chains {
		match provider.get_transaction(&chain, txid).await {
			Ok(status) if status.found => {
				tracing::info!(txid = %txid, chain = %chain, "transaction located");
				return Some(LocatedTransaction {
					testnet: is_test_chain(provider, &chain),
					chain,
					status,
				});
			}
			Ok(_) => {}
			Err(e) => {
				tracing::warn!(txid = %txid, chain = %chain, error = %e, "chain lookup failed");
			}
		}
	}

	None
}
