//! BlockCypher REST provider.
//!
//! Poll-based: every call is one request against the provider's hourly budget.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

use crate::{
	models::TransactionStatus,
	services::blockchain::{client::ProviderClient, transports::RequestDistributor},
};

const DEFAULT_BASE_URL: &str = "https://api.blockcypher.com/v1/";
const MAIN_CHAINS: [&str; 5] = ["btc/main", "eth/main", "ltc/main", "doge/main", "dash/main"];
const TEST_CHAINS: [&str; 1] = ["btc/test3"];
const MAX_REQUESTS_PER_HOUR: u32 = 200;

#[derive(Debug, Deserialize)]
struct TxResponse {
	#[serde(default)]
	confirmations: u64,
	#[serde(default)]
	double_spend: bool,
	#[serde(default)]
	double_spend_tx: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChainResponse {
	height: u64,
}

/// Client for the BlockCypher chain API
pub struct BlockCypherClient {
	distributor: Arc<RequestDistributor>,
	base_url: String,
}

impl BlockCypherClient {
	/// Creates a client over the given egress transports
	///
	/// # Arguments
	/// * `distributor` - Transports requests are rotated across
	/// * `base_url` - API root override; defaults to the public endpoint
	pub fn new(distributor: Arc<RequestDistributor>, base_url: Option<String>) -> Self {
		if distributor.len() == 1 {
			tracing::warn!(
				"BlockCypher updates with long delays and limits anonymous callers; proxies are strongly advised"
			);
		}

		Self {
			distributor,
			base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
		}
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base_url.trim_end_matches('/'), path)
	}
}

#[async_trait]
impl ProviderClient for BlockCypherClient {
	fn name(&self) -> &'static str {
		"blockcypher"
	}

	fn main_chains(&self) -> Vec<String> {
		MAIN_CHAINS.iter().map(|c| c.to_string()).collect()
	}

	fn test_chains(&self) -> Vec<String> {
		TEST_CHAINS.iter().map(|c| c.to_string()).collect()
	}

	fn format_chain_name(&self, chain: &str) -> String {
		chain.split('/').next().unwrap_or(chain).to_uppercase()
	}

	fn supports_ethereum_like_chains(&self) -> bool {
		true
	}

	fn max_requests_per_hour(&self) -> u32 {
		MAX_REQUESTS_PER_HOUR.saturating_mul(self.distributor.len() as u32)
	}

	#[instrument(skip(self), fields(provider = "blockcypher"))]
	async fn get_transaction(
		&self,
		chain: &str,
		txid: &str,
	) -> Result<TransactionStatus, anyhow::Error> {
		let body = self
			.distributor
			.next()
			.get_json(
				&self.url(&format!("{}/txs/{}", chain, txid)),
				&[StatusCode::NOT_FOUND],
			)
			.await?;

		let Some(body) = body else {
			return Ok(TransactionStatus::not_found());
		};

		let tx: TxResponse =
			serde_json::from_value(body).context("Failed to parse transaction response")?;

		Ok(TransactionStatus {
			found: true,
			confirmations: tx.confirmations,
			double_spent: tx.double_spend,
			double_spent_txid: tx.double_spend_tx,
		})
	}

	#[instrument(skip(self), fields(provider = "blockcypher"))]
	async fn get_chain_height(&self, chain: &str) -> Result<u64, anyhow::Error> {
		let body = self
			.distributor
			.next()
			.get_json(&self.url(chain), &[])
			.await?
			.context("Chain endpoint returned no body")?;

		let info: ChainResponse =
			serde_json::from_value(body).context("Failed to parse chain response")?;

		Ok(info.height)
	}
}
