//! SoChain REST provider.
//!
//! SoChain reports unknown transactions inconsistently: a 404, a 500 or a body whose
//! `status` is not `success` all mean the transaction is not on that chain.

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

const DEFAULT_BASE_URL: &str = "https://chain.so/api/v2/";
const MAIN_CHAINS: [&str; 5] = ["BTC", "LTC", "DOGE", "DASH", "ZEC"];
const TEST_CHAIN_SUFFIX: &str = "TEST";
const MAX_REQUESTS_PER_HOUR: u32 = 300;

#[derive(Debug, Deserialize)]
struct ResponseBase<T> {
	status: String,
	data: Option<T>,
}

impl<T> ResponseBase<T> {
	fn is_successful(&self) -> bool {
		self.status == "success"
	}
}

#[derive(Debug, Deserialize)]
struct TxConfirmationInfo {
	#[serde(default)]
	confirmations: u64,
}

#[derive(Debug, Deserialize)]
struct NetworkInfo {
	blocks: u64,
}

/// Client for the SoChain API
pub struct SoChainClient {
	distributor: Arc<RequestDistributor>,
	base_url: String,
}

impl SoChainClient {
	pub fn new(distributor: Arc<RequestDistributor>, base_url: Option<String>) -> Self {
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
impl ProviderClient for SoChainClient {
	fn name(&self) -> &'static str {
		"sochain"
	}

	fn main_chains(&self) -> Vec<String> {
		MAIN_CHAINS.iter().map(|c| c.to_string()).collect()
	}

	fn test_chains(&self) -> Vec<String> {
		MAIN_CHAINS
			.iter()
			.map(|c| format!("{}{}", c, TEST_CHAIN_SUFFIX))
			.collect()
	}

	fn format_chain_name(&self, chain: &str) -> String {
		chain
			.strip_suffix(TEST_CHAIN_SUFFIX)
			.unwrap_or(chain)
			.to_string()
	}

	fn supports_ethereum_like_chains(&self) -> bool {
		false
	}

	fn max_requests_per_hour(&self) -> u32 {
		MAX_REQUESTS_PER_HOUR.saturating_mul(self.distributor.len() as u32)
	}

	#[instrument(skip(self), fields(provider = "sochain"))]
	async fn get_transaction(
		&self,
		chain: &str,
		txid: &str,
	) -> Result<TransactionStatus, anyhow::Error> {
		let body = self
			.distributor
			.next()
			.get_json(
				&self.url(&format!("is_tx_confirmed/{}/{}", chain, txid)),
				&[StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR],
			)
			.await?;

		let Some(body) = body else {
			return Ok(TransactionStatus::not_found());
		};

		let response: ResponseBase<TxConfirmationInfo> =
			serde_json::from_value(body).context("Failed to parse confirmation response")?;

		if !response.is_successful() {
			return Ok(TransactionStatus::not_found());
		}

		Ok(TransactionStatus::with_confirmations(
			response.data.map(|d| d.confirmations).unwrap_or_default(),
		))
	}

	#[instrument(skip(self), fields(provider = "sochain"))]
	async fn get_chain_height(&self, chain: &str) -> Result<u64, anyhow::Error> {
		let body = self
			.distributor
			.next()
			.get_json(&self.url(&format!("get_info/{}", chain)), &[])
			.await?
			.context("Network info endpoint returned no body")?;

		let response: ResponseBase<NetworkInfo> =
			serde_json::from_value(body).context("Failed to parse network info response")?;

		if !response.is_successful() {
			anyhow::bail!("Network info request for {} was not successful", chain);
		}

		response
			.data
			.map(|info| info.blocks)
			.context("Network info response has no data")
	}
}
