//! Mempool push provider.
//!
//! Each transaction is looked up over REST once. After that its status lives in a
//! per-chain [`ChainPushState`] that the push bridge mutates as blocks and replacements
//! arrive, so steady-state monitor iterations never hit the REST API. Cached entries are
//! counted per watcher and dropped, along with their subscription, when the last watcher
//! releases them.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::instrument;

use crate::{
	models::{ProviderSettings, TransactionStatus},
	services::blockchain::{
		bridge::{BridgeEvent, BridgeEventHandler, PushBridge, WebSocketBridge},
		client::ProviderClient,
		transports::RequestDistributor,
		BlockChainError,
	},
	utils::ClientStorage,
};

const MAIN_CHAIN: &str = "main";
const TEST_CHAIN: &str = "test";
const DEFAULT_BASE_URL: &str = "https://mempool.space/api/";
const DEFAULT_TESTNET_BASE_URL: &str = "https://mempool.space/testnet/api/";
const DEFAULT_WEBSOCKET_URL: &str = "wss://mempool.space/api/v1/ws";
const DEFAULT_TESTNET_WEBSOCKET_URL: &str = "wss://mempool.space/testnet/api/v1/ws";

#[derive(Debug, Deserialize)]
struct TxResponse {
	status: TxStatusResponse,
}

#[derive(Debug, Deserialize)]
struct TxStatusResponse {
	confirmed: bool,
	#[serde(default)]
	block_height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BlockResponse {
	height: u64,
}

/// REST and push endpoints of one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolEndpoints {
	pub rest_url: String,
	pub websocket_url: String,
}

impl MempoolEndpoints {
	/// Endpoints for `main` and `test`, with settings overrides applied
	pub fn from_settings(settings: &ProviderSettings) -> (Self, Self) {
		(
			Self {
				rest_url: settings
					.base_url
					.clone()
					.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
				websocket_url: settings
					.websocket_url
					.clone()
					.unwrap_or_else(|| DEFAULT_WEBSOCKET_URL.to_string()),
			},
			Self {
				rest_url: settings
					.testnet_base_url
					.clone()
					.unwrap_or_else(|| DEFAULT_TESTNET_BASE_URL.to_string()),
				websocket_url: settings
					.testnet_websocket_url
					.clone()
					.unwrap_or_else(|| DEFAULT_TESTNET_WEBSOCKET_URL.to_string()),
			},
		)
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.rest_url.trim_end_matches('/'), path)
	}
}

/// Push-maintained view of one chain: cached statuses and the cached height
#[derive(Debug, Default)]
pub struct ChainPushState {
	statuses: RwLock<HashMap<String, TransactionStatus>>,
	watchers: RwLock<HashMap<String, usize>>,
	height: RwLock<Option<u64>>,
	last_tracked: RwLock<Option<String>>,
}

impl ChainPushState {
	/// A copy of the cached status of `txid`, if it was looked up before
	pub async fn status(&self, txid: &str) -> Option<TransactionStatus> {
		self.statuses.read().await.get(txid).cloned()
	}

	/// Caches the looked-up status of `txid` and makes it the most recently tracked.
	///
	/// If another caller registered the transaction first, that status wins.
	///
	/// # Returns
	/// * `(TransactionStatus, bool)` - The cached status and whether this call inserted it
	pub async fn register(&self, txid: &str, status: TransactionStatus) -> (TransactionStatus, bool) {
		let mut statuses = self.statuses.write().await;
		if let Some(existing) = statuses.get(txid) {
			return (existing.clone(), false);
		}
		statuses.insert(txid.to_string(), status.clone());
		*self.last_tracked.write().await = Some(txid.to_string());
		(status, true)
	}

	/// Forgets the cached status of a transaction
	///
	/// # Returns
	/// * `bool` - Whether a status was cached
	pub async fn unregister(&self, txid: &str) -> bool {
		let removed = self.statuses.write().await.remove(txid).is_some();
		let mut last_tracked = self.last_tracked.write().await;
		if last_tracked.as_deref() == Some(txid) {
			*last_tracked = None;
		}
		removed
	}

	/// Adds a watcher of `txid`
	pub async fn retain(&self, txid: &str) {
		*self
			.watchers
			.write()
			.await
			.entry(txid.to_string())
			.or_insert(0) += 1;
	}

	/// Removes a watcher of `txid`, forgetting the transaction once none is left
	///
	/// # Returns
	/// * `bool` - Whether a cached status was forgotten
	pub async fn release(&self, txid: &str) -> bool {
		{
			let mut watchers = self.watchers.write().await;
			match watchers.get_mut(txid) {
				Some(count) if *count > 1 => {
					*count -= 1;
					return false;
				}
				_ => {
					watchers.remove(txid);
				}
			}
		}
		self.unregister(txid).await
	}

	pub async fn watcher_count(&self, txid: &str) -> usize {
		self.watchers.read().await.get(txid).copied().unwrap_or(0)
	}

	pub async fn height(&self) -> Option<u64> {
		*self.height.read().await
	}

	/// Caches the height unless a value is already known
	pub async fn set_height_if_unknown(&self, height: u64) -> u64 {
		*self.height.write().await.get_or_insert(height)
	}

	async fn resolve_target(&self, txid: Option<String>) -> Option<String> {
		match txid {
			Some(txid) => Some(txid),
			None => self.last_tracked.read().await.clone(),
		}
	}

	/// Every tracked transaction that is already in a block gains a confirmation
	async fn apply_block(&self, statuses: &mut HashMap<String, TransactionStatus>, skip: Option<&str>) {
		for (txid, status) in statuses.iter_mut() {
			if Some(txid.as_str()) != skip && status.confirmations > 0 {
				status.confirmations += 1;
			}
		}
		if let Some(height) = self.height.write().await.as_mut() {
			*height += 1;
		}
	}
}

#[async_trait]
impl BridgeEventHandler for ChainPushState {
	async fn handle_event(&self, event: BridgeEvent) {
		match event {
			BridgeEvent::BlockMined { .. } => {
				let mut statuses = self.statuses.write().await;
				self.apply_block(&mut statuses, None).await;
			}
			BridgeEvent::TxConfirmed { txid, .. } => {
				let target = self.resolve_target(txid).await;
				let mut statuses = self.statuses.write().await;
				if let Some(status) = target.as_deref().and_then(|t| statuses.get_mut(t)) {
					if status.confirmations == 0 {
						status.confirmations = 1;
					}
				}
				self.apply_block(&mut statuses, target.as_deref()).await;
			}
			BridgeEvent::TxReplaced { txid, replacement } => {
				let target = self.resolve_target(txid).await;
				let mut statuses = self.statuses.write().await;
				if let Some(status) = target.as_deref().and_then(|t| statuses.get_mut(t)) {
					status.double_spent = true;
					status.double_spent_txid = Some(replacement);
				}
			}
		}
	}
}

/// A chain's bridge together with the state it feeds
pub struct PushChannel<B> {
	pub bridge: B,
	pub state: Arc<ChainPushState>,
}

/// Creates a bridge to a WebSocket URL that reports to the given handler
pub type BridgeFactory<B> =
	Box<dyn Fn(&str, Arc<dyn BridgeEventHandler>) -> Result<B, BlockChainError> + Send + Sync>;

/// Client for the mempool.space API
pub struct MempoolClient<B: PushBridge> {
	distributor: Arc<RequestDistributor>,
	main: MempoolEndpoints,
	test: MempoolEndpoints,
	channels: ClientStorage<PushChannel<B>>,
	bridge_factory: BridgeFactory<B>,
}

impl MempoolClient<WebSocketBridge> {
	/// Creates a client whose bridges are live WebSocket connections
	///
	/// Bridges connect directly; egress proxies apply to REST lookups only.
	pub fn new(distributor: Arc<RequestDistributor>, settings: &ProviderSettings) -> Self {
		let (main, test) = MempoolEndpoints::from_settings(settings);
		Self::new_with_bridge_factory(
			distributor,
			main,
			test,
			Box::new(|url, handler| Ok(WebSocketBridge::connect(url.to_string(), handler))),
		)
	}
}

impl<B: PushBridge> MempoolClient<B> {
	pub fn new_with_bridge_factory(
		distributor: Arc<RequestDistributor>,
		main: MempoolEndpoints,
		test: MempoolEndpoints,
		bridge_factory: BridgeFactory<B>,
	) -> Self {
		Self {
			distributor,
			main,
			test,
			channels: ClientStorage::new(),
			bridge_factory,
		}
	}

	fn endpoints(&self, chain: &str) -> Result<&MempoolEndpoints, BlockChainError> {
		match chain {
			MAIN_CHAIN => Ok(&self.main),
			TEST_CHAIN => Ok(&self.test),
			other => Err(BlockChainError::unsupported_chain(
				format!("mempool has no chain named {}", other),
				None,
				None,
			)),
		}
	}

	/// The push channel of `chain`, connecting its bridge on first use
	async fn channel(&self, chain: &str) -> Result<Arc<PushChannel<B>>, BlockChainError> {
		let endpoints = self.endpoints(chain)?;
		self.channels
			.get_or_try_create(chain, || async {
				let state = Arc::new(ChainPushState::default());
				let bridge = (self.bridge_factory)(&endpoints.websocket_url, state.clone())?;
				tracing::info!(chain = %chain, url = %endpoints.websocket_url, "push bridge created");
				Ok(PushChannel { bridge, state })
			})
			.await
	}

	async fn fetch_height(&self, endpoints: &MempoolEndpoints) -> Result<u64, anyhow::Error> {
		let body = self
			.distributor
			.next()
			.get_json(&endpoints.url("blocks"), &[])
			.await?
			.context("Blocks endpoint returned no body")?;

		let blocks: Vec<BlockResponse> =
			serde_json::from_value(body).context("Failed to parse blocks response")?;

		blocks
			.first()
			.map(|block| block.height)
			.context("Blocks response is empty")
	}
}

#[async_trait]
impl<B: PushBridge> ProviderClient for MempoolClient<B> {
	fn name(&self) -> &'static str {
		"mempool"
	}

	fn main_chains(&self) -> Vec<String> {
		vec![MAIN_CHAIN.to_string()]
	}

	fn test_chains(&self) -> Vec<String> {
		vec![TEST_CHAIN.to_string()]
	}

	fn format_chain_name(&self, _chain: &str) -> String {
		"BTC".to_string()
	}

	fn supports_ethereum_like_chains(&self) -> bool {
		false
	}

	fn max_requests_per_hour(&self) -> u32 {
		0
	}

	#[instrument(skip(self), fields(provider = "mempool"))]
	async fn get_transaction(
		&self,
		chain: &str,
		txid: &str,
	) -> Result<TransactionStatus, anyhow::Error> {
		let channel = self.channel(chain).await?;

		if let Some(status) = channel.state.status(txid).await {
			return Ok(status);
		}

		let endpoints = self.endpoints(chain)?;
		let body = self
			.distributor
			.next()
			.get_json(
				&endpoints.url(&format!("tx/{}", txid)),
				&[StatusCode::NOT_FOUND],
			)
			.await?;

		let Some(body) = body else {
			return Ok(TransactionStatus::not_found());
		};

		let tx: TxResponse =
			serde_json::from_value(body).context("Failed to parse transaction response")?;

		let confirmations = match (tx.status.confirmed, tx.status.block_height) {
			(true, Some(block_height)) => {
				let height = self.get_chain_height(chain).await?;
				height.saturating_sub(block_height) + 1
			}
			_ => 0,
		};

		let (status, inserted) = channel
			.state
			.register(txid, TransactionStatus::with_confirmations(confirmations))
			.await;

		if inserted {
			if let Err(e) = channel.bridge.track_transaction(txid).await {
				channel.state.unregister(txid).await;
				return Err(e.into());
			}
		}

		Ok(status)
	}

	#[instrument(skip(self), fields(provider = "mempool"))]
	async fn get_chain_height(&self, chain: &str) -> Result<u64, anyhow::Error> {
		let channel = self.channel(chain).await?;

		if let Some(height) = channel.state.height().await {
			return Ok(height);
		}

		let height = self.fetch_height(self.endpoints(chain)?).await?;
		Ok(channel.state.set_height_if_unknown(height).await)
	}

	async fn retain(&self, chain: &str, txid: &str) {
		match self.channel(chain).await {
			Ok(channel) => channel.state.retain(txid).await,
			Err(e) => tracing::warn!(chain = %chain, txid = %txid, error = %e, "cannot retain transaction"),
		}
	}

	async fn release(&self, chain: &str, txid: &str) {
		let Some(channel) = self.channels.get(chain).await else {
			return;
		};
		if !channel.state.release(txid).await {
			return;
		}
		tracing::debug!(chain = %chain, txid = %txid, "released push state");
		if let Err(e) = channel.bridge.untrack_transaction(txid).await {
			tracing::warn!(chain = %chain, txid = %txid, error = %e, "failed to untrack transaction");
		}
	}
}
