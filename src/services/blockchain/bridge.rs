//! Push bridge: turns asynchronous chain events into state updates.
//!
//! A bridge owns one WebSocket connection to a push provider. It subscribes to new
//! blocks, tracks individual transactions on request and forwards every decoded event to
//! a [`BridgeEventHandler`]. Connections are kept alive with periodic pings and
//! re-established after a constant pause whenever they drop; every transaction still
//! tracked is re-subscribed on reconnect.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
	time::Duration,
};
use tokio::{
	sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
	task::JoinHandle,
	time::interval,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::{services::blockchain::BlockChainError, utils::constants::PUSH_BRIDGE_KEEPALIVE_SECS};

/// Pause between a dropped connection and the next connect attempt
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// A chain event delivered by a push provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
	/// A block was mined that confirms none of the tracked transactions
	BlockMined { height: Option<u64> },
	/// A block was mined that confirms a tracked transaction
	TxConfirmed {
		txid: Option<String>,
		height: Option<u64>,
	},
	/// A tracked transaction was replaced (RBF) by `replacement`
	TxReplaced {
		txid: Option<String>,
		replacement: String,
	},
}

/// Subscription side of a push bridge
#[async_trait]
pub trait PushBridge: Send + Sync {
	/// Subscribes to updates for a transaction. Repeated calls for one txid are no-ops.
	async fn track_transaction(&self, txid: &str) -> Result<(), BlockChainError>;

	/// Stops re-subscribing a transaction on reconnect.
	///
	/// The push API has no per-transaction unsubscribe, so the live subscription lapses
	/// with the current connection.
	async fn untrack_transaction(&self, txid: &str) -> Result<(), BlockChainError>;
}

/// Receives every event a bridge decodes
#[async_trait]
pub trait BridgeEventHandler: Send + Sync {
	async fn handle_event(&self, event: BridgeEvent);
}

/// Decodes one text frame from the provider.
///
/// Returns `None` for frames that carry no event (pongs, mempool statistics, etc.).
pub fn parse_bridge_message(text: &str) -> Option<BridgeEvent> {
	let value: Value = serde_json::from_str(text).ok()?;

	if let Some(block) = value.get("block") {
		let height = block.get("height").and_then(Value::as_u64);
		return Some(match value.get("txConfirmed") {
			Some(confirmed) => BridgeEvent::TxConfirmed {
				txid: confirmed.as_str().map(str::to_string),
				height,
			},
			None => BridgeEvent::BlockMined { height },
		});
	}

	let replacement = value
		.get("rbfTransaction")
		.or_else(|| value.get("txReplaced"))
		.and_then(|tx| tx.get("txid"))
		.and_then(Value::as_str)?;

	Some(BridgeEvent::TxReplaced {
		txid: None,
		replacement: replacement.to_string(),
	})
}

fn want_blocks_message() -> Message {
	Message::Text(json!({ "action": "want", "data": ["blocks"] }).to_string().into())
}

fn track_tx_message(txid: &str) -> Message {
	Message::Text(json!({ "track-tx": txid }).to_string().into())
}

fn ping_message() -> Message {
	Message::Text(json!({ "action": "ping" }).to_string().into())
}

enum BridgeCommand {
	Track(String),
	Untrack(String),
}

/// Push bridge over a mempool-style WebSocket API
///
/// The connection is driven by a background task that lives as long as the bridge.
pub struct WebSocketBridge {
	commands: UnboundedSender<BridgeCommand>,
	task: JoinHandle<()>,
}

impl WebSocketBridge {
	/// Starts a bridge to `url`, delivering events to `handler`
	///
	/// Must be called from within a tokio runtime. The first connection attempt happens
	/// in the background; failures are logged and retried.
	pub fn connect(url: String, handler: Arc<dyn BridgeEventHandler>) -> Self {
		let (commands, receiver) = mpsc::unbounded_channel();
		let task = tokio::spawn(run_connection_loop(url, handler, receiver));
		Self { commands, task }
	}

	fn send(&self, command: BridgeCommand, txid: &str) -> Result<(), BlockChainError> {
		self.commands.send(command).map_err(|_| {
			BlockChainError::bridge_error(
				"Push bridge connection task has stopped",
				None,
				Some(HashMap::from([("txid".to_string(), txid.to_string())])),
			)
		})
	}
}

#[async_trait]
impl PushBridge for WebSocketBridge {
	async fn track_transaction(&self, txid: &str) -> Result<(), BlockChainError> {
		self.send(BridgeCommand::Track(txid.to_string()), txid)
	}

	async fn untrack_transaction(&self, txid: &str) -> Result<(), BlockChainError> {
		self.send(BridgeCommand::Untrack(txid.to_string()), txid)
	}
}

impl Drop for WebSocketBridge {
	fn drop(&mut self) {
		self.task.abort();
	}
}

/// Why a single connection ended
enum Disconnect {
	/// The connection failed; reconnect after a pause
	Dropped,
	/// The owning bridge is gone; stop for good
	Closed,
}

async fn run_connection_loop(
	url: String,
	handler: Arc<dyn BridgeEventHandler>,
	mut commands: UnboundedReceiver<BridgeCommand>,
) {
	let mut tracked: HashSet<String> = HashSet::new();

	loop {
		match serve_connection(&url, handler.as_ref(), &mut commands, &mut tracked).await {
			Disconnect::Closed => {
				tracing::debug!(url = %url, "push bridge closed");
				return;
			}
			Disconnect::Dropped => {
				tracing::warn!(url = %url, "push bridge disconnected, reconnecting");
				tokio::time::sleep(RECONNECT_PAUSE).await;
			}
		}
	}
}

async fn serve_connection(
	url: &str,
	handler: &dyn BridgeEventHandler,
	commands: &mut UnboundedReceiver<BridgeCommand>,
	tracked: &mut HashSet<String>,
) -> Disconnect {
	let (stream, _) = match connect_async(url).await {
		Ok(connection) => connection,
		Err(e) => {
			tracing::warn!(url = %url, error = %e, "push bridge connect failed");
			return Disconnect::Dropped;
		}
	};
	tracing::info!(url = %url, tracked = tracked.len(), "push bridge connected");

	let (mut write, mut read) = stream.split();

	if write.send(want_blocks_message()).await.is_err() {
		return Disconnect::Dropped;
	}
	for txid in tracked.iter() {
		if write.send(track_tx_message(txid)).await.is_err() {
			return Disconnect::Dropped;
		}
	}

	let mut keepalive = interval(Duration::from_secs(PUSH_BRIDGE_KEEPALIVE_SECS));
	keepalive.tick().await;

	loop {
		tokio::select! {
			command = commands.recv() => match command {
				Some(BridgeCommand::Track(txid)) => {
					if !tracked.insert(txid.clone()) {
						continue;
					}
					if write.send(track_tx_message(&txid)).await.is_err() {
						return Disconnect::Dropped;
					}
					tracing::debug!(txid = %txid, "push bridge tracking transaction");
				}
				Some(BridgeCommand::Untrack(txid)) => {
					if tracked.remove(&txid) {
						tracing::debug!(txid = %txid, "push bridge no longer tracking transaction");
					}
				}
				None => return Disconnect::Closed,
			},
			_ = keepalive.tick() => {
				if write.send(ping_message()).await.is_err() {
					return Disconnect::Dropped;
				}
			},
			message = read.next() => match message {
				Some(Ok(Message::Text(text))) => {
					if let Some(event) = parse_bridge_message(text.as_str()) {
						tracing::debug!(?event, "push bridge event");
						handler.handle_event(event).await;
					}
				}
				Some(Ok(Message::Close(_))) | None => return Disconnect::Dropped,
				Some(Err(e)) => {
					tracing::warn!(url = %url, error = %e, "push bridge read failed");
					return Disconnect::Dropped;
				}
				Some(Ok(_)) => {}
			},
		}
	}
}
