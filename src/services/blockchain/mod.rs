//! Transaction data providers.
//!
//! Provides the uniform provider interface and its implementations. Includes:
//!
//! - The `ProviderClient` trait and the configured-provider enum
//! - BlockCypher, SoChain and Mempool clients
//! - The push bridge feeding push-based providers
//! - HTTP transports and round-robin request distribution
//! - Error handling for provider operations

mod bridge;
mod client;
mod clients;
mod error;
mod provider;
mod transports;

pub use bridge::{
	parse_bridge_message, BridgeEvent, BridgeEventHandler, PushBridge, WebSocketBridge,
};
pub use client::{is_test_chain, supported_chains, ProviderClient};
pub use clients::{
	BlockCypherClient, BridgeFactory, ChainPushState, MempoolClient, MempoolEndpoints,
	PushChannel, SoChainClient,
};
pub use error::BlockChainError;
pub use provider::ProviderClientType;
pub use transports::{
	HttpTransportClient, RequestDistributor, TransientErrorRetryStrategy, TransportError,
};
