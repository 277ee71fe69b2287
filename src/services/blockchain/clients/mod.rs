//! Provider client implementations.
//!
//! - BlockCypher and SoChain poll REST APIs
//! - Mempool answers from push-maintained state after a single REST lookup

mod blockcypher;
mod mempool;
mod sochain;

pub use blockcypher::BlockCypherClient;
pub use mempool::{BridgeFactory, ChainPushState, MempoolClient, MempoolEndpoints, PushChannel};
pub use sochain::SoChainClient;
