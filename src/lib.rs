//! Blockchain transaction confirmation monitor.
//!
//! This library watches transactions on behalf of chat users and notifies them when a
//! transaction reaches its confirmation target, gets double-spent, or misses a mined block.
//! It includes:
//!
//! - Poll-based (BlockCypher, SoChain) and push-based (Mempool) transaction providers
//! - Rate-governed per-transaction monitors with crash recovery
//! - A file-backed registry of tracked transactions
//! - Telegram delivery and command dispatching
//!
//! # Module Structure
//!
//! - `bootstrap`: Bootstraps the application and dispatches chat updates
//! - `models`: Data structures for settings, tracked transactions and notifications
//! - `services`: Core business logic and provider interaction
//! - `utils`: Common utilities and helper functions

pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;
