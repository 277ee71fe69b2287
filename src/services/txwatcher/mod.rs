//! Transaction watching.
//!
//! - `service`: tracking requests, mute toggles and startup resume
//! - `monitor`: the per-transaction state machine
//! - `locator`: finding the chain a transaction lives on
//! - `governor`: pacing monitors against the provider budget
//! - `storage`: the persistent registry of tracked transactions

mod error;
mod governor;
mod locator;
mod monitor;
mod service;
mod storage;

pub use error::TxWatcherError;
pub use governor::{compute_delay, MonitorPermit, RateGovernor};
pub use locator::{locate_transaction, LocatedTransaction};
pub use monitor::{MonitorContext, MonitorOutcome, TransactionMonitor};
pub use service::{
	MuteToggleOutcome, ResumeSummary, TrackingOutcome, TrackingRequest, TxWatcherService,
};
pub use storage::{EntryChange, FileTransactionRegistry, TransactionRegistry};
