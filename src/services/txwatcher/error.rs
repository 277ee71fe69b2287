//! Transaction watcher error types and handling.
//!
//! Covers failures while persisting registry entries and delivering answers to tracking
//! requests.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors that can occur while watching transactions
#[derive(ThisError, Debug)]
pub enum TxWatcherError {
	/// The persistent registry could not be read or written
	#[error("Registry error: {0}")]
	RegistryError(ErrorContext),

	/// A message to the requester could not be delivered
	#[error("Delivery error: {0}")]
	DeliveryError(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl TxWatcherError {
	// Registry error
	pub fn registry_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::RegistryError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Delivery error
	pub fn delivery_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::DeliveryError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for TxWatcherError {
	fn trace_id(&self) -> String {
		match self {
			Self::RegistryError(ctx) => ctx.trace_id.clone(),
			Self::DeliveryError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
