//! Structured error context shared by every error enum in the crate.
//!
//! Each domain error wraps an [`ErrorContext`] carrying a message, optional metadata and a
//! trace id. Wrapping an error that already has a trace id keeps that id, so one failed
//! provider call can be followed from the transport up to the monitor that gave up on it.

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use std::{collections::HashMap, error::Error as StdError, fmt, iter};
use uuid::Uuid;

/// How far down a source chain we look for an existing trace id
const MAX_TRACE_DEPTH: usize = 4;

lazy_static! {
	/// Bot API paths embed the token: `/bot<id>:<secret>/method`
	static ref BOT_TOKEN: Regex = Regex::new(r"bot\d+:[A-Za-z0-9_-]+").unwrap();
}

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// An error message enriched with metadata, a timestamp and a trace id.
#[derive(Debug)]
pub struct ErrorContext {
	pub message: String,
	pub source: Option<BoxedSource>,
	pub metadata: Option<HashMap<String, String>>,
	/// RFC 3339
	pub timestamp: String,
	/// Inherited from `source` when it carries one, otherwise a fresh UUID v4
	pub trace_id: String,
}

impl ErrorContext {
	pub fn new(
		message: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let trace_id = match &source {
			Some(src) => TraceableError::trace_id(src.as_ref()),
			None => Uuid::new_v4().to_string(),
		};

		Self {
			message: message.into(),
			source,
			metadata,
			timestamp: Utc::now().to_rfc3339(),
			trace_id,
		}
	}

	/// Same as [`ErrorContext::new`], and emits an `error` event for it right away.
	pub fn new_with_log(
		message: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let context = Self::new(message, source, metadata);
		log_error(&context);
		context
	}

	/// `message [k1=v1, k2=v2]`, keys sorted
	pub fn format_with_metadata(&self) -> String {
		let mut pairs: Vec<_> = self.metadata.iter().flatten().collect();
		if pairs.is_empty() {
			return self.message.clone();
		}
		pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

		let rendered: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
		format!("{} [{}]", self.message, rendered.join(", "))
	}
}

impl fmt::Display for ErrorContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.format_with_metadata())
	}
}

impl StdError for ErrorContext {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.source
			.as_ref()
			.map(|e| e.as_ref() as &(dyn StdError + 'static))
	}
}

/// An error that can report the trace id it was created under
pub trait TraceableError: StdError + Send + Sync {
	fn trace_id(&self) -> String;
}

impl TraceableError for dyn StdError + Send + Sync + 'static {
	fn trace_id(&self) -> String {
		let head: &(dyn StdError + 'static) = self;
		iter::successors(Some(head), |&err| err.source())
			.take(MAX_TRACE_DEPTH + 1)
			.find_map(known_trace_id)
			.unwrap_or_else(|| Uuid::new_v4().to_string())
	}
}

fn known_trace_id(err: &(dyn StdError + 'static)) -> Option<String> {
	if let Some(ctx) = err.downcast_ref::<ErrorContext>() {
		return Some(ctx.trace_id.clone());
	}

	macro_rules! traceable {
		($($ty:path),* $(,)?) => {
			$(
				if let Some(e) = err.downcast_ref::<$ty>() {
					return Some(e.trace_id());
				}
			)*
		};
	}

	traceable!(
		crate::services::blockchain::TransportError,
		crate::services::blockchain::BlockChainError,
		crate::services::notification::NotificationError,
		crate::services::txwatcher::TxWatcherError,
		crate::models::ConfigError,
		crate::models::SecurityError,
	);

	None
}

/// Makes an error message safe to log.
///
/// Bot tokens are masked, and HTML error pages returned by rate-limited providers are cut
/// down to the text before the markup.
fn sanitize_error_message(message: &str) -> String {
	let message = BOT_TOKEN.replace_all(message, "bot<redacted>");
	let is_html_page = ["<html", "<head>", "<body>", "<!DOCTYPE"]
		.iter()
		.any(|marker| message.contains(marker));

	match message.find('<') {
		Some(pos) if is_html_page => message[..pos].trim().to_string(),
		_ => message.into_owned(),
	}
}

fn format_error_chain(err: &(dyn StdError + 'static)) -> String {
	iter::successors(Some(err), |&e| e.source())
		.map(|e| sanitize_error_message(&e.to_string()))
		.collect::<Vec<_>>()
		.join("\n\tCaused by: ")
}

fn log_error(error: &ErrorContext) {
	let chain = error
		.source
		.as_deref()
		.map(|src| format_error_chain(src as &(dyn StdError + 'static)));

	tracing::error!(
		message = %sanitize_error_message(&error.format_with_metadata()),
		trace_id = %error.trace_id,
		timestamp = %error.timestamp,
		error.chain = chain.as_deref(),
		"Error occurred"
	);
}
