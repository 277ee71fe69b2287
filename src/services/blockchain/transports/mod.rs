//! Network transports for provider adapters.
//!
//! - `http`: a single egress path with retry middleware
//! - `distributor`: round-robin rotation over direct or proxied egress paths

mod distributor;
mod error;
mod http;

pub use distributor::RequestDistributor;
pub use error::TransportError;
pub use http::HttpTransportClient;

use reqwest_retry::{
	default_on_request_failure, default_on_request_success, Retryable, RetryableStrategy,
};

/// Retries requests that failed with a transient status or connection error
pub struct TransientErrorRetryStrategy;
impl RetryableStrategy for TransientErrorRetryStrategy {
	fn handle(
		&self,
		res: &Result<reqwest::Response, reqwest_middleware::Error>,
	) -> Option<Retryable> {
		match res {
			Ok(success) => default_on_request_success(success),
			Err(error) => default_on_request_failure(error),
		}
	}
}
