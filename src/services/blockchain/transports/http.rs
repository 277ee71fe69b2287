//! HTTP transport used by every provider adapter.
//!
//! A transport is one egress path (direct, or through one proxy) wrapped in retry
//! middleware. Providers own their base URLs and hand complete URLs to [`HttpTransportClient`].

use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::{collections::HashMap, time::Duration};

use crate::{
	models::Proxy,
	services::blockchain::transports::{TransientErrorRetryStrategy, TransportError},
	utils::http::{build_base_http_client, create_retryable_http_client, RetryConfig},
};

/// Request timeout for clients that do not go through a proxy
const DIRECT_TIMEOUT: Duration = Duration::from_secs(30);

/// One egress path to a provider's REST API
///
/// The client is cheap to clone and safe to share across monitors.
#[derive(Clone, Debug)]
pub struct HttpTransportClient {
	/// Retryable HTTP client for making requests
	pub client: ClientWithMiddleware,
	/// `direct` or `host:port` of the proxy, used in logs and error metadata
	label: String,
}

impl HttpTransportClient {
	/// Creates a transport, optionally routed through a proxy
	///
	/// # Arguments
	/// * `retry` - Retry policy applied by the middleware
	/// * `proxy` - Egress proxy; its timeout replaces the direct timeout
	///
	/// # Returns
	/// * `Result<Self, TransportError>` - The transport, or a configuration error if the
	///   underlying client could not be built
	pub fn new(retry: &RetryConfig, proxy: Option<&Proxy>) -> Result<Self, TransportError> {
		let (timeout, reqwest_proxy, label) = match proxy {
			Some(proxy) => {
				let label = format!("{}:{}", proxy.host, proxy.port);
				let reqwest_proxy = proxy.to_reqwest_proxy().map_err(|e| {
					TransportError::configuration(
						format!("Invalid proxy {}", label),
						Some(Box::new(e)),
						None,
					)
				})?;
				(proxy.timeout, Some(reqwest_proxy), label)
			}
			None => (DIRECT_TIMEOUT, None, "direct".to_string()),
		};

		let base_client = build_base_http_client(timeout, reqwest_proxy).map_err(|e| {
			TransportError::configuration(
				"Failed to build HTTP client",
				Some(Box::new(e)),
				Some(HashMap::from([("egress".to_string(), label.clone())])),
			)
		})?;

		Ok(Self {
			client: create_retryable_http_client(
				retry,
				base_client,
				Some(TransientErrorRetryStrategy),
			),
			label,
		})
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	/// Fetches a URL and decodes the body as JSON
	///
	/// # Arguments
	/// * `url` - Complete request URL
	/// * `absent_statuses` - Statuses the provider uses to say "no such resource"; these
	///   yield `Ok(None)` instead of an error
	///
	/// # Returns
	/// * `Result<Option<Value>, TransportError>` - The decoded body, `None` for an absent
	///   resource, or an error for any other non-success status, network failure or bad body
	pub async fn get_json(
		&self,
		url: &str,
		absent_statuses: &[StatusCode],
	) -> Result<Option<Value>, TransportError> {
		let metadata = || {
			Some(HashMap::from([
				("url".to_string(), url.to_string()),
				("egress".to_string(), self.label.clone()),
			]))
		};

		let response = self.client.get(url).send().await.map_err(|e| {
			TransportError::network(
				format!("Failed to send request: {}", e),
				Some(e.into()),
				metadata(),
			)
		})?;

		let status = response.status();
		if absent_statuses.contains(&status) {
			tracing::debug!(url = %url, status = %status, "provider reports resource absent");
			return Ok(None);
		}

		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(TransportError::http(
				status,
				url.to_string(),
				body,
				None,
				metadata(),
			));
		}

		let body = response.json::<Value>().await.map_err(|e| {
			TransportError::response_parse(
				"Failed to parse JSON response".to_string(),
				Some(Box::new(e)),
				metadata(),
			)
		})?;

		Ok(Some(body))
	}
}
