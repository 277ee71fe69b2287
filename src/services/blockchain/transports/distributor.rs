//! Round-robin distribution of provider calls over egress transports.

use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
	time::Duration,
};

use crate::{
	models::{Proxy, ProxySettings},
	services::blockchain::transports::{HttpTransportClient, TransportError},
	utils::http::RetryConfig,
};

/// Hands out transports in strict rotation.
///
/// Holds either one direct transport or one transport per configured proxy; never empty.
#[derive(Debug)]
pub struct RequestDistributor {
	clients: Vec<Arc<HttpTransportClient>>,
	cursor: Mutex<usize>,
}

impl RequestDistributor {
	/// Creates a distributor over an ordered list of transports
	///
	/// # Errors
	/// Returns a configuration error if `clients` is empty.
	pub fn new(clients: Vec<HttpTransportClient>) -> Result<Self, TransportError> {
		if clients.is_empty() {
			return Err(TransportError::configuration(
				"This provider requires proxies",
				None,
				None,
			));
		}

		Ok(Self {
			clients: clients.into_iter().map(Arc::new).collect(),
			cursor: Mutex::new(0),
		})
	}

	/// A distributor with a single direct transport
	pub fn direct(retry: &RetryConfig) -> Result<Self, TransportError> {
		Self::new(vec![HttpTransportClient::new(retry, None)?])
	}

	/// A distributor with one transport per proxy
	///
	/// # Errors
	/// Returns a configuration error if `proxies` is empty or a proxy cannot be turned into
	/// a client.
	pub fn with_proxies(proxies: &[Proxy], retry: &RetryConfig) -> Result<Self, TransportError> {
		let clients = proxies
			.iter()
			.map(|proxy| HttpTransportClient::new(retry, Some(proxy)))
			.collect::<Result<Vec<_>, _>>()?;
		Self::new(clients)
	}

	/// Builds the distributor described by the proxy settings
	///
	/// With proxies disabled this is a single direct transport. With proxies enabled the
	/// proxy file is loaded and must contain at least one entry.
	pub async fn from_settings(
		settings: &ProxySettings,
		retry: &RetryConfig,
	) -> Result<Self, TransportError> {
		if !settings.enabled {
			return Self::direct(retry);
		}

		let proxies = Proxy::load_all(&settings.path, Duration::from_secs(settings.timeout_seconds))
			.await
			.map_err(|e| {
				TransportError::configuration(
					"Failed to load proxy list",
					Some(Box::new(e)),
					Some(HashMap::from([(
						"path".to_string(),
						settings.path.display().to_string(),
					)])),
				)
			})?;

		tracing::info!(count = proxies.len(), "loaded egress proxies");
		Self::with_proxies(&proxies, retry)
	}

	/// Returns the next transport in rotation
	pub fn next(&self) -> Arc<HttpTransportClient> {
		let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
		let client = self.clients[*cursor % self.clients.len()].clone();
		*cursor = (*cursor + 1) % self.clients.len();
		client
	}

	/// Number of egress transports
	pub fn len(&self) -> usize {
		self.clients.len()
	}

	pub fn is_empty(&self) -> bool {
		self.clients.is_empty()
	}
}
