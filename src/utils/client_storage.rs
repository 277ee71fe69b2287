use std::{collections::HashMap, future::Future, sync::Arc};
use tokio::sync::RwLock;

/// Keyed storage for long-lived shared clients (push bridges, transports).
///
/// Entries are created lazily on first use and then shared through `Arc`.
#[derive(Default)]
pub struct ClientStorage<T> {
	pub clients: Arc<RwLock<HashMap<String, Arc<T>>>>,
}

impl<T> ClientStorage<T> {
	pub fn new() -> Self {
		Self {
			clients: Arc::new(RwLock::new(HashMap::new())),
		}
	}

	/// Returns the client stored under `key`, creating it with `create` if absent.
	///
	/// Uses a read-locked fast path and re-checks under the write lock, so concurrent
	/// callers never create two clients for the same key.
	pub async fn get_or_try_create<F, Fut, E>(&self, key: &str, create: F) -> Result<Arc<T>, E>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		if let Some(client) = self.clients.read().await.get(key) {
			return Ok(client.clone());
		}

		let mut clients = self.clients.write().await;
		if let Some(client) = clients.get(key) {
			return Ok(client.clone());
		}

		let client = Arc::new(create().await?);
		clients.insert(key.to_string(), client.clone());
		Ok(client)
	}

	/// The client stored under `key`, without creating one
	pub async fn get(&self, key: &str) -> Option<Arc<T>> {
		self.clients.read().await.get(key).cloned()
	}

	/// Stores a pre-built client, replacing any existing entry
	pub async fn insert(&self, key: &str, client: Arc<T>) {
		self.clients.write().await.insert(key.to_string(), client);
	}

	pub async fn len(&self) -> usize {
		self.clients.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.clients.read().await.is_empty()
	}
}
