//! Persistent registry of tracked transactions.
//!
//! The registry is the durable record of every in-flight monitor. It is read back on
//! startup so monitors survive restarts. Currently supports:
//! - File-based storage holding a pretty-printed JSON array
//! - Lookup by identity and by stable hash

use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::models::{TrackedTransaction, TransactionIdentity};

/// An in-place change to one registry entry, applied under the registry lock
pub type EntryChange = Box<dyn FnOnce(&mut TrackedTransaction) + Send>;

/// Interface for registry implementations
///
/// No two entries may share a [`TransactionIdentity`].
#[async_trait]
pub trait TransactionRegistry: Send + Sync {
	/// Adds an entry unless one with the same identity exists
	///
	/// # Returns
	/// * `Result<bool, anyhow::Error>` - `true` if added, `false` if rejected as a duplicate
	async fn add(&self, transaction: TrackedTransaction) -> Result<bool, anyhow::Error>;

	/// Removes the entry with the given identity
	///
	/// # Returns
	/// * `Result<bool, anyhow::Error>` - Whether an entry was removed
	async fn remove(&self, identity: &TransactionIdentity) -> Result<bool, anyhow::Error>;

	/// Replaces the stored entry that has the same identity
	///
	/// # Returns
	/// * `Result<bool, anyhow::Error>` - `false` if no such entry exists (nothing is written)
	async fn update(&self, transaction: &TrackedTransaction) -> Result<bool, anyhow::Error>;

	/// Applies `change` to the stored entry with the given identity in one read-modify-write
	///
	/// Writers that own only some fields of an entry use this, so that fields changed
	/// concurrently by someone else are kept.
	///
	/// # Returns
	/// * `Result<Option<TrackedTransaction>, anyhow::Error>` - The entry as written, or
	///   `None` if no such entry exists (nothing is written)
	async fn update_with(
		&self,
		identity: &TransactionIdentity,
		change: EntryChange,
	) -> Result<Option<TrackedTransaction>, anyhow::Error>;

	async fn find_by_identity(
		&self,
		identity: &TransactionIdentity,
	) -> Result<Option<TrackedTransaction>, anyhow::Error>;

	async fn find_by_stable_hash(
		&self,
		stable_hash: &str,
	) -> Result<Option<TrackedTransaction>, anyhow::Error>;

	async fn get_all(&self) -> Result<Vec<TrackedTransaction>, anyhow::Error>;
}

/// File-based implementation of the registry
///
/// Every operation reads the whole file, applies its change in memory and writes the
/// whole file back, all under one lock. Writes go to a sibling temp file that is then
/// renamed over the registry, so a crash never leaves a truncated file behind.
pub struct FileTransactionRegistry {
	path: PathBuf,
	lock: Mutex<()>,
}

impl FileTransactionRegistry {
	pub fn new(path: PathBuf) -> Self {
		Self {
			path,
			lock: Mutex::new(()),
		}
	}

	pub fn path(&self) -> &PathBuf {
		&self.path
	}

	async fn read_all(&self) -> Result<Vec<TrackedTransaction>, anyhow::Error> {
		let content = match tokio::fs::read_to_string(&self.path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => {
				return Err(e).with_context(|| {
					format!("Failed to read registry {}", self.path.display())
				})
			}
		};

		if content.trim().is_empty() {
			return Ok(Vec::new());
		}

		serde_json::from_str(&content)
			.with_context(|| format!("Failed to parse registry {}", self.path.display()))
	}

	async fn write_all(&self, transactions: &[TrackedTransaction]) -> Result<(), anyhow::Error> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(parent)
				.await
				.with_context(|| format!("Failed to create registry directory {}", parent.display()))?;
		}

		let json = serde_json::to_string_pretty(transactions)
			.context("Failed to serialize registry")?;

		let mut temp_path = self.path.clone().into_os_string();
		temp_path.push(".tmp");
		let temp_path = PathBuf::from(temp_path);

		tokio::fs::write(&temp_path, json)
			.await
			.with_context(|| format!("Failed to write {}", temp_path.display()))?;
		tokio::fs::rename(&temp_path, &self.path)
			.await
			.with_context(|| format!("Failed to replace registry {}", self.path.display()))?;

		Ok(())
	}
}

#[async_trait]
impl TransactionRegistry for FileTransactionRegistry {
	async fn add(&self, transaction: TrackedTransaction) -> Result<bool, anyhow::Error> {
		let _guard = self.lock.lock().await;
		let mut transactions = self.read_all().await?;

		if transactions
			.iter()
			.any(|t| t.identity == transaction.identity)
		{
			return Ok(false);
		}

		transactions.push(transaction);
		self.write_all(&transactions).await?;
		Ok(true)
	}

	async fn remove(&self, identity: &TransactionIdentity) -> Result<bool, anyhow::Error> {
		let _guard = self.lock.lock().await;
		let mut transactions = self.read_all().await?;

		let before = transactions.len();
		transactions.retain(|t| &t.identity != identity);
		if transactions.len() == before {
			return Ok(false);
		}

		self.write_all(&transactions).await?;
		Ok(true)
	}

	async fn update(&self, transaction: &TrackedTransaction) -> Result<bool, anyhow::Error> {
		let _guard = self.lock.lock().await;
		let mut transactions = self.read_all().await?;

		let Some(existing) = transactions
			.iter_mut()
			.find(|t| t.identity == transaction.identity)
		else {
			return Ok(false);
		};

		*existing = transaction.clone();
		self.write_all(&transactions).await?;
		Ok(true)
	}

	async fn update_with(
		&self,
		identity: &TransactionIdentity,
		change: EntryChange,
	) -> Result<Option<TrackedTransaction>, anyhow::Error> {
		let _guard = self.lock.lock().await;
		let mut transactions = self.read_all().await?;

		let Some(existing) = transactions.iter_mut().find(|t| &t.identity == identity) else {
			return Ok(None);
		};

		change(existing);
		let written = existing.clone();
		self.write_all(&transactions).await?;
		Ok(Some(written))
	}

	async fn find_by_identity(
		&self,
		identity: &TransactionIdentity,
	) -> Result<Option<TrackedTransaction>, anyhow::Error> {
		let _guard = self.lock.lock().await;
		Ok(self
			.read_all()
			.await?
			.into_iter()
			.find(|t| &t.identity == identity))
	}

	async fn find_by_stable_hash(
		&self,
		stable_hash: &str,
	) -> Result<Option<TrackedTransaction>, anyhow::Error> {
		let _guard = self.lock.lock().await;
		Ok(self
			.read_all()
			.await?
			.into_iter()
			.find(|t| t.stable_hash() == stable_hash))
	}

	async fn get_all(&self) -> Result<Vec<TrackedTransaction>, anyhow::Error> {
		let _guard = self.lock.lock().await;
		self.read_all().await
	}
}
