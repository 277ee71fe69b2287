//! Tracking service: accepts requests, answers mute toggles and resumes persisted monitors.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::{
	models::{
		AlertOptions, Notification, Recipient, RequesterIdentity, Settings, TrackedTransaction,
		TransactionIdentity,
	},
	services::{
		blockchain::{supported_chains, ProviderClient},
		notification::Notifier,
		txwatcher::{
			error::TxWatcherError,
			governor::RateGovernor,
			locator::{locate_transaction, LocatedTransaction},
			monitor::{MonitorContext, MonitorOutcome, TransactionMonitor},
			storage::TransactionRegistry,
		},
	},
	utils::constants::MAX_TARGET_CONFIRMATIONS,
};

/// A request to watch a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingRequest {
	pub txid: String,
	pub target_confirmations: u64,
	pub requester: RequesterIdentity,
	/// Message the request arrived in; every answer replies to it
	pub request_message_id: i64,
}

/// How a tracking request was answered
#[derive(Debug)]
pub enum TrackingOutcome {
	InvalidConfirmations,
	UnsupportedChain,
	NotLocated,
	AlreadyTracking,
	AlreadyReached {
		confirmations: u64,
	},
	/// A monitor was spawned for the new registry entry
	Started {
		transaction: TrackedTransaction,
		monitor: JoinHandle<MonitorOutcome>,
	},
}

/// How a mute toggle was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteToggleOutcome {
	Toggled { muted: bool },
	NotAuthorized,
	NotFound,
}

/// Result of resuming the registry at startup
#[derive(Debug, Default)]
pub struct ResumeSummary {
	/// Entries of the configured provider, now monitored again
	pub resumed: usize,
	/// Entries of another provider, removed after asking for a resubmission
	pub dropped: usize,
	pub monitors: Vec<JoinHandle<MonitorOutcome>>,
}

/// Entry point for everything that creates or changes tracked transactions
pub struct TxWatcherService<P: ?Sized, R: ?Sized, N: ?Sized> {
	context: MonitorContext<P, R, N>,
}

impl<P, R, N> TxWatcherService<P, R, N>
where
	P: ProviderClient + ?Sized + 'static,
	R: TransactionRegistry + ?Sized + 'static,
	N: Notifier + ?Sized + 'static,
{
	/// Creates the service and its rate governor
	///
	/// # Arguments
	/// * `provider` - The configured provider; its budget sizes the governor
	/// * `registry` - Persistent registry of tracked transactions
	/// * `notifier` - Delivery of every answer and alert
	/// * `settings` - Monitor settings (failure ceiling, minimum poll interval)
	pub fn new(provider: Arc<P>, registry: Arc<R>, notifier: Arc<N>, settings: &Settings) -> Self {
		let governor = Arc::new(RateGovernor::new(
			provider.max_requests_per_hour(),
			Duration::from_millis(settings.monitor.minimum_poll_interval_ms),
		));
		if settings.monitor.max_consecutive_failures.is_none() {
			tracing::warn!("no failure ceiling configured, monitors retry failed iterations forever");
		}

		Self {
			context: MonitorContext {
				provider,
				registry,
				notifier,
				governor,
				max_consecutive_failures: settings.monitor.max_consecutive_failures,
			},
		}
	}

	pub fn governor(&self) -> &Arc<RateGovernor> {
		&self.context.governor
	}

	async fn reply(
		&self,
		request: &TrackingRequest,
		notification: &Notification,
	) -> Result<(), TxWatcherError> {
		self.context
			.notifier
			.send_notification(
				&Recipient::reply(request.requester.chat_id, request.request_message_id),
				notification,
				None,
			)
			.await
			.map(|_| ())
			.map_err(|e| delivery_error(notification, e))
	}

	/// Handles a tracking request end to end
	///
	/// Validates the target, locates the transaction, rejects duplicates and already
	/// reached targets, then persists the entry and spawns its monitor.
	///
	/// # Returns
	/// * `Result<TrackingOutcome, TxWatcherError>` - How the request was answered, or an
	///   error if an answer could not be delivered or the registry failed
	pub async fn request_tracking(
		&self,
		request: TrackingRequest,
	) -> Result<TrackingOutcome, TxWatcherError> {
		let provider = &self.context.provider;

		if !(1..=MAX_TARGET_CONFIRMATIONS).contains(&request.target_confirmations) {
			self.reply(
				&request,
				&Notification::InvalidConfirmations {
					max: MAX_TARGET_CONFIRMATIONS,
				},
			)
			.await?;
			return Ok(TrackingOutcome::InvalidConfirmations);
		}

		if request.txid.starts_with("0x") && !provider.supports_ethereum_like_chains() {
			self.reply(
				&request,
				&Notification::UnsupportedChain {
					supported: supported_chains(provider.as_ref()),
				},
			)
			.await?;
			return Ok(TrackingOutcome::UnsupportedChain);
		}

		let locating = self
			.context
			.notifier
			.send_notification(
				&Recipient::reply(request.requester.chat_id, request.request_message_id),
				&Notification::Locating,
				None,
			)
			.await
			.map_err(|e| delivery_error(&Notification::Locating, e))?;

		let located = locate_transaction(provider.as_ref(), &request.txid).await;
		let located_message = match &located {
			Some(located) => Notification::Located {
				chain: provider.format_chain_name(&located.chain),
				testnet: located.testnet,
			},
			None => Notification::NotLocated {
				supported: supported_chains(provider.as_ref()),
			},
		};
		self.context
			.notifier
			.edit_alert(&locating, Some(&located_message), None)
			.await
			.map_err(|e| delivery_error(&located_message, e))?;

		let Some(located) = located else {
			return Ok(TrackingOutcome::NotLocated);
		};

		// Holds the provider state created while locating until the monitor takes over
		provider.retain(&located.chain, &request.txid).await;
		let outcome = self.start_tracking(&request, &located).await;
		provider.release(&located.chain, &request.txid).await;
		outcome
	}

	async fn start_tracking(
		&self,
		request: &TrackingRequest,
		located: &LocatedTransaction,
	) -> Result<TrackingOutcome, TxWatcherError> {
		let identity = TransactionIdentity::new(
			self.context.provider.name(),
			&located.chain,
			&request.txid,
			request.target_confirmations,
			request.requester,
		);

		if let Some(existing) = self.find_existing(&identity).await? {
			self.send_already_tracking(&existing).await?;
			return Ok(TrackingOutcome::AlreadyTracking);
		}

		let confirmations = located.status.confirmations;
		if confirmations >= request.target_confirmations {
			self.reply(request, &Notification::AlreadyReached { confirmations })
				.await?;
			return Ok(TrackingOutcome::AlreadyReached { confirmations });
		}

		if confirmations > 0 {
			self.reply(request, &Notification::CurrentConfirmations { confirmations })
				.await?;
		}

		let transaction = TrackedTransaction::new(identity, request.request_message_id);
		let added = self
			.context
			.registry
			.add(transaction.clone())
			.await
			.map_err(|e| registry_error("Failed to add tracked transaction", &transaction, e))?;
		if !added {
			if let Some(existing) = self.find_existing(&transaction.identity).await? {
				self.send_already_tracking(&existing).await?;
			}
			return Ok(TrackingOutcome::AlreadyTracking);
		}

		self.reply(
			request,
			&Notification::TrackingStarted {
				target: request.target_confirmations,
				has_confirmations: confirmations > 0,
			},
		)
		.await?;

		let monitor = self
			.spawn_monitor(transaction.clone(), Some(confirmations))
			.await;
		Ok(TrackingOutcome::Started {
			transaction,
			monitor,
		})
	}

	async fn find_existing(
		&self,
		identity: &TransactionIdentity,
	) -> Result<Option<TrackedTransaction>, TxWatcherError> {
		self.context
			.registry
			.find_by_identity(identity)
			.await
			.map_err(|e| {
				TxWatcherError::registry_error(
					format!("Failed to look up tracked transaction: {}", e),
					None,
					Some(HashMap::from([("txid".to_string(), identity.txid.clone())])),
				)
			})
	}

	async fn send_already_tracking(
		&self,
		existing: &TrackedTransaction,
	) -> Result<(), TxWatcherError> {
		self.context
			.notifier
			.send_notification(
				&Recipient::reply(
					existing.identity.requester.chat_id,
					existing.request_message_id,
				),
				&Notification::AlreadyTracking,
				None,
			)
			.await
			.map(|_| ())
			.map_err(|e| delivery_error(&Notification::AlreadyTracking, e))
	}

	/// Starts a monitor task for a registry entry
	///
	/// The provider is retained for the transaction before the task starts; the monitor
	/// releases it when it terminates.
	///
	/// # Arguments
	/// * `transaction` - Entry to watch; must already be in the registry
	/// * `initial_confirmations` - Confirmations seen while locating, `None` when resuming
	pub async fn spawn_monitor(
		&self,
		transaction: TrackedTransaction,
		initial_confirmations: Option<u64>,
	) -> JoinHandle<MonitorOutcome> {
		self.context
			.provider
			.retain(transaction.chain(), transaction.txid())
			.await;
		let monitor =
			TransactionMonitor::new(self.context.clone(), transaction, initial_confirmations);
		tokio::spawn(monitor.run())
	}

	/// Flips the block alert mute flag of a tracked transaction
	///
	/// Only the requester who started tracking may toggle. On success the alert's button is
	/// edited to offer the opposite action.
	///
	/// # Arguments
	/// * `stable_hash` - Hash carried by the alert button
	/// * `requester` - Who pressed the button
	pub async fn toggle_mute(
		&self,
		stable_hash: &str,
		requester: RequesterIdentity,
	) -> Result<MuteToggleOutcome, TxWatcherError> {
		let found = self
			.context
			.registry
			.find_by_stable_hash(stable_hash)
			.await
			.map_err(|e| {
				TxWatcherError::registry_error(
					format!("Failed to look up stable hash: {}", e),
					None,
					Some(HashMap::from([(
						"stable_hash".to_string(),
						stable_hash.to_string(),
					)])),
				)
			})?;

		let Some(found) = found else {
			return Ok(MuteToggleOutcome::NotFound);
		};

		if found.identity.requester != requester {
			tracing::debug!(stable_hash = %stable_hash, user_id = requester.user_id, "mute toggle by non-owner ignored");
			return Ok(MuteToggleOutcome::NotAuthorized);
		}

		let stored = self
			.context
			.registry
			.update_with(
				&found.identity,
				Box::new(|entry| entry.block_alerts_muted = !entry.block_alerts_muted),
			)
			.await
			.map_err(|e| registry_error("Failed to persist mute toggle", &found, e))?;
		let Some(transaction) = stored else {
			return Ok(MuteToggleOutcome::NotFound);
		};

		let muted = transaction.block_alerts_muted;
		if let Some(alert) = &transaction.pending_block_alert {
			if let Err(e) = self
				.context
				.notifier
				.edit_alert(
					alert,
					None,
					Some(AlertOptions::block_alert_toggle(stable_hash, muted)),
				)
				.await
			{
				tracing::warn!(stable_hash = %stable_hash, error = %e, "failed to update alert button");
			}
		}

		tracing::info!(txid = %transaction.txid(), muted = muted, "block alerts toggled");
		Ok(MuteToggleOutcome::Toggled { muted })
	}

	/// Restarts monitors for every persisted entry of the configured provider
	///
	/// Entries recorded under another provider cannot be resumed: their requester is asked
	/// to resubmit, their open alert is retracted and the entry is removed.
	pub async fn resume_all(&self) -> Result<ResumeSummary, TxWatcherError> {
		let entries = self.context.registry.get_all().await.map_err(|e| {
			TxWatcherError::registry_error(format!("Failed to read registry: {}", e), None, None)
		})?;

		let provider_name = self.context.provider.name();
		let mut summary = ResumeSummary::default();

		for entry in entries {
			if entry.identity.provider == provider_name {
				summary.monitors.push(self.spawn_monitor(entry, None).await);
				summary.resumed += 1;
			} else {
				self.drop_foreign_entry(&entry).await;
				summary.dropped += 1;
			}
		}

		tracing::info!(
			resumed = summary.resumed,
			dropped = summary.dropped,
			provider = provider_name,
			"registry resumed"
		);
		Ok(summary)
	}

	async fn drop_foreign_entry(&self, entry: &TrackedTransaction) {
		tracing::info!(
			txid = %entry.txid(),
			provider = %entry.identity.provider,
			"dropping entry recorded under another provider"
		);

		if let Err(e) = self
			.context
			.notifier
			.send_notification(
				&Recipient::reply(entry.identity.requester.chat_id, entry.request_message_id),
				&Notification::ResubmitRequired,
				None,
			)
			.await
		{
			tracing::warn!(txid = %entry.txid(), error = %e, "failed to ask for resubmission");
		}

		if let Some(alert) = &entry.pending_block_alert {
			if let Err(e) = self.context.notifier.retract_alert(alert).await {
				tracing::warn!(txid = %entry.txid(), error = %e, "failed to retract block alert");
			}
		}

		if let Err(e) = self.context.registry.remove(&entry.identity).await {
			tracing::error!(txid = %entry.txid(), error = %e, "failed to remove dropped entry");
		}
	}
}

fn delivery_error(
	notification: &Notification,
	source: crate::services::notification::NotificationError,
) -> TxWatcherError {
	TxWatcherError::delivery_error(
		format!("Failed to deliver {} notification", notification.kind()),
		Some(Box::new(source)),
		None,
	)
}

fn registry_error(
	msg: &str,
	transaction: &TrackedTransaction,
	source: anyhow::Error,
) -> TxWatcherError {
	TxWatcherError::registry_error(
		format!("{}: {}", msg, source),
		None,
		Some(HashMap::from([
			("txid".to_string(), transaction.txid().to_string()),
			("chain".to_string(), transaction.chain().to_string()),
		])),
	)
}
