//! Per-transaction monitor state machine.
//!
//! A monitor owns a working copy of one registry entry and loops until the transaction is
//! confirmed, double-spent or abandoned:
//!
//! 1. Reconcile the working copy with the registry (picks up mute toggles).
//! 2. Fetch the status; a failure ends the iteration and is retried after the delay.
//! 3. Target reached: notify and stop. Double-spent: notify and stop.
//! 4. Until the first confirmation, watch the chain height and alert on blocks that did not
//!    include the transaction. A height increase is only acted on once it is seen on two
//!    consecutive iterations.
//! 5. Sleep for the governor delay.

use std::{fmt, sync::Arc, time::Duration};

use crate::{
	models::{AlertOptions, Notification, Recipient, TrackedTransaction},
	services::{
		blockchain::ProviderClient,
		notification::Notifier,
		txwatcher::{
			governor::{MonitorPermit, RateGovernor},
			storage::TransactionRegistry,
		},
	},
	utils::metrics::record_monitor_outcome,
};

/// How a monitor ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
	/// The target confirmation count was reached
	Confirmed,
	/// The provider reported the transaction as double-spent
	DoubleSpent,
	/// The monitor gave up: too many failed iterations, or the entry vanished
	Abandoned,
}

impl MonitorOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			MonitorOutcome::Confirmed => "confirmed",
			MonitorOutcome::DoubleSpent => "double_spent",
			MonitorOutcome::Abandoned => "abandoned",
		}
	}
}

impl fmt::Display for MonitorOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Collaborators shared by every monitor of a process
pub struct MonitorContext<P: ?Sized, R: ?Sized, N: ?Sized> {
	pub provider: Arc<P>,
	pub registry: Arc<R>,
	pub notifier: Arc<N>,
	pub governor: Arc<RateGovernor>,
	/// Consecutive failed iterations before giving up; `None` retries forever
	pub max_consecutive_failures: Option<u32>,
}

impl<P: ?Sized, R: ?Sized, N: ?Sized> Clone for MonitorContext<P, R, N> {
	fn clone(&self) -> Self {
		Self {
			provider: self.provider.clone(),
			registry: self.registry.clone(),
			notifier: self.notifier.clone(),
			governor: self.governor.clone(),
			max_consecutive_failures: self.max_consecutive_failures,
		}
	}
}

/// What a single iteration decided
enum Step {
	Continue,
	Stop(MonitorOutcome),
}

/// Watches one tracked transaction until it reaches a terminal state
pub struct TransactionMonitor<P: ?Sized, R: ?Sized, N: ?Sized> {
	context: MonitorContext<P, R, N>,
	transaction: TrackedTransaction,
	permit: Option<MonitorPermit>,
	/// Whether the transaction had at least one confirmation; unknown until the first fetch
	/// when resuming
	one_confirmation: Option<bool>,
	/// A height increase was seen once and awaits confirmation on the next iteration
	new_block: bool,
	consecutive_failures: u32,
}

impl<P, R, N> TransactionMonitor<P, R, N>
where
	P: ProviderClient + ?Sized,
	R: TransactionRegistry + ?Sized,
	N: Notifier + ?Sized,
{
	/// Creates a monitor and registers it with the governor
	///
	/// The caller retains the transaction with the provider beforehand; the monitor releases
	/// it when it finishes.
	///
	/// # Arguments
	/// * `context` - Shared collaborators
	/// * `transaction` - Registry entry to watch
	/// * `initial_confirmations` - Confirmations seen while locating, or `None` when resuming
	pub fn new(
		context: MonitorContext<P, R, N>,
		transaction: TrackedTransaction,
		initial_confirmations: Option<u64>,
	) -> Self {
		let permit = context.governor.acquire();
		Self {
			context,
			transaction,
			permit: Some(permit),
			one_confirmation: initial_confirmations.map(|c| c > 0),
			new_block: false,
			consecutive_failures: 0,
		}
	}

	fn recipient(&self) -> Recipient {
		Recipient::reply(
			self.transaction.identity.requester.chat_id,
			self.transaction.request_message_id,
		)
	}

	/// Runs the monitor to completion
	pub async fn run(mut self) -> MonitorOutcome {
		tracing::info!(
			txid = %self.transaction.txid(),
			chain = %self.transaction.chain(),
			target = self.transaction.identity.target_confirmations,
			"monitor started"
		);

		let outcome = loop {
			match self.iterate().await {
				Ok(Step::Stop(outcome)) => break outcome,
				Ok(Step::Continue) => self.consecutive_failures = 0,
				Err(e) => {
					self.consecutive_failures += 1;
					tracing::warn!(
						txid = %self.transaction.txid(),
						chain = %self.transaction.chain(),
						failures = self.consecutive_failures,
						error = %e,
						"monitor iteration failed, retrying"
					);
					if let Some(max) = self.context.max_consecutive_failures {
						if self.consecutive_failures >= max {
							break MonitorOutcome::Abandoned;
						}
					}
				}
			}

			self.pause().await;
		};

		self.terminate(outcome).await;
		outcome
	}

	async fn pause(&self) {
		let delay = self.context.governor.delay();
		if delay > Duration::ZERO {
			tokio::time::sleep(delay).await;
		} else {
			tokio::task::yield_now().await;
		}
	}

	async fn iterate(&mut self) -> Result<Step, anyhow::Error> {
		match self
			.context
			.registry
			.find_by_identity(&self.transaction.identity)
			.await?
		{
			Some(entry) => self.transaction = entry,
			None => {
				tracing::info!(txid = %self.transaction.txid(), "registry entry removed, stopping monitor");
				return Ok(Step::Stop(MonitorOutcome::Abandoned));
			}
		}

		let status = self
			.context
			.provider
			.get_transaction(self.transaction.chain(), self.transaction.txid())
			.await?;

		let target = self.transaction.identity.target_confirmations;
		if status.confirmations >= target {
			self.context
				.notifier
				.send_notification(
					&self.recipient(),
					&Notification::Confirmed {
						confirmations: status.confirmations,
					},
					None,
				)
				.await?;
			return Ok(Step::Stop(MonitorOutcome::Confirmed));
		}

		if status.double_spent {
			self.context
				.notifier
				.send_notification(
					&self.recipient(),
					&Notification::DoubleSpent {
						replacement_txid: status.double_spent_txid.clone(),
					},
					None,
				)
				.await?;
			return Ok(Step::Stop(MonitorOutcome::DoubleSpent));
		}

		let one_confirmation = *self
			.one_confirmation
			.get_or_insert(status.confirmations > 0);
		if !one_confirmation {
			if let Err(e) = self.track_height(status.confirmations).await {
				tracing::debug!(
					txid = %self.transaction.txid(),
					error = %e,
					"height check failed"
				);
			}
		}

		Ok(Step::Continue)
	}

	/// Watches for mined blocks until the transaction gets its first confirmation
	async fn track_height(&mut self, confirmations: u64) -> Result<(), anyhow::Error> {
		let height = self
			.context
			.provider
			.get_chain_height(self.transaction.chain())
			.await?;

		if self.transaction.last_known_height == 0 {
			self.transaction.last_known_height = height;
			self.persist_block_progress().await?;
			return Ok(());
		}

		if height > self.transaction.last_known_height {
			if self.new_block {
				if !self.alerts_muted().await? {
					self.alert_block_not_included(height).await?;
				}
				self.transaction.last_known_height = height;
				self.new_block = false;
				self.persist_block_progress().await?;
			} else {
				self.new_block = true;
			}
		}

		if confirmations > 0 {
			self.context
				.notifier
				.send_notification(
					&self.recipient(),
					&Notification::Included {
						height,
						target: self.transaction.identity.target_confirmations,
					},
					None,
				)
				.await?;
			self.one_confirmation = Some(true);
		}

		Ok(())
	}

	/// The mute flag as currently stored; it may have been toggled since the iteration began
	async fn alerts_muted(&mut self) -> Result<bool, anyhow::Error> {
		if let Some(entry) = self
			.context
			.registry
			.find_by_identity(&self.transaction.identity)
			.await?
		{
			self.transaction.block_alerts_muted = entry.block_alerts_muted;
		}
		Ok(self.transaction.block_alerts_muted)
	}

	/// Writes back the fields this monitor owns, leaving everything else as stored
	async fn persist_block_progress(&mut self) -> Result<(), anyhow::Error> {
		let height = self.transaction.last_known_height;
		let alert = self.transaction.pending_block_alert.clone();
		let stored = self
			.context
			.registry
			.update_with(
				&self.transaction.identity,
				Box::new(move |entry| {
					entry.last_known_height = height;
					entry.pending_block_alert = alert;
				}),
			)
			.await?;

		if let Some(entry) = stored {
			self.transaction.block_alerts_muted = entry.block_alerts_muted;
		}
		Ok(())
	}

	async fn alert_block_not_included(&mut self, height: u64) -> Result<(), anyhow::Error> {
		if let Some(previous) = self.transaction.pending_block_alert.take() {
			if let Err(e) = self.context.notifier.retract_alert(&previous).await {
				tracing::warn!(txid = %self.transaction.txid(), error = %e, "failed to retract previous block alert");
			}
		}

		let alert = self
			.context
			.notifier
			.send_notification(
				&self.recipient(),
				&Notification::BlockNotIncluded { height },
				Some(AlertOptions::block_alert_toggle(
					&self.transaction.stable_hash(),
					false,
				)),
			)
			.await?;
		self.transaction.pending_block_alert = Some(alert);

		Ok(())
	}

	/// Releases every resource held for the transaction
	async fn terminate(&mut self, outcome: MonitorOutcome) {
		self.permit.take();
		self.context
			.provider
			.release(self.transaction.chain(), self.transaction.txid())
			.await;

		if let Err(e) = self
			.context
			.registry
			.remove(&self.transaction.identity)
			.await
		{
			tracing::error!(txid = %self.transaction.txid(), error = %e, "failed to remove registry entry");
		}

		if let Some(alert) = self.transaction.pending_block_alert.take() {
			if let Err(e) = self.context.notifier.retract_alert(&alert).await {
				tracing::warn!(txid = %self.transaction.txid(), error = %e, "failed to retract block alert");
			}
		}

		record_monitor_outcome(outcome.as_str());
		tracing::info!(
			txid = %self.transaction.txid(),
			chain = %self.transaction.chain(),
			outcome = %outcome,
			"monitor finished"
		);
	}
}
