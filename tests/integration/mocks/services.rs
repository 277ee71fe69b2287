//! Mock implementations of registry and notifier services.

use std::sync::{
	atomic::{AtomicI64, Ordering},
	Mutex,
};

use async_trait::async_trait;
use mockall::mock;

use txconfirm_monitor::{
	models::{AlertOptions, AlertRef, Notification, Recipient, TrackedTransaction, TransactionIdentity},
	services::{
		notification::{NotificationError, Notifier},
		txwatcher::{EntryChange, TransactionRegistry},
	},
};

mock! {
	/// Mock implementation of the registry trait.
	pub TransactionRegistry {}

	#[async_trait]
	impl TransactionRegistry for TransactionRegistry {
		async fn add(&self, transaction: TrackedTransaction) -> Result<bool, anyhow::Error>;
		async fn remove(&self, identity: &TransactionIdentity) -> Result<bool, anyhow::Error>;
		async fn update(&self, transaction: &TrackedTransaction) -> Result<bool, anyhow::Error>;
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
}

/// One call made to a [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq)]
pub enum NotifierCall {
	Send {
		recipient: Recipient,
		notification: Notification,
		options: Option<AlertOptions>,
		alert: AlertRef,
	},
	Edit {
		alert: AlertRef,
		notification: Option<Notification>,
		options: Option<AlertOptions>,
	},
	Retract {
		alert: AlertRef,
	},
}

/// Notifier that accepts everything and remembers what it was asked to do
pub struct RecordingNotifier {
	calls: Mutex<Vec<NotifierCall>>,
	next_message_id: AtomicI64,
}

impl Default for RecordingNotifier {
	fn default() -> Self {
		Self {
			calls: Mutex::new(Vec::new()),
			next_message_id: AtomicI64::new(1000),
		}
	}
}

impl RecordingNotifier {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn calls(&self) -> Vec<NotifierCall> {
		self.calls.lock().unwrap().clone()
	}

	/// Every notification sent, in order
	pub fn sent(&self) -> Vec<Notification> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				NotifierCall::Send { notification, .. } => Some(notification),
				_ => None,
			})
			.collect()
	}

	/// Every alert retracted, in order
	pub fn retracted(&self) -> Vec<AlertRef> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				NotifierCall::Retract { alert } => Some(alert),
				_ => None,
			})
			.collect()
	}
}

#[async_trait]
impl Notifier for RecordingNotifier {
	async fn send_notification(
		&self,
		recipient: &Recipient,
		notification: &Notification,
		options: Option<AlertOptions>,
	) -> Result<AlertRef, NotificationError> {
		let alert = AlertRef {
			chat_id: recipient.chat_id,
			message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
		};
		self.calls.lock().unwrap().push(NotifierCall::Send {
			recipient: *recipient,
			notification: notification.clone(),
			options,
			alert,
		});
		Ok(alert)
	}

	async fn retract_alert(&self, alert: &AlertRef) -> Result<(), NotificationError> {
		self.calls
			.lock()
			.unwrap()
			.push(NotifierCall::Retract { alert: *alert });
		Ok(())
	}

	async fn edit_alert(
		&self,
		alert: &AlertRef,
		notification: Option<&Notification>,
		options: Option<AlertOptions>,
	) -> Result<(), NotificationError> {
		self.calls.lock().unwrap().push(NotifierCall::Edit {
			alert: *alert,
			notification: notification.cloned(),
			options,
		});
		Ok(())
	}
}
