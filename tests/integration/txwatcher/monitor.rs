//! Integration tests for the per-transaction monitor.
//!
//! Monitors run against a scripted provider, a real file registry in a temp dir and a
//! recording notifier.

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

use async_trait::async_trait;
use tempfile::TempDir;

use txconfirm_monitor::{
	models::{Notification, RequesterIdentity, TrackedTransaction, TransactionStatus},
	services::{
		blockchain::ProviderClient,
		txwatcher::{
			FileTransactionRegistry, MonitorOutcome, MuteToggleOutcome, TransactionRegistry,
			TxWatcherService,
		},
	},
	utils::{
		constants::TOGGLE_BLOCK_ALERTS_ACTION,
		tests::builders::{SettingsBuilder, TrackedTransactionBuilder},
	},
};

use crate::integration::mocks::{
	create_btc_provider, MockProviderClient, NotifierCall, RecordingNotifier, Script,
};

type TestService = TxWatcherService<MockProviderClient, FileTransactionRegistry, RecordingNotifier>;

struct Harness {
	service: TestService,
	registry: Arc<FileTransactionRegistry>,
	notifier: Arc<RecordingNotifier>,
	_dir: TempDir,
}

fn harness(provider: MockProviderClient, max_consecutive_failures: Option<u32>) -> Harness {
	let dir = TempDir::new().unwrap();
	let registry = Arc::new(FileTransactionRegistry::new(
		dir.path().join("registry.json"),
	));
	let notifier = Arc::new(RecordingNotifier::new());

	let mut builder = SettingsBuilder::new().minimum_poll_interval_ms(0);
	if let Some(max) = max_consecutive_failures {
		builder = builder.max_consecutive_failures(max);
	}

	Harness {
		service: TxWatcherService::new(
			Arc::new(provider),
			registry.clone(),
			notifier.clone(),
			&builder.build(),
		),
		registry,
		notifier,
		_dir: dir,
	}
}

fn script_statuses(provider: &mut MockProviderClient, confirmations: Vec<u64>) {
	let script = Script::new(confirmations);
	provider
		.expect_get_transaction()
		.returning(move |_, _| Ok(TransactionStatus::with_confirmations(script.next())));
}

fn script_heights(provider: &mut MockProviderClient, heights: Vec<u64>) {
	let script = Script::new(heights);
	provider
		.expect_get_chain_height()
		.returning(move |_| Ok(script.next()));
}

async fn run_to_completion(harness: &Harness, transaction: TrackedTransaction) -> MonitorOutcome {
	assert!(harness.registry.add(transaction.clone()).await.unwrap());
	harness
		.service
		.spawn_monitor(transaction, Some(0))
		.await
		.await
		.unwrap()
}

#[tokio::test]
async fn test_confirmed_exactly_once_and_entry_removed() {
	let mut provider = create_btc_provider();
	script_statuses(&mut provider, vec![0, 1]);
	script_heights(&mut provider, vec![500]);
	let harness = harness(provider, None);

	let transaction = TrackedTransactionBuilder::new().target_confirmations(1).build();
	let outcome = run_to_completion(&harness, transaction.clone()).await;

	assert_eq!(outcome, MonitorOutcome::Confirmed);
	assert_eq!(
		harness.notifier.sent(),
		vec![Notification::Confirmed { confirmations: 1 }]
	);
	assert!(harness
		.registry
		.find_by_identity(&transaction.identity)
		.await
		.unwrap()
		.is_none());
	assert_eq!(harness.service.governor().active(), 0);
}

#[tokio::test]
async fn test_confirmation_replies_to_request_message() {
	let mut provider = create_btc_provider();
	script_statuses(&mut provider, vec![2]);
	let harness = harness(provider, None);

	let transaction = TrackedTransactionBuilder::new()
		.requester(555, 9)
		.request_message_id(77)
		.target_confirmations(2)
		.build();
	run_to_completion(&harness, transaction).await;

	match &harness.notifier.calls()[0] {
		NotifierCall::Send { recipient, .. } => {
			assert_eq!(recipient.chat_id, 555);
			assert_eq!(recipient.reply_to_message_id, Some(77));
		}
		other => panic!("unexpected call {:?}", other),
	}
}

#[tokio::test]
async fn test_block_alert_is_debounced_and_retracted_on_confirmation() {
	let mut provider = create_btc_provider();
	script_statuses(&mut provider, vec![0, 0, 0, 1]);
	script_heights(&mut provider, vec![100, 101, 101]);
	let harness = harness(provider, None);

	let transaction = TrackedTransactionBuilder::new()
		.target_confirmations(1)
		.last_known_height(100)
		.build();
	let outcome = run_to_completion(&harness, transaction.clone()).await;

	assert_eq!(outcome, MonitorOutcome::Confirmed);
	assert_eq!(
		harness.notifier.sent(),
		vec![
			Notification::BlockNotIncluded { height: 101 },
			Notification::Confirmed { confirmations: 1 },
		]
	);

	let alert = match &harness.notifier.calls()[0] {
		NotifierCall::Send { alert, options, .. } => {
			let options = options.as_ref().expect("block alert carries a button");
			assert_eq!(
				options.buttons[0].callback_data,
				format!("{}:{}", TOGGLE_BLOCK_ALERTS_ACTION, transaction.stable_hash())
			);
			*alert
		}
		other => panic!("unexpected call {:?}", other),
	};
	assert_eq!(harness.notifier.retracted(), vec![alert]);
}

#[tokio::test]
async fn test_new_block_alert_replaces_previous_one() {
	let mut provider = create_btc_provider();
	script_statuses(&mut provider, vec![0, 0, 0, 0, 0, 1]);
	script_heights(&mut provider, vec![101, 101, 102, 102]);
	let harness = harness(provider, None);

	let transaction = TrackedTransactionBuilder::new()
		.target_confirmations(1)
		.last_known_height(100)
		.build();
	run_to_completion(&harness, transaction).await;

	let sent = harness.notifier.sent();
	assert_eq!(
		sent,
		vec![
			Notification::BlockNotIncluded { height: 101 },
			Notification::BlockNotIncluded { height: 102 },
			Notification::Confirmed { confirmations: 1 },
		]
	);

	let alerts: Vec<_> = harness
		.notifier
		.calls()
		.into_iter()
		.filter_map(|call| match call {
			NotifierCall::Send {
				alert,
				notification: Notification::BlockNotIncluded { .. },
				..
			} => Some(alert),
			_ => None,
		})
		.collect();
	assert_eq!(harness.notifier.retracted(), alerts);
}

#[tokio::test]
async fn test_muted_transaction_gets_no_block_alerts() {
	let mut provider = create_btc_provider();
	script_statuses(&mut provider, vec![0, 0, 0, 0, 1]);
	script_heights(&mut provider, vec![101, 101, 102, 102]);
	let harness = harness(provider, None);

	let transaction = TrackedTransactionBuilder::new()
		.target_confirmations(1)
		.last_known_height(100)
		.muted(true)
		.build();
	run_to_completion(&harness, transaction).await;

	assert_eq!(
		harness.notifier.sent(),
		vec![Notification::Confirmed { confirmations: 1 }]
	);
}

#[tokio::test]
async fn test_first_height_is_recorded_without_alert() {
	let mut provider = create_btc_provider();
	script_statuses(&mut provider, vec![0, 0, 1]);
	script_heights(&mut provider, vec![840_000]);
	let harness = harness(provider, None);

	let transaction = TrackedTransactionBuilder::new().target_confirmations(1).build();
	run_to_completion(&harness, transaction).await;

	assert_eq!(
		harness.notifier.sent(),
		vec![Notification::Confirmed { confirmations: 1 }]
	);
}

#[tokio::test]
async fn test_included_notice_on_first_confirmation() {
	let mut provider = create_btc_provider();
	script_statuses(&mut provider, vec![0, 1, 1, 3]);
	script_heights(&mut provider, vec![700]);
	let harness = harness(provider, None);

	let transaction = TrackedTransactionBuilder::new().target_confirmations(3).build();
	let outcome = run_to_completion(&harness, transaction).await;

	assert_eq!(outcome, MonitorOutcome::Confirmed);
	assert_eq!(
		harness.notifier.sent(),
		vec![
			Notification::Included {
				height: 700,
				target: 3
			},
			Notification::Confirmed { confirmations: 3 },
		]
	);
}

#[tokio::test]
async fn test_double_spent_stops_after_one_fetch() {
	let mut provider = create_btc_provider();
	provider
		.expect_get_transaction()
		.times(1)
		.returning(|_, _| {
			Ok(TransactionStatus {
				found: true,
				confirmations: 0,
				double_spent: true,
				double_spent_txid: Some("abc".to_string()),
			})
		});
	provider.expect_get_chain_height().never();
	let harness = harness(provider, None);

	let transaction = TrackedTransactionBuilder::new().target_confirmations(2).build();
	let outcome = run_to_completion(&harness, transaction.clone()).await;

	assert_eq!(outcome, MonitorOutcome::DoubleSpent);
	assert_eq!(
		harness.notifier.sent(),
		vec![Notification::DoubleSpent {
			replacement_txid: Some("abc".to_string())
		}]
	);
	assert!(harness.registry.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_abandoned_after_consecutive_failures() {
	let mut provider = create_btc_provider();
	provider
		.expect_get_transaction()
		.times(3)
		.returning(|_, _| Err(anyhow::anyhow!("provider unavailable")));
	let harness = harness(provider, Some(3));

	let transaction = TrackedTransactionBuilder::new().build();
	let outcome = run_to_completion(&harness, transaction).await;

	assert_eq!(outcome, MonitorOutcome::Abandoned);
	assert!(harness.notifier.calls().is_empty());
	assert!(harness.registry.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failures_reset_after_success() {
	let mut provider = create_btc_provider();
	let script = Script::new(vec![None, None, Some(0), None, None, Some(1)]);
	provider.expect_get_transaction().returning(move |_, _| {
		script
			.next()
			.map(TransactionStatus::with_confirmations)
			.ok_or_else(|| anyhow::anyhow!("timeout"))
	});
	script_heights(&mut provider, vec![10]);
	let harness = harness(provider, Some(3));

	let transaction = TrackedTransactionBuilder::new().target_confirmations(1).build();
	let outcome = run_to_completion(&harness, transaction).await;

	assert_eq!(outcome, MonitorOutcome::Confirmed);
}

#[tokio::test]
async fn test_removed_entry_stops_monitor() {
	let mut provider = create_btc_provider();
	provider.expect_get_transaction().never();
	let harness = harness(provider, None);

	let transaction = TrackedTransactionBuilder::new().build();
	let outcome = harness
		.service
		.spawn_monitor(transaction, Some(0))
		.await
		.await
		.unwrap();

	assert_eq!(outcome, MonitorOutcome::Abandoned);
	assert!(harness.notifier.calls().is_empty());
}

#[tokio::test]
async fn test_resumed_monitor_with_confirmations_skips_height_tracking() {
	let mut provider = create_btc_provider();
	script_statuses(&mut provider, vec![1, 1, 2]);
	provider.expect_get_chain_height().never();
	let harness = harness(provider, None);

	let transaction = TrackedTransactionBuilder::new().target_confirmations(2).build();
	assert!(harness.registry.add(transaction.clone()).await.unwrap());
	let outcome = harness
		.service
		.spawn_monitor(transaction, None)
		.await
		.await
		.unwrap();

	assert_eq!(outcome, MonitorOutcome::Confirmed);
	assert_eq!(
		harness.notifier.sent(),
		vec![Notification::Confirmed { confirmations: 2 }]
	);
}

/// Has the requester press the mute button while the first height read is in flight
struct MuteDuringFirstHeightRead {
	inner: MockProviderClient,
	toggler: TestService,
	stable_hash: String,
	requester: RequesterIdentity,
	pressed: AtomicBool,
}

#[async_trait]
impl ProviderClient for MuteDuringFirstHeightRead {
	fn name(&self) -> &'static str {
		self.inner.name()
	}

	fn main_chains(&self) -> Vec<String> {
		self.inner.main_chains()
	}

	fn test_chains(&self) -> Vec<String> {
		self.inner.test_chains()
	}

	fn format_chain_name(&self, chain: &str) -> String {
		self.inner.format_chain_name(chain)
	}

	fn supports_ethereum_like_chains(&self) -> bool {
		self.inner.supports_ethereum_like_chains()
	}

	fn max_requests_per_hour(&self) -> u32 {
		self.inner.max_requests_per_hour()
	}

	async fn get_transaction(
		&self,
		chain: &str,
		txid: &str,
	) -> Result<TransactionStatus, anyhow::Error> {
		self.inner.get_transaction(chain, txid).await
	}

	async fn get_chain_height(&self, chain: &str) -> Result<u64, anyhow::Error> {
		if !self.pressed.swap(true, Ordering::SeqCst) {
			let outcome = self
				.toggler
				.toggle_mute(&self.stable_hash, self.requester)
				.await?;
			assert_eq!(outcome, MuteToggleOutcome::Toggled { muted: true });
		}
		self.inner.get_chain_height(chain).await
	}
}

#[tokio::test]
async fn test_mute_pressed_mid_iteration_is_kept() {
	let mut inner = create_btc_provider();
	script_statuses(&mut inner, vec![0, 0, 0, 1]);
	script_heights(&mut inner, vec![100, 101, 101]);

	// The toggling service shares the registry and notifier of the monitoring one
	let harness = harness(create_btc_provider(), None);
	let transaction = TrackedTransactionBuilder::new().target_confirmations(1).build();
	assert!(harness.registry.add(transaction.clone()).await.unwrap());

	let provider = MuteDuringFirstHeightRead {
		inner,
		toggler: harness.service,
		stable_hash: transaction.stable_hash(),
		requester: transaction.identity.requester,
		pressed: AtomicBool::new(false),
	};
	let service = TxWatcherService::new(
		Arc::new(provider),
		harness.registry.clone(),
		harness.notifier.clone(),
		&SettingsBuilder::new().minimum_poll_interval_ms(0).build(),
	);

	let outcome = service
		.spawn_monitor(transaction, Some(0))
		.await
		.await
		.unwrap();

	assert_eq!(outcome, MonitorOutcome::Confirmed);
	assert_eq!(
		harness.notifier.sent(),
		vec![Notification::Confirmed { confirmations: 1 }]
	);
}
