//! Integration tests for the tracking service: request handling, mute toggles and resume.

use std::sync::Arc;

use tempfile::TempDir;

use txconfirm_monitor::{
	models::{
		AlertOptions, AlertRef, Notification, Recipient, RequesterIdentity, SupportedChains,
		TransactionStatus,
	},
	services::txwatcher::{
		FileTransactionRegistry, MonitorOutcome, MuteToggleOutcome, TrackingOutcome,
		TrackingRequest, TransactionRegistry, TxWatcherError, TxWatcherService,
	},
	utils::tests::builders::{SettingsBuilder, TrackedTransactionBuilder},
};

use crate::integration::mocks::{
	create_btc_provider, MockProviderClient, MockTransactionRegistry, NotifierCall,
	RecordingNotifier, Script,
};

const TXID: &str = "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16";

const REQUESTER: RequesterIdentity = RequesterIdentity {
	chat_id: 1001,
	user_id: 42,
};

struct Harness {
	service: TxWatcherService<MockProviderClient, FileTransactionRegistry, RecordingNotifier>,
	registry: Arc<FileTransactionRegistry>,
	notifier: Arc<RecordingNotifier>,
	_dir: TempDir,
}

fn harness(provider: MockProviderClient) -> Harness {
	let dir = TempDir::new().unwrap();
	let registry = Arc::new(FileTransactionRegistry::new(
		dir.path().join("registry.json"),
	));
	let notifier = Arc::new(RecordingNotifier::new());
	let settings = SettingsBuilder::new().minimum_poll_interval_ms(0).build();

	Harness {
		service: TxWatcherService::new(
			Arc::new(provider),
			registry.clone(),
			notifier.clone(),
			&settings,
		),
		registry,
		notifier,
		_dir: dir,
	}
}

fn request(txid: &str, target_confirmations: u64) -> TrackingRequest {
	TrackingRequest {
		txid: txid.to_string(),
		target_confirmations,
		requester: REQUESTER,
		request_message_id: 99,
	}
}

/// Provider where the transaction lives on `btc/main` with the given confirmations
fn provider_on_main(confirmations: u64) -> MockProviderClient {
	let mut provider = create_btc_provider();
	provider.expect_get_transaction().returning(move |chain, _| {
		Ok(if chain == "btc/main" {
			TransactionStatus::with_confirmations(confirmations)
		} else {
			TransactionStatus::not_found()
		})
	});
	provider.expect_get_chain_height().returning(|_| Ok(100));
	provider
}

#[tokio::test]
async fn test_request_located_on_test_chain_runs_to_confirmation() {
	let mut provider = create_btc_provider();
	let script = Script::new(vec![0, 0, 1]);
	provider.expect_get_transaction().returning(move |chain, _| {
		Ok(if chain == "btc/test3" {
			TransactionStatus::with_confirmations(script.next())
		} else {
			TransactionStatus::not_found()
		})
	});
	provider.expect_get_chain_height().returning(|_| Ok(2_500_000));
	let harness = harness(provider);

	let outcome = harness
		.service
		.request_tracking(request(TXID, 1))
		.await
		.unwrap();

	let (transaction, monitor) = match outcome {
		TrackingOutcome::Started {
			transaction,
			monitor,
		} => (transaction, monitor),
		other => panic!("unexpected outcome {:?}", other),
	};
	assert_eq!(transaction.chain(), "btc/test3");
	assert_eq!(transaction.identity.provider, "blockcypher");
	assert_eq!(transaction.request_message_id, 99);

	assert_eq!(monitor.await.unwrap(), MonitorOutcome::Confirmed);

	let calls = harness.notifier.calls();
	let locating = match &calls[0] {
		NotifierCall::Send {
			recipient,
			notification: Notification::Locating,
			alert,
			..
		} => {
			assert_eq!(*recipient, Recipient::reply(1001, 99));
			*alert
		}
		other => panic!("unexpected call {:?}", other),
	};
	assert_eq!(
		calls[1],
		NotifierCall::Edit {
			alert: locating,
			notification: Some(Notification::Located {
				chain: "BTC".to_string(),
				testnet: true,
			}),
			options: None,
		}
	);
	assert_eq!(
		harness.notifier.sent(),
		vec![
			Notification::Locating,
			Notification::TrackingStarted {
				target: 1,
				has_confirmations: false,
			},
			Notification::Confirmed { confirmations: 1 },
		]
	);
	assert!(harness.registry.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_confirmation_targets_are_rejected() {
	for target in [0, 51] {
		let mut provider = create_btc_provider();
		provider.expect_get_transaction().never();
		let harness = harness(provider);

		let outcome = harness
			.service
			.request_tracking(request(TXID, target))
			.await
			.unwrap();

		assert!(matches!(outcome, TrackingOutcome::InvalidConfirmations));
		assert_eq!(
			harness.notifier.sent(),
			vec![Notification::InvalidConfirmations { max: 50 }]
		);
	}
}

#[tokio::test]
async fn test_target_of_fifty_is_accepted() {
	let harness = harness(provider_on_main(0));

	let outcome = harness
		.service
		.request_tracking(request(TXID, 50))
		.await
		.unwrap();

	match outcome {
		TrackingOutcome::Started { monitor, .. } => monitor.abort(),
		other => panic!("unexpected outcome {:?}", other),
	}
}

#[tokio::test]
async fn test_ethereum_txid_without_support_is_unsupported() {
	let mut provider = create_btc_provider();
	provider.expect_get_transaction().never();
	let harness = harness(provider);

	let outcome = harness
		.service
		.request_tracking(request(&format!("0x{}", &TXID[..62]), 1))
		.await
		.unwrap();

	assert!(matches!(outcome, TrackingOutcome::UnsupportedChain));
	assert_eq!(
		harness.notifier.sent(),
		vec![Notification::UnsupportedChain {
			supported: SupportedChains {
				main: vec!["BTC".to_string()],
				test: vec!["BTC".to_string()],
			}
		}]
	);
}

#[tokio::test]
async fn test_unknown_transaction_is_not_located() {
	let mut provider = create_btc_provider();
	provider
		.expect_get_transaction()
		.times(2)
		.returning(|_, _| Ok(TransactionStatus::not_found()));
	let harness = harness(provider);

	let outcome = harness
		.service
		.request_tracking(request(TXID, 1))
		.await
		.unwrap();

	assert!(matches!(outcome, TrackingOutcome::NotLocated));
	match &harness.notifier.calls()[1] {
		NotifierCall::Edit {
			notification: Some(Notification::NotLocated { .. }),
			..
		} => {}
		other => panic!("unexpected call {:?}", other),
	}
	assert!(harness.registry.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failing_chain_lookup_does_not_hide_other_chains() {
	let mut provider = create_btc_provider();
	provider.expect_get_transaction().returning(|chain, _| {
		if chain == "btc/main" {
			Err(anyhow::anyhow!("rate limited"))
		} else {
			Ok(TransactionStatus::with_confirmations(5))
		}
	});
	let harness = harness(provider);

	let outcome = harness
		.service
		.request_tracking(request(TXID, 2))
		.await
		.unwrap();

	assert!(matches!(
		outcome,
		TrackingOutcome::AlreadyReached { confirmations: 5 }
	));
}

#[tokio::test]
async fn test_duplicate_request_answers_existing_entry() {
	let harness = harness(provider_on_main(0));
	let existing = TrackedTransactionBuilder::new()
		.txid(TXID)
		.target_confirmations(1)
		.requester(1001, 42)
		.request_message_id(7)
		.build();
	harness.registry.add(existing).await.unwrap();

	let outcome = harness
		.service
		.request_tracking(request(TXID, 1))
		.await
		.unwrap();

	assert!(matches!(outcome, TrackingOutcome::AlreadyTracking));
	match harness.notifier.calls().last().unwrap() {
		NotifierCall::Send {
			recipient,
			notification: Notification::AlreadyTracking,
			..
		} => assert_eq!(*recipient, Recipient::reply(1001, 7)),
		other => panic!("unexpected call {:?}", other),
	}
	assert_eq!(harness.registry.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_same_transaction_with_other_target_is_tracked_separately() {
	let harness = harness(provider_on_main(0));
	let existing = TrackedTransactionBuilder::new()
		.txid(TXID)
		.target_confirmations(6)
		.requester(1001, 42)
		.build();
	harness.registry.add(existing).await.unwrap();

	let outcome = harness
		.service
		.request_tracking(request(TXID, 1))
		.await
		.unwrap();

	match outcome {
		TrackingOutcome::Started { monitor, .. } => monitor.abort(),
		other => panic!("unexpected outcome {:?}", other),
	}
	assert_eq!(harness.registry.get_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_already_reached_target_is_not_tracked() {
	let harness = harness(provider_on_main(3));

	let outcome = harness
		.service
		.request_tracking(request(TXID, 2))
		.await
		.unwrap();

	assert!(matches!(
		outcome,
		TrackingOutcome::AlreadyReached { confirmations: 3 }
	));
	assert_eq!(
		harness.notifier.sent(),
		vec![
			Notification::Locating,
			Notification::AlreadyReached { confirmations: 3 },
		]
	);
	assert!(harness.registry.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_partially_confirmed_transaction_reports_current_count() {
	let harness = harness(provider_on_main(1));

	let outcome = harness
		.service
		.request_tracking(request(TXID, 3))
		.await
		.unwrap();

	let monitor = match outcome {
		TrackingOutcome::Started { monitor, .. } => monitor,
		other => panic!("unexpected outcome {:?}", other),
	};
	monitor.abort();

	assert_eq!(
		harness.notifier.sent(),
		vec![
			Notification::Locating,
			Notification::CurrentConfirmations { confirmations: 1 },
			Notification::TrackingStarted {
				target: 3,
				has_confirmations: true,
			},
		]
	);
	assert_eq!(harness.registry.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_toggle_mute_flips_flag_and_button() {
	let harness = harness(create_btc_provider());
	let transaction = TrackedTransactionBuilder::new()
		.requester(1001, 42)
		.pending_block_alert(1001, 300)
		.build();
	let hash = transaction.stable_hash();
	harness.registry.add(transaction.clone()).await.unwrap();

	let outcome = harness.service.toggle_mute(&hash, REQUESTER).await.unwrap();
	assert_eq!(outcome, MuteToggleOutcome::Toggled { muted: true });

	let stored = harness
		.registry
		.find_by_stable_hash(&hash)
		.await
		.unwrap()
		.unwrap();
	assert!(stored.block_alerts_muted);
	assert_eq!(
		stored.pending_block_alert,
		Some(AlertRef {
			chat_id: 1001,
			message_id: 300,
		})
	);
	assert_eq!(
		harness.notifier.calls(),
		vec![NotifierCall::Edit {
			alert: AlertRef {
				chat_id: 1001,
				message_id: 300,
			},
			notification: None,
			options: Some(AlertOptions::block_alert_toggle(&hash, true)),
		}]
	);

	let outcome = harness.service.toggle_mute(&hash, REQUESTER).await.unwrap();
	assert_eq!(outcome, MuteToggleOutcome::Toggled { muted: false });
}

#[tokio::test]
async fn test_toggle_mute_by_other_user_is_refused() {
	let harness = harness(create_btc_provider());
	let transaction = TrackedTransactionBuilder::new().requester(1001, 42).build();
	let hash = transaction.stable_hash();
	harness.registry.add(transaction).await.unwrap();

	let intruder = RequesterIdentity {
		chat_id: 1001,
		user_id: 43,
	};
	let outcome = harness.service.toggle_mute(&hash, intruder).await.unwrap();

	assert_eq!(outcome, MuteToggleOutcome::NotAuthorized);
	let stored = harness
		.registry
		.find_by_stable_hash(&hash)
		.await
		.unwrap()
		.unwrap();
	assert!(!stored.block_alerts_muted);
	assert!(harness.notifier.calls().is_empty());
}

#[tokio::test]
async fn test_toggle_mute_unknown_hash() {
	let harness = harness(create_btc_provider());

	let outcome = harness
		.service
		.toggle_mute("0000000000000000", REQUESTER)
		.await
		.unwrap();

	assert_eq!(outcome, MuteToggleOutcome::NotFound);
}

#[tokio::test]
async fn test_resume_all_restarts_own_entries_and_drops_foreign_ones() {
	let mut provider = create_btc_provider();
	provider
		.expect_get_transaction()
		.returning(|_, _| Ok(TransactionStatus::with_confirmations(1)));
	let harness = harness(provider);

	let own = TrackedTransactionBuilder::new().target_confirmations(1).build();
	let foreign = TrackedTransactionBuilder::new()
		.provider("sochain")
		.chain("BTC")
		.requester(5, 6)
		.request_message_id(50)
		.pending_block_alert(5, 600)
		.build();
	harness.registry.add(own).await.unwrap();
	harness.registry.add(foreign).await.unwrap();

	let summary = harness.service.resume_all().await.unwrap();
	assert_eq!(summary.resumed, 1);
	assert_eq!(summary.dropped, 1);

	for monitor in summary.monitors {
		assert_eq!(monitor.await.unwrap(), MonitorOutcome::Confirmed);
	}

	let calls = harness.notifier.calls();
	assert!(calls.iter().any(|call| matches!(
		call,
		NotifierCall::Send {
			recipient: Recipient {
				chat_id: 5,
				reply_to_message_id: Some(50),
			},
			notification: Notification::ResubmitRequired,
			..
		}
	)));
	assert_eq!(
		harness.notifier.retracted(),
		vec![AlertRef {
			chat_id: 5,
			message_id: 600,
		}]
	);
	assert!(harness.registry.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_registry_failure_surfaces_as_registry_error() {
	let mut registry = MockTransactionRegistry::new();
	registry.expect_find_by_identity().returning(|_| Ok(None));
	registry
		.expect_add()
		.returning(|_| Err(anyhow::anyhow!("disk full")));

	let notifier = Arc::new(RecordingNotifier::new());
	let service = TxWatcherService::new(
		Arc::new(provider_on_main(0)),
		Arc::new(registry),
		notifier.clone(),
		&SettingsBuilder::new().build(),
	);

	let result = service.request_tracking(request(TXID, 1)).await;

	assert!(matches!(result, Err(TxWatcherError::RegistryError(_))));
	assert!(!notifier.sent().iter().any(|notification| matches!(
		notification,
		Notification::TrackingStarted { .. }
	)));
}
