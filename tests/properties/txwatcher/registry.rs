use std::collections::HashSet;

use crate::properties::strategies::identity_strategy;

use proptest::{prelude::*, test_runner::Config};
use tempfile::TempDir;
use txconfirm_monitor::{
	models::TrackedTransaction,
	services::txwatcher::{FileTransactionRegistry, TransactionRegistry},
};

proptest! {
	#![proptest_config(Config {
		cases: 32,
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_registry_never_holds_duplicate_identities(
		identities in proptest::collection::vec(identity_strategy(), 1..8),
		repeats in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
	) {
		let runtime = tokio::runtime::Runtime::new().unwrap();
		let dir = TempDir::new().unwrap();
		let registry = FileTransactionRegistry::new(dir.path().join("registry.json"));

		let mut submissions = identities.clone();
		submissions.extend(repeats.iter().map(|i| i.get(&identities).clone()));

		let accepted = runtime.block_on(async {
			let mut accepted = 0;
			for identity in &submissions {
				if registry
					.add(TrackedTransaction::new(identity.clone(), 1))
					.await
					.unwrap()
				{
					accepted += 1;
				}
			}
			accepted
		});

		let stored = runtime.block_on(registry.get_all()).unwrap();
		let distinct: HashSet<_> = submissions.iter().cloned().collect();
		let stored_identities: HashSet<_> = stored.iter().map(|t| t.identity.clone()).collect();

		prop_assert_eq!(accepted, distinct.len());
		prop_assert_eq!(stored.len(), distinct.len());
		prop_assert_eq!(stored_identities, distinct);
	}

	#[test]
	fn test_every_stored_entry_is_found_by_its_hash(
		identities in proptest::collection::hash_set(identity_strategy(), 1..6),
	) {
		let runtime = tokio::runtime::Runtime::new().unwrap();
		let dir = TempDir::new().unwrap();
		let registry = FileTransactionRegistry::new(dir.path().join("registry.json"));

		runtime.block_on(async {
			for identity in &identities {
				registry
					.add(TrackedTransaction::new(identity.clone(), 1))
					.await
					.unwrap();
			}
		});

		for identity in &identities {
			let found = runtime
				.block_on(registry.find_by_stable_hash(&identity.stable_hash()))
				.unwrap();
			prop_assert_eq!(found.map(|t| t.identity), Some(identity.clone()));
		}
	}
}
