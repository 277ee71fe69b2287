use crate::properties::strategies::txid_strategy;

use proptest::{prelude::*, sample::select, test_runner::Config};
use txconfirm_monitor::utils::{extract_txid, parse_tracking_arguments};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_txid_is_extracted_from_explorer_links(
		txid in txid_strategy(),
		prefix in select(vec![
			"",
			"https://mempool.space/tx/",
			"https://live.blockcypher.com/btc/tx/",
			"https://chain.so/tx/BTC/",
			"https://blockchair.com/bitcoin/transaction/",
			"https://explorer.example/#tx=",
		]),
		suffix in select(vec!["", "/", "/inputs"]),
	) {
		let link = format!("{}{}{}", prefix, txid, suffix);
		prop_assert_eq!(extract_txid(&link), Some(txid));
	}

	#[test]
	fn test_ethereum_prefix_is_preserved(txid in txid_strategy()) {
		let prefixed = format!("0x{}", txid);
		prop_assert_eq!(extract_txid(&prefixed), Some(prefixed.clone()));
	}

	#[test]
	fn test_confirmation_count_is_parsed(txid in txid_strategy(), confirmations in any::<u64>()) {
		prop_assert_eq!(
			parse_tracking_arguments(&format!("{} {}", txid, confirmations)),
			Some((txid.clone(), confirmations))
		);
		prop_assert_eq!(parse_tracking_arguments(&txid), Some((txid, 1)));
	}

	#[test]
	fn test_short_hex_is_not_a_txid(hex in "[a-f0-9]{1,63}") {
		prop_assert_eq!(extract_txid(&hex), None);
	}
}
