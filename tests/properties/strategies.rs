use proptest::{prelude::*, sample::select};
use txconfirm_monitor::models::{RequesterIdentity, TransactionIdentity};

pub fn txid_strategy() -> impl Strategy<Value = String> {
	"[a-f0-9]{64}"
}

pub fn requester_strategy() -> impl Strategy<Value = RequesterIdentity> {
	(any::<i64>(), 1..i64::MAX).prop_map(|(chat_id, user_id)| RequesterIdentity { chat_id, user_id })
}

pub fn identity_strategy() -> impl Strategy<Value = TransactionIdentity> {
	(
		select(vec!["blockcypher", "sochain", "mempool", "BlockCypher"]),
		select(vec!["btc/main", "btc/test3", "DOGE", "LTCTEST", "main", "test"]),
		txid_strategy(),
		1..=50u64,
		requester_strategy(),
	)
		.prop_map(|(provider, chain, txid, target, requester)| {
			TransactionIdentity::new(provider, chain, &txid, target, requester)
		})
}
