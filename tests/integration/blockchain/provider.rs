//! Integration tests for locating transactions through configured providers.

use mockito::{Matcher, Server};
use serde_json::json;

use txconfirm_monitor::{
	models::ProviderKind,
	services::{
		blockchain::{supported_chains, ProviderClient, ProviderClientType},
		txwatcher::locate_transaction,
	},
	utils::tests::builders::SettingsBuilder,
};

const TXID: &str = "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16";

#[tokio::test]
async fn test_blockcypher_locates_on_test_chain_after_main_chains() {
	let mut server = Server::new_async().await;
	let main_chains = server
		.mock(
			"GET",
			Matcher::Regex(r"^/(btc|eth|ltc|doge|dash)/main/txs/".to_string()),
		)
		.with_status(404)
		.with_body(json!({ "error": "Transaction not found." }).to_string())
		.expect(5)
		.create_async()
		.await;
	let test_chain = server
		.mock("GET", format!("/btc/test3/txs/{}", TXID).as_str())
		.with_status(200)
		.with_body(json!({ "confirmations": 2, "double_spend": false }).to_string())
		.create_async()
		.await;

	let settings = SettingsBuilder::new()
		.provider(ProviderKind::BlockCypher)
		.base_url(&server.url())
		.build();
	let provider = ProviderClientType::from_settings(&settings).await.unwrap();

	let located = locate_transaction(&provider, TXID).await.unwrap();

	assert_eq!(located.chain, "btc/test3");
	assert!(located.testnet);
	assert_eq!(located.status.confirmations, 2);
	assert_eq!(provider.format_chain_name(&located.chain), "BTC");
	main_chains.assert_async().await;
	test_chain.assert_async().await;
}

#[tokio::test]
async fn test_sochain_locates_on_first_main_chain() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", format!("/is_tx_confirmed/BTC/{}", TXID).as_str())
		.with_status(200)
		.with_body(
			json!({
				"status": "success",
				"data": { "txid": TXID, "confirmations": 0, "is_confirmed": false }
			})
			.to_string(),
		)
		.expect(1)
		.create_async()
		.await;

	let settings = SettingsBuilder::new()
		.provider(ProviderKind::SoChain)
		.base_url(&server.url())
		.build();
	let provider = ProviderClientType::from_settings(&settings).await.unwrap();

	let located = locate_transaction(&provider, TXID).await.unwrap();

	assert_eq!(located.chain, "BTC");
	assert!(!located.testnet);
	assert!(located.status.found);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_unknown_transaction_is_not_located() {
	let mut server = Server::new_async().await;
	server
		.mock("GET", Matcher::Any)
		.with_status(404)
		.with_body(json!({ "status": "fail" }).to_string())
		.create_async()
		.await;

	let settings = SettingsBuilder::new()
		.provider(ProviderKind::SoChain)
		.base_url(&server.url())
		.build();
	let provider = ProviderClientType::from_settings(&settings).await.unwrap();

	assert!(locate_transaction(&provider, TXID).await.is_none());

	let supported = supported_chains(&provider);
	assert_eq!(supported.main, vec!["BTC", "LTC", "DOGE", "DASH", "ZEC"]);
	assert_eq!(supported.test, supported.main);
}
