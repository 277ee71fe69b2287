//! Rendering of notifications into Telegram MarkdownV2.
//!
//! Messages are written with light markup (`*bold*`, `_italic_`, `` `code` ``,
//! `[label](url)`) and then escaped for MarkdownV2. Escaping keeps those entities intact
//! and escapes every other reserved character, including the ones inside entities.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{Notification, SupportedChains};

/// Characters MarkdownV2 reserves outside of entities
const SPECIAL: &[char] = &[
	'_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
	'\\',
];

/// Characters stripped from user-supplied names so they cannot open an entity
const ENTITY_DELIMITERS: &[char] = &['*', '_', '~', '`', '[', ']', '(', ')'];

/// Explorer used to link replacement transactions
const REPLACEMENT_EXPLORER_URL: &str = "https://live.blockcypher.com/btc/tx";

lazy_static! {
	static ref ENTITY: Regex = Regex::new(
		r"(?s)```.*?```|`[^`]*`|\*[^*\n]+\*|_[^_\n]+_|~[^~\n]+~|\[([^\]]+)\]\(([^)]+)\)"
	)
	.unwrap();
}

fn escape_plain(text: &str, out: &mut String) {
	for c in text.chars() {
		if SPECIAL.contains(&c) {
			out.push('\\');
		}
		out.push(c);
	}
}

/// Escapes a message for MarkdownV2 while preserving its entities.
///
/// Inside code spans only `\` is escaped; inside link URLs only `)` and `\` are.
pub fn escape_markdown_v2(text: &str) -> String {
	let mut out = String::with_capacity(text.len() * 2);
	let mut last = 0;

	for caps in ENTITY.captures_iter(text) {
		let Some(entity) = caps.get(0) else { continue };
		escape_plain(&text[last..entity.start()], &mut out);

		let raw = entity.as_str();
		if let (Some(label), Some(url)) = (caps.get(1), caps.get(2)) {
			out.push('[');
			escape_plain(label.as_str(), &mut out);
			out.push_str("](");
			for c in url.as_str().chars() {
				if c == ')' || c == '\\' {
					out.push('\\');
				}
				out.push(c);
			}
			out.push(')');
		} else if raw.starts_with('`') {
			out.push_str(&raw.replace('\\', "\\\\"));
		} else {
			let delimiter = &raw[..1];
			out.push_str(delimiter);
			escape_plain(&raw[1..raw.len() - 1], &mut out);
			out.push_str(delimiter);
		}

		last = entity.end();
	}

	escape_plain(&text[last..], &mut out);
	out
}

/// Appends `s` to a word when the count calls for a plural
pub fn pluralize(word: &str, count: u64) -> String {
	if count > 1 {
		format!("{}s", word)
	} else {
		word.to_string()
	}
}

fn supported_chains_block(supported: &SupportedChains) -> String {
	let mut block = format!("*🌐 Main blockchains:* {}", supported.main.join(" / "));
	if !supported.test.is_empty() {
		block.push_str(&format!(
			"\n\n*🧪 Test blockchains:* {}",
			supported.test.join(" / ")
		));
	}
	block
}

fn greeting_name(name: Option<&str>) -> String {
	name.map(|n| {
		n.chars()
			.filter(|c| !ENTITY_DELIMITERS.contains(c))
			.collect::<String>()
	})
	.filter(|n| n.chars().any(char::is_alphanumeric))
	.unwrap_or_else(|| "mate".to_string())
}

/// Message text with light markup, before escaping
pub fn compose(notification: &Notification) -> String {
	match notification {
		Notification::Welcome { name, private_chat } => {
			let mut text = format!(
				"👋 Hey {}! I will keep an eye on your transactions from now on.\n\n\
				 *Here is what I can do:*\n\n\
				 ✅ Confirmations tracking\n\
				 ⛏ Mined blocks tracking\n\
				 🔄 Double-spend detection\n\n\
				 🔗 Send me a transaction hash or URL to get started!\n\n\
				 💡 Pro tip: You can also append a custom amount of confirmations.",
				greeting_name(name.as_deref())
			);
			if *private_chat {
				text.push_str(
					"\n\n👥 Psst, I also work in groups! Add me in the middle of a deal and I'll be happy to help with tracking a transaction.",
				);
			}
			text
		}
		Notification::Usage { command, arguments } => {
			format!("Usage: `/{} {}`", command, arguments)
		}
		Notification::Locating => "🔄 Locating transaction...".to_string(),
		Notification::Located { chain, testnet } => format!(
			"🌐 Transaction found on the *{}{}* blockchain.",
			chain,
			if *testnet { " test" } else { "" }
		),
		Notification::NotLocated { supported } => format!(
			"😓 Sorry, I was unable to locate this transaction on any blockchain.\n\n{}",
			supported_chains_block(supported)
		),
		Notification::UnsupportedChain { supported } => format!(
			"😔 Sorry, Ethereum tokens aren't supported as of right now.\n\n{}",
			supported_chains_block(supported)
		),
		Notification::InvalidConfirmations { max } => format!(
			"❌ Confirmation count must be between *1* and *{}*.",
			max
		),
		Notification::AlreadyTracking => {
			"⬆️ You are already monitoring this transaction.".to_string()
		}
		Notification::AlreadyReached { confirmations } => format!(
			"❎ Your transaction has already reached *{}* {}.",
			confirmations,
			pluralize("confirmation", *confirmations)
		),
		Notification::CurrentConfirmations { confirmations } => format!(
			"ℹ️ Your transaction currently has *{}* {}.",
			confirmations,
			pluralize("confirmation", *confirmations)
		),
		Notification::TrackingStarted {
			target,
			has_confirmations,
		} => {
			let (prefix, subject) = if *has_confirmations {
				("", "it")
			} else {
				("Ok, ", "your transaction")
			};
			format!(
				"🔔 {}I will let you know when {} hits *{}* {}.",
				prefix,
				subject,
				target,
				pluralize("confirmation", *target)
			)
		}
		Notification::Confirmed { confirmations } => format!(
			"✅ Your transaction just hit *{}* {}!",
			confirmations,
			pluralize("confirmation", *confirmations)
		),
		Notification::DoubleSpent { replacement_txid } => {
			let mut text = "*⚠️ Your transaction has been double-spent!*\n\n\
				This could be either because the sender reversed it, or accelerated it by increasing the fee."
				.to_string();
			if let Some(txid) = replacement_txid {
				text.push_str(&format!(
					"\n\nHere is the replacement transaction: [{txid}]({REPLACEMENT_EXPLORER_URL}/{txid}/)"
				));
			}
			text.push_str("\n\n*Be extremely careful when accepting this transaction!*");
			text
		}
		Notification::BlockNotIncluded { height } => format!(
			"⛏ New block `#{}` was mined but your transaction didn't make it through, most likely because of the fees being too low.",
			height
		),
		Notification::Included { height, target } => format!(
			"⛏ New block `#{}` was mined and your transaction just made it through.\n\n\
			 ⏳ {} more until it reaches {} {}...",
			height,
			target.saturating_sub(1),
			target,
			pluralize("confirmation", *target)
		),
		Notification::ResubmitRequired => {
			"⚠️ I was just restarted with a different data provider, please send me your transaction again."
				.to_string()
		}
	}
}

/// Escaped MarkdownV2 text of a notification
pub fn render_markdown_v2(notification: &Notification) -> String {
	escape_markdown_v2(&compose(notification))
}

/// Whether link previews should be suppressed for a notification
pub fn disables_link_preview(notification: &Notification) -> bool {
	matches!(notification, Notification::DoubleSpent { .. })
}
