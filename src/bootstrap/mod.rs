//! Bootstrap module for initializing services and dispatching chat updates.
//!
//! # Services
//! - `ProviderClientType`: the configured transaction data provider
//! - `FileTransactionRegistry`: the persistent registry of tracked transactions
//! - `TelegramNotifier`: chat delivery and long polling
//! - `TxWatcherService`: tracking requests, mute toggles and monitors
//!
//! # Dispatching
//! - `parse_chat_command`: turns message text into a [`ChatCommand`]
//! - `CommandDispatcher`: routes messages and button presses to the watcher service

use std::{error::Error, sync::Arc, time::Duration};

use crate::{
	models::{Notification, Recipient, RequesterIdentity, Settings},
	services::{
		blockchain::{ProviderClient, ProviderClientType},
		notification::{CallbackQuery, Message, Notifier, TelegramNotifier, Update, User},
		txwatcher::{
			FileTransactionRegistry, MuteToggleOutcome, TrackingRequest, TransactionRegistry,
			TxWatcherService,
		},
	},
	utils::{constants::TOGGLE_BLOCK_ALERTS_ACTION, parse_tracking_arguments},
};

/// Type alias for handling ServiceResult
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Watcher service over the production collaborators
pub type WatcherService =
	TxWatcherService<ProviderClientType, FileTransactionRegistry, TelegramNotifier>;

/// Greeting used when the bot is added to a group
const GROUP_GREETING_NAME: &str = "mates";

/// Pause before polling again after `getUpdates` failed
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Everything `main` needs to run the service
pub struct Services {
	pub provider: Arc<ProviderClientType>,
	pub registry: Arc<FileTransactionRegistry>,
	pub telegram: Arc<TelegramNotifier>,
	pub watcher: Arc<WatcherService>,
}

/// Initializes all required services from the loaded settings.
///
/// # Errors
/// Returns an error if the provider cannot be built (e.g. proxies are required but none are
/// configured) or the notifier cannot be set up.
pub async fn initialize_services(settings: &Settings) -> Result<Services> {
	let provider = Arc::new(ProviderClientType::from_settings(settings).await?);
	let registry = Arc::new(FileTransactionRegistry::new(settings.registry_path.clone()));
	let telegram =
		Arc::new(TelegramNotifier::from_settings(&settings.telegram, &settings.http_retry).await?);

	let watcher = Arc::new(TxWatcherService::new(
		provider.clone(),
		registry.clone(),
		telegram.clone(),
		settings,
	));

	tracing::info!(
		provider = provider.name(),
		budget = provider.max_requests_per_hour(),
		registry = %settings.registry_path.display(),
		"services initialized"
	);

	Ok(Services {
		provider,
		registry,
		telegram,
		watcher,
	})
}

/// A command understood by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
	/// `/start`
	Start,
	/// `/track <txid> [confirmations]`, or a bare txid or explorer link
	Track { txid: String, confirmations: u64 },
	/// `/track` with missing or malformed arguments
	TrackUsage,
}

/// Parses the text of a chat message.
///
/// Commands addressed to another bot (`/track@other_bot`) are ignored. Text that is not a
/// command is accepted when its first token is a txid or a link ending in one.
///
/// # Arguments
/// * `text` - Message text
/// * `bot_username` - This bot's username, if known
///
/// # Returns
/// * `Option<ChatCommand>` - The command, or `None` when the message is not for us
pub fn parse_chat_command(text: &str, bot_username: Option<&str>) -> Option<ChatCommand> {
	let text = text.trim();

	let Some(command_text) = text.strip_prefix('/') else {
		return parse_tracking_arguments(text)
			.map(|(txid, confirmations)| ChatCommand::Track { txid, confirmations });
	};

	let (head, arguments) = match command_text.split_once(char::is_whitespace) {
		Some((head, rest)) => (head, rest.trim()),
		None => (command_text, ""),
	};

	let name = match head.split_once('@') {
		Some((name, addressee)) => {
			let ours = bot_username.is_some_and(|bot| bot.eq_ignore_ascii_case(addressee));
			if !ours {
				return None;
			}
			name
		}
		None => head,
	};

	match name.to_ascii_lowercase().as_str() {
		"start" => Some(ChatCommand::Start),
		"track" => Some(
			parse_tracking_arguments(arguments)
				.map(|(txid, confirmations)| ChatCommand::Track { txid, confirmations })
				.unwrap_or(ChatCommand::TrackUsage),
		),
		_ => None,
	}
}

/// Routes chat updates to the watcher service
pub struct CommandDispatcher<P: ?Sized, R: ?Sized> {
	watcher: Arc<TxWatcherService<P, R, TelegramNotifier>>,
	telegram: Arc<TelegramNotifier>,
	bot: User,
}

impl<P, R> CommandDispatcher<P, R>
where
	P: ProviderClient + ?Sized + 'static,
	R: TransactionRegistry + ?Sized + 'static,
{
	/// Creates a dispatcher
	///
	/// # Arguments
	/// * `watcher` - Service every command ends up in
	/// * `telegram` - Notifier used for replies and callback answers
	/// * `bot` - The bot's own account, as returned by `getMe`
	pub fn new(
		watcher: Arc<TxWatcherService<P, R, TelegramNotifier>>,
		telegram: Arc<TelegramNotifier>,
		bot: User,
	) -> Self {
		Self {
			watcher,
			telegram,
			bot,
		}
	}

	/// Long-polls for updates forever, handling each one on its own task
	pub async fn run(self: Arc<Self>) {
		let mut offset = None;
		tracing::info!(bot = ?self.bot.username, "listening for chat updates");

		loop {
			let updates = match self.telegram.get_updates(offset).await {
				Ok(updates) => updates,
				Err(e) => {
					tracing::warn!(error = %e, "failed to poll updates");
					tokio::time::sleep(POLL_ERROR_BACKOFF).await;
					continue;
				}
			};

			for update in updates {
				offset = Some(update.update_id + 1);
				let dispatcher = self.clone();
				tokio::spawn(async move { dispatcher.handle_update(update).await });
			}
		}
	}

	/// Handles one update; failures are logged and never stop the dispatcher
	pub async fn handle_update(&self, update: Update) {
		if let Some(query) = update.callback_query {
			self.handle_callback(query).await;
		} else if let Some(message) = update.message {
			self.handle_message(message).await;
		}
	}

	async fn handle_message(&self, message: Message) {
		let recipient = Recipient::reply(message.chat.id, message.message_id);

		if message.new_chat_members.iter().any(|m| m.id == self.bot.id) {
			tracing::info!(chat_id = message.chat.id, "added to a group");
			self.send(
				&Recipient::chat(message.chat.id),
				&Notification::Welcome {
					name: Some(GROUP_GREETING_NAME.to_string()),
					private_chat: false,
				},
			)
			.await;
			return;
		}

		let (Some(text), Some(from)) = (message.text.as_deref(), message.from.as_ref()) else {
			return;
		};

		let Some(command) = parse_chat_command(text, self.bot.username.as_deref()) else {
			return;
		};

		match command {
			ChatCommand::Start => {
				self.send(
					&Recipient::chat(message.chat.id),
					&Notification::Welcome {
						name: Some(from.first_name.clone()),
						private_chat: message.chat.is_private(),
					},
				)
				.await;
			}
			ChatCommand::TrackUsage => {
				self.send(
					&recipient,
					&Notification::Usage {
						command: "track".to_string(),
						arguments: "<txid> [confirmations]".to_string(),
					},
				)
				.await;
			}
			ChatCommand::Track {
				txid,
				confirmations,
			} => {
				let request = TrackingRequest {
					txid,
					target_confirmations: confirmations,
					requester: RequesterIdentity {
						chat_id: message.chat.id,
						user_id: from.id,
					},
					request_message_id: message.message_id,
				};
				match self.watcher.request_tracking(request).await {
					Ok(outcome) => {
						tracing::debug!(chat_id = message.chat.id, outcome = ?outcome, "tracking request handled");
					}
					Err(e) => {
						tracing::error!(chat_id = message.chat.id, error = %e, "tracking request failed");
					}
				}
			}
		}
	}

	async fn handle_callback(&self, query: CallbackQuery) {
		let data = query.data.as_deref().unwrap_or_default();
		let Some((action, stable_hash)) = data.split_once(':') else {
			self.answer(&query, None).await;
			return;
		};

		if action != TOGGLE_BLOCK_ALERTS_ACTION {
			self.answer(&query, None).await;
			return;
		}

		let Some(chat_id) = query.message.as_ref().map(|m| m.chat.id) else {
			self.answer(&query, None).await;
			return;
		};

		let requester = RequesterIdentity {
			chat_id,
			user_id: query.from.id,
		};

		let text = match self.watcher.toggle_mute(stable_hash, requester).await {
			Ok(MuteToggleOutcome::Toggled { muted: true }) => Some("🔕 Block alerts muted"),
			Ok(MuteToggleOutcome::Toggled { muted: false }) => Some("🔔 Block alerts unmuted"),
			Ok(MuteToggleOutcome::NotAuthorized) | Ok(MuteToggleOutcome::NotFound) => None,
			Err(e) => {
				tracing::error!(stable_hash = %stable_hash, error = %e, "mute toggle failed");
				None
			}
		};

		self.answer(&query, text).await;
	}

	async fn answer(&self, query: &CallbackQuery, text: Option<&str>) {
		if let Err(e) = self.telegram.answer_callback_query(&query.id, text).await {
			tracing::warn!(callback_query_id = %query.id, error = %e, "failed to answer callback query");
		}
	}

	async fn send(&self, recipient: &Recipient, notification: &Notification) {
		if let Err(e) = self
			.telegram
			.send_notification(recipient, notification, None)
			.await
		{
			tracing::warn!(chat_id = recipient.chat_id, kind = notification.kind(), error = %e, "failed to send reply");
		}
	}
}
