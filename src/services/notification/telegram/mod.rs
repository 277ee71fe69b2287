//! Telegram Bot API notifier.
//!
//! Delivers rendered notifications with `sendMessage`, edits and retracts alerts, and exposes
//! the long-polling and callback calls the command dispatcher needs. The bot token only ever
//! appears in request URLs and is scrubbed from every error message.

mod types;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::{collections::HashMap, time::Duration};

use crate::{
	models::{AlertOptions, AlertRef, Notification, Recipient, SecretString, TelegramSettings},
	services::{
		blockchain::TransientErrorRetryStrategy,
		notification::{
			message::{disables_link_preview, render_markdown_v2},
			NotificationError, Notifier,
		},
	},
	utils::{
		http::{build_base_http_client, create_retryable_http_client},
		metrics::record_notification_sent,
		RetryConfig,
	},
};

pub use types::{
	ApiResponse, CallbackQuery, Chat, InlineKeyboardButton, InlineKeyboardMarkup, Message, Update,
	User,
};

/// Headroom added on top of the long-poll timeout before the HTTP request is abandoned
const POLL_TIMEOUT_HEADROOM: Duration = Duration::from_secs(10);

/// Telegram answers edits that change nothing with this description
const NOT_MODIFIED: &str = "message is not modified";

/// The Bot API received the call and refused it
#[derive(Debug)]
struct ApiRefusal {
	code: Option<u16>,
	description: String,
}

fn keyboard(options: &AlertOptions) -> InlineKeyboardMarkup {
	InlineKeyboardMarkup {
		inline_keyboard: options
			.buttons
			.iter()
			.map(|button| {
				vec![InlineKeyboardButton {
					text: button.label.clone(),
					callback_data: button.callback_data.clone(),
				}]
			})
			.collect(),
	}
}

/// Notifier backed by the Telegram Bot API
pub struct TelegramNotifier {
	client: ClientWithMiddleware,
	api_url: String,
	token: SecretString,
	poll_timeout_secs: u64,
}

impl TelegramNotifier {
	/// Creates a notifier
	///
	/// # Arguments
	/// * `api_url` - Bot API root, without the `/bot<token>` part
	/// * `token` - Bot token
	/// * `poll_timeout_secs` - Long-poll timeout for `getUpdates`
	/// * `retry` - Retry policy for every API call
	///
	/// # Returns
	/// * `Result<Self, NotificationError>` - The notifier, or a config error if the HTTP
	///   client could not be built
	pub fn new(
		api_url: &str,
		token: SecretString,
		poll_timeout_secs: u64,
		retry: &RetryConfig,
	) -> Result<Self, NotificationError> {
		let timeout = Duration::from_secs(poll_timeout_secs) + POLL_TIMEOUT_HEADROOM;
		let base_client = build_base_http_client(timeout, None).map_err(|e| {
			NotificationError::config_error("Failed to build Telegram HTTP client", Some(Box::new(e)), None)
		})?;

		Ok(Self {
			client: create_retryable_http_client(
				retry,
				base_client,
				Some(TransientErrorRetryStrategy),
			),
			api_url: api_url.trim_end_matches('/').to_string(),
			token,
			poll_timeout_secs,
		})
	}

	/// Creates a notifier from the `telegram` settings section, resolving the token
	pub async fn from_settings(
		settings: &TelegramSettings,
		retry: &RetryConfig,
	) -> Result<Self, NotificationError> {
		let token = settings.token.resolve().await.map_err(|e| {
			NotificationError::config_error("Failed to resolve the bot token", Some(e), None)
		})?;

		Self::new(&settings.api_url, token, settings.poll_timeout_secs, retry)
	}

	fn method_url(&self, method: &str) -> String {
		format!("{}/bot{}/{}", self.api_url, self.token.as_str(), method)
	}

	fn scrub(&self, text: String) -> String {
		text.replace(self.token.as_str(), "<token>")
	}

	/// Calls a Bot API method, separating refusals from transport failures
	async fn call_raw<T: DeserializeOwned>(
		&self,
		method: &str,
		body: &Value,
	) -> Result<Result<T, ApiRefusal>, NotificationError> {
		let metadata = || Some(HashMap::from([("method".to_string(), method.to_string())]));

		let response = self
			.client
			.post(self.method_url(method))
			.json(body)
			.send()
			.await
			.map_err(|e| {
				let message = match e {
					reqwest_middleware::Error::Reqwest(e) => e.without_url().to_string(),
					other => other.to_string(),
				};
				NotificationError::network_error(
					format!("Telegram request failed: {}", self.scrub(message)),
					None,
					metadata(),
				)
			})?;

		let status = response.status();
		let envelope = response.json::<ApiResponse<T>>().await.map_err(|e| {
			NotificationError::internal_error(
				format!(
					"Failed to parse Telegram response (status {}): {}",
					status,
					self.scrub(e.without_url().to_string())
				),
				None,
				metadata(),
			)
		})?;

		if !envelope.ok {
			return Ok(Err(ApiRefusal {
				code: envelope.error_code.or(Some(status.as_u16())),
				description: envelope.description.unwrap_or_default(),
			}));
		}

		match envelope.result {
			Some(result) => Ok(Ok(result)),
			None => Err(NotificationError::internal_error(
				"Telegram response is missing its result",
				None,
				metadata(),
			)),
		}
	}

	/// Calls a Bot API method, treating a refusal as a failed notification
	async fn call<T: DeserializeOwned>(
		&self,
		method: &str,
		body: &Value,
	) -> Result<T, NotificationError> {
		self.call_raw(method, body)
			.await?
			.map_err(|refusal| self.refusal_error(method, refusal))
	}

	/// Calls an edit method; an edit that changes nothing is not a failure
	async fn call_edit(&self, method: &str, body: &Value) -> Result<(), NotificationError> {
		match self.call_raw::<Value>(method, body).await? {
			Ok(_) => Ok(()),
			Err(refusal) if refusal.description.contains(NOT_MODIFIED) => {
				tracing::debug!(method = method, "alert already up to date");
				Ok(())
			}
			Err(refusal) => Err(self.refusal_error(method, refusal)),
		}
	}

	fn refusal_error(&self, method: &str, refusal: ApiRefusal) -> NotificationError {
		let mut metadata = HashMap::from([("method".to_string(), method.to_string())]);
		if let Some(code) = refusal.code {
			metadata.insert("error_code".to_string(), code.to_string());
		}
		NotificationError::notify_failed(
			format!("Telegram refused {}: {}", method, self.scrub(refusal.description)),
			None,
			Some(metadata),
		)
	}

	/// Acknowledges a button press, optionally showing a short toast
	pub async fn answer_callback_query(
		&self,
		callback_query_id: &str,
		text: Option<&str>,
	) -> Result<(), NotificationError> {
		let mut body = json!({ "callback_query_id": callback_query_id });
		if let Some(text) = text {
			body["text"] = json!(text);
		}
		self.call::<bool>("answerCallbackQuery", &body).await?;
		Ok(())
	}

	/// Long-polls for updates
	///
	/// # Arguments
	/// * `offset` - Identifier of the first update to return; earlier ones are confirmed
	///
	/// # Returns
	/// * `Result<Vec<Update>, NotificationError>` - Messages and callback queries, possibly none
	pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, NotificationError> {
		let mut body = json!({
			"timeout": self.poll_timeout_secs,
			"allowed_updates": ["message", "callback_query"],
		});
		if let Some(offset) = offset {
			body["offset"] = json!(offset);
		}
		self.call("getUpdates", &body).await
	}

	/// The bot's own account
	pub async fn get_me(&self) -> Result<User, NotificationError> {
		self.call("getMe", &json!({})).await
	}
}

#[async_trait]
impl Notifier for TelegramNotifier {
	async fn send_notification(
		&self,
		recipient: &Recipient,
		notification: &Notification,
		options: Option<AlertOptions>,
	) -> Result<AlertRef, NotificationError> {
		let mut body = json!({
			"chat_id": recipient.chat_id,
			"text": render_markdown_v2(notification),
			"parse_mode": "MarkdownV2",
			"allow_sending_without_reply": true,
		});
		if let Some(message_id) = recipient.reply_to_message_id {
			body["reply_to_message_id"] = json!(message_id);
		}
		if disables_link_preview(notification) {
			body["disable_web_page_preview"] = json!(true);
		}
		if let Some(options) = options.filter(|o| !o.buttons.is_empty()) {
			body["reply_markup"] = json!(keyboard(&options));
		}

		let message: Message = self.call("sendMessage", &body).await?;
		record_notification_sent(notification.kind());
		tracing::debug!(
			chat_id = recipient.chat_id,
			kind = notification.kind(),
			message_id = message.message_id,
			"notification sent"
		);

		Ok(AlertRef {
			chat_id: message.chat.id,
			message_id: message.message_id,
		})
	}

	async fn retract_alert(&self, alert: &AlertRef) -> Result<(), NotificationError> {
		self.edit_alert(alert, None, Some(AlertOptions::none()))
			.await
	}

	async fn edit_alert(
		&self,
		alert: &AlertRef,
		notification: Option<&Notification>,
		options: Option<AlertOptions>,
	) -> Result<(), NotificationError> {
		let mut body = json!({
			"chat_id": alert.chat_id,
			"message_id": alert.message_id,
		});

		match notification {
			Some(notification) => {
				body["text"] = json!(render_markdown_v2(notification));
				body["parse_mode"] = json!("MarkdownV2");
				if disables_link_preview(notification) {
					body["disable_web_page_preview"] = json!(true);
				}
				if let Some(options) = options {
					body["reply_markup"] = json!(keyboard(&options));
				}
				self.call_edit("editMessageText", &body).await
			}
			None => {
				body["reply_markup"] = json!(keyboard(&options.unwrap_or_default()));
				self.call_edit("editMessageReplyMarkup", &body).await
			}
		}
	}
}
