//! Notification delivery.
//!
//! Notifications are composed from the [`Notification`] enum, rendered to Telegram
//! MarkdownV2 and delivered through a [`Notifier`]. Monitors and the tracking service only
//! see the trait, so delivery can be replaced in tests.

use async_trait::async_trait;

mod error;
pub mod message;
mod telegram;

use crate::models::{AlertOptions, AlertRef, Notification, Recipient};

pub use error::NotificationError;
pub use message::{escape_markdown_v2, render_markdown_v2};
pub use telegram::{CallbackQuery, Chat, Message, TelegramNotifier, Update, User};

/// Delivers notifications to requesters and manages the alerts already sent
#[async_trait]
pub trait Notifier: Send + Sync {
	/// Sends a notification
	///
	/// # Arguments
	/// * `recipient` - Chat to send to, optionally as a reply
	/// * `notification` - What to say
	/// * `options` - Buttons to attach
	///
	/// # Returns
	/// * `Result<AlertRef, NotificationError>` - Handle to the delivered message
	async fn send_notification(
		&self,
		recipient: &Recipient,
		notification: &Notification,
		options: Option<AlertOptions>,
	) -> Result<AlertRef, NotificationError>;

	/// Withdraws the interactive part of an alert so it can no longer be acted on
	async fn retract_alert(&self, alert: &AlertRef) -> Result<(), NotificationError>;

	/// Replaces the text and/or buttons of a delivered message.
	///
	/// With no notification only the buttons are replaced; `None` options then remove them.
	async fn edit_alert(
		&self,
		alert: &AlertRef,
		notification: Option<&Notification>,
		options: Option<AlertOptions>,
	) -> Result<(), NotificationError>;
}
