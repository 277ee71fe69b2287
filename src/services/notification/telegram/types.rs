//! Bot API wire types.
//!
//! Only the fields the service reads are modelled; everything else in an update is ignored.

use serde::{Deserialize, Serialize};

/// Envelope every Bot API method answers with
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
	pub ok: bool,
	pub result: Option<T>,
	pub description: Option<String>,
	pub error_code: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
	pub id: i64,
	#[serde(default)]
	pub is_bot: bool,
	#[serde(default)]
	pub first_name: String,
	pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Chat {
	pub id: i64,
	/// `private`, `group`, `supergroup` or `channel`
	#[serde(rename = "type")]
	pub kind: String,
}

impl Chat {
	pub fn is_private(&self) -> bool {
		self.kind == "private"
	}
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Message {
	pub message_id: i64,
	pub from: Option<User>,
	pub chat: Chat,
	pub text: Option<String>,
	#[serde(default)]
	pub new_chat_members: Vec<User>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CallbackQuery {
	pub id: String,
	pub from: User,
	pub data: Option<String>,
	pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Update {
	pub update_id: i64,
	pub message: Option<Message>,
	pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InlineKeyboardButton {
	pub text: String,
	pub callback_data: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct InlineKeyboardMarkup {
	pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}
