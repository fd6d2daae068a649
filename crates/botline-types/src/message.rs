//! Chat message types.
//!
//! A session is an ordered `Vec<Message>`; insertion order is conversation
//! order. Messages serialise to the persisted snapshot shape
//! `{ "id": number, "sender": string, "text": string }`.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Sender label persisted for user-authored messages.
pub const USER_SENDER: &str = "user";

/// Reply text substituted when a backend response carries no content.
pub const NO_RESPONSE_PLACEHOLDER: &str = "[No response]";

/// Message identifier, strictly increasing by creation order within a session.
///
/// Values are millisecond-timestamp-like numbers, but uniqueness comes from
/// the generator in `botline-core`, not from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sender {
    User,
    /// A bot, identified by its display name at the time of the reply.
    Bot(String),
}

impl Sender {
    pub fn is_user(&self) -> bool {
        matches!(self, Sender::User)
    }

    pub fn label(&self) -> &str {
        match self {
            Sender::User => USER_SENDER,
            Sender::Bot(name) => name,
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sender label written by older hosts for user messages; read as `User`.
const LEGACY_USER_SENDER: &str = "User";

/// Prefix that marks a bot name which would otherwise read as a user label.
const BOT_NAME_ESCAPE: char = '\\';

// A bot may be named "user" or "User", so those names (and any name that
// already starts with the escape) are written with a leading `\`. Every
// other sender keeps the plain `"user" | "<bot name>"` layout.
impl Serialize for Sender {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Sender::User => serializer.serialize_str(USER_SENDER),
            Sender::Bot(name)
                if name == USER_SENDER
                    || name == LEGACY_USER_SENDER
                    || name.starts_with(BOT_NAME_ESCAPE) =>
            {
                serializer.collect_str(&format_args!("{BOT_NAME_ESCAPE}{name}"))
            }
            Sender::Bot(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for Sender {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        if let Some(name) = label.strip_prefix(BOT_NAME_ESCAPE) {
            return Ok(Sender::Bot(name.to_string()));
        }
        if label == USER_SENDER || label == LEGACY_USER_SENDER {
            Ok(Sender::User)
        } else {
            Ok(Sender::Bot(label))
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(id: MessageId, bot_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            sender: Sender::Bot(bot_name.into()),
            text: text.into(),
        }
    }
}
