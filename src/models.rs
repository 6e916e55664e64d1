//! # Database models
//!
//! Data structures that map to the chat history SQLite schema via **Diesel**.
//!
//! - [`Chat`]: one persisted conversation thread.
//! - [`Message`]: one user or assistant turn, owned by a chat.
//! - [`Attachment`]: an uploaded file, owned by a chat and optionally referenced
//!   by a message.
//!
//! Row types that are read back derive `Queryable`/`Selectable`; the `New*`
//! structs borrow their data and derive `Insertable`. Primary keys are assigned
//! by SQLite on insert.
//!
//! [`ChatMessage`] is the `{role, content}` pair the rest of the crate passes
//! around: it is what the store hands back for display and what a model
//! gateway receives as conversational context.

use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Sender of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// The lowercase form stored in the `messages.role` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("Role in message not allowed: {other}")),
        }
    }
}

/// A single turn of conversational context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A persisted conversation thread.
///
/// `last_updated` is bumped on every saved message and on rename, so sorting by
/// it descending puts the most recently active chat first.
#[derive(Queryable, Identifiable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::chats)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Chat {
    pub id: i32,
    /// Short display title.
    pub title: String,
    /// `provider/model` identifier, e.g. `ollama/llama2`.
    pub model: String,
    pub created_at: NaiveDateTime,
    pub last_updated: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::chats)]
pub struct NewChat<'a> {
    pub title: &'a str,
    pub model: &'a str,
    pub created_at: NaiveDateTime,
    pub last_updated: NaiveDateTime,
}

/// One stored turn of a chat.
#[derive(Queryable, Identifiable, Selectable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Chat))]
#[diesel(table_name = crate::schema::messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Message {
    pub id: i32,
    pub chat_id: i32,
    /// `"user"` or `"assistant"`, see [`Role`].
    pub role: String,
    pub content: String,
    pub timestamp: NaiveDateTime,
    /// Optional reference to an [`Attachment`].
    pub file_id: Option<i32>,
}

impl TryFrom<Message> for ChatMessage {
    type Error = String;

    fn try_from(row: Message) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            role: row.role.parse()?,
            content: row.content,
        })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::messages)]
pub struct NewMessage<'a> {
    pub chat_id: i32,
    pub role: &'a str,
    pub content: &'a str,
    pub timestamp: NaiveDateTime,
    pub file_id: Option<i32>,
}

/// A file uploaded into a chat. `content` holds the raw bytes.
#[derive(Queryable, Identifiable, Selectable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Chat))]
#[diesel(table_name = crate::schema::attachments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Attachment {
    pub id: i32,
    pub chat_id: i32,
    pub filename: String,
    pub content: Vec<u8>,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::attachments)]
pub struct NewAttachment<'a> {
    pub chat_id: i32,
    pub filename: &'a str,
    pub content: &'a [u8],
    pub uploaded_at: NaiveDateTime,
}
