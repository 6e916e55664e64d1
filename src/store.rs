//! # Conversation store
//!
//! Sequential SQLite persistence (via Diesel) for chats, their messages and
//! their attachments, with a fixed-size retention window per chat.
//!
//! Every operation opens its own connection, runs its statements and drops the
//! connection again; nothing is pooled and nothing is shared between calls.
//! Operations that write more than one row run inside a single immediate
//! transaction, so a reader never observes a chat holding more than
//! `max_history_length` messages.
//!
//! ## Ordering
//! Messages are ordered by `(timestamp, id)` ascending. Timestamps come from the
//! UTC clock; the id tiebreak keeps insertion order for messages saved within
//! the same clock tick. Pruning removes from the front of that order.
//!
//! ## Example
//! ```no_run
//! use amber_chat::models::Role;
//! use amber_chat::store::ConversationStore;
//!
//! # fn demo() -> Result<(), amber_chat::store::StoreError> {
//! let store = ConversationStore::open("amber_chat_history.db", 30)?;
//! let chat_id = store.create_chat("Rust lifetimes", "ollama/llama2")?;
//! store.save_message(chat_id, Role::User, "What is a lifetime?", None)?;
//! for message in store.get_chat_messages(chat_id)? {
//!     println!("{}: {}", message.role, message.content);
//! }
//! # Ok(()) }
//! ```

use chrono::{NaiveDateTime, Utc};
use diesel::{connection::SimpleConnection, prelude::*};
use tracing::{debug, info};

use crate::{
    models::{
        Attachment, Chat, ChatMessage, Message, NewAttachment, NewChat, NewMessage, Role,
    },
    schema::{attachments, chats, messages},
};

/// Default retention window, in messages per chat.
pub const DEFAULT_MAX_HISTORY_LENGTH: usize = 30;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS chats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        model TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL,
        last_updated TIMESTAMP NOT NULL
    );
    CREATE TABLE IF NOT EXISTS attachments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id INTEGER NOT NULL REFERENCES chats (id),
        filename TEXT NOT NULL,
        content BLOB NOT NULL,
        uploaded_at TIMESTAMP NOT NULL
    );
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id INTEGER NOT NULL REFERENCES chats (id),
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        timestamp TIMESTAMP NOT NULL,
        file_id INTEGER REFERENCES attachments (id)
    );
    CREATE INDEX IF NOT EXISTS messages_chat_order ON messages (chat_id, timestamp, id);
";

/// Failures surfaced by the store. All of them come from the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not open chat history database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("chat history query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("stored message has an invalid role: {0}")]
    InvalidRole(String),
}

/// Handle to the chat history database.
///
/// The handle only remembers where the database lives and how many messages to
/// keep per chat; it holds no connection between calls.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    db_url: String,
    max_history_length: usize,
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl ConversationStore {
    /// Open (and if needed create) the database at `db_url` and make sure the
    /// schema exists.
    pub fn open(db_url: impl Into<String>, max_history_length: usize) -> Result<Self, StoreError> {
        let store = Self {
            db_url: db_url.into(),
            max_history_length,
        };
        info!("Using database: {}", store.db_url);

        let mut conn = store.connect()?;
        conn.batch_execute(SCHEMA)?;

        Ok(store)
    }

    /// Where the database lives.
    pub fn db_url(&self) -> &str {
        &self.db_url
    }

    /// Messages kept per chat before the oldest are pruned.
    pub fn max_history_length(&self) -> usize {
        self.max_history_length
    }

    fn connect(&self) -> Result<SqliteConnection, StoreError> {
        let mut conn = SqliteConnection::establish(&self.db_url)?;
        conn.batch_execute("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Insert a new chat with `created_at == last_updated == now` and return its id.
    pub fn create_chat(&self, title: &str, model: &str) -> Result<i32, StoreError> {
        let mut conn = self.connect()?;
        let now = now();

        let id = diesel::insert_into(chats::table)
            .values(&NewChat {
                title,
                model,
                created_at: now,
                last_updated: now,
            })
            .returning(chats::id)
            .get_result(&mut conn)?;

        debug!("Created chat {} ({:?}, {})", id, title, model);
        Ok(id)
    }

    /// Append a message to a chat, bump the chat's `last_updated` to the
    /// message timestamp and prune the oldest messages beyond the retention
    /// window. All three steps commit together.
    pub fn save_message(
        &self,
        chat_id: i32,
        role: Role,
        content: &str,
        attachment_id: Option<i32>,
    ) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        let limit = self.max_history_length as i64;

        conn.immediate_transaction(|conn| {
            let now = now();

            diesel::insert_into(messages::table)
                .values(&NewMessage {
                    chat_id,
                    role: role.as_str(),
                    content,
                    timestamp: now,
                    file_id: attachment_id,
                })
                .execute(conn)?;

            diesel::update(chats::table.find(chat_id))
                .set(chats::last_updated.eq(now))
                .execute(conn)?;

            let count: i64 = messages::table
                .filter(messages::chat_id.eq(chat_id))
                .count()
                .get_result(conn)?;

            if count > limit {
                let stale: Vec<i32> = messages::table
                    .filter(messages::chat_id.eq(chat_id))
                    .order((messages::timestamp.asc(), messages::id.asc()))
                    .select(messages::id)
                    .limit(count - limit)
                    .load(conn)?;

                let pruned = diesel::delete(messages::table.filter(messages::id.eq_any(stale)))
                    .execute(conn)?;
                debug!("Pruned {} old messages from chat {}", pruned, chat_id);
            }

            Ok(())
        })
    }

    /// All chats, most recently active first.
    pub fn get_all_chats(&self) -> Result<Vec<Chat>, StoreError> {
        let mut conn = self.connect()?;

        let chats = chats::table
            .order((chats::last_updated.desc(), chats::id.desc()))
            .select(Chat::as_select())
            .load(&mut conn)?;

        Ok(chats)
    }

    /// Surviving messages of a chat, oldest first. This is the context handed
    /// to a model gateway when a chat is resumed.
    pub fn get_chat_messages(&self, chat_id: i32) -> Result<Vec<ChatMessage>, StoreError> {
        let mut conn = self.connect()?;

        let rows: Vec<Message> = messages::table
            .filter(messages::chat_id.eq(chat_id))
            .order((messages::timestamp.asc(), messages::id.asc()))
            .select(Message::as_select())
            .load(&mut conn)?;

        rows.into_iter()
            .map(|row| ChatMessage::try_from(row).map_err(StoreError::InvalidRole))
            .collect()
    }

    /// Number of surviving messages in a chat.
    pub fn count_messages(&self, chat_id: i32) -> Result<usize, StoreError> {
        let mut conn = self.connect()?;

        let count: i64 = messages::table
            .filter(messages::chat_id.eq(chat_id))
            .count()
            .get_result(&mut conn)?;

        Ok(count as usize)
    }

    pub fn get_chat(&self, chat_id: i32) -> Result<Option<Chat>, StoreError> {
        let mut conn = self.connect()?;

        let chat = chats::table
            .find(chat_id)
            .select(Chat::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(chat)
    }

    /// Remove a chat together with its messages and attachments.
    pub fn delete_chat(&self, chat_id: i32) -> Result<(), StoreError> {
        let mut conn = self.connect()?;

        conn.immediate_transaction(|conn| {
            diesel::delete(messages::table.filter(messages::chat_id.eq(chat_id))).execute(conn)?;
            diesel::delete(attachments::table.filter(attachments::chat_id.eq(chat_id)))
                .execute(conn)?;
            let removed = diesel::delete(chats::table.find(chat_id)).execute(conn)?;
            debug!("Deleted chat {} ({} row)", chat_id, removed);
            Ok(())
        })
    }

    /// Rename a chat and bump its `last_updated`. Unknown ids are a no-op.
    pub fn update_chat_title(&self, chat_id: i32, new_title: &str) -> Result<(), StoreError> {
        let mut conn = self.connect()?;

        diesel::update(chats::table.find(chat_id))
            .set((chats::title.eq(new_title), chats::last_updated.eq(now())))
            .execute(&mut conn)?;

        Ok(())
    }

    /// Store an uploaded file for a chat and return the attachment id.
    pub fn save_attachment(
        &self,
        chat_id: i32,
        filename: &str,
        content: &[u8],
    ) -> Result<i32, StoreError> {
        let mut conn = self.connect()?;

        let id = diesel::insert_into(attachments::table)
            .values(&NewAttachment {
                chat_id,
                filename,
                content,
                uploaded_at: now(),
            })
            .returning(attachments::id)
            .get_result(&mut conn)?;

        debug!(
            "Saved attachment {} ({}, {} bytes) for chat {}",
            id,
            filename,
            content.len(),
            chat_id
        );
        Ok(id)
    }

    pub fn get_attachment(&self, attachment_id: i32) -> Result<Option<Attachment>, StoreError> {
        let mut conn = self.connect()?;

        let attachment = attachments::table
            .find(attachment_id)
            .select(Attachment::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(attachment)
    }

    /// Attachments of a chat in upload order.
    pub fn get_chat_attachments(&self, chat_id: i32) -> Result<Vec<Attachment>, StoreError> {
        let mut conn = self.connect()?;

        let found = attachments::table
            .filter(attachments::chat_id.eq(chat_id))
            .order((attachments::uploaded_at.asc(), attachments::id.asc()))
            .select(Attachment::as_select())
            .load(&mut conn)?;

        Ok(found)
    }

    /// Delete every chat, message and attachment. Returns the number of chats removed.
    ///
    /// Storage errors propagate like every other operation.
    pub fn clear_all_history(&self) -> Result<usize, StoreError> {
        let mut conn = self.connect()?;

        let removed = conn.immediate_transaction(|conn| {
            diesel::delete(messages::table).execute(conn)?;
            diesel::delete(attachments::table).execute(conn)?;
            diesel::delete(chats::table).execute(conn)
        })?;

        info!("Deleted {} chats and all their messages", removed);
        Ok(removed)
    }
}
