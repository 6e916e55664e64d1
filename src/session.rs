//! # Chat session
//!
//! A [`ChatSession`] is the state of one conversation as seen by the UI shell:
//! which chat is open, the in-memory transcript, and which provider/model it
//! talks to. The shell owns it and passes it, the store and a gateway into each
//! turn explicitly; nothing here is global.
//!
//! A turn ([`ChatSession::send`]) runs in this order:
//!
//! 1. on the first turn the chat is created, titled by the gateway (the local
//!    heuristic covers an empty answer),
//! 2. the user message is persisted, then joins the transcript,
//! 3. the gateway answers from the transcript,
//! 4. the answer (or the gateway's error text) is persisted, then joins the transcript.
//!
//! A failed reply does not roll back the saved user message.

use tracing::{debug, info, warn};

use crate::{
    gateway::ModelGateway,
    models::{ChatMessage, Role},
    router::Provider,
    store::{ConversationStore, StoreError},
    title::generate_title,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyInput,

    #[error("no chat is open; send a message first")]
    NoActiveChat,

    #[error("chat {0} no longer exists; the next message starts a new chat")]
    ChatDeleted(i32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One open conversation.
#[derive(Debug, Clone)]
pub struct ChatSession {
    chat_id: Option<i32>,
    transcript: Vec<ChatMessage>,
    pending_attachment: Option<i32>,
    provider: Provider,
    model: String,
}

impl ChatSession {
    /// A fresh conversation; nothing is stored until the first message.
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            chat_id: None,
            transcript: Vec::new(),
            pending_attachment: None,
            provider,
            model: model.into(),
        }
    }

    /// Reopen a stored chat with its surviving messages as the transcript.
    /// Returns `Ok(None)` when the chat does not exist.
    pub fn resume(
        store: &ConversationStore,
        chat_id: i32,
        provider: Provider,
        model: impl Into<String>,
    ) -> Result<Option<Self>, SessionError> {
        if store.get_chat(chat_id)?.is_none() {
            return Ok(None);
        }

        let transcript = store.get_chat_messages(chat_id)?;
        info!("Resumed chat {} with {} messages", chat_id, transcript.len());

        Ok(Some(Self {
            chat_id: Some(chat_id),
            transcript,
            pending_attachment: None,
            provider,
            model: model.into(),
        }))
    }

    pub fn chat_id(&self) -> Option<i32> {
        self.chat_id
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The `provider/model` identifier stored with new chats.
    pub fn model_id(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }

    /// Forget the open chat so the next message starts a new one.
    pub fn reset(&mut self) {
        self.chat_id = None;
        self.transcript.clear();
        self.pending_attachment = None;
    }

    /// Store a file in the open chat; the next user message references it.
    pub fn attach(
        &mut self,
        store: &ConversationStore,
        filename: &str,
        content: &[u8],
    ) -> Result<i32, SessionError> {
        let chat_id = self.chat_id.ok_or(SessionError::NoActiveChat)?;
        let attachment_id = store.save_attachment(chat_id, filename, content)?;
        self.pending_attachment = Some(attachment_id);
        Ok(attachment_id)
    }

    /// Run one turn of the conversation and return the assistant's reply.
    ///
    /// A message joins the transcript only once it is stored, so a failed
    /// save leaves the session as it was. If the open chat has been deleted
    /// meanwhile, the session is reset and the next message starts a new chat.
    pub async fn send<G: ModelGateway>(
        &mut self,
        store: &ConversationStore,
        gateway: &G,
        input: &str,
    ) -> Result<String, SessionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let chat_id = match self.chat_id {
            Some(id) => id,
            None => {
                let title = gateway.get_title_from_first_message(input).await;
                let title = if title.trim().is_empty() {
                    generate_title(input)
                } else {
                    title
                };
                let id = store.create_chat(&title, &self.model_id())?;
                info!("Started chat {} ({:?})", id, title);
                self.chat_id = Some(id);
                id
            }
        };

        let attachment = self.pending_attachment.take();
        if let Err(err) = store.save_message(chat_id, Role::User, input, attachment) {
            self.pending_attachment = attachment;
            return Err(self.save_failed(store, chat_id, err));
        }
        self.transcript.push(ChatMessage::user(input));

        debug!("Sending {} messages for chat {}", self.transcript.len(), chat_id);
        let reply = gateway.generate_response(&self.transcript).await;

        if let Err(err) = store.save_message(chat_id, Role::Assistant, &reply, None) {
            return Err(self.save_failed(store, chat_id, err));
        }
        self.transcript.push(ChatMessage::assistant(reply.clone()));
        self.trim_to(store.max_history_length());

        Ok(reply)
    }

    /// Classify a failed save, dropping the chat binding when the chat is gone.
    fn save_failed(
        &mut self,
        store: &ConversationStore,
        chat_id: i32,
        err: StoreError,
    ) -> SessionError {
        match store.get_chat(chat_id) {
            Ok(None) => {
                warn!("Chat {} no longer exists, starting over", chat_id);
                self.reset();
                SessionError::ChatDeleted(chat_id)
            }
            _ => SessionError::Store(err),
        }
    }

    /// Keep the in-memory transcript in step with what the store retains.
    fn trim_to(&mut self, max_history_length: usize) {
        if self.transcript.len() > max_history_length {
            let excess = self.transcript.len() - max_history_length;
            self.transcript.drain(..excess);
        }
    }
}
