//! [`DialogueAssembler`] — builds bounded conversation prompts, obtains
//! completions, and auto-titles conversations.
//!
//! The assembler owns no conversation state of its own: every turn it
//! re-reads the history window from the [`ConversationStore`], so the prompt
//! always reflects what was actually persisted.
//!
//! # Prompt shape
//!
//! ```text
//! [system]  persona instruction (SYSTEM_PROMPT)
//! [system]  optional extra instruction (voice brevity)
//! [user/assistant]  history window, chronological, most recent N
//! [user]    new utterance
//! ```

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::chat::prompt::{build_title_prompt, SYSTEM_PROMPT};
use crate::chat::provider::{ChatBackend, ChatError, ChatMessage, CompletionParams};
use crate::chat::title::{is_generic_title, sanitize_title};
use crate::config::{ChatConfig, HistoryConfig};
use crate::store::{Conversation, ConversationStore, StoreError};

/// Substitute reply used when generation fails.  The turn pipeline persists
/// and synthesizes this text instead of surfacing a hard error to the user.
pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a reply right now.";

// ---------------------------------------------------------------------------
// AssembleError
// ---------------------------------------------------------------------------

/// Errors from assembling or completing a prompt.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

// ---------------------------------------------------------------------------
// ReplyOptions
// ---------------------------------------------------------------------------

/// Per-call knobs for [`DialogueAssembler::reply`].
#[derive(Debug, Clone, Default)]
pub struct ReplyOptions {
    /// Additional system instruction appended after the persona (used by
    /// voice turns to request brevity).
    pub extra_system_prompt: Option<String>,
    /// Override for the configured reply token cap.
    pub max_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// DialogueAssembler
// ---------------------------------------------------------------------------

/// Builds prompts from stored history and requests completions from the
/// configured [`ChatBackend`].
pub struct DialogueAssembler {
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn ConversationStore>,
    chat: ChatConfig,
    history: HistoryConfig,
}

impl DialogueAssembler {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn ConversationStore>,
        chat: ChatConfig,
        history: HistoryConfig,
    ) -> Self {
        Self {
            backend,
            store,
            chat,
            history,
        }
    }

    // -----------------------------------------------------------------------
    // History window
    // -----------------------------------------------------------------------

    /// The bounded, chronologically ordered prompt window for a
    /// conversation: full ascending retrieval, then the most recent `cap`
    /// messages.
    pub async fn history_window(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        cap: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = self
            .store
            .list_messages_ascending(conversation_id, user_id, None)
            .await?;

        let skip = rows.len().saturating_sub(cap);
        Ok(rows[skip..]
            .iter()
            .map(|m| ChatMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect())
    }

    // -----------------------------------------------------------------------
    // Reply generation
    // -----------------------------------------------------------------------

    /// Generate the assistant reply for `user_text` in the given
    /// conversation.  Returns the completion trimmed of surrounding
    /// whitespace, otherwise verbatim.
    ///
    /// Callers treat any error as `GenerationFailed` and substitute
    /// [`FALLBACK_REPLY`] — see the turn service.
    pub async fn reply(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        user_text: &str,
        options: ReplyOptions,
    ) -> Result<String, AssembleError> {
        let history = self
            .history_window(conversation_id, user_id, self.history.reply_limit)
            .await?;

        let mut messages = Vec::with_capacity(history.len() + 3);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        if let Some(extra) = &options.extra_system_prompt {
            messages.push(ChatMessage::system(extra.clone()));
        }
        messages.extend(history);
        messages.push(ChatMessage::user(user_text));

        let params = CompletionParams {
            temperature: self.chat.temperature,
            max_tokens: options.max_tokens.or(self.chat.max_tokens),
        };

        let text = self.backend.complete(&messages, params).await?;
        Ok(text.trim().to_string())
    }

    // -----------------------------------------------------------------------
    // Title generation
    // -----------------------------------------------------------------------

    /// Generate a sanitized 3-6 word title from the conversation's recent
    /// history (smaller window than reply generation, lower temperature).
    pub async fn generate_title(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<String, AssembleError> {
        let history = self
            .history_window(conversation_id, user_id, self.history.title_limit)
            .await?;

        let prompt = build_title_prompt(&history);
        let params = CompletionParams {
            temperature: self.chat.title_temperature,
            max_tokens: Some(self.chat.title_max_tokens),
        };

        let text = self
            .backend
            .complete(&[ChatMessage::user(prompt)], params)
            .await?;

        Ok(sanitize_title(&text))
    }

    /// Rewrite the conversation title if it is still generic.
    ///
    /// Title-generation failures are absorbed: the prior title is retained
    /// and the failure is only logged.  Returns the new title when one was
    /// written.
    pub async fn maybe_retitle(&self, conversation: &Conversation) -> Option<String> {
        if !is_generic_title(&conversation.title) {
            return None;
        }

        let title = match self
            .generate_title(conversation.id, conversation.user_id)
            .await
        {
            Ok(t) => t,
            Err(e) => {
                log::warn!(
                    "title generation failed for {} — keeping {:?}: {e}",
                    conversation.id,
                    conversation.title
                );
                return None;
            }
        };

        match self
            .store
            .update_title(conversation.id, conversation.user_id, &title)
            .await
        {
            Ok(()) => {
                log::debug!("conversation {} retitled to {title:?}", conversation.id);
                Some(title)
            }
            Err(e) => {
                log::warn!("title update failed for {}: {e}", conversation.id);
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
