//! In-memory [`ConversationStore`] implementation.
//!
//! Conversations and messages live in `std::sync::Mutex`-guarded maps —
//! locks are held only for short synchronous sections, never across an
//! `.await` point.  Messages are kept in insertion order per conversation,
//! so creation order stays stable even when two rows are written within
//! the same clock tick.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{Conversation, ConversationStatus, ConversationStore, Message, Role, StoreError};

/// Title given to conversations created without one.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

/// Process-local conversation store.
///
/// # Example
/// ```rust
/// use tivivu_voice::store::{ConversationStore, InMemoryStore, Role};
/// use uuid::Uuid;
///
/// # async fn example() {
/// let store = InMemoryStore::new();
/// let user = Uuid::new_v4();
/// let convo = store.get_or_create_conversation(None, user).await.unwrap();
/// store
///     .create_message(convo.id, Role::User, "Hello!", user)
///     .await
///     .unwrap();
/// # }
/// ```
pub struct InMemoryStore {
    conversations: Mutex<HashMap<Uuid, Conversation>>,
    /// Messages per conversation, in insertion order.
    messages: Mutex<HashMap<Uuid, Vec<Message>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            messages: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a conversation, enforcing owner scoping.
    fn owned_conversation(&self, id: Uuid, user_id: Uuid) -> Result<Conversation, StoreError> {
        let convos = self.conversations.lock().unwrap();
        match convos.get(&id) {
            Some(c) if c.user_id == user_id => Ok(c.clone()),
            _ => Err(StoreError::NotFound),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get_conversation(&self, id: Uuid, user_id: Uuid) -> Result<Conversation, StoreError> {
        self.owned_conversation(id, user_id)
    }

    async fn get_or_create_conversation(
        &self,
        id: Option<Uuid>,
        user_id: Uuid,
    ) -> Result<Conversation, StoreError> {
        if let Some(id) = id {
            return self.owned_conversation(id, user_id);
        }

        let now = Utc::now();
        let convo = Conversation {
            id: Uuid::new_v4(),
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            status: ConversationStatus::Active,
            user_id,
            created_at: now,
            updated_at: now,
        };

        self.conversations
            .lock()
            .unwrap()
            .insert(convo.id, convo.clone());

        log::debug!("store: created conversation {}", convo.id);
        Ok(convo)
    }

    async fn create_message(
        &self,
        conversation_id: Uuid,
        role: Role,
        content: &str,
        user_id: Uuid,
    ) -> Result<Message, StoreError> {
        // Verify ownership before writing.
        self.owned_conversation(conversation_id, user_id)?;

        let message = Message {
            id: Uuid::new_v4(),
            role,
            content: content.to_string(),
            conversation_id,
            user_id,
            created_at: Utc::now(),
        };

        self.messages
            .lock()
            .unwrap()
            .entry(conversation_id)
            .or_default()
            .push(message.clone());

        Ok(message)
    }

    async fn list_messages_ascending(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, StoreError> {
        self.owned_conversation(conversation_id, user_id)?;

        let messages = self.messages.lock().unwrap();
        let rows = messages
            .get(&conversation_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);

        // Rows are kept in insertion order, which is creation-ascending.
        let skip = match limit {
            Some(n) if rows.len() > n => rows.len() - n,
            _ => 0,
        };

        Ok(rows[skip..].to_vec())
    }

    async fn update_title(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        title: &str,
    ) -> Result<(), StoreError> {
        let mut convos = self.conversations.lock().unwrap();
        match convos.get_mut(&conversation_id) {
            Some(c) if c.user_id == user_id => {
                c.title = title.to_string();
                c.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
