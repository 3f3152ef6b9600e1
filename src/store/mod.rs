//! Conversation storage — the persistence boundary of the voice pipeline.
//!
//! [`ConversationStore`] is the object-safe interface the rest of the crate
//! talks to.  Every operation is scoped to the owning user; a lookup that
//! misses (wrong id or wrong owner) returns [`StoreError::NotFound`] instead
//! of leaking another user's rows.
//!
//! [`InMemoryStore`] is the bundled implementation.  A database-backed
//! implementation can replace it without touching the turn service or the
//! dialogue assembler.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryStore;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Author of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The model side of the conversation.
    Assistant,
}

impl Role {
    /// Wire-format name used in chat-completions payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

// ---------------------------------------------------------------------------
// ConversationStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationStatus {
    Active,
    Archived,
}

// ---------------------------------------------------------------------------
// Conversation / Message
// ---------------------------------------------------------------------------

/// One conversation thread owned by a single user.
///
/// The title starts as a generic placeholder and stays eligible for
/// automatic rewriting until it is replaced with a real one
/// (see [`crate::chat::is_generic_title`]).
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub status: ConversationStatus,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable message row.
///
/// Messages are never edited or reordered after creation; listing order is
/// creation-ascending.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors surfaced by a [`ConversationStore`].
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The conversation does not exist, or belongs to a different user.
    #[error("Conversation not found")]
    NotFound,

    /// Backend-specific failure (I/O, connection, …).
    #[error("Store operation failed: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// ConversationStore trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to conversation persistence.
///
/// Implementations must be `Send + Sync` so they can be shared behind an
/// `Arc<dyn ConversationStore>` across the turn service and the assembler.
///
/// # Owner scoping
///
/// Every method takes the acting `user_id` and must filter by it.  An id
/// that exists but belongs to another user is indistinguishable from a
/// missing id ([`StoreError::NotFound`]).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch an existing conversation by id.
    async fn get_conversation(&self, id: Uuid, user_id: Uuid) -> Result<Conversation, StoreError>;

    /// Fetch the conversation with `id` when given, or create a fresh one
    /// (generic title, `Active` status) when `id` is `None`.
    async fn get_or_create_conversation(
        &self,
        id: Option<Uuid>,
        user_id: Uuid,
    ) -> Result<Conversation, StoreError>;

    /// Append a message to a conversation.  The stored row carries a
    /// server-assigned id and creation timestamp.
    async fn create_message(
        &self,
        conversation_id: Uuid,
        role: Role,
        content: &str,
        user_id: Uuid,
    ) -> Result<Message, StoreError>;

    /// List a conversation's messages in creation-ascending order.
    ///
    /// When `limit` is given, only the most recent `limit` messages are
    /// returned — still in ascending order.
    async fn list_messages_ascending(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, StoreError>;

    /// Replace a conversation's title and bump its `updated_at`.
    async fn update_title(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        title: &str,
    ) -> Result<(), StoreError>;
}

// Compile-time assertion: the trait must stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ConversationStore>) {}
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
