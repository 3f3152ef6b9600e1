//! Dialogue assembly — history windows, provider backends, titling.
//!
//! This module provides:
//! * [`ChatBackend`] — async trait implemented by all completion backends.
//! * [`OpenAiBackend`] / [`OpenRouterBackend`] — the two provider strategies.
//! * [`build_backend`] — one-time provider selection from configuration.
//! * [`DialogueAssembler`] — prompt construction, reply generation and
//!   conversation auto-titling over a [`ConversationStore`].
//! * [`sanitize_title`] / [`is_generic_title`] — title hygiene helpers.
//! * [`ChatError`] — error variants for completion calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tivivu_voice::chat::{build_backend, DialogueAssembler, ReplyOptions};
//! use tivivu_voice::config::AppConfig;
//! use tivivu_voice::store::InMemoryStore;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let backend = build_backend(&config.chat);
//!     let store = Arc::new(InMemoryStore::new());
//!     let assembler = DialogueAssembler::new(backend, store.clone(), config.chat, config.history);
//!
//!     let user = Uuid::new_v4();
//!     let convo = store.get_or_create_conversation(None, user).await.unwrap();
//!     let reply = assembler
//!         .reply(convo.id, user, "How do I use the present perfect?", ReplyOptions::default())
//!         .await;
//!     println!("{reply:?}");
//! }
//! # use tivivu_voice::store::ConversationStore;
//! ```

pub mod assembler;
pub mod prompt;
pub mod provider;
pub mod title;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use assembler::{AssembleError, DialogueAssembler, ReplyOptions, FALLBACK_REPLY};
pub use prompt::{build_title_prompt, SYSTEM_PROMPT, VOICE_STYLE_PROMPT};
pub use provider::{
    build_backend, ChatBackend, ChatError, ChatMessage, CompletionParams, OpenAiBackend,
    OpenRouterBackend,
};
pub use title::{is_generic_title, sanitize_title, TITLE_MAX_CHARS};
