//! [`VoiceTurnService`] — drives one voice turn through all server stages.
//!
//! # Stage order
//!
//! ```text
//! decode base64 ──▶ transcribe ──▶ get/create conversation
//!   ──▶ persist user message          (always before reply generation)
//!   ──▶ generate reply                (failure → fixed fallback text)
//!   ──▶ persist assistant message     (always before synthesis)
//!   ──▶ retitle while generic         (failure absorbed)
//!   ──▶ synthesize unless skip_tts    (failure → degraded text payload)
//! ```
//!
//! Stages run strictly sequentially — each one's output is the next one's
//! input.  Transcription failure aborts the turn before anything is
//! persisted.  Because the user message is written before reply generation
//! and the assistant message before synthesis, a crash or cancellation
//! mid-turn leaves at most a dangling unreplied user message — never an
//! assistant message without its preceding user message.  Cancelling the
//! turn (dropping the future) stops later stages but does not delete
//! messages already persisted.
//!
//! Concurrent turns on the same conversation are not serialized; two
//! interleaved replies are an accepted limitation of the store contract.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;
use uuid::Uuid;

use crate::chat::{DialogueAssembler, ReplyOptions, FALLBACK_REPLY, VOICE_STYLE_PROMPT};
use crate::store::{ConversationStore, Role, StoreError};
use crate::stt::{SttError, Transcriber};
use crate::tts::{SynthesisRequest, SynthesisResult, Synthesizer};

// ---------------------------------------------------------------------------
// TurnError
// ---------------------------------------------------------------------------

/// Fatal errors for a voice turn.
///
/// Reply-generation and synthesis failures never appear here — they are
/// recovered inside the pipeline (fallback text, degraded payload).
#[derive(Debug, Error)]
pub enum TurnError {
    /// A required request field is missing or malformed.
    #[error("Invalid voice turn request: {0}")]
    Validation(String),

    /// The transcription gateway failed; the turn is aborted with nothing
    /// persisted.
    #[error("Transcription failed: {0}")]
    Transcription(#[from] SttError),

    /// Conversation lookup failed (missing id or foreign owner).
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Request / response shapes
// ---------------------------------------------------------------------------

/// Input for one complete voice turn.
#[derive(Debug, Clone)]
pub struct VoiceTurnRequest {
    /// Owner of the conversation; every store operation is scoped to it.
    pub user_id: Uuid,
    /// Base64-encoded audio clip.
    pub audio_base64: String,
    /// Clip filename, used for container-type detection on upload.
    pub filename: String,
    /// Language hint for transcription (`"auto"` to let the provider detect).
    pub language: String,
    /// Requested synthesis voice (`"auto"` to pick by detected language).
    pub voice: String,
    /// Requested synthesis format (empty for the configured default).
    pub format: String,
    /// Existing conversation to continue, or `None` to start a new one.
    pub conversation_id: Option<Uuid>,
    /// Skip synthesis entirely (the client fetches audio separately).
    pub skip_tts: bool,
}

/// Synthesized reply payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnAudio {
    pub audio_base64: String,
    /// `audio/*` for real audio; `text/plain` for the degraded fallback.
    pub content_type: String,
}

/// Output of one complete voice turn.
#[derive(Debug, Clone)]
pub struct VoiceTurnResponse {
    pub transcript: String,
    pub reply_text: String,
    pub conversation_id: Uuid,
    /// `None` when `skip_tts` was requested.
    pub audio: Option<TurnAudio>,
}

// ---------------------------------------------------------------------------
// VoiceTurnService
// ---------------------------------------------------------------------------

/// Sequences one uploaded clip through transcription, persistence, reply
/// generation and synthesis.
pub struct VoiceTurnService {
    transcriber: Arc<dyn Transcriber>,
    assembler: Arc<DialogueAssembler>,
    synthesizer: Arc<dyn Synthesizer>,
    store: Arc<dyn ConversationStore>,
}

impl VoiceTurnService {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        assembler: Arc<DialogueAssembler>,
        synthesizer: Arc<dyn Synthesizer>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            transcriber,
            assembler,
            synthesizer,
            store,
        }
    }

    /// Run one complete voice turn.
    pub async fn run(&self, request: VoiceTurnRequest) -> Result<VoiceTurnResponse, TurnError> {
        // ── 1. Validate and decode the clip ──────────────────────────────
        if request.audio_base64.is_empty() {
            return Err(TurnError::Validation("missing audio payload".into()));
        }
        let audio = BASE64
            .decode(&request.audio_base64)
            .map_err(|e| TurnError::Validation(format!("audio is not valid base64: {e}")))?;

        // ── 2. Transcribe — fatal on failure, nothing persisted yet ──────
        let transcript = self
            .transcriber
            .transcribe(&audio, &request.filename, &request.language)
            .await?;
        log::info!("turn: transcript ({} chars)", transcript.len());

        // ── 3. Resolve the conversation ──────────────────────────────────
        let conversation = self
            .store
            .get_or_create_conversation(request.conversation_id, request.user_id)
            .await?;

        // ── 4. Persist the user message before generating a reply ────────
        self.store
            .create_message(conversation.id, Role::User, &transcript, request.user_id)
            .await?;

        // ── 5. Generate the reply — recovered via fixed fallback text ────
        let options = ReplyOptions {
            extra_system_prompt: Some(VOICE_STYLE_PROMPT.to_string()),
            max_tokens: None,
        };
        let reply_text = match self
            .assembler
            .reply(conversation.id, request.user_id, &transcript, options)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                log::warn!("turn: reply generation failed, using fallback: {e}");
                FALLBACK_REPLY.to_string()
            }
        };

        // ── 6. Persist the assistant message before synthesis ────────────
        self.store
            .create_message(conversation.id, Role::Assistant, &reply_text, request.user_id)
            .await?;

        // ── 7. Retitle while the title is still generic ──────────────────
        self.assembler.maybe_retitle(&conversation).await;

        // ── 8. Synthesize unless the client asked to skip ────────────────
        let audio = if request.skip_tts {
            None
        } else {
            Some(self.synthesize_reply(&request, &reply_text).await)
        };

        Ok(VoiceTurnResponse {
            transcript,
            reply_text,
            conversation_id: conversation.id,
            audio,
        })
    }

    /// Voice the reply; provider failure degrades to the text payload
    /// instead of failing the turn.
    async fn synthesize_reply(&self, request: &VoiceTurnRequest, reply_text: &str) -> TurnAudio {
        let synthesis = SynthesisRequest {
            text: reply_text.to_string(),
            voice: request.voice.clone(),
            format: request.format.clone(),
            language: request.language.clone(),
        };

        let result = match self.synthesizer.synthesize(&synthesis).await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("turn: synthesis failed, degrading to text: {e}");
                SynthesisResult::degraded(reply_text)
            }
        };

        TurnAudio {
            audio_base64: BASE64.encode(result.bytes()),
            content_type: result.content_type().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::provider::{ChatBackend, ChatError, ChatMessage, CompletionParams};
    use crate::chat::is_generic_title;
    use crate::config::{ChatConfig, HistoryConfig};
    use crate::store::InMemoryStore;
    use crate::stt::MockTranscriber;
    use crate::tts::TtsError;
    use async_trait::async_trait;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Chat backend that answers replies and title prompts with fixed text.
    struct ScriptedBackend {
        reply: Result<String, ()>,
        title: Result<String, ()>,
    }

    impl ScriptedBackend {
        fn ok(reply: &str, title: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                title: Ok(title.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                title: Err(()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _params: CompletionParams,
        ) -> Result<String, ChatError> {
            // Title prompts are a single user message; replies start with
            // the persona system message.
            let is_title = messages.len() == 1 && messages[0].role == "user";
            let scripted = if is_title { &self.title } else { &self.reply };
            match scripted {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(ChatError::Timeout),
            }
        }
    }

    /// Synthesizer double: real audio, degraded text, or hard failure.
    enum MockSynth {
        Audio,
        Degraded,
        Failing,
    }

    #[async_trait]
    impl Synthesizer for MockSynth {
        async fn synthesize(
            &self,
            request: &SynthesisRequest,
        ) -> Result<SynthesisResult, TtsError> {
            match self {
                MockSynth::Audio => Ok(SynthesisResult::Audio {
                    bytes: vec![0xFF, 0xF3, 0x01],
                    content_type: "audio/mp3".into(),
                }),
                MockSynth::Degraded => Ok(SynthesisResult::degraded(&request.text)),
                MockSynth::Failing => Err(TtsError::Provider {
                    status: 503,
                    message: "no capacity".into(),
                }),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn make_service(
        transcriber: MockTranscriber,
        backend: ScriptedBackend,
        synth: MockSynth,
    ) -> (VoiceTurnService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let assembler = Arc::new(DialogueAssembler::new(
            Arc::new(backend),
            store.clone(),
            ChatConfig::default(),
            HistoryConfig::default(),
        ));
        let service = VoiceTurnService::new(
            Arc::new(transcriber),
            assembler,
            Arc::new(synth),
            store.clone(),
        );
        (service, store)
    }

    fn make_request(user_id: Uuid) -> VoiceTurnRequest {
        VoiceTurnRequest {
            user_id,
            audio_base64: BASE64.encode(b"fake-wav-bytes"),
            filename: "clip.wav".into(),
            language: "auto".into(),
            voice: "auto".into(),
            format: "mp3".into(),
            conversation_id: None,
            skip_tts: false,
        }
    }

    // -----------------------------------------------------------------------
    // Happy path
    // -----------------------------------------------------------------------

    /// Empty conversation + "Hello!" → user message, assistant message,
    /// generic title replaced.
    #[tokio::test]
    async fn full_turn_persists_pair_and_retitles() {
        let (service, store) = make_service(
            MockTranscriber::ok("Hello!"),
            ScriptedBackend::ok("Hi! How can I help you practice today?", "Greeting Practice"),
            MockSynth::Audio,
        );
        let user = Uuid::new_v4();

        let response = service.run(make_request(user)).await.unwrap();

        assert_eq!(response.transcript, "Hello!");
        assert_eq!(response.reply_text, "Hi! How can I help you practice today?");

        let rows = store
            .list_messages_ascending(response.conversation_id, user, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].role, Role::User);
        assert_eq!(rows[0].content, "Hello!");
        assert_eq!(rows[1].role, Role::Assistant);
        // User message strictly precedes the paired assistant message.
        assert!(rows[0].created_at <= rows[1].created_at);

        let convo = store
            .get_conversation(response.conversation_id, user)
            .await
            .unwrap();
        assert_eq!(convo.title, "Greeting Practice");
        assert!(!is_generic_title(&convo.title));
        assert!(convo.title.chars().count() <= 60);

        let audio = response.audio.unwrap();
        assert_eq!(audio.content_type, "audio/mp3");
        assert_eq!(BASE64.decode(audio.audio_base64).unwrap(), vec![0xFF, 0xF3, 0x01]);
    }

    #[tokio::test]
    async fn turn_continues_existing_conversation() {
        let (service, store) = make_service(
            MockTranscriber::ok("Second turn"),
            ScriptedBackend::ok("reply", "Some Title"),
            MockSynth::Audio,
        );
        let user = Uuid::new_v4();
        let convo = store.get_or_create_conversation(None, user).await.unwrap();

        let mut request = make_request(user);
        request.conversation_id = Some(convo.id);

        let response = service.run(request).await.unwrap();
        assert_eq!(response.conversation_id, convo.id);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn missing_audio_is_a_validation_error() {
        let (service, _store) = make_service(
            MockTranscriber::ok("unused"),
            ScriptedBackend::ok("unused", "unused"),
            MockSynth::Audio,
        );
        let mut request = make_request(Uuid::new_v4());
        request.audio_base64 = String::new();

        let err = service.run(request).await.unwrap_err();
        assert!(matches!(err, TurnError::Validation(_)));
    }

    #[tokio::test]
    async fn malformed_base64_is_a_validation_error() {
        let (service, _store) = make_service(
            MockTranscriber::ok("unused"),
            ScriptedBackend::ok("unused", "unused"),
            MockSynth::Audio,
        );
        let mut request = make_request(Uuid::new_v4());
        request.audio_base64 = "!!!not-base64!!!".into();

        let err = service.run(request).await.unwrap_err();
        assert!(matches!(err, TurnError::Validation(_)));
    }

    #[tokio::test]
    async fn foreign_conversation_id_is_not_found() {
        let (service, store) = make_service(
            MockTranscriber::ok("hello"),
            ScriptedBackend::ok("reply", "title"),
            MockSynth::Audio,
        );
        let owner = Uuid::new_v4();
        let convo = store.get_or_create_conversation(None, owner).await.unwrap();

        let mut request = make_request(Uuid::new_v4()); // different user
        request.conversation_id = Some(convo.id);

        let err = service.run(request).await.unwrap_err();
        assert!(matches!(err, TurnError::Store(StoreError::NotFound)));
    }

    // -----------------------------------------------------------------------
    // Transcription failure
    // -----------------------------------------------------------------------

    /// Transcription failure aborts the turn with nothing persisted.
    #[tokio::test]
    async fn transcription_failure_persists_nothing() {
        let (service, store) = make_service(
            MockTranscriber::failing("audio service down"),
            ScriptedBackend::ok("unused", "unused"),
            MockSynth::Audio,
        );
        let user = Uuid::new_v4();

        let err = service.run(make_request(user)).await.unwrap_err();
        assert!(matches!(err, TurnError::Transcription(_)));

        // No conversation was created either.
        let convo = store.get_or_create_conversation(None, user).await.unwrap();
        let rows = store
            .list_messages_ascending(convo.id, user, None)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    // -----------------------------------------------------------------------
    // Generation failure — fallback reply
    // -----------------------------------------------------------------------

    /// A failed reply generation still persists a pair and synthesizes the
    /// fallback text.
    #[tokio::test]
    async fn generation_failure_substitutes_fallback_and_continues() {
        let (service, store) = make_service(
            MockTranscriber::ok("Hello!"),
            ScriptedBackend::failing(),
            MockSynth::Audio,
        );
        let user = Uuid::new_v4();

        let response = service.run(make_request(user)).await.unwrap();

        assert_eq!(response.reply_text, FALLBACK_REPLY);
        assert!(response.audio.unwrap().content_type.starts_with("audio/"));

        let rows = store
            .list_messages_ascending(response.conversation_id, user, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].content, FALLBACK_REPLY);

        // Title generation also failed — the generic title is retained.
        let convo = store
            .get_conversation(response.conversation_id, user)
            .await
            .unwrap();
        assert!(is_generic_title(&convo.title));
    }

    // -----------------------------------------------------------------------
    // Degraded synthesis
    // -----------------------------------------------------------------------

    /// Audio capability unavailable → transcript and reply still returned,
    /// payload typed text/plain.
    #[tokio::test]
    async fn degraded_synthesis_returns_text_payload() {
        let (service, _store) = make_service(
            MockTranscriber::ok("Hello!"),
            ScriptedBackend::ok("A spoken answer.", "Some Title"),
            MockSynth::Degraded,
        );

        let response = service.run(make_request(Uuid::new_v4())).await.unwrap();

        assert_eq!(response.transcript, "Hello!");
        assert_eq!(response.reply_text, "A spoken answer.");

        let audio = response.audio.unwrap();
        assert_eq!(audio.content_type, "text/plain");
        assert_eq!(
            BASE64.decode(audio.audio_base64).unwrap(),
            b"A spoken answer."
        );
    }

    /// A hard synthesis failure degrades instead of failing the turn.
    #[tokio::test]
    async fn synthesis_failure_degrades_to_text() {
        let (service, store) = make_service(
            MockTranscriber::ok("Hello!"),
            ScriptedBackend::ok("A spoken answer.", "Some Title"),
            MockSynth::Failing,
        );
        let user = Uuid::new_v4();

        let response = service.run(make_request(user)).await.unwrap();

        let audio = response.audio.unwrap();
        assert_eq!(audio.content_type, "text/plain");

        // Both messages were persisted before synthesis ran.
        let rows = store
            .list_messages_ascending(response.conversation_id, user, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    // -----------------------------------------------------------------------
    // skip_tts
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn skip_tts_omits_audio() {
        let (service, _store) = make_service(
            MockTranscriber::ok("Hello!"),
            ScriptedBackend::ok("reply", "title"),
            MockSynth::Audio,
        );
        let mut request = make_request(Uuid::new_v4());
        request.skip_tts = true;

        let response = service.run(request).await.unwrap();
        assert!(response.audio.is_none());
    }

    // -----------------------------------------------------------------------
    // Title retention
    // -----------------------------------------------------------------------

    /// A hand-picked title is never overwritten by the auto-titler.
    #[tokio::test]
    async fn non_generic_title_is_retained() {
        let (service, store) = make_service(
            MockTranscriber::ok("Hello!"),
            ScriptedBackend::ok("reply", "Auto Title"),
            MockSynth::Audio,
        );
        let user = Uuid::new_v4();
        let convo = store.get_or_create_conversation(None, user).await.unwrap();
        store
            .update_title(convo.id, user, "My Lesson Plan")
            .await
            .unwrap();

        let mut request = make_request(user);
        request.conversation_id = Some(convo.id);
        service.run(request).await.unwrap();

        let fetched = store.get_conversation(convo.id, user).await.unwrap();
        assert_eq!(fetched.title, "My Lesson Plan");
    }
}
