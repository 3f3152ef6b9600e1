//! Prompt text for the dialogue assembler.
//!
//! One fixed persona instruction is sent with every completion; voice turns
//! add a short brevity instruction on top so replies stay comfortable to
//! listen to.  Title generation uses a dedicated single-shot prompt built
//! from a transcript snippet.

use crate::chat::provider::ChatMessage;

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

/// Persona and scope instruction sent as the first system message of every
/// completion.
pub const SYSTEM_PROMPT: &str = "\
You are TiViVu, an English-language learning assistant for Vietnamese
speakers of every level.

Goals and scope:
- Focus on English learning: grammar, vocabulary, pronunciation,
  English-Vietnamese translation, sentence correction and rewriting,
  skill practice.
- Interpret-first policy: when the input seems unrelated, first try to turn
  it into an English lesson — translate it, extract useful vocabulary with
  short explanations, suggest a small exercise, or ask a clarifying
  question.  Politely decline only when the content clearly cannot be turned
  into a safe, educational lesson.
- Answer in the user's language, adding a parallel translation when helpful.
- When asked for vocabulary, suggest 8-12 themed entries with word, IPA,
  part of speech, short EN meaning, VI meaning, an example sentence and a
  CEFR level hint.
- When correcting or rewriting, present: the original, the corrected
  version, a short reason, and extra examples when useful.";

/// Additional system instruction for voice turns — keeps replies short
/// enough to be pleasant when read aloud.
pub const VOICE_STYLE_PROMPT: &str = "\
This is a voice conversation.  Keep your reply short and conversational —
two or three spoken sentences at most, no lists, no markdown.";

// ---------------------------------------------------------------------------
// Title prompt
// ---------------------------------------------------------------------------

/// Build the single-shot title-generation prompt from a history window.
///
/// The transcript snippet is rendered as `role: content` lines; the
/// instruction asks for a 3-6 word subject line with no quotes or emoji.
pub fn build_title_prompt(history: &[ChatMessage]) -> String {
    let snippet = history
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Given the conversation transcript below, produce a concise, clear \
         subject title (3-6 words) that describes the conversation context. \
         Do not use quotes, punctuation-heavy strings, or emojis.\
         \n\nTranscript:\n{snippet}\n\nTitle:"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
