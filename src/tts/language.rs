//! Lightweight Vietnamese/English detection and voice selection.
//!
//! The heuristic counts Vietnamese diacritic characters: three or more
//! classify the text as Vietnamese outright; below that, a small count in a
//! short text (more than 2% of the characters) still does.  Everything else
//! reads as English.

use crate::config::TtsConfig;

/// Sentinel voice name meaning "pick by detected language".
pub const AUTO_VOICE: &str = "auto";

/// Vietnamese letters that never appear in plain English text.
const VI_DIACRITICS: &str = "ăâđêôơưĂÂĐÊÔƠƯàảãáạằẳẵắặầẩẫấậèẻẽéẹềểễếệìỉĩíịòỏõóọồổỗốộờởỡớợùủũúụừửữứựỳỷỹýỵ";

/// Absolute diacritic count that classifies Vietnamese on its own.
const VI_ABSOLUTE_THRESHOLD: usize = 3;

/// Proportional fallback for shorter texts: diacritics above 2% of the
/// character count classify Vietnamese.
const VI_PROPORTION_THRESHOLD: f32 = 0.02;

// ---------------------------------------------------------------------------
// Lang
// ---------------------------------------------------------------------------

/// Resolved reply language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    /// English — the primary language.
    En,
    /// Vietnamese — the secondary language.
    Vi,
}

impl Lang {
    /// ISO-639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Vi => "vi",
        }
    }

    /// Parse an explicit hint; anything that is not `"vi"` reads as English.
    pub fn from_code(code: &str) -> Self {
        if code.eq_ignore_ascii_case("vi") {
            Lang::Vi
        } else {
            Lang::En
        }
    }
}

// ---------------------------------------------------------------------------
// detect_language
// ---------------------------------------------------------------------------

/// Classify `text` as Vietnamese or English by diacritic density.
///
/// ```rust
/// use tivivu_voice::tts::{detect_language, Lang};
///
/// assert_eq!(detect_language("Hello, how are you?"), Lang::En);
/// assert_eq!(detect_language("Chào bạn, bạn khỏe không?"), Lang::Vi);
/// ```
pub fn detect_language(text: &str) -> Lang {
    if text.is_empty() {
        return Lang::En;
    }

    let vi_count = text.chars().filter(|c| VI_DIACRITICS.contains(*c)).count();
    if vi_count >= VI_ABSOLUTE_THRESHOLD {
        return Lang::Vi;
    }

    let total = text.chars().count();
    if vi_count > 0 && (vi_count as f32 / total as f32) > VI_PROPORTION_THRESHOLD {
        return Lang::Vi;
    }

    Lang::En
}

// ---------------------------------------------------------------------------
// pick_voice
// ---------------------------------------------------------------------------

/// Resolve the synthesis voice.
///
/// An explicit non-[`AUTO_VOICE`] request always wins; otherwise the
/// language-specific configured voice is used, and the configured default
/// covers anything left blank.
pub fn pick_voice(lang: Lang, requested: &str, config: &TtsConfig) -> String {
    if !requested.is_empty() && requested != AUTO_VOICE {
        return requested.to_string();
    }

    let mapped = match lang {
        Lang::Vi => &config.voice_vi,
        Lang::En => &config.voice_en,
    };

    if mapped.is_empty() {
        config.default_voice.clone()
    } else {
        mapped.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- detect_language ---

    #[test]
    fn empty_text_is_english() {
        assert_eq!(detect_language(""), Lang::En);
    }

    #[test]
    fn no_diacritics_is_english() {
        assert_eq!(detect_language("The quick brown fox jumps."), Lang::En);
        // Plain ASCII of any length never classifies Vietnamese.
        let long = "word ".repeat(500);
        assert_eq!(detect_language(&long), Lang::En);
    }

    #[test]
    fn three_or_more_diacritics_is_vietnamese() {
        // Exactly three diacritic characters, buried in long English text —
        // the absolute threshold wins regardless of proportion.
        let mut text = "a".repeat(1000);
        text.push_str("ạặờ");
        assert_eq!(detect_language(&text), Lang::Vi);

        assert_eq!(detect_language("Chào bạn!"), Lang::Vi);
    }

    #[test]
    fn two_diacritics_resolve_by_proportion() {
        // 2 diacritics in 50 chars = 4% > 2% → Vietnamese.
        let mut short = "a".repeat(48);
        short.push_str("ạờ");
        assert_eq!(short.chars().count(), 50);
        assert_eq!(detect_language(&short), Lang::Vi);

        // 2 diacritics in 200 chars = 1% ≤ 2% → English.
        let mut long = "a".repeat(198);
        long.push_str("ạờ");
        assert_eq!(long.chars().count(), 200);
        assert_eq!(detect_language(&long), Lang::En);
    }

    #[test]
    fn one_diacritic_in_tiny_text_is_vietnamese() {
        // 1 of 4 chars = 25%.
        assert_eq!(detect_language("đi xa"), Lang::Vi);
    }

    #[test]
    fn lang_codes() {
        assert_eq!(Lang::En.code(), "en");
        assert_eq!(Lang::Vi.code(), "vi");
        assert_eq!(Lang::from_code("vi"), Lang::Vi);
        assert_eq!(Lang::from_code("VI"), Lang::Vi);
        assert_eq!(Lang::from_code("en"), Lang::En);
        assert_eq!(Lang::from_code("fr"), Lang::En);
    }

    // ---- pick_voice ---

    fn config() -> TtsConfig {
        TtsConfig {
            voice_en: "alloy".into(),
            voice_vi: "coral".into(),
            default_voice: "alloy".into(),
            ..TtsConfig::default()
        }
    }

    #[test]
    fn explicit_request_wins() {
        assert_eq!(pick_voice(Lang::Vi, "onyx", &config()), "onyx");
        assert_eq!(pick_voice(Lang::En, "onyx", &config()), "onyx");
    }

    #[test]
    fn auto_maps_language_to_configured_voice() {
        assert_eq!(pick_voice(Lang::Vi, AUTO_VOICE, &config()), "coral");
        assert_eq!(pick_voice(Lang::En, AUTO_VOICE, &config()), "alloy");
        assert_eq!(pick_voice(Lang::En, "", &config()), "alloy");
    }

    #[test]
    fn blank_mapping_falls_back_to_default() {
        let mut cfg = config();
        cfg.voice_vi = String::new();
        cfg.default_voice = "sage".into();
        assert_eq!(pick_voice(Lang::Vi, AUTO_VOICE, &cfg), "sage");
    }
}
