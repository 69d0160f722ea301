//! OCR text normalization
//!
//! Cleans raw engine output before parsing. Stages always run in this order:
//!
//! 1. collapse whitespace runs and trim
//! 2. contextual glyph fixes (`I`/`l` → `1`, `O` → `0` next to digits), linear time
//! 3. canonical `K/D/A` triplets without inner spaces
//! 4. profile pass (CJK/Latin token separation)
//!
//! `normalize` is idempotent; some hosts normalize twice.

use regex::Regex;
use std::sync::LazyLock;

use crate::vision::profile::{GameProfile, Script};

/// `K / D / A` with arbitrary spacing around the slashes
static KDA_SPACED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)\s*/\s*([0-9]+)\s*/\s*([0-9]+)").unwrap());

/// A run of kanji/kana directly or loosely followed by an ASCII alphanumeric
static CJK_THEN_ALNUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\x{4E00}-\x{9FFF}\x{3040}-\x{309F}\x{30A0}-\x{30FF}]+)\s*([A-Za-z0-9])").unwrap()
});

/// A letter glued to a digit
static LETTER_THEN_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z])([0-9])").unwrap());

/// Normalize raw OCR text for the given profile
pub fn normalize(raw: &str, profile: GameProfile) -> String {
    let text = collapse_whitespace(raw);
    let text = disambiguate_glyphs(&text);
    let text = canonicalize_kda(&text);
    apply_profile_rules(&text, profile)
}

/// Collapse every whitespace run to a single space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rewrite confusable glyphs next to digits.
///
/// `I` and `l` become `1` when either neighbor is a digit. A rewritten glyph
/// is a digit for its own neighbors, so a whole run of `I`/`l` touching a digit
/// turns into ones ("Il5" → "115"). `O` becomes `0` only with digits on both
/// sides, after the runs are resolved. Result is a fixpoint of these rules.
pub fn disambiguate_glyphs(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    let is_one_like = |c: char| c == 'I' || c == 'l';

    // Runs touching a digit on their left
    for i in 1..chars.len() {
        if is_one_like(chars[i]) && chars[i - 1].is_ascii_digit() {
            chars[i] = '1';
        }
    }

    // Runs touching a digit on their right
    for i in (0..chars.len().saturating_sub(1)).rev() {
        if is_one_like(chars[i]) && chars[i + 1].is_ascii_digit() {
            chars[i] = '1';
        }
    }

    // O needs both neighbors settled, so it goes last
    for i in 1..chars.len().saturating_sub(1) {
        if chars[i] == 'O' && chars[i - 1].is_ascii_digit() && chars[i + 1].is_ascii_digit() {
            chars[i] = '0';
        }
    }

    chars.into_iter().collect()
}

/// Remove whitespace around the slashes of `K/D/A` triplets
pub fn canonicalize_kda(text: &str) -> String {
    KDA_SPACED.replace_all(text, "${1}/${2}/${3}").into_owned()
}

/// Token separation depending on the title's script
pub fn apply_profile_rules(text: &str, profile: GameProfile) -> String {
    match profile.script() {
        Script::Cjk => CJK_THEN_ALNUM.replace_all(text, "${1} ${2}").into_owned(),
        Script::Latin => LETTER_THEN_DIGIT.replace_all(text, "${1} ${2}").into_owned(),
        Script::Unknown => text.to_string(),
    }
}
