//! Text normalization and fuzzy matching for guesses
//!
//! Guess targets are compared against free-text chat messages. A guess is
//! accepted only when it is a near-exact match, tolerating small typos,
//! punctuation and missing diacritics.

use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum similarity (exclusive) for a guess to count as a match
pub const MATCH_THRESHOLD: f64 = 0.95;

static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)").unwrap());
static HYPHEN_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r" - .*").unwrap());

/// Remove "(...)" asides and any " - ..." suffix from a track title.
///
/// `"Hello (Live Version)"` becomes `"Hello"`, `"Yesterday - Remastered 2009"`
/// becomes `"Yesterday"`.
pub fn strip_decoration(text: &str) -> String {
    let without_parens = PARENTHESIZED.replace_all(text, "");
    let without_suffix = HYPHEN_SUFFIX.replace(&without_parens, "");
    without_suffix.trim().to_string()
}

/// Title used as the song-title answer.
///
/// Falls back to the raw title, minus its parentheses, when the whole title
/// is decoration such as `"(Intro)"`.
pub fn clean_title(title: &str) -> String {
    let stripped = strip_decoration(title);
    if !stripped.is_empty() {
        return stripped;
    }

    let unwrapped = title.replace(['(', ')'], "");
    let unwrapped = unwrapped.trim();
    if unwrapped.is_empty() {
        title.trim().to_string()
    } else {
        unwrapped.to_string()
    }
}

/// Transliterate accented and non-ASCII letters to their closest ASCII form.
///
/// Only used for matching; displayed names keep their original spelling.
pub fn fold_diacritics(text: &str) -> String {
    deunicode::deunicode(text)
}

/// Similarity ratio in `[0, 1]` between two strings: one minus the
/// Damerau-Levenshtein distance over the longer length.
///
/// No prefix bonus, so a guess missing whole words stays well below
/// [`MATCH_THRESHOLD`] however long the shared start is.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_damerau_levenshtein(a, b)
}

/// Normalize an incoming chat message into a guess
pub fn normalize_guess(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Best similarity of `guess` against a canonical name, or `None` if neither
/// the lowercased nor the diacritic-folded form clears [`MATCH_THRESHOLD`].
///
/// `guess` must already be normalized with [`normalize_guess`].
pub fn match_score(guess: &str, canonical: &str) -> Option<f64> {
    let lowered = canonical.to_lowercase();
    let folded = fold_diacritics(&lowered);

    let score = similarity(guess, &lowered).max(similarity(guess, &folded));
    (score > MATCH_THRESHOLD).then_some(score)
}
