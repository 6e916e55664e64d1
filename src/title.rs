//! # Title heuristic
//!
//! Derives a short display title from the first message of a chat without
//! calling any model. Providers use it when their own title request fails or
//! comes back empty, and the session falls back to it when a provider offers
//! nothing at all.
//!
//! The steps, in order:
//! 1. keep at most the first 100 characters,
//! 2. cut at the first `.`,
//! 3. drop everything from the first whitespace-delimited `or` (any case),
//! 4. split into words (letters and digits, with internal `'` or `-`),
//! 5. drop stop words,
//! 6. join words with single spaces while the result stays within 32 characters.
//!
//! An empty result becomes [`FALLBACK_TITLE`].
//!
//! ```rust
//! use amber_chat::title::generate_title;
//!
//! assert_eq!(generate_title("Explain borrow checking. Keep it short"), "Explain borrow checking");
//! assert_eq!(generate_title(""), "New Chat");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

/// Title used when nothing usable survives the heuristic.
pub const FALLBACK_TITLE: &str = "New Chat";

/// Upper bound on the length of a generated title, in characters.
pub const MAX_TITLE_CHARS: usize = 32;

const SUMMARY_WINDOW_CHARS: usize = 100;

const STOP_WORDS: [&str; 26] = [
    "the", "a", "an", "and", "or", "but", "if", "then", "else", "when", "at", "by", "for", "in",
    "of", "on", "to", "with", "how", "what", "why", "where", "who", "which", "this", "that",
];

static ALTERNATIVE_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+or\s+").expect("alternative clause pattern is valid"));

static WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:['\-][\p{L}\p{N}]+)*").expect("word pattern is valid")
});

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.iter().any(|stop| stop.eq_ignore_ascii_case(word))
}

/// Build a title of at most [`MAX_TITLE_CHARS`] characters from `message`.
///
/// Pure and total: the same input always yields the same title, and every
/// input yields one.
pub fn generate_title(message: &str) -> String {
    let window: String = message.chars().take(SUMMARY_WINDOW_CHARS).collect();
    let sentence = window.split_once('.').map_or(window.as_str(), |(head, _)| head);
    let clause = ALTERNATIVE_CLAUSE.split(sentence).next().unwrap_or_default();

    let mut title = String::new();
    let mut title_chars = 0;
    for word in WORD
        .find_iter(clause)
        .map(|m| m.as_str())
        .filter(|word| !is_stop_word(word))
    {
        let word_chars = word.chars().count();
        let needed = if title.is_empty() { word_chars } else { word_chars + 1 };
        if title_chars + needed > MAX_TITLE_CHARS {
            break;
        }
        if !title.is_empty() {
            title.push(' ');
        }
        title.push_str(word);
        title_chars += needed;
    }

    let title = title.trim();
    if title.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        title.to_string()
    }
}
