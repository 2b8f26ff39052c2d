//! Text normalization and per-comment lexical measures.
//!
//! `clean` is the single normalization applied before vectorizing; every
//! lexical feature (lengths, TTR, readability, n-grams) works on its output.

use ahash::AHashSet;
use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

const ZWJ: char = '\u{200d}';
const SKIN_TONES: std::ops::RangeInclusive<char> = '\u{1f3fb}'..='\u{1f3ff}';

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid regex"))
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("valid regex"))
}

/// Drop every character that is neither a word character nor whitespace, then lowercase.
/// Idempotent: `clean(&clean(x)) == clean(x)`.
pub fn clean(text: &str) -> String {
    non_word_re().replace_all(text, "").to_lowercase()
}

/// Vectorizer tokens: runs of two or more word characters.
pub fn tokens(text: &str) -> impl Iterator<Item = &str> {
    token_re().find_iter(text).map(|m| m.as_str())
}

/// Set of word n-grams (tokens as in [`tokens`], joined by a single space).
pub fn ngrams(text: &str, n: usize) -> AHashSet<String> {
    let toks: Vec<&str> = tokens(text).collect();
    if n == 0 || toks.len() < n {
        return AHashSet::new();
    }
    toks.windows(n).map(|w| w.join(" ")).collect()
}

/// Unique words over total words; 0 when there are no words.
pub fn type_token_ratio(text: &str) -> f64 {
    let words: Vec<&str> = text.unicode_words().collect();
    if words.is_empty() {
        return 0.0;
    }
    let types: AHashSet<&str> = words.iter().copied().collect();
    types.len() as f64 / words.len() as f64
}

// ----------------------------- Readability ------------------------------------

/// Flesch–Kincaid grade level, rounded to one decimal:
/// `0.39 * words/sentences + 11.8 * syllables/words - 15.59`.
/// With no words the syllable term is 0, giving the formula's floor of -15.6.
pub fn flesch_kincaid_grade(text: &str) -> f64 {
    let words: Vec<&str> = text.unicode_words().collect();
    let sentences = sentence_count(text) as f64;
    let n_words = words.len() as f64;
    let syllables: usize = words.iter().map(|w| syllable_count(w)).sum();

    let per_sentence = n_words / sentences;
    let per_word = if words.is_empty() { 0.0 } else { syllables as f64 / n_words };
    let grade = 0.39 * per_sentence + 11.8 * per_word - 15.59;
    (grade * 10.0).round() / 10.0
}

/// Sentences split on terminal punctuation; fragments of two words or fewer are
/// not counted. Always at least 1.
pub fn sentence_count(text: &str) -> usize {
    let counted = text
        .split(|c: char| matches!(c, '.' | '!' | '?'))
        .filter(|s| s.unicode_words().count() > 2)
        .count();
    counted.max(1)
}

/// English syllable estimate: vowel groups, minus a silent trailing `e`, at least 1.
pub fn syllable_count(word: &str) -> usize {
    let w = word.to_lowercase();
    let chars: Vec<char> = w.chars().filter(|c| c.is_alphabetic()).collect();
    if chars.is_empty() {
        return 0;
    }
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut groups = 0usize;
    let mut prev_vowel = false;
    for &c in &chars {
        let v = is_vowel(c);
        if v && !prev_vowel {
            groups += 1;
        }
        prev_vowel = v;
    }
    let n = chars.len();
    if n > 2 && chars[n - 1] == 'e' && !is_vowel(chars[n - 2]) && !(chars[n - 2] == 'l' && !is_vowel(chars[n - 3])) {
        groups = groups.saturating_sub(1);
    }
    groups.max(1)
}

// ----------------------------- Emoji ------------------------------------

/// True when `c` on its own is a known emoji. Skin-tone modifiers count too.
#[inline]
pub fn is_emoji_char(c: char) -> bool {
    if SKIN_TONES.contains(&c) {
        return true;
    }
    let mut buf = [0u8; 4];
    emojis::get(c.encode_utf8(&mut buf)).is_some()
}

/// Number of characters that are emoji on their own.
pub fn emoji_char_count(text: &str) -> usize {
    text.chars().filter(|&c| is_emoji_char(c)).count()
}

/// Number of emoji sequences: grapheme clusters that are a known emoji
/// (a ZWJ family or a flag counts once).
pub fn emoji_sequence_count(text: &str) -> usize {
    text.graphemes(true).filter(|g| emojis::get(g).is_some()).count()
}

fn strip_zwj(text: &str) -> String {
    text.chars().filter(|&c| c != ZWJ).collect()
}

/// Whether a user's whole comment group carries no lexical content.
///
/// True when any one of these holds for **every** comment:
/// (a) at most one character, or only ASCII punctuation;
/// (b) exactly one emoji grapheme;
/// (c) only emoji characters;
/// (d) as many emoji sequences as emoji characters (no multi-codepoint clusters);
/// (e) only emoji characters once zero-width joiners are removed.
///
/// Check (d) also holds for text without any emoji (0 == 0), so a group of
/// plain comments is degenerate too.
pub fn is_degenerate<S: AsRef<str>>(comments: &[S]) -> bool {
    every(comments, |c: &str| c.chars().count() <= 1 || c.chars().all(|ch| ch.is_ascii_punctuation()))
        || every(comments, |c: &str| c.graphemes(true).count() == 1 && emojis::get(c).is_some())
        || every(comments, |c: &str| !c.is_empty() && c.chars().all(is_emoji_char))
        || every(comments, |c: &str| emoji_sequence_count(c) == emoji_char_count(c))
        || every(comments, |c: &str| {
            let stripped = strip_zwj(c);
            !stripped.is_empty() && stripped.chars().all(is_emoji_char)
        })
}

#[inline]
fn every<S: AsRef<str>>(comments: &[S], pred: impl Fn(&str) -> bool) -> bool {
    comments.iter().all(|c| pred(c.as_ref()))
}
