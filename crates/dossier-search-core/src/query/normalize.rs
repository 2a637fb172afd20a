//! Text normalization and script detection
//!
//! Shared by the query parser, the typeahead path and the indexer so that
//! query text and stored text go through the same transformations.

use unicode_normalization::UnicodeNormalization;

use crate::model::Language;

/// NFKC-normalize, strip control characters and collapse whitespace.
///
/// Case is preserved: Boolean operators are only recognised in upper case,
/// so folding happens after tokenization.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.nfkc() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if c.is_control() || is_format_char(c) {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }

    out
}

/// Lowercase Latin script. Arabic has no case and passes through unchanged.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Full normalization pipeline used for display and cache keys
pub fn normalize_folded(raw: &str) -> String {
    fold_case(&normalize(raw))
}

/// Zero-width and bidi formatting characters that NFKC leaves in place
fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
    )
}

/// Whether `c` belongs to one of the Arabic script blocks
pub fn is_arabic_char(c: char) -> bool {
    matches!(
        c,
        '\u{0600}'..='\u{06FF}'
            | '\u{0750}'..='\u{077F}'
            | '\u{08A0}'..='\u{08FF}'
            | '\u{FB50}'..='\u{FDFF}'
            | '\u{FE70}'..='\u{FEFE}'
    )
}

/// Detect the query language.
///
/// Any Arabic character wins, even in mixed-script text. Otherwise any Latin
/// letter means English.
pub fn detect_language(text: &str) -> Language {
    let mut has_latin = false;
    for c in text.chars() {
        if is_arabic_char(c) {
            return Language::Ar;
        }
        if c.is_ascii_alphabetic() || matches!(c, '\u{00C0}'..='\u{024F}') {
            has_latin = true;
        }
    }
    if has_latin { Language::En } else { Language::Unknown }
}
