//! Tokenization and light stemming
//!
//! The same analysis runs when documents are indexed and when query terms
//! are matched, so a term matches whenever its stem appears in the text.
//!
//! - English: plural, `-ing`, `-ed` and `-ly` stripping with a minimum stem
//! - Arabic: diacritic and tatweel removal, letter-form normalization,
//!   article/conjunction prefix stripping, common suffix stripping

use unicode_normalization::UnicodeNormalization;

use crate::query::is_arabic_char;

/// Shortest English stem a suffix rule may leave behind
const MIN_EN_STEM: usize = 3;

/// Shortest Arabic stem an affix rule may leave behind
const MIN_AR_STEM: usize = 2;

/// Arabic prefixes, longest first
const AR_PREFIXES: &[&str] = &["وال", "بال", "كال", "فال", "لل", "ال"];

/// Arabic suffixes, checked in order (after teh marbuta has become heh)
const AR_SUFFIXES: &[&str] = &["ها", "ان", "ات", "ون", "ين", "يه", "ه", "ي"];

/// A token with its byte span in the analyzed text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    /// Folded, normalized form without stemming (prefix lookups)
    pub form: String,
    /// Stemmed form (term matching)
    pub stem: String,
    pub start: usize,
    pub end: usize,
}

/// Split text into word tokens and analyze each one
pub fn analyze(text: &str) -> Vec<AnalyzedToken> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if is_word_char(c) {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            push_token(text, s, i, &mut tokens);
        }
    }
    if let Some(s) = start {
        push_token(text, s, text.len(), &mut tokens);
    }

    tokens
}

fn push_token(text: &str, start: usize, end: usize, out: &mut Vec<AnalyzedToken>) {
    let form = index_form(&text[start..end]);
    if form.is_empty() {
        return;
    }
    let stem = stem_form(&form);
    out.push(AnalyzedToken {
        form,
        stem,
        start,
        end,
    });
}

/// Stems of every token in `text`
pub fn stems(text: &str) -> Vec<String> {
    analyze(text).into_iter().map(|t| t.stem).collect()
}

/// Unstemmed normalized forms of every token in `text`
pub fn forms(text: &str) -> Vec<String> {
    analyze(text).into_iter().map(|t| t.form).collect()
}

/// Stem a single word
pub fn stem(word: &str) -> String {
    stem_form(&index_form(word))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || is_arabic_mark(c)
}

/// Harakat, superscript alef and Quranic annotation marks
fn is_arabic_mark(c: char) -> bool {
    matches!(c, '\u{0610}'..='\u{061A}' | '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06ED}')
}

/// NFKC, lowercase, and Arabic letter-form normalization
fn index_form(word: &str) -> String {
    word.nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| !is_arabic_mark(*c) && *c != '\u{0640}')
        .map(|c| match c {
            'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
            'ى' => 'ي',
            'ة' => 'ه',
            other => other,
        })
        .collect()
}

fn stem_form(form: &str) -> String {
    if form.chars().any(is_arabic_char) {
        stem_arabic(form)
    } else if form.chars().all(|c| c.is_alphabetic()) {
        stem_english(form)
    } else {
        // Mixed digits, codes and identifiers stay as-is
        form.to_string()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn stem_english(word: &str) -> String {
    let mut w = word.to_string();

    // Plurals first so "meetings" and "meeting" share a stem
    if w.ends_with("ies") && char_len(&w) > 4 {
        w.truncate(w.len() - 3);
        w.push('y');
    } else if w.ends_with("sses") {
        w.truncate(w.len() - 2);
    } else if w.ends_with('s')
        && !w.ends_with("ss")
        && !w.ends_with("us")
        && !w.ends_with("is")
        && char_len(&w) > MIN_EN_STEM + 1
    {
        w.truncate(w.len() - 1);
    }

    for suffix in ["ing", "ed", "ly"] {
        if w.ends_with(suffix) && char_len(&w) - suffix.len() >= MIN_EN_STEM {
            w.truncate(w.len() - suffix.len());
            break;
        }
    }

    w
}

fn stem_arabic(word: &str) -> String {
    let mut w = word;

    for prefix in AR_PREFIXES {
        if let Some(rest) = w.strip_prefix(prefix) {
            if char_len(rest) >= MIN_AR_STEM {
                w = rest;
                break;
            }
        }
    }

    // Conjunction waw, only on longer words
    if char_len(w) > 3 {
        if let Some(rest) = w.strip_prefix('و') {
            w = rest;
        }
    }

    for suffix in AR_SUFFIXES {
        if let Some(rest) = w.strip_suffix(suffix) {
            if char_len(rest) >= MIN_AR_STEM {
                w = rest;
            }
        }
    }

    w.to_string()
}
