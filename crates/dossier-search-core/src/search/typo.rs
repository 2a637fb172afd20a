//! Typo tolerance for typeahead
//!
//! Edit-distance similarity between the typed word and the words of a title.
//! A typed word is compared against title-word prefixes of nearby lengths, so
//! a partial word with one slip still finds the word being typed.

use super::stem::analyze;

/// Levenshtein distance over characters
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }

    let mut previous: Vec<usize> = (0..=a.len()).collect();
    let mut current = vec![0; a.len() + 1];
    for (j, cb) in b.iter().enumerate() {
        current[0] = j + 1;
        for (i, ca) in a.iter().enumerate() {
            let substitution = previous[i] + usize::from(ca != cb);
            current[i + 1] = substitution.min(previous[i + 1] + 1).min(current[i] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[a.len()]
}

/// `1 - distance / longer length`, in [0, 1]
pub fn similarity(a: &str, b: &str) -> f32 {
    let longer = a.chars().count().max(b.chars().count());
    if longer == 0 {
        return 1.0;
    }
    let distance = edit_distance(a, b).min(longer);
    (longer - distance) as f32 / longer as f32
}

/// Closest title word to a typed partial word
#[derive(Debug, Clone, PartialEq)]
pub struct WordMatch {
    /// The full title word, in index form
    pub word: String,
    pub similarity: f32,
    /// Character offset of the word inside the title
    pub position: usize,
}

/// Best title word within `min_similarity` of `typed`.
///
/// Words that already start with `typed` are skipped; those are ordinary
/// prefix matches.
pub fn closest_word(title: &str, typed: &str, min_similarity: f32) -> Option<WordMatch> {
    let typed_len = typed.chars().count();
    let mut best: Option<WordMatch> = None;

    for token in analyze(title) {
        if token.form.starts_with(typed) {
            continue;
        }
        let chars: Vec<char> = token.form.chars().collect();
        let lengths = typed_len.saturating_sub(1).max(1)..=(typed_len + 1).min(chars.len());
        let score = lengths
            .map(|len| similarity(typed, &chars[..len].iter().collect::<String>()))
            .fold(0.0_f32, f32::max);

        if score >= min_similarity && best.as_ref().is_none_or(|b| score > b.similarity) {
            best = Some(WordMatch {
                word: token.form.clone(),
                similarity: score,
                position: title[..token.start].chars().count(),
            });
        }
    }
    best
}
