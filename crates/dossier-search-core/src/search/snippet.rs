//! Highlighted snippets
//!
//! A snippet is a window of roughly `window` characters around the first
//! match in a field, cut at token boundaries, HTML-escaped, with every
//! matched token wrapped in `<mark>…</mark>`.

use super::stem::{AnalyzedToken, analyze};

const ELLIPSIS: &str = "…";

/// A field analyzed once for matching and snippet extraction
#[derive(Debug, Clone)]
pub struct AnalyzedField<'a> {
    pub text: &'a str,
    pub tokens: Vec<AnalyzedToken>,
}

impl<'a> AnalyzedField<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            tokens: analyze(text),
        }
    }

    /// Start indices of every occurrence of a stem sequence
    pub fn occurrences(&self, stems: &[String]) -> Vec<usize> {
        if stems.is_empty() || stems.len() > self.tokens.len() {
            return Vec::new();
        }
        (0..=self.tokens.len() - stems.len())
            .filter(|&i| {
                stems
                    .iter()
                    .zip(&self.tokens[i..])
                    .all(|(s, t)| *s == t.stem)
            })
            .collect()
    }

    /// Per-token highlight flags for a set of stem sequences
    pub fn highlight_mask(&self, sequences: &[Vec<String>]) -> Vec<bool> {
        let mut mask = vec![false; self.tokens.len()];
        for seq in sequences {
            for start in self.occurrences(seq) {
                for flag in &mut mask[start..start + seq.len()] {
                    *flag = true;
                }
            }
        }
        mask
    }
}

/// Build a snippet for the first highlighted token, or `None` if nothing matched
pub fn build_snippet(field: &AnalyzedField<'_>, mask: &[bool], window: usize) -> Option<String> {
    let first = mask.iter().position(|m| *m)?;
    let text = field.text;
    let tokens = &field.tokens;
    let anchor = &tokens[first];

    // Lead in with about a third of the window before the match
    let lead = window / 3;
    let mut start = text[..anchor.start]
        .char_indices()
        .rev()
        .nth(lead.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    if lead == 0 {
        start = anchor.start;
    }
    if start > 0 {
        // Snap forward to a token start
        start = tokens
            .iter()
            .find(|t| t.start >= start)
            .map_or(anchor.start, |t| t.start);
    }

    let mut end = text[start..]
        .char_indices()
        .nth(window)
        .map_or(text.len(), |(i, _)| start + i);
    if end < text.len() {
        // Snap back to a token end, never cutting off the anchor
        end = tokens
            .iter()
            .rev()
            .find(|t| t.end <= end && t.start >= start)
            .map_or(anchor.end, |t| t.end)
            .max(anchor.end);
    }

    let mut out = String::with_capacity(end - start + 32);
    if start > 0 {
        out.push_str(ELLIPSIS);
    }

    let mut cursor = start;
    for (token, marked) in tokens.iter().zip(mask) {
        if token.start < start || token.end > end || !marked {
            continue;
        }
        push_escaped(&mut out, &text[cursor..token.start]);
        out.push_str("<mark>");
        push_escaped(&mut out, &text[token.start..token.end]);
        out.push_str("</mark>");
        cursor = token.end;
    }
    push_escaped(&mut out, &text[cursor..end]);

    if end < text.len() {
        out.push_str(ELLIPSIS);
    }

    Some(out.trim().to_string())
}

/// Plain-text lead of `text`, at most `max_chars` characters, cut at a word
/// boundary when possible. `None` for blank text.
pub fn preview(text: &str, max_chars: usize) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return Some(text.to_string());
    };

    let head = &text[..cut];
    let head = match head.rfind(char::is_whitespace) {
        Some(space) if space > 0 => &head[..space],
        _ => head,
    };
    Some(format!("{}{}", head.trim_end(), ELLIPSIS))
}

/// HTML-escape `&`, `<`, `>` and `"`
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped(&mut out, text);
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}
