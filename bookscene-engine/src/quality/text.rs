//! Text utilities: boilerplate masking, sentence segmentation, tokenization
//! and the complexity estimate used by the adaptive strategy.
//!
//! All functions work on byte offsets into the caller's text. Masking keeps
//! the byte length unchanged so spans found in masked text are valid for the
//! original.

use crate::types::TextSpan;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Lines that carry no narrative content: page numbers, "Page N", chapter
/// headings, scene separators
static BOILERPLATE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?xi)^(?:
            [-–—]?\s*\d{1,4}\s*[-–—]?
          | (?:page|p\.|стр\.?|страница)\s*\d{1,4}(?:\s*(?:of|из)\s*\d{1,4})?
          | (?:chapter|глава|part|часть|book|книга)\s+(?:\d{1,3}|[ivxlcdm]{1,8}|[\p{L}-]{1,20})\.?(?:\s*[:.]\s*.{0,60})?
          | (?:[*\#~=_-]\s*){3,}
        )$",
    )
    .expect("boilerplate pattern is valid")
});

/// Longest line considered for boilerplate matching
const MAX_BOILERPLATE_LINE: usize = 80;

/// Replace boilerplate lines with spaces, preserving byte offsets
pub fn mask_boilerplate(text: &str) -> String {
    let mut masked = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let content = line.trim();
        if !content.is_empty()
            && content.len() <= MAX_BOILERPLATE_LINE
            && BOILERPLATE_LINE.is_match(content)
        {
            for ch in line.chars() {
                if ch == '\n' || ch == '\r' {
                    masked.push(ch);
                } else {
                    masked.extend(std::iter::repeat(' ').take(ch.len_utf8()));
                }
            }
        } else {
            masked.push_str(line);
        }
    }
    masked
}

/// Number of non-whitespace characters
pub fn content_length(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Sentence spans, trimmed of surrounding whitespace
///
/// Boundaries: `.`, `!`, `?`, `…` followed by whitespace or closing quotes,
/// and blank lines (paragraph breaks).
pub fn sentence_spans(text: &str) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    let mut prev_newline = false;

    while let Some((idx, ch)) = chars.next() {
        let next = chars.peek().map(|&(_, c)| c);
        let end_of_sentence = matches!(ch, '.' | '!' | '?' | '…')
            && next.map_or(true, |c| c.is_whitespace() || is_closing_quote(c));
        let paragraph_break = ch == '\n' && prev_newline;
        prev_newline = ch == '\n' || (prev_newline && ch == '\r');

        if end_of_sentence {
            // Swallow trailing punctuation and closing quotes
            let mut end = idx + ch.len_utf8();
            while let Some(&(j, c)) = chars.peek() {
                if matches!(c, '.' | '!' | '?' | '…') || is_closing_quote(c) {
                    end = j + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            push_trimmed(text, start, end, &mut spans);
            start = end;
        } else if paragraph_break {
            push_trimmed(text, start, idx, &mut spans);
            start = idx + 1;
        }
    }
    push_trimmed(text, start, text.len(), &mut spans);
    spans
}

fn is_closing_quote(c: char) -> bool {
    matches!(c, '"' | '\'' | '»' | '”' | '’' | ')')
}

fn push_trimmed(text: &str, start: usize, end: usize, spans: &mut Vec<TextSpan>) {
    if start >= end {
        return;
    }
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading + trailing < slice.len() {
        spans.push(TextSpan::new(start + leading, end - trailing));
    }
}

/// Lowercased word tokens
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .map(|t| t.trim_matches(|c| c == '\'' || c == '-'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub fn word_count(text: &str) -> usize {
    tokens(text).len()
}

/// Text of a span, or empty if the span is not valid for `text`
pub fn span_text<'a>(text: &'a str, span: &TextSpan) -> &'a str {
    text.get(span.start..span.end).unwrap_or("")
}

/// Whether a span lies inside `text` on char boundaries
pub fn is_valid_span(text: &str, span: &TextSpan) -> bool {
    span.end <= text.len() && text.is_char_boundary(span.start) && text.is_char_boundary(span.end)
}

/// Unique tokens / total tokens (0.0-1.0)
pub fn lexical_diversity(tokens: &[String]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
    unique.len() as f64 / tokens.len() as f64
}

/// Text complexity estimate (0.0-1.0)
///
/// Weighted blend of average sentence length (saturates at 30 words),
/// lexical diversity and clause punctuation density.
pub fn text_complexity(text: &str) -> f64 {
    let sentences = sentence_spans(text);
    let all_tokens = tokens(text);
    if sentences.is_empty() || all_tokens.is_empty() {
        return 0.0;
    }

    let avg_sentence_words = all_tokens.len() as f64 / sentences.len() as f64;
    let length_factor = (avg_sentence_words / 30.0).min(1.0);

    let diversity = lexical_diversity(&all_tokens);

    let clause_marks = text
        .chars()
        .filter(|c| matches!(c, ',' | ';' | ':' | '—' | '–' | '('))
        .count();
    let punctuation_factor = (clause_marks as f64 / all_tokens.len() as f64 * 5.0).min(1.0);

    (length_factor * 0.4 + diversity * 0.35 + punctuation_factor * 0.25).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_boilerplate_preserves_length() {
        let text = "Chapter 3\nThe castle rose above the valley.\n42\n* * *\nСтраница 7\nShe smiled.";
        let masked = mask_boilerplate(text);
        assert_eq!(masked.len(), text.len());
        assert!(!masked.contains("Chapter 3"));
        assert!(!masked.contains("42"));
        assert!(!masked.contains("* * *"));
        assert!(!masked.contains("Страница"));
        assert!(masked.contains("The castle rose above the valley."));
        assert!(masked.contains("She smiled."));
    }

    #[test]
    fn test_mask_boilerplate_keeps_prose_starting_with_keyword() {
        let text = "Part of the wall had fallen into the moat.";
        assert_eq!(mask_boilerplate(text), text);
    }

    #[test]
    fn test_sentence_spans_basic() {
        let text = "The hall was dark. A candle burned!  Was anyone there?";
        let spans = sentence_spans(text);
        assert_eq!(spans.len(), 3);
        assert_eq!(span_text(text, &spans[0]), "The hall was dark.");
        assert_eq!(span_text(text, &spans[1]), "A candle burned!");
        assert_eq!(span_text(text, &spans[2]), "Was anyone there?");
    }

    #[test]
    fn test_sentence_spans_paragraph_break_and_quotes() {
        let text = "\"Run!\" he said\n\nThe forest was silent";
        let spans = sentence_spans(text);
        let texts: Vec<&str> = spans.iter().map(|s| span_text(text, s)).collect();
        assert_eq!(texts, vec!["\"Run!\"", "he said", "The forest was silent"]);
    }

    #[test]
    fn test_sentence_spans_cyrillic_offsets_are_char_boundaries() {
        let text = "Старый замок стоял на холме. Туман окутывал башни.";
        for span in sentence_spans(text) {
            assert!(is_valid_span(text, &span));
        }
        assert_eq!(sentence_spans(text).len(), 2);
    }

    #[test]
    fn test_tokens_lowercase_and_split() {
        assert_eq!(
            tokens("The Old-Town's gate, rusty."),
            vec!["the", "old-town's", "gate", "rusty"]
        );
    }

    #[test]
    fn test_text_complexity_orders_simple_below_complex() {
        let simple = "The cat sat. The cat sat. The cat sat.";
        let complex = "Beneath the crumbling arches, where ivy, moss and lichen tangled \
                       in silent conspiracy, the old librarian catalogued forgotten \
                       manuscripts; each one, he believed, held a secret.";
        assert!(text_complexity(simple) < text_complexity(complex));
        assert_eq!(text_complexity(""), 0.0);
    }

    #[test]
    fn test_content_length_ignores_whitespace() {
        assert_eq!(content_length("  a b \n c "), 3);
    }
}
