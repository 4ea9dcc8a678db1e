// Text normalization and paragraph segmentation.
//
// Normalization runs in a fixed order: canonical decomposition (NFD), drop
// combining marks, canonical composition (NFC), lowercase. Tokens are the
// whitespace-separated pieces of the result, so "Café" and "cafe" collapse
// to the same token.
//
// Paragraphs are runs of non-blank lines. Lines inside a paragraph are joined
// with '\n'; one or more blank lines end it.

use std::io::{self, BufRead, Lines};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::document::Document;

/// Strip diacritics and lowercase `raw`.
pub fn normalize(raw: &str) -> String {
    let stripped: String = raw.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped.nfc().collect::<String>().to_lowercase()
}

/// Normalize `raw` and split it into whitespace-delimited tokens.
pub fn tokenize(raw: &str) -> Document {
    normalize(raw)
        .split_whitespace()
        .map(str::to_owned)
        .collect::<Vec<_>>()
        .into()
}

/// Iterator over the paragraphs of a text stream.
pub struct Paragraphs<R> {
    lines: Lines<R>,
}

/// Split a text stream into paragraphs separated by blank lines.
pub fn paragraphs<R: BufRead>(reader: R) -> Paragraphs<R> {
    Paragraphs {
        lines: reader.lines(),
    }
}

impl<R: BufRead> Iterator for Paragraphs<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = String::new();
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        if !buf.is_empty() {
                            return Some(Ok(buf));
                        }
                    } else {
                        if !buf.is_empty() {
                            buf.push('\n');
                        }
                        buf.push_str(&line);
                    }
                }
                Some(Err(e)) => return Some(Err(e)),
                None => return (!buf.is_empty()).then_some(Ok(buf)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(text: &str) -> Vec<String> {
        paragraphs(Cursor::new(text.to_string()))
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_normalize_strips_diacritics() {
        assert_eq!(normalize("Café Ÿ NAÏVE"), "cafe y naive");
    }

    #[test]
    fn test_normalize_decomposed_input() {
        // "e" followed by a combining acute accent
        assert_eq!(normalize("e\u{0301}cole"), "ecole");
    }

    #[test]
    fn test_tokenize_splits_on_any_whitespace() {
        let doc = tokenize("  The\tquick\nbrown   Fox ");
        assert_eq!(doc.tokens(), &["the", "quick", "brown", "fox"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("   \n ").is_empty());
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        let paras = collect("a b\nc\n\n\nd e\n");
        assert_eq!(paras, vec!["a b\nc".to_string(), "d e".to_string()]);
    }

    #[test]
    fn test_paragraphs_flush_at_end_without_newline() {
        assert_eq!(collect("one\n\ntwo"), vec!["one", "two"]);
    }

    #[test]
    fn test_whitespace_only_lines_are_blank() {
        assert_eq!(collect("one\n  \t\ntwo\n"), vec!["one", "two"]);
    }

    #[test]
    fn test_leading_blank_lines_produce_nothing() {
        assert_eq!(collect("\n\n\nonly\n"), vec!["only"]);
        assert!(collect("\n\n").is_empty());
    }
}
