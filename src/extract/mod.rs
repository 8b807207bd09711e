//! Token extractor - splits scannable text into candidate class tokens
//!
//! Extraction is deliberately lossy: any maximal run of alphabet characters
//! is a candidate. Whether it is a utility class is decided by the compiler.

use std::collections::BTreeSet;

/// Punctuation allowed in tokens by default, in addition to ASCII letters
/// and digits.
pub const DEFAULT_PUNCTUATION: &str = "-_:/[].%#!@";

/// Default maximum token length; longer runs are treated as noise
pub const DEFAULT_MAX_TOKEN_LEN: usize = 256;

/// The set of characters a class token may contain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAlphabet {
    // ASCII only; membership is a table lookup
    allowed: [bool; 128],
    punctuation: String,
}

impl TokenAlphabet {
    /// ASCII alphanumerics plus the given punctuation characters.
    ///
    /// Non-ASCII and whitespace characters in `punctuation` are ignored.
    pub fn new(punctuation: &str) -> Self {
        let mut allowed = [false; 128];
        for b in b'a'..=b'z' {
            allowed[b as usize] = true;
        }
        for b in b'A'..=b'Z' {
            allowed[b as usize] = true;
        }
        for b in b'0'..=b'9' {
            allowed[b as usize] = true;
        }

        let mut kept = String::new();
        for ch in punctuation.chars() {
            if ch.is_ascii() && !ch.is_ascii_whitespace() && !ch.is_ascii_control() {
                if !allowed[ch as usize] {
                    kept.push(ch);
                }
                allowed[ch as usize] = true;
            }
        }

        Self {
            allowed,
            punctuation: kept,
        }
    }

    #[inline]
    pub fn contains(&self, ch: char) -> bool {
        ch.is_ascii() && self.allowed[ch as usize]
    }

    /// The punctuation this alphabet was built from (normalized)
    pub fn punctuation(&self) -> &str {
        &self.punctuation
    }
}

impl Default for TokenAlphabet {
    fn default() -> Self {
        Self::new(DEFAULT_PUNCTUATION)
    }
}

/// Candidate token extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extractor {
    alphabet: TokenAlphabet,
    max_token_len: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(TokenAlphabet::default())
    }
}

impl Extractor {
    pub fn new(alphabet: TokenAlphabet) -> Self {
        Self {
            alphabet,
            max_token_len: DEFAULT_MAX_TOKEN_LEN,
        }
    }

    /// Drop tokens longer than `max_token_len` bytes (0 means no limit)
    pub fn with_max_token_len(mut self, max_token_len: usize) -> Self {
        self.max_token_len = max_token_len;
        self
    }

    pub fn alphabet(&self) -> &TokenAlphabet {
        &self.alphabet
    }

    /// Distinct candidate tokens in `text`
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        let mut tokens = BTreeSet::new();
        let mut start: Option<usize> = None;

        for (idx, ch) in text.char_indices() {
            if self.alphabet.contains(ch) {
                if start.is_none() {
                    start = Some(idx);
                }
            } else if let Some(begin) = start.take() {
                self.push(&mut tokens, &text[begin..idx]);
            }
        }
        if let Some(begin) = start {
            self.push(&mut tokens, &text[begin..]);
        }

        tokens
    }

    fn push(&self, tokens: &mut BTreeSet<String>, token: &str) {
        if token.is_empty() || (self.max_token_len > 0 && token.len() > self.max_token_len) {
            return;
        }
        if !tokens.contains(token) {
            tokens.insert(token.to_string());
        }
    }
}

/// Extract with the default alphabet
pub fn extract(text: &str) -> BTreeSet<String> {
    Extractor::default().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_text() {
        assert!(extract("").is_empty());
        assert!(extract("   \n\t ").is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        assert_eq!(extract("a--b::c a--b::c"), set(&["a--b::c"]));
    }

    #[test]
    fn test_adjacent_delimiters_produce_no_empty_tokens() {
        let tokens = extract("\"flex\"  ,,  'mt-4'\n\n<p>");
        assert_eq!(tokens, set(&["flex", "mt-4", "p"]));
        assert!(!tokens.contains(""));
    }

    #[test]
    fn test_markup_attribute() {
        let tokens = extract(r#"<div class="flex mt-4 hover:text-red-500">"#);
        assert!(tokens.contains("flex"));
        assert!(tokens.contains("mt-4"));
        assert!(tokens.contains("hover:text-red-500"));
        assert!(tokens.contains("div"));
        assert!(!tokens.iter().any(|t| t.contains('"')));
    }

    #[test]
    fn test_arbitrary_values_and_fractions() {
        let tokens = extract("w-[37px] mt-0.5 w-1/2 bg-[#ff0000] !p-4");
        assert_eq!(
            tokens,
            set(&["!p-4", "bg-[#ff0000]", "mt-0.5", "w-1/2", "w-[37px]"])
        );
    }

    #[test]
    fn test_non_ascii_is_delimiter() {
        assert_eq!(extract("flex→grid"), set(&["flex", "grid"]));
    }

    #[test]
    fn test_custom_alphabet() {
        let extractor = Extractor::new(TokenAlphabet::new("-"));
        assert_eq!(extractor.extract("hover:text-red-500"), set(&["hover", "text-red-500"]));
        assert_eq!(extractor.alphabet().punctuation(), "-");
    }

    #[test]
    fn test_alphabet_ignores_whitespace_and_non_ascii() {
        let alphabet = TokenAlphabet::new(" -é");
        assert!(alphabet.contains('-'));
        assert!(!alphabet.contains(' '));
        assert!(!alphabet.contains('é'));
    }

    #[test]
    fn test_max_token_len() {
        let extractor = Extractor::default().with_max_token_len(4);
        assert_eq!(extractor.extract("flex block p-2"), set(&["flex", "p-2"]));
    }

    #[test]
    fn test_extraction_ignores_order() {
        assert_eq!(extract("p-2 flex"), extract("flex p-2"));
    }
}
