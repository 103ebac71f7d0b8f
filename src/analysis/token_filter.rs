//! Token filters applied after tokenization.

use std::collections::HashSet;

use lazy_static::lazy_static;

use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// A filter transforms or drops tokens in a stream.
pub trait TokenFilter: Send + Sync + std::fmt::Debug {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter.
    fn name(&self) -> &'static str;
}

/// Lowercases every token.
#[derive(Clone, Debug, Default)]
pub struct LowercaseFilter;

impl LowercaseFilter {
    /// Create a new lowercase filter.
    pub fn new() -> Self {
        LowercaseFilter
    }
}

impl TokenFilter for LowercaseFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(Box::new(tokens.map(|token| {
            let lowered = token.text.to_lowercase();
            token.with_text(lowered)
        })))
    }

    fn name(&self) -> &'static str {
        "lowercase"
    }
}

/// Common English words filtered out during indexing and query analysis.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

lazy_static! {
    static ref STOP_WORD_SET: HashSet<&'static str> =
        ENGLISH_STOP_WORDS.iter().copied().collect();
}

/// Removes common words that do not contribute to relevance.
///
/// Uses the default English stop-word list unless constructed with a custom
/// set. Filtering happens after lowercasing, so the list is lowercase.
#[derive(Clone, Debug, Default)]
pub struct StopFilter {
    custom: Option<HashSet<String>>,
}

impl StopFilter {
    /// Create a stop filter with the default English word list.
    pub fn new() -> Self {
        StopFilter { custom: None }
    }

    /// Create a stop filter with a custom word list.
    pub fn with_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StopFilter {
            custom: Some(words.into_iter().map(Into::into).collect()),
        }
    }

    fn is_stop_word(&self, word: &str) -> bool {
        match &self.custom {
            Some(set) => set.contains(word),
            None => STOP_WORD_SET.contains(word),
        }
    }
}

impl TokenFilter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let this = self.clone();
        Ok(Box::new(
            tokens.filter(move |token| !this.is_stop_word(&token.text)),
        ))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(words: &[&str]) -> TokenStream {
        let tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, i))
            .collect();
        Box::new(tokens.into_iter())
    }

    #[test]
    fn test_lowercase_filter() {
        let filter = LowercaseFilter::new();
        let result: Vec<Token> = filter.filter(stream(&["Medicare", "ABC"])).unwrap().collect();
        assert_eq!(result[0].text, "medicare");
        assert_eq!(result[1].text, "abc");
    }

    #[test]
    fn test_stop_filter_removes_default_words() {
        let filter = StopFilter::new();
        let result: Vec<Token> = filter
            .filter(stream(&["the", "quick", "and", "brown"]))
            .unwrap()
            .collect();
        let texts: Vec<&str> = result.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["quick", "brown"]);
    }

    #[test]
    fn test_stop_filter_with_custom_words() {
        let filter = StopFilter::with_words(["quick"]);
        let result: Vec<Token> = filter
            .filter(stream(&["the", "quick", "brown"]))
            .unwrap()
            .collect();
        let texts: Vec<&str> = result.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["the", "brown"]);
    }
}
