//! Analyzers combining a tokenizer with a filter chain.

use std::sync::Arc;

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::{LowercaseFilter, StopFilter, TokenFilter};
use crate::analysis::tokenizer::{Tokenizer, WordTokenizer};
use crate::error::Result;

/// An analyzer turns raw text into a stream of index-ready tokens.
pub trait Analyzer: Send + Sync + std::fmt::Debug {
    /// Analyze the given text.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer.
    fn name(&self) -> &'static str;
}

/// An analyzer built from a tokenizer and an ordered chain of filters.
#[derive(Debug)]
pub struct PipelineAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    filters: Vec<Arc<dyn TokenFilter>>,
}

impl PipelineAnalyzer {
    /// Create a pipeline with the given tokenizer and no filters.
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            tokenizer,
            filters: Vec::new(),
        }
    }

    /// Append a filter to the chain.
    pub fn add_filter(mut self, filter: Arc<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let mut stream = self.tokenizer.tokenize(text)?;
        for filter in &self.filters {
            stream = filter.filter(stream)?;
        }
        Ok(stream)
    }

    fn name(&self) -> &'static str {
        "pipeline"
    }
}

/// The default analyzer used for both documents and queries.
///
/// # Pipeline
///
/// 1. [`WordTokenizer`] (Unicode word boundaries)
/// 2. [`LowercaseFilter`]
/// 3. [`StopFilter`] (common English stop words)
///
/// Documents and queries must run through the same pipeline, otherwise query
/// terms cannot line up with indexed terms.
///
/// # Examples
///
/// ```
/// use tessera::analysis::analyzer::{Analyzer, StandardAnalyzer};
///
/// let analyzer = StandardAnalyzer::new();
/// let tokens: Vec<_> = analyzer.analyze("The Medicare Basics").unwrap().collect();
///
/// // "The" is dropped as a stop word, the rest is lowercased.
/// assert_eq!(tokens.len(), 2);
/// assert_eq!(tokens[0].text, "medicare");
/// assert_eq!(tokens[1].text, "basics");
/// ```
#[derive(Debug)]
pub struct StandardAnalyzer {
    inner: PipelineAnalyzer,
}

impl StandardAnalyzer {
    /// Create a new standard analyzer.
    pub fn new() -> Self {
        let inner = PipelineAnalyzer::new(Arc::new(WordTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()))
            .add_filter(Arc::new(StopFilter::new()));
        StandardAnalyzer { inner }
    }

    /// Create a standard analyzer without stop-word filtering.
    pub fn without_stop_words() -> Self {
        let inner = PipelineAnalyzer::new(Arc::new(WordTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()));
        StandardAnalyzer { inner }
    }
}

impl Default for StandardAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    #[test]
    fn test_standard_analyzer_pipeline() {
        let analyzer = StandardAnalyzer::new();
        let tokens: Vec<Token> = analyzer
            .analyze("The Group-Health Benefits and Enrollment")
            .unwrap()
            .collect();

        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["group", "health", "benefits", "enrollment"]);
    }

    #[test]
    fn test_analyzer_without_stop_words() {
        let analyzer = StandardAnalyzer::without_stop_words();
        let tokens: Vec<Token> = analyzer.analyze("The Plan").unwrap().collect();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["the", "plan"]);
    }
}
