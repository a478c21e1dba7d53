//! Japanese-aware tokenization shared by catalog indexing and query analysis.
//!
//! Two strategies implement [`Analyzer`]: a Lindera morphological analyzer
//! (cargo feature `lindera`) and a regex analyzer over word characters plus
//! the hiragana, katakana and kanji blocks. [`TextTokenizer`] picks one once at
//! startup and falls back to the regex analyzer whenever the primary fails.

use std::collections::BTreeSet;

use regex::Regex;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("analyzer unavailable: {0}")]
    Unavailable(String),
    #[error("analysis failed: {0}")]
    Failed(String),
}

/// One tokenization strategy.
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;
    /// Surface forms in text order; duplicates allowed.
    fn analyze(&self, text: &str) -> Result<Vec<String>, TokenizeError>;
}

const FALLBACK_PATTERN: &str = r"[\w\x{3040}-\x{309F}\x{30A0}-\x{30FF}\x{4E00}-\x{9FAF}]+";

/// Maximal runs of word characters and Japanese script.
#[derive(Debug, Clone)]
pub struct RegexAnalyzer {
    pattern: Regex,
}

impl Default for RegexAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexAnalyzer {
    pub fn new() -> Self {
        Self { pattern: Regex::new(FALLBACK_PATTERN).expect("static tokenizer pattern") }
    }
}

impl Analyzer for RegexAnalyzer {
    fn name(&self) -> &'static str { "regex" }

    fn analyze(&self, text: &str) -> Result<Vec<String>, TokenizeError> {
        Ok(self.pattern.find_iter(text).map(|m| m.as_str().to_string()).collect())
    }
}

#[cfg(feature = "lindera")]
pub use morphological::LinderaAnalyzer;

#[cfg(feature = "lindera")]
mod morphological {
    use std::sync::Mutex;

    use lindera::dictionary::load_dictionary;
    use lindera::mode::{Mode, Penalty};
    use lindera::segmenter::Segmenter;
    use lindera_tantivy::tokenizer::LinderaTokenizer;
    use tantivy::tokenizer::{TokenStream, Tokenizer};

    use super::{Analyzer, TokenizeError};

    /// Lindera over the embedded IPADIC in decompose mode, which splits
    /// compound nouns into their shortest dictionary units.
    pub struct LinderaAnalyzer {
        inner: Mutex<LinderaTokenizer>,
    }

    impl LinderaAnalyzer {
        pub fn new() -> Result<Self, TokenizeError> {
            let dictionary = load_dictionary("embedded://ipadic")
                .map_err(|e| TokenizeError::Unavailable(format!("load embedded ipadic: {e}")))?;
            let segmenter = Segmenter::new(Mode::Decompose(Penalty::default()), dictionary, None);
            Ok(Self { inner: Mutex::new(LinderaTokenizer::from_segmenter(segmenter)) })
        }
    }

    impl Analyzer for LinderaAnalyzer {
        fn name(&self) -> &'static str { "lindera" }

        fn analyze(&self, text: &str) -> Result<Vec<String>, TokenizeError> {
            let mut tokenizer = self
                .inner
                .lock()
                .map_err(|_| TokenizeError::Failed("lindera tokenizer lock poisoned".into()))?;
            let mut stream = tokenizer.token_stream(text);
            let mut out = Vec::new();
            while stream.advance() {
                let surface = &stream.token().text;
                if !surface.trim().is_empty() { out.push(surface.clone()); }
            }
            Ok(out)
        }
    }
}

/// Tokenizer handed to the retrievers; the strategy is fixed at construction.
pub struct TextTokenizer {
    primary: Option<Box<dyn Analyzer>>,
    fallback: RegexAnalyzer,
}

impl TextTokenizer {
    /// Use the morphological analyzer when it is compiled in and its dictionary loads.
    pub fn detect() -> Self {
        #[cfg(feature = "lindera")]
        {
            match LinderaAnalyzer::new() {
                Ok(analyzer) => return Self::with_primary(Box::new(analyzer)),
                Err(e) => warn!(error = %e, "morphological analyzer unavailable; using regex tokenizer"),
            }
        }
        #[cfg(not(feature = "lindera"))]
        warn!("morphological analyzer not compiled in; using regex tokenizer");
        Self::regex_only()
    }

    pub fn regex_only() -> Self {
        Self { primary: None, fallback: RegexAnalyzer::new() }
    }

    pub fn with_primary(primary: Box<dyn Analyzer>) -> Self {
        Self { primary: Some(primary), fallback: RegexAnalyzer::new() }
    }

    /// Name of the strategy selected at startup.
    pub fn strategy(&self) -> &'static str {
        self.primary.as_ref().map(|p| p.name()).unwrap_or_else(|| self.fallback.name())
    }

    /// Deduplicated surface tokens of `text`.
    pub fn tokenize(&self, text: &str) -> BTreeSet<String> {
        if let Some(primary) = &self.primary {
            match primary.analyze(text) {
                Ok(tokens) => return tokens.into_iter().collect(),
                Err(e) => warn!(analyzer = primary.name(), error = %e, "tokenizer failed; falling back to regex split"),
            }
        }
        self.fallback_tokens(text)
    }

    fn fallback_tokens(&self, text: &str) -> BTreeSet<String> {
        let words: BTreeSet<String> = self.fallback.analyze(text).unwrap_or_default().into_iter().collect();
        if words.is_empty() {
            return BTreeSet::from([text.to_string()]);
        }
        words
    }
}

impl std::fmt::Debug for TextTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextTokenizer").field("strategy", &self.strategy()).finish()
    }
}
