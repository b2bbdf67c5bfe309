use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::borrow::Cow;
use std::fmt;

use crate::stopwords::Stopwords;
use crate::Document;

lazy_static! {
    // ASCII punctuation: !"#$%&'()*+,-./:;<=>?@[\]^_`{|}~
    static ref PUNCT: Regex = Regex::new(r"[[:punct:]]").expect("valid regex");
}

/// Maps a token to its stem.
pub trait Stem: Send + Sync {
    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str>;
}

impl Stem for Stemmer {
    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str> {
        Stemmer::stem(self, token)
    }
}

/// Leaves tokens untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStemming;

impl Stem for NoStemming {
    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(token)
    }
}

/// Text normalization pipeline: lowercase, strip punctuation, split on
/// whitespace, drop stopwords, stem.
pub struct Tokenizer {
    stopwords: Stopwords,
    stemmer: Box<dyn Stem>,
}

impl Tokenizer {
    pub fn new(stopwords: Stopwords, stemmer: impl Stem + 'static) -> Self {
        Self { stopwords, stemmer: Box::new(stemmer) }
    }

    /// Embedded English stopwords with the Snowball English stemmer.
    pub fn english() -> Self {
        Self::english_with_stopwords(Stopwords::english())
    }

    pub fn english_with_stopwords(stopwords: Stopwords) -> Self {
        Self::new(stopwords, Stemmer::create(Algorithm::English))
    }

    pub fn stopwords(&self) -> &Stopwords {
        &self.stopwords
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let stripped = PUNCT.replace_all(&lowered, "");
        stripped
            .split_whitespace()
            .filter(|t| !self.stopwords.contains(t))
            .map(|t| self.stemmer.stem(t).into_owned())
            .collect()
    }

    /// Title and description are joined without a separator.
    pub fn tokenize_document(&self, doc: &Document) -> Vec<String> {
        self.tokenize(&format!("{}{}", doc.title, doc.description))
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer").field("stopwords", &self.stopwords.len()).finish()
    }
}
