use lazy_static::lazy_static;
use sha1::{Digest, Sha1};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

const DEFAULT_LIST: &str = include_str!("../data/stopwords.txt");

lazy_static! {
    static ref DEFAULT: Stopwords = Stopwords::parse(DEFAULT_LIST);
}

/// Fixed set of words dropped by the tokenizer before stemming.
#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// Parse a newline-delimited list. Blank lines are skipped and entries are
    /// trimmed and lowercased.
    pub fn parse(list: &str) -> Self {
        let words = list
            .lines()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        Self { words }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let stopwords = Self::parse(&text);
        tracing::debug!(path = %path.as_ref().display(), words = stopwords.len(), "loaded stopwords");
        Ok(stopwords)
    }

    /// The embedded English list.
    pub fn english() -> Self {
        DEFAULT.clone()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Hex SHA-1 of the sorted words, independent of file order and casing.
    pub fn fingerprint(&self) -> String {
        let mut words: Vec<&str> = self.words.iter().map(String::as_str).collect();
        words.sort_unstable();
        format!("{:x}", Sha1::digest(words.join("\n").as_bytes()))
    }
}
