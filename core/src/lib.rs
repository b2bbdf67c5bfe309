//! Inverted index with TF-IDF and Okapi BM25 ranking for small corpora.

pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod stopwords;
pub mod tokenizer;

pub use error::{IndexError, PersistError, QueryError};
pub use index::{DocId, DocLengths, DocMap, Document, IndexSnapshot, Postings, TermFrequencies};
pub use query::{Bm25Params, QueryEngine, RankedHit, SearchHit, DEFAULT_SEARCH_LIMIT};
pub use stopwords::Stopwords;
pub use tokenizer::{NoStemming, Stem, Tokenizer};
