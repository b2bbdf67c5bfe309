//! Boolean lookup and TF-IDF / Okapi BM25 scoring over an [`IndexSnapshot`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::error::QueryError;
use crate::tokenizer::Tokenizer;
use crate::{DocId, IndexSnapshot};

pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// BM25 tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f64,
    /// Length normalization strength, 0 disables it.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHit {
    pub doc_id: DocId,
    pub title: String,
    pub score: f64,
}

/// Read-only query view pairing a snapshot with the tokenizer it was built with.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    index: &'a IndexSnapshot,
    tokenizer: &'a Tokenizer,
    params: Bm25Params,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a IndexSnapshot, tokenizer: &'a Tokenizer) -> Self {
        Self { index, tokenizer, params: Bm25Params::default() }
    }

    pub fn with_params(mut self, params: Bm25Params) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> Bm25Params { self.params }

    pub fn index(&self) -> &'a IndexSnapshot { self.index }

    /// Union of posting lists, ascending by id, at most `limit` entries.
    /// Merging stops as soon as the union holds `limit` ids.
    pub fn search<S: AsRef<str>>(&self, tokens: &[S], limit: usize) -> Vec<SearchHit> {
        let mut ids: BTreeSet<DocId> = BTreeSet::new();
        for token in tokens {
            if ids.len() >= limit {
                break;
            }
            if let Some(posting) = self.index.postings.get(token.as_ref()) {
                ids.extend(posting.iter().copied());
            }
        }
        ids.into_iter()
            .take(limit)
            .filter_map(|id| self.index.document(id).map(|d| SearchHit { doc_id: id, title: d.title.clone() }))
            .collect()
    }

    /// Tokenizes `query` and runs [`QueryEngine::search`].
    pub fn search_query(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let tokens = self.tokenizer.tokenize(query);
        self.search(&tokens, limit)
    }

    /// Normalizes a single-term argument. `None` when nothing survives
    /// tokenization (e.g. a stopword).
    fn single_token(&self, term: &str) -> Result<Option<String>, QueryError> {
        let mut tokens = self.tokenizer.tokenize(term);
        if tokens.len() > 1 {
            return Err(QueryError::MultiTokenQuery { term: term.to_string(), tokens });
        }
        Ok(tokens.pop())
    }

    fn df(&self, token: Option<&str>) -> f64 {
        token.map_or(0, |t| self.index.document_frequency(t)) as f64
    }

    pub fn tf(&self, doc_id: DocId, term: &str) -> Result<u32, QueryError> {
        let token = self.single_token(term)?;
        Ok(token.map_or(0, |t| self.index.term_frequency(doc_id, &t)))
    }

    /// `ln((N + 1) / (df + 1))`
    pub fn idf(&self, term: &str) -> Result<f64, QueryError> {
        let token = self.single_token(term)?;
        let n = self.index.num_docs() as f64;
        let df = self.df(token.as_deref());
        Ok(((n + 1.0) / (df + 1.0)).ln())
    }

    pub fn tfidf(&self, doc_id: DocId, term: &str) -> Result<f64, QueryError> {
        Ok(f64::from(self.tf(doc_id, term)?) * self.idf(term)?)
    }

    /// `ln((N - df + 0.5) / (df + 0.5) + 1)`. Negative for very common terms.
    pub fn bm25_idf(&self, term: &str) -> Result<f64, QueryError> {
        let token = self.single_token(term)?;
        Ok(self.bm25_idf_token(token.as_deref()))
    }

    fn bm25_idf_token(&self, token: Option<&str>) -> f64 {
        let n = self.index.num_docs() as f64;
        let df = self.df(token);
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Saturated term frequency with document length normalization.
    pub fn bm25_tf(&self, doc_id: DocId, term: &str, k1: f64, b: f64) -> Result<f64, QueryError> {
        let token = self.single_token(term)?;
        let avg = self.index.avg_doc_length()?;
        Ok(self.bm25_tf_token(doc_id, token.as_deref(), avg, Bm25Params { k1, b }))
    }

    fn bm25_tf_token(&self, doc_id: DocId, token: Option<&str>, avg_doc_length: f64, params: Bm25Params) -> f64 {
        let tf = f64::from(token.map_or(0, |t| self.index.term_frequency(doc_id, t)));
        let doc_length = f64::from(self.index.doc_length(doc_id));
        // Every document is empty when the mean is zero.
        let ratio = if avg_doc_length > 0.0 { doc_length / avg_doc_length } else { 1.0 };
        let length_norm = 1.0 - params.b + params.b * ratio;
        let denom = tf + params.k1 * length_norm;
        if denom == 0.0 {
            return 0.0;
        }
        tf * (params.k1 + 1.0) / denom
    }

    /// `bm25_idf(term) * bm25_tf(doc_id, term)` with the engine's parameters.
    pub fn bm25(&self, doc_id: DocId, term: &str) -> Result<f64, QueryError> {
        let Bm25Params { k1, b } = self.params;
        Ok(self.bm25_idf(term)? * self.bm25_tf(doc_id, term, k1, b)?)
    }

    /// Scores every document against the tokenized query and returns the best
    /// `limit`, highest score first, ties broken by ascending id.
    pub fn bm25_search(&self, query: &str, limit: usize) -> Result<Vec<RankedHit>, QueryError> {
        let tokens = self.tokenizer.tokenize(query);
        if tokens.is_empty() || self.index.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let avg = self.index.avg_doc_length()?;
        let idfs: Vec<f64> = tokens.iter().map(|t| self.bm25_idf_token(Some(t.as_str()))).collect();

        let mut scored: Vec<(DocId, f64)> = self
            .index
            .docmap
            .keys()
            .map(|&doc_id| {
                let score = tokens
                    .iter()
                    .zip(&idfs)
                    .map(|(t, idf)| idf * self.bm25_tf_token(doc_id, Some(t.as_str()), avg, self.params))
                    .sum::<f64>();
                (doc_id, score)
            })
            .collect();

        scored.sort_by(|a, b| rank_order(*a, *b));
        scored.truncate(limit);
        tracing::debug!(query, tokens = tokens.len(), hits = scored.len(), "bm25 search");

        Ok(scored
            .into_iter()
            .filter_map(|(doc_id, score)| {
                self.index.document(doc_id).map(|d| RankedHit { doc_id, title: d.title.clone(), score })
            })
            .collect())
    }
}

fn rank_order(a: (DocId, f64), b: (DocId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stopwords::Stopwords;
    use crate::tokenizer::NoStemming;
    use crate::Document;

    fn plain() -> Tokenizer {
        Tokenizer::new(Stopwords::parse("the\na"), NoStemming)
    }

    fn corpus() -> Vec<Document> {
        vec![
            Document { id: 3, title: "".into(), description: "fox fox den".into() },
            Document { id: 1, title: "".into(), description: "fox hound".into() },
            Document { id: 2, title: "".into(), description: "hound cat bird".into() },
        ]
    }

    #[test]
    fn search_stops_merging_once_limit_reached() {
        let t = plain();
        let index = IndexSnapshot::build(&corpus(), &t).unwrap();
        let engine = QueryEngine::new(&index, &t);
        // "fox" already fills the budget, so "bird" is never merged.
        let hits = engine.search(&["fox", "bird"], 2);
        assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(engine.search(&["fox", "bird"], 10).len(), 3);
        assert!(engine.search(&["fox"], 0).is_empty());
    }

    #[test]
    fn stopword_term_counts_as_absent() {
        let t = plain();
        let index = IndexSnapshot::build(&corpus(), &t).unwrap();
        let engine = QueryEngine::new(&index, &t);
        assert_eq!(engine.tf(3, "the").unwrap(), 0);
        assert!((engine.idf("the").unwrap() - (4.0f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn zero_length_corpus_does_not_divide_by_zero() {
        let t = plain();
        let docs = vec![Document { id: 1, title: "The".into(), description: "".into() }];
        let index = IndexSnapshot::build(&docs, &t).unwrap();
        let engine = QueryEngine::new(&index, &t);
        assert_eq!(engine.bm25_tf(1, "fox", 1.5, 0.75).unwrap(), 0.0);
    }

    #[test]
    fn equal_scores_rank_by_id() {
        assert_eq!(rank_order((5, 1.0), (2, 1.0)), Ordering::Greater);
        assert_eq!(rank_order((5, 2.0), (2, 1.0)), Ordering::Less);
    }
}
