use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{IndexError, QueryError};
use crate::tokenizer::Tokenizer;

pub type DocId = u32;

pub type Postings = BTreeMap<String, BTreeSet<DocId>>;
pub type DocMap = BTreeMap<DocId, Document>;
pub type TermFrequencies = BTreeMap<DocId, BTreeMap<String, u32>>;
pub type DocLengths = BTreeMap<DocId, u32>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub description: String,
}

/// Immutable inverted index: postings, document map, per-document term
/// frequencies and lengths. Produced by [`IndexSnapshot::build`] or
/// [`crate::persist::load`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSnapshot {
    pub(crate) postings: Postings,
    pub(crate) docmap: DocMap,
    pub(crate) term_frequencies: TermFrequencies,
    pub(crate) doc_lengths: DocLengths,
}

impl IndexSnapshot {
    pub fn new() -> Self { Self::default() }

    pub fn build(corpus: &[Document], tokenizer: &Tokenizer) -> Result<Self, IndexError> {
        let mut index = Self::new();
        for doc in corpus {
            if index.docmap.contains_key(&doc.id) {
                return Err(IndexError::DuplicateDocument(doc.id));
            }
            index.add_document(doc.clone(), tokenizer)?;
        }
        tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "built index");
        Ok(index)
    }

    fn add_document(&mut self, doc: Document, tokenizer: &Tokenizer) -> Result<(), IndexError> {
        let tokens = tokenizer.tokenize_document(&doc);
        let length = length_u32(doc.id, tokens.len())?;
        let mut tf_counts: BTreeMap<String, u32> = BTreeMap::new();
        for token in tokens.iter() {
            *tf_counts.entry(token.clone()).or_insert(0) += 1;
        }
        for term in tf_counts.keys() {
            self.postings.entry(term.clone()).or_default().insert(doc.id);
        }
        self.doc_lengths.insert(doc.id, length);
        self.term_frequencies.insert(doc.id, tf_counts);
        self.docmap.insert(doc.id, doc);
        Ok(())
    }

    pub(crate) fn from_parts(
        postings: Postings,
        docmap: DocMap,
        term_frequencies: TermFrequencies,
        doc_lengths: DocLengths,
    ) -> Self {
        Self { postings, docmap, term_frequencies, doc_lengths }
    }

    /// Document ids containing `token`, ascending.
    pub fn get_documents(&self, token: &str) -> Vec<DocId> {
        self.postings
            .get(token)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.docmap.get(&doc_id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.docmap.values()
    }

    /// Occurrences of `token` in the document; 0 when either is unknown.
    pub fn term_frequency(&self, doc_id: DocId, token: &str) -> u32 {
        self.term_frequencies
            .get(&doc_id)
            .and_then(|tf| tf.get(token))
            .copied()
            .unwrap_or(0)
    }

    pub fn document_frequency(&self, token: &str) -> usize {
        self.postings.get(token).map_or(0, |ids| ids.len())
    }

    /// Token count of the document; 0 when unknown.
    pub fn doc_length(&self, doc_id: DocId) -> u32 {
        self.doc_lengths.get(&doc_id).copied().unwrap_or(0)
    }

    /// Arithmetic mean over all document lengths.
    pub fn avg_doc_length(&self) -> Result<f64, QueryError> {
        if self.doc_lengths.is_empty() {
            return Err(QueryError::EmptyIndex);
        }
        let total: u64 = self.doc_lengths.values().map(|&l| u64::from(l)).sum();
        Ok(total as f64 / self.doc_lengths.len() as f64)
    }

    pub fn num_docs(&self) -> usize { self.docmap.len() }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.docmap.is_empty() }

    pub fn postings(&self) -> &Postings { &self.postings }

    pub fn docmap(&self) -> &DocMap { &self.docmap }

    pub fn term_frequencies(&self) -> &TermFrequencies { &self.term_frequencies }

    pub fn doc_lengths(&self) -> &DocLengths { &self.doc_lengths }

    /// Checks that every document has one frequency and one length entry and
    /// that every counted token points back at the document.
    pub fn check_consistency(&self) -> Result<(), String> {
        if !self.term_frequencies.keys().eq(self.docmap.keys()) {
            return Err("term frequency ids differ from document ids".into());
        }
        if !self.doc_lengths.keys().eq(self.docmap.keys()) {
            return Err("document length ids differ from document ids".into());
        }
        for (doc_id, tf) in self.term_frequencies.iter() {
            let total: u64 = tf.values().map(|&c| u64::from(c)).sum();
            if total != u64::from(self.doc_length(*doc_id)) {
                return Err(format!("document {doc_id} length does not match its term counts"));
            }
            if let Some(term) = tf.keys().find(|t| !self.postings.get(*t).is_some_and(|ids| ids.contains(doc_id))) {
                return Err(format!("term {term:?} of document {doc_id} has no posting"));
            }
        }
        for (term, ids) in self.postings.iter() {
            if let Some(doc_id) = ids.iter().find(|id| self.term_frequency(**id, term) == 0) {
                return Err(format!("posting {term:?} -> {doc_id} has no term count"));
            }
        }
        Ok(())
    }
}

fn length_u32(id: DocId, tokens: usize) -> Result<u32, IndexError> {
    u32::try_from(tokens).map_err(|_| IndexError::DocumentTooLong { id, tokens })
}
