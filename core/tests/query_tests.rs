mod common;

use common::{doc, movie_index};
use kwsearch_core::{Bm25Params, IndexSnapshot, NoStemming, QueryEngine, QueryError, Stopwords, Tokenizer};

fn plain() -> Tokenizer {
    Tokenizer::new(Stopwords::parse("the\na\nof"), NoStemming)
}

#[test]
fn tf_counts_occurrences() {
    let (index, tokenizer) = movie_index();
    let engine = QueryEngine::new(&index, &tokenizer);
    assert_eq!(engine.tf(4651, "merida").unwrap(), 2);
    assert_eq!(engine.tf(4651, "Merida!").unwrap(), 2);
    assert_eq!(engine.tf(4651, "zzzznotaword").unwrap(), 0);
    assert_eq!(engine.tf(999_999, "merida").unwrap(), 0);
}

#[test]
fn single_term_operations_reject_phrases() {
    let (index, tokenizer) = movie_index();
    let engine = QueryEngine::new(&index, &tokenizer);
    let err = engine.tf(4651, "princess merida").unwrap_err();
    assert!(matches!(err, QueryError::MultiTokenQuery { ref tokens, .. } if tokens.len() == 2));
    assert!(engine.idf("princess merida").is_err());
    assert!(engine.tfidf(4651, "princess merida").is_err());
    assert!(engine.bm25_idf("princess merida").is_err());
    assert!(engine.bm25_tf(4651, "princess merida", 1.5, 0.75).is_err());
}

#[test]
fn search_returns_all_matches_under_limit() {
    let (index, tokenizer) = movie_index();
    let engine = QueryEngine::new(&index, &tokenizer);
    let tokens = tokenizer.tokenize("young");
    assert_eq!(index.get_documents(&tokens[0]).len(), 3);
    let hits = engine.search(&tokens, 5);
    assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![12, 862, 10191]);
    assert_eq!(hits[1].title, "Toy Story");
}

#[test]
fn search_truncates_to_exactly_limit() {
    let t = plain();
    let docs: Vec<_> = (1..=8).map(|id| doc(id, "", "shared")).collect();
    let index = IndexSnapshot::build(&docs, &t).unwrap();
    let engine = QueryEngine::new(&index, &t);
    let hits = engine.search_query("shared", 5);
    assert_eq!(hits.len(), 5);
    assert_eq!(hits.last().map(|h| h.doc_id), Some(5));
}

#[test]
fn idf_matches_formula_and_decreases_with_df() {
    let t = plain();
    let docs = vec![
        doc(1, "", "rare common often"),
        doc(2, "", "common often"),
        doc(3, "", "often"),
        doc(4, "", "filler"),
    ];
    let index = IndexSnapshot::build(&docs, &t).unwrap();
    let engine = QueryEngine::new(&index, &t);
    let rare = engine.idf("rare").unwrap();
    let common = engine.idf("common").unwrap();
    let often = engine.idf("often").unwrap();
    let missing = engine.idf("missing").unwrap();
    assert!((rare - (5.0f64 / 2.0).ln()).abs() < 1e-12);
    assert!(missing >= rare && rare >= common && common >= often);
    assert!(often >= 0.0);
    assert!((engine.tfidf(1, "rare").unwrap() - rare).abs() < 1e-12);
}

#[test]
fn bm25_idf_matches_formula() {
    let t = plain();
    let docs = vec![doc(1, "", "x y"), doc(2, "", "x"), doc(3, "", "z")];
    let index = IndexSnapshot::build(&docs, &t).unwrap();
    let engine = QueryEngine::new(&index, &t);
    let expected = ((3.0 - 2.0 + 0.5) / (2.0 + 0.5) + 1.0f64).ln();
    assert!((engine.bm25_idf("x").unwrap() - expected).abs() < 1e-12);
    assert!(engine.bm25_idf("y").unwrap() > engine.bm25_idf("x").unwrap());
}

#[test]
fn bm25_tf_at_average_length_has_unit_norm() {
    let t = plain();
    let docs = vec![doc(1, "", "a1 a2"), doc(2, "", "cat cat dog eel"), doc(3, "", "b1 b2 b3 b4 b5 b6")];
    let index = IndexSnapshot::build(&docs, &t).unwrap();
    assert_eq!(index.avg_doc_length().unwrap(), 4.0);
    let engine = QueryEngine::new(&index, &t);
    let (k1, b) = (1.5, 0.75);
    let tf = 2.0;
    let expected = tf * (k1 + 1.0) / (tf + k1);
    assert!((engine.bm25_tf(2, "cat", k1, b).unwrap() - expected).abs() < 1e-12);
    // Longer than average documents are penalised.
    let long = IndexSnapshot::build(&[doc(1, "", "cat"), doc(2, "", "cat pad pad pad pad")], &t).unwrap();
    let engine = QueryEngine::new(&long, &t);
    assert!(engine.bm25_tf(1, "cat", k1, b).unwrap() > engine.bm25_tf(2, "cat", k1, b).unwrap());
    // b = 0 disables length normalization.
    assert_eq!(engine.bm25_tf(1, "cat", k1, 0.0).unwrap(), engine.bm25_tf(2, "cat", k1, 0.0).unwrap());
}

#[test]
fn bm25_combines_idf_and_tf() {
    let (index, tokenizer) = movie_index();
    let engine = QueryEngine::new(&index, &tokenizer);
    let params = Bm25Params::default();
    let expected = engine.bm25_idf("merida").unwrap() * engine.bm25_tf(4651, "merida", params.k1, params.b).unwrap();
    assert!((engine.bm25(4651, "merida").unwrap() - expected).abs() < 1e-12);
    assert_eq!(engine.bm25(12, "merida").unwrap(), 0.0);
}

#[test]
fn bm25_on_empty_index_reports_empty() {
    let t = plain();
    let index = IndexSnapshot::new();
    let engine = QueryEngine::new(&index, &t);
    assert_eq!(engine.bm25_tf(1, "cat", 1.5, 0.75), Err(QueryError::EmptyIndex));
    assert_eq!(engine.bm25(1, "cat"), Err(QueryError::EmptyIndex));
    assert!(engine.bm25_search("cat", 5).unwrap().is_empty());
}

#[test]
fn phrase_on_empty_index_is_rejected_before_emptiness() {
    let t = plain();
    let index = IndexSnapshot::new();
    let engine = QueryEngine::new(&index, &t);
    assert!(matches!(engine.bm25_tf(1, "cat dog", 1.5, 0.75), Err(QueryError::MultiTokenQuery { .. })));
    assert!(matches!(engine.bm25(1, "cat dog"), Err(QueryError::MultiTokenQuery { .. })));
}

#[test]
fn bm25_search_ranks_by_descending_score() {
    let (index, tokenizer) = movie_index();
    let engine = QueryEngine::new(&index, &tokenizer);
    let all = engine.bm25_search("young dragon", index.num_docs()).unwrap();
    assert_eq!(all.len(), index.num_docs());
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(all[0].doc_id, 10191);
    assert!(all.iter().all(|h| all[0].score >= h.score));

    let top = engine.bm25_search("young dragon", 2).unwrap();
    assert_eq!(top, all[..2].to_vec());
}

#[test]
fn bm25_search_breaks_ties_by_id() {
    let t = plain();
    let docs = vec![doc(30, "", "owl"), doc(10, "", "owl"), doc(20, "", "owl")];
    let index = IndexSnapshot::build(&docs, &t).unwrap();
    let engine = QueryEngine::new(&index, &t);
    let hits = engine.bm25_search("owl", 3).unwrap();
    assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![10, 20, 30]);
}

#[test]
fn bm25_search_without_query_tokens_is_empty() {
    let (index, tokenizer) = movie_index();
    let engine = QueryEngine::new(&index, &tokenizer);
    assert!(engine.bm25_search("the of and", 5).unwrap().is_empty());
}

#[test]
fn custom_params_change_scores() {
    let (index, tokenizer) = movie_index();
    let default = QueryEngine::new(&index, &tokenizer);
    let flat = default.with_params(Bm25Params { k1: 1.5, b: 0.0 });
    assert_eq!(flat.params().b, 0.0);
    assert_ne!(default.bm25(4651, "merida").unwrap(), flat.bm25(4651, "merida").unwrap());
}
