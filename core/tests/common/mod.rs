#![allow(dead_code)]

use kwsearch_core::{Document, IndexSnapshot, Tokenizer};
use serde::Deserialize;

#[derive(Deserialize)]
struct Corpus {
    movies: Vec<Document>,
}

pub fn movies() -> Vec<Document> {
    let corpus: Corpus = serde_json::from_str(include_str!("../fixtures/movies.json")).unwrap();
    corpus.movies
}

pub fn movie_index() -> (IndexSnapshot, Tokenizer) {
    let tokenizer = Tokenizer::english();
    let index = IndexSnapshot::build(&movies(), &tokenizer).unwrap();
    (index, tokenizer)
}

pub fn doc(id: u32, title: &str, description: &str) -> Document {
    Document { id, title: title.into(), description: description.into() }
}
