use anyhow::{Context, Result};
use kwsearch_core::Document;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Corpus {
    #[serde(alias = "documents")]
    movies: Vec<Document>,
}

/// Read a `{"movies": [{id, title, description}, ...]}` file.
pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let f = File::open(path).with_context(|| format!("opening corpus {}", path.display()))?;
    let corpus: Corpus = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parsing corpus {}", path.display()))?;
    tracing::info!(path = %path.display(), documents = corpus.movies.len(), "loaded corpus");
    Ok(corpus.movies)
}
