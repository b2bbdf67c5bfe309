use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kwsearch_core::persist::{load, save, stopwords_match, IndexPaths};
use kwsearch_core::{
    Bm25Params, DocId, IndexSnapshot, QueryEngine, Stopwords, Tokenizer, DEFAULT_SEARCH_LIMIT,
};
use std::io::Write;
use std::path::PathBuf;

pub mod corpus;

#[derive(Parser, Debug)]
#[command(name = "kwsearch")]
#[command(about = "Keyword search over a movie corpus with TF-IDF and BM25", long_about = None)]
pub struct Cli {
    /// Directory holding the persisted index artifacts
    #[arg(long, global = true, env = "KWSEARCH_CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,
    /// Corpus file read by `build`
    #[arg(long, global = true, env = "KWSEARCH_DATA", default_value = "data/movies.json")]
    pub data: PathBuf,
    /// Newline-delimited stopword list, replaces the embedded English list
    #[arg(long, global = true, env = "KWSEARCH_STOPWORDS")]
    pub stopwords: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the inverted index from the corpus and save it
    Build,
    #[command(flatten)]
    Query(QueryCommand),
}

/// Commands answered from a previously built index.
#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// Boolean-OR keyword lookup, ascending by document id
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Ranked BM25 search
    Bm25search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Raw term frequency of a term in a document
    Tf { doc_id: DocId, term: String },
    /// Inverse document frequency of a term
    Idf { term: String },
    /// TF-IDF of a term in a document
    Tfidf { doc_id: DocId, term: String },
    /// BM25 inverse document frequency of a term
    Bm25idf { term: String },
    /// BM25 saturated term frequency of a term in a document
    Bm25tf {
        doc_id: DocId,
        term: String,
        #[arg(default_value_t = Bm25Params::default().k1)]
        k1: f64,
        #[arg(default_value_t = Bm25Params::default().b)]
        b: f64,
    },
}

impl Cli {
    pub fn tokenizer(&self) -> Result<Tokenizer> {
        let stopwords = match &self.stopwords {
            Some(path) => Stopwords::load(path).with_context(|| format!("reading stopwords {}", path.display()))?,
            None => Stopwords::english(),
        };
        Ok(Tokenizer::english_with_stopwords(stopwords))
    }
}

/// Execute one command, writing user-facing output to `out`.
pub fn run(cli: &Cli, command: &Commands, out: &mut impl Write) -> Result<()> {
    let tokenizer = cli.tokenizer()?;
    let paths = IndexPaths::new(&cli.cache_dir);
    match command {
        Commands::Build => build(cli, &tokenizer, &paths, out),
        Commands::Query(query) => {
            let index = load(&paths)?;
            if !stopwords_match(&paths, &tokenizer)? {
                tracing::warn!(root = %paths.root.display(), "index was built with a different stopword list");
            }
            answer(&QueryEngine::new(&index, &tokenizer), query, out)
        }
    }
}

fn build(cli: &Cli, tokenizer: &Tokenizer, paths: &IndexPaths, out: &mut impl Write) -> Result<()> {
    let docs = corpus::load_corpus(&cli.data)?;
    let index = IndexSnapshot::build(&docs, tokenizer)?;
    save(paths, &index, tokenizer)?;
    writeln!(out, "Indexed {} documents ({} terms) into {}", index.num_docs(), index.num_terms(), paths.root.display())?;
    Ok(())
}

fn answer(engine: &QueryEngine<'_>, command: &QueryCommand, out: &mut impl Write) -> Result<()> {
    match command {
        QueryCommand::Search { query, limit } => {
            writeln!(out, "Searching for: {query}")?;
            for hit in engine.search_query(query, *limit) {
                writeln!(out, "id {}: {}", hit.doc_id, hit.title)?;
            }
        }
        QueryCommand::Bm25search { query, limit } => {
            writeln!(out, "Searching for: {query}")?;
            for (rank, hit) in engine.bm25_search(query, *limit)?.iter().enumerate() {
                writeln!(out, "{}. ({}) {} - Score: {:.2}", rank + 1, hit.doc_id, hit.title, hit.score)?;
            }
        }
        QueryCommand::Tf { doc_id, term } => {
            writeln!(out, "Term frequency of '{term}' in document '{doc_id}': {}", engine.tf(*doc_id, term)?)?;
        }
        QueryCommand::Idf { term } => {
            writeln!(out, "Inverse document frequency of '{term}': {:.2}", engine.idf(term)?)?;
        }
        QueryCommand::Tfidf { doc_id, term } => {
            writeln!(out, "TF-IDF score of '{term}' in document '{doc_id}': {:.2}", engine.tfidf(*doc_id, term)?)?;
        }
        QueryCommand::Bm25idf { term } => {
            writeln!(out, "BM25 IDF score of '{term}': {:.2}", engine.bm25_idf(term)?)?;
        }
        QueryCommand::Bm25tf { doc_id, term, k1, b } => {
            let score = engine.bm25_tf(*doc_id, term, *k1, *b)?;
            writeln!(out, "BM25 TF score of '{term}' in document '{doc_id}': {score:.2}")?;
        }
    }
    Ok(())
}
