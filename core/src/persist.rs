use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::PersistError;
use crate::{DocLengths, DocMap, IndexSnapshot, Postings, TermFrequencies, Tokenizer};

/// On-disk format version written into every artifact.
pub const FORMAT_VERSION: u32 = 1;

pub const POSTINGS: &str = "postings";
pub const DOCMAP: &str = "docmap";
pub const TERM_FREQUENCIES: &str = "term_frequencies";
pub const DOC_LENGTHS: &str = "doc_lengths";

const ARTIFACTS: [&str; 4] = [POSTINGS, DOCMAP, TERM_FREQUENCIES, DOC_LENGTHS];

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    /// Fingerprint of the stopword list the index was built with.
    #[serde(default)]
    pub stopwords: Option<String>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    artifact: &'a str,
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    artifact: String,
    version: u32,
    data: T,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn artifact(&self, name: &str) -> PathBuf { self.root.join(format!("{name}.json")) }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io { path: path.to_path_buf(), source }
}

/// Serialize to a temporary sibling, then rename over the target. The
/// temporary file is removed if anything fails before the rename.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err(dir))?;
    {
        let mut w = BufWriter::new(&mut tmp);
        serde_json::to_writer_pretty(&mut w, value)
            .map_err(|source| PersistError::Json { path: path.to_path_buf(), source })?;
        w.flush().map_err(io_err(path))?;
    }
    tmp.persist(path).map_err(|e| PersistError::Io { path: path.to_path_buf(), source: e.error })?;
    Ok(())
}

fn count_u32(what: &'static str, count: usize) -> Result<u32, PersistError> {
    u32::try_from(count).map_err(|_| PersistError::CountOverflow { what, count })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let f = File::open(path).map_err(io_err(path))?;
    serde_json::from_reader(BufReader::new(f))
        .map_err(|source| PersistError::Json { path: path.to_path_buf(), source })
}

fn save_artifact<T: Serialize>(paths: &IndexPaths, name: &'static str, data: &T) -> Result<(), PersistError> {
    let path = paths.artifact(name);
    write_json(&path, &EnvelopeRef { artifact: name, version: FORMAT_VERSION, data })?;
    tracing::debug!(artifact = name, path = %path.display(), "saved artifact");
    Ok(())
}

fn load_artifact<T: DeserializeOwned>(paths: &IndexPaths, name: &'static str) -> Result<T, PersistError> {
    let path = paths.artifact(name);
    let envelope: Envelope<T> = read_json(&path)?;
    if envelope.artifact != name {
        return Err(PersistError::WrongArtifact { path, expected: name, found: envelope.artifact });
    }
    if envelope.version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion {
            artifact: name,
            found: envelope.version,
            supported: FORMAT_VERSION,
        });
    }
    tracing::debug!(artifact = name, "loaded artifact");
    Ok(envelope.data)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<(), PersistError> {
    create_dir_all(&paths.root).map_err(io_err(&paths.root))?;
    write_json(&paths.meta(), meta)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile, PersistError> {
    read_json(&paths.meta())
}

/// Write all four structures plus the manifest under `paths.root`, creating
/// the directory when absent. The manifest records which stopword list
/// `tokenizer` used.
pub fn save(paths: &IndexPaths, index: &IndexSnapshot, tokenizer: &Tokenizer) -> Result<(), PersistError> {
    create_dir_all(&paths.root).map_err(io_err(&paths.root))?;
    save_artifact(paths, POSTINGS, index.postings())?;
    save_artifact(paths, DOCMAP, index.docmap())?;
    save_artifact(paths, TERM_FREQUENCIES, index.term_frequencies())?;
    save_artifact(paths, DOC_LENGTHS, index.doc_lengths())?;
    let meta = MetaFile {
        num_docs: count_u32("document", index.num_docs())?,
        num_terms: count_u32("term", index.num_terms())?,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: FORMAT_VERSION,
        stopwords: Some(tokenizer.stopwords().fingerprint()),
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "index saved");
    Ok(())
}

/// Whether `tokenizer` drops the same stopwords the saved index was built
/// with. Manifests without a fingerprint are assumed to match.
pub fn stopwords_match(paths: &IndexPaths, tokenizer: &Tokenizer) -> Result<bool, PersistError> {
    if !paths.meta().is_file() {
        return Ok(true);
    }
    let meta = load_meta(paths)?;
    Ok(meta.stopwords.map_or(true, |saved| saved == tokenizer.stopwords().fingerprint()))
}

/// Read every artifact back into a snapshot.
pub fn load(paths: &IndexPaths) -> Result<IndexSnapshot, PersistError> {
    let present: Vec<bool> = ARTIFACTS.iter().map(|name| paths.artifact(name).is_file()).collect();
    if !present.iter().any(|p| *p) {
        return Err(PersistError::IndexNotBuilt { root: paths.root.clone() });
    }
    if let Some((name, _)) = ARTIFACTS.iter().zip(&present).find(|(_, p)| !**p) {
        return Err(PersistError::MissingArtifact(*name));
    }

    let postings: Postings = load_artifact(paths, POSTINGS)?;
    let docmap: DocMap = load_artifact(paths, DOCMAP)?;
    let term_frequencies: TermFrequencies = load_artifact(paths, TERM_FREQUENCIES)?;
    let doc_lengths: DocLengths = load_artifact(paths, DOC_LENGTHS)?;

    let index = IndexSnapshot::from_parts(postings, docmap, term_frequencies, doc_lengths);
    index.check_consistency().map_err(PersistError::Inconsistent)?;
    tracing::info!(root = %paths.root.display(), num_docs = index.num_docs(), num_terms = index.num_terms(), "index loaded");
    Ok(index)
}
