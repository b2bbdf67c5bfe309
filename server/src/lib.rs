use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use kwsearch_core::persist::{load, stopwords_match, IndexPaths};
use kwsearch_core::{DocId, IndexSnapshot, PersistError, QueryEngine, Tokenizer};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const SNIPPET_BEFORE: usize = 100;
const SNIPPET_AFTER: usize = 200;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
    pub snippet: Option<String>,
}

#[derive(Serialize)]
pub struct LookupResponse {
    pub query: String,
    pub took_s: f64,
    pub results: Vec<kwsearch_core::SearchHit>,
}

/// Server settings. `from_env` reads `ADMIN_TOKEN` and `CORS_ALLOW_ORIGIN`.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub index_dir: PathBuf,
    pub admin_token: Option<String>,
    /// Comma-separated origins; any origin when unset or unparsable.
    pub cors_allow_origin: Option<String>,
}

impl ServerConfig {
    pub fn from_env(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index_paths_root: PathBuf,
    /// Current snapshot. Readers clone the inner `Arc`; reload swaps it.
    pub snapshot: Arc<RwLock<Arc<IndexSnapshot>>>,
    pub tokenizer: Arc<Tokenizer>,
    pub admin_token: Option<String>,
}

impl AppState {
    fn current(&self) -> Arc<IndexSnapshot> {
        self.snapshot.read().clone()
    }
}

pub fn build_app(config: ServerConfig, tokenizer: Tokenizer) -> Result<Router> {
    // Load the index at startup
    let paths = IndexPaths::new(&config.index_dir);
    let snapshot = load(&paths)?;
    warn_on_stopword_mismatch(&paths, &tokenizer);
    let app_state = AppState {
        index_paths_root: config.index_dir.clone(),
        snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
        tokenizer: Arc::new(tokenizer),
        admin_token: config.admin_token.clone(),
    };

    let cors = match &config.cors_allow_origin {
        Some(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/lookup", get(lookup_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

/// BM25 ranked search. Documents scoring zero are not hits.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let snapshot = state.current();
    let engine = QueryEngine::new(&snapshot, &state.tokenizer);

    let ranked = engine
        .bm25_search(&params.q, snapshot.num_docs())
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let hits: Vec<_> = ranked.into_iter().filter(|h| h.score > 0.0).collect();
    let total_hits = hits.len();
    let k = params.k.clamp(1, 100);

    let raw_terms: Vec<String> = params.q.split_whitespace().map(|s| s.to_string()).collect();
    let results = hits
        .into_iter()
        .take(k)
        .map(|hit| {
            let snippet = snapshot
                .document(hit.doc_id)
                .and_then(|doc| snippet_from_text(&doc.description, &raw_terms));
            SearchHit { doc_id: hit.doc_id, score: hit.score, title: hit.title, snippet }
        })
        .collect();

    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, total_hits, "search");
    Ok(Json(SearchResponse { query: params.q, took_ms: elapsed.as_millis(), took_s: elapsed.as_secs_f64(), total_hits, results }))
}

/// Boolean-OR lookup ordered by document id.
pub async fn lookup_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<LookupResponse> {
    let start = std::time::Instant::now();
    let snapshot = state.current();
    let results = QueryEngine::new(&snapshot, &state.tokenizer).search_query(&params.q, params.k);
    Json(LookupResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), results })
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let snapshot = state.current();
    let doc = snapshot
        .document(doc_id)
        .ok_or((StatusCode::NOT_FOUND, format!("document {doc_id} not found")))?;
    Ok(Json(serde_json::json!({
        "doc_id": doc.id,
        "title": doc.title,
        "description": doc.description,
        "length": snapshot.doc_length(doc_id),
    })))
}

/// Re-read the artifacts from disk and swap them in. In-flight requests keep
/// the snapshot they started with.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let paths = IndexPaths::new(&state.index_paths_root);
    let tokenizer = state.tokenizer.clone();
    let fresh = tokio::task::spawn_blocking(move || {
        let fresh = load(&paths)?;
        warn_on_stopword_mismatch(&paths, &tokenizer);
        Ok::<_, PersistError>(fresh)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let (num_docs, num_terms) = (fresh.num_docs(), fresh.num_terms());
    *state.snapshot.write() = Arc::new(fresh);
    tracing::info!(num_docs, num_terms, "index reloaded");
    Ok(Json(serde_json::json!({ "reloaded": true, "num_docs": num_docs, "num_terms": num_terms })))
}

fn warn_on_stopword_mismatch(paths: &IndexPaths, tokenizer: &Tokenizer) {
    match stopwords_match(paths, tokenizer) {
        Ok(true) => {}
        Ok(false) => tracing::warn!(root = %paths.root.display(), "index was built with a different stopword list"),
        Err(e) => tracing::warn!(error = %e, "could not read index manifest"),
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

fn snippet_from_text(text: &str, raw_terms: &[String]) -> Option<String> {
    if text.is_empty() { return None; }
    let first_idx = raw_terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .find_map(|t| case_insensitive(t).and_then(|re| re.find(text)).map(|m| m.start()));
    let snippet = match first_idx {
        Some(idx) => {
            let start = text[..idx].char_indices().rev().take(SNIPPET_BEFORE).last().map_or(idx, |(i, _)| i);
            let end = text[idx..].char_indices().nth(SNIPPET_AFTER).map_or(text.len(), |(i, _)| idx + i);
            &text[start..end]
        }
        None => text.char_indices().nth(SNIPPET_AFTER).map_or(text, |(i, _)| &text[..i]),
    };
    Some(highlight_terms(snippet, raw_terms))
}

fn case_insensitive(term: &str) -> Option<regex::Regex> {
    regex::RegexBuilder::new(&regex::escape(term)).case_insensitive(true).build().ok()
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut s = snippet.to_string();
    for t in terms {
        if t.trim().is_empty() { continue; }
        if let Some(pat) = case_insensitive(t) {
            s = pat.replace_all(&s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string();
        }
    }
    s
}
