use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use kwsearch_core::{Stopwords, Tokenizer};
use kwsearch_server::{build_app, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./cache")]
    index: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Stopword list used when the index was built
    #[arg(long)]
    stopwords: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
    let args = Args::parse();
    let tokenizer = match &args.stopwords {
        Some(path) => Tokenizer::english_with_stopwords(
            Stopwords::load(path).with_context(|| format!("reading stopwords {}", path.display()))?,
        ),
        None => Tokenizer::english(),
    };
    let app: Router = build_app(ServerConfig::from_env(&args.index), tokenizer)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
