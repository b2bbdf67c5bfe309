use anyhow::Result;
use clap::{CommandFactory, Parser};
use kwsearch_cli::{run, Cli};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    // Usage problems print help and exit cleanly.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print()?;
            return Ok(());
        }
    };
    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let stdout = std::io::stdout();
    run(&cli, command, &mut stdout.lock())
}
