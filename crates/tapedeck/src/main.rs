use std::io::Write;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tapedeck::{cli, runtime};

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let _ = ctrlc::set_handler(|| {
        // Leave the progress line so the shell prompt starts clean.
        let mut out = std::io::stdout();
        let _ = writeln!(out);
        let _ = out.flush();
        std::process::exit(130);
    });

    runtime::run(args)?;
    Ok(())
}
