//! atref - `@file` mentions for any editor
//!
//! Runs a language server that completes `@` mentions with workspace files,
//! turns mentions of existing files into links and shows a preview on hover.

use clap::{Parser, Subcommand};
use eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "atref", version, about)]
struct Args {
    /// Subcommand to run (default: lsp)
    #[command(subcommand)]
    command: Option<Command>,
}

/// Subcommands
#[derive(Debug, Subcommand)]
enum Command {
    /// Run the language server over stdio
    Lsp {
        /// Workspace root (default: the client's workspace folder)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Path to config file (default: .config/atref/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the mentions of files and report the ones that don't resolve
    Check {
        /// Files to scan
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also list mentions that resolve
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();

    match args.command.unwrap_or(Command::Lsp {
        root: None,
        config: None,
    }) {
        Command::Lsp { root, config } => {
            // One thread: every request runs to completion before the next
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(atref::lsp::run(root, config))
        }
        Command::Check { files, verbose } => {
            let summary = atref::check::run(&files, verbose)?;
            if summary.unresolved > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Log to stderr; stdout carries the LSP stream.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("ATREF_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
