// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::{Parser, Subcommand};
use mds_journal::EventKind;
use mds_journal_cli::commands::{inspect, verify};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mds-journal")]
#[command(about = "Inspect and verify metadata server journals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the live events of a journal file
    Inspect {
        path: PathBuf,

        /// Only show events of this kind (e.g. Unlink)
        #[arg(long, short, value_parser = parse_kind)]
        kind: Option<EventKind>,
    },
    /// Decode every live event and dry-run its replay
    Verify { path: PathBuf },
}

fn parse_kind(s: &str) -> Result<EventKind, String> {
    (1..=5)
        .filter_map(EventKind::from_tag)
        .find(|k| k.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown event kind '{}'", s))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { path, kind } => inspect::run(&path, kind),
        Commands::Verify { path } => verify::run(&path),
    }
}
