use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{CommandReport, run, status};

#[derive(Debug, Parser)]
#[command(
    name = "diary-digest",
    version,
    about = "Fetch diaries from Google Drive and generate monthly and yearly AI summaries"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the summarization pipeline
    Run {
        /// Use the local raw-text cache only; never scan the remote store
        #[arg(long, conflicts_with = "scan")]
        cache_only: bool,
        /// Scan the remote store for documents, updating the local cache
        #[arg(long)]
        scan: bool,
        /// Drive folder to scan (overrides FOLDER_ID)
        #[arg(long)]
        folder_id: Option<String>,
        /// Directory for caches and summaries (overrides DIGEST_OUTPUT_DIR)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Report which caches and summaries already exist locally
    Status {
        /// Directory for caches and summaries (overrides DIGEST_OUTPUT_DIR)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn print_report(report: &CommandReport) {
    for detail in &report.details {
        println!("{}: {detail}", report.command);
    }
    for issue in &report.issues {
        eprintln!("{}: issue: {issue}", report.command);
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Run {
            cache_only,
            scan,
            folder_id,
            output_dir,
        } => run::run(&run::RunOptions {
            cache_only,
            scan,
            folder_id,
            output_dir,
        })?,
        Command::Status { output_dir } => status::run(&status::StatusOptions { output_dir })?,
    };

    print_report(&report);
    if !report.ok {
        anyhow::bail!("{} finished with issues", report.command);
    }
    Ok(())
}
