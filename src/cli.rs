use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "archivist",
    version,
    about = "Moves rotated *.log.gz files into year/month archive directories"
)]
struct Cli {
    /// Directory holding the rotated logs; overrides config and ARCHIVIST_LOGS_DIR.
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single archive cycle now.
    Once {
        /// Show where each file would go without moving anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Run cycles forever: initial delay, then every interval.
    Watch,
    /// Show configuration, pending files and watcher state.
    Status,
    /// Stop a running watcher.
    Stop,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let logs_dir = cli.logs_dir.as_deref();
    let report = match cli.command {
        Command::Once { dry_run } => {
            commands::archive_once::run(logs_dir, &commands::archive_once::OnceOptions { dry_run })?
        }
        Command::Watch => commands::archive_watch::run(logs_dir)?,
        Command::Status => commands::archive_status::run(logs_dir)?,
        Command::Stop => commands::archive_stop::run(logs_dir)?,
    };

    print_report(&report, cli.json)?;
    Ok(report.ok)
}
