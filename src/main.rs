//! obrc-harness - correctness and benchmark harness for 1BRC programs
//!
//! Generates cached fixtures with a reference implementation, checks the
//! program under test byte for byte against them, and times repeated runs.

use clap::Parser;
use obrc_harness::commands::{Commands, GlobalArgs};
use obrc_harness::{cli, common::logging};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "obrc-harness", about = "Correctness and benchmark harness for 1BRC programs")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Enable debug logging for the harness
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also append logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose, cli.log_file.as_deref());

    match cli::dispatch(&cli.global, cli.command).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
