//! Cookido Agent CLI: export, classify, and reorganize Cookidoo recipe
//! collections.
//!
//! Every command that mutates collections keeps a resume state file, so an
//! interrupted run can simply be started again.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);

    tokio::select! {
        result = commands::run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nCancelled (state saved for resume)");
            std::process::exit(EXIT_INTERRUPTED);
        }
    }
}
