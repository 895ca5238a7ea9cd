// Entrypoint for the CLI application.
// - clap handles usage errors itself (exit code 2).
// - Operational failures are printed to stderr and exit with code 1.

use std::process::ExitCode;

use clap::Parser;
use crossterm::style::Stylize;
use splitwise_cli::{config::Cli, ui};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match ui::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins when set; otherwise warnings only, or debug with `-v`.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "warn,splitwise_cli=debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
