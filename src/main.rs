#![forbid(unsafe_code)]

//! drt: scenario runner CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("drt: {e}");
        std::process::exit(e.exit_code());
    }
}
