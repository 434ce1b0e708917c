//! Bindle - Command-line bundler for web assets

use std::process::ExitCode;

use bindle::cli;

fn main() -> ExitCode {
    cli::run()
}
