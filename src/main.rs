//! Fryfall - Command-line renderer for the falling-fries hero background

use std::process::ExitCode;

use fryfall::cli;

fn main() -> ExitCode {
    cli::run()
}
