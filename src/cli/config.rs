//! Config command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::config::load_config;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Print the effective configuration
pub fn run_config(path: Option<&Path>) -> ExitCode {
    let (config, found) = match load_config(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    match found {
        Some(p) => println!("# {}", p.display()),
        None => println!("# no fryfall.toml found, showing defaults"),
    }
    match toml::to_string_pretty(&config) {
        Ok(text) => {
            print!("{}", text);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
