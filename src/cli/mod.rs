//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod config;
mod render;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::headless::BurstAt;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Fryfall - Render the falling-fries hero background offscreen
#[derive(Parser)]
#[command(name = "fryfall")]
#[command(about = "Fryfall - Render the falling-fries hero background to GIF or PNG")]
#[command(version)]
pub struct Cli {
    /// Increase log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Simulate the field and write an animated GIF or the final frame as PNG
    Render(RenderArgs),
    /// Print the effective configuration as TOML
    Config {
        /// Path to fryfall.toml (default: search upward from the working directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Path to fryfall.toml (default: search upward from the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output file; `.gif` writes every frame, `.png` the last one
    #[arg(short, long, default_value = "fryfall.gif")]
    pub output: PathBuf,

    /// Surface width in CSS pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Surface height in CSS pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Device pixel ratio (clamped to 1-2)
    #[arg(long)]
    pub dpr: Option<f64>,

    /// Number of frames to simulate
    #[arg(long)]
    pub frames: Option<u32>,

    /// Simulated frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// RNG seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Click at X,Y before frame FRAME (repeatable)
    #[arg(long = "burst", value_name = "X,Y@FRAME")]
    pub bursts: Vec<BurstAt>,

    /// Behave as if the viewer prefers reduced motion
    #[arg(long)]
    pub reduced_motion: bool,

    /// Print a JSON summary instead of the output path
    #[arg(long)]
    pub stats: bool,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    // A second init (tests driving `run` twice) is harmless.
    let _ = env_logger::Builder::from_env(env).format_timestamp(None).try_init();
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Render(args) => render::run_render(&args),
        Commands::Config { config } => config::run_config(config.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render_flags() {
        let cli = Cli::try_parse_from([
            "fryfall", "-vv", "render", "-o", "out.png", "--width", "640", "--burst", "10,20@3",
            "--burst", "30,40@5", "--reduced-motion", "--stats",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.output, PathBuf::from("out.png"));
        assert_eq!(args.width, Some(640));
        assert_eq!(args.height, None);
        assert_eq!(args.bursts.len(), 2);
        assert_eq!(args.bursts[1].frame, 5);
        assert!(args.reduced_motion);
        assert!(args.stats);
    }

    #[test]
    fn test_bad_burst_is_rejected() {
        assert!(Cli::try_parse_from(["fryfall", "render", "--burst", "nope"]).is_err());
    }
}
