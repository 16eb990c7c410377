//! Render command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::config::{load_config, merge_cli_overrides, validate_config, CliOverrides};
use crate::headless::{self, Capture};
use crate::output::{write_frames, OutputFormat};

use super::{RenderArgs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

impl RenderArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            width: self.width,
            height: self.height,
            dpr: self.dpr,
            fps: self.fps,
            frames: self.frames,
            seed: self.seed,
            reduced_motion: self.reduced_motion.then_some(true),
        }
    }
}

/// Execute the render command
pub fn run_render(args: &RenderArgs) -> ExitCode {
    let (mut config, config_path) = match load_config(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    merge_cli_overrides(&mut config, &args.overrides());
    if let Err(e) = validate_config(&config) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let format = match OutputFormat::from_path(&args.output) {
        Ok(format) => format,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    let capture = match format {
        OutputFormat::Gif => Capture::All,
        OutputFormat::Png => Capture::Last,
    };

    let asset_root = config_path.as_deref().and_then(Path::parent).unwrap_or(Path::new("."));
    let rendered = match headless::render(&config, Some(asset_root), &args.bursts, capture) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    if let Err(e) = write_frames(&rendered.frames, config.render.fps, &args.output) {
        eprintln!("Error: Failed to save '{}': {}", args.output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    if args.stats {
        match serde_json::to_string_pretty(&rendered.stats) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        println!("Saved: {}", args.output.display());
    }

    ExitCode::from(EXIT_SUCCESS)
}
