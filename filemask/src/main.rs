// filemask/src/main.rs
//! filemask entry point.
//!
//! Parses the command line, sets up logging, and runs the batch. Exit status
//! is 0 when every file was masked and 1 otherwise.

use clap::Parser;
use log::LevelFilter;
use std::process::ExitCode;

use filemask::cli::Cli;
use filemask::commands::mask::{error_msg, run_mask_command, MaskOptions};
use filemask::logger;
use filemask::ui::theme::default_theme_map;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Some(LevelFilter::Off)
    } else if cli.debug {
        Some(LevelFilter::Debug)
    } else {
        None
    };
    logger::init_logger(level);

    let theme_map = default_theme_map();
    let opts = MaskOptions::from(&cli);

    match run_mask_command(&opts, &theme_map) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error_msg(format!("{:#}", e), &theme_map);
            ExitCode::FAILURE
        }
    }
}
