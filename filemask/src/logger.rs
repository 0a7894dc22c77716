// filemask/src/logger.rs
//! Logger setup for the filemask binary.
//!
//! `RUST_LOG` is honoured as usual (default `warn`). An explicit level from
//! `--quiet` or `--debug` overrides it for the filemask crates.

use env_logger::{Builder, Env};
use log::LevelFilter;

const FILEMASK_MODULES: [&str; 2] = ["filemask", "filemask_core"];

/// Initializes the global logger. Safe to call more than once; later calls are
/// ignored.
pub fn init_logger(level_override: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    builder.format_timestamp(None);

    if let Some(level) = level_override {
        for module in FILEMASK_MODULES {
            builder.filter_module(module, level);
        }
    }

    let _ = builder.try_init();
}
