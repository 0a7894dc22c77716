// filemask/src/lib.rs
//! # filemask CLI Application
//!
//! Command-line front end for `filemask-core`: input discovery, rule file
//! resolution, parallel batch masking, and the summary/report output.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;
pub mod utils;

pub use commands::mask::{run_mask_command, MaskOptions};
