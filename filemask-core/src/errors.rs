//! errors.rs - Custom error types for the filemask-core library.
//!
//! This module defines a structured error enum for the library, providing
//! specific, actionable error types that can be handled programmatically.
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// This enum represents all possible error types in the `filemask-core` library.
///
/// Marked `#[non_exhaustive]` so new variants can be added without breaking
/// downstream matches.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FilemaskError {
    #[error("Failed to parse rule configuration: {0}")]
    Config(String),

    #[error("Rule configuration '{0}' contains no usable masking rules")]
    EmptyRuleSet(String),

    #[error("Failed to compile aggregated anchor set: {0}")]
    AnchorSetCompilation(#[from] regex::Error),

    #[error("Failed to serialize configuration for hashing: {0}")]
    SerializationError(String),

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A fatal error occurred: {0}")]
    Fatal(String),
}
