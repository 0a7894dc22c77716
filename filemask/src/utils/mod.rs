// filemask/src/utils/mod.rs
pub mod discovery;
pub mod progress;
