// filemask/src/commands/mod.rs
pub mod mask;
