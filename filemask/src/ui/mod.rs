// filemask/src/ui/mod.rs
pub mod mask_summary;
pub mod output_format;
pub mod progress_bar;
pub mod theme;
