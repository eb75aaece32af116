//! mdl-cli - inspection and texture extraction for GoldSrc MDL files
//!
//! The `mdl` binary is a thin clap front end over these modules.

pub mod config;
pub mod export;
pub mod inspect;

pub use config::{Config, DEFAULT_CONFIG_FILE};
pub use export::{export_textures, png_file_name};
pub use inspect::{write_bones, write_info, write_sequences};
