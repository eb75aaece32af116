//! mdl.toml parsing
//!
//! ```toml
//! [decode]
//! max_texture_dimension = 2048
//! decode_texture_pixels = true
//! decode_sequences = true
//!
//! [export]
//! output_dir = "out"
//! ```
//!
//! Every section and key is optional. Unknown keys are an error.

use anyhow::{Context, Result};
use goldsrc_mdl::DecodeOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "mdl.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub decode: DecodeSection,
    #[serde(default)]
    pub export: ExportSection,
}

/// Mirrors [`DecodeOptions`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeSection {
    pub max_texture_dimension: u32,
    pub decode_texture_pixels: bool,
    pub decode_sequences: bool,
}

impl Default for DecodeSection {
    fn default() -> Self {
        let options = DecodeOptions::default();
        Self {
            max_texture_dimension: options.max_texture_dimension,
            decode_texture_pixels: options.decode_texture_pixels,
            decode_sequences: options.decode_sequences,
        }
    }
}

impl DecodeSection {
    pub fn options(&self) -> DecodeOptions {
        DecodeOptions {
            max_texture_dimension: self.max_texture_dimension,
            decode_texture_pixels: self.decode_texture_pixels,
            decode_sequences: self.decode_sequences,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSection {
    /// Where `mdl textures` writes PNGs unless `-o` is given
    pub output_dir: PathBuf,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("out"),
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Load the explicit config, else `mdl.toml` in `dir` if present, else
    /// defaults.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = dir.join(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            tracing::debug!("using {}", fallback.display());
            Self::load(&fallback)
        } else {
            Ok(Self::default())
        }
    }
}
