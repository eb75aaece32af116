//! PNG export for `mdl textures`

use anyhow::{Context, Result};
use goldsrc_mdl::{Mdl, Texture};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// `<index>_<stem>.png`, with anything outside `[A-Za-z0-9_-]` replaced.
pub fn png_file_name(index: usize, texture_name: &str) -> String {
    let stem = Path::new(texture_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(texture_name);
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{index}_{stem}.png")
}

fn write_png(texture: &Texture, path: &Path) -> Result<()> {
    let image = &texture.image;
    let buffer = RgbaImage::from_raw(image.width, image.height, image.rgba.clone())
        .with_context(|| format!("RGBA buffer size mismatch for {}", texture.name))?;
    buffer
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Write every texture with pixel data into `dir`. Returns the written paths.
pub fn export_textures(mdl: &Mdl, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let mut written = Vec::new();
    for (index, texture) in mdl.textures.iter().enumerate() {
        if texture.image.rgba.is_empty() {
            tracing::warn!("texture {} ({}) has no pixels, skipping", index, texture.name);
            continue;
        }
        let path = dir.join(png_file_name(index, &texture.name));
        write_png(texture, &path)?;
        tracing::info!(
            "wrote {} ({}x{}, {:?})",
            path.display(),
            texture.image.width,
            texture.image.height,
            texture.image.source
        );
        written.push(path);
    }
    Ok(written)
}
