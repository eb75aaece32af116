//! Top-level decode entry points

use std::path::Path;

use crate::MAX_TEXTURE_DIMENSION;
use crate::bone::{Bone, read_bones};
use crate::cursor::ByteCursor;
use crate::error::{DecodeWarning, Result, Warnings};
use crate::header::Header;
use crate::mesh::{BodyPart, Model, read_body_parts};
use crate::sequence::{Sequence, read_sequences};
use crate::skeleton::Skeleton;
use crate::texture::{Texture, read_textures};

/// Knobs for [`decode_with_options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Largest accepted texture width/height; also the placeholder clamp
    pub max_texture_dimension: u32,
    /// When false, textures carry metadata and an empty RGBA buffer
    pub decode_texture_pixels: bool,
    /// When false, the sequence table is not read
    pub decode_sequences: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_texture_dimension: MAX_TEXTURE_DIMENSION,
            decode_texture_pixels: true,
            decode_sequences: true,
        }
    }
}

/// A fully decoded model. Produced once per decode call and not mutated by
/// the decoder afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Mdl {
    pub header: Header,
    pub bones: Vec<Bone>,
    pub skeleton: Skeleton,
    pub textures: Vec<Texture>,
    pub body_parts: Vec<BodyPart>,
    pub sequences: Vec<Sequence>,
    /// Recovered problems, in the order they were found
    pub warnings: Vec<DecodeWarning>,
}

impl Mdl {
    pub fn triangle_count(&self) -> usize {
        self.body_parts
            .iter()
            .flat_map(|b| &b.models)
            .map(Model::triangle_count)
            .sum()
    }

    pub fn texture(&self, skin_ref: i32) -> Option<&Texture> {
        usize::try_from(skin_ref)
            .ok()
            .and_then(|i| self.textures.get(i))
    }

    pub fn sequence(&self, name: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.name == name)
    }
}

/// Decode with [`DecodeOptions::default`].
pub fn decode(data: &[u8]) -> Result<Mdl> {
    decode_with_options(data, &DecodeOptions::default())
}

/// Decode a whole MDL v10 buffer.
///
/// Fails only for header-level problems (magic, version, offsets) and for an
/// unreadable bone table. Everything else is recovered locally and reported
/// in [`Mdl::warnings`].
pub fn decode_with_options(data: &[u8], options: &DecodeOptions) -> Result<Mdl> {
    let mut cursor = ByteCursor::new(data);
    let mut warnings = Warnings::default();

    let header = Header::read(&mut cursor, &mut warnings)?;
    tracing::debug!(
        name = %header.name,
        bones = header.bones.count,
        textures = header.textures.count,
        body_parts = header.body_parts.count,
        sequences = header.sequences.count,
        "parsed header"
    );

    let bones = read_bones(&mut cursor, &header)?;
    let skeleton = Skeleton::build(&bones, &mut warnings);
    let textures = read_textures(
        &mut cursor,
        &header,
        options.decode_texture_pixels,
        options.max_texture_dimension,
        &mut warnings,
    );
    let body_parts = read_body_parts(&mut cursor, &header, &mut warnings);
    let sequences = if options.decode_sequences {
        read_sequences(&mut cursor, &header, &mut warnings)
    } else {
        Vec::new()
    };

    Ok(Mdl {
        header,
        bones,
        skeleton,
        textures,
        body_parts,
        sequences,
        warnings: warnings.into_vec(),
    })
}

/// Read a file into memory and decode it.
pub fn load_file(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Mdl> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    tracing::debug!("read {} bytes from {}", data.len(), path.display());
    decode_with_options(&data, options)
}
