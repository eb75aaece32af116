//! Indexed-palette textures
//!
//! # Record layout (80 bytes)
//! ```text
//! 0x00: name [u8; 64]
//! 0x40: flags i32
//! 0x44: width i32
//! 0x48: height i32
//! 0x4C: data offset i32 (absolute)
//! ```
//!
//! Pixel data at the data offset is `width * height` palette indices followed
//! by a 256-entry RGB palette. Rows are stored bottom to top.

use crate::cursor::{ByteCursor, to_offset};
use crate::error::{DecodeWarning, Result, Warnings};
use crate::header::Header;
use crate::{PALETTE_SIZE, TEXTURE_SIZE};

/// Texture flag bitset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextureFlags(pub i32);

impl TextureFlags {
    pub const FLAT_SHADE: Self = Self(0x01);
    pub const CHROME: Self = Self(0x02);
    pub const FULL_BRIGHT: Self = Self(0x04);
    pub const NO_MIPS: Self = Self(0x08);
    pub const ALPHA: Self = Self(0x10);
    pub const ADDITIVE: Self = Self(0x20);
    pub const MASKED: Self = Self(0x40);

    pub fn bits(self) -> i32 {
        self.0
    }

    /// True if every bit of `other` is set
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// How a texture's RGBA buffer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Fully decoded from indices and palette
    Decoded,
    /// Prefix decoded; the rest filled with flat gray
    Partial,
    /// Checkerboard placeholder
    Placeholder,
    /// Pixel decoding was disabled; `rgba` is empty
    Skipped,
}

/// Decoded RGBA image, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes
    pub rgba: Vec<u8>,
    pub source: ImageSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    pub flags: TextureFlags,
    /// Declared dimensions; the image may differ when a placeholder was used
    pub width: i32,
    pub height: i32,
    pub data_offset: i32,
    pub image: TextureImage,
}

/// Gray used for pixels that a truncated texture could not supply.
pub const MISSING_PIXEL: [u8; 4] = [128, 128, 128, 255];

const CHECKER_CELL: u32 = 8;

/// 8x8-cell gray checkerboard (128 / 64, opaque).
pub fn checkerboard(width: u32, height: u32) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let v = if (x / CHECKER_CELL + y / CHECKER_CELL) % 2 == 0 {
                128
            } else {
                64
            };
            rgba.extend_from_slice(&[v, v, v, 255]);
        }
    }
    rgba
}

/// Resolve one palette index to RGBA under the texture's flags.
///
/// Rules in order: index 255 is transparent black; a MASKED texture's pure
/// blue `(0, 0, 255)` is transparent black; ADDITIVE uses the brightest
/// channel as alpha; ALPHA uses the rounded channel average; otherwise opaque.
/// An index whose palette entry is missing resolves to [`MISSING_PIXEL`].
pub fn palette_rgba(index: u8, palette: &[u8], flags: TextureFlags) -> [u8; 4] {
    if index == 255 {
        return [0, 0, 0, 0];
    }
    let base = usize::from(index) * 3;
    let Some(&[r, g, b]) = palette.get(base..base + 3).and_then(|s| s.first_chunk::<3>()) else {
        return MISSING_PIXEL;
    };

    if flags.contains(TextureFlags::MASKED) && (r, g, b) == (0, 0, 255) {
        [0, 0, 0, 0]
    } else if flags.contains(TextureFlags::ADDITIVE) {
        [r, g, b, r.max(g).max(b)]
    } else if flags.contains(TextureFlags::ALPHA) {
        let sum = u16::from(r) + u16::from(g) + u16::from(b);
        [r, g, b, ((sum + 1) / 3) as u8]
    } else {
        [r, g, b, 255]
    }
}

/// Reverse the row order of a tightly packed RGBA image.
pub fn flip_rows(rgba: &[u8], width: u32) -> Vec<u8> {
    let stride = width as usize * 4;
    if stride == 0 {
        return rgba.to_vec();
    }
    rgba.chunks_exact(stride).rev().flatten().copied().collect()
}

fn placeholder(width: i32, height: i32, max_dimension: u32) -> TextureImage {
    let clamp = |d: i32| (d.max(0) as u32).min(max_dimension);
    let (width, height) = (clamp(width), clamp(height));
    TextureImage {
        width,
        height,
        rgba: checkerboard(width, height),
        source: ImageSource::Placeholder,
    }
}

enum Decoded {
    Full(TextureImage),
    Partial {
        image: TextureImage,
        available: usize,
        required: usize,
    },
    Fallback {
        image: TextureImage,
        reason: String,
    },
}

fn decode_image(
    cursor: &mut ByteCursor<'_>,
    width: i32,
    height: i32,
    data_offset: i32,
    flags: TextureFlags,
    max_dimension: u32,
) -> Decoded {
    let max = i64::from(max_dimension);
    let (w, h) = (i64::from(width), i64::from(height));
    if w <= 0 || h <= 0 || w > max || h > max {
        return Decoded::Fallback {
            image: placeholder(width, height, max_dimension),
            reason: format!("invalid dimensions {width}x{height}"),
        };
    }
    if data_offset <= 0 || data_offset as usize >= cursor.len() {
        return Decoded::Fallback {
            image: placeholder(width, height, max_dimension),
            reason: format!("pixel data offset {data_offset} out of bounds"),
        };
    }

    let (width, height) = (width as u32, height as u32);
    let start = data_offset as usize;
    let pixel_count = width as usize * height as usize;
    let required = pixel_count + PALETTE_SIZE;
    let available = cursor.len() - start;

    if available < required {
        let image = decode_partial(&cursor.data()[start..], width, height, flags);
        return Decoded::Partial {
            image,
            available,
            required,
        };
    }

    match read_full(cursor, start, pixel_count, width, flags) {
        Ok(rgba) => Decoded::Full(TextureImage {
            width,
            height,
            rgba,
            source: ImageSource::Decoded,
        }),
        Err(e) => Decoded::Fallback {
            image: placeholder(width as i32, height as i32, max_dimension),
            reason: e.to_string(),
        },
    }
}

fn read_full(
    cursor: &mut ByteCursor<'_>,
    start: usize,
    pixel_count: usize,
    width: u32,
    flags: TextureFlags,
) -> Result<Vec<u8>> {
    cursor.seek(start)?;
    let indices = cursor.read_bytes(pixel_count)?;
    let palette = cursor.read_bytes(PALETTE_SIZE)?;
    let rgba: Vec<u8> = indices
        .iter()
        .flat_map(|&i| palette_rgba(i, palette, flags))
        .collect();
    Ok(flip_rows(&rgba, width))
}

/// Decode as many indices as fit before a (possibly short) palette.
///
/// Covered pixels go through the same flag rules as a full decode (index 255
/// and masked blue stay transparent) and the result is flipped the same way,
/// so a partial image differs from the full one only in its gray tail.
fn decode_partial(bytes: &[u8], width: u32, height: u32, flags: TextureFlags) -> TextureImage {
    let pixel_count = width as usize * height as usize;
    let covered = pixel_count.min(bytes.len().saturating_sub(PALETTE_SIZE));
    let (indices, rest) = bytes.split_at(covered);
    let palette = &rest[..rest.len().min(PALETTE_SIZE)];

    let mut rgba = Vec::with_capacity(pixel_count * 4);
    for &index in indices {
        rgba.extend_from_slice(&palette_rgba(index, palette, flags));
    }
    for _ in covered..pixel_count {
        rgba.extend_from_slice(&MISSING_PIXEL);
    }

    TextureImage {
        width,
        height,
        rgba: flip_rows(&rgba, width),
        source: ImageSource::Partial,
    }
}

/// Read the texture table and decode each texture's pixels.
///
/// A short table keeps the records read so far. Pixel problems never fail the
/// load; they produce a placeholder or partial image plus a warning.
pub(crate) fn read_textures(
    cursor: &mut ByteCursor<'_>,
    header: &Header,
    decode_pixels: bool,
    max_dimension: u32,
    warnings: &mut Warnings,
) -> Vec<Texture> {
    let declared = header.textures.len();
    if declared == 0 {
        return Vec::new();
    }

    let mut textures = Vec::new();
    for index in 0..declared {
        let record = cursor.scoped(|c| -> Result<_> {
            let base = to_offset("texture", i64::from(header.textures.offset))?;
            c.seek(base + index * TEXTURE_SIZE)?;
            let name = c.read_fixed_string(64)?;
            let flags = TextureFlags(c.read_i32()?);
            let width = c.read_i32()?;
            let height = c.read_i32()?;
            let data_offset = c.read_i32()?;
            Ok((name, flags, width, height, data_offset))
        });
        let Ok((name, flags, width, height, data_offset)) = record else {
            warnings.push(DecodeWarning::TextureTableTruncated {
                read: textures.len(),
                declared,
            });
            break;
        };

        let image = if decode_pixels {
            let decoded = cursor.scoped(|c| {
                decode_image(c, width, height, data_offset, flags, max_dimension)
            });
            match decoded {
                Decoded::Full(image) => image,
                Decoded::Partial {
                    image,
                    available,
                    required,
                } => {
                    warnings.push(DecodeWarning::TextureTruncated {
                        index,
                        name: name.clone(),
                        available,
                        required,
                    });
                    image
                }
                Decoded::Fallback { image, reason } => {
                    warnings.push(DecodeWarning::TextureFallback {
                        index,
                        name: name.clone(),
                        reason,
                    });
                    image
                }
            }
        } else {
            TextureImage {
                width: width.max(0) as u32,
                height: height.max(0) as u32,
                rgba: Vec::new(),
                source: ImageSource::Skipped,
            }
        };

        tracing::trace!(index, %name, width, height, flags = flags.bits(), "texture");
        textures.push(Texture {
            name,
            flags,
            width,
            height,
            data_offset,
            image,
        });
    }

    tracing::debug!("decoded {} of {} textures", textures.len(), declared);
    textures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_TEXTURE_DIMENSION;

    fn gray_palette() -> Vec<u8> {
        (0..=255u8).flat_map(|i| [i, i, i]).collect()
    }

    #[test]
    fn test_flags_contains() {
        let flags = TextureFlags(0x40 | 0x10);
        assert!(flags.contains(TextureFlags::MASKED));
        assert!(flags.contains(TextureFlags::ALPHA));
        assert!(!flags.contains(TextureFlags::ADDITIVE));
        assert!(TextureFlags::default().contains(TextureFlags(0)));
    }

    #[test]
    fn test_index_255_always_transparent() {
        let mut palette = gray_palette();
        palette[255 * 3..].copy_from_slice(&[10, 20, 30]);
        for bits in [0, 0x10, 0x20, 0x40, 0x70, 0x7F] {
            assert_eq!(palette_rgba(255, &palette, TextureFlags(bits)), [0, 0, 0, 0]);
        }
    }

    #[test]
    fn test_masked_blue_key() {
        let mut palette = gray_palette();
        palette[7 * 3..7 * 3 + 3].copy_from_slice(&[0, 0, 255]);
        assert_eq!(palette_rgba(7, &palette, TextureFlags::MASKED), [0, 0, 0, 0]);
        // Without MASKED the blue entry is ordinary
        assert_eq!(palette_rgba(7, &palette, TextureFlags(0)), [0, 0, 255, 255]);
        assert_eq!(palette_rgba(8, &palette, TextureFlags::MASKED), [8, 8, 8, 255]);
    }

    #[test]
    fn test_additive_and_alpha() {
        let mut palette = gray_palette();
        palette[3..6].copy_from_slice(&[10, 200, 40]);
        assert_eq!(
            palette_rgba(1, &palette, TextureFlags::ADDITIVE),
            [10, 200, 40, 200]
        );
        // (10 + 200 + 40) / 3 = 83.33
        assert_eq!(palette_rgba(1, &palette, TextureFlags::ALPHA), [10, 200, 40, 83]);
        palette[6..9].copy_from_slice(&[1, 1, 0]);
        // 2 / 3 = 0.67 rounds up
        assert_eq!(palette_rgba(2, &palette, TextureFlags::ALPHA)[3], 1);
        // ADDITIVE takes precedence over ALPHA
        let both = TextureFlags(TextureFlags::ADDITIVE.0 | TextureFlags::ALPHA.0);
        assert_eq!(palette_rgba(1, &palette, both)[3], 200);
    }

    #[test]
    fn test_missing_palette_entry() {
        assert_eq!(palette_rgba(3, &[1, 2, 3, 4, 5], TextureFlags(0)), MISSING_PIXEL);
        assert_eq!(palette_rgba(1, &[1, 2, 3, 4, 5, 6], TextureFlags(0)), [4, 5, 6, 255]);
    }

    #[test]
    fn test_checkerboard_cells() {
        let rgba = checkerboard(16, 9);
        assert_eq!(rgba.len(), 16 * 9 * 4);
        let px = |x: usize, y: usize| rgba[(y * 16 + x) * 4];
        assert_eq!(px(0, 0), 128);
        assert_eq!(px(7, 7), 128);
        assert_eq!(px(8, 0), 64);
        assert_eq!(px(0, 8), 64);
        assert_eq!(px(8, 8), 128);
        assert!(rgba.chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn test_flip_rows() {
        let rgba: Vec<u8> = (0..16).collect();
        let flipped = flip_rows(&rgba, 2);
        assert_eq!(&flipped[..8], &rgba[8..]);
        assert_eq!(&flipped[8..], &rgba[..8]);
    }

    #[test]
    fn test_oversized_width_clamps_placeholder() {
        let data = vec![0u8; 64];
        let mut cursor = ByteCursor::new(&data);
        let Decoded::Fallback { image, .. } =
            decode_image(&mut cursor, 4000, 16, 8, TextureFlags(0), MAX_TEXTURE_DIMENSION)
        else {
            panic!("expected placeholder");
        };
        assert_eq!((image.width, image.height), (2048, 16));
        assert_eq!(image.rgba.len(), 2048 * 16 * 4);
        assert_eq!(image.source, ImageSource::Placeholder);
    }

    #[test]
    fn test_bad_offset_falls_back() {
        let data = vec![0u8; 64];
        let mut cursor = ByteCursor::new(&data);
        for offset in [0, -4, 64, 1000] {
            assert!(matches!(
                decode_image(&mut cursor, 2, 2, offset, TextureFlags(0), 2048),
                Decoded::Fallback { .. }
            ));
        }
    }

    #[test]
    fn test_full_decode_flips() {
        // 2x2: bottom row indices 1,2 then top row 3,4
        let mut data = vec![0u8; 4];
        data.extend_from_slice(&[1, 2, 3, 4]);
        data.extend(gray_palette());
        let mut cursor = ByteCursor::new(&data);
        let Decoded::Full(image) = decode_image(&mut cursor, 2, 2, 4, TextureFlags(0), 2048)
        else {
            panic!("expected full decode");
        };
        assert_eq!(
            image.rgba,
            vec![3, 3, 3, 255, 4, 4, 4, 255, 1, 1, 1, 255, 2, 2, 2, 255]
        );
    }

    #[test]
    fn test_truncated_fills_gray() {
        // 4x1 texture, 2 indices readable before a 768-byte palette
        let mut data = vec![0u8; 4];
        data.extend_from_slice(&[5, 6]);
        data.extend(gray_palette());
        let mut cursor = ByteCursor::new(&data);
        let Decoded::Partial {
            image,
            available,
            required,
        } = decode_image(&mut cursor, 4, 1, 4, TextureFlags(0), 2048)
        else {
            panic!("expected partial decode");
        };
        assert_eq!(available, 2 + 768);
        assert_eq!(required, 4 + 768);
        assert_eq!(image.source, ImageSource::Partial);
        let pixels: Vec<&[u8]> = image.rgba.chunks_exact(4).collect();
        assert_eq!(pixels[0], &[5, 5, 5, 255]);
        assert_eq!(pixels[1], &[6, 6, 6, 255]);
        assert_eq!(pixels[2], &MISSING_PIXEL);
        assert_eq!(pixels[3], &MISSING_PIXEL);
    }

    #[test]
    fn test_partial_applies_flags_and_flips() {
        // 2x2, three indices before the palette
        let mut data = vec![255, 10, 20];
        data.extend(gray_palette());
        let image = decode_partial(&data, 2, 2, TextureFlags::ALPHA);
        let pixels: Vec<&[u8]> = image.rgba.chunks_exact(4).collect();
        // top row is the second stored row
        assert_eq!(pixels[0], &[20, 20, 20, 20]);
        assert_eq!(pixels[1], &MISSING_PIXEL);
        assert_eq!(pixels[2], &[0, 0, 0, 0]);
        assert_eq!(pixels[3], &[10, 10, 10, 10]);
    }

    #[test]
    fn test_partial_without_palette_is_all_gray() {
        let image = decode_partial(&[1, 2, 3], 2, 2, TextureFlags(0));
        assert_eq!(image.rgba.len(), 16);
        assert!(image.rgba.chunks_exact(4).all(|p| p == MISSING_PIXEL));
    }
}
