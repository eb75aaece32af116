//! Studio header (the first 244 bytes of every MDL file)

use glam::Vec3;

use crate::cursor::ByteCursor;
use crate::error::{DecodeWarning, MdlError, Result, Warnings};
use crate::{MDL_MAGIC, MDL_VERSION};

/// `(count, byte offset)` pair locating one sub-section of the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Section {
    pub count: i32,
    pub offset: i32,
}

impl Section {
    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            count: cursor.read_i32()?,
            offset: cursor.read_i32()?,
        })
    }

    /// Declared count clamped to zero
    pub fn len(&self) -> usize {
        self.count.max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count <= 0
    }
}

/// Decoded file header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub version: i32,
    pub name: String,
    /// Advisory; see [`DecodeWarning::SizeMismatch`]
    pub file_size: i32,
    pub eye_position: Vec3,
    pub min: Vec3,
    pub max: Vec3,
    pub bbmin: Vec3,
    pub bbmax: Vec3,
    pub flags: i32,
    pub bones: Section,
    pub bone_controllers: Section,
    pub hitboxes: Section,
    pub sequences: Section,
    pub sequence_groups: Section,
    pub textures: Section,
    pub texture_data_offset: i32,
    pub skin_reference_count: i32,
    pub skin_family_count: i32,
    pub skin_offset: i32,
    pub body_parts: Section,
    pub attachments: Section,
    pub sounds: Section,
    pub sound_groups: Section,
    pub transitions: Section,
}

impl Header {
    /// Read the header from the cursor's current position (normally 0).
    pub(crate) fn read(cursor: &mut ByteCursor<'_>, warnings: &mut Warnings) -> Result<Self> {
        let magic: [u8; 4] = cursor
            .read_bytes(4)?
            .try_into()
            .map_err(|_| MdlError::BadMagic([0; 4]))?;
        if &magic != MDL_MAGIC {
            return Err(MdlError::BadMagic(magic));
        }

        let version = cursor.read_i32()?;
        if version != MDL_VERSION {
            return Err(MdlError::UnsupportedVersion(version));
        }

        let name = cursor.read_fixed_string(64)?;
        let file_size = cursor.read_i32()?;
        if i64::from(file_size) != cursor.len() as i64 {
            warnings.push(DecodeWarning::SizeMismatch {
                declared: file_size,
                actual: cursor.len(),
            });
        }

        let eye_position = cursor.read_vec3()?;
        let min = cursor.read_vec3()?;
        let max = cursor.read_vec3()?;
        let bbmin = cursor.read_vec3()?;
        let bbmax = cursor.read_vec3()?;
        let flags = cursor.read_i32()?;

        let bones = Section::read(cursor)?;
        let bone_controllers = Section::read(cursor)?;
        let hitboxes = Section::read(cursor)?;
        let sequences = Section::read(cursor)?;
        let sequence_groups = Section::read(cursor)?;

        let textures = Section::read(cursor)?;
        let texture_data_offset = cursor.read_i32()?;

        let skin_reference_count = cursor.read_i32()?;
        let skin_family_count = cursor.read_i32()?;
        let skin_offset = cursor.read_i32()?;

        let body_parts = Section::read(cursor)?;
        let attachments = Section::read(cursor)?;
        let sounds = Section::read(cursor)?;
        let sound_groups = Section::read(cursor)?;
        let transitions = Section::read(cursor)?;

        let header = Self {
            version,
            name,
            file_size,
            eye_position,
            min,
            max,
            bbmin,
            bbmax,
            flags,
            bones,
            bone_controllers,
            hitboxes,
            sequences,
            sequence_groups,
            textures,
            texture_data_offset,
            skin_reference_count,
            skin_family_count,
            skin_offset,
            body_parts,
            attachments,
            sounds,
            sound_groups,
            transitions,
        };
        header.validate_offsets(cursor.len())?;
        Ok(header)
    }

    /// Every declared sub-section offset, named, in file order.
    pub fn offsets(&self) -> [(&'static str, i32); 13] {
        [
            ("bone", self.bones.offset),
            ("boneController", self.bone_controllers.offset),
            ("hitbox", self.hitboxes.offset),
            ("sequence", self.sequences.offset),
            ("sequenceGroup", self.sequence_groups.offset),
            ("texture", self.textures.offset),
            ("textureData", self.texture_data_offset),
            ("skin", self.skin_offset),
            ("bodyPart", self.body_parts.offset),
            ("attachment", self.attachments.offset),
            ("sound", self.sounds.offset),
            ("soundGroup", self.sound_groups.offset),
            ("transition", self.transitions.offset),
        ]
    }

    fn validate_offsets(&self, buffer_len: usize) -> Result<()> {
        for (field, offset) in self.offsets() {
            if offset < 0 || offset as usize >= buffer_len {
                return Err(MdlError::InvalidOffset {
                    field,
                    offset: i64::from(offset),
                });
            }
        }
        Ok(())
    }
}

/// Decode only the header of an MDL buffer.
///
/// Pure with respect to `data`: calling it twice yields equal headers.
/// A size mismatch is logged but not returned; use [`crate::decode`] to
/// collect warnings.
pub fn parse_header(data: &[u8]) -> Result<Header> {
    let mut cursor = ByteCursor::new(data);
    let mut warnings = Warnings::default();
    Header::read(&mut cursor, &mut warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HEADER_SIZE;

    /// Minimal header: every count zero, every offset zero, correct file size.
    fn blank_header(total_len: usize) -> Vec<u8> {
        let mut data = vec![0u8; total_len];
        data[0..4].copy_from_slice(MDL_MAGIC);
        data[4..8].copy_from_slice(&MDL_VERSION.to_le_bytes());
        data[8..14].copy_from_slice(b"test\0\0");
        data[72..76].copy_from_slice(&(total_len as i32).to_le_bytes());
        data
    }

    fn put_i32(data: &mut [u8], at: usize, value: i32) {
        data[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn test_header_size_constant() {
        let data = blank_header(HEADER_SIZE);
        let mut cursor = ByteCursor::new(&data);
        let mut warnings = Warnings::default();
        Header::read(&mut cursor, &mut warnings).unwrap();
        assert_eq!(cursor.position(), HEADER_SIZE);
    }

    #[test]
    fn test_parse_blank_header() {
        let data = blank_header(HEADER_SIZE + 16);
        let header = parse_header(&data).unwrap();
        assert_eq!(header.version, 10);
        assert_eq!(header.name, "test");
        assert_eq!(header.file_size, (HEADER_SIZE + 16) as i32);
        assert!(header.bones.is_empty());
        assert_eq!(header.textures.len(), 0);
    }

    #[test]
    fn test_parse_header_idempotent() {
        let mut data = blank_header(HEADER_SIZE + 64);
        put_i32(&mut data, 140, 2); // bone count
        put_i32(&mut data, 144, HEADER_SIZE as i32);
        assert_eq!(parse_header(&data).unwrap(), parse_header(&data).unwrap());
    }

    #[test]
    fn test_bad_magic() {
        let mut data = blank_header(HEADER_SIZE);
        data[0..4].copy_from_slice(b"IDSQ");
        assert_eq!(parse_header(&data), Err(MdlError::BadMagic(*b"IDSQ")));
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = blank_header(HEADER_SIZE);
        put_i32(&mut data, 4, 6);
        assert_eq!(parse_header(&data), Err(MdlError::UnsupportedVersion(6)));
    }

    #[test]
    fn test_size_mismatch_is_warning() {
        let mut data = blank_header(HEADER_SIZE);
        put_i32(&mut data, 72, 9999);
        let mut cursor = ByteCursor::new(&data);
        let mut warnings = Warnings::default();
        let header = Header::read(&mut cursor, &mut warnings).unwrap();
        assert_eq!(header.file_size, 9999);
        assert_eq!(
            warnings.as_slice(),
            &[DecodeWarning::SizeMismatch {
                declared: 9999,
                actual: HEADER_SIZE
            }]
        );
    }

    #[test]
    fn test_invalid_offset_names_field() {
        let mut data = blank_header(HEADER_SIZE);
        put_i32(&mut data, 208, HEADER_SIZE as i32); // body part offset == len
        assert_eq!(
            parse_header(&data),
            Err(MdlError::InvalidOffset {
                field: "bodyPart",
                offset: HEADER_SIZE as i64
            })
        );

        let mut data = blank_header(HEADER_SIZE);
        put_i32(&mut data, 188, -8); // texture data offset
        assert_eq!(
            parse_header(&data),
            Err(MdlError::InvalidOffset {
                field: "textureData",
                offset: -8
            })
        );
    }

    #[test]
    fn test_truncated_header() {
        let data = blank_header(HEADER_SIZE);
        assert!(matches!(
            parse_header(&data[..100]),
            Err(MdlError::OutOfBounds { .. })
        ));
        assert!(matches!(
            parse_header(&data[..2]),
            Err(MdlError::OutOfBounds { .. })
        ));
    }
}
