//! Bone records
//!
//! # Layout (112 bytes)
//! ```text
//! 0x00: name [u8; 32]
//! 0x20: parent i32 (-1 = root)
//! 0x24: flags i32
//! 0x28: controllers [i32; 6]
//! 0x40: position vec3
//! 0x4C: rotation vec3 (radians, Euler XYZ)
//! 0x58: position scale vec3
//! 0x64: rotation scale vec3
//! ```

use glam::Vec3;

use crate::BONE_SIZE;
use crate::cursor::{ByteCursor, to_offset};
use crate::error::{MdlError, Result};
use crate::header::Header;

/// One bone exactly as stored in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Raw parent index; resolved (and sanitized) by [`crate::Skeleton`]
    pub parent: i32,
    pub flags: i32,
    pub controllers: [i32; 6],
    pub position: Vec3,
    pub rotation: Vec3,
    pub position_scale: Vec3,
    pub rotation_scale: Vec3,
}

impl Bone {
    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let name = cursor.read_fixed_string(32)?;
        let parent = cursor.read_i32()?;
        let flags = cursor.read_i32()?;
        let mut controllers = [0i32; 6];
        for controller in &mut controllers {
            *controller = cursor.read_i32()?;
        }
        Ok(Self {
            name,
            parent,
            flags,
            controllers,
            position: cursor.read_vec3()?,
            rotation: cursor.read_vec3()?,
            position_scale: cursor.read_vec3()?,
            rotation_scale: cursor.read_vec3()?,
        })
    }
}

/// Read every bone record. Any failure is fatal for the whole parse.
pub(crate) fn read_bones(cursor: &mut ByteCursor<'_>, header: &Header) -> Result<Vec<Bone>> {
    let count = header.bones.len();
    if count == 0 {
        return Ok(Vec::new());
    }

    let base = to_offset("bone", i64::from(header.bones.offset))?;
    let mut bones = Vec::with_capacity(count.min(cursor.len() / BONE_SIZE));
    for index in 0..count {
        let bone = cursor
            .seek(base + index * BONE_SIZE)
            .and_then(|()| Bone::read(cursor))
            .map_err(|source| MdlError::Bone {
                index,
                source: Box::new(source),
            })?;
        tracing::trace!(index, name = %bone.name, parent = bone.parent, "bone");
        bones.push(bone);
    }

    tracing::debug!("decoded {} bones", bones.len());
    Ok(bones)
}
