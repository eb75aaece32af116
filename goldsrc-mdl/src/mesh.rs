//! Body parts, models and meshes
//!
//! # Record layouts
//! ```text
//! body part (76 bytes): name [u8; 64], model count, base, model offset
//! model (112 bytes):    name [u8; 64], type, bounding radius f32,
//!                       mesh count, mesh offset,
//!                       vertex count, vertex info offset, vertex offset,
//!                       normal count, normal info offset, normal offset,
//!                       group count, group offset
//! mesh (20 bytes):      tri count, tri offset, skin ref,
//!                       normal count, normal offset
//! ```
//!
//! A mesh's triangles are stored as a command stream at its tri offset: an
//! `i16` trivert count (negative for a fan, positive for a strip, zero to end)
//! followed by that many 8-byte triverts.

use glam::{Vec2, Vec3};

use crate::cursor::{ByteCursor, to_offset};
use crate::error::{DecodeWarning, MdlError, Result, Warnings};
use crate::header::Header;
use crate::{BODY_PART_SIZE, MESH_SIZE, MODEL_SIZE, TRIVERT_SIZE};

#[derive(Debug, Clone, PartialEq)]
pub struct BodyPart {
    pub name: String,
    /// Declared model count; `models` holds the ones that decoded
    pub model_count: i32,
    pub base: i32,
    pub model_offset: i32,
    pub models: Vec<Model>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub name: String,
    pub model_type: i32,
    pub bounding_radius: f32,
    pub mesh_count: i32,
    pub mesh_offset: i32,
    pub vertex_count: i32,
    pub vertex_info_offset: i32,
    pub vertex_offset: i32,
    pub normal_count: i32,
    pub normal_info_offset: i32,
    pub normal_offset: i32,
    pub group_count: i32,
    pub group_offset: i32,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Bone index per vertex (0 when the file has none)
    pub vertex_bones: Vec<u8>,
    /// Bone index per normal (0 when the file has none)
    pub normal_bones: Vec<u8>,
    pub meshes: Vec<Mesh>,
}

impl Model {
    /// Stand-in for a body part with no decodable models.
    pub fn empty(body_part_name: &str) -> Self {
        Self {
            name: format!("{body_part_name}_empty"),
            ..Self::default()
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles.len()).sum()
    }
}

/// One texture-bound triangle list.
///
/// `triangles`, `uvs` and `normal_indices` are parallel: entry `i` of each
/// describes the three corners of triangle `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub tri_count: i32,
    pub tri_offset: i32,
    /// Index into the texture list
    pub skin_ref: i32,
    pub normal_count: i32,
    pub normal_offset: i32,
    /// Vertex indices, all `< vertices.len()`
    pub triangles: Vec<[u16; 3]>,
    /// Raw texel `(s, t)` per corner
    pub uvs: Vec<[[u16; 2]; 3]>,
    pub normal_indices: Vec<[u16; 3]>,
}

impl Mesh {
    /// Texel coordinates to `(s / width, 1 - t / height)`.
    pub fn normalized_uv(s: u16, t: u16, width: u32, height: u32) -> Vec2 {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        Vec2::new(f32::from(s) / w, 1.0 - f32::from(t) / h)
    }
}

/// One entry of the triangle command stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trivert {
    pub vertex: u16,
    pub normal: u16,
    pub s: u16,
    pub t: u16,
}

impl Trivert {
    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            vertex: cursor.read_u16()?,
            normal: cursor.read_u16()?,
            s: cursor.read_u16()?,
            t: cursor.read_u16()?,
        })
    }
}

/// `(0, i, i + 1)` for `i` in `1..n - 1`.
pub fn expand_fan<T: Copy>(items: &[T]) -> Vec<[T; 3]> {
    if items.len() < 3 {
        return Vec::new();
    }
    (1..items.len() - 1)
        .map(|i| [items[0], items[i], items[i + 1]])
        .collect()
}

/// Alternating winding: even `i` gives `(i, i + 1, i + 2)`, odd `i` gives
/// `(i, i + 2, i + 1)`.
pub fn expand_strip<T: Copy>(items: &[T]) -> Vec<[T; 3]> {
    if items.len() < 3 {
        return Vec::new();
    }
    (0..items.len() - 2)
        .map(|i| {
            if i % 2 == 0 {
                [items[i], items[i + 1], items[i + 2]]
            } else {
                [items[i], items[i + 2], items[i + 1]]
            }
        })
        .collect()
}

/// Expand a command stream until a zero count or until `tri_count` triangles
/// have been produced. Commands are never split, so the result may exceed
/// `tri_count` by the tail of the last command.
pub(crate) fn read_tri_commands(
    cursor: &mut ByteCursor<'_>,
    tri_offset: usize,
    tri_count: usize,
) -> Result<Vec<[Trivert; 3]>> {
    let mut triangles = Vec::new();
    if tri_count == 0 {
        return Ok(triangles);
    }

    cursor.seek(tri_offset)?;
    while triangles.len() < tri_count {
        let count = cursor.read_i16()?;
        if count == 0 {
            break;
        }
        let n = usize::from(count.unsigned_abs());
        let mut command = ByteCursor::new(cursor.read_bytes(n * TRIVERT_SIZE)?);
        let mut triverts = Vec::with_capacity(n);
        for _ in 0..n {
            triverts.push(Trivert::read(&mut command)?);
        }
        if count < 0 {
            triangles.extend(expand_fan(&triverts));
        } else {
            triangles.extend(expand_strip(&triverts));
        }
    }
    Ok(triangles)
}

#[derive(Debug, Clone, Copy)]
struct MeshSite {
    body_part: usize,
    model: usize,
    mesh: usize,
}

fn read_mesh(
    cursor: &mut ByteCursor<'_>,
    record_offset: usize,
    vertex_count: usize,
    site: MeshSite,
    warnings: &mut Warnings,
) -> Result<Mesh> {
    cursor.seek(record_offset)?;
    let tri_count = cursor.read_i32()?;
    let tri_offset = cursor.read_i32()?;
    let skin_ref = cursor.read_i32()?;
    let normal_count = cursor.read_i32()?;
    let normal_offset = cursor.read_i32()?;

    let expanded = if tri_count > 0 {
        let start = to_offset("triangle", i64::from(tri_offset))?;
        read_tri_commands(cursor, start, tri_count as usize)?
    } else {
        Vec::new()
    };

    let mut mesh = Mesh {
        tri_count,
        tri_offset,
        skin_ref,
        normal_count,
        normal_offset,
        ..Mesh::default()
    };
    let mut dropped = 0;
    for corners in expanded {
        if corners.iter().any(|v| usize::from(v.vertex) >= vertex_count) {
            dropped += 1;
            continue;
        }
        mesh.triangles.push(corners.map(|v| v.vertex));
        mesh.uvs.push(corners.map(|v| [v.s, v.t]));
        mesh.normal_indices.push(corners.map(|v| v.normal));
    }
    if dropped > 0 {
        warnings.push(DecodeWarning::TrianglesDropped {
            body_part: site.body_part,
            model: site.model,
            mesh: site.mesh,
            count: dropped,
        });
    }
    Ok(mesh)
}

fn read_vec3_array(
    cursor: &mut ByteCursor<'_>,
    field: &'static str,
    count: i32,
    offset: i32,
) -> Result<Vec<Vec3>> {
    if count <= 0 {
        return Ok(Vec::new());
    }
    cursor.seek(to_offset(field, i64::from(offset))?)?;
    let mut out = Vec::with_capacity((count as usize).min(cursor.remaining() / 12));
    for _ in 0..count {
        out.push(cursor.read_vec3()?);
    }
    Ok(out)
}

/// Per-element bone bytes; everything binds to bone 0 if absent or unreadable.
fn read_bone_indices(cursor: &mut ByteCursor<'_>, count: i32, offset: i32) -> Vec<u8> {
    let count = count.max(0) as usize;
    if offset <= 0 || count == 0 {
        return vec![0; count];
    }
    let bytes = cursor
        .seek(offset as usize)
        .and_then(|()| cursor.read_bytes(count));
    match bytes {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => {
            tracing::debug!(
                "bone indices at {} unreadable ({}), binding to bone 0",
                offset,
                e
            );
            vec![0; count]
        }
    }
}

/// A table record that would start at or past the end of the buffer.
/// Tables are read in order, so every later record is out of range too.
fn record_past_end(
    cursor: &ByteCursor<'_>,
    field: &'static str,
    record: usize,
) -> Option<MdlError> {
    (record >= cursor.len()).then(|| MdlError::InvalidOffset {
        field,
        offset: record as i64,
    })
}

fn read_model(
    cursor: &mut ByteCursor<'_>,
    record_offset: usize,
    body_part: usize,
    model_index: usize,
    warnings: &mut Warnings,
) -> Result<Model> {
    cursor.seek(record_offset)?;
    let mut model = Model {
        name: cursor.read_fixed_string(64)?,
        model_type: cursor.read_i32()?,
        bounding_radius: cursor.read_f32()?,
        mesh_count: cursor.read_i32()?,
        mesh_offset: cursor.read_i32()?,
        vertex_count: cursor.read_i32()?,
        vertex_info_offset: cursor.read_i32()?,
        vertex_offset: cursor.read_i32()?,
        normal_count: cursor.read_i32()?,
        normal_info_offset: cursor.read_i32()?,
        normal_offset: cursor.read_i32()?,
        group_count: cursor.read_i32()?,
        group_offset: cursor.read_i32()?,
        ..Model::default()
    };

    model.vertices = read_vec3_array(cursor, "vertex", model.vertex_count, model.vertex_offset)?;
    model.normals = read_vec3_array(cursor, "normal", model.normal_count, model.normal_offset)?;
    model.vertex_bones = read_bone_indices(cursor, model.vertex_count, model.vertex_info_offset);
    model.normal_bones = read_bone_indices(cursor, model.normal_count, model.normal_info_offset);

    if model.mesh_offset > 0 && model.mesh_count > 0 {
        let base = model.mesh_offset as usize;
        for mesh in 0..model.mesh_count as usize {
            let site = MeshSite {
                body_part,
                model: model_index,
                mesh,
            };
            let record = base.saturating_add(mesh * MESH_SIZE);
            if let Some(error) = record_past_end(cursor, "mesh", record) {
                warnings.push(DecodeWarning::MeshSkipped {
                    body_part,
                    model: model_index,
                    mesh,
                    error,
                });
                break;
            }
            match read_mesh(cursor, record, model.vertices.len(), site, warnings) {
                Ok(m) => model.meshes.push(m),
                Err(error) => warnings.push(DecodeWarning::MeshSkipped {
                    body_part,
                    model: model_index,
                    mesh,
                    error,
                }),
            }
        }
    }

    tracing::trace!(
        body_part,
        model = model_index,
        name = %model.name,
        vertices = model.vertices.len(),
        meshes = model.meshes.len(),
        "model"
    );
    Ok(model)
}

fn read_body_part(
    cursor: &mut ByteCursor<'_>,
    record_offset: usize,
    index: usize,
    warnings: &mut Warnings,
) -> Result<BodyPart> {
    cursor.seek(record_offset)?;
    let name = cursor.read_fixed_string(64)?;
    let model_count = cursor.read_i32()?;
    let base = cursor.read_i32()?;
    let model_offset = cursor.read_i32()?;

    let mut models = Vec::new();
    if model_count > 0 {
        let start = to_offset("model", i64::from(model_offset))?;
        for model in 0..model_count as usize {
            let record = start.saturating_add(model * MODEL_SIZE);
            if let Some(error) = record_past_end(cursor, "model", record) {
                warnings.push(DecodeWarning::ModelSkipped {
                    body_part: index,
                    model,
                    error,
                });
                break;
            }
            match read_model(cursor, record, index, model, warnings) {
                Ok(m) => models.push(m),
                Err(error) => warnings.push(DecodeWarning::ModelSkipped {
                    body_part: index,
                    model,
                    error,
                }),
            }
        }
    }

    if models.is_empty() {
        warnings.push(DecodeWarning::EmptyBodyPart {
            index,
            name: name.clone(),
        });
        models.push(Model::empty(&name));
    }

    Ok(BodyPart {
        name,
        model_count,
        base,
        model_offset,
        models,
    })
}

/// Decode every body part. Failures are isolated to the smallest enclosing
/// record (mesh, model, body part) and reported as warnings.
pub(crate) fn read_body_parts(
    cursor: &mut ByteCursor<'_>,
    header: &Header,
    warnings: &mut Warnings,
) -> Vec<BodyPart> {
    let declared = header.body_parts.len();
    let base = header.body_parts.offset.max(0) as usize;
    let mut body_parts = Vec::with_capacity(declared.min(cursor.len() / BODY_PART_SIZE));
    for index in 0..declared {
        let record = base.saturating_add(index * BODY_PART_SIZE);
        if let Some(error) = record_past_end(cursor, "bodyPart", record) {
            warnings.push(DecodeWarning::BodyPartSkipped { index, error });
            break;
        }
        let result = cursor.scoped(|c| read_body_part(c, record, index, warnings));
        match result {
            Ok(part) => body_parts.push(part),
            Err(error) => warnings.push(DecodeWarning::BodyPartSkipped { index, error }),
        }
    }

    tracing::debug!(
        "decoded {} body parts ({} triangles)",
        body_parts.len(),
        body_parts
            .iter()
            .flat_map(|b| &b.models)
            .map(Model::triangle_count)
            .sum::<usize>()
    );
    body_parts
}
