//! Flat per-mesh vertex streams
//!
//! Turns a decoded [`Model`] into un-indexed triangle soup with normalized UVs
//! and single-bone skinning attributes, one [`MeshGeometry`] per mesh.

use bytemuck::cast_slice;

use crate::mesh::{Mesh, Model};
use crate::texture::Texture;

const FALLBACK_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];

/// Vertex streams for one mesh. All per-vertex vectors have the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    pub skin_ref: usize,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    /// `[bone, 0, 0, 0]`
    pub joints: Vec<[u8; 4]>,
    /// `[1, 0, 0, 0]`
    pub weights: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

impl MeshGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn position_bytes(&self) -> &[u8] {
        cast_slice(&self.positions)
    }

    pub fn normal_bytes(&self) -> &[u8] {
        cast_slice(&self.normals)
    }

    pub fn uv_bytes(&self) -> &[u8] {
        cast_slice(&self.uvs)
    }

    pub fn joint_bytes(&self) -> &[u8] {
        cast_slice(&self.joints)
    }

    pub fn weight_bytes(&self) -> &[u8] {
        cast_slice(&self.weights)
    }

    pub fn index_bytes(&self) -> &[u8] {
        cast_slice(&self.indices)
    }
}

fn resolve_normal(model: &Model, index: u16) -> [f32; 3] {
    match model.normals.get(usize::from(index)) {
        Some(n) if n.length_squared() > 0.0 => n.normalize().to_array(),
        _ => FALLBACK_NORMAL,
    }
}

fn mesh_geometry(model: &Model, mesh: &Mesh, skin_ref: usize, texture: &Texture) -> MeshGeometry {
    let width = texture.width.max(1) as u32;
    let height = texture.height.max(1) as u32;
    let mut out = MeshGeometry {
        skin_ref,
        ..MeshGeometry::default()
    };

    let corners = mesh
        .triangles
        .iter()
        .zip(&mesh.uvs)
        .zip(&mesh.normal_indices);
    for ((triangle, uvs), normals) in corners {
        for corner in 0..3 {
            let vertex = usize::from(triangle[corner]);
            let [s, t] = uvs[corner];
            out.indices.push(out.positions.len() as u32);
            out.positions
                .push(model.vertices.get(vertex).copied().unwrap_or_default().to_array());
            out.normals.push(resolve_normal(model, normals[corner]));
            out.uvs
                .push(Mesh::normalized_uv(s, t, width, height).to_array());
            let bone = model.vertex_bones.get(vertex).copied().unwrap_or(0);
            out.joints.push([bone, 0, 0, 0]);
            out.weights.push([1.0, 0.0, 0.0, 0.0]);
        }
    }
    out
}

/// Build vertex streams for every mesh of `model` whose skin resolves.
pub fn build_model_geometry(model: &Model, textures: &[Texture]) -> Vec<MeshGeometry> {
    let mut meshes = Vec::with_capacity(model.meshes.len());
    for (index, mesh) in model.meshes.iter().enumerate() {
        let texture = usize::try_from(mesh.skin_ref)
            .ok()
            .and_then(|i| textures.get(i).map(|t| (i, t)));
        let Some((skin_ref, texture)) = texture else {
            tracing::debug!(
                "skipping mesh {} of {}: skin {} has no texture",
                index,
                model.name,
                mesh.skin_ref
            );
            continue;
        };
        meshes.push(mesh_geometry(model, mesh, skin_ref, texture));
    }
    meshes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{ImageSource, TextureFlags, TextureImage};
    use glam::Vec3;

    fn texture(width: i32, height: i32) -> Texture {
        Texture {
            name: "skin".into(),
            flags: TextureFlags::default(),
            width,
            height,
            data_offset: 0,
            image: TextureImage {
                width: width as u32,
                height: height as u32,
                rgba: Vec::new(),
                source: ImageSource::Skipped,
            },
        }
    }

    fn quad_model() -> Model {
        Model {
            name: "quad".into(),
            vertices: vec![
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            normals: vec![Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO],
            vertex_bones: vec![0, 1, 1, 2],
            meshes: vec![
                Mesh {
                    skin_ref: 0,
                    triangles: vec![[0, 1, 2], [0, 2, 3]],
                    uvs: vec![[[0, 0], [16, 0], [16, 16]], [[0, 0], [16, 16], [0, 16]]],
                    normal_indices: vec![[0, 0, 0], [0, 1, 7]],
                    ..Mesh::default()
                },
                Mesh {
                    skin_ref: 5,
                    triangles: vec![[0, 1, 2]],
                    uvs: vec![[[0, 0]; 3]],
                    normal_indices: vec![[0; 3]],
                    ..Mesh::default()
                },
            ],
            ..Model::default()
        }
    }

    #[test]
    fn test_streams_are_parallel() {
        let meshes = build_model_geometry(&quad_model(), &[texture(16, 16)]);
        assert_eq!(meshes.len(), 1);
        let g = &meshes[0];
        assert_eq!(g.vertex_count(), 6);
        assert_eq!(g.normals.len(), 6);
        assert_eq!(g.uvs.len(), 6);
        assert_eq!(g.joints.len(), 6);
        assert_eq!(g.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(g.positions[2], [1.0, 1.0, 0.0]);
        assert_eq!(g.joints[1], [1, 0, 0, 0]);
        assert_eq!(g.weights[0], [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_uvs_and_normals() {
        let meshes = build_model_geometry(&quad_model(), &[texture(16, 32)]);
        let g = &meshes[0];
        assert_eq!(g.uvs[1], [1.0, 1.0]);
        assert_eq!(g.uvs[2], [1.0, 0.5]);
        assert_eq!(g.normals[0], [0.0, 0.0, 1.0]);
        // zero-length and out-of-range normals fall back to +Y
        assert_eq!(g.normals[4], FALLBACK_NORMAL);
        assert_eq!(g.normals[5], FALLBACK_NORMAL);
    }

    #[test]
    fn test_byte_views() {
        let meshes = build_model_geometry(&quad_model(), &[texture(16, 16)]);
        let g = &meshes[0];
        assert_eq!(g.position_bytes().len(), 6 * 12);
        assert_eq!(g.normal_bytes().len(), 6 * 12);
        assert_eq!(g.uv_bytes().len(), 6 * 8);
        assert_eq!(g.joint_bytes().len(), 6 * 4);
        assert_eq!(g.weight_bytes().len(), 6 * 16);
        assert_eq!(g.index_bytes().len(), 6 * 4);
    }

    #[test]
    fn test_unresolved_skin_skipped() {
        assert!(build_model_geometry(&quad_model(), &[]).is_empty());
    }
}
