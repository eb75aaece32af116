//! Synthetic GoldSrc MDL v10 writer
//!
//! Builds small, well-formed `.mdl` buffers from plain definitions so tests can
//! exercise the decoder without shipping binary fixtures. The output can then
//! be damaged on purpose with [`patch_i32`] or `Vec::truncate`.
//!
//! # Layout written
//! ```text
//! header (244)
//! bone table, texture table, body part table
//! per body part: model records, then per model: mesh records, vertices,
//!                normals, vertex bone bytes, triangle command streams
//! sequence table (176-byte stride), then animation tracks and events
//! texture pixel data (indices + palette), last
//! ```

/// Byte offsets of header fields
pub mod header {
    pub const MAGIC: usize = 0;
    pub const VERSION: usize = 4;
    pub const NAME: usize = 8;
    pub const FILE_SIZE: usize = 72;
    pub const BONE_COUNT: usize = 140;
    pub const BONE_OFFSET: usize = 144;
    pub const SEQUENCE_COUNT: usize = 164;
    pub const SEQUENCE_OFFSET: usize = 168;
    pub const TEXTURE_COUNT: usize = 180;
    pub const TEXTURE_OFFSET: usize = 184;
    pub const TEXTURE_DATA_OFFSET: usize = 188;
    pub const BODY_PART_COUNT: usize = 204;
    pub const BODY_PART_OFFSET: usize = 208;
    pub const SIZE: usize = 244;
}

pub const BONE_SIZE: usize = 112;
pub const TEXTURE_SIZE: usize = 80;
pub const BODY_PART_SIZE: usize = 76;
pub const MODEL_SIZE: usize = 112;
pub const MESH_SIZE: usize = 20;
pub const SEQUENCE_SIZE: usize = 176;

/// Overwrite a little-endian `i32` in place.
pub fn patch_i32(data: &mut [u8], at: usize, value: i32) {
    data[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn read_i32(data: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoneDef {
    pub name: String,
    pub parent: i32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

impl BoneDef {
    pub fn new(name: &str, parent: i32, position: [f32; 3], rotation: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            parent,
            position,
            rotation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureDef {
    pub name: String,
    pub flags: i32,
    pub width: i32,
    pub height: i32,
    /// Palette indices in storage order (bottom row first)
    pub indices: Vec<u8>,
    /// 768 bytes of RGB
    pub palette: Vec<u8>,
    /// Written instead of the real data offset; pixels are then omitted
    pub data_offset_override: Option<i32>,
}

impl TextureDef {
    pub fn new(name: &str, flags: i32, width: i32, height: i32, indices: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            flags,
            width,
            height,
            indices,
            palette: grayscale_palette(),
            data_offset_override: None,
        }
    }

    pub fn with_palette(mut self, palette: Vec<u8>) -> Self {
        self.palette = palette;
        self
    }
}

/// Entry `i` is `(i, i, i)`.
pub fn grayscale_palette() -> Vec<u8> {
    (0..=255u8).flat_map(|i| [i, i, i]).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrivertDef {
    pub vertex: u16,
    pub normal: u16,
    pub s: u16,
    pub t: u16,
}

pub fn trivert(vertex: u16, normal: u16, s: u16, t: u16) -> TrivertDef {
    TrivertDef {
        vertex,
        normal,
        s,
        t,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriCommand {
    Fan(Vec<TrivertDef>),
    Strip(Vec<TrivertDef>),
}

impl TriCommand {
    fn triverts(&self) -> &[TrivertDef] {
        match self {
            TriCommand::Fan(v) | TriCommand::Strip(v) => v,
        }
    }

    fn triangle_count(&self) -> usize {
        self.triverts().len().saturating_sub(2)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshDef {
    pub skin_ref: i32,
    pub commands: Vec<TriCommand>,
    /// Defaults to the number of triangles the commands expand to
    pub tri_count: Option<i32>,
    /// Written instead of the real stream offset; the stream is then omitted
    pub tri_offset_override: Option<i32>,
}

impl MeshDef {
    pub fn new(skin_ref: i32, commands: Vec<TriCommand>) -> Self {
        Self {
            skin_ref,
            commands,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelDef {
    pub name: String,
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// One byte per vertex; no info offset is written when `None`
    pub vertex_bones: Option<Vec<u8>>,
    pub meshes: Vec<MeshDef>,
    /// Written instead of the real vertex offset
    pub vertex_offset_override: Option<i32>,
}

impl ModelDef {
    pub fn new(name: &str, vertices: Vec<[f32; 3]>, meshes: Vec<MeshDef>) -> Self {
        Self {
            name: name.to_string(),
            normals: vec![[0.0, 0.0, 1.0]; vertices.len()],
            vertices,
            meshes,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyPartDef {
    pub name: String,
    pub models: Vec<ModelDef>,
}

impl BodyPartDef {
    pub fn new(name: &str, models: Vec<ModelDef>) -> Self {
        Self {
            name: name.to_string(),
            models,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDef {
    pub frame: i32,
    pub event_type: i32,
    pub options: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDef {
    pub name: String,
    pub fps: f32,
    pub flags: i32,
    pub frame_count: i32,
    /// Per bone, `frame_count` `(position, rotation)` pairs
    pub frames: Vec<Vec<([f32; 3], [f32; 3])>>,
    pub events: Vec<EventDef>,
    /// Written instead of the real (table-relative) animation offset
    pub anim_offset_override: Option<i32>,
}

impl SequenceDef {
    pub fn new(
        name: &str,
        fps: f32,
        flags: i32,
        frames: Vec<Vec<([f32; 3], [f32; 3])>>,
    ) -> Self {
        let frame_count = frames.first().map_or(0, |f| f.len() as i32);
        Self {
            name: name.to_string(),
            fps,
            flags,
            frame_count,
            frames,
            events: Vec::new(),
            anim_offset_override: None,
        }
    }
}

/// Where each part of the last build landed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub bone_table: usize,
    pub texture_table: usize,
    pub body_part_table: usize,
    pub sequence_table: usize,
    /// Start of each texture's indices (0 when omitted)
    pub texture_pixels: Vec<usize>,
    /// Start of each model record, body part major
    pub models: Vec<usize>,
    /// Start of each mesh record, in write order
    pub meshes: Vec<usize>,
}

#[derive(Debug, Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn pos(&self) -> usize {
        self.buf.len()
    }

    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn vec3(&mut self, v: [f32; 3]) {
        for x in v {
            self.f32(x);
        }
    }

    fn name(&mut self, s: &str, len: usize) {
        let mut field = vec![0u8; len];
        let n = s.len().min(len - 1);
        field[..n].copy_from_slice(&s.as_bytes()[..n]);
        self.buf.extend_from_slice(&field);
    }

    fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    fn zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    fn patch(&mut self, at: usize, v: i32) {
        patch_i32(&mut self.buf, at, v);
    }
}

/// Builder for a complete MDL v10 buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MdlBuilder {
    pub name: String,
    pub bones: Vec<BoneDef>,
    pub textures: Vec<TextureDef>,
    pub body_parts: Vec<BodyPartDef>,
    pub sequences: Vec<SequenceDef>,
}

impl MdlBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn bone(mut self, bone: BoneDef) -> Self {
        self.bones.push(bone);
        self
    }

    pub fn texture(mut self, texture: TextureDef) -> Self {
        self.textures.push(texture);
        self
    }

    pub fn body_part(mut self, body_part: BodyPartDef) -> Self {
        self.body_parts.push(body_part);
        self
    }

    pub fn sequence(mut self, sequence: SequenceDef) -> Self {
        self.sequences.push(sequence);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_with_layout().0
    }

    pub fn build_with_layout(&self) -> (Vec<u8>, Layout) {
        let mut w = Writer::default();
        let mut layout = Layout::default();
        w.zeros(header::SIZE);

        // Bones
        if !self.bones.is_empty() {
            layout.bone_table = w.pos();
        }
        for bone in &self.bones {
            w.name(&bone.name, 32);
            w.i32(bone.parent);
            w.i32(0);
            for _ in 0..6 {
                w.i32(-1);
            }
            w.vec3(bone.position);
            w.vec3(bone.rotation);
            w.vec3([1.0; 3]);
            w.vec3([1.0; 3]);
        }

        // Texture records; data offsets patched once pixels are placed
        if !self.textures.is_empty() {
            layout.texture_table = w.pos();
        }
        for texture in &self.textures {
            w.name(&texture.name, 64);
            w.i32(texture.flags);
            w.i32(texture.width);
            w.i32(texture.height);
            w.i32(texture.data_offset_override.unwrap_or(0));
        }

        // Body part records; model offsets patched below
        if !self.body_parts.is_empty() {
            layout.body_part_table = w.pos();
        }
        for part in &self.body_parts {
            w.name(&part.name, 64);
            w.i32(part.models.len() as i32);
            w.i32(1);
            w.i32(0);
        }

        for (p, part) in self.body_parts.iter().enumerate() {
            let models_start = w.pos();
            let part_record = layout.body_part_table + p * BODY_PART_SIZE;
            if !part.models.is_empty() {
                w.patch(part_record + 72, models_start as i32);
            }
            for model in &part.models {
                layout.models.push(w.pos());
                w.name(&model.name, 64);
                w.i32(0);
                w.f32(1.0);
                w.zeros(MODEL_SIZE - 72);
            }
            for (m, model) in part.models.iter().enumerate() {
                self.write_model_data(&mut w, &mut layout, models_start + m * MODEL_SIZE, model);
            }
        }

        // Sequences
        if !self.sequences.is_empty() {
            layout.sequence_table = w.pos();
        }
        for sequence in &self.sequences {
            let start = w.pos();
            w.name(&sequence.name, 32);
            w.f32(sequence.fps);
            w.i32(sequence.flags);
            w.i32(0); // activity
            w.i32(1); // activity weight
            w.i32(sequence.events.len() as i32);
            w.i32(0); // event offset
            w.vec3([-1.0; 3]);
            w.vec3([1.0; 3]);
            w.i32(1); // blend count
            w.i32(sequence.anim_offset_override.unwrap_or(0));
            w.i32(0); // motion type
            w.i32(0); // motion bone
            w.vec3([0.0; 3]);
            w.i32(0); // automove
            w.i32(sequence.frame_count);
            w.i32(0); // pivot count
            w.i32(0); // pivot offset
            w.zeros(SEQUENCE_SIZE - (w.pos() - start));
        }
        for (i, sequence) in self.sequences.iter().enumerate() {
            let record = layout.sequence_table + i * SEQUENCE_SIZE;
            if sequence.anim_offset_override.is_none() && !sequence.frames.is_empty() {
                w.patch(record + 84, (w.pos() - layout.sequence_table) as i32);
                for bone in &sequence.frames {
                    for (pos, rot) in bone {
                        w.vec3(*pos);
                        w.vec3(*rot);
                    }
                }
            }
            if !sequence.events.is_empty() {
                w.patch(record + 52, (w.pos() - layout.sequence_table) as i32);
                for event in &sequence.events {
                    w.i32(event.frame);
                    w.i32(event.event_type);
                    w.name(&event.options, 64);
                }
            }
        }

        // Texture pixels
        let texture_data = w.pos();
        for (i, texture) in self.textures.iter().enumerate() {
            if texture.data_offset_override.is_some() {
                layout.texture_pixels.push(0);
                continue;
            }
            let start = w.pos();
            layout.texture_pixels.push(start);
            w.patch(layout.texture_table + i * TEXTURE_SIZE + 76, start as i32);
            w.bytes(&texture.indices);
            w.bytes(&texture.palette);
        }

        self.write_header(&mut w, &layout, texture_data);
        (w.buf, layout)
    }

    fn write_model_data(
        &self,
        w: &mut Writer,
        layout: &mut Layout,
        record: usize,
        model: &ModelDef,
    ) {
        let mesh_start = w.pos();
        w.patch(record + 72, model.meshes.len() as i32);
        if !model.meshes.is_empty() {
            w.patch(record + 76, mesh_start as i32);
        }
        for mesh in &model.meshes {
            layout.meshes.push(w.pos());
            let tri_count = mesh.tri_count.unwrap_or_else(|| {
                mesh.commands.iter().map(TriCommand::triangle_count).sum::<usize>() as i32
            });
            w.i32(tri_count);
            w.i32(mesh.tri_offset_override.unwrap_or(0));
            w.i32(mesh.skin_ref);
            w.i32(0);
            w.i32(0);
        }

        w.patch(record + 80, model.vertices.len() as i32);
        if !model.vertices.is_empty() {
            w.patch(record + 88, model.vertex_offset_override.unwrap_or(w.pos() as i32));
        }
        for v in &model.vertices {
            w.vec3(*v);
        }

        w.patch(record + 92, model.normals.len() as i32);
        if !model.normals.is_empty() {
            w.patch(record + 100, w.pos() as i32);
        }
        for n in &model.normals {
            w.vec3(*n);
        }

        if let Some(bones) = &model.vertex_bones {
            w.patch(record + 84, w.pos() as i32);
            w.bytes(bones);
        }

        for (i, mesh) in model.meshes.iter().enumerate() {
            if mesh.tri_offset_override.is_some() {
                continue;
            }
            w.patch(mesh_start + i * MESH_SIZE + 4, w.pos() as i32);
            for command in &mesh.commands {
                let (count, verts) = match command {
                    TriCommand::Fan(v) => (-(v.len() as i16), v),
                    TriCommand::Strip(v) => (v.len() as i16, v),
                };
                w.i16(count);
                for t in verts {
                    w.u16(t.vertex);
                    w.u16(t.normal);
                    w.u16(t.s);
                    w.u16(t.t);
                }
            }
            w.i16(0);
        }
    }

    fn write_header(&self, w: &mut Writer, layout: &Layout, texture_data: usize) {
        let len = w.pos() as i32;
        w.buf[header::MAGIC..header::MAGIC + 4].copy_from_slice(b"IDST");
        w.patch(header::VERSION, 10);
        let mut name = [0u8; 64];
        let n = self.name.len().min(63);
        name[..n].copy_from_slice(&self.name.as_bytes()[..n]);
        w.buf[header::NAME..header::NAME + 64].copy_from_slice(&name);
        w.patch(header::FILE_SIZE, len);

        w.patch(header::BONE_COUNT, self.bones.len() as i32);
        w.patch(header::BONE_OFFSET, layout.bone_table as i32);
        w.patch(header::TEXTURE_COUNT, self.textures.len() as i32);
        w.patch(header::TEXTURE_OFFSET, layout.texture_table as i32);
        let has_pixels = layout.texture_pixels.iter().any(|&p| p != 0);
        w.patch(
            header::TEXTURE_DATA_OFFSET,
            if has_pixels { texture_data as i32 } else { 0 },
        );
        w.patch(header::BODY_PART_COUNT, self.body_parts.len() as i32);
        w.patch(header::BODY_PART_OFFSET, layout.body_part_table as i32);
        w.patch(header::SEQUENCE_COUNT, self.sequences.len() as i32);
        w.patch(header::SEQUENCE_OFFSET, layout.sequence_table as i32);
    }
}

/// Two-bone model with one textured quad, a 16x16 gradient skin and a short
/// looping sequence.
pub fn sample_model() -> MdlBuilder {
    let indices: Vec<u8> = (0..16u8)
        .flat_map(|y| (0..16u8).map(move |x| x * 8 + y))
        .collect();
    let quad = ModelDef {
        vertex_bones: Some(vec![0, 0, 1, 1]),
        ..ModelDef::new(
            "quad",
            vec![
                [0.0, 0.0, 0.0],
                [16.0, 0.0, 0.0],
                [16.0, 0.0, 16.0],
                [0.0, 0.0, 16.0],
            ],
            vec![MeshDef::new(
                0,
                vec![TriCommand::Fan(vec![
                    trivert(0, 0, 0, 16),
                    trivert(1, 1, 16, 16),
                    trivert(2, 2, 16, 0),
                    trivert(3, 3, 0, 0),
                ])],
            )],
        )
    };

    let frames = |bone: usize| -> Vec<([f32; 3], [f32; 3])> {
        (0..10)
            .map(|f| {
                let angle = f as f32 * 0.1;
                ([0.0, 0.0, bone as f32 * 8.0], [0.0, 0.0, angle])
            })
            .collect()
    };
    let mut idle = SequenceDef::new("idle", 10.0, 1, vec![frames(0), frames(1)]);
    idle.events.push(EventDef {
        frame: 5,
        event_type: 1004,
        options: "common/null.wav".into(),
    });

    MdlBuilder::new("sample")
        .bone(BoneDef::new("Bip01", -1, [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]))
        .bone(BoneDef::new("Bip01 Spine", 0, [0.0, 0.0, 8.0], [0.0, 0.0, 0.0]))
        .texture(TextureDef::new("gradient.bmp", 0, 16, 16, indices))
        .body_part(BodyPartDef::new("body", vec![quad]))
        .sequence(idle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let data = sample_model().build();
        assert_eq!(&data[0..4], b"IDST");
        assert_eq!(read_i32(&data, header::VERSION), 10);
        assert_eq!(read_i32(&data, header::FILE_SIZE), data.len() as i32);
        assert_eq!(read_i32(&data, header::BONE_COUNT), 2);
        assert_eq!(read_i32(&data, header::BONE_OFFSET), header::SIZE as i32);
        assert_eq!(read_i32(&data, header::TEXTURE_COUNT), 1);
        assert_eq!(read_i32(&data, header::SEQUENCE_COUNT), 1);
    }

    #[test]
    fn test_texture_pixels_are_last() {
        let builder = sample_model();
        let (data, layout) = builder.build_with_layout();
        let start = layout.texture_pixels[0];
        assert_eq!(data.len(), start + 16 * 16 + 768);
        assert_eq!(read_i32(&data, layout.texture_table + 76), start as i32);
    }

    #[test]
    fn test_record_strides() {
        let (data, layout) = sample_model().build_with_layout();
        assert_eq!(layout.texture_table, header::SIZE + 2 * BONE_SIZE);
        assert_eq!(layout.body_part_table, layout.texture_table + TEXTURE_SIZE);
        assert_eq!(layout.models[0], layout.body_part_table + BODY_PART_SIZE);
        assert_eq!(layout.meshes[0], layout.models[0] + MODEL_SIZE);
        assert_eq!(read_i32(&data, layout.meshes[0]), 2); // fan of 4 = 2 triangles
    }

    #[test]
    fn test_empty_builder_is_header_only() {
        let data = MdlBuilder::new("empty").build();
        assert_eq!(data.len(), header::SIZE);
        assert_eq!(read_i32(&data, header::BONE_OFFSET), 0);
    }

    #[test]
    fn test_patch_i32() {
        let mut data = vec![0u8; 8];
        patch_i32(&mut data, 4, -2);
        assert_eq!(read_i32(&data, 4), -2);
        assert_eq!(&data[..4], &[0, 0, 0, 0]);
    }
}
