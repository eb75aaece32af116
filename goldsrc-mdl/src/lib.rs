//! goldsrc-mdl: GoldSrc studio model (MDL version 10) decoder
//!
//! Decodes a complete `.mdl` buffer into an engine-agnostic data model:
//! bone hierarchy with bind matrices, indexed triangle meshes with raw texel
//! UVs, palette textures converted to RGBA, and keyframe sequences.
//!
//! Malformed or modded files are handled defensively. Only header problems and
//! an unreadable bone table fail the decode; a bad texture, mesh, model, body
//! part or sequence is replaced or skipped and reported as a
//! [`DecodeWarning`].
//!
//! # Usage
//!
//! ```ignore
//! use goldsrc_mdl::decode;
//!
//! let data = std::fs::read("scientist.mdl").unwrap();
//! let mdl = decode(&data).unwrap();
//!
//! println!("Model: {}", mdl.header.name);
//! for joint in mdl.skeleton.joints() {
//!     println!("  bone {}", joint.name);
//! }
//! for warning in &mdl.warnings {
//!     println!("  warning: {warning}");
//! }
//! ```

mod bone;
mod clip;
mod cursor;
mod error;
mod geometry;
mod header;
mod mesh;
mod model;
mod sequence;
mod skeleton;
mod texture;

pub use bone::Bone;
pub use clip::{
    AnimationClip, BoneTrack, DEFAULT_FRAME_RATE, build_clip, build_clips, euler_to_quat,
};
pub use cursor::{ByteCursor, fixed_str};
pub use error::{DecodeWarning, MdlError, Result};
pub use geometry::{MeshGeometry, build_model_geometry};
pub use header::{Header, Section, parse_header};
pub use mesh::{BodyPart, Mesh, Model, Trivert, expand_fan, expand_strip};
pub use model::{DecodeOptions, Mdl, decode, decode_with_options, load_file};
pub use sequence::{BoneFrames, Event, Sequence};
pub use skeleton::{Joint, Skeleton, bone_local_matrix};
pub use texture::{
    ImageSource, MISSING_PIXEL, Texture, TextureFlags, TextureImage, checkerboard, flip_rows,
    palette_rgba,
};

// =============================================================================
// Format Constants
// =============================================================================

/// File tag
pub const MDL_MAGIC: &[u8; 4] = b"IDST";

/// The only supported version
pub const MDL_VERSION: i32 = 10;

/// Size of the fixed file header
pub const HEADER_SIZE: usize = 244;

/// Bone record size
pub const BONE_SIZE: usize = 112;

/// Texture record size
pub const TEXTURE_SIZE: usize = 80;

/// Body part record size
pub const BODY_PART_SIZE: usize = 76;

/// Model record size
pub const MODEL_SIZE: usize = 112;

/// Mesh record size
pub const MESH_SIZE: usize = 20;

/// Trivert size inside the triangle command stream
pub const TRIVERT_SIZE: usize = 8;

/// Stride between sequence records
pub const SEQUENCE_SIZE: usize = 176;

/// Event record size
pub const EVENT_SIZE: usize = 72;

/// One `(pos, rot)` keyframe of one bone
pub const ANIM_FRAME_SIZE: usize = 24;

/// 256 RGB entries following each texture's indices
pub const PALETTE_SIZE: usize = 768;

/// Default bound on texture width and height
pub const MAX_TEXTURE_DIMENSION: u32 = 2048;
