//! Decode errors and non-fatal warnings
//!
//! [`MdlError`] aborts whatever produced it. Whether that means the whole
//! parse or a single texture, mesh or sequence is decided by the caller;
//! recovered failures surface as [`DecodeWarning`]s instead.

use core::fmt;

/// Fatal decode error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MdlError {
    /// A read would run past the end of the buffer
    #[error("read of {len} bytes at offset {offset} exceeds buffer length {buffer_len}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },

    /// A declared offset (or seek target) lies outside the buffer
    #[error("invalid {field} offset: {offset}")]
    InvalidOffset { field: &'static str, offset: i64 },

    /// The 4-byte tag is not "IDST"
    #[error("invalid MDL magic {0:?} (expected \"IDST\")")]
    BadMagic([u8; 4]),

    /// Version field is not 10
    #[error("unsupported MDL version: {0} (only version 10 is supported)")]
    UnsupportedVersion(i32),

    /// A bone record could not be read; the skeleton is unusable
    #[error("failed to decode bone {index}: {source}")]
    Bone {
        index: usize,
        #[source]
        source: Box<MdlError>,
    },

    /// IO error while loading a file
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MdlError {
    fn from(e: std::io::Error) -> Self {
        MdlError::Io(e.to_string())
    }
}

/// Result alias used throughout the decoder.
pub type Result<T> = std::result::Result<T, MdlError>;

/// Non-fatal condition recorded while decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeWarning {
    /// Header file size disagrees with the buffer length
    SizeMismatch { declared: i32, actual: usize },
    /// Texture table ended early; only `read` of `declared` records exist
    TextureTableTruncated { read: usize, declared: usize },
    /// Texture replaced by the checkerboard placeholder
    TextureFallback {
        index: usize,
        name: String,
        reason: String,
    },
    /// Texture pixel data shorter than required; decoded partially
    TextureTruncated {
        index: usize,
        name: String,
        available: usize,
        required: usize,
    },
    /// Triangles referencing vertices past the model's vertex array
    TrianglesDropped {
        body_part: usize,
        model: usize,
        mesh: usize,
        count: usize,
    },
    /// Mesh command stream was malformed
    MeshSkipped {
        body_part: usize,
        model: usize,
        mesh: usize,
        error: MdlError,
    },
    /// Model record or its vertex arrays could not be read
    ModelSkipped {
        body_part: usize,
        model: usize,
        error: MdlError,
    },
    /// Body part has no usable models; an empty one was synthesized
    EmptyBodyPart { index: usize, name: String },
    /// Body part record could not be read
    BodyPartSkipped { index: usize, error: MdlError },
    /// Sequence record could not be read
    SequenceSkipped { index: usize, error: MdlError },
    /// Animation track region does not fit the buffer; frames left empty
    AnimationOutOfBounds {
        sequence: usize,
        offset: i64,
        required: usize,
    },
    /// Bone parent index is not -1 and not a valid other bone (or forms a cycle)
    InvalidBoneParent { bone: usize, parent: i32 },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::SizeMismatch { declared, actual } => write!(
                f,
                "file size mismatch: header claims {} bytes but buffer is {} bytes",
                declared, actual
            ),
            DecodeWarning::TextureTableTruncated { read, declared } => write!(
                f,
                "texture table truncated: read {} of {} records",
                read, declared
            ),
            DecodeWarning::TextureFallback {
                index,
                name,
                reason,
            } => write!(
                f,
                "texture {} ({}) replaced by placeholder: {}",
                index, name, reason
            ),
            DecodeWarning::TextureTruncated {
                index,
                name,
                available,
                required,
            } => write!(
                f,
                "texture {} ({}) data truncated: available {}, required {}",
                index, name, available, required
            ),
            DecodeWarning::TrianglesDropped {
                body_part,
                model,
                mesh,
                count,
            } => write!(
                f,
                "dropped {} triangle(s) with out-of-range vertices in body part {} model {} mesh {}",
                count, body_part, model, mesh
            ),
            DecodeWarning::MeshSkipped {
                body_part,
                model,
                mesh,
                error,
            } => write!(
                f,
                "skipped mesh {} of body part {} model {}: {}",
                mesh, body_part, model, error
            ),
            DecodeWarning::ModelSkipped {
                body_part,
                model,
                error,
            } => write!(
                f,
                "skipped model {} of body part {}: {}",
                model, body_part, error
            ),
            DecodeWarning::EmptyBodyPart { index, name } => write!(
                f,
                "no valid models in body part {} ({}), using an empty model",
                index, name
            ),
            DecodeWarning::BodyPartSkipped { index, error } => {
                write!(f, "skipped body part {}: {}", index, error)
            }
            DecodeWarning::SequenceSkipped { index, error } => {
                write!(f, "skipped sequence {}: {}", index, error)
            }
            DecodeWarning::AnimationOutOfBounds {
                sequence,
                offset,
                required,
            } => write!(
                f,
                "animation data for sequence {} at offset {} ({} bytes) exceeds buffer",
                sequence, offset, required
            ),
            DecodeWarning::InvalidBoneParent { bone, parent } => write!(
                f,
                "bone {} has invalid parent {}, attaching to root",
                bone, parent
            ),
        }
    }
}

/// Warning sink: every warning is logged once and kept in order.
#[derive(Debug, Default)]
pub(crate) struct Warnings {
    items: Vec<DecodeWarning>,
}

impl Warnings {
    pub(crate) fn push(&mut self, warning: DecodeWarning) {
        tracing::warn!("{}", warning);
        self.items.push(warning);
    }

    pub(crate) fn into_vec(self) -> Vec<DecodeWarning> {
        self.items
    }

    #[cfg(test)]
    pub(crate) fn as_slice(&self) -> &[DecodeWarning] {
        &self.items
    }
}
