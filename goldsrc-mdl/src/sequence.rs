//! Animation sequences
//!
//! # Record layout (176-byte stride)
//! ```text
//! 0x00: name [u8; 32]
//! 0x20: fps f32
//! 0x24: flags, activity, activity weight
//! 0x30: event count, event offset
//! 0x38: bbmin vec3, bbmax vec3
//! 0x50: blend count, anim offset, motion type, motion bone
//! 0x60: linear movement vec3
//! 0x6C: automove, frame count, pivot count, pivot offset
//! ```
//!
//! Anim and event offsets are relative to the start of the sequence table.
//! Animation data is `bone_count` runs of `frame_count` `(pos, rot)` pairs.

use glam::Vec3;

use crate::cursor::ByteCursor;
use crate::error::{DecodeWarning, MdlError, Result, Warnings};
use crate::header::Header;
use crate::{ANIM_FRAME_SIZE, EVENT_SIZE, SEQUENCE_SIZE};

/// Keyframes of one bone; both vectors have one entry per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneFrames {
    pub positions: Vec<Vec3>,
    /// Euler XYZ radians
    pub rotations: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub frame: i32,
    pub event_type: i32,
    pub options: String,
}

impl Event {
    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            frame: cursor.read_i32()?,
            event_type: cursor.read_i32()?,
            options: cursor.read_fixed_string(64)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub name: String,
    pub fps: f32,
    pub flags: i32,
    pub activity: i32,
    pub activity_weight: i32,
    pub event_count: i32,
    pub event_offset: i32,
    pub bbmin: Vec3,
    pub bbmax: Vec3,
    pub blend_count: i32,
    pub anim_offset: i32,
    pub motion_type: i32,
    pub motion_bone: i32,
    pub linear_movement: Vec3,
    pub automove: i32,
    pub frame_count: i32,
    pub pivot_count: i32,
    pub pivot_offset: i32,
    /// One entry per bone, or empty when the track is absent or unreadable
    pub frames: Vec<BoneFrames>,
    pub events: Vec<Event>,
}

impl Sequence {
    pub const LOOPING: i32 = 0x1;
    pub const NON_INTERP: i32 = 0x2;

    pub fn is_looping(&self) -> bool {
        self.flags & Self::LOOPING != 0
    }

    pub fn is_interpolated(&self) -> bool {
        self.flags & Self::NON_INTERP == 0
    }

    fn read_record(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            name: cursor.read_fixed_string(32)?,
            fps: cursor.read_f32()?,
            flags: cursor.read_i32()?,
            activity: cursor.read_i32()?,
            activity_weight: cursor.read_i32()?,
            event_count: cursor.read_i32()?,
            event_offset: cursor.read_i32()?,
            bbmin: cursor.read_vec3()?,
            bbmax: cursor.read_vec3()?,
            blend_count: cursor.read_i32()?,
            anim_offset: cursor.read_i32()?,
            motion_type: cursor.read_i32()?,
            motion_bone: cursor.read_i32()?,
            linear_movement: cursor.read_vec3()?,
            automove: cursor.read_i32()?,
            frame_count: cursor.read_i32()?,
            pivot_count: cursor.read_i32()?,
            pivot_offset: cursor.read_i32()?,
            frames: Vec::new(),
            events: Vec::new(),
        })
    }
}

/// Read `frame_count` pairs for each bone, stopping a bone early if the
/// buffer runs out.
fn read_frames(
    cursor: &mut ByteCursor<'_>,
    bone_count: usize,
    frame_count: usize,
) -> Vec<BoneFrames> {
    let mut frames = Vec::with_capacity(bone_count);
    for _ in 0..bone_count {
        let mut track = BoneFrames::default();
        for _ in 0..frame_count {
            if cursor.remaining() < ANIM_FRAME_SIZE {
                break;
            }
            let (Ok(pos), Ok(rot)) = (cursor.read_vec3(), cursor.read_vec3()) else {
                break;
            };
            track.positions.push(pos);
            track.rotations.push(rot);
        }
        frames.push(track);
    }
    frames
}

/// Events are read while whole records remain; a short tail is normal.
fn read_events(cursor: &mut ByteCursor<'_>, count: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..count {
        if cursor.remaining() < EVENT_SIZE {
            break;
        }
        match Event::read(cursor) {
            Ok(e) => events.push(e),
            Err(_) => break,
        }
    }
    events
}

fn absolute(table: i32, relative: i32) -> i64 {
    i64::from(table) + i64::from(relative)
}

fn read_sequence(
    cursor: &mut ByteCursor<'_>,
    header: &Header,
    index: usize,
    record_offset: usize,
    warnings: &mut Warnings,
) -> Result<Sequence> {
    cursor.seek(record_offset)?;
    let mut sequence = Sequence::read_record(cursor)?;

    if sequence.anim_offset > 0 && sequence.frame_count > 0 {
        let bone_count = header.bones.len();
        let frame_count = sequence.frame_count as usize;
        let offset = absolute(header.sequences.offset, sequence.anim_offset);
        let required = frame_count
            .saturating_mul(bone_count)
            .saturating_mul(ANIM_FRAME_SIZE);
        let fits = offset < cursor.len() as i64
            && (offset as usize)
                .checked_add(required)
                .is_some_and(|end| end <= cursor.len());
        if fits {
            cursor.seek(offset as usize)?;
            sequence.frames = read_frames(cursor, bone_count, frame_count);
        } else {
            warnings.push(DecodeWarning::AnimationOutOfBounds {
                sequence: index,
                offset,
                required,
            });
        }
    }

    if sequence.event_offset > 0 && sequence.event_count > 0 {
        let offset = absolute(header.sequences.offset, sequence.event_offset);
        if offset < cursor.len() as i64 {
            cursor.seek(offset as usize)?;
            sequence.events = read_events(cursor, sequence.event_count as usize);
        }
    }

    tracing::trace!(
        index,
        name = %sequence.name,
        frames = sequence.frame_count,
        tracks = sequence.frames.len(),
        events = sequence.events.len(),
        "sequence"
    );
    Ok(sequence)
}

/// Decode the sequence table. A record that cannot be read is skipped and
/// decoding resumes at the next 176-byte stride.
pub(crate) fn read_sequences(
    cursor: &mut ByteCursor<'_>,
    header: &Header,
    warnings: &mut Warnings,
) -> Vec<Sequence> {
    if header.sequences.count <= 0 || header.sequences.offset <= 0 {
        return Vec::new();
    }

    let base = header.sequences.offset as usize;
    let declared = header.sequences.len();
    let mut sequences = Vec::new();
    for index in 0..declared {
        let record_offset = base + index * SEQUENCE_SIZE;
        if record_offset >= cursor.len() {
            warnings.push(DecodeWarning::SequenceSkipped {
                index,
                error: MdlError::InvalidOffset {
                    field: "sequence",
                    offset: record_offset as i64,
                },
            });
            break;
        }
        match cursor.scoped(|c| read_sequence(c, header, index, record_offset, warnings)) {
            Ok(sequence) => sequences.push(sequence),
            Err(error) => warnings.push(DecodeWarning::SequenceSkipped { index, error }),
        }
    }

    tracing::debug!("decoded {} of {} sequences", sequences.len(), declared);
    sequences
}
