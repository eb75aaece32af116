//! Engine-agnostic animation clips
//!
//! Converts decoded [`Sequence`]s into per-joint keyframe tracks with
//! quaternion rotations, ready for a playback engine.

use glam::{EulerRot, Quat, Vec3};

use crate::sequence::Sequence;
use crate::skeleton::Skeleton;

/// Used when a sequence declares a non-positive or non-finite frame rate
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BoneTrack {
    pub joint: usize,
    pub joint_name: String,
    /// Sample times in seconds
    pub times: Vec<f32>,
    pub translations: Vec<Vec3>,
    pub rotations: Vec<Quat>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub fps: f32,
    /// Seconds
    pub duration: f32,
    pub looping: bool,
    pub tracks: Vec<BoneTrack>,
}

fn effective_fps(fps: f32) -> f32 {
    if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        DEFAULT_FRAME_RATE
    }
}

pub fn euler_to_quat(rotation: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z).normalize()
}

/// Build a clip from one sequence. Tracks exist only for bones that are in
/// the skeleton and have at least one decoded frame.
pub fn build_clip(sequence: &Sequence, skeleton: &Skeleton) -> AnimationClip {
    let fps = effective_fps(sequence.fps);
    let tracks = sequence
        .frames
        .iter()
        .zip(skeleton.joints())
        .enumerate()
        .filter(|(_, (frames, _))| !frames.positions.is_empty())
        .map(|(joint, (frames, j))| BoneTrack {
            joint,
            joint_name: j.name.clone(),
            times: (0..frames.positions.len())
                .map(|f| f as f32 / fps)
                .collect(),
            translations: frames.positions.clone(),
            rotations: frames.rotations.iter().copied().map(euler_to_quat).collect(),
        })
        .collect();

    AnimationClip {
        name: sequence.name.clone(),
        fps,
        duration: sequence.frame_count.max(0) as f32 / fps,
        looping: sequence.is_looping(),
        tracks,
    }
}

pub fn build_clips(sequences: &[Sequence], skeleton: &Skeleton) -> Vec<AnimationClip> {
    sequences.iter().map(|s| build_clip(s, skeleton)).collect()
}
