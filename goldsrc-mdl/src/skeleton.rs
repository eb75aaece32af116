//! Bone hierarchy and bind pose
//!
//! Bones whose parent is `-1` hang off a synthetic root that is not stored in
//! the file; [`Skeleton::roots`] lists them. World matrices are composed top
//! down from that root, and the exposed local matrices are re-derived from the
//! world matrices so that recomposing down the tree reproduces the world pose.

use glam::{EulerRot, Mat4, Quat};
use hashbrown::HashMap;

use crate::bone::Bone;
use crate::error::{DecodeWarning, Warnings};

/// A bone placed in the hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    /// `None` when attached to the synthetic root
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Transform relative to the parent's world frame
    pub local: Mat4,
    /// Bind pose in model space
    pub world: Mat4,
    /// `world.inverse()`, used for skinning
    pub inverse_bind: Mat4,
}

/// Derived skeleton; joint `i` corresponds to bone `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    joints: Vec<Joint>,
    roots: Vec<usize>,
    by_name: HashMap<String, usize>,
}

/// Local transform of a bone record: translation(pos) * rotation(euler XYZ).
pub fn bone_local_matrix(bone: &Bone) -> Mat4 {
    let rotation = Quat::from_euler(
        EulerRot::XYZ,
        bone.rotation.x,
        bone.rotation.y,
        bone.rotation.z,
    );
    Mat4::from_rotation_translation(rotation, bone.position)
}

impl Skeleton {
    pub(crate) fn build(bones: &[Bone], warnings: &mut Warnings) -> Self {
        let parents = resolve_parents(bones, warnings);

        let mut roots = Vec::new();
        let mut children = vec![Vec::new(); bones.len()];
        for (index, parent) in parents.iter().enumerate() {
            match parent {
                Some(p) => children[*p].push(index),
                None => roots.push(index),
            }
        }

        let order = depth_first_order(&roots, &children);
        let raw_local: Vec<Mat4> = bones.iter().map(bone_local_matrix).collect();
        let mut world = vec![Mat4::IDENTITY; bones.len()];
        for &index in &order {
            world[index] = match parents[index] {
                Some(p) => world[p] * raw_local[index],
                None => raw_local[index],
            };
        }

        let mut by_name = HashMap::with_capacity(bones.len());
        let mut joints = Vec::with_capacity(bones.len());
        for (index, (bone, kids)) in bones.iter().zip(children).enumerate() {
            let local = match parents[index] {
                Some(p) => world[p].inverse() * world[index],
                None => world[index],
            };
            // First bone wins on duplicate names
            by_name.entry(bone.name.clone()).or_insert(index);
            joints.push(Joint {
                name: bone.name.clone(),
                parent: parents[index],
                children: kids,
                local,
                world: world[index],
                inverse_bind: world[index].inverse(),
            });
        }

        tracing::debug!(
            "built skeleton: {} joints, {} roots",
            joints.len(),
            roots.len()
        );
        Self {
            joints,
            roots,
            by_name,
        }
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    /// Index of the first joint with this name
    pub fn find(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Children of the synthetic root, in bone order
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.joints
            .get(index)
            .map(|j| j.children.as_slice())
            .unwrap_or(&[])
    }

    /// Pre-order traversal from the synthetic root; parents precede children.
    pub fn depth_first(&self) -> Vec<usize> {
        let children: Vec<Vec<usize>> = self.joints.iter().map(|j| j.children.clone()).collect();
        depth_first_order(&self.roots, &children)
    }

    /// Number of ancestors between a joint and the synthetic root
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.joints.get(index).and_then(|j| j.parent);
        while let Some(p) = current {
            depth += 1;
            current = self.joints[p].parent;
        }
        depth
    }

    pub fn inverse_bind_matrices(&self) -> Vec<Mat4> {
        self.joints.iter().map(|j| j.inverse_bind).collect()
    }
}

/// Map raw parent indices to valid ones, attaching bad parents to the root.
///
/// Self references, out-of-range indices and cycles all become `None` with an
/// [`DecodeWarning::InvalidBoneParent`]. Cycles are broken at the first bone
/// (in index order) found to reach itself.
fn resolve_parents(bones: &[Bone], warnings: &mut Warnings) -> Vec<Option<usize>> {
    let count = bones.len();
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(count);
    for (index, bone) in bones.iter().enumerate() {
        let parent = match bone.parent {
            -1 => None,
            p if p >= 0 && (p as usize) < count && p as usize != index => Some(p as usize),
            p => {
                warnings.push(DecodeWarning::InvalidBoneParent {
                    bone: index,
                    parent: p,
                });
                None
            }
        };
        parents.push(parent);
    }

    for index in 0..count {
        let mut current = parents[index];
        let mut steps = 0;
        while let Some(p) = current {
            if p == index {
                warnings.push(DecodeWarning::InvalidBoneParent {
                    bone: index,
                    parent: bones[index].parent,
                });
                parents[index] = None;
                break;
            }
            steps += 1;
            if steps > count {
                break;
            }
            current = parents[p];
        }
    }

    parents
}

fn depth_first_order(roots: &[usize], children: &[Vec<usize>]) -> Vec<usize> {
    let mut order = Vec::with_capacity(children.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(index) = stack.pop() {
        order.push(index);
        stack.extend(children[index].iter().rev().copied());
    }
    order
}
