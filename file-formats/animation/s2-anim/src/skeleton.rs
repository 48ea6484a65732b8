//! Bone hierarchy built from a model's bind-pose data
//!
//! A [`Skeleton`] owns every [`Bone`] in a flat arena. Parent and child links
//! are indices into that arena, and a depth-first traversal order is computed
//! once so the pose composer can walk the hierarchy without recursion.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

use crate::error::{AnimError, Result};
use crate::frame::Frame;
use crate::keyvalues::KeyValues;

/// A single bone of a skeleton
#[derive(Debug, Clone)]
pub struct Bone {
    /// Bone name, used to resolve animation channels
    pub name: String,
    /// Index of this bone in [`Skeleton::bones`]
    pub index: usize,
    /// Slot in the skinning matrix array, `None` if not exposed to skinning
    pub render_index: Option<usize>,
    /// Parent bone index (`None` for roots)
    pub parent: Option<usize>,
    /// Child bone indices
    pub children: Vec<usize>,
    /// Bind position relative to the parent
    pub position: Vec3,
    /// Bind rotation relative to the parent
    pub rotation: Quat,
    /// Parent-space bind transform
    pub bind_pose: Mat4,
    /// Inverse of [`Bone::bind_pose`]
    pub inverse_bind_pose: Mat4,
    /// Model-space bind transform
    pub world_bind_pose: Mat4,
    /// Inverse of [`Bone::world_bind_pose`]
    pub inverse_world_bind_pose: Mat4,
}

impl Bone {
    fn new(index: usize, name: String, position: Vec3, rotation: Quat) -> Self {
        let bind_pose = Mat4::from_rotation_translation(rotation, position);
        Self {
            name,
            index,
            render_index: None,
            parent: None,
            children: Vec::new(),
            position,
            rotation,
            bind_pose,
            inverse_bind_pose: bind_pose.inverse(),
            world_bind_pose: Mat4::IDENTITY,
            inverse_world_bind_pose: Mat4::IDENTITY,
        }
    }

    /// Render index as stored in resources (`-1` when not skinned)
    pub fn render_index_i32(&self) -> i32 {
        self.render_index.map_or(-1, |i| i as i32)
    }

    /// Check whether this bone is a root
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Immutable bone hierarchy
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    roots: Vec<usize>,
    traversal: Vec<usize>,
    name_to_index: HashMap<String, usize>,
    render_bone_count: usize,
}

impl Skeleton {
    /// Create a skeleton with no bones
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a skeleton from flat per-bone arrays
    ///
    /// # Arguments
    /// * `names` - Bone names
    /// * `parents` - Parent index for each bone (`-1` for roots)
    /// * `positions` - Parent-space bind positions
    /// * `rotations` - Parent-space bind rotations
    /// * `remap_table` - Render slot → bone index table; each bone's render
    ///   index is the first slot that maps to it
    pub fn from_parts(
        names: Vec<String>,
        parents: &[i64],
        positions: &[Vec3],
        rotations: &[Quat],
        remap_table: &[i64],
    ) -> Result<Self> {
        let count = names.len();
        if parents.len() != count || positions.len() != count || rotations.len() != count {
            return Err(AnimError::InvalidSkeleton(format!(
                "bone arrays disagree: {} names, {} parents, {} positions, {} rotations",
                count,
                parents.len(),
                positions.len(),
                rotations.len()
            )));
        }

        let mut render_indices: HashMap<usize, usize> = HashMap::new();
        for (slot, &bone) in remap_table.iter().enumerate() {
            if bone >= 0 {
                render_indices.entry(bone as usize).or_insert(slot);
            }
        }

        let mut bones: Vec<Bone> = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let mut bone = Bone::new(i, name, positions[i], rotations[i].normalize());
                bone.render_index = render_indices.get(&i).copied();
                bone
            })
            .collect();

        let mut roots = Vec::new();
        for (i, &parent) in parents.iter().enumerate() {
            if parent == -1 {
                roots.push(i);
                continue;
            }

            let parent = usize::try_from(parent)
                .ok()
                .filter(|&p| p < count && p != i)
                .ok_or_else(|| {
                    AnimError::InvalidSkeleton(format!(
                        "bone {} ('{}') has invalid parent {}",
                        i, bones[i].name, parent
                    ))
                })?;

            bones[i].parent = Some(parent);
            bones[parent].children.push(i);
        }

        let traversal = depth_first_order(&bones, &roots);
        if traversal.len() != count {
            return Err(AnimError::InvalidSkeleton(format!(
                "bone hierarchy contains a cycle ({} of {} bones reachable from roots)",
                traversal.len(),
                count
            )));
        }

        for &i in &traversal {
            let world = match bones[i].parent {
                Some(parent) => bones[parent].world_bind_pose * bones[i].bind_pose,
                None => bones[i].bind_pose,
            };
            bones[i].world_bind_pose = world;
            bones[i].inverse_world_bind_pose = world.inverse();
        }

        let mut name_to_index = HashMap::with_capacity(count);
        for bone in &bones {
            if name_to_index.insert(bone.name.clone(), bone.index).is_some() {
                log::warn!("Duplicate bone name '{}', channels resolve to the last one", bone.name);
            }
        }

        let render_bone_count = bones
            .iter()
            .filter_map(|b| b.render_index)
            .max()
            .map_or(0, |max| max + 1);

        log::debug!(
            "Built skeleton: {} bones, {} roots, {} render slots",
            count,
            roots.len(),
            render_bone_count
        );

        Ok(Self {
            bones,
            roots,
            traversal,
            name_to_index,
            render_bone_count,
        })
    }

    /// Build a skeleton from model data (`m_modelSkeleton` + `m_remappingTable`)
    ///
    /// A model without skeleton data yields an empty skeleton. A model
    /// without a remap table exposes every bone at its own index.
    pub fn from_model_data<K: KeyValues>(model_data: &K) -> Result<Self> {
        let Some(skeleton_data) = model_data.child("m_modelSkeleton") else {
            log::warn!("No skeleton data found");
            return Ok(Self::empty());
        };

        let names: Vec<String> = skeleton_data
            .get_str_array("m_boneName")?
            .into_iter()
            .map(str::to_string)
            .collect();
        let parents = skeleton_data.get_i64_array("m_nParent")?;
        let positions: Vec<Vec3> = skeleton_data
            .get_vector_array("m_bonePosParent", 3)?
            .iter()
            .map(|v| Vec3::new(v[0], v[1], v[2]))
            .collect();
        let rotations: Vec<Quat> = skeleton_data
            .get_vector_array("m_boneRotParent", 4)?
            .iter()
            .map(|v| Quat::from_xyzw(v[0], v[1], v[2], v[3]))
            .collect();

        let remap_table = if model_data.contains_key("m_remappingTable") {
            model_data.get_i64_array("m_remappingTable")?
        } else {
            (0..names.len() as i64).collect()
        };

        Self::from_parts(names, &parents, &positions, &rotations, &remap_table)
    }

    /// Build a skeleton from standalone skeleton data
    ///
    /// Reads `m_boneIDs`, `m_parentIndices` and the 8-float
    /// `m_parentSpaceReferencePose` (position, scale, rotation). Every bone
    /// is exposed to skinning at its own index.
    pub fn from_skeleton_data<K: KeyValues>(skeleton_data: &K) -> Result<Self> {
        let names: Vec<String> = skeleton_data
            .get_str_array("m_boneIDs")?
            .into_iter()
            .map(str::to_string)
            .collect();
        let parents = skeleton_data.get_i64_array("m_parentIndices")?;
        let transforms = skeleton_data.get_vector_array("m_parentSpaceReferencePose", 8)?;

        let positions: Vec<Vec3> = transforms
            .iter()
            .map(|t| Vec3::new(t[0], t[1], t[2]))
            .collect();
        let rotations: Vec<Quat> = transforms
            .iter()
            .map(|t| Quat::from_xyzw(t[4], t[5], t[6], t[7]))
            .collect();
        let remap_table: Vec<i64> = (0..names.len() as i64).collect();

        Self::from_parts(names, &parents, &positions, &rotations, &remap_table)
    }

    /// All bones, indexed by bone index
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Get a bone by index
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    /// Root bone indices
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Depth-first traversal order; parents always precede their children
    pub fn traversal_order(&self) -> &[usize] {
        &self.traversal
    }

    /// Resolve a bone name to its index
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Get a bone by name
    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.bone_index(name).map(|i| &self.bones[i])
    }

    /// Number of bones
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// Check whether the skeleton has no bones
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Number of skinning matrix slots (highest render index + 1)
    pub fn render_bone_count(&self) -> usize {
        self.render_bone_count
    }

    /// Highest render index, `-1` if no bone is skinned
    pub fn last_render_index(&self) -> i32 {
        self.render_bone_count as i32 - 1
    }

    /// Frame holding every bone's parent-space bind transform
    pub fn bind_pose_frame(&self) -> Frame {
        Frame::from_bind_pose(self)
    }
}

fn depth_first_order(bones: &[Bone], roots: &[usize]) -> Vec<usize> {
    let mut order = Vec::with_capacity(bones.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();

    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(bones[i].children.iter().rev().copied());
    }

    order
}
