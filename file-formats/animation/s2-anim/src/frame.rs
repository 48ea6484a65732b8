//! Per-bone parent-space transforms for a single point in time

use std::ops::Mul;

use glam::{Mat4, Quat, Vec3};

use crate::decoder::ElementValue;
use crate::skeleton::Skeleton;

/// Parent-space transform of one bone
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBone {
    pub position: Vec3,
    pub rotation: Quat,
    /// Uniform scale
    pub scale: f32,
}

impl Default for FrameBone {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FrameBone {
    /// Zero translation, identity rotation, unit scale
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: 1.0,
    };

    pub fn new(position: Vec3, rotation: Quat, scale: f32) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Interpolate towards `target`: lerp position and scale, slerp rotation
    pub fn blend(&self, target: &Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(target.position, t),
            rotation: self.rotation.slerp(target.rotation, t),
            scale: self.scale + (target.scale - self.scale) * t,
        }
    }

    /// Layer `delta` on top of this transform, weighted by `t`
    ///
    /// Position adds `delta.position * t`, rotation moves towards
    /// `delta.rotation * self.rotation`, scale multiplies by
    /// `lerp(1, delta.scale, t)`.
    pub fn blend_add(&self, delta: &Self, t: f32) -> Self {
        let target_rotation = delta.rotation * self.rotation;
        Self {
            position: self.position + delta.position * t,
            rotation: self.rotation.slerp(target_rotation, t),
            scale: self.scale * (1.0 + (delta.scale - 1.0) * t),
        }
    }

    /// `T * R * S` matrix (column-vector convention)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, self.position)
    }

    /// Decompose an affine matrix, keeping the x-axis scale
    ///
    /// Returns `None` when the matrix is degenerate or not finite.
    pub fn from_matrix(matrix: &Mat4) -> Option<Self> {
        if !matrix.is_finite() || matrix.determinant().abs() <= f32::EPSILON {
            return None;
        }

        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Some(Self {
            position,
            rotation: rotation.normalize(),
            scale: scale.x,
        })
    }
}

impl Mul for FrameBone {
    type Output = FrameBone;

    /// Combine two transforms; the result applies `rhs` first
    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            position: self.position + self.rotation * (rhs.position * self.scale),
            rotation: (self.rotation * rhs.rotation).normalize(),
            scale: self.scale * rhs.scale,
        }
    }
}

/// Bone attribute a data channel drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelAttribute {
    Position,
    Angle,
    Scale,
    /// Flex controller data, not a bone transform
    Data,
    Unknown,
}

impl ChannelAttribute {
    /// Map a channel's `m_szVariableName`
    pub fn from_name(name: &str) -> Self {
        match name {
            "Position" => Self::Position,
            "Angle" => Self::Angle,
            "Scale" => Self::Scale,
            "data" => Self::Data,
            _ => Self::Unknown,
        }
    }

    /// Whether values of this attribute land on a [`FrameBone`]
    pub fn is_bone_attribute(self) -> bool {
        matches!(self, Self::Position | Self::Angle | Self::Scale)
    }
}

/// Transforms for every bone of a skeleton, indexed by bone index
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub bones: Vec<FrameBone>,
}

impl Frame {
    /// Frame with `bone_count` identity transforms
    pub fn identity(bone_count: usize) -> Self {
        Self {
            bones: vec![FrameBone::IDENTITY; bone_count],
        }
    }

    /// Frame holding the skeleton's parent-space bind pose
    pub fn from_bind_pose(skeleton: &Skeleton) -> Self {
        Self {
            bones: skeleton
                .bones()
                .iter()
                .map(|b| FrameBone::new(b.position, b.rotation, 1.0))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Transform of a bone; identity for indices outside the frame
    pub fn get(&self, bone: usize) -> FrameBone {
        self.bones.get(bone).copied().unwrap_or(FrameBone::IDENTITY)
    }

    /// Mutable transform of a bone
    pub fn get_mut(&mut self, bone: usize) -> Option<&mut FrameBone> {
        self.bones.get_mut(bone)
    }

    /// Reset every bone to identity, keeping the allocation
    pub fn reset(&mut self, bone_count: usize) {
        self.bones.clear();
        self.bones.resize(bone_count, FrameBone::IDENTITY);
    }

    /// Write a decoded element into one attribute of a bone
    ///
    /// Returns `false` when the bone is outside the frame or the value does
    /// not fit the attribute.
    pub fn set_attribute(&mut self, bone: usize, attribute: ChannelAttribute, value: ElementValue) -> bool {
        let Some(target) = self.bones.get_mut(bone) else {
            return false;
        };

        match (attribute, value) {
            (ChannelAttribute::Position, ElementValue::Vector(v)) => target.position = v,
            (ChannelAttribute::Angle, ElementValue::Rotation(q)) => target.rotation = q,
            (ChannelAttribute::Scale, ElementValue::Float(s)) => target.scale = s,
            _ => return false,
        }

        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameBone> {
        self.bones.iter()
    }
}
