//! Compose skinning matrices from a frame and a skeleton
//!
//! Matrices use glam's column-vector convention: `local = T * R * S`,
//! `world = parent_world * local` and
//! `skinning = world * inverse_world_bind_pose`. The flat output is each
//! matrix's column array, which reads as row-major in the row-vector
//! convention renderers usually upload.

use glam::Mat4;

use crate::clip::AnimationClip;
use crate::frame::Frame;
use crate::skeleton::Skeleton;

/// Floats per matrix in the flat output
pub const FLOATS_PER_MATRIX: usize = 16;

/// Reusable output of [`PoseComposer::compose`]
///
/// Keep one per animated instance; after the first compose for a skeleton
/// no further allocation happens.
#[derive(Debug, Clone, Default)]
pub struct PoseBuffer {
    world: Vec<Mat4>,
    skinning: Vec<Mat4>,
    flat: Vec<f32>,
}

impl PoseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer pre-sized for a skeleton
    pub fn for_skeleton(skeleton: &Skeleton) -> Self {
        let mut buffer = Self::default();
        buffer.prepare(skeleton);
        buffer
    }

    fn prepare(&mut self, skeleton: &Skeleton) {
        self.world.clear();
        self.world.resize(skeleton.len(), Mat4::IDENTITY);
        self.skinning.clear();
        self.skinning.resize(skeleton.render_bone_count(), Mat4::IDENTITY);
        self.flat.clear();
        for _ in 0..skeleton.render_bone_count() {
            self.flat.extend_from_slice(&Mat4::IDENTITY.to_cols_array());
        }
    }

    /// Model-space transform per bone index
    pub fn world_matrices(&self) -> &[Mat4] {
        &self.world
    }

    /// Skinning matrix per render index
    ///
    /// Slots no bone maps to hold identity.
    pub fn skinning_matrices(&self) -> &[Mat4] {
        &self.skinning
    }

    /// Skinning matrices as 16 floats each
    pub fn as_flat(&self) -> &[f32] {
        &self.flat
    }
}

/// Walks a skeleton to turn frames into skinning matrices
#[derive(Debug, Clone, Copy)]
pub struct PoseComposer<'a> {
    skeleton: &'a Skeleton,
}

impl<'a> PoseComposer<'a> {
    pub fn new(skeleton: &'a Skeleton) -> Self {
        Self { skeleton }
    }

    pub fn skeleton(&self) -> &'a Skeleton {
        self.skeleton
    }

    /// Compose `frame` into `buffer` and return the skinning matrices
    ///
    /// Bones outside the frame use the identity transform. Bones without a
    /// render index are still traversed so their children accumulate the
    /// right parent transform.
    pub fn compose<'b>(&self, frame: &Frame, buffer: &'b mut PoseBuffer) -> &'b [Mat4] {
        buffer.prepare(self.skeleton);
        let bones = self.skeleton.bones();

        for &index in self.skeleton.traversal_order() {
            let bone = &bones[index];
            let local = frame.get(index).to_matrix();
            let world = match bone.parent {
                Some(parent) => buffer.world[parent] * local,
                None => local,
            };
            buffer.world[index] = world;

            if let Some(render) = bone.render_index {
                let skinning = world * bone.inverse_world_bind_pose;
                buffer.skinning[render] = skinning;
                buffer.flat[render * FLOATS_PER_MATRIX..(render + 1) * FLOATS_PER_MATRIX]
                    .copy_from_slice(&skinning.to_cols_array());
            }
        }

        &buffer.skinning
    }

    /// Sample a clip and compose the result, reusing both buffers
    pub fn compose_clip<'b>(
        &self,
        clip: &AnimationClip,
        time: f32,
        frame: &mut Frame,
        buffer: &'b mut PoseBuffer,
    ) -> &'b [Mat4] {
        clip.sample_into(time, frame);
        self.compose(frame, buffer)
    }
}

/// Skinning matrices of `clip` at `time`, one per render index
pub fn sample_matrices(clip: &AnimationClip, skeleton: &Skeleton, time: f32) -> Vec<Mat4> {
    let mut frame = Frame::default();
    let mut buffer = PoseBuffer::new();
    PoseComposer::new(skeleton)
        .compose_clip(clip, time, &mut frame, &mut buffer)
        .to_vec()
}

/// Flat skinning matrices of `clip` at `time`, 16 floats per render index
pub fn sample_matrices_flat(clip: &AnimationClip, skeleton: &Skeleton, time: f32) -> Vec<f32> {
    let mut frame = Frame::default();
    let mut buffer = PoseBuffer::new();
    PoseComposer::new(skeleton).compose_clip(clip, time, &mut frame, &mut buffer);
    buffer.flat
}
