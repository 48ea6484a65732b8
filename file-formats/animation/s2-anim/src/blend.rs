//! Two-pose blending and root-motion blending

use glam::Mat4;

use crate::frame::{Frame, FrameBone};

/// Linear blend: `weight = 0` gives `source`, `1` gives `target`
///
/// Bones missing from `target` blend towards identity.
pub fn blend(source: &Frame, target: &Frame, weight: f32) -> Frame {
    let mut out = source.clone();
    blend_into(&mut out, target, weight);
    out
}

/// In-place [`blend`]
pub fn blend_into(pose: &mut Frame, target: &Frame, weight: f32) {
    for (i, bone) in pose.bones.iter_mut().enumerate() {
        *bone = bone.blend(&target.get(i), weight);
    }
}

/// Additive blend: layer `delta` on top of `source`, scaled by `weight`
pub fn additive_blend(source: &Frame, delta: &Frame, weight: f32) -> Frame {
    let mut out = source.clone();
    additive_blend_into(&mut out, delta, weight);
    out
}

/// In-place [`additive_blend`]
pub fn additive_blend_into(pose: &mut Frame, delta: &Frame, weight: f32) {
    for (i, bone) in pose.bones.iter_mut().enumerate() {
        *bone = bone.blend_add(&delta.get(i), weight);
    }
}

/// How two root-motion deltas combine
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RootMotionBlendMode {
    /// Interpolate translation, rotation and scale
    #[default]
    Blend,
    /// Apply the weighted target delta after the source delta
    Additive,
    /// Use the target delta only
    IgnoreSource,
    /// Use the source delta only
    IgnoreTarget,
}

/// Combine two root-motion deltas
///
/// When a delta cannot be decomposed (degenerate or non-finite) the other
/// operand is returned unchanged.
pub fn blend_root_motion(source: &Mat4, target: &Mat4, weight: f32, mode: RootMotionBlendMode) -> Mat4 {
    match mode {
        RootMotionBlendMode::IgnoreSource => *target,
        RootMotionBlendMode::IgnoreTarget => *source,
        RootMotionBlendMode::Blend => {
            let Some(src) = FrameBone::from_matrix(source) else {
                log::trace!("Root motion source is not decomposable, using target");
                return *target;
            };
            let Some(tgt) = FrameBone::from_matrix(target) else {
                log::trace!("Root motion target is not decomposable, using source");
                return *source;
            };
            src.blend(&tgt, weight).to_matrix()
        }
        RootMotionBlendMode::Additive => {
            let Some(src) = FrameBone::from_matrix(source) else {
                return *target;
            };
            let Some(tgt) = FrameBone::from_matrix(target) else {
                return *source;
            };
            let weighted = FrameBone::IDENTITY.blend(&tgt, weight);
            (src * weighted).to_matrix()
        }
    }
}
