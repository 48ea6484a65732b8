//! Resample decoded frames at continuous playback time

use crate::clip::AnimationClip;
use crate::frame::Frame;

/// Position of a playback time between two decoded frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePosition {
    pub current: usize,
    pub next: usize,
    /// Interpolation factor in `[0, 1)`
    pub fraction: f32,
}

impl AnimationClip {
    /// Locate `time` (seconds) between two frames, looping over the clip
    ///
    /// Returns `None` for clips without frames.
    pub fn frame_position(&self, time: f32) -> Option<FramePosition> {
        let count = self.frames.len();
        if count == 0 {
            return None;
        }

        let scaled = time * self.fps;
        if !scaled.is_finite() {
            return Some(FramePosition {
                current: 0,
                next: 1 % count,
                fraction: 0.0,
            });
        }

        let whole = scaled.floor();
        let current = (whole as i64).rem_euclid(count as i64) as usize;

        Some(FramePosition {
            current,
            next: (current + 1) % count,
            fraction: scaled - whole,
        })
    }

    /// Sample the clip at `time` seconds
    pub fn sample(&self, time: f32) -> Frame {
        let mut out = Frame::default();
        self.sample_into(time, &mut out);
        out
    }

    /// Sample the clip into a caller-owned frame, reusing its allocation
    ///
    /// Positions and scales are lerped, rotations slerped between the two
    /// neighbouring frames. An empty clip leaves `out` empty.
    pub fn sample_into(&self, time: f32, out: &mut Frame) {
        out.bones.clear();

        let Some(position) = self.frame_position(time) else {
            return;
        };

        let current = &self.frames[position.current];
        let next = &self.frames[position.next];

        if position.fraction == 0.0 || position.current == position.next {
            out.bones.extend_from_slice(&current.bones);
            return;
        }

        out.bones.extend(
            current
                .iter()
                .enumerate()
                .map(|(i, bone)| bone.blend(&next.get(i), position.fraction)),
        );
    }
}
