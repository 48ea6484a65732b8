//! Animation clips: decoded frames plus playback metadata
//!
//! Clips are decoded completely at load. Every frame is seeded with the
//! skeleton's bind pose and then overwritten by whatever the frame blocks
//! covering it record, so bones without recorded channels stay at rest.
//! Delta clips are seeded with identity instead, so unrecorded bones add
//! nothing when layered with [`additive_blend`](crate::blend::additive_blend).

use std::collections::HashMap;

use glam::Mat4;

use crate::decoder::{DecoderEntry, DecoderType, read_decoder_array};
use crate::error::{AnimError, Result};
use crate::frame::Frame;
use crate::keyvalues::KeyValues;
use crate::movement::{MovementRecord, MovementSample, read_movement_array, sample_movement};
use crate::segment::{CompressedSegment, DataChannel, read_data_channels};
use crate::skeleton::Skeleton;

/// Options controlling clip decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Decode frames on the rayon pool (requires the `parallel` feature)
    pub parallel: bool,
    /// Log a warning for every segment whose decoder is unsupported
    pub warn_unknown_decoders: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
            warn_unknown_decoders: false,
        }
    }
}

/// Clip flags from `m_flags`
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipFlags {
    pub looping: bool,
    pub hidden: bool,
    /// Frames hold deltas meant for additive blending
    pub delta: bool,
    /// Root transforms are stored in world space
    pub worldspace: bool,
}

impl ClipFlags {
    /// Read `m_flags`; absent flags are `false`
    pub fn from_data<K: KeyValues>(clip_data: &K) -> Self {
        let Some(flags) = clip_data.child("m_flags") else {
            return Self::default();
        };

        Self {
            looping: flags.get_bool_or("m_bLooping", false),
            hidden: flags.get_bool_or("m_bHidden", false),
            delta: flags.get_bool_or("m_bDelta", false),
            worldspace: flags.get_bool_or("m_bLegacyWorldspace", false),
        }
    }
}

/// A fully decoded animation
#[derive(Debug, Clone, Default)]
pub struct AnimationClip {
    pub name: String,
    pub fps: f32,
    pub frame_count: usize,
    /// Decoded frames, `frame_count` long
    pub frames: Vec<Frame>,
    pub flags: ClipFlags,
    /// Root-motion records, ordered by end frame
    pub movements: Vec<MovementRecord>,
}

/// Frame range and the segments that cover it
#[derive(Debug, Clone)]
struct FrameBlock {
    start_frame: usize,
    end_frame: usize,
    segments: Vec<usize>,
}

impl FrameBlock {
    fn contains(&self, frame: usize) -> bool {
        self.start_frame <= frame && frame <= self.end_frame
    }
}

/// Segments of one clip resolved against the skeleton
struct ClipDecoder<'a> {
    skeleton: &'a Skeleton,
    /// Delta clips start every frame from identity instead of the bind pose
    delta: bool,
    blocks: Vec<FrameBlock>,
    segments: HashMap<usize, CompressedSegment>,
}

impl<'a> ClipDecoder<'a> {
    fn new<K: KeyValues>(
        pdata: &K,
        segment_array: &[K],
        decoders: &[DecoderEntry],
        channels: &[DataChannel],
        skeleton: &'a Skeleton,
        flags: ClipFlags,
        options: &DecodeOptions,
    ) -> Result<Self> {
        let mut blocks = Vec::new();
        let mut segments = HashMap::new();

        for block in pdata.get_array("m_frameblockArray")? {
            let start_frame = block.get_i64("m_nStartFrame")?.max(0) as usize;
            let end_frame = block.get_i64("m_nEndFrame")?;
            let indices = block.get_i64_array("m_segmentIndexArray")?;

            let mut block_segments = Vec::with_capacity(indices.len());
            for index in indices {
                let index = usize::try_from(index)
                    .ok()
                    .filter(|&i| i < segment_array.len())
                    .ok_or_else(|| {
                        AnimError::ReferenceError(format!(
                            "frame block references segment {} but the segment array has {} entries",
                            index,
                            segment_array.len()
                        ))
                    })?;

                if !segments.contains_key(&index) {
                    let segment =
                        CompressedSegment::resolve(index, &segment_array[index], decoders, channels)?;
                    if options.warn_unknown_decoders && segment.decoder.decoder == DecoderType::Ignore {
                        log::warn!(
                            "Segment {} uses unsupported decoder '{}'",
                            index,
                            segment.decoder.name
                        );
                    }
                    segments.insert(index, segment);
                }
                block_segments.push(index);
            }

            // A negative end frame leaves the block empty
            if end_frame < 0 {
                continue;
            }

            blocks.push(FrameBlock {
                start_frame,
                end_frame: end_frame as usize,
                segments: block_segments,
            });
        }

        Ok(Self {
            skeleton,
            delta: flags.delta,
            blocks,
            segments,
        })
    }

    fn decode_frame(&self, frame_index: usize) -> Result<Frame> {
        let mut frame = if self.delta {
            Frame::identity(self.skeleton.len())
        } else {
            Frame::from_bind_pose(self.skeleton)
        };

        for block in self.blocks.iter().filter(|b| b.contains(frame_index)) {
            let block_frame = frame_index - block.start_frame;
            for index in &block.segments {
                if let Some(segment) = self.segments.get(index) {
                    segment.decode_into(block_frame, &mut frame)?;
                }
            }
        }

        Ok(frame)
    }

    #[cfg(feature = "parallel")]
    fn decode_all(&self, frame_count: usize, parallel: bool) -> Result<Vec<Frame>> {
        use rayon::prelude::*;

        if parallel {
            return (0..frame_count)
                .into_par_iter()
                .map(|f| self.decode_frame(f))
                .collect();
        }

        (0..frame_count).map(|f| self.decode_frame(f)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn decode_all(&self, frame_count: usize, _parallel: bool) -> Result<Vec<Frame>> {
        (0..frame_count).map(|f| self.decode_frame(f)).collect()
    }
}

impl AnimationClip {
    /// Decode the first clip of an animation resource
    ///
    /// # Arguments
    /// * `animation_data` - Object holding `m_animArray`, `m_decoderArray`
    ///   and `m_segmentArray`
    /// * `decode_key` - Object holding `m_dataChannelArray`
    /// * `skeleton` - Skeleton the channels are resolved against
    /// * `options` - Decode options
    ///
    /// An empty `m_animArray` yields an empty clip.
    pub fn from_data<K: KeyValues>(
        animation_data: &K,
        decode_key: &K,
        skeleton: &Skeleton,
        options: &DecodeOptions,
    ) -> Result<Self> {
        let clips = animation_data.get_array("m_animArray")?;
        let Some(first) = clips.first() else {
            log::warn!("Animation data has an empty m_animArray");
            return Ok(Self::default());
        };

        let decoders = read_decoder_array(animation_data)?;
        let channels = read_data_channels(decode_key, skeleton)?;
        let segment_array = animation_data.get_array("m_segmentArray")?;

        Self::decode(first, segment_array, &decoders, &channels, skeleton, options)
    }

    /// Decode every clip of an animation resource
    ///
    /// Decoding stops at the first clip that fails.
    pub fn all_from_data<K: KeyValues>(
        animation_data: &K,
        decode_key: &K,
        skeleton: &Skeleton,
        options: &DecodeOptions,
    ) -> Result<Vec<Self>> {
        let clips = animation_data.get_array("m_animArray")?;
        if clips.is_empty() {
            log::warn!("Animation data has an empty m_animArray");
            return Ok(Vec::new());
        }

        let decoders = read_decoder_array(animation_data)?;
        let channels = read_data_channels(decode_key, skeleton)?;
        let segment_array = animation_data.get_array("m_segmentArray")?;

        clips
            .iter()
            .map(|clip| Self::decode(clip, segment_array, &decoders, &channels, skeleton, options))
            .collect()
    }

    fn decode<K: KeyValues>(
        clip_data: &K,
        segment_array: &[K],
        decoders: &[DecoderEntry],
        channels: &[DataChannel],
        skeleton: &Skeleton,
        options: &DecodeOptions,
    ) -> Result<Self> {
        let name = clip_data.get_str("m_name")?.to_string();
        let fps = clip_data.get_f32("fps")?;
        let flags = ClipFlags::from_data(clip_data);
        let movements = read_movement_array(clip_data)?;

        let pdata = clip_data.property("m_pData")?;
        let frame_count = pdata.get_i64("m_nFrames")?.max(0) as usize;

        let decoder = ClipDecoder::new(pdata, segment_array, decoders, channels, skeleton, flags, options)?;
        let frames = decoder.decode_all(frame_count, options.parallel)?;

        log::debug!(
            "Decoded clip '{}': {} frames at {} fps from {} segments",
            name,
            frame_count,
            fps,
            decoder.segments.len()
        );

        Ok(Self {
            name,
            fps,
            frame_count,
            frames,
            flags,
            movements,
        })
    }

    /// Check whether the clip holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Length in seconds (`0` when fps is not positive)
    pub fn duration(&self) -> f32 {
        if self.fps > 0.0 {
            self.frame_count as f32 / self.fps
        } else {
            0.0
        }
    }

    /// Get a decoded frame
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Check whether the clip carries root-motion records
    pub fn has_movement(&self) -> bool {
        !self.movements.is_empty()
    }

    /// Root displacement at a playback time, wrapped into the clip
    pub fn movement_at(&self, time: f32) -> MovementSample {
        let duration = self.duration();
        let time = if duration > 0.0 && time.is_finite() {
            time.rem_euclid(duration)
        } else {
            0.0
        };
        sample_movement(&self.movements, self.fps, time)
    }

    /// Root transform travelled between two playback times
    ///
    /// Times may lie in different loops of the clip; each full loop crossed
    /// contributes the clip's total displacement.
    pub fn root_motion_delta(&self, from: f32, to: f32) -> Mat4 {
        let duration = self.duration();
        if !self.has_movement() || duration <= 0.0 || !from.is_finite() || !to.is_finite() {
            return Mat4::IDENTITY;
        }

        let start = self.movement_at(from).to_matrix();
        let end = self.movement_at(to).to_matrix();

        let loops = (f64::from(to) / f64::from(duration)).floor() as i64
            - (f64::from(from) / f64::from(duration)).floor() as i64;
        let mut travelled = start.inverse();
        if loops != 0 {
            let full_loop = self.full_loop_motion();
            let step = if loops > 0 { full_loop } else { full_loop.inverse() };
            travelled *= matrix_power(step, loops.unsigned_abs());
        }

        travelled * end
    }

    fn full_loop_motion(&self) -> Mat4 {
        self.movements
            .last()
            .map_or(Mat4::IDENTITY, |m| m.sample().to_matrix())
    }
}

/// `base` multiplied by itself `exponent` times, by repeated squaring
fn matrix_power(mut base: Mat4, mut exponent: u64) -> Mat4 {
    let mut result = Mat4::IDENTITY;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result *= base;
        }
        base *= base;
        exponent >>= 1;
    }
    result
}
