//! Source 2 compressed skeletal animation
//!
//! Decodes bit-packed animation segments into per-bone frames, builds the
//! bone hierarchy from a model's bind pose, samples clips at continuous time,
//! composes skinning matrices and blends poses.
//!
//! ```no_run
//! use s2_anim::{AnimationClip, DecodeOptions, PoseBuffer, PoseComposer, Skeleton};
//! # fn load() -> (serde_json::Value, serde_json::Value, serde_json::Value) { unimplemented!() }
//!
//! # fn main() -> s2_anim::Result<()> {
//! let (model_data, animation_data, decode_key) = load();
//!
//! let skeleton = Skeleton::from_model_data(&model_data)?;
//! let clip = AnimationClip::from_data(&animation_data, &decode_key, &skeleton, &DecodeOptions::default())?;
//!
//! let composer = PoseComposer::new(&skeleton);
//! let mut buffer = PoseBuffer::for_skeleton(&skeleton);
//! let frame = clip.sample(0.25);
//! let matrices = composer.compose(&frame, &mut buffer);
//! println!("{} skinning matrices", matrices.len());
//! # Ok(())
//! # }
//! ```

pub mod blend;
pub mod clip;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod keyvalues;
pub mod movement;
pub mod pose;
pub mod sampler;
pub mod segment;
pub mod skeleton;

// Re-export common types
pub use blend::{RootMotionBlendMode, additive_blend, blend, blend_into, blend_root_motion};
pub use clip::{AnimationClip, ClipFlags, DecodeOptions};
pub use decoder::{DecoderEntry, DecoderType, ElementValue};
pub use error::{AnimError, Result};
pub use frame::{ChannelAttribute, Frame, FrameBone};
pub use keyvalues::KeyValues;
pub use movement::{MovementRecord, MovementSample};
pub use pose::{PoseBuffer, PoseComposer, sample_matrices, sample_matrices_flat};
pub use sampler::FramePosition;
pub use skeleton::{Bone, Skeleton};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
