//! Time sampling over decoded clips

use crate::common::{FPS, three_bone_rotation, wave_chain};
use s2_anim::{AnimationClip, DecodeOptions, Frame, Skeleton};

fn load(data: (serde_json::Value, serde_json::Value, serde_json::Value)) -> (Skeleton, AnimationClip) {
    let (model, animation, key) = data;
    let skeleton = Skeleton::from_model_data(&model).unwrap();
    let clip = AnimationClip::from_data(&animation, &key, &skeleton, &DecodeOptions::default()).unwrap();
    (skeleton, clip)
}

fn assert_frames_close(a: &Frame, b: &Frame) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert!(x.position.abs_diff_eq(y.position, 1e-5), "{x:?} != {y:?}");
        assert!(x.rotation.abs_diff_eq(y.rotation, 1e-5), "{x:?} != {y:?}");
        assert!((x.scale - y.scale).abs() < 1e-5, "{x:?} != {y:?}");
    }
}

#[test]
fn test_sample_at_zero_is_first_frame() {
    let (_, clip) = load(wave_chain(8, 12));
    assert_eq!(clip.sample(0.0), clip.frames[0]);
}

#[test]
fn test_sample_at_duration_wraps_to_first_frame() {
    let (_, clip) = load(wave_chain(8, 12));
    let duration = clip.frame_count as f32 / clip.fps;
    assert_frames_close(&clip.sample(duration), &clip.frames[0]);
}

#[test]
fn test_sample_at_frame_times() {
    let (_, clip) = load(wave_chain(4, 6));
    for (i, frame) in clip.frames.iter().enumerate() {
        assert_frames_close(&clip.sample(i as f32 / FPS), frame);
    }
}

#[test]
fn test_sample_between_frames_is_bounded() {
    let (_, clip) = load(three_bone_rotation());
    let mid = clip.sample(0.5 / FPS);

    let start = clip.frames[0].get(1).rotation;
    let end = clip.frames[1].get(1).rotation;
    let rotation = mid.get(1).rotation;

    let to_start = rotation.angle_between(start);
    let to_end = rotation.angle_between(end);
    let total = start.angle_between(end);
    assert!((to_start - total / 2.0).abs() < 1e-2);
    assert!((to_end - total / 2.0).abs() < 1e-2);
}

#[test]
fn test_sample_into_matches_sample() {
    let (_, clip) = load(wave_chain(8, 12));
    let mut out = Frame::default();
    for step in 0..40 {
        let t = step as f32 * 0.013;
        clip.sample_into(t, &mut out);
        assert_eq!(out, clip.sample(t));
    }
}
