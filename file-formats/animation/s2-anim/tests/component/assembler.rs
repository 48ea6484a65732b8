//! Frame assembly from segments and frame blocks

use crate::common::{
    SegmentBuilder, animation_json, clip_json, decode_key, frame_block, three_bone_model,
};
use glam::{Quat, Vec3};
use s2_anim::{AnimError, AnimationClip, DecodeOptions, FrameBone, Skeleton};
use std::f32::consts::FRAC_PI_2;

const BONES: [&str; 3] = ["root", "child", "grandchild"];

fn skeleton() -> Skeleton {
    Skeleton::from_model_data(&three_bone_model()).unwrap()
}

fn decode(animation: &serde_json::Value, key: &serde_json::Value) -> s2_anim::Result<AnimationClip> {
    AnimationClip::from_data(animation, key, &skeleton(), &DecodeOptions::default())
}

#[test]
fn test_frame_blocks_cover_separate_ranges() {
    let key = decode_key(&[("Position", &BONES[..])]);
    let first = SegmentBuilder::new(0, &[1])
        .vector3(Vec3::new(1.0, 0.0, 0.0))
        .vector3(Vec3::new(2.0, 0.0, 0.0));
    let second = SegmentBuilder::new(0, &[1])
        .vector3(Vec3::new(3.0, 0.0, 0.0))
        .vector3(Vec3::new(4.0, 0.0, 0.0));

    let animation = animation_json(
        &["CCompressedFullVector3"],
        vec![first.segment(0), second.segment(0)],
        vec![clip_json(
            "blocks",
            30.0,
            4,
            vec![frame_block(0, 1, &[0]), frame_block(2, 3, &[1])],
        )],
    );

    let clip = decode(&animation, &key).unwrap();
    let xs: Vec<f32> = clip.frames.iter().map(|f| f.get(1).position.x).collect();
    assert_eq!(xs, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_each_decoder_kind() {
    let key = decode_key(&[
        ("Position", &BONES[..]),
        ("Angle", &BONES[..]),
        ("Scale", &BONES[..]),
    ]);

    let half_positions = SegmentBuilder::new(0, &[0])
        .half_vector3(Vec3::new(0.5, 1.0, -2.0))
        .half_vector3(Vec3::new(1.5, 1.0, -2.0));
    let static_half = SegmentBuilder::new(1, &[2]).half_vector3(Vec3::new(0.25, 0.0, 0.0));
    let rotations = SegmentBuilder::new(2, &[1])
        .quaternion(Quat::IDENTITY)
        .quaternion(Quat::from_rotation_y(FRAC_PI_2));
    let scales = SegmentBuilder::new(3, &[0]).float(1.0).float(2.5);
    let static_scale = SegmentBuilder::new(4, &[2]).float(0.5);

    let animation = animation_json(
        &[
            "CCompressedAnimVector3",
            "CCompressedStaticVector3",
            "CCompressedAnimQuaternion",
            "CCompressedFullFloat",
            "CCompressedStaticFloat",
        ],
        vec![
            half_positions.segment(0),
            static_half.segment(0),
            rotations.segment(1),
            scales.segment(2),
            static_scale.segment(2),
        ],
        vec![clip_json("kinds", 30.0, 2, vec![frame_block(0, 1, &[0, 1, 2, 3, 4])])],
    );

    let clip = decode(&animation, &key).unwrap();
    let f1 = &clip.frames[1];

    assert_eq!(f1.get(0).position, Vec3::new(1.5, 1.0, -2.0));
    assert_eq!(f1.get(2).position, Vec3::new(0.25, 0.0, 0.0));
    assert!(f1.get(1).rotation.abs_diff_eq(Quat::from_rotation_y(FRAC_PI_2), 1e-3));
    assert_eq!(f1.get(0).scale, 2.5);
    assert_eq!(f1.get(2).scale, 0.5);
    assert_eq!(clip.frames[0].get(2).scale, 0.5);
}

#[test]
fn test_static_and_full_quaternion_decoders() {
    let key = decode_key(&[("Angle", &BONES[..])]);
    let lean = Quat::from_rotation_z(0.7);

    let static_rotation = SegmentBuilder::new(0, &[0]).quaternion(lean);
    let mut full_rotation = SegmentBuilder::new(1, &[2]);
    for i in 0..3 {
        let q = Quat::from_rotation_x(0.1 * i as f32);
        full_rotation = full_rotation.float(q.x).float(q.y).float(q.z).float(q.w);
    }

    let animation = animation_json(
        &["CCompressedStaticQuaternion", "CCompressedFullQuaternion"],
        vec![static_rotation.segment(0), full_rotation.segment(0)],
        vec![clip_json("quats", 30.0, 3, vec![frame_block(0, 2, &[0, 1])])],
    );

    let clip = decode(&animation, &key).unwrap();
    for (i, frame) in clip.frames.iter().enumerate() {
        assert!(frame.get(0).rotation.abs_diff_eq(lean, 1e-3), "frame {i}");
        assert_eq!(frame.get(2).rotation, Quat::from_rotation_x(0.1 * i as f32));
    }
}

#[test]
fn test_unknown_decoder_and_channel_are_skipped() {
    let _ = env_logger::builder().is_test(true).try_init();
    let key = decode_key(&[("Position", &BONES[..]), ("MorphWeights", &BONES[..])]);

    let colors = SegmentBuilder::new(1, &[0, 1]).raw(&[0xff; 8]);
    let morphs = SegmentBuilder::new(0, &[0]).vector3(Vec3::splat(9.0));
    let positions = SegmentBuilder::new(0, &[2]).vector3(Vec3::new(0.0, 5.0, 0.0));

    let animation = animation_json(
        &["CCompressedFullVector3", "CCompressedFullColor32"],
        vec![colors.segment(0), morphs.segment(1), positions.segment(0)],
        vec![clip_json("skips", 30.0, 1, vec![frame_block(0, 0, &[0, 1, 2])])],
    );

    let options = DecodeOptions {
        warn_unknown_decoders: true,
        ..DecodeOptions::default()
    };
    let clip = AnimationClip::from_data(&animation, &key, &skeleton(), &options).unwrap();
    let frame = &clip.frames[0];

    // Untouched bones keep their bind pose
    assert_eq!(frame.get(0), FrameBone::new(Vec3::ZERO, Quat::IDENTITY, 1.0));
    assert_eq!(frame.get(1).position, Vec3::X);
    assert_eq!(frame.get(2).position, Vec3::new(0.0, 5.0, 0.0));
}

#[test]
fn test_element_for_missing_bone_is_skipped() {
    let names = ["root", "tail", "grandchild"];
    let key = decode_key(&[("Position", &names[..])]);
    let positions = SegmentBuilder::new(0, &[1, 2])
        .vector3(Vec3::splat(7.0))
        .vector3(Vec3::new(0.0, 0.0, 3.0));

    let animation = animation_json(
        &["CCompressedFullVector3"],
        vec![positions.segment(0)],
        vec![clip_json("tail", 30.0, 1, vec![frame_block(0, 0, &[0])])],
    );

    let clip = decode(&animation, &key).unwrap();
    assert_eq!(clip.frames[0].get(2).position, Vec3::new(0.0, 0.0, 3.0));
    assert_eq!(clip.frames[0].get(1).position, Vec3::X);
}

#[test]
fn test_structural_corruption_is_an_error() {
    let key = decode_key(&[("Position", &BONES[..])]);

    // Decoder index past the decoder array
    let bad_decoder = SegmentBuilder::new(5, &[0]).vector3(Vec3::ZERO);
    let animation = animation_json(
        &["CCompressedFullVector3"],
        vec![bad_decoder.segment(0)],
        vec![clip_json("bad", 30.0, 1, vec![frame_block(0, 0, &[0])])],
    );
    assert!(matches!(decode(&animation, &key), Err(AnimError::ReferenceError(_))));

    // Local channel past the decode key
    let good = SegmentBuilder::new(0, &[0]).vector3(Vec3::ZERO);
    let animation = animation_json(
        &["CCompressedFullVector3"],
        vec![good.segment(4)],
        vec![clip_json("bad", 30.0, 1, vec![frame_block(0, 0, &[0])])],
    );
    assert!(matches!(decode(&animation, &key), Err(AnimError::ReferenceError(_))));

    // Element data shorter than the element list needs
    let truncated = SegmentBuilder::new(0, &[0, 1]).vector3(Vec3::ZERO);
    let animation = animation_json(
        &["CCompressedFullVector3"],
        vec![truncated.segment(0)],
        vec![clip_json("bad", 30.0, 1, vec![frame_block(0, 0, &[0])])],
    );
    assert!(matches!(
        decode(&animation, &key),
        Err(AnimError::SegmentOutOfBounds { segment: 0, .. })
    ));
}

#[test]
fn test_empty_anim_array_gives_empty_clip() {
    let key = decode_key(&[("Position", &BONES[..])]);
    let animation = animation_json(&[], Vec::new(), Vec::new());

    let clip = decode(&animation, &key).unwrap();
    assert!(clip.is_empty());
    assert_eq!(clip.frame_count, 0);
    assert!(clip.sample(1.0).is_empty());
}
