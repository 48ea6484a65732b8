//! Codec accuracy against reference implementations

use glam::Quat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use s2_anim::codec::{decode_quaternion, encode_quaternion, f32_to_half, half_to_f32};
use test_case::test_case;

const MAX_ERROR_DEGREES: f32 = 0.5;

fn random_unit_quaternion(rng: &mut StdRng) -> Quat {
    loop {
        let q = Quat::from_xyzw(
            rng.random_range(-1.0f32..1.0),
            rng.random_range(-1.0f32..1.0),
            rng.random_range(-1.0f32..1.0),
            rng.random_range(-1.0f32..1.0),
        );
        let length = q.length();
        if length > 0.1 && length <= 1.0 {
            return q / length;
        }
    }
}

fn angle_between_degrees(a: Quat, b: Quat) -> f32 {
    let dot = a.dot(b).abs().min(1.0);
    (2.0 * dot.acos()).to_degrees()
}

#[test]
fn test_quaternion_round_trip_random() {
    let mut rng = StdRng::seed_from_u64(0x5eed_2024);
    let mut worst = 0.0f32;

    for _ in 0..10_000 {
        let q = random_unit_quaternion(&mut rng);
        let decoded = decode_quaternion(&encode_quaternion(q));
        let error = angle_between_degrees(q, decoded);
        worst = worst.max(error);
        assert!(error <= MAX_ERROR_DEGREES, "{q:?} decoded as {decoded:?} ({error}°)");
    }

    assert!(worst < MAX_ERROR_DEGREES);
}

#[test]
fn test_decoded_quaternions_are_unit_length() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..1_000 {
        let mut bytes = [0u8; 6];
        rng.fill(&mut bytes);
        let q = decode_quaternion(&bytes);
        assert!(q.is_finite());
        // Three stored components can exceed unit length; the rebuilt one clamps to zero
        assert!(q.length() <= 1.23, "{bytes:?} gave {q:?}");
    }
}

#[test_case(0x0000, 0.0 ; "zero")]
#[test_case(0x3c00, 1.0 ; "one")]
#[test_case(0xbc00, -1.0 ; "minus one")]
#[test_case(0x7bff, 65504.0 ; "max finite")]
#[test_case(0x0001, 0.0 ; "min subnormal")]
fn test_half_reference_values(bits: u16, expected: f32) {
    assert_eq!(half_to_f32(bits), expected);
}

#[test]
fn test_half_encoder_matches_reference_in_normal_range() {
    let mut rng = StdRng::seed_from_u64(11);
    let min_normal = half::f16::MIN_POSITIVE.to_f32();

    for _ in 0..10_000 {
        let magnitude = rng.random_range(min_normal..65504.0f32);
        let value = if rng.random::<bool>() { magnitude } else { -magnitude };
        let expected = half::f16::from_f32(value).to_bits();
        assert_eq!(f32_to_half(value), expected, "value {value}");
    }
}
