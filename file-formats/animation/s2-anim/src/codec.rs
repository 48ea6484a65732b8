//! Element codecs used by compressed animation segments
//!
//! All functions here are pure: bytes in, values out. The segment reader in
//! [`crate::segment`] decides which codec applies to which element.

use std::f32::consts::FRAC_1_SQRT_2;
use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Quat, Vec3};

// ============================================================================
// Half-Float (f16) Conversion
// ============================================================================

/// Convert IEEE754 half-precision bits to f32
///
/// Subnormal halves flush to a signed zero. Infinities and NaN payloads are
/// preserved.
pub fn half_to_f32(bits: u16) -> f32 {
    let bits = u32::from(bits);
    let sign = (bits & 0x8000) << 16;
    let exponent = (bits >> 10) & 0x1f;
    let mantissa = bits & 0x3ff;

    let out = match exponent {
        0 => sign,
        0x1f => sign | 0x7f80_0000 | (mantissa << 13),
        _ => sign | ((exponent + 112) << 23) | (mantissa << 13),
    };

    f32::from_bits(out)
}

/// Convert f32 to half-precision bits (round to nearest even)
///
/// Values below the smallest normal half flush to zero, mirroring
/// [`half_to_f32`]; values above the largest finite half become infinity.
pub fn f32_to_half(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x007f_ffff;

    if exponent == 0xff {
        let nan = if mantissa == 0 { 0 } else { 0x0200 };
        return sign | 0x7c00 | nan;
    }

    let half_exponent = exponent - 127 + 15;
    if half_exponent >= 0x1f {
        return sign | 0x7c00;
    }
    if half_exponent <= 0 {
        return sign;
    }

    let mut half = u32::from(sign) | ((half_exponent as u32) << 10) | (mantissa >> 13);
    let round_bits = mantissa & 0x1fff;
    if round_bits > 0x1000 || (round_bits == 0x1000 && half & 1 != 0) {
        half += 1;
    }

    half as u16
}

// ============================================================================
// Quaternion Encoding: 48-bit smallest-three
// ============================================================================

/// Quantization step of one stored component
const QUAT_STEP: f32 = FRAC_1_SQRT_2 / 16384.0;

/// Largest value a 14-bit magnitude field can hold
const QUAT_FIELD_MAX: u16 = 0x3fff;

/// Byte length of a packed quaternion
pub const PACKED_QUATERNION_SIZE: usize = 6;

fn decode_quat_field(low: u8, high: u8) -> f32 {
    let magnitude = i32::from(low) | (i32::from(high & 0x3f) << 8);
    if high & 0x40 == 0 {
        QUAT_STEP * (magnitude - 16384) as f32
    } else {
        QUAT_STEP * magnitude as f32
    }
}

fn encode_quat_field(value: f32, dominance_bit: bool) -> [u8; 2] {
    let (magnitude, range_bit) = if value >= 0.0 {
        ((value / QUAT_STEP).round().min(QUAT_FIELD_MAX as f32) as u16, 0x40)
    } else {
        let shifted = (value / QUAT_STEP).round() + 16384.0;
        (shifted.clamp(0.0, QUAT_FIELD_MAX as f32) as u16, 0)
    };

    let sign_bit = if dominance_bit { 0x80 } else { 0 };
    [
        (magnitude & 0xff) as u8,
        ((magnitude >> 8) as u8 & 0x3f) | range_bit | sign_bit,
    ]
}

/// Decode a 48-bit packed quaternion
///
/// Bit layout per 16-bit little-endian field: `[magnitude:14][range:1][sign:1]`.
/// The sign bits of fields one and two select which component was dropped,
/// the sign bit of field three negates the reconstructed component:
///
/// | s1 | s2 | dropped | stored fields |
/// |----|----|---------|---------------|
/// | 0  | 0  | w       | x, y, z       |
/// | 0  | 1  | x       | y, z, w       |
/// | 1  | 0  | y       | z, w, x       |
/// | 1  | 1  | z       | w, x, y       |
pub fn decode_quaternion(bytes: &[u8; PACKED_QUATERNION_SIZE]) -> Quat {
    let a = decode_quat_field(bytes[0], bytes[1]);
    let b = decode_quat_field(bytes[2], bytes[3]);
    let c = decode_quat_field(bytes[4], bytes[5]);

    let s1 = bytes[1] & 0x80 != 0;
    let s2 = bytes[3] & 0x80 != 0;
    let s3 = bytes[5] & 0x80 != 0;

    let mut d = (1.0 - a * a - b * b - c * c).max(0.0).sqrt();
    if s3 {
        d = -d;
    }

    match (s1, s2) {
        (false, false) => Quat::from_xyzw(a, b, c, d),
        (false, true) => Quat::from_xyzw(d, a, b, c),
        (true, false) => Quat::from_xyzw(c, d, a, b),
        (true, true) => Quat::from_xyzw(b, c, d, a),
    }
}

/// Encode a unit quaternion into the 48-bit packed layout
///
/// Inverse of [`decode_quaternion`]; the largest-magnitude component is the
/// one dropped, so every stored component lies in `[-1/√2, 1/√2]`.
pub fn encode_quaternion(q: Quat) -> [u8; PACKED_QUATERNION_SIZE] {
    let q = q.normalize();
    let c = [q.x, q.y, q.z, q.w];

    let mut dropped = 3;
    for i in 0..3 {
        if c[i].abs() > c[dropped].abs() {
            dropped = i;
        }
    }

    let (s1, s2, stored) = match dropped {
        0 => (false, true, [c[1], c[2], c[3]]),
        1 => (true, false, [c[2], c[3], c[0]]),
        2 => (true, true, [c[3], c[0], c[1]]),
        _ => (false, false, [c[0], c[1], c[2]]),
    };
    let s3 = c[dropped] < 0.0;

    let f1 = encode_quat_field(stored[0], s1);
    let f2 = encode_quat_field(stored[1], s2);
    let f3 = encode_quat_field(stored[2], s3);

    [f1[0], f1[1], f2[0], f2[1], f3[0], f3[1]]
}

// ============================================================================
// Stream readers
// ============================================================================

/// Read three little-endian f32 values
pub fn read_vector3<R: Read>(reader: &mut R) -> io::Result<Vec3> {
    let x = reader.read_f32::<LittleEndian>()?;
    let y = reader.read_f32::<LittleEndian>()?;
    let z = reader.read_f32::<LittleEndian>()?;
    Ok(Vec3::new(x, y, z))
}

/// Read three little-endian half floats
pub fn read_half_vector3<R: Read>(reader: &mut R) -> io::Result<Vec3> {
    let x = half_to_f32(reader.read_u16::<LittleEndian>()?);
    let y = half_to_f32(reader.read_u16::<LittleEndian>()?);
    let z = half_to_f32(reader.read_u16::<LittleEndian>()?);
    Ok(Vec3::new(x, y, z))
}

/// Read a 48-bit packed quaternion
pub fn read_quaternion<R: Read>(reader: &mut R) -> io::Result<Quat> {
    let mut bytes = [0u8; PACKED_QUATERNION_SIZE];
    reader.read_exact(&mut bytes)?;
    Ok(decode_quaternion(&bytes))
}

/// Read four little-endian f32 values as `x, y, z, w`
pub fn read_full_quaternion<R: Read>(reader: &mut R) -> io::Result<Quat> {
    let x = reader.read_f32::<LittleEndian>()?;
    let y = reader.read_f32::<LittleEndian>()?;
    let z = reader.read_f32::<LittleEndian>()?;
    let w = reader.read_f32::<LittleEndian>()?;
    Ok(Quat::from_xyzw(x, y, z, w))
}
