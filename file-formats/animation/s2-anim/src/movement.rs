//! Root-motion movement records
//!
//! Each record describes the accumulated root displacement at the end of a
//! run of frames. Sampling interpolates between the previous record (or the
//! origin) and the record covering the requested frame.

use glam::{Mat4, Quat, Vec3};

use crate::error::{AnimError, Result};
use crate::keyvalues::KeyValues;

/// One entry of a clip's `m_movementArray`
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementRecord {
    /// Frame at which this record's displacement is reached
    pub end_frame: u32,
    pub flags: u32,
    /// Start velocity
    pub v0: f32,
    /// End velocity
    pub v1: f32,
    /// Accumulated yaw in degrees
    pub angle: f32,
    /// Movement direction
    pub vector: Vec3,
    /// Accumulated root position
    pub position: Vec3,
}

impl MovementRecord {
    pub fn from_data<K: KeyValues>(data: &K) -> Result<Self> {
        let vector = vec3_property(data, "m_vector")?;
        let position = vec3_property(data, "m_position")?;

        Ok(Self {
            end_frame: data.get_i64("m_nEndframe")?.max(0) as u32,
            flags: data.child("m_nFlags").and_then(K::to_i64).unwrap_or(0) as u32,
            v0: data.child("m_v0").and_then(K::to_f64).unwrap_or(0.0) as f32,
            v1: data.child("m_v1").and_then(K::to_f64).unwrap_or(0.0) as f32,
            angle: data.get_f32("m_angle")?,
            vector,
            position,
        })
    }

    /// Displacement reached by this record
    pub fn sample(&self) -> MovementSample {
        MovementSample {
            position: self.position,
            angle: self.angle,
        }
    }
}

fn vec3_property<K: KeyValues>(data: &K, key: &str) -> Result<Vec3> {
    let v = data.property(key)?.to_f32_vec().unwrap_or_default();
    match v.as_slice() {
        [x, y, z, ..] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(AnimError::InvalidData(format!(
            "'{key}' is not a 3-component vector"
        ))),
    }
}

/// Read a clip's movement array; a missing array yields no records
pub fn read_movement_array<K: KeyValues>(clip_data: &K) -> Result<Vec<MovementRecord>> {
    if !clip_data.contains_key("m_movementArray") {
        return Ok(Vec::new());
    }

    clip_data
        .get_array("m_movementArray")?
        .iter()
        .map(MovementRecord::from_data)
        .collect()
}

/// Root displacement at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MovementSample {
    pub position: Vec3,
    /// Yaw in degrees
    pub angle: f32,
}

impl MovementSample {
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            angle: self.angle + (other.angle - self.angle) * t,
        }
    }

    /// Yaw about Z, then translate
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(
            Quat::from_rotation_z(self.angle.to_radians()),
            self.position,
        )
    }
}

/// Index of the record covering `frame`
fn record_index(records: &[MovementRecord], frame: i64) -> usize {
    records
        .iter()
        .position(|r| i64::from(r.end_frame) > frame)
        .unwrap_or(records.len().saturating_sub(1))
}

/// Interpolate the movement records at a clip-relative time in seconds
///
/// `time` must already lie within the clip. With no records the result is
/// the origin.
pub fn sample_movement(records: &[MovementRecord], fps: f32, time: f32) -> MovementSample {
    if records.is_empty() || fps <= 0.0 {
        return MovementSample::default();
    }

    let index = record_index(records, (time * fps).floor() as i64);
    let next = &records[index];

    let (previous, start_time) = match index.checked_sub(1) {
        Some(i) => (records[i].sample(), records[i].end_frame as f32 / fps),
        None => (MovementSample::default(), 0.0),
    };
    let end_time = next.end_frame as f32 / fps;

    let duration = end_time - start_time;
    let t = if duration > 0.0 {
        ((time - start_time) / duration).clamp(0.0, 1.0)
    } else {
        1.0
    };

    previous.lerp(&next.sample(), t)
}
