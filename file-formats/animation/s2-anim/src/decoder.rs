//! Decoder table: maps decoder names to element codecs and byte strides

use std::fmt;
use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Quat, Vec3};

use crate::codec::{read_full_quaternion, read_half_vector3, read_quaternion, read_vector3};
use crate::error::Result;
use crate::keyvalues::KeyValues;

/// Element codec used by a compressed segment
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecoderType {
    /// Unknown or unsupported decoder; elements are skipped
    #[default]
    Ignore,
    /// Three f32 values, one sample for the whole block
    StaticFullVector3,
    /// Three f32 values per frame
    FullVector3,
    /// Three f32 values per frame, stored as deltas by the exporter
    DeltaVector3,
    /// Three half floats per frame
    AnimVector3,
    /// Three half floats, one sample for the whole block
    StaticVector3,
    /// 48-bit packed quaternion per frame
    AnimQuaternion,
    /// 48-bit packed quaternion, one sample for the whole block
    StaticQuaternion,
    /// Four f32 values per frame
    FullQuaternion,
    /// One f32 per frame
    FullFloat,
    /// One f32, one sample for the whole block
    StaticFloat,
}

/// A single decoded element
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementValue {
    Vector(Vec3),
    Rotation(Quat),
    Float(f32),
}

impl DecoderType {
    /// Resolve a `CCompressed*` decoder name
    ///
    /// Names this crate cannot decode (including ones not yet known) map to
    /// [`DecoderType::Ignore`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "CCompressedStaticFullVector3" => Self::StaticFullVector3,
            "CCompressedFullVector3" => Self::FullVector3,
            "CCompressedDeltaVector3" => Self::DeltaVector3,
            "CCompressedAnimVector3" => Self::AnimVector3,
            "CCompressedStaticVector3" => Self::StaticVector3,
            "CCompressedAnimQuaternion" => Self::AnimQuaternion,
            "CCompressedStaticQuaternion" => Self::StaticQuaternion,
            "CCompressedFullQuaternion" => Self::FullQuaternion,
            "CCompressedFullFloat" => Self::FullFloat,
            "CCompressedStaticFloat" => Self::StaticFloat,
            _ => Self::Ignore,
        }
    }

    /// Byte stride of one element
    pub fn size(self) -> usize {
        match self {
            Self::StaticFullVector3 | Self::FullVector3 | Self::DeltaVector3 => 12,
            Self::AnimVector3
            | Self::StaticVector3
            | Self::AnimQuaternion
            | Self::StaticQuaternion => 6,
            Self::FullQuaternion => 16,
            Self::FullFloat | Self::StaticFloat => 4,
            Self::Ignore => 0,
        }
    }

    /// Decode one element, or `None` for [`DecoderType::Ignore`]
    pub fn read<R: Read>(self, reader: &mut R) -> io::Result<Option<ElementValue>> {
        let value = match self {
            Self::StaticFullVector3 | Self::FullVector3 | Self::DeltaVector3 => {
                ElementValue::Vector(read_vector3(reader)?)
            }
            Self::AnimVector3 | Self::StaticVector3 => {
                ElementValue::Vector(read_half_vector3(reader)?)
            }
            Self::AnimQuaternion | Self::StaticQuaternion => {
                ElementValue::Rotation(read_quaternion(reader)?)
            }
            Self::FullQuaternion => ElementValue::Rotation(read_full_quaternion(reader)?),
            Self::FullFloat | Self::StaticFloat => {
                ElementValue::Float(reader.read_f32::<LittleEndian>()?)
            }
            Self::Ignore => return Ok(None),
        };

        Ok(Some(value))
    }
}

impl fmt::Display for DecoderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ignore => "Ignore",
            Self::StaticFullVector3 => "CCompressedStaticFullVector3",
            Self::FullVector3 => "CCompressedFullVector3",
            Self::DeltaVector3 => "CCompressedDeltaVector3",
            Self::AnimVector3 => "CCompressedAnimVector3",
            Self::StaticVector3 => "CCompressedStaticVector3",
            Self::AnimQuaternion => "CCompressedAnimQuaternion",
            Self::StaticQuaternion => "CCompressedStaticQuaternion",
            Self::FullQuaternion => "CCompressedFullQuaternion",
            Self::FullFloat => "CCompressedFullFloat",
            Self::StaticFloat => "CCompressedStaticFloat",
        };
        f.write_str(name)
    }
}

/// One entry of a clip's decoder array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderEntry {
    /// Name as stored in the resource
    pub name: String,
    /// Resolved codec
    pub decoder: DecoderType,
}

impl DecoderEntry {
    /// Create an entry from a decoder name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let decoder = DecoderType::from_name(&name);
        Self { name, decoder }
    }

    /// Byte stride of one element
    pub fn size(&self) -> usize {
        self.decoder.size()
    }
}

/// Build the decoder table from an animation's `m_decoderArray`
pub fn read_decoder_array<K: KeyValues>(animation_data: &K) -> Result<Vec<DecoderEntry>> {
    let decoders = animation_data.get_array("m_decoderArray")?;
    let mut table = Vec::with_capacity(decoders.len());

    for decoder in decoders {
        let entry = DecoderEntry::new(decoder.get_str("m_szName")?);
        if entry.decoder == DecoderType::Ignore {
            log::debug!("Decoder '{}' is not supported, its elements will be skipped", entry.name);
        }
        table.push(entry);
    }

    Ok(table)
}
