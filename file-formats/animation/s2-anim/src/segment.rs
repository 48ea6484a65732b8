//! Compressed segment reader
//!
//! A segment is one byte container holding one data channel for the frames
//! of a frame block. Layout (little-endian):
//!
//! ```text
//! i16 decoder_index
//! i16 cardinality
//! i16 element_count
//! i16 total_length
//! i16 element_ids[element_count]
//! element data, frame-major then element-minor
//! ```
//!
//! Segments are resolved once at load: the header is parsed, the decoder is
//! looked up and each element id is mapped to a skeleton bone. Decoding a
//! frame then only seeks and reads.

use std::collections::HashMap;
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::decoder::DecoderEntry;
use crate::error::{AnimError, Result};
use crate::frame::{ChannelAttribute, Frame};
use crate::keyvalues::KeyValues;
use crate::skeleton::Skeleton;

/// Size of the fixed header fields
pub const SEGMENT_HEADER_SIZE: usize = 8;

/// Parsed segment header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    pub decoder_index: i16,
    pub cardinality: i16,
    pub total_length: i16,
    /// Element ids, one per stored element
    pub element_ids: Vec<i16>,
}

impl SegmentHeader {
    /// Parse the header and element id list
    pub fn parse(segment: usize, data: &[u8]) -> Result<Self> {
        if data.len() < SEGMENT_HEADER_SIZE {
            return Err(AnimError::SegmentOutOfBounds {
                segment,
                offset: 0,
                needed: SEGMENT_HEADER_SIZE,
                len: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let decoder_index = cursor.read_i16::<LittleEndian>()?;
        let cardinality = cursor.read_i16::<LittleEndian>()?;
        let element_count = cursor.read_i16::<LittleEndian>()?;
        let total_length = cursor.read_i16::<LittleEndian>()?;

        let element_count = usize::try_from(element_count).map_err(|_| {
            AnimError::InvalidData(format!(
                "segment {segment} has negative element count {element_count}"
            ))
        })?;

        let needed = element_count * 2;
        if SEGMENT_HEADER_SIZE + needed > data.len() {
            return Err(AnimError::SegmentOutOfBounds {
                segment,
                offset: SEGMENT_HEADER_SIZE,
                needed,
                len: data.len(),
            });
        }

        let mut element_ids = Vec::with_capacity(element_count);
        for _ in 0..element_count {
            element_ids.push(cursor.read_i16::<LittleEndian>()?);
        }

        Ok(Self {
            decoder_index,
            cardinality,
            total_length,
            element_ids,
        })
    }

    /// Byte offset of the first element of frame 0
    pub fn data_offset(&self) -> usize {
        SEGMENT_HEADER_SIZE + self.element_ids.len() * 2
    }
}

/// A decode-key data channel, resolved against a skeleton
#[derive(Debug, Clone)]
pub struct DataChannel {
    /// `m_szVariableName` as stored
    pub variable_name: String,
    pub attribute: ChannelAttribute,
    /// Element id → skeleton bone index (`None` when the bone is absent)
    element_bones: HashMap<i64, Option<usize>>,
}

impl DataChannel {
    /// Resolve one entry of a decode key's `m_dataChannelArray`
    pub fn from_data<K: KeyValues>(channel_data: &K, skeleton: &Skeleton) -> Result<Self> {
        let variable_name = channel_data.get_str("m_szVariableName")?.to_string();
        let attribute = ChannelAttribute::from_name(&variable_name);

        let element_names = channel_data.get_str_array("m_szElementNameArray")?;
        let element_ids = channel_data.get_i64_array("m_nElementIndexArray")?;
        if element_ids.len() != element_names.len() {
            return Err(AnimError::InvalidData(format!(
                "channel '{}' has {} element ids but {} element names",
                variable_name,
                element_ids.len(),
                element_names.len()
            )));
        }

        let element_bones = element_ids
            .iter()
            .zip(&element_names)
            .map(|(&id, name)| (id, skeleton.bone_index(name)))
            .collect();

        Ok(Self {
            variable_name,
            attribute,
            element_bones,
        })
    }

    /// Bone driven by an element id
    ///
    /// Outer `None`: the id is unknown to this channel. Inner `None`: the
    /// element names a bone the skeleton does not have.
    pub fn element_bone(&self, element_id: i64) -> Option<Option<usize>> {
        self.element_bones.get(&element_id).copied()
    }
}

/// Read every channel of a decode key
pub fn read_data_channels<K: KeyValues>(decode_key: &K, skeleton: &Skeleton) -> Result<Vec<DataChannel>> {
    decode_key
        .get_array("m_dataChannelArray")?
        .iter()
        .map(|channel| DataChannel::from_data(channel, skeleton))
        .collect()
}

/// A segment ready to decode frames
#[derive(Debug, Clone)]
pub struct CompressedSegment {
    /// Index in the animation's `m_segmentArray`
    pub index: usize,
    pub header: SegmentHeader,
    pub decoder: DecoderEntry,
    pub attribute: ChannelAttribute,
    /// Target bone per stored element, in storage order
    bones: Vec<Option<usize>>,
    data: Vec<u8>,
}

impl CompressedSegment {
    /// Resolve one entry of `m_segmentArray`
    ///
    /// # Arguments
    /// * `index` - Position of the segment in the segment array
    /// * `segment_data` - The segment object (`m_container`, `m_nLocalChannel`)
    /// * `decoders` - The clip's decoder table
    /// * `channels` - Resolved decode-key channels
    pub fn resolve<K: KeyValues>(
        index: usize,
        segment_data: &K,
        decoders: &[DecoderEntry],
        channels: &[DataChannel],
    ) -> Result<Self> {
        let local_channel = segment_data.get_i64("m_nLocalChannel")?;
        let channel = usize::try_from(local_channel)
            .ok()
            .and_then(|c| channels.get(c))
            .ok_or_else(|| {
                AnimError::ReferenceError(format!(
                    "segment {} uses local channel {} but the decode key has {} channels",
                    index,
                    local_channel,
                    channels.len()
                ))
            })?;

        let data = segment_data.get_bytes("m_container")?.into_owned();
        let header = SegmentHeader::parse(index, &data)?;

        let decoder = usize::try_from(header.decoder_index)
            .ok()
            .and_then(|d| decoders.get(d))
            .cloned()
            .ok_or_else(|| {
                AnimError::ReferenceError(format!(
                    "segment {} uses decoder {} but the decoder array has {} entries",
                    index,
                    header.decoder_index,
                    decoders.len()
                ))
            })?;

        let bones = header
            .element_ids
            .iter()
            .map(|&id| match channel.element_bone(i64::from(id)) {
                Some(bone) => bone,
                None => {
                    log::warn!(
                        "Segment {} element {} is not part of channel '{}', skipping",
                        index,
                        id,
                        channel.variable_name
                    );
                    None
                }
            })
            .collect();

        log::trace!(
            "Segment {}: {} elements of {} on channel '{}'",
            index,
            header.element_ids.len(),
            decoder.decoder,
            channel.variable_name
        );

        Ok(Self {
            index,
            header,
            decoder,
            attribute: channel.attribute,
            bones,
            data,
        })
    }

    /// Number of stored elements per frame
    pub fn element_count(&self) -> usize {
        self.bones.len()
    }

    /// Byte offset of the first element for a frame relative to the block start
    ///
    /// If the seek would land at or past the end of the container, frame 0
    /// is read instead; static decoders store a single frame this way.
    pub fn frame_offset(&self, block_frame: usize) -> usize {
        let start = self.header.data_offset();
        let skip = self.decoder.size() * block_frame * self.element_count();
        if start + skip < self.data.len() {
            start + skip
        } else {
            start
        }
    }

    /// Decode one frame of this segment into `frame`
    ///
    /// Elements whose decoder is unsupported, whose bone is missing or whose
    /// attribute is not a bone transform are consumed and dropped.
    pub fn decode_into(&self, block_frame: usize, frame: &mut Frame) -> Result<()> {
        let size = self.decoder.size();
        if size == 0 || !self.attribute.is_bone_attribute() {
            return Ok(());
        }

        let offset = self.frame_offset(block_frame);
        let needed = size * self.element_count();
        if offset + needed > self.data.len() {
            return Err(AnimError::SegmentOutOfBounds {
                segment: self.index,
                offset,
                needed,
                len: self.data.len(),
            });
        }

        let mut reader = &self.data[offset..offset + needed];
        for &bone in &self.bones {
            let value = self.decoder.decoder.read(&mut reader)?;
            if let (Some(bone), Some(value)) = (bone, value) {
                frame.set_attribute(bone, self.attribute, value);
            }
        }

        Ok(())
    }
}
