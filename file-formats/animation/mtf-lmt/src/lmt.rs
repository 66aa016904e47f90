use std::collections::BTreeMap;

use bytes::Bytes;
use glam::{Quat, Vec3};
use log::{debug, error, trace, warn};
use mtf_data::prelude::*;

use crate::error::{LmtError, Result};
use crate::sample::{BufferType, read_quats, read_vec3s};

pub const LMT_MAGIC: &[u8; 4] = b"LMT\0";
pub const BLOCK_INFO_SIZE: usize = 192;
pub const TRACK_HEADER_SIZE: usize = 32;

/// Largest sample count accepted per track by default
pub const DEFAULT_MAX_SAMPLES: usize = 200;

#[derive(Debug, Clone)]
pub struct LmtOptions {
    /// Tracks with more samples than this are rejected as corrupt
    pub max_samples_per_track: usize,
}

impl Default for LmtOptions {
    fn default() -> Self {
        Self {
            max_samples_per_track: DEFAULT_MAX_SAMPLES,
        }
    }
}

pub(crate) static LMT_HEADER: Schema = Schema::new(
    "LmtHeader",
    &[
        FieldDef::bytes("magic", Count::Fixed(4)),
        FieldDef::scalar("version", Primitive::U16),
        FieldDef::scalar("block_count", Primitive::U16),
        FieldDef::array("block_offsets", Primitive::U32, Count::Field("block_count")),
        FieldDef::new("padding", FieldKind::Align(16)),
    ],
);

pub(crate) static BLOCK_INFO: Schema = Schema::new(
    "LmtBlockInfo",
    &[
        FieldDef::scalar("offset", Primitive::U32),
        FieldDef::scalar("bone_count", Primitive::U32),
        FieldDef::scalar("frame_count", Primitive::U32),
        FieldDef::array("unk_01", Primitive::U32, Count::Fixed(25)),
        FieldDef::scalar("count_01", Primitive::U32),
        FieldDef::scalar("offset_01", Primitive::U32),
        FieldDef::array("unk_02", Primitive::U32, Count::Fixed(16)),
        FieldDef::scalar("count_02", Primitive::U32),
        FieldDef::scalar("offset_02", Primitive::U32),
    ],
);

pub(crate) static TRACK_HEADER: Schema = Schema::new(
    "LmtTrackHeader",
    &[
        FieldDef::scalar("buffer_type", Primitive::U8),
        FieldDef::scalar("usage", Primitive::U8),
        FieldDef::scalar("joint_type", Primitive::U8),
        FieldDef::scalar("bone_index", Primitive::U8),
        FieldDef::scalar("unk_01", Primitive::F32),
        FieldDef::scalar("buffer_size", Primitive::U32),
        FieldDef::scalar("buffer_offset", Primitive::U32),
        FieldDef::array("reference_data", Primitive::F32, Count::Fixed(4)),
    ],
);

/// One animation slot of the block table
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInfo {
    /// Absolute offset of the track headers
    pub offset: u32,
    pub bone_count: u32,
    pub frame_count: u32,
    pub count_01: u32,
    pub offset_01: u32,
    pub count_02: u32,
    pub offset_02: u32,
}

impl SchemaRecord for BlockInfo {
    fn schema() -> &'static Schema {
        &BLOCK_INFO
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        Ok(Self {
            offset: structure.u32("offset")?,
            bone_count: structure.u32("bone_count")?,
            frame_count: structure.u32("frame_count")?,
            count_01: structure.u32("count_01")?,
            offset_01: structure.u32("offset_01")?,
            count_02: structure.u32("count_02")?,
            offset_02: structure.u32("offset_02")?,
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("offset", self.offset)
            .with("bone_count", self.bone_count)
            .with("frame_count", self.frame_count)
            .with("count_01", self.count_01)
            .with("offset_01", self.offset_01)
            .with("count_02", self.count_02)
            .with("offset_02", self.offset_02)
    }
}

/// Per-bone description of one sample buffer
#[derive(Debug, Clone, PartialEq)]
pub struct TrackHeader {
    pub buffer_type: u8,
    pub usage: u8,
    pub joint_type: u8,
    pub bone_index: u8,
    pub unk_01: f32,
    pub buffer_size: u32,
    /// Absolute offset of the sample buffer
    pub buffer_offset: u32,
    pub reference_data: [f32; 4],
}

impl TrackHeader {
    /// Rotation or location, and whether the location drives an IK target.
    pub fn kind(&self) -> Option<(TrackKind, bool)> {
        match BufferType::from_raw(self.buffer_type)? {
            BufferType::Quat14 => Some((TrackKind::Rotation, false)),
            BufferType::Vec3 => Some((TrackKind::Location, self.bone_index != 0)),
        }
    }
}

impl SchemaRecord for TrackHeader {
    fn schema() -> &'static Schema {
        &TRACK_HEADER
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        Ok(Self {
            buffer_type: structure.u8("buffer_type")?,
            usage: structure.u8("usage")?,
            joint_type: structure.u8("joint_type")?,
            bone_index: structure.u8("bone_index")?,
            unk_01: structure.f32("unk_01")?,
            buffer_size: structure.u32("buffer_size")?,
            buffer_offset: structure.u32("buffer_offset")?,
            reference_data: structure.f32_array("reference_data")?,
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("buffer_type", self.buffer_type)
            .with("usage", self.usage)
            .with("joint_type", self.joint_type)
            .with("bone_index", self.bone_index)
            .with("unk_01", self.unk_01)
            .with("buffer_size", self.buffer_size)
            .with("buffer_offset", self.buffer_offset)
            .with("reference_data", self.reference_data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Rotation,
    Location,
}

/// Decoded samples of one bone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneTracks {
    pub rotation: Vec<Quat>,
    pub location: Vec<Vec3>,
    pub is_ik: bool,
}

/// Decoded tracks of one animation, keyed by bone index
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    /// Position in the block offset table
    pub slot: usize,
    pub frame_count: u32,
    pub bones: BTreeMap<u8, BoneTracks>,
}

/// A parsed LMT file
#[derive(Debug, Clone)]
pub struct Lmt {
    pub version: u16,
    /// Block offset table, 0 for empty slots
    pub block_offsets: Vec<u32>,
    /// Non-empty slots with their block info
    pub blocks: Vec<(usize, BlockInfo)>,
    options: LmtOptions,
    data: Bytes,
}

impl Lmt {
    pub fn parse(data: impl Into<Bytes>) -> Result<Self> {
        Self::parse_with(data, LmtOptions::default())
    }

    pub fn parse_with(data: impl Into<Bytes>, options: LmtOptions) -> Result<Self> {
        let data = data.into();
        if data.len() < 4 || &data[..4] != LMT_MAGIC {
            let found = String::from_utf8_lossy(&data[..data.len().min(4)]).into_owned();
            return Err(LmtError::WrongMagic(found));
        }
        let header = LMT_HEADER.parse(data.clone())?;
        let version = header.u16("version")?;
        let block_offsets = header.u32s("block_offsets")?;

        let mut blocks = Vec::new();
        for (slot, &offset) in block_offsets.iter().enumerate() {
            if offset == 0 {
                continue;
            }
            let info = BLOCK_INFO.parse_at(data.clone(), offset as usize)?;
            blocks.push((slot, BlockInfo::from_structure(&info)?));
        }
        debug!(
            "LMT v{} with {} of {} slots used",
            version,
            blocks.len(),
            block_offsets.len()
        );

        Ok(Self {
            version,
            block_offsets,
            blocks,
            options,
            data,
        })
    }

    /// Track headers of the `index`th non-empty block.
    pub fn track_headers(&self, index: usize) -> Result<Vec<TrackHeader>> {
        let (slot, block) = self.block(index)?;
        (0..block.bone_count as usize)
            .map(|bone| -> Result<TrackHeader> {
                let offset = block.offset as usize + bone * TRACK_HEADER_SIZE;
                let header = TRACK_HEADER.parse_at(self.data.clone(), offset).map_err(|e| {
                    error!("Track header {bone} of slot {slot} is out of bounds");
                    e
                })?;
                Ok(TrackHeader::from_structure(&header)?)
            })
            .collect()
    }

    fn block(&self, index: usize) -> Result<(usize, &BlockInfo)> {
        self.blocks
            .get(index)
            .map(|(slot, block)| (*slot, block))
            .ok_or_else(|| {
                DataError::malformed("LMT", format!("block {index} does not exist")).into()
            })
    }

    /// Decode every track of the `index`th non-empty block.
    ///
    /// Tracks with an unknown buffer type are skipped with a warning.
    pub fn decompress_block(&self, index: usize) -> Result<Animation> {
        let (slot, block) = self.block(index)?;
        let mut bones: BTreeMap<u8, BoneTracks> = BTreeMap::new();

        for track in self.track_headers(index)? {
            let Some(buffer_type) = BufferType::from_raw(track.buffer_type) else {
                warn!(
                    "Skipping track of bone {} in slot {}: unsupported buffer type {}",
                    track.bone_index, slot, track.buffer_type
                );
                continue;
            };
            let samples = track.buffer_size as usize / buffer_type.sample_size();
            if samples > self.options.max_samples_per_track {
                error!(
                    "Track of bone {} in slot {} claims {} samples",
                    track.bone_index, slot, samples
                );
                return Err(LmtError::SampleCeiling {
                    block: slot,
                    bone: track.bone_index,
                    samples,
                    limit: self.options.max_samples_per_track,
                });
            }

            let start = track.buffer_offset as usize;
            let end = start + samples * buffer_type.sample_size();
            let buffer = self.data.get(start..end).ok_or_else(|| {
                error!(
                    "Sample buffer of bone {} is out of bounds! {} > {}",
                    track.bone_index,
                    end,
                    self.data.len()
                );
                DataError::malformed(
                    format!("LMT slot {slot}"),
                    format!("sample buffer {start:#x}..{end:#x} outside the file"),
                )
            })?;
            trace!(
                "slot {} bone {}: {:?} x{}",
                slot, track.bone_index, buffer_type, samples
            );

            let entry = bones.entry(track.bone_index).or_default();
            match buffer_type {
                BufferType::Quat14 => {
                    entry.rotation.extend(read_quats(buffer));
                    entry.is_ik = false;
                }
                BufferType::Vec3 => {
                    entry.location.extend(read_vec3s(buffer));
                    entry.is_ik = track.bone_index != 0;
                }
            }
        }

        Ok(Animation {
            slot,
            frame_count: block.frame_count,
            bones,
        })
    }

    /// Decode every non-empty block.
    pub fn decompress(&self) -> Result<Vec<Animation>> {
        (0..self.blocks.len())
            .map(|index| self.decompress_block(index))
            .collect()
    }
}
