//! Vertex record layouts.
//!
//! Nine vertex format codes share one parameterised layout. Fields appear in
//! this order, each only when the layout has it:
//!
//! | field | size |
//! |-------|------|
//! | position | 3 × `f32`, or 4 × `i16` normalised to the model box |
//! | bone indices | 1 byte per influence slot |
//! | weights | 1 byte per influence slot |
//! | normal | 4 × `u8` |
//! | tangent | 4 × `u8` |
//! | UV channels | 2 × half float each |

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;
use mtf_data::half_float::{ABSENT_CHANNEL, pack_half, unpack_half};
use mtf_data::prelude::*;

use crate::error::Result;

/// Largest value of a normalised short position component
pub const POSITION_SCALE: f32 = 32767.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionEncoding {
    Float,
    /// `i16` components mapped onto the model bounding box, `w` = 32767
    NormalizedShort,
}

/// Shape of one vertex format code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub code: u8,
    pub position: PositionEncoding,
    /// Bone index / weight pairs per vertex: 0, 4 or 8
    pub influence_slots: usize,
    pub has_tangent: bool,
    pub uv_channels: usize,
}

impl VertexLayout {
    const fn rigid() -> Self {
        Self {
            code: 0,
            position: PositionEncoding::Float,
            influence_slots: 0,
            has_tangent: true,
            uv_channels: 3,
        }
    }

    const fn skinned4(code: u8) -> Self {
        Self {
            code,
            position: PositionEncoding::NormalizedShort,
            influence_slots: 4,
            has_tangent: true,
            uv_channels: 2,
        }
    }

    const fn skinned8(code: u8) -> Self {
        Self {
            code,
            position: PositionEncoding::NormalizedShort,
            influence_slots: 8,
            has_tangent: false,
            uv_channels: 1,
        }
    }

    fn position_size(&self) -> usize {
        match self.position {
            PositionEncoding::Float => 12,
            PositionEncoding::NormalizedShort => 8,
        }
    }

    /// Bytes per vertex record.
    pub fn size(&self) -> usize {
        self.position_size()
            + self.influence_slots * 2
            + 4
            + if self.has_tangent { 4 } else { 0 }
            + self.uv_channels * 4
    }

    pub fn is_skinned(&self) -> bool {
        self.influence_slots > 0
    }
}

/// Every known vertex format, indexed by code
pub static VERTEX_LAYOUTS: [VertexLayout; 9] = [
    VertexLayout::rigid(),
    VertexLayout::skinned4(1),
    VertexLayout::skinned4(2),
    VertexLayout::skinned4(3),
    VertexLayout::skinned4(4),
    VertexLayout::skinned8(5),
    VertexLayout::skinned8(6),
    VertexLayout::skinned8(7),
    VertexLayout::skinned8(8),
];

/// Look up the layout of a vertex format code.
pub fn layout_for(code: u8) -> mtf_data::Result<&'static VertexLayout> {
    VERTEX_LAYOUTS
        .get(usize::from(code))
        .ok_or_else(|| DataError::unsupported("vertex format", format!("{code:#x}")))
}

/// One decoded vertex record, before bone resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedVertex {
    /// Engine space, denormalised for short positions
    pub position: Vec3,
    /// Components in `-1..=1`
    pub normal: Vec3,
    pub tangent: Option<Vec3>,
    /// Raw half float bits of every UV channel
    pub uvs: Vec<[u16; 2]>,
    /// Palette-local bone index and weight byte per slot
    pub influences: Vec<(u8, u8)>,
}

impl PackedVertex {
    /// UV channel as floats, `None` for missing or absent channels.
    pub fn uv(&self, channel: usize) -> Option<[f32; 2]> {
        let [u, v] = *self.uvs.get(channel)?;
        if u == ABSENT_CHANNEL && v == ABSENT_CHANNEL {
            return None;
        }
        Some([unpack_half(u), unpack_half(v)])
    }
}

fn unpack_unit(byte: u8) -> f32 {
    f32::from(byte) / 255.0 * 2.0 - 1.0
}

fn pack_unit(value: f32) -> u8 {
    ((value * 0.5 + 0.5) * 255.0).round().clamp(0.0, 255.0) as u8
}

fn read_unit_vec(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Vec3> {
    let mut raw = [0u8; 4];
    std::io::Read::read_exact(cursor, &mut raw)?;
    Ok(Vec3::new(unpack_unit(raw[0]), unpack_unit(raw[1]), unpack_unit(raw[2])))
}

/// Decode one vertex record. `bbox` maps normalised short positions back
/// to engine space.
pub fn decode_vertex(layout: &VertexLayout, raw: &[u8], bbox: &BoundingBox) -> Result<PackedVertex> {
    if raw.len() < layout.size() {
        return Err(DataError::malformed(
            format!("vertex format {}", layout.code),
            format!("record needs {} bytes, got {}", layout.size(), raw.len()),
        )
        .into());
    }

    let mut cursor = Cursor::new(raw);
    let position = match layout.position {
        PositionEncoding::Float => Vec3::new(
            cursor.read_f32::<LittleEndian>()?,
            cursor.read_f32::<LittleEndian>()?,
            cursor.read_f32::<LittleEndian>()?,
        ),
        PositionEncoding::NormalizedShort => {
            let x = cursor.read_i16::<LittleEndian>()?;
            let y = cursor.read_i16::<LittleEndian>()?;
            let z = cursor.read_i16::<LittleEndian>()?;
            let _w = cursor.read_i16::<LittleEndian>()?;
            let unit = Vec3::new(f32::from(x), f32::from(y), f32::from(z)) / POSITION_SCALE;
            bbox.denormalize(unit)
        }
    };

    let mut bone_indices = vec![0u8; layout.influence_slots];
    std::io::Read::read_exact(&mut cursor, &mut bone_indices)?;
    let mut weights = vec![0u8; layout.influence_slots];
    std::io::Read::read_exact(&mut cursor, &mut weights)?;

    let normal = read_unit_vec(&mut cursor)?;
    let tangent = if layout.has_tangent {
        Some(read_unit_vec(&mut cursor)?)
    } else {
        None
    };

    let uvs = (0..layout.uv_channels)
        .map(|_| -> std::io::Result<[u16; 2]> {
            Ok([cursor.read_u16::<LittleEndian>()?, cursor.read_u16::<LittleEndian>()?])
        })
        .collect::<std::io::Result<Vec<_>>>()?;

    Ok(PackedVertex {
        position,
        normal,
        tangent,
        uvs,
        influences: bone_indices.into_iter().zip(weights).collect(),
    })
}

/// Encode one vertex record.
///
/// Short positions are normalised to `bbox`. Influences beyond the layout's
/// slots are dropped, missing ones are zero. Missing UV channels are
/// written as absent.
pub fn encode_vertex(layout: &VertexLayout, vertex: &PackedVertex, bbox: &BoundingBox) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(layout.size());
    match layout.position {
        PositionEncoding::Float => {
            out.write_f32::<LittleEndian>(vertex.position.x)?;
            out.write_f32::<LittleEndian>(vertex.position.y)?;
            out.write_f32::<LittleEndian>(vertex.position.z)?;
        }
        PositionEncoding::NormalizedShort => {
            let unit = bbox.normalize(vertex.position) * POSITION_SCALE;
            for component in unit.to_array() {
                out.write_i16::<LittleEndian>(component.round().clamp(0.0, POSITION_SCALE) as i16)?;
            }
            out.write_i16::<LittleEndian>(POSITION_SCALE as i16)?;
        }
    }

    let slot = |index: usize| vertex.influences.get(index).copied().unwrap_or((0, 0));
    for index in 0..layout.influence_slots {
        out.write_u8(slot(index).0)?;
    }
    for index in 0..layout.influence_slots {
        out.write_u8(slot(index).1)?;
    }

    let write_unit_vec = |out: &mut Vec<u8>, value: Vec3| -> std::io::Result<()> {
        out.write_all(&[pack_unit(value.x), pack_unit(value.y), pack_unit(value.z), 255])
    };
    write_unit_vec(&mut out, vertex.normal)?;
    if layout.has_tangent {
        write_unit_vec(&mut out, vertex.tangent.unwrap_or(Vec3::ZERO))?;
    }

    for channel in 0..layout.uv_channels {
        let [u, v] = vertex
            .uvs
            .get(channel)
            .copied()
            .unwrap_or([ABSENT_CHANNEL, ABSENT_CHANNEL]);
        out.write_u16::<LittleEndian>(u)?;
        out.write_u16::<LittleEndian>(v)?;
    }
    Ok(out)
}

/// Half float bits of a UV pair.
pub fn pack_uv(uv: [f32; 2]) -> [u16; 2] {
    [pack_half(uv[0]), pack_half(uv[1])]
}

/// Vertex colour stored in a UV channel: `g << 8 | r`, `a << 8 | b`.
pub fn pack_color(rgba: [u8; 4]) -> [u16; 2] {
    let [r, g, b, a] = rgba.map(u16::from);
    [(g << 8) | r, (a << 8) | b]
}

pub fn unpack_color(packed: [u16; 2]) -> [u8; 4] {
    let [rg, ba] = packed;
    [
        (rg & 0xFF) as u8,
        (rg >> 8) as u8,
        (ba & 0xFF) as u8,
        (ba >> 8) as u8,
    ]
}
