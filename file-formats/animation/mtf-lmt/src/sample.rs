//! Sample buffer decoders

use byteorder::{ByteOrder, LittleEndian};
use glam::{Quat, Vec3};

/// Bits per packed quaternion component
const COMPONENT_BITS: u32 = 14;
const COMPONENT_MASK: u64 = (1 << COMPONENT_BITS) - 1;
const SCALE: f32 = 4096.0;

/// Encoding of a track's sample buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferType {
    /// Three `f32`s per sample
    Vec3,
    /// One `u64` holding four 14-bit fixed point components
    Quat14,
}

impl BufferType {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            2 => Some(Self::Vec3),
            6 => Some(Self::Quat14),
            _ => None,
        }
    }

    pub fn sample_size(self) -> usize {
        match self {
            Self::Vec3 => 12,
            Self::Quat14 => 8,
        }
    }
}

fn component(packed: u64, shift: u32) -> f32 {
    let raw = ((packed >> shift) & COMPONENT_MASK) as i32;
    let signed = if raw > 8191 {
        raw - (1 << COMPONENT_BITS)
    } else {
        raw
    };
    signed as f32 / SCALE
}

/// Unpack a quaternion as `[real, i, j, k]`.
///
/// Components sit at bit 0 (real), 14 (k), 28 (j) and 42 (i). Each one is a
/// 14-bit two's complement integer scaled by 1/4096.
pub fn decode_quat14(packed: u64) -> [f32; 4] {
    [
        component(packed, 0),
        component(packed, 42),
        component(packed, 28),
        component(packed, 14),
    ]
}

pub fn quat_from_packed(packed: u64) -> Quat {
    let [real, i, j, k] = decode_quat14(packed);
    Quat::from_xyzw(i, j, k, real)
}

pub(crate) fn read_quats(buffer: &[u8]) -> Vec<Quat> {
    buffer
        .chunks_exact(8)
        .map(|chunk| quat_from_packed(LittleEndian::read_u64(chunk)))
        .collect()
}

pub(crate) fn read_vec3s(buffer: &[u8]) -> Vec<Vec3> {
    buffer
        .chunks_exact(12)
        .map(|chunk| {
            Vec3::new(
                LittleEndian::read_f32(&chunk[0..4]),
                LittleEndian::read_f32(&chunk[4..8]),
                LittleEndian::read_f32(&chunk[8..12]),
            )
        })
        .collect()
}

/// Pack `[real, i, j, k]` back into the 14-bit layout.
pub fn encode_quat14(components: [f32; 4]) -> u64 {
    let pack = |value: f32| -> u64 {
        let fixed = (value * SCALE).round().clamp(-8192.0, 8191.0) as i32;
        (fixed as u64) & COMPONENT_MASK
    };
    let [real, i, j, k] = components;
    pack(real) | (pack(k) << 14) | (pack(j) << 28) | (pack(i) << 42)
}
