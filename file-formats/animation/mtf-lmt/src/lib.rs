//! Decoder for MT Framework `LMT` animation files.
//!
//! An LMT file holds a table of animation blocks. Each block lists one track
//! header per animated bone, and each header points at a sample buffer:
//! plain `f32` triples for locations, or 64-bit packed quaternions with four
//! 14-bit fixed point components for rotations.

pub mod error;
pub mod lmt;
pub mod sample;

pub use error::{LmtError, Result};
pub use lmt::{Animation, BlockInfo, BoneTracks, Lmt, LmtOptions, TrackHeader, TrackKind};
pub use sample::{BufferType, decode_quat14, quat_from_packed};
