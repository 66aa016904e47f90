//! Texture codec for MT Framework `TEX` files.
//!
//! Version 112 textures carry a short header, a per-face mip offset table and
//! a payload that is byte-compatible with the body of a DDS file. Conversion
//! in either direction copies the payload unchanged and rebuilds the header.
//!
//! # Examples
//!
//! ```
//! use mtf_tex::{DdsImage, PixelFormat, Tex112};
//!
//! let dds = DdsImage {
//!     width: 4,
//!     height: 4,
//!     mipmap_count: 1,
//!     format: PixelFormat::Dxt1,
//!     cubemap: false,
//!     data: vec![0u8; 8].into(),
//! };
//! let tex = Tex112::from_dds(&dds)?;
//! assert_eq!(tex.mipmap_offsets, vec![44]);
//! assert_eq!(tex.to_dds()?, dds);
//! # Ok::<(), mtf_tex::TexError>(())
//! ```

pub mod dds;
pub mod error;
pub mod format;
pub mod tex;

pub use dds::DdsImage;
pub use error::{Result, TexError};
pub use format::PixelFormat;
pub use tex::{Tex112, dds_to_tex, mip_offsets, tex_to_dds};
