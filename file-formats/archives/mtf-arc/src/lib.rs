//! Reader and writer for MT Framework `ARC` archives.
//!
//! An archive is an 8 byte header, a table of 80 byte entries and the
//! zlib-compressed payload of every member. Entry names are stored with
//! backslash separators and no extension; the extension is recovered from a
//! per-entry type hash.
//!
//! # Examples
//!
//! ```no_run
//! use mtf_arc::{ArcOptions, Archive, pack};
//!
//! let options = ArcOptions::default();
//! let archive = Archive::open("uPl02JillCos1.arc", &options)?;
//! for entry in archive.entries() {
//!     println!("{} ({} bytes)", entry.file_name(), entry.size);
//! }
//! archive.unpack("extracted")?;
//!
//! let rebuilt = pack("extracted", &options)?;
//! std::fs::write("rebuilt.arc", rebuilt)?;
//! # Ok::<(), mtf_arc::ArcError>(())
//! ```

mod compression;

pub mod archive;
pub mod error;
pub mod ext;
pub mod options;
pub mod path;

pub use archive::{ArcEntry, Archive, ArchiveBuilder, pack, unpack};
pub use error::{ArcError, Result};
pub use options::{ArcOptions, Denylist};
