//! Reading and writing ARC archives

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::{debug, error, info, warn};
use mtf_data::prelude::*;

use crate::compression;
use crate::error::{ArcError, Result};
use crate::ext::{extension_for_hash, hash_for_extension};
use crate::options::{ArcOptions, MAX_MEMBER_SIZE};
use crate::path::{NAME_FIELD_SIZE, path_to_stored_name, split_extension, stored_name_to_path};

pub const ARC_MAGIC: &[u8; 4] = b"ARC\0";
pub const ARC_VERSION: u16 = 7;
/// Header bytes before the file table
pub const HEADER_SIZE: usize = 8;
pub const ENTRY_SIZE: usize = 80;
/// Flag bits written above the 24-bit size
pub const DEFAULT_ENTRY_FLAGS: u8 = 0x40;

static ARC_ENTRY: Schema = Schema::new(
    "ArcEntry",
    &[
        FieldDef::bytes("path", Count::Fixed(NAME_FIELD_SIZE)),
        FieldDef::scalar("type_hash", Primitive::U32),
        FieldDef::scalar("compressed_size", Primitive::U32),
        FieldDef::scalar("size_and_flags", Primitive::U32),
        FieldDef::scalar("offset", Primitive::U32),
    ],
);

static ARC_HEADER: Schema = Schema::new(
    "ArcHeader",
    &[
        FieldDef::bytes("magic", Count::Fixed(4)),
        FieldDef::scalar("version", Primitive::U16),
        FieldDef::scalar("file_count", Primitive::U16),
        FieldDef::records("entries", &ARC_ENTRY, Count::Field("file_count")),
    ],
);

/// One member of the file table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcEntry {
    /// Backslash separated path without extension
    pub name: String,
    pub type_hash: u32,
    pub compressed_size: u32,
    /// Uncompressed size
    pub size: u32,
    pub flags: u8,
    /// Absolute offset of the payload
    pub offset: u32,
}

impl ArcEntry {
    pub fn extension(&self) -> String {
        extension_for_hash(self.type_hash)
    }

    /// Stored name with its extension, e.g. `pawn\pl\pl0200.mod`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.extension())
    }

    /// Filesystem path relative to an unpack destination.
    pub fn relative_path(&self) -> Result<PathBuf> {
        let mut path = stored_name_to_path(&self.name)?;
        let file_name = path
            .file_name()
            .map(|name| format!("{}.{}", name.to_string_lossy(), self.extension()))
            .ok_or_else(|| ArcError::UnsafePath(self.name.clone()))?;
        path.set_file_name(file_name);
        Ok(path)
    }

    pub fn compression_ratio(&self) -> f64 {
        if self.size == 0 {
            1.0
        } else {
            self.compressed_size as f64 / self.size as f64
        }
    }
}

impl SchemaRecord for ArcEntry {
    fn schema() -> &'static Schema {
        &ARC_ENTRY
    }

    fn from_structure(structure: &Structure) -> mtf_data::Result<Self> {
        let size_and_flags = structure.u32("size_and_flags")?;
        Ok(Self {
            name: structure.fixed_str("path")?,
            type_hash: structure.u32("type_hash")?,
            compressed_size: structure.u32("compressed_size")?,
            size: size_and_flags & MAX_MEMBER_SIZE,
            flags: (size_and_flags >> 24) as u8,
            offset: structure.u32("offset")?,
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("path", self.name.as_bytes())
            .with("type_hash", self.type_hash)
            .with("compressed_size", self.compressed_size)
            .with(
                "size_and_flags",
                (self.size & MAX_MEMBER_SIZE) | (u32::from(self.flags) << 24),
            )
            .with("offset", self.offset)
    }
}

/// A parsed archive. Payloads stay compressed until read.
#[derive(Debug, Clone)]
pub struct Archive {
    version: u16,
    entries: Vec<ArcEntry>,
    data: Bytes,
}

impl Archive {
    pub fn parse(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() < 4 || &data[..4] != ARC_MAGIC {
            let found = String::from_utf8_lossy(&data[..data.len().min(4)]).into_owned();
            return Err(ArcError::WrongMagic(found));
        }
        let header = ARC_HEADER.parse(data.clone())?;
        let version = header.u16("version")?;
        if version != ARC_VERSION {
            return Err(DataError::unsupported("ARC version", version).into());
        }

        let entries: Vec<ArcEntry> = header.records_as("entries")?;
        for entry in &entries {
            let end = entry.offset as usize + entry.compressed_size as usize;
            if end > data.len() {
                error!(
                    "Payload of {} is out of bounds! {} > {}",
                    entry.file_name(),
                    end,
                    data.len()
                );
                return Err(DataError::malformed(
                    entry.file_name(),
                    format!("payload ends at {end}, archive is {} bytes", data.len()),
                )
                .into());
            }
        }
        debug!("ARC v{} with {} entries", version, entries.len());

        Ok(Self {
            version,
            entries,
            data,
        })
    }

    /// Read an archive from disk after screening its path.
    pub fn open(path: impl AsRef<Path>, options: &ArcOptions) -> Result<Self> {
        let path = path.as_ref();
        options.denylist.check(path)?;
        Self::parse(fs::read(path)?)
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn entries(&self) -> &[ArcEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry by stored name with extension, ignoring case and separator style.
    pub fn find(&self, file_name: &str) -> Option<&ArcEntry> {
        let wanted = file_name.replace('/', "\\");
        self.entries
            .iter()
            .find(|entry| entry.file_name().eq_ignore_ascii_case(&wanted))
    }

    /// Decompressed payload of `entry`.
    pub fn read(&self, entry: &ArcEntry) -> Result<Vec<u8>> {
        let start = entry.offset as usize;
        let payload = self
            .data
            .get(start..start + entry.compressed_size as usize)
            .ok_or_else(|| {
                DataError::malformed(entry.file_name(), "payload outside the archive")
            })?;
        if payload.first() == Some(&0x78) {
            compression::decompress(payload, entry.size as usize)
        } else if entry.compressed_size == entry.size {
            Ok(payload.to_vec())
        } else {
            Err(ArcError::Compression(format!(
                "{} is neither zlib nor stored",
                entry.file_name()
            )))
        }
    }

    /// Write every member under `destination`, creating directories.
    pub fn unpack(&self, destination: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let destination = destination.as_ref();
        let mut written = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let target = destination.join(entry.relative_path()?);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, self.read(entry)?)?;
            written.push(target);
        }
        info!(
            "Unpacked {} members to {}",
            written.len(),
            destination.display()
        );
        Ok(written)
    }
}

struct Member {
    name: String,
    type_hash: u32,
    data: Vec<u8>,
}

/// Builder for new archives
#[derive(Default)]
pub struct ArchiveBuilder {
    options: ArcOptions,
    members: Vec<Member>,
}

impl ArchiveBuilder {
    pub fn new(options: ArcOptions) -> Self {
        Self {
            options,
            members: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Add a member from its path relative to the archive root, extension
    /// included. A member with the same name and type replaces the old one.
    pub fn add(&mut self, relative: &Path, data: Vec<u8>) -> Result<&mut Self> {
        let (stem, extension) = split_extension(relative)
            .ok_or_else(|| ArcError::UnknownExtension(relative.display().to_string()))?;
        let name = path_to_stored_name(&stem)?;
        let type_hash = hash_for_extension(&extension)?;
        if data.len() > self.options.max_member_size as usize {
            return Err(ArcError::MemberTooLarge {
                path: name,
                size: data.len(),
                limit: self.options.max_member_size,
            });
        }

        match self
            .members
            .iter_mut()
            .find(|member| member.name == name && member.type_hash == type_hash)
        {
            Some(member) => {
                warn!("Replacing member {}.{}", name, extension);
                member.data = data;
            }
            None => self.members.push(Member {
                name,
                type_hash,
                data,
            }),
        }
        Ok(self)
    }

    /// Add every file under `root`. Files matching the denylist are rejected
    /// before anything is read. Files without a known or hex type extension
    /// are skipped.
    pub fn add_dir(&mut self, root: impl AsRef<Path>) -> Result<&mut Self> {
        let root = root.as_ref();
        let mut files = Vec::new();
        collect_files(root, &mut files)?;
        for file in &files {
            self.options.denylist.check(file)?;
        }
        for file in files {
            let relative = file
                .strip_prefix(root)
                .map_err(|_| ArcError::UnsafePath(file.display().to_string()))?
                .to_path_buf();
            let typed = split_extension(&relative)
                .is_some_and(|(_, extension)| hash_for_extension(&extension).is_ok());
            if !typed {
                warn!("Skipping {}: no archive type for its extension", relative.display());
                continue;
            }
            let data = fs::read(&file)?;
            self.add(&relative, data)?;
        }
        Ok(self)
    }

    /// Lay out the archive. Members are ordered by name then type, so the
    /// output does not depend on insertion or directory walk order.
    pub fn build(mut self) -> Result<Bytes> {
        self.members
            .sort_by(|a, b| (&a.name, a.type_hash).cmp(&(&b.name, b.type_hash)));

        let table_end = HEADER_SIZE + self.members.len() * ENTRY_SIZE;
        let alignment = self.options.data_alignment.max(1);
        let data_start = table_end.div_ceil(alignment) * alignment;

        let mut payloads = Vec::with_capacity(self.members.len());
        let mut entries = Vec::with_capacity(self.members.len());
        let mut offset = data_start;
        for member in &self.members {
            let compressed = compression::compress(&member.data, self.options.compression_level)?;
            entries.push(ArcEntry {
                name: member.name.clone(),
                type_hash: member.type_hash,
                compressed_size: compressed.len() as u32,
                size: member.data.len() as u32,
                flags: DEFAULT_ENTRY_FLAGS,
                offset: u32::try_from(offset).map_err(|_| DataError::ValueOutOfRange {
                    value: offset.to_string(),
                    target: "u32",
                })?,
            });
            offset += compressed.len();
            payloads.push(compressed);
        }

        let header = ARC_HEADER.construct(
            FieldValues::new()
                .with("magic", *ARC_MAGIC)
                .with("version", ARC_VERSION)
                .with("file_count", entries.len() as u64)
                .with("entries", records_value(&entries)?),
        )?;

        let mut out = Vec::with_capacity(offset);
        out.extend_from_slice(&header.as_bytes());
        out.resize(data_start, 0);
        for payload in &payloads {
            out.extend_from_slice(payload);
        }
        debug!(
            "Built ARC with {} members, {} bytes",
            entries.len(),
            out.len()
        );
        Ok(Bytes::from(out))
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// Unpack `archive` into `destination`.
pub fn unpack(archive: impl Into<Bytes>, destination: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    Archive::parse(archive)?.unpack(destination)
}

/// Pack every file under `source` into a new archive.
pub fn pack(source: impl AsRef<Path>, options: &ArcOptions) -> Result<Bytes> {
    let mut builder = ArchiveBuilder::new(options.clone());
    builder.add_dir(source)?;
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Bytes {
        let mut builder = ArchiveBuilder::new(ArcOptions::default());
        builder
            .add(Path::new("pawn/pl/pl0200.mod"), b"MOD\0model".to_vec())
            .unwrap()
            .add(Path::new("pawn/pl/tex/body_BM.tex"), vec![7; 300])
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_layout() {
        let bytes = sample();
        assert_eq!(&bytes[..4], b"ARC\0");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 7);
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 2);
        assert_eq!(&bytes[8..8 + 15], b"pawn\\pl\\pl0200\0".as_slice());
        // First payload is a zlib stream at the alignment boundary
        assert_eq!(bytes[0x8000], 0x78);
    }

    #[test]
    fn test_parse_entries() {
        let archive = Archive::parse(sample()).unwrap();
        assert_eq!(archive.version(), 7);
        let names: Vec<_> = archive.entries().iter().map(ArcEntry::file_name).collect();
        assert_eq!(names, vec![r"pawn\pl\pl0200.mod", r"pawn\pl\tex\body_BM.tex"]);

        let tex = archive.find("pawn/pl/tex/BODY_bm.tex").unwrap();
        assert_eq!(tex.size, 300);
        assert_eq!(tex.flags, DEFAULT_ENTRY_FLAGS);
        assert_eq!(archive.read(tex).unwrap(), vec![7u8; 300]);
    }

    #[test]
    fn test_output_is_deterministic() {
        let mut builder = ArchiveBuilder::new(ArcOptions::default());
        builder
            .add(Path::new("pawn/pl/tex/body_BM.tex"), vec![7; 300])
            .unwrap()
            .add(Path::new("pawn/pl/pl0200.mod"), b"MOD\0model".to_vec())
            .unwrap();
        assert_eq!(builder.build().unwrap(), sample());
    }

    #[test]
    fn test_out_of_bounds_payload() {
        let bytes = sample();
        let err = Archive::parse(bytes.slice(..0x8004)).unwrap_err();
        assert!(matches!(err, ArcError::Data(ref e) if e.is_malformed()));
    }

    #[test]
    fn test_wrong_magic_and_version() {
        assert!(matches!(
            Archive::parse(Bytes::from_static(b"TEX\0\x70\0")),
            Err(ArcError::WrongMagic(_))
        ));
        let mut bytes = sample().to_vec();
        bytes[4] = 8;
        assert!(matches!(
            Archive::parse(bytes),
            Err(ArcError::Data(DataError::UnsupportedVariant { .. }))
        ));
    }

    #[test]
    fn test_member_size_limit() {
        let options = ArcOptions {
            max_member_size: 4,
            ..ArcOptions::default()
        };
        let mut builder = ArchiveBuilder::new(options);
        assert!(matches!(
            builder.add(Path::new("a.tex"), vec![0; 5]),
            Err(ArcError::MemberTooLarge { .. })
        ));
    }

    #[test]
    fn test_stored_member_is_read_raw() {
        let entry = ArcEntry {
            name: "raw".into(),
            type_hash: 0x241F_5DEB,
            compressed_size: 3,
            size: 3,
            flags: 0,
            offset: 8 + 80,
        };
        let header = ARC_HEADER
            .construct(
                FieldValues::new()
                    .with("magic", *ARC_MAGIC)
                    .with("version", ARC_VERSION)
                    .with("file_count", 1u16)
                    .with("entries", records_value(std::slice::from_ref(&entry)).unwrap()),
            )
            .unwrap();
        let mut bytes = header.as_bytes().to_vec();
        bytes.extend_from_slice(b"abc");
        let archive = Archive::parse(bytes).unwrap();
        assert_eq!(archive.read(&archive.entries()[0]).unwrap(), b"abc");
    }
}
