//! File type hashes stored in archive entries.
//!
//! Entries carry a type hash instead of an extension. Known hashes map to
//! their usual extension; anything else round-trips through an extension
//! spelled as eight hex digits.

use crate::error::{ArcError, Result};

const KNOWN_TYPES: &[(&str, u32)] = &[
    ("mod", 0x58A1_5856),
    ("tex", 0x241F_5DEB),
    ("lmt", 0x7682_0D81),
    ("sbc", 0x51FC_779F),
    ("mrl", 0x2749_C8A8),
];

/// Extension used when unpacking a member with `type_hash`.
pub fn extension_for_hash(type_hash: u32) -> String {
    KNOWN_TYPES
        .iter()
        .find(|(_, hash)| *hash == type_hash)
        .map_or_else(|| format!("{type_hash:08x}"), |(ext, _)| (*ext).to_owned())
}

/// Type hash stored for a member with extension `ext`.
pub fn hash_for_extension(ext: &str) -> Result<u32> {
    let lower = ext.to_ascii_lowercase();
    if let Some((_, hash)) = KNOWN_TYPES.iter().find(|(known, _)| *known == lower) {
        return Ok(*hash);
    }
    if lower.len() == 8 {
        if let Ok(hash) = u32::from_str_radix(&lower, 16) {
            return Ok(hash);
        }
    }
    Err(ArcError::UnknownExtension(ext.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("mod", 0x58A1_5856)]
    #[test_case("TEX", 0x241F_5DEB)]
    #[test_case("lmt", 0x7682_0D81)]
    #[test_case("0badf00d", 0x0BAD_F00D)]
    fn test_hash_for_extension(ext: &str, expected: u32) {
        assert_eq!(hash_for_extension(ext).unwrap(), expected);
    }

    #[test]
    fn test_unknown_hash_round_trips_as_hex() {
        let ext = extension_for_hash(0x1234_ABCD);
        assert_eq!(ext, "1234abcd");
        assert_eq!(hash_for_extension(&ext).unwrap(), 0x1234_ABCD);
        assert_eq!(extension_for_hash(0x241F_5DEB), "tex");
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            hash_for_extension("txt"),
            Err(ArcError::UnknownExtension(_))
        ));
    }
}
