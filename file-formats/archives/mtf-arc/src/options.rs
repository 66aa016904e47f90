//! Archive tuning and input screening

use std::path::Path;

use glob::{MatchOptions, Pattern};
use log::warn;

use crate::error::{ArcError, Result};

/// Offset of the first payload in archives written with default options
pub const DEFAULT_DATA_ALIGNMENT: usize = 0x8000;

/// Largest member size the 24-bit size field can describe
pub const MAX_MEMBER_SIZE: u32 = 0x00FF_FFFF;

/// Environment variable holding extra denylist patterns, separated by `;`
pub const DENYLIST_ENV: &str = "MTF_ARC_DENYLIST";

/// Options for reading and writing archives
#[derive(Debug, Clone)]
pub struct ArcOptions {
    /// zlib level for member payloads (0-9)
    pub compression_level: u32,
    /// Payloads start at the first multiple of this past the file table
    pub data_alignment: usize,
    /// Largest uncompressed member accepted when packing
    pub max_member_size: u32,
    /// Sources rejected before any processing
    pub denylist: Denylist,
}

impl Default for ArcOptions {
    fn default() -> Self {
        Self {
            compression_level: 6,
            data_alignment: DEFAULT_DATA_ALIGNMENT,
            max_member_size: MAX_MEMBER_SIZE,
            denylist: Denylist::default(),
        }
    }
}

impl ArcOptions {
    pub fn with_denylist(mut self, denylist: Denylist) -> Self {
        self.denylist = denylist;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }
}

/// Glob patterns naming files known to break the codecs.
///
/// A path is denied when a pattern matches either its file name or the
/// whole path. Matching ignores case.
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    patterns: Vec<Pattern>,
}

impl Denylist {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut denylist = Self::default();
        for pattern in patterns {
            denylist.push(pattern.as_ref())?;
        }
        Ok(denylist)
    }

    /// Patterns from [`DENYLIST_ENV`], empty when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var(DENYLIST_ENV) {
            Ok(value) => Self::from_list(&value),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Parse a `;` separated pattern list.
    pub fn from_list(list: &str) -> Result<Self> {
        let patterns: Vec<&str> = list
            .split(';')
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .collect();
        Self::new(&patterns)
    }

    pub fn push(&mut self, pattern: &str) -> Result<()> {
        self.patterns.push(Pattern::new(pattern)?);
        Ok(())
    }

    pub fn extend(&mut self, other: &Self) {
        self.patterns.extend(other.patterns.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Pattern that matches `path`, if any.
    pub fn matching(&self, path: &Path) -> Option<&str> {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        let file_name = path.file_name().map(Path::new);
        self.patterns
            .iter()
            .find(|pattern| {
                pattern.matches_path_with(path, options)
                    || file_name.is_some_and(|name| pattern.matches_path_with(name, options))
            })
            .map(Pattern::as_str)
    }

    /// Fail with [`ArcError::UnsupportedInput`] when `path` is denied.
    pub fn check(&self, path: &Path) -> Result<()> {
        match self.matching(path) {
            Some(pattern) => {
                warn!("Rejecting {}: denylisted by `{}`", path.display(), pattern);
                Err(ArcError::UnsupportedInput {
                    path: path.to_path_buf(),
                    pattern: pattern.to_owned(),
                })
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_file_name_or_path() {
        let denylist = Denylist::new(&["uOm*.arc", "**/broken/*"]).unwrap();
        assert_eq!(
            denylist.matching(Path::new("/games/re5/arc/UOM0001.ARC")),
            Some("uOm*.arc")
        );
        assert!(denylist.matching(Path::new("data/broken/x.tex")).is_some());
        assert!(denylist.matching(Path::new("data/fine/x.tex")).is_none());
    }

    #[test]
    fn test_check_reports_pattern() {
        let denylist = Denylist::from_list(" a.arc ; ;b.arc").unwrap();
        assert_eq!(denylist.len(), 2);
        match denylist.check(Path::new("b.arc")) {
            Err(ArcError::UnsupportedInput { pattern, .. }) => assert_eq!(pattern, "b.arc"),
            other => panic!("expected denial, got {other:?}"),
        }
        assert!(denylist.check(Path::new("c.arc")).is_ok());
    }

    #[test]
    fn test_bad_pattern() {
        assert!(matches!(
            Denylist::new(&["[unclosed"]),
            Err(ArcError::Pattern(_))
        ));
    }

    #[test]
    fn test_default_options() {
        let options = ArcOptions::default().with_compression_level(42);
        assert_eq!(options.compression_level, 9);
        assert_eq!(options.data_alignment, 0x8000);
        assert!(options.denylist.is_empty());
    }
}
