//! Conversion between stored member names and filesystem paths.
//!
//! Stored names use backslash separators, carry no extension and fill a
//! NUL-terminated 64 byte field.

use std::path::{Component, Path, PathBuf};

use crate::error::{ArcError, Result};

/// Size of the name field, terminator included
pub const NAME_FIELD_SIZE: usize = 64;

/// Turn a stored name into a relative path, rejecting anything that could
/// escape the destination directory.
pub fn stored_name_to_path(name: &str) -> Result<PathBuf> {
    if name.is_empty() {
        return Err(ArcError::UnsafePath("empty member name".into()));
    }
    if name.contains('\0') {
        return Err(ArcError::UnsafePath(format!("{name:?} contains NUL")));
    }
    if name.starts_with(['\\', '/']) {
        return Err(ArcError::UnsafePath(format!("{name} is absolute")));
    }

    let mut path = PathBuf::new();
    for part in name.split(['\\', '/']) {
        match part {
            "" | "." => continue,
            ".." => {
                return Err(ArcError::UnsafePath(format!(
                    "{name} contains a parent directory reference"
                )));
            }
            _ if part.contains(':') => {
                return Err(ArcError::UnsafePath(format!("{name} names a drive or stream")));
            }
            _ => path.push(part),
        }
    }
    if path.as_os_str().is_empty() {
        return Err(ArcError::UnsafePath(format!("{name} has no components")));
    }
    Ok(path)
}

/// Stored name for a path relative to the packed directory, extension
/// already removed.
pub fn path_to_stored_name(relative: &Path) -> Result<String> {
    let display = relative.display().to_string();
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| ArcError::path_encoding(&display, "not valid UTF-8"))?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => return Err(ArcError::UnsafePath(display)),
        }
    }
    let name = parts.join("\\");
    if name.is_empty() {
        return Err(ArcError::UnsafePath(display));
    }
    if !name.is_ascii() {
        return Err(ArcError::path_encoding(&name, "not ASCII"));
    }
    if name.len() >= NAME_FIELD_SIZE {
        return Err(ArcError::path_encoding(&name, "longer than 63 bytes"));
    }
    Ok(name)
}

/// Split a file name into stem and extension at the last dot.
pub fn split_extension(path: &Path) -> Option<(PathBuf, String)> {
    let extension = path.extension()?.to_str()?.to_owned();
    Some((path.with_extension(""), extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_stored_name_to_path() {
        let path = stored_name_to_path(r"pawn\pl\pl02\model\pl0200").unwrap();
        let expected: PathBuf = ["pawn", "pl", "pl02", "model", "pl0200"].iter().collect();
        assert_eq!(path, expected);
    }

    #[test_case(r"..\evil" ; "parent reference")]
    #[test_case(r"a\..\..\evil" ; "nested parent reference")]
    #[test_case(r"\root\file" ; "absolute")]
    #[test_case(r"C:\windows\file" ; "drive letter")]
    #[test_case("" ; "empty")]
    fn test_unsafe_names_rejected(name: &str) {
        assert!(matches!(
            stored_name_to_path(name),
            Err(ArcError::UnsafePath(_))
        ));
    }

    #[test]
    fn test_path_to_stored_name() {
        let relative: PathBuf = ["pawn", "pl", "tex01"].iter().collect();
        assert_eq!(path_to_stored_name(&relative).unwrap(), r"pawn\pl\tex01");
        let long: PathBuf = ["a".repeat(40), "b".repeat(40)].iter().collect();
        assert!(matches!(
            path_to_stored_name(&long),
            Err(ArcError::PathEncoding { .. })
        ));
        assert!(matches!(
            path_to_stored_name(Path::new("caf\u{e9}")),
            Err(ArcError::PathEncoding { .. })
        ));
    }

    #[test]
    fn test_split_extension() {
        let (stem, ext) = split_extension(Path::new("a/b/c.mod")).unwrap();
        assert_eq!(stem, Path::new("a/b/c"));
        assert_eq!(ext, "mod");
        assert!(split_extension(Path::new("a/README")).is_none());
    }
}
