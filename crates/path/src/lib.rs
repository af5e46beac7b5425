//! Path algebra for DF2 group/value trees.
//!
//! Paths look like filesystem paths: segments separated by `/`, absolute when
//! they start with `/`. Groups are conventionally written with a trailing
//! `/` (`/Tables/Table0/`), values without (`/Tables/Table0/Length`); both
//! forms name the same segments.
//!
//! # Example
//!
//! ```
//! use df2_path::{relative_to, resolve_absolute};
//!
//! let base = "/RootData/Tables/Table0/DataStorage/";
//! assert_eq!(
//!     resolve_absolute("../DataLength", base).unwrap(),
//!     "/RootData/Tables/Table0/DataLength"
//! );
//! assert_eq!(
//!     relative_to("/RootData/NumTables", base).unwrap(),
//!     "../../../NumTables"
//! );
//! ```

use thiserror::Error;

pub mod validate;
pub use validate::{validate_absolute, validate_name};

/// Segment separator.
pub const SEPARATOR: char = '/';

/// Segment that refers to the current group.
pub const CURRENT: &str = ".";

/// Segment that refers to the parent group.
pub const PARENT: &str = "..";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path {0:?} is not absolute")]
    NotAbsolute(String),
    #[error("path {0:?} contains a '..' segment")]
    ParentSegment(String),
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
}

/// Iterates the non-empty segments of a path.
///
/// Leading, trailing and repeated separators are ignored.
///
/// ```
/// use df2_path::segments;
///
/// let parts: Vec<_> = segments("/a//b/").collect();
/// assert_eq!(parts, ["a", "b"]);
/// ```
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}

/// Joins segments into an absolute path. The root is `/`.
///
/// ```
/// use df2_path::join;
///
/// assert_eq!(join::<&str>(&[]), "/");
/// assert_eq!(join(&["a", "b"]), "/a/b");
/// ```
pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    if parts.is_empty() {
        return SEPARATOR.to_string();
    }
    let mut out = String::new();
    for part in parts {
        out.push(SEPARATOR);
        out.push_str(part.as_ref());
    }
    out
}

/// Returns `true` when the path has no segments.
pub fn is_root(path: &str) -> bool {
    segments(path).next().is_none()
}

/// Last segment of a path, if any.
pub fn file_name(path: &str) -> Option<&str> {
    segments(path).last()
}

/// Absolute path of the parent, or `None` for the root.
pub fn parent(path: &str) -> Option<String> {
    let parts: Vec<&str> = segments(path).collect();
    let (_, rest) = parts.split_last()?;
    Some(join(rest))
}

/// Check if `parent` strictly contains `child`, segment-wise.
///
/// ```
/// use df2_path::is_child;
///
/// assert!(is_child("/a/", "/a/b"));
/// assert!(!is_child("/a/b", "/a/b"));
/// assert!(!is_child("/a", "/ab"));
/// ```
pub fn is_child(parent: &str, child: &str) -> bool {
    let p: Vec<&str> = segments(parent).collect();
    let c: Vec<&str> = segments(child).collect();
    p.len() < c.len() && p.iter().zip(&c).all(|(a, b)| a == b)
}

/// Resolves `path` against the absolute `base` and returns the absolute result.
///
/// A leading `/` on `path` restarts from the root. `..` pops one segment
/// (stopping at the root), `.` is a no-op, anything else is appended. The
/// result carries no trailing separator.
///
/// # Errors
///
/// [`PathError::NotAbsolute`] or [`PathError::ParentSegment`] if `base` is
/// not a normalized absolute path.
pub fn resolve_absolute(path: &str, base: &str) -> Result<String, PathError> {
    validate_absolute(base)?;
    let mut stack: Vec<&str> = if path.starts_with(SEPARATOR) {
        Vec::new()
    } else {
        segments(base).filter(|s| *s != CURRENT).collect()
    };
    for segment in segments(path) {
        match segment {
            CURRENT => {}
            PARENT => {
                stack.pop();
            }
            name => stack.push(name),
        }
    }
    Ok(join(&stack))
}

/// Computes the relative path that leads from `base` to `target`.
///
/// Emits one `..` per segment of `base` beyond the longest common prefix,
/// followed by the remaining segments of `target`. Equal paths produce an
/// empty string.
///
/// # Errors
///
/// Both arguments must be absolute and free of `..` segments.
pub fn relative_to(target: &str, base: &str) -> Result<String, PathError> {
    validate_absolute(target)?;
    validate_absolute(base)?;
    let target: Vec<&str> = segments(target).filter(|s| *s != CURRENT).collect();
    let base: Vec<&str> = segments(base).filter(|s| *s != CURRENT).collect();
    let common = target
        .iter()
        .zip(&base)
        .take_while(|(t, b)| t == b)
        .count();
    let mut parts: Vec<&str> = std::iter::repeat(PARENT)
        .take(base.len() - common)
        .collect();
    parts.extend_from_slice(&target[common..]);
    Ok(parts.join("/"))
}

/// Shortest non-empty path that resolves from `base` to `target`.
///
/// Picks between [`relative_to`] and the absolute form; an empty relative
/// path becomes `.` so the result is never mistaken for "no path".
///
/// ```
/// use df2_path::shortest_reference;
///
/// assert_eq!(shortest_reference("/a/b/c", "/a/b/").unwrap(), "c");
/// assert_eq!(shortest_reference("/x", "/a/b/c/").unwrap(), "/x");
/// assert_eq!(shortest_reference("/a/b", "/a/b/").unwrap(), ".");
/// ```
pub fn shortest_reference(target: &str, base: &str) -> Result<String, PathError> {
    let relative = relative_to(target, base)?;
    if relative.is_empty() {
        return Ok(CURRENT.to_string());
    }
    let parts: Vec<&str> = segments(target).filter(|s| *s != CURRENT).collect();
    let absolute = join(&parts);
    if absolute.len() < relative.len() {
        Ok(absolute)
    } else {
        Ok(relative)
    }
}
