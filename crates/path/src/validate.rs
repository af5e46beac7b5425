//! Validation of names and absolute paths.

use crate::{segments, PathError, PARENT};

/// Validates a single group or value name.
///
/// A name must contain a non-whitespace character and may not contain the
/// separator or a NUL byte. `.` and `..` are reserved for navigation.
///
/// # Example
///
/// ```
/// use df2_path::validate_name;
///
/// assert!(validate_name("Table0").is_ok());
/// assert!(validate_name("  ").is_err());
/// assert!(validate_name("a/b").is_err());
/// assert!(validate_name("..").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<(), PathError> {
    if name.trim().is_empty() {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "name is empty or whitespace",
        });
    }
    if name.contains('/') {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "name contains the path separator",
        });
    }
    if name.contains('\0') {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "name contains a NUL byte",
        });
    }
    if name == "." || name == PARENT {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "name is reserved for navigation",
        });
    }
    Ok(())
}

/// Validates that `path` is absolute and free of `..` segments.
pub fn validate_absolute(path: &str) -> Result<(), PathError> {
    if !path.starts_with('/') {
        return Err(PathError::NotAbsolute(path.to_string()));
    }
    if segments(path).any(|s| s == PARENT) {
        return Err(PathError::ParentSegment(path.to_string()));
    }
    Ok(())
}
