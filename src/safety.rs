//! Path safety validation for archive extraction.
//!
//! Member names come straight from the archive and may contain absolute paths
//! or `..` components designed to escape the extraction directory. This module
//! maps member names onto destination paths according to a [`PathSafety`]
//! policy and validates symbolic link targets.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Policy for validating extraction paths.
///
/// The default is `Strict`, which provides the safest behavior by blocking
/// any potential path traversal attacks.
///
/// # Examples
///
/// ```rust
/// use cpioarc::PathSafety;
///
/// let policy = PathSafety::default();
/// assert_eq!(policy, PathSafety::Strict);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathSafety {
    /// Strict validation: block any potential path traversal.
    ///
    /// This is the safest mode and the default. It:
    /// - Rejects names containing `..` components
    /// - Rejects absolute names (starting with `/`)
    /// - Verifies that the resolved path, after following any symlinks that
    ///   already exist on disk, stays within the destination directory
    #[default]
    Strict,
    /// Strip leading `/` from absolute names and reject `..` components.
    ///
    /// This matches what `cpio --no-absolute-filenames` does and suits
    /// archives such as initramfs images that store rooted names.
    Relaxed,
    /// Disables all path validation (DANGEROUS - use with extreme caution).
    ///
    /// Absolute names are extracted relative to the file system root and
    /// `..` components are followed. Only use this for archives you created
    /// yourself.
    Disabled,
}

/// Maps a member name onto a path under `dest_root`.
///
/// `dest_root` must exist for [`PathSafety::Strict`], since containment is
/// checked against its canonical form.
///
/// # Errors
///
/// Returns [`Error::PathTraversal`] if the name would escape `dest_root`
/// under the given policy.
pub fn validate_extract_path(name: &str, dest_root: &Path, policy: PathSafety) -> Result<PathBuf> {
    let traversal = || Error::PathTraversal {
        path: name.to_string(),
    };

    if policy == PathSafety::Disabled {
        return Ok(dest_root.join(name));
    }

    if name.split('/').any(|component| component == "..") {
        return Err(traversal());
    }

    match policy {
        PathSafety::Strict => {
            if name.starts_with('/') {
                return Err(traversal());
            }

            let full_path = dest_root.join(name);
            let canonical_dest = dest_root.canonicalize()?;

            // Canonicalize the deepest existing ancestor, then re-append the
            // components that do not exist yet.
            let mut ancestor = full_path.as_path();
            let mut pending = Vec::new();
            while !ancestor.exists() {
                match (ancestor.file_name(), ancestor.parent()) {
                    (Some(file_name), Some(parent)) => {
                        pending.push(file_name.to_os_string());
                        ancestor = parent;
                    }
                    _ => return Err(traversal()),
                }
            }
            let mut resolved = ancestor.canonicalize()?;
            for component in pending.into_iter().rev() {
                resolved.push(component);
            }

            if !resolved.starts_with(&canonical_dest) {
                return Err(traversal());
            }
            Ok(full_path)
        }
        PathSafety::Relaxed => Ok(dest_root.join(name.trim_start_matches('/'))),
        PathSafety::Disabled => Ok(dest_root.join(name)),
    }
}

/// Validates that a symlink target doesn't escape the extraction directory.
///
/// This checks for:
/// - Absolute targets (always rejected)
/// - `..` sequences climbing above the extraction root
///
/// The depth of the link is taken from `name` (its path inside the archive),
/// so a link at `a/b/link` may point at `../x` but not at `../../../x`.
pub fn validate_symlink_target(name: &str, target: &str) -> Result<()> {
    let escape = || Error::SymlinkTargetEscape {
        path: name.to_string(),
        target: target.to_string(),
    };

    if target.starts_with('/') {
        return Err(escape());
    }

    let parent = Path::new(name.trim_start_matches('/'))
        .parent()
        .unwrap_or(Path::new(""));
    let mut depth = parent
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count() as i64;

    for component in Path::new(target).components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return Err(escape());
                }
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }

    Ok(())
}
