//! Extraction to the file system.
//!
//! Every member name is mapped onto the destination through the
//! [`PathSafety`](crate::PathSafety) layer before anything is created.
//! Directory metadata is applied after all members have been written, in
//! reverse order, so creating children does not disturb a directory's
//! modification time or lock it against writes.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use super::{Archive, ExtractResult};
use crate::format::mode::FileType;
use crate::member::MemberReader;
use crate::options::{AccessMode, ExtractOptions, LinkPolicy, OverwritePolicy, PreserveMetadata};
use crate::safety::{validate_extract_path, validate_symlink_target};
use crate::{Error, Member, Result};

/// What happened to one member.
enum Outcome {
    Extracted(u64),
    Skipped,
}

impl<S: Read + Seek> Archive<S> {
    /// Extracts the named member into `dest`.
    ///
    /// Missing parent directories are created. See [`extract_all`] for the
    /// policies applied.
    ///
    /// [`extract_all`]: Archive::extract_all
    pub fn extract(
        &mut self,
        name: &str,
        dest: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Result<ExtractResult> {
        self.require(AccessMode::Read, "extract from")?;
        let index = self
            .members
            .iter()
            .position(|m| m.name() == name)
            .ok_or_else(|| Error::EntryNotFound {
                name: name.to_string(),
            })?;
        self.extract_indices(&[index], dest.as_ref(), options)
    }

    /// Extracts every member into `dest`, in catalog order.
    ///
    /// Extraction stops at the first error; members written before it stay
    /// on disk.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use cpioarc::{Archive, ExtractOptions, LinkPolicy, PreserveMetadata};
    ///
    /// let mut archive = Archive::open_path("initramfs.cpio")?;
    /// let options = ExtractOptions::new()
    ///     .link_policy(LinkPolicy::ValidateTargets)
    ///     .preserve_metadata(PreserveMetadata::modification_time_only());
    /// let result = archive.extract_all("./rootfs", &options)?;
    /// println!("{} members, {} bytes", result.entries_extracted, result.bytes_extracted);
    /// # Ok::<(), cpioarc::Error>(())
    /// ```
    pub fn extract_all(
        &mut self,
        dest: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Result<ExtractResult> {
        self.require(AccessMode::Read, "extract from")?;
        let indices: Vec<usize> = (0..self.members.len()).collect();
        self.extract_indices(&indices, dest.as_ref(), options)
    }

    fn extract_indices(
        &mut self,
        indices: &[usize],
        dest: &Path,
        options: &ExtractOptions,
    ) -> Result<ExtractResult> {
        if !dest.exists() {
            fs::create_dir_all(dest).map_err(Error::Io)?;
        }

        let mut result = ExtractResult::default();
        let mut directories = Vec::new();
        for &index in indices {
            let outcome = self.extract_member(index, dest, options, &mut directories)?;
            result.merge(match outcome {
                Outcome::Extracted(bytes) => ExtractResult {
                    entries_extracted: 1,
                    bytes_extracted: bytes,
                    ..ExtractResult::default()
                },
                Outcome::Skipped => ExtractResult {
                    entries_skipped: 1,
                    ..ExtractResult::default()
                },
            });
        }

        for (path, index) in directories.into_iter().rev() {
            apply_metadata(&path, &self.members[index], &options.preserve_metadata);
        }
        Ok(result)
    }

    fn extract_member(
        &mut self,
        index: usize,
        dest: &Path,
        options: &ExtractOptions,
        directories: &mut Vec<(PathBuf, usize)>,
    ) -> Result<Outcome> {
        let member = &self.members[index];
        let name = member.name().to_string();
        let file_type = member.file_type();

        // Check symlink policy before touching the file system.
        if file_type == FileType::Symlink && options.link_policy == LinkPolicy::Forbid {
            return Err(Error::SymlinkRejected { path: name });
        }

        let path = validate_extract_path(&name, dest, options.path_safety)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        // symlink_metadata so that a dangling link still counts as existing.
        if let Ok(existing) = fs::symlink_metadata(&path) {
            let merge_dirs = file_type == FileType::Directory && existing.is_dir();
            if !merge_dirs {
                match options.overwrite {
                    OverwritePolicy::Error => {
                        return Err(Error::Io(io::Error::new(
                            io::ErrorKind::AlreadyExists,
                            format!("file already exists: {}", path.display()),
                        )));
                    }
                    OverwritePolicy::Skip => {
                        log::debug!("{name}: skipped, {} exists", path.display());
                        return Ok(Outcome::Skipped);
                    }
                    OverwritePolicy::Overwrite => remove_existing(&path, &existing)?,
                }
            }
        }

        log::debug!("{name}: extracting {file_type:?} to {}", path.display());
        let bytes = match file_type {
            FileType::Directory => {
                create_directory(&path, member.permissions())?;
                directories.push((path, index));
                return Ok(Outcome::Extracted(0));
            }
            FileType::Regular => {
                let stream = self.stream.as_mut().ok_or(Error::Closed)?;
                let member = &mut self.members[index];
                let mut reader = MemberReader::new(stream, member);
                reader.seek(io::SeekFrom::Start(0))?;
                let mut out = BufWriter::new(File::create(&path)?);
                let bytes = io::copy(&mut reader, &mut out)?;
                out.flush()?;
                bytes
            }
            FileType::Symlink => {
                let target = self.read_member(&name)?;
                if options.link_policy == LinkPolicy::ValidateTargets {
                    validate_symlink_target(&name, &String::from_utf8_lossy(&target))?;
                }
                create_symlink(&target, &path)?;
                0
            }
            FileType::CharDevice | FileType::BlockDevice | FileType::Fifo | FileType::Socket => {
                let member = &self.members[index];
                create_special(&path, member.mode, member.rdev)?;
                0
            }
            FileType::Unknown => {
                return Err(Error::UnsupportedFeature {
                    feature: "extracting members of unknown file type",
                });
            }
        };

        apply_metadata(&path, &self.members[index], &options.preserve_metadata);
        Ok(Outcome::Extracted(bytes))
    }
}

fn remove_existing(path: &Path, existing: &fs::Metadata) -> Result<()> {
    if existing.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn create_directory(path: &Path, permissions: u32) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    if path.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new().mode(permissions).create(path)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_directory(path: &Path, _permissions: u32) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &[u8], path: &Path) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    std::os::unix::fs::symlink(OsStr::from_bytes(target), path)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_symlink(_target: &[u8], _path: &Path) -> Result<()> {
    Err(Error::UnsupportedFeature {
        feature: "symbolic links on this platform",
    })
}

#[cfg(unix)]
fn create_special(path: &Path, mode: u32, rdev: u64) -> Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        Error::invalid_name(path.to_string_lossy(), "path contains a NUL byte")
    })?;
    // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::mknod(c_path.as_ptr(), mode as libc::mode_t, rdev as libc::dev_t) };
    if rc != 0 {
        return Err(Error::Io(io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn create_special(_path: &Path, _mode: u32, _rdev: u64) -> Result<()> {
    Err(Error::UnsupportedFeature {
        feature: "device and fifo nodes on this platform",
    })
}

/// Applies the preserved metadata of `member` to `path`.
///
/// Failures are logged and otherwise ignored.
fn apply_metadata(path: &Path, member: &Member, preserve: &PreserveMetadata) {
    if !preserve.any() {
        return;
    }
    let is_symlink = member.is_symlink();

    #[cfg(unix)]
    if preserve.ownership {
        let result = if is_symlink {
            std::os::unix::fs::lchown(path, Some(member.uid), Some(member.gid))
        } else {
            std::os::unix::fs::chown(path, Some(member.uid), Some(member.gid))
        };
        if let Err(e) = result {
            log::warn!("Failed to set ownership on '{}': {}", path.display(), e);
        }
    }

    // Permissions of a symlink are those of its target.
    #[cfg(unix)]
    if preserve.permissions && !is_symlink {
        use std::os::unix::fs::PermissionsExt;

        let permissions = fs::Permissions::from_mode(member.permissions());
        if let Err(e) = fs::set_permissions(path, permissions) {
            log::warn!("Failed to set permissions on '{}': {}", path.display(), e);
        }
    }

    if preserve.modification_time {
        let mtime = filetime::FileTime::from_unix_time(
            i64::try_from(member.mtime).unwrap_or(i64::MAX),
            0,
        );
        // Only regular files may be opened; opening a fifo blocks until a
        // writer appears. Everything else is updated through its path.
        let result = if member.is_file() {
            filetime::set_file_mtime(path, mtime)
        } else {
            filetime::set_symlink_file_times(path, mtime, mtime)
        };
        if let Err(e) = result {
            log::warn!(
                "Failed to set modification time on '{}': {}",
                path.display(),
                e
            );
        }
    }
}
