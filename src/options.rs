//! Options for reading, writing and extracting archives.

use std::fmt;
use std::str::FromStr;

use crate::format::{ByteOrder, Format};
use crate::safety::PathSafety;
use crate::{Error, Result};

/// Whether an archive is bound for reading or for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// The stream is scanned on open; members can be queried and extracted.
    Read,
    /// The archive starts empty; members are appended and written on flush.
    Write,
}

impl FromStr for AccessMode {
    type Err = Error;

    /// Parses the conventional mode strings `r`, `rb`, `w` and `wb`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" | "rb" => Ok(AccessMode::Read),
            "w" | "wb" => Ok(AccessMode::Write),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => f.write_str("reading"),
            AccessMode::Write => f.write_str("writing"),
        }
    }
}

/// Alignment of the old ASCII (`odc`) format.
///
/// POSIX `odc` archives are unpadded. Some writers nevertheless align
/// names and data to four bytes; reading those needs [`OldAsciiPadding::FourByte`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OldAsciiPadding {
    /// No padding after names or data.
    #[default]
    Unpadded,
    /// Names and data are padded to four-byte boundaries.
    FourByte,
}

impl OldAsciiPadding {
    pub(crate) fn modulus(self) -> u64 {
        match self {
            OldAsciiPadding::Unpadded => 1,
            OldAsciiPadding::FourByte => 4,
        }
    }
}

/// Handling of members literally named `.` or `..`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DotEntryPolicy {
    /// Skip them while scanning.
    #[default]
    Discard,
    /// Keep them in the catalog like any other member.
    Keep,
}

/// Options for opening an archive for reading.
///
/// # Example
///
/// ```rust
/// use cpioarc::{DotEntryPolicy, ReadOptions};
/// use cpioarc::format::Format;
///
/// let options = ReadOptions::new()
///     .format(Format::NewCrc)
///     .verify_checksums(false)
///     .dot_entries(DotEntryPolicy::Keep);
/// assert_eq!(options.format, Some(Format::NewCrc));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Expected format. `None` accepts whatever the first record uses.
    pub format: Option<Format>,
    /// Verify the data checksum of `crc` regular files while scanning.
    pub verify_checksums: bool,
    /// Alias hardlink placeholders to their data-bearing twin after scanning.
    pub resolve_hardlinks: bool,
    /// Handling of `.` and `..` members.
    pub dot_entries: DotEntryPolicy,
    /// Alignment assumed for `odc` archives.
    pub old_ascii_padding: OldAsciiPadding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            format: None,
            verify_checksums: true,
            resolve_hardlinks: true,
            dot_entries: DotEntryPolicy::default(),
            old_ascii_padding: OldAsciiPadding::default(),
        }
    }
}

impl ReadOptions {
    /// Creates read options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires every record to be in the given format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Enables or disables checksum verification.
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Enables or disables hardlink resolution.
    pub fn resolve_hardlinks(mut self, resolve: bool) -> Self {
        self.resolve_hardlinks = resolve;
        self
    }

    /// Sets the dot entry policy.
    pub fn dot_entries(mut self, policy: DotEntryPolicy) -> Self {
        self.dot_entries = policy;
        self
    }

    /// Sets the `odc` alignment.
    pub fn old_ascii_padding(mut self, padding: OldAsciiPadding) -> Self {
        self.old_ascii_padding = padding;
        self
    }
}

/// Options for creating an archive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Header format of every record.
    pub format: Format,
    /// Byte order of [`Format::OldBinary`] headers. Defaults to the host's.
    pub byte_order: ByteOrder,
    /// Alignment used for `odc` archives.
    pub old_ascii_padding: OldAsciiPadding,
}

impl WriteOptions {
    /// Creates write options with default settings (`newc`, host byte order).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the header format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the byte order of old binary headers.
    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Sets the `odc` alignment.
    pub fn old_ascii_padding(mut self, padding: OldAsciiPadding) -> Self {
        self.old_ascii_padding = padding;
        self
    }
}

/// Policy for handling existing files during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Return an error if the file exists.
    #[default]
    Error,
    /// Skip files that already exist.
    Skip,
    /// Overwrite existing files.
    Overwrite,
}

/// Policy for handling symbolic links.
///
/// cpio archives routinely carry symlinks (an initramfs is full of them),
/// so they are extracted as stored unless a stricter policy is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkPolicy {
    /// Forbid symbolic links (safest).
    Forbid,
    /// Allow symbolic links but validate their targets.
    ValidateTargets,
    /// Allow all symbolic links.
    #[default]
    Allow,
}

/// Options for preserving file metadata during extraction.
///
/// Directories, devices and fifos are always created with the member's
/// permission bits, subject to the process umask. The flags here apply the
/// stored values exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreserveMetadata {
    /// Apply the stored permission bits, ignoring the umask.
    pub permissions: bool,
    /// Apply the stored modification time.
    pub modification_time: bool,
    /// Apply the stored uid and gid (usually requires root).
    pub ownership: bool,
}

impl PreserveMetadata {
    /// Preserve all available metadata.
    pub fn all() -> Self {
        Self {
            permissions: true,
            modification_time: true,
            ownership: true,
        }
    }

    /// Preserve no metadata.
    pub fn none() -> Self {
        Self::default()
    }

    /// Preserve only the modification time.
    pub fn modification_time_only() -> Self {
        Self {
            modification_time: true,
            ..Self::default()
        }
    }

    pub(crate) fn any(&self) -> bool {
        self.permissions || self.modification_time || self.ownership
    }
}

/// Options for extraction operations.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Policy for handling existing files.
    pub overwrite: OverwritePolicy,
    /// Path safety validation policy.
    pub path_safety: PathSafety,
    /// Symbolic link handling policy.
    pub link_policy: LinkPolicy,
    /// Metadata preservation options.
    pub preserve_metadata: PreserveMetadata,
}

impl ExtractOptions {
    /// Creates extraction options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the overwrite policy.
    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Sets the path safety policy.
    pub fn path_safety(mut self, policy: PathSafety) -> Self {
        self.path_safety = policy;
        self
    }

    /// Sets the link policy.
    pub fn link_policy(mut self, policy: LinkPolicy) -> Self {
        self.link_policy = policy;
        self
    }

    /// Sets the metadata preservation options.
    pub fn preserve_metadata(mut self, preserve: PreserveMetadata) -> Self {
        self.preserve_metadata = preserve;
        self
    }
}

/// Caller overrides applied to a member built from the file system.
///
/// `mode` replaces only the permission bits; the file type always comes
/// from the source.
///
/// # Example
///
/// ```rust
/// use cpioarc::MemberAmend;
///
/// let amend = MemberAmend::new().uid(0).gid(0).mtime(0);
/// assert_eq!(amend.uid, Some(0));
/// assert_eq!(amend.mode, None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemberAmend {
    /// Owner user id.
    pub uid: Option<u32>,
    /// Owner group id.
    pub gid: Option<u32>,
    /// Modification time in seconds since the Unix epoch.
    pub mtime: Option<u64>,
    /// Permission bits.
    pub mode: Option<u32>,
}

impl MemberAmend {
    /// Creates an empty amendment that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the owner user id.
    pub fn uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    /// Overrides the owner group id.
    pub fn gid(mut self, gid: u32) -> Self {
        self.gid = Some(gid);
        self
    }

    /// Overrides the modification time.
    pub fn mtime(mut self, mtime: u64) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Overrides the permission bits.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }
}
