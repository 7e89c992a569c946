//! Archive members.
//!
//! A [`Member`] is one archived filesystem object: its header metadata, its
//! name, and a view of its data. Members scanned from an archive refer to a
//! region of the backing stream; members built for writing own their bytes.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::format::header::RawHeader;
use crate::format::mode::{FileType, PERMISSION_MASK, S_IFMT};
use crate::format::{ByteOrder, Format, TRAILER_NAME, major, minor};
use crate::options::MemberAmend;
use crate::{Error, Result};

/// Where a member's data lives.
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum MemberData {
    /// A region of the archive stream starting at `offset`.
    Stream { offset: u64 },
    /// Bytes owned by the member.
    Buffer(Vec<u8>),
}

impl fmt::Debug for MemberData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberData::Stream { offset } => f.debug_struct("Stream").field("offset", offset).finish(),
            MemberData::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
        }
    }
}

/// One archived filesystem object.
///
/// The identity and ownership fields are public. The name, size and data are
/// fixed at construction so that the header always agrees with the data.
///
/// # Example
///
/// ```rust
/// use cpioarc::Member;
///
/// let member = Member::file("etc/hostname", b"box\n".to_vec()).unwrap();
/// assert_eq!(member.name(), "etc/hostname");
/// assert_eq!(member.namesize(), 13);
/// assert_eq!(member.size(), 4);
/// assert_eq!(member.nlink(), 1);
/// assert!(member.is_file());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Device containing the original file.
    pub dev: u64,
    /// Inode number. Together with `dev` it identifies hardlinks.
    pub ino: u64,
    /// File type and permission bits.
    pub mode: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Modification time in seconds since the Unix epoch.
    pub mtime: u64,
    /// Device identifier of character and block devices.
    pub rdev: u64,
    name: String,
    size: u64,
    nlink: u32,
    checksum: u32,
    cursor: u64,
    pub(crate) data: MemberData,
}

impl Member {
    fn new(name: String, mode: u32, data: Vec<u8>) -> Result<Self> {
        validate_name(&name)?;
        let nlink = default_nlink(mode);
        Ok(Self {
            dev: 0,
            ino: 0,
            mode,
            uid: 0,
            gid: 0,
            mtime: 0,
            rdev: 0,
            name,
            size: data.len() as u64,
            nlink,
            checksum: 0,
            cursor: 0,
            data: MemberData::Buffer(data),
        })
    }

    /// Creates a regular file member with permissions `0644`.
    ///
    /// Ownership, mtime and identity are zero; adjust them through the public
    /// fields or [`Member::with_amend`].
    pub fn file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new(name.into(), FileType::Regular.mode_bits() | 0o644, data.into())
    }

    /// Creates a directory member with permissions `0755`.
    pub fn directory(name: impl Into<String>) -> Result<Self> {
        Self::new(name.into(), FileType::Directory.mode_bits() | 0o755, Vec::new())
    }

    /// Creates a symbolic link member pointing at `target`.
    pub fn symlink(name: impl Into<String>, target: impl Into<String>) -> Result<Self> {
        let target: String = target.into();
        Self::new(
            name.into(),
            FileType::Symlink.mode_bits() | 0o777,
            target.into_bytes(),
        )
    }

    /// Creates a device, fifo or socket member.
    ///
    /// `rdev` is meaningful for devices and is usually built with
    /// [`makedev`](crate::format::makedev).
    pub fn special(name: impl Into<String>, file_type: FileType, rdev: u64) -> Result<Self> {
        if !file_type.is_special() {
            return Err(Error::UnsupportedFeature {
                feature: "special members must be devices, fifos or sockets",
            });
        }
        let mut member = Self::new(name.into(), file_type.mode_bits() | 0o644, Vec::new())?;
        member.rdev = rdev;
        Ok(member)
    }

    /// Builds a member from a file system object, without following symlinks.
    ///
    /// Regular file content and symlink targets are read into memory.
    #[cfg(unix)]
    pub fn from_path(path: impl AsRef<Path>, name: impl Into<String>) -> Result<Self> {
        use std::os::unix::ffi::OsStrExt;
        use std::os::unix::fs::MetadataExt;

        let path = path.as_ref();
        let metadata = std::fs::symlink_metadata(path)?;
        let mode = metadata.mode();

        let data = match FileType::from_mode(mode) {
            FileType::Regular => std::fs::read(path)?,
            FileType::Symlink => std::fs::read_link(path)?.as_os_str().as_bytes().to_vec(),
            _ => Vec::new(),
        };

        let mut member = Self::new(name.into(), mode, data)?;
        member.dev = metadata.dev();
        member.ino = metadata.ino();
        member.uid = metadata.uid();
        member.gid = metadata.gid();
        member.mtime = u64::try_from(metadata.mtime()).unwrap_or(0);
        member.rdev = metadata.rdev();
        Ok(member)
    }

    /// Builds a member from a file system object, without following symlinks.
    #[cfg(not(unix))]
    pub fn from_path(_path: impl AsRef<Path>, _name: impl Into<String>) -> Result<Self> {
        Err(Error::UnsupportedFeature {
            feature: "building members from paths on this platform",
        })
    }

    /// Builds a member from a decoded header.
    pub(crate) fn from_header(header: &RawHeader, name: String, data_offset: u64) -> Self {
        let checksum = if header.format.has_checksum()
            && FileType::from_mode(header.mode) == FileType::Regular
        {
            header.check
        } else {
            0
        };
        Self {
            dev: header.dev,
            ino: header.ino,
            mode: header.mode,
            uid: header.uid,
            gid: header.gid,
            mtime: header.mtime,
            rdev: header.rdev,
            name,
            size: header.filesize,
            nlink: header.nlink,
            checksum,
            cursor: 0,
            data: MemberData::Stream {
                offset: data_offset,
            },
        }
    }

    /// Returns the header that describes this member in `format`.
    pub(crate) fn to_header(&self, format: Format, byte_order: ByteOrder) -> RawHeader {
        RawHeader {
            format,
            byte_order,
            dev: self.dev,
            ino: self.ino,
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            nlink: self.nlink,
            rdev: self.rdev,
            mtime: self.mtime,
            filesize: self.size,
            namesize: self.namesize(),
            check: if format.has_checksum() && self.is_file() {
                self.checksum
            } else {
                0
            },
        }
    }

    /// Applies caller overrides. A mode override replaces the permission bits only.
    pub fn with_amend(mut self, amend: &MemberAmend) -> Self {
        if let Some(uid) = amend.uid {
            self.uid = uid;
        }
        if let Some(gid) = amend.gid {
            self.gid = gid;
        }
        if let Some(mtime) = amend.mtime {
            self.mtime = mtime;
        }
        if let Some(mode) = amend.mode {
            self.mode = (self.mode & S_IFMT) | (mode & PERMISSION_MASK);
        }
        self
    }

    /// Returns the pathname.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the length of the name including its terminating NUL.
    pub fn namesize(&self) -> u64 {
        self.name.len() as u64 + 1
    }

    /// Returns the length of the data in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the link count.
    pub fn nlink(&self) -> u32 {
        self.nlink
    }

    /// Overrides the link count, e.g. to write hardlinked members.
    pub fn set_nlink(&mut self, nlink: u32) {
        self.nlink = nlink;
    }

    /// Returns the stored checksum (non-zero only for `crc` regular files).
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Returns the file type encoded in the mode.
    pub fn file_type(&self) -> FileType {
        FileType::from_mode(self.mode)
    }

    /// Returns the permission bits of the mode.
    pub fn permissions(&self) -> u32 {
        self.mode & PERMISSION_MASK
    }

    /// Returns true for directories.
    pub fn is_dir(&self) -> bool {
        self.file_type() == FileType::Directory
    }

    /// Returns true for regular files.
    pub fn is_file(&self) -> bool {
        self.file_type() == FileType::Regular
    }

    /// Returns true for symbolic links.
    pub fn is_symlink(&self) -> bool {
        self.file_type() == FileType::Symlink
    }

    /// Major number of the containing device.
    pub fn dev_major(&self) -> u32 {
        major(self.dev)
    }

    /// Minor number of the containing device.
    pub fn dev_minor(&self) -> u32 {
        minor(self.dev)
    }

    /// Major number of a device member.
    pub fn rdev_major(&self) -> u32 {
        major(self.rdev)
    }

    /// Minor number of a device member.
    pub fn rdev_minor(&self) -> u32 {
        minor(self.rdev)
    }

    /// Returns the modification time as a SystemTime.
    pub fn modified(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.mtime)
    }

    /// Returns the current read position within the data.
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Returns the in-memory data of a member built for writing.
    ///
    /// Members scanned from an archive return `None`; read them through
    /// [`Archive::member_reader`](crate::Archive::member_reader).
    pub fn data(&self) -> Option<&[u8]> {
        match &self.data {
            MemberData::Buffer(bytes) => Some(bytes),
            MemberData::Stream { .. } => None,
        }
    }

    /// Returns the stream offset of the data of a scanned member.
    pub fn data_offset(&self) -> Option<u64> {
        match self.data {
            MemberData::Stream { offset } => Some(offset),
            MemberData::Buffer(_) => None,
        }
    }

    pub(crate) fn set_checksum(&mut self, checksum: u32) {
        self.checksum = checksum;
    }

    /// Makes this member share the data region of `twin`.
    pub(crate) fn alias_data(&mut self, twin: &Member) {
        self.data = twin.data.clone();
        self.size = twin.size;
        self.checksum = twin.checksum;
        self.nlink = 1;
        self.cursor = 0;
    }
}

/// Link count a freshly built member reports.
fn default_nlink(mode: u32) -> u32 {
    if FileType::from_mode(mode) == FileType::Directory {
        2
    } else {
        1
    }
}

/// Checks that `name` can be stored as a member name.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name == "." || name == ".." {
        "dot entries cannot be stored"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else if name == TRAILER_NAME {
        "name is reserved for the archive trailer"
    } else {
        return Ok(());
    };
    Err(Error::invalid_name(name, reason))
}

/// A read/seek view over one member's data.
///
/// Every read seeks the stream to the member's data offset plus the cursor
/// first, so several readers can be used in turn on the same archive.
/// Seeking clamps into `[0, size]`.
pub struct MemberReader<'a, S> {
    stream: &'a mut S,
    member: &'a mut Member,
}

impl<'a, S> MemberReader<'a, S> {
    pub(crate) fn new(stream: &'a mut S, member: &'a mut Member) -> Self {
        Self { stream, member }
    }

    /// Returns the member being read.
    pub fn member(&self) -> &Member {
        self.member
    }

    /// Returns the number of bytes left before the end of the data.
    pub fn remaining(&self) -> u64 {
        self.member.size - self.member.cursor
    }
}

impl<S: Read + Seek> Read for MemberReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let cursor = self.member.cursor;

        let n = match &self.member.data {
            MemberData::Buffer(bytes) => {
                // cursor <= size == bytes.len(), so the cast is lossless
                let start = cursor as usize;
                buf[..want].copy_from_slice(&bytes[start..start + want]);
                want
            }
            MemberData::Stream { offset } => {
                self.stream.seek(SeekFrom::Start(offset + cursor))?;
                self.stream.read(&mut buf[..want])?
            }
        };

        self.member.cursor += n as u64;
        Ok(n)
    }
}

impl<S> Seek for MemberReader<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let size = self.member.size;
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(d) => i128::from(self.member.cursor) + i128::from(d),
            SeekFrom::End(d) => i128::from(size) + i128::from(d),
        };
        // Clamped into [0, size], so the narrowing is lossless.
        self.member.cursor = target.clamp(0, i128::from(size)) as u64;
        Ok(self.member.cursor)
    }
}
