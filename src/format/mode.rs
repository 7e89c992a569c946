//! File type and permission bits of the cpio `mode` field.
//!
//! The values are the traditional `stat(2)` encodings, which every cpio
//! format shares regardless of host platform.

/// Bit mask for the file type bit field.
pub const S_IFMT: u32 = 0o170000;
/// Socket.
pub const S_IFSOCK: u32 = 0o140000;
/// Symbolic link.
pub const S_IFLNK: u32 = 0o120000;
/// Regular file.
pub const S_IFREG: u32 = 0o100000;
/// Block device.
pub const S_IFBLK: u32 = 0o060000;
/// Directory.
pub const S_IFDIR: u32 = 0o040000;
/// Character device.
pub const S_IFCHR: u32 = 0o020000;
/// FIFO.
pub const S_IFIFO: u32 = 0o010000;

/// Permission bits including setuid, setgid and sticky.
pub const PERMISSION_MASK: u32 = 0o7777;

/// The type of an archived filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Regular file; the member data is the file content.
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link; the member data is the link target.
    Symlink,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Named pipe.
    Fifo,
    /// Unix domain socket.
    Socket,
    /// Type bits that match none of the above (including the trailer's mode 0).
    Unknown,
}

impl FileType {
    /// Decodes the file type from a mode value.
    pub const fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => FileType::Regular,
            S_IFDIR => FileType::Directory,
            S_IFLNK => FileType::Symlink,
            S_IFCHR => FileType::CharDevice,
            S_IFBLK => FileType::BlockDevice,
            S_IFIFO => FileType::Fifo,
            S_IFSOCK => FileType::Socket,
            _ => FileType::Unknown,
        }
    }

    /// Returns the `S_IFMT` bits for this type (0 for [`FileType::Unknown`]).
    pub const fn mode_bits(self) -> u32 {
        match self {
            FileType::Regular => S_IFREG,
            FileType::Directory => S_IFDIR,
            FileType::Symlink => S_IFLNK,
            FileType::CharDevice => S_IFCHR,
            FileType::BlockDevice => S_IFBLK,
            FileType::Fifo => S_IFIFO,
            FileType::Socket => S_IFSOCK,
            FileType::Unknown => 0,
        }
    }

    /// Returns true for types materialized with `mknod`.
    pub const fn is_special(self) -> bool {
        matches!(
            self,
            FileType::CharDevice | FileType::BlockDevice | FileType::Fifo | FileType::Socket
        )
    }
}
