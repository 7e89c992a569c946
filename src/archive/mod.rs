//! The cpio archive handle.
//!
//! An [`Archive`] is bound to one stream in one [`AccessMode`]. In read mode
//! the whole catalog is scanned when the archive is opened; members are then
//! queried, read and extracted by name. In write mode the archive starts
//! empty, members are appended in memory and the catalog is emitted on
//! [`flush`](Archive::flush) and [`close`](Archive::close).
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use cpioarc::{Archive, Member, WriteOptions};
//!
//! let mut archive = Archive::create(Cursor::new(Vec::new()), WriteOptions::default())?;
//! archive.append(Member::directory("etc")?)?;
//! archive.append(Member::file("etc/hostname", b"box\n".to_vec())?)?;
//! let bytes = archive.finish()?.into_inner();
//!
//! let mut archive = Archive::open(Cursor::new(bytes))?;
//! assert_eq!(archive.names(), ["etc", "etc/hostname"]);
//! assert_eq!(archive.read_member("etc/hostname")?, b"box\n");
//! # Ok::<(), cpioarc::Error>(())
//! ```

mod extract;
mod info;
mod query;
mod scan;
mod write;

pub use info::{ArchiveInfo, ExtractResult};

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom};
use std::path::Path;

use crate::format::{ByteOrder, Format};
use crate::member::MemberReader;
use crate::options::{AccessMode, OldAsciiPadding, ReadOptions, WriteOptions};
use crate::{Error, Member, Result};

/// Runs when a writable archive is closed.
type Finalizer<S> = fn(&mut Archive<S>) -> Result<()>;

/// A cpio archive bound to a stream.
///
/// Dropping an archive opened for writing without calling
/// [`close`](Archive::close) or [`finish`](Archive::finish) leaves the stream
/// without a trailer record; a warning is logged when that happens.
pub struct Archive<S> {
    stream: Option<S>,
    mode: AccessMode,
    format: Format,
    byte_order: ByteOrder,
    old_ascii_padding: OldAsciiPadding,
    members: Vec<Member>,
    info: ArchiveInfo,
    /// Stream offset of the first record.
    start: u64,
    finalize: Option<Finalizer<S>>,
}

impl Archive<BufReader<File>> {
    /// Opens an archive from a file path for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the catalog cannot
    /// be scanned.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(Error::Io)?;
        Self::open(BufReader::new(file))
    }
}

impl Archive<BufWriter<File>> {
    /// Creates (or truncates) a file and opens it as an empty archive for writing.
    pub fn create_path(path: impl AsRef<Path>, options: WriteOptions) -> Result<Self> {
        let file = File::create(path.as_ref()).map_err(Error::Io)?;
        Self::create(BufWriter::new(file), options)
    }
}

impl Archive<File> {
    /// Opens a file path in the given access mode.
    ///
    /// In read mode `format`, when given, is required of every record. In
    /// write mode it selects the header format, defaulting to `newc`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use cpioarc::{AccessMode, Archive};
    ///
    /// let mode: AccessMode = "rb".parse()?;
    /// let archive = Archive::open_path_mode("initramfs.cpio", mode, None)?;
    /// println!("{} members", archive.len());
    /// # Ok::<(), cpioarc::Error>(())
    /// ```
    pub fn open_path_mode(
        path: impl AsRef<Path>,
        mode: AccessMode,
        format: Option<Format>,
    ) -> Result<Self> {
        let path = path.as_ref();
        match mode {
            AccessMode::Read => {
                let file = File::open(path).map_err(Error::Io)?;
                let options = ReadOptions {
                    format,
                    ..ReadOptions::default()
                };
                Self::open_with(file, options)
            }
            AccessMode::Write => {
                let file = File::create(path).map_err(Error::Io)?;
                let options = WriteOptions {
                    format: format.unwrap_or_default(),
                    ..WriteOptions::default()
                };
                Self::create(file, options)
            }
        }
    }
}

impl<S: Read + Seek> Archive<S> {
    /// Opens an archive for reading with default options.
    ///
    /// The catalog starts at the stream's current position.
    pub fn open(stream: S) -> Result<Self> {
        Self::open_with(stream, ReadOptions::default())
    }

    /// Opens an archive for reading with custom options.
    ///
    /// # Errors
    ///
    /// Any scan failure aborts the open: unrecognized magics, format
    /// mismatches, corrupt or incomplete headers, truncated data and (unless
    /// disabled) checksum mismatches.
    pub fn open_with(mut stream: S, options: ReadOptions) -> Result<Self> {
        let catalog = scan::scan(&mut stream, &options)?;
        log::debug!(
            "opened {} archive: {} members, {} bytes",
            catalog.info.format,
            catalog.info.member_count,
            catalog.info.archive_size
        );
        Ok(Self {
            stream: Some(stream),
            mode: AccessMode::Read,
            format: catalog.info.format,
            byte_order: catalog.info.byte_order,
            old_ascii_padding: options.old_ascii_padding,
            members: catalog.members,
            info: catalog.info,
            start: catalog.start,
            finalize: None,
        })
    }

    /// Returns a reader over the data of the named member.
    ///
    /// The reader continues from the member's saved position; seek it to
    /// the start to read the data again.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] after [`close`](Archive::close) and
    /// [`Error::EntryNotFound`] for unknown names.
    pub fn member_reader(&mut self, name: &str) -> Result<MemberReader<'_, S>> {
        let stream = self.stream.as_mut().ok_or(Error::Closed)?;
        let member = self
            .members
            .iter_mut()
            .find(|m| m.name() == name)
            .ok_or_else(|| Error::EntryNotFound {
                name: name.to_string(),
            })?;
        Ok(MemberReader::new(stream, member))
    }

    /// Reads the whole data of the named member.
    pub fn read_member(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut reader = self.member_reader(name)?;
        reader.seek(SeekFrom::Start(0))?;
        let mut data = Vec::with_capacity(usize::try_from(reader.remaining()).unwrap_or(0));
        reader.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl<S> Archive<S> {
    /// Closes the archive and releases the stream.
    ///
    /// A writable archive emits its catalog followed by the trailer record
    /// first. Closing twice is a no-op. Queries keep working on a closed
    /// archive; stream operations fail with [`Error::Closed`].
    pub fn close(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }
        if let Some(finalize) = self.finalize {
            finalize(self)?;
        }
        self.stream = None;
        Ok(())
    }

    /// Returns true once the archive has been closed.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Returns the access mode.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Returns the header format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the byte order of old binary headers.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Fails unless the archive is open in `mode`.
    fn require(&self, mode: AccessMode, operation: &'static str) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::Closed);
        }
        if self.mode != mode {
            return Err(Error::WrongMode {
                operation,
                mode: self.mode,
            });
        }
        Ok(())
    }
}

impl<S> fmt::Debug for Archive<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("mode", &self.mode)
            .field("format", &self.format)
            .field("byte_order", &self.byte_order)
            .field("members", &self.members.len())
            .field("start", &self.start)
            .field("closed", &self.stream.is_none())
            .finish()
    }
}

impl<S> Drop for Archive<S> {
    fn drop(&mut self) {
        if self.mode == AccessMode::Write && self.stream.is_some() {
            log::warn!(
                "cpio archive with {} members dropped without close(); the trailer was not written",
                self.members.len()
            );
        }
    }
}

/// Header and data alignment moduli of `format`.
pub(crate) fn alignment(format: Format, padding: OldAsciiPadding) -> (u64, u64) {
    match format {
        Format::OldAscii => (padding.modulus(), padding.modulus()),
        _ => {
            let layout = format.layout();
            (layout.header_modulus, layout.data_modulus)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_alignment() {
        assert_eq!(alignment(Format::NewAscii, OldAsciiPadding::Unpadded), (4, 4));
        assert_eq!(alignment(Format::NewCrc, OldAsciiPadding::FourByte), (4, 4));
        assert_eq!(alignment(Format::OldBinary, OldAsciiPadding::Unpadded), (2, 2));
        assert_eq!(alignment(Format::OldAscii, OldAsciiPadding::Unpadded), (1, 1));
        assert_eq!(alignment(Format::OldAscii, OldAsciiPadding::FourByte), (4, 4));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut archive = Archive::create(Cursor::new(Vec::new()), WriteOptions::default()).unwrap();
        archive.append(Member::file("a", b"1".to_vec()).unwrap()).unwrap();
        archive.close().unwrap();
        assert!(archive.is_closed());
        archive.close().unwrap();
        assert_eq!(archive.names(), ["a"]);
        assert!(matches!(archive.flush(), Err(Error::Closed)));
    }

    #[test]
    fn test_reader_on_closed_archive() {
        let mut archive = Archive::open(Cursor::new(Vec::<u8>::new())).unwrap();
        archive.close().unwrap();
        assert!(matches!(archive.member_reader("x"), Err(Error::Closed)));
    }

    #[test]
    fn test_open_path_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.cpio");

        let mut archive =
            Archive::open_path_mode(&path, AccessMode::Write, Some(Format::OldAscii)).unwrap();
        archive.append(Member::file("x", b"xyz".to_vec()).unwrap()).unwrap();
        archive.close().unwrap();

        let mut archive =
            Archive::open_path_mode(&path, "rb".parse().unwrap(), None).unwrap();
        assert_eq!(archive.format(), Format::OldAscii);
        assert_eq!(archive.mode(), AccessMode::Read);
        assert_eq!(archive.read_member("x").unwrap(), b"xyz");

        let err =
            Archive::open_path_mode(&path, AccessMode::Read, Some(Format::NewAscii)).unwrap_err();
        assert!(err.is_format_error());
    }
}
