//! Building and emitting archives.
//!
//! Members are collected in memory. Every flush rewrites the whole catalog
//! from the archive's start offset, sorted by name so that directories
//! precede their contents; closing appends the trailer record.

use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use super::{Archive, ArchiveInfo, Finalizer, alignment};
use crate::checksum::checksum32;
use crate::format::header::RawHeader;
use crate::format::{ByteOrder, Format, TRAILER_NAME, pad_len};
use crate::member::{MemberData, validate_name};
use crate::options::{AccessMode, MemberAmend, OldAsciiPadding, WriteOptions};
use crate::{Error, Member, Result};

/// NUL bytes for name and data alignment; no modulus exceeds four.
const PADDING: [u8; 4] = [0; 4];

impl<S: Write + Seek> Archive<S> {
    /// Opens an empty archive for writing.
    ///
    /// Records are written starting at the stream's current position.
    pub fn create(mut stream: S, options: WriteOptions) -> Result<Self> {
        let start = stream.stream_position()?;
        log::debug!(
            "creating {} archive at offset {start:#x}",
            options.format
        );
        Ok(Self {
            stream: Some(stream),
            mode: AccessMode::Write,
            format: options.format,
            byte_order: options.byte_order,
            old_ascii_padding: options.old_ascii_padding,
            members: Vec::new(),
            info: ArchiveInfo {
                format: options.format,
                byte_order: options.byte_order,
                ..ArchiveInfo::default()
            },
            start,
            finalize: Some(Self::write_final as Finalizer<S>),
        })
    }

    /// Writes the catalog, without a trailer, and flushes the stream.
    ///
    /// On an archive opened for reading this only flushes the stream.
    pub fn flush(&mut self) -> Result<()> {
        if self.mode == AccessMode::Write {
            return self.write_catalog(false);
        }
        let stream = self.stream.as_mut().ok_or(Error::Closed)?;
        stream.flush().map_err(Error::Io)
    }

    /// Closes the archive and returns the stream.
    ///
    /// A writable archive emits its catalog and trailer first.
    pub fn finish(mut self) -> Result<S> {
        if self.stream.is_none() {
            return Err(Error::Closed);
        }
        if self.mode == AccessMode::Write {
            self.write_catalog(true)?;
        }
        self.stream.take().ok_or(Error::Closed)
    }

    fn write_final(&mut self) -> Result<()> {
        self.write_catalog(true)
    }

    fn write_catalog(&mut self, trailer: bool) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::Closed)?;
        stream.seek(SeekFrom::Start(self.start))?;
        self.members.sort_by(|a, b| a.name().cmp(b.name()));

        let record = RecordWriter::new(self.format, self.byte_order, self.old_ascii_padding);
        let mut written = 0u64;
        for member in &mut self.members {
            written += record.write_member(stream, member)?;
        }
        if trailer {
            written += record.write_trailer(stream)?;
        }
        stream.flush()?;

        self.info.member_count = self.members.len();
        self.info.archive_size = written;
        self.info.trailer_found = trailer;
        log::debug!(
            "wrote {} members ({written} bytes) in {} format{}",
            self.members.len(),
            self.format,
            if trailer { " with trailer" } else { "" }
        );
        Ok(())
    }
}

impl<S> Archive<S> {
    /// Adds a member built in memory.
    ///
    /// # Errors
    ///
    /// - [`Error::WrongMode`] on an archive opened for reading
    /// - [`Error::EntryExists`] if the name is already taken
    /// - [`Error::UnsupportedFeature`] for members scanned from another
    ///   archive, whose data is not held in memory
    pub fn append(&mut self, member: Member) -> Result<()> {
        self.require(AccessMode::Write, "append to")?;
        if matches!(member.data, MemberData::Stream { .. }) {
            return Err(Error::UnsupportedFeature {
                feature: "appending members scanned from another archive",
            });
        }
        validate_name(member.name())?;
        if self.contains(member.name()) {
            return Err(Error::EntryExists {
                name: member.name().to_string(),
            });
        }

        log::debug!("{}: added, {} bytes", member.name(), member.size());
        self.info.member_count += 1;
        self.info.total_size += member.size();
        self.members.push(member);
        Ok(())
    }

    /// Adds a file system object under its path as the member name.
    ///
    /// Symbolic links are stored as links, not followed.
    pub fn insert_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let name = path
            .to_str()
            .ok_or_else(|| Error::invalid_name(path.to_string_lossy(), "path is not valid UTF-8"))?;
        self.insert_path_as(path, name, &MemberAmend::default())
    }

    /// Adds a file system object under `name`, applying `amend`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::io::Cursor;
    /// use cpioarc::{Archive, MemberAmend, WriteOptions};
    ///
    /// let mut archive = Archive::create(Cursor::new(Vec::new()), WriteOptions::default())?;
    /// let root = MemberAmend::new().uid(0).gid(0);
    /// archive.insert_path_as("build/init", "init", &root.mode(0o755))?;
    /// archive.close()?;
    /// # Ok::<(), cpioarc::Error>(())
    /// ```
    pub fn insert_path_as(
        &mut self,
        path: impl AsRef<Path>,
        name: impl Into<String>,
        amend: &MemberAmend,
    ) -> Result<()> {
        self.require(AccessMode::Write, "insert into")?;
        let name = name.into();
        validate_name(&name)?;
        if self.contains(&name) {
            return Err(Error::EntryExists { name });
        }
        let member = Member::from_path(path, name)?.with_amend(amend);
        self.append(member)
    }

    /// Changes the header format of a writable archive.
    ///
    /// # Errors
    ///
    /// [`Error::FormatFrozen`] once members have been added.
    pub fn set_format(&mut self, format: Format) -> Result<()> {
        self.require(AccessMode::Write, "change the format of")?;
        if !self.members.is_empty() {
            return Err(Error::FormatFrozen {
                format: self.format,
            });
        }
        self.format = format;
        self.info.format = format;
        Ok(())
    }

    /// Changes the byte order of old binary headers.
    ///
    /// # Errors
    ///
    /// [`Error::FormatFrozen`] once members have been added.
    pub fn set_byte_order(&mut self, byte_order: ByteOrder) -> Result<()> {
        self.require(AccessMode::Write, "change the byte order of")?;
        if !self.members.is_empty() {
            return Err(Error::FormatFrozen {
                format: self.format,
            });
        }
        self.byte_order = byte_order;
        self.info.byte_order = byte_order;
        Ok(())
    }
}

/// Writes records of one format.
struct RecordWriter {
    format: Format,
    byte_order: ByteOrder,
    header_modulus: u64,
    data_modulus: u64,
}

impl RecordWriter {
    fn new(format: Format, byte_order: ByteOrder, padding: OldAsciiPadding) -> Self {
        let (header_modulus, data_modulus) = alignment(format, padding);
        Self {
            format,
            byte_order,
            header_modulus,
            data_modulus,
        }
    }

    /// Writes one member and returns the number of bytes written.
    fn write_member<W: Write>(&self, out: &mut W, member: &mut Member) -> Result<u64> {
        if self.format.has_checksum() && member.is_file() {
            let checksum = member.data().map(checksum32).unwrap_or(0);
            member.set_checksum(checksum);
        }
        let header = member.to_header(self.format, self.byte_order);
        let data = member.data().ok_or(Error::UnsupportedFeature {
            feature: "writing members scanned from another archive",
        })?;
        self.write_record(out, &header, member.name(), data)
    }

    fn write_trailer<W: Write>(&self, out: &mut W) -> Result<u64> {
        let header = RawHeader {
            format: self.format,
            byte_order: self.byte_order,
            nlink: 1,
            namesize: TRAILER_NAME.len() as u64 + 1,
            ..RawHeader::default()
        };
        self.write_record(out, &header, TRAILER_NAME, &[])
    }

    fn write_record<W: Write>(
        &self,
        out: &mut W,
        header: &RawHeader,
        name: &str,
        data: &[u8],
    ) -> Result<u64> {
        let encoded = header.encode(name)?;
        let name_len = encoded.len() as u64 + header.namesize;
        let name_pad = pad_len(name_len, self.header_modulus);
        let data_pad = pad_len(data.len() as u64, self.data_modulus);
        log::trace!("{name}: name padding {name_pad}, data padding {data_pad}");

        out.write_all(&encoded)?;
        out.write_all(name.as_bytes())?;
        out.write_all(&[0])?;
        // Both pads are below the modulus, which is at most four.
        out.write_all(&PADDING[..name_pad as usize])?;
        out.write_all(data)?;
        out.write_all(&PADDING[..data_pad as usize])?;

        Ok(name_len + name_pad + data.len() as u64 + data_pad)
    }
}
