//! Catalog scanning.
//!
//! The scan walks the records from the stream's current position to the
//! trailer, recording one [`Member`] per record with the stream offset of its
//! data. Data is skipped, not read, unless its checksum has to be verified.
//!
//! An empty stream is an empty archive and zero padding where a record was
//! expected ends the scan quietly. A stream that simply stops after a record
//! is a truncated archive.

use std::io::{self, Read, Seek, SeekFrom};

use super::{ArchiveInfo, alignment};
use crate::checksum::ByteSumReader;
use crate::format::detect::detect_magic;
use crate::format::header::RawHeader;
use crate::format::mode::FileType;
use crate::format::{ByteOrder, Format, MAGIC_PROBE_LEN, TRAILER_NAME, pad_len};
use crate::hardlink::resolve_hardlinks;
use crate::options::{DotEntryPolicy, ReadOptions};
use crate::{Error, Member, Result};

/// Outcome of a scan.
#[derive(Debug)]
pub(crate) struct Catalog {
    pub members: Vec<Member>,
    pub info: ArchiveInfo,
    pub start: u64,
}

/// Scans the catalog starting at the stream's current position.
pub(crate) fn scan<S: Read + Seek>(stream: &mut S, options: &ReadOptions) -> Result<Catalog> {
    let start = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?.max(start);
    stream.seek(SeekFrom::Start(start))?;

    let mut members = Vec::new();
    let mut archive_format: Option<(Format, ByteOrder)> = None;
    let mut total_size = 0u64;
    let mut trailer_found = false;
    let mut offset = start;

    loop {
        let mut probe = [0u8; MAGIC_PROBE_LEN];
        let got = read_up_to(stream, &mut probe)?;
        if got == 0 {
            if offset == start {
                log::debug!("empty stream at offset {offset:#x}");
                break;
            }
            return Err(Error::MissingTrailer { offset });
        }
        if probe[..got].iter().all(|&b| b == 0) {
            log::debug!("zero padding at offset {offset:#x} ends the archive");
            break;
        }

        let (format, byte_order) = identify(&probe, got, offset)?;
        if let Some(expected) = options.format.or(archive_format.map(|(f, _)| f)) {
            if expected != format {
                return Err(Error::FormatMismatch {
                    offset,
                    expected,
                    found: format,
                });
            }
        }
        archive_format.get_or_insert((format, byte_order));

        let header_size = format.header_size();
        let mut header_bytes = vec![0u8; header_size];
        header_bytes[..got].copy_from_slice(&probe[..got]);
        let filled = got + read_up_to(stream, &mut header_bytes[got..])?;
        let header = RawHeader::decode(format, byte_order, &header_bytes[..filled], offset)?;

        let (header_modulus, data_modulus) = alignment(format, options.old_ascii_padding);
        let name = read_name(stream, &header, offset, end)?;
        let name_end = offset + header_size as u64 + header.namesize;
        let name_pad = pad_len(header_size as u64 + header.namesize, header_modulus);
        log::trace!("{name}: {name_pad} bytes of name padding");
        let data_offset = (name_end + name_pad).min(end);

        let data_end = data_offset.saturating_add(header.filesize);
        if data_end > end {
            return Err(Error::TruncatedData { name, offset });
        }
        let next = data_end
            .saturating_add(pad_len(header.filesize, data_modulus))
            .min(end);

        if name == TRAILER_NAME {
            trailer_found = true;
            offset = next;
            break;
        }

        if is_dot_entry(&name) && options.dot_entries == DotEntryPolicy::Discard {
            log::trace!("discarding dot entry {name:?} at offset {offset:#x}");
            stream.seek(SeekFrom::Start(next))?;
            offset = next;
            continue;
        }

        if format.has_checksum()
            && options.verify_checksums
            && FileType::from_mode(header.mode) == FileType::Regular
        {
            stream.seek(SeekFrom::Start(data_offset))?;
            let mut reader = ByteSumReader::new(stream.by_ref().take(header.filesize));
            io::copy(&mut reader, &mut io::sink())?;
            let actual = reader.checksum();
            if actual != header.check {
                return Err(Error::checksum_mismatch(name, offset, header.check, actual));
            }
        }

        log::debug!(
            "{name}: mode {:o}, {} bytes at offset {data_offset:#x}",
            header.mode,
            header.filesize
        );
        total_size += header.filesize;
        members.push(Member::from_header(&header, name, data_offset));

        stream.seek(SeekFrom::Start(next))?;
        offset = next;
    }

    let hardlinks_resolved = if options.resolve_hardlinks {
        resolve_hardlinks(&mut members)
    } else {
        0
    };

    let (format, byte_order) = archive_format.unwrap_or((
        options.format.unwrap_or_default(),
        ByteOrder::default(),
    ));
    let info = ArchiveInfo {
        format,
        byte_order,
        member_count: members.len(),
        total_size,
        archive_size: offset - start,
        trailer_found,
        hardlinks_resolved,
    };
    log::debug!(
        "scanned {} members, trailer {}, {hardlinks_resolved} hardlinks resolved",
        info.member_count,
        if trailer_found { "found" } else { "missing" }
    );

    Ok(Catalog {
        members,
        info,
        start,
    })
}

/// Maps the leading bytes of a record to its format.
fn identify(probe: &[u8; MAGIC_PROBE_LEN], got: usize, offset: u64) -> Result<(Format, ByteOrder)> {
    if let Some(found) = detect_magic(&probe[..got]) {
        return Ok(found);
    }
    let is_cut_magic = Format::ALL
        .iter()
        .filter_map(|f| f.ascii_magic())
        .any(|magic| magic.starts_with(&probe[..got]));
    if got < MAGIC_PROBE_LEN && is_cut_magic {
        return Err(Error::IncompleteHeader {
            offset,
            expected: MAGIC_PROBE_LEN,
            found: got,
        });
    }
    Err(Error::UnsupportedFormat {
        offset,
        magic: *probe,
    })
}

/// Reads the name following a header, cut at its first NUL.
fn read_name<S: Read>(stream: &mut S, header: &RawHeader, offset: u64, end: u64) -> Result<String> {
    if header.namesize == 0 {
        return Err(Error::corrupt_header(offset, "name size is zero"));
    }
    let name_start = offset + header.format.header_size() as u64;
    if name_start.saturating_add(header.namesize) > end {
        return Err(Error::TruncatedData {
            name: String::new(),
            offset,
        });
    }

    // Bounded by the stream length checked above.
    let namesize = usize::try_from(header.namesize)
        .map_err(|_| Error::corrupt_header(offset, "name size exceeds address space"))?;
    let mut raw = vec![0u8; namesize];
    stream.read_exact(&mut raw)?;
    if let Some(nul) = raw.iter().position(|&b| b == 0) {
        raw.truncate(nul);
    }
    String::from_utf8(raw).map_err(|_| Error::corrupt_header(offset, "member name is not valid UTF-8"))
}

fn is_dot_entry(name: &str) -> bool {
    name == "." || name == ".."
}

/// Reads until `buf` is full or the stream ends; returns the bytes read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn newc_record(name: &str, mode: u32, data: &[u8], check: u32) -> Vec<u8> {
        let header = RawHeader {
            format: Format::NewCrc,
            mode,
            nlink: 1,
            filesize: data.len() as u64,
            namesize: name.len() as u64 + 1,
            check,
            ..RawHeader::default()
        };
        let mut out = header.encode(name).unwrap();
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.resize(out.len() + pad_len(out.len() as u64, 4) as usize, 0);
        out.extend_from_slice(data);
        out.resize(out.len() + pad_len(data.len() as u64, 4) as usize, 0);
        out
    }

    fn trailer() -> Vec<u8> {
        newc_record(TRAILER_NAME, 0, b"", 0)
    }

    #[test]
    fn test_scan_records_offsets() {
        let mut bytes = newc_record("a", 0o100644, b"hello\n", 0x21e);
        bytes.extend(newc_record("b", 0o040755, b"", 0));
        bytes.extend(trailer());

        let catalog = scan(&mut Cursor::new(bytes), &ReadOptions::default()).unwrap();
        assert_eq!(catalog.members.len(), 2);
        assert_eq!(catalog.members[0].name(), "a");
        assert_eq!(catalog.members[0].data_offset(), Some(112));
        assert_eq!(catalog.members[0].checksum(), 0x21e);
        assert!(catalog.members[1].is_dir());
        assert!(catalog.info.trailer_found);
        assert_eq!(catalog.info.format, Format::NewCrc);
        assert_eq!(catalog.info.total_size, 6);
    }

    #[test]
    fn test_scan_starts_at_stream_position() {
        let mut bytes = b"junk".to_vec();
        bytes.extend(newc_record("a", 0o100644, b"x", u32::from(b'x')));
        bytes.extend(trailer());
        let mut stream = Cursor::new(bytes);
        stream.set_position(4);

        let catalog = scan(&mut stream, &ReadOptions::default()).unwrap();
        assert_eq!(catalog.start, 4);
        assert_eq!(catalog.members[0].data_offset(), Some(4 + 112));
    }

    #[test]
    fn test_checksum_verification_can_be_disabled() {
        let mut bytes = newc_record("a", 0o100644, b"hello\n", 0x21f);
        bytes.extend(trailer());

        let err = scan(&mut Cursor::new(bytes.clone()), &ReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::ChecksumMismatch { ref name, expected: 0x21f, actual: 0x21e, .. } if name == "a"
        ));

        let options = ReadOptions::new().verify_checksums(false);
        assert_eq!(scan(&mut Cursor::new(bytes), &options).unwrap().members.len(), 1);
    }

    #[test]
    fn test_dot_entries_follow_policy() {
        let mut bytes = newc_record(".", 0o040755, b"", 0);
        bytes.extend(newc_record("a", 0o100644, b"", 0));
        bytes.extend(trailer());

        let catalog = scan(&mut Cursor::new(bytes.clone()), &ReadOptions::default()).unwrap();
        assert_eq!(catalog.members.len(), 1);

        let options = ReadOptions::new().dot_entries(DotEntryPolicy::Keep);
        let catalog = scan(&mut Cursor::new(bytes), &options).unwrap();
        assert_eq!(catalog.members[0].name(), ".");
    }

    #[test]
    fn test_cut_magic_is_incomplete() {
        let err = scan(&mut Cursor::new(b"0707".to_vec()), &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::IncompleteHeader { expected: 6, found: 4, .. }));

        let err = scan(&mut Cursor::new(b"zip".to_vec()), &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { offset: 0, .. }));
    }

    #[test]
    fn test_stream_ending_before_trailer() {
        let mut bytes = newc_record("a", 0o100644, b"hello\n", 0x21e);
        let cut = bytes.len() as u64;
        bytes.extend(newc_record("b", 0o100644, b"", 0));
        bytes.extend(trailer());
        bytes.truncate(cut as usize);

        let err = scan(&mut Cursor::new(bytes), &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MissingTrailer { offset } if offset == cut));
        assert!(err.is_header_error());

        let catalog = scan(&mut Cursor::new(Vec::new()), &ReadOptions::default()).unwrap();
        assert!(catalog.members.is_empty());
    }

    #[test]
    fn test_checksum_only_kept_for_crc_files() {
        let mut bytes = newc_record("d", 0o040755, b"", 0xdead);
        bytes.extend(trailer());
        let catalog = scan(&mut Cursor::new(bytes), &ReadOptions::default()).unwrap();
        assert_eq!(catalog.members[0].checksum(), 0);
    }

    #[test]
    fn test_zero_name_size_is_corrupt() {
        let header = RawHeader {
            format: Format::NewAscii,
            ..RawHeader::default()
        };
        let bytes = header.encode("").unwrap();
        let err = scan(&mut Cursor::new(bytes), &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { offset: 0, .. }));
    }
}
