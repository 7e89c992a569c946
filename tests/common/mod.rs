//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Cursor;

use cpioarc::format::header::RawHeader;
use cpioarc::format::{ByteOrder, Format, TRAILER_NAME, pad_len};
use cpioarc::{Archive, Member, WriteOptions};

/// Creates an in-memory archive holding regular files.
///
/// # Example
///
/// ```ignore
/// let bytes = create_archive(Format::NewCrc, &[("a.txt", b"hello" as &[u8])]).unwrap();
/// ```
pub fn create_archive(format: Format, entries: &[(&str, &[u8])]) -> cpioarc::Result<Vec<u8>> {
    create_archive_with_options(WriteOptions::new().format(format), entries)
}

/// Creates an in-memory archive holding regular files with custom options.
pub fn create_archive_with_options(
    options: WriteOptions,
    entries: &[(&str, &[u8])],
) -> cpioarc::Result<Vec<u8>> {
    let members = entries
        .iter()
        .map(|(name, data)| Member::file(*name, data.to_vec()))
        .collect::<cpioarc::Result<Vec<_>>>()?;
    create_archive_from_members(options, members)
}

/// Creates an in-memory archive from prepared members.
pub fn create_archive_from_members(
    options: WriteOptions,
    members: Vec<Member>,
) -> cpioarc::Result<Vec<u8>> {
    let mut archive = Archive::create(Cursor::new(Vec::new()), options)?;
    for member in members {
        archive.append(member)?;
    }
    Ok(archive.finish()?.into_inner())
}

/// Builds the header of a regular file record for hand-crafted archives.
///
/// `namesize` and `filesize` are derived from `name` and `data`.
pub fn header(format: Format, byte_order: ByteOrder, name: &str, data: &[u8]) -> RawHeader {
    RawHeader {
        format,
        byte_order,
        mode: 0o100644,
        nlink: 1,
        filesize: data.len() as u64,
        namesize: name.len() as u64 + 1,
        ..RawHeader::default()
    }
}

/// Encodes one record from a header, its name and data, padded to `modulus`.
///
/// The header's `filesize` and `namesize` are written as given, which makes
/// it possible to craft records that disagree with their contents.
pub fn raw_record(header: &RawHeader, name: &[u8], data: &[u8], modulus: u64) -> Vec<u8> {
    let mut out = header.encode("test").unwrap();
    out.extend_from_slice(name);
    out.push(0);
    let name_pad = pad_len(out.len() as u64, modulus) as usize;
    out.resize(out.len() + name_pad, 0);
    out.extend_from_slice(data);
    let data_pad = pad_len(data.len() as u64, modulus) as usize;
    out.resize(out.len() + data_pad, 0);
    out
}

/// Encodes a trailer record.
pub fn trailer(format: Format, byte_order: ByteOrder, modulus: u64) -> Vec<u8> {
    let mut header = header(format, byte_order, TRAILER_NAME, b"");
    header.mode = 0;
    raw_record(&header, TRAILER_NAME.as_bytes(), b"", modulus)
}

/// Extracts the error from a Result, panicking if it's Ok.
///
/// Useful where the Ok type is not `Debug`, so `unwrap_err()` is unavailable.
///
/// # Panics
///
/// Panics if the result is `Ok(_)`.
pub fn expect_err<T, E>(result: Result<T, E>) -> E {
    match result {
        Ok(_) => panic!("expected an error, got Ok"),
        Err(e) => e,
    }
}
