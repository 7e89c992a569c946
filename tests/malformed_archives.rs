//! Tests for malformed and corrupted archive handling.
//!
//! These tests verify that cpioarc correctly detects and reports errors
//! when scanning malformed, corrupted, or truncated archives, and that the
//! tolerated irregularities (zero padding, missing trailer) still open.

mod common;

use std::io::Cursor;

use cpioarc::format::{ByteOrder, Format, pad_len};
use cpioarc::{Archive, Error, ReadOptions};

use common::{expect_err, header, raw_record, trailer};

fn open(bytes: Vec<u8>) -> cpioarc::Result<Archive<Cursor<Vec<u8>>>> {
    Archive::open(Cursor::new(bytes))
}

#[test]
fn test_empty_stream_is_empty_archive() {
    let archive = open(Vec::new()).unwrap();
    assert!(archive.is_empty());
    assert!(!archive.info().trailer_found);
    assert_eq!(archive.info().archive_size, 0);
}

#[test]
fn test_unknown_magic_is_unsupported() {
    let err = expect_err(open(b"PK\x03\x04 definitely not cpio".to_vec()));
    assert!(matches!(
        err,
        Error::UnsupportedFormat { offset: 0, magic } if &magic == b"PK\x03\x04 d"
    ));
    assert!(err.is_format_error());
    assert!(err.is_header_error());
}

#[test]
fn test_garbage_after_record_is_unsupported() {
    let mut bytes = common::create_archive(Format::NewAscii, &[("a", b"1")]).unwrap();
    // Drop the trailer and append junk where the next record should start.
    bytes.truncate(116);
    bytes.extend_from_slice(b"garbage");
    let err = expect_err(open(bytes));
    assert_eq!(err.offset(), Some(116));
    assert!(matches!(err, Error::UnsupportedFormat { .. }));
}

#[test]
fn test_zero_padding_ends_scan() {
    let mut bytes = raw_record(&header(Format::NewAscii, ByteOrder::Little, "a", b"x"), b"a", b"x", 4);
    bytes.extend_from_slice(&[0u8; 512]);

    let archive = open(bytes).unwrap();
    assert_eq!(archive.names(), ["a"]);
    assert!(!archive.info().trailer_found);
}

#[test]
fn test_block_padding_after_trailer_is_ignored() {
    let mut bytes = common::create_archive(Format::NewAscii, &[("a", b"abc")]).unwrap();
    let used = bytes.len();
    bytes.resize(512, 0);

    let archive = open(bytes).unwrap();
    assert!(archive.info().trailer_found);
    assert_eq!(archive.info().archive_size, used as u64);
}

#[test]
fn test_missing_trailer_is_header_error() {
    let bytes = raw_record(&header(Format::OldAscii, ByteOrder::Little, "a", b"abc"), b"a", b"abc", 1);
    let end = bytes.len() as u64;
    let err = expect_err(open(bytes));
    assert!(matches!(err, Error::MissingTrailer { offset } if offset == end));
    assert!(err.is_header_error());
    assert!(!err.is_format_error());
}

#[test]
fn test_crc_corruption_detected_but_newc_ignores() {
    let data = b"hello\n";
    for (format, magic) in [(Format::NewCrc, b"070702"), (Format::NewAscii, b"070701")] {
        let mut record_header = header(format, ByteOrder::Little, "f", data);
        record_header.check = 0x21e;
        let mut bytes = raw_record(&record_header, b"f", data, 4);
        bytes.extend(trailer(format, ByteOrder::Little, 4));
        assert_eq!(&bytes[..6], magic);

        // Flip one data bit.
        bytes[112] ^= 0x01;
        let result = open(bytes);
        if format == Format::NewCrc {
            let err = expect_err(result);
            assert!(err.is_checksum_error());
            assert_eq!(err.entry_name(), Some("f"));
            assert!(matches!(
                err,
                Error::ChecksumMismatch { expected: 0x21e, actual: 0x21f, offset: 0, .. }
            ));
        } else {
            assert!(result.is_ok());
        }
    }
}

#[test]
fn test_checksum_not_verified_for_directories() {
    let mut dir = header(Format::NewCrc, ByteOrder::Little, "d", b"");
    dir.mode = 0o040755;
    dir.check = 0xdead;
    let mut bytes = raw_record(&dir, b"d", b"", 4);
    bytes.extend(trailer(Format::NewCrc, ByteOrder::Little, 4));

    let archive = open(bytes).unwrap();
    assert_eq!(archive.member("d").unwrap().checksum(), 0);
}

#[test]
fn test_truncated_data() {
    let bytes = common::create_archive(Format::NewAscii, &[("big", &[7u8; 100])]).unwrap();
    let cut = bytes[..150].to_vec();

    let err = expect_err(open(cut));
    assert!(matches!(err, Error::TruncatedData { ref name, offset: 0 } if name == "big"));
    assert!(err.is_header_error());
}

#[test]
fn test_truncated_name() {
    let bytes = common::create_archive(Format::NewAscii, &[("a-long-name", b"")]).unwrap();
    let err = expect_err(open(bytes[..115].to_vec()));
    assert!(matches!(err, Error::TruncatedData { ref name, .. } if name.is_empty()));
}

#[test]
fn test_truncated_header() {
    for format in Format::ALL {
        let bytes = common::create_archive(format, &[("a", b"")]).unwrap();
        let err = expect_err(open(bytes[..20].to_vec()));
        assert!(
            matches!(err, Error::IncompleteHeader { offset: 0, found: 20, .. }),
            "{format}: {err}"
        );
    }
}

#[test]
fn test_non_numeric_field_is_corrupt() {
    let mut bytes = common::create_archive(Format::NewAscii, &[("a", b"")]).unwrap();
    // First digit of the mode field.
    bytes[14] = b'z';
    let err = expect_err(open(bytes));
    assert!(matches!(err, Error::CorruptHeader { offset: 0, .. }));

    let mut bytes = common::create_archive(Format::OldAscii, &[("a", b"")]).unwrap();
    // An octal field holding the digit 9.
    bytes[18] = b'9';
    assert!(matches!(expect_err(open(bytes)), Error::CorruptHeader { .. }));
}

#[test]
fn test_non_utf8_name_is_corrupt() {
    let record_header = header(Format::NewAscii, ByteOrder::Little, "xx", b"");
    let mut bytes = raw_record(&record_header, &[0xff, 0xfe], b"", 4);
    bytes.extend(trailer(Format::NewAscii, ByteOrder::Little, 4));
    assert!(matches!(expect_err(open(bytes)), Error::CorruptHeader { .. }));
}

#[test]
fn test_mixed_formats_rejected() {
    let mut bytes = raw_record(&header(Format::NewAscii, ByteOrder::Little, "a", b""), b"a", b"", 4);
    let second_offset = bytes.len() as u64;
    bytes.extend(raw_record(&header(Format::OldAscii, ByteOrder::Little, "b", b""), b"b", b"", 1));

    let err = expect_err(open(bytes));
    assert!(matches!(
        err,
        Error::FormatMismatch { expected: Format::NewAscii, found: Format::OldAscii, offset }
            if offset == second_offset
    ));
    assert!(err.is_format_error());
}

#[test]
fn test_format_hint_enforced() {
    let bytes = common::create_archive(Format::NewCrc, &[("a", b"")]).unwrap();

    let options = ReadOptions::new().format(Format::NewAscii);
    let err = expect_err(Archive::open_with(Cursor::new(bytes.clone()), options));
    assert!(matches!(err, Error::FormatMismatch { found: Format::NewCrc, .. }));

    let options = ReadOptions::new().format(Format::NewCrc);
    assert!(Archive::open_with(Cursor::new(bytes), options).is_ok());
}

#[test]
fn test_old_binary_byte_order_detected_per_archive() {
    for byte_order in [ByteOrder::Little, ByteOrder::Big] {
        let record_header = header(Format::OldBinary, byte_order, "a", b"ab");
        let mut bytes = raw_record(&record_header, b"a", b"ab", 2);
        bytes.extend(trailer(Format::OldBinary, byte_order, 2));
        assert_eq!(pad_len(bytes.len() as u64, 2), 0);

        let mut archive = open(bytes).unwrap();
        assert_eq!(archive.byte_order(), byte_order);
        assert_eq!(archive.read_member("a").unwrap(), b"ab");
    }
}

#[test]
fn test_oversized_name_size_is_truncation_not_allocation() {
    let mut record_header = header(Format::NewAscii, ByteOrder::Little, "a", b"");
    record_header.namesize = 0xffff_ffff;
    let bytes = raw_record(&record_header, b"a", b"", 4);
    assert!(matches!(expect_err(open(bytes)), Error::TruncatedData { .. }));
}
