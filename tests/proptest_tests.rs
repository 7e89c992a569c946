//! Property-based tests using proptest.
//!
//! These tests verify invariants of the cpioarc codec using randomly
//! generated members and byte strings.

use std::io::Cursor;

use cpioarc::checksum::checksum32;
use cpioarc::format::header::RawHeader;
use cpioarc::format::{ByteOrder, Format, pad_len};
use cpioarc::{Archive, Member, ReadOptions, WriteOptions};
use proptest::prelude::*;

fn format_strategy() -> impl Strategy<Value = (Format, ByteOrder)> {
    prop_oneof![
        Just((Format::OldBinary, ByteOrder::Little)),
        Just((Format::OldBinary, ByteOrder::Big)),
        Just((Format::OldAscii, ByteOrder::Little)),
        Just((Format::NewAscii, ByteOrder::Little)),
        Just((Format::NewCrc, ByteOrder::Little)),
    ]
}

/// Strategy for member names accepted by every format.
///
/// - 1-3 path components separated by '/'
/// - Each component is 1-8 characters from a portable set
fn name_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,7}", 1..4)
        .prop_map(|parts| parts.join("/"))
}

fn files_strategy() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    proptest::collection::btree_map(
        name_strategy(),
        proptest::collection::vec(any::<u8>(), 0..300),
        0..8,
    )
    .prop_map(|files| files.into_iter().collect())
}

proptest! {
    /// Whatever is appended reads back byte for byte, in name order.
    #[test]
    fn written_members_read_back(
        (format, byte_order) in format_strategy(),
        files in files_strategy(),
        uid in 0u32..65536,
        mtime in 0u64..(1 << 32),
    ) {
        let options = WriteOptions::new().format(format).byte_order(byte_order);
        let mut archive = Archive::create(Cursor::new(Vec::new()), options).unwrap();
        for (name, data) in &files {
            let mut member = Member::file(name.as_str(), data.clone()).unwrap();
            member.uid = uid;
            member.mtime = mtime;
            archive.append(member).unwrap();
        }
        let bytes = archive.finish().unwrap().into_inner();

        let mut archive = Archive::open(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
        prop_assert_eq!(archive.names(), names);
        for (name, data) in &files {
            let member = archive.member(name).unwrap();
            prop_assert_eq!(member.uid, uid);
            prop_assert_eq!(member.mtime, mtime);
            prop_assert_eq!(&archive.read_member(name).unwrap(), data);
        }
    }

    /// Opening arbitrary bytes never panics.
    #[test]
    fn arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = Archive::open(Cursor::new(data.clone()));
        let options = ReadOptions::new().verify_checksums(false).resolve_hardlinks(false);
        let _ = Archive::open_with(Cursor::new(data), options);
    }

    /// Corrupting a valid archive yields an error or an archive, never a panic.
    #[test]
    fn corrupted_archives_never_panic(
        files in files_strategy(),
        position in any::<prop::sample::Index>(),
        value in any::<u8>(),
    ) {
        let mut archive = Archive::create(Cursor::new(Vec::new()), WriteOptions::default()).unwrap();
        for (name, data) in &files {
            archive.append(Member::file(name.as_str(), data.clone()).unwrap()).unwrap();
        }
        let mut bytes = archive.finish().unwrap().into_inner();
        let index = position.index(bytes.len());
        bytes[index] = value;

        if let Ok(mut archive) = Archive::open(Cursor::new(bytes)) {
            let names: Vec<String> = archive.names().into_iter().map(str::to_owned).collect();
            for name in names {
                let _ = archive.read_member(&name);
            }
        }
    }

    /// Padding always reaches the next multiple of the modulus.
    #[test]
    fn padding_aligns(length in 0u64..1_000_000, modulus in prop::sample::select(vec![1u64, 2, 4])) {
        let pad = pad_len(length, modulus);
        prop_assert!(pad < modulus.max(1));
        prop_assert_eq!((length + pad) % modulus, 0);
    }

    /// The checksum is additive over concatenation.
    #[test]
    fn checksum_is_additive(
        a in proptest::collection::vec(any::<u8>(), 0..256),
        b in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let joined: Vec<u8> = a.iter().chain(b.iter()).copied().collect();
        prop_assert_eq!(checksum32(&joined), checksum32(&a).wrapping_add(checksum32(&b)));
    }

    /// Header values that fit the new ASCII fields survive encoding.
    #[test]
    fn new_ascii_header_fields_survive(
        mode in any::<u32>(),
        uid in any::<u32>(),
        gid in any::<u32>(),
        filesize in any::<u32>(),
        mtime in any::<u32>(),
    ) {
        let header = RawHeader {
            format: Format::NewAscii,
            mode,
            uid,
            gid,
            nlink: 1,
            filesize: u64::from(filesize),
            mtime: u64::from(mtime),
            namesize: 2,
            ..RawHeader::default()
        };
        let bytes = header.encode("x").unwrap();
        prop_assert_eq!(bytes.len(), 110);
        let decoded = RawHeader::decode(Format::NewAscii, ByteOrder::native(), &bytes, 0).unwrap();
        prop_assert_eq!(decoded, header);
    }
}
