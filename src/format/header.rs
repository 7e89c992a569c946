//! Fixed-size cpio record headers.
//!
//! [`RawHeader`] is the decoded numeric content of one header, independent of
//! how the format lays it out. Decoding and encoding handle the per-format
//! field order, width, numeric base and byte order.

use std::io::Cursor;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{ByteOrder, FieldEncoding, Format, major, makedev, minor};
use crate::{Error, Result};

/// Widths of the old ASCII fields following the magic, in header order:
/// dev, ino, mode, uid, gid, nlink, rdev, mtime, namesize, filesize.
const OLD_ASCII_WIDTHS: [usize; 10] = [6, 6, 6, 6, 6, 6, 6, 11, 6, 11];

/// Number of 8-digit hex fields following the magic in the new formats.
const NEW_ASCII_FIELDS: usize = 13;

/// Width of each new ASCII field.
const NEW_ASCII_WIDTH: usize = 8;

/// Numeric content of one record header.
///
/// `dev` and `rdev` are full device identifiers as produced by
/// [`makedev`](super::makedev); the packing into the format's fields happens
/// in [`RawHeader::encode`] and [`RawHeader::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawHeader {
    /// Header format.
    pub format: Format,
    /// Byte order (meaningful for [`Format::OldBinary`] only).
    pub byte_order: ByteOrder,
    /// Device containing the original file.
    pub dev: u64,
    /// Inode number.
    pub ino: u64,
    /// File type and permission bits.
    pub mode: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Link count.
    pub nlink: u32,
    /// Device identifier for character and block devices.
    pub rdev: u64,
    /// Modification time in seconds since the Unix epoch.
    pub mtime: u64,
    /// Length of the data region in bytes (padding excluded).
    pub filesize: u64,
    /// Length of the name including its terminating NUL.
    pub namesize: u64,
    /// Data checksum ([`Format::NewCrc`] only).
    pub check: u32,
}

impl RawHeader {
    /// Decodes a header from exactly `format.header_size()` leading bytes.
    ///
    /// `offset` is the stream position of the record and is only used for
    /// error reporting.
    ///
    /// # Errors
    ///
    /// - [`Error::IncompleteHeader`] if `bytes` is shorter than the header
    /// - [`Error::CorruptHeader`] if the magic does not belong to `format` or
    ///   a numeric field does not parse in the format's base
    pub fn decode(format: Format, byte_order: ByteOrder, bytes: &[u8], offset: u64) -> Result<Self> {
        let size = format.header_size();
        if bytes.len() < size {
            return Err(Error::IncompleteHeader {
                offset,
                expected: size,
                found: bytes.len(),
            });
        }
        let bytes = &bytes[..size];

        if let Some(magic) = format.ascii_magic() {
            if &bytes[..magic.len()] != magic {
                return Err(Error::corrupt_header(
                    offset,
                    format!("magic does not match {format} header"),
                ));
            }
        }

        match format.layout().encoding {
            FieldEncoding::Binary => decode_binary(byte_order, bytes, offset),
            FieldEncoding::Octal => decode_old_ascii(bytes, offset),
            FieldEncoding::Hex => decode_new_ascii(format, bytes, offset),
        }
    }

    /// Encodes this header into its on-disk form.
    ///
    /// `name` is the member name and is only used for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldOverflow`] if a value does not fit its field. The
    /// identity fields `dev` and `ino` are truncated instead: they only need
    /// to be unique within one archive.
    pub fn encode(&self, name: &str) -> Result<Vec<u8>> {
        match self.format.layout().encoding {
            FieldEncoding::Binary => self.encode_binary(name),
            FieldEncoding::Octal => self.encode_old_ascii(name),
            FieldEncoding::Hex => self.encode_new_ascii(name),
        }
    }

    fn encode_binary(&self, name: &str) -> Result<Vec<u8>> {
        let word = u64::from(u16::MAX);
        let f = FieldCheck {
            name,
            format: self.format,
        };

        let dev = f.truncate("dev", pack_old_dev(self.dev), word);
        let ino = f.truncate("ino", self.ino, word);
        let mode = f.fit("mode", u64::from(self.mode), word)?;
        let uid = f.fit("uid", u64::from(self.uid), word)?;
        let gid = f.fit("gid", u64::from(self.gid), word)?;
        let nlink = f.fit("nlink", u64::from(self.nlink), word)?;
        let rdev = f.fit("rdev", f.pack_rdev(self.rdev)?, word)?;
        let mtime = f.fit("mtime", self.mtime, u64::from(u32::MAX))?;
        let namesize = f.fit("namesize", self.namesize, word)?;
        let filesize = f.fit("filesize", self.filesize, u64::from(u32::MAX))?;

        let words = [
            u64::from(super::OLD_BINARY_MAGIC),
            dev,
            ino,
            mode,
            uid,
            gid,
            nlink,
            rdev,
            mtime >> 16,
            mtime & 0xffff,
            namesize,
            filesize >> 16,
            filesize & 0xffff,
        ];

        let mut out = Vec::with_capacity(self.format.header_size());
        for w in words {
            // Every word was range-checked above.
            let w = w as u16;
            let written = match self.byte_order {
                ByteOrder::Little => out.write_u16::<LittleEndian>(w),
                ByteOrder::Big => out.write_u16::<BigEndian>(w),
            };
            written.map_err(Error::Io)?;
        }
        Ok(out)
    }

    fn encode_old_ascii(&self, name: &str) -> Result<Vec<u8>> {
        let f = FieldCheck {
            name,
            format: self.format,
        };
        let six = octal_max(6);
        let eleven = octal_max(11);

        let fields = [
            f.truncate("dev", pack_old_dev(self.dev), six),
            f.truncate("ino", self.ino, six),
            f.fit("mode", u64::from(self.mode), six)?,
            f.fit("uid", u64::from(self.uid), six)?,
            f.fit("gid", u64::from(self.gid), six)?,
            f.fit("nlink", u64::from(self.nlink), six)?,
            f.fit("rdev", f.pack_rdev(self.rdev)?, six)?,
            f.fit("mtime", self.mtime, eleven)?,
            f.fit("namesize", self.namesize, six)?,
            f.fit("filesize", self.filesize, eleven)?,
        ];

        let mut out = Vec::with_capacity(self.format.header_size());
        out.extend_from_slice(super::OLD_ASCII_MAGIC);
        for (value, width) in fields.iter().zip(OLD_ASCII_WIDTHS) {
            out.extend_from_slice(format!("{value:0width$o}").as_bytes());
        }
        Ok(out)
    }

    fn encode_new_ascii(&self, name: &str) -> Result<Vec<u8>> {
        let f = FieldCheck {
            name,
            format: self.format,
        };
        let max = u64::from(u32::MAX);

        let fields = [
            f.truncate("ino", self.ino, max),
            f.fit("mode", u64::from(self.mode), max)?,
            u64::from(self.uid),
            u64::from(self.gid),
            u64::from(self.nlink),
            f.fit("mtime", self.mtime, max)?,
            f.fit("filesize", self.filesize, max)?,
            u64::from(major(self.dev)),
            u64::from(minor(self.dev)),
            u64::from(major(self.rdev)),
            u64::from(minor(self.rdev)),
            f.fit("namesize", self.namesize, max)?,
            u64::from(self.check),
        ];

        let magic = self.format.ascii_magic().unwrap_or(super::NEW_ASCII_MAGIC);
        let mut out = Vec::with_capacity(self.format.header_size());
        out.extend_from_slice(magic);
        for value in fields {
            out.extend_from_slice(format!("{value:08x}").as_bytes());
        }
        Ok(out)
    }
}

/// Range checks for one member's header fields.
struct FieldCheck<'a> {
    name: &'a str,
    format: Format,
}

impl FieldCheck<'_> {
    fn fit(&self, field: &'static str, value: u64, max: u64) -> Result<u64> {
        if value > max {
            return Err(Error::FieldOverflow {
                name: self.name.to_string(),
                field,
                value,
                format: self.format,
            });
        }
        Ok(value)
    }

    fn truncate(&self, field: &'static str, value: u64, max: u64) -> u64 {
        if value > max {
            log::debug!(
                "{}: truncating {field} {value:#x} to the {} field width",
                self.name,
                self.format
            );
        }
        value & max
    }

    /// Packs rdev as `(major << 8) | minor` for the old formats.
    fn pack_rdev(&self, rdev: u64) -> Result<u64> {
        let (maj, min) = (u64::from(major(rdev)), u64::from(minor(rdev)));
        if min > 0xff {
            return Err(Error::FieldOverflow {
                name: self.name.to_string(),
                field: "rdev",
                value: rdev,
                format: self.format,
            });
        }
        Ok((maj << 8) | min)
    }
}

fn pack_old_dev(dev: u64) -> u64 {
    (u64::from(major(dev)) << 8) | (u64::from(minor(dev)) & 0xff)
}

fn unpack_old_dev(packed: u64) -> u64 {
    makedev((packed >> 8) as u32, (packed & 0xff) as u32)
}

const fn octal_max(width: usize) -> u64 {
    (1u64 << (3 * width)) - 1
}

fn parse_field(text: &[u8], radix: u32, offset: u64) -> Result<u64> {
    let valid = !text.is_empty() && text.iter().all(|&b| (b as char).is_digit(radix));
    let parsed = if valid {
        std::str::from_utf8(text)
            .ok()
            .and_then(|s| u64::from_str_radix(s, radix).ok())
    } else {
        None
    };
    parsed.ok_or_else(|| {
        Error::corrupt_header(
            offset,
            format!(
                "invalid base-{radix} field {:?}",
                String::from_utf8_lossy(text)
            ),
        )
    })
}

fn decode_binary(byte_order: ByteOrder, bytes: &[u8], offset: u64) -> Result<RawHeader> {
    let mut cursor = Cursor::new(bytes);
    let mut words = [0u16; 13];
    for w in &mut words {
        *w = match byte_order {
            ByteOrder::Little => cursor.read_u16::<LittleEndian>(),
            ByteOrder::Big => cursor.read_u16::<BigEndian>(),
        }
        .map_err(Error::Io)?;
    }
    let w = |i: usize| u64::from(words[i]);

    if words[0] != super::OLD_BINARY_MAGIC {
        return Err(Error::corrupt_header(
            offset,
            "magic does not match bin header in the detected byte order",
        ));
    }

    Ok(RawHeader {
        format: Format::OldBinary,
        byte_order,
        dev: unpack_old_dev(w(1)),
        ino: w(2),
        mode: u32::from(words[3]),
        uid: u32::from(words[4]),
        gid: u32::from(words[5]),
        nlink: u32::from(words[6]),
        rdev: unpack_old_dev(w(7)),
        mtime: (w(8) << 16) | w(9),
        namesize: w(10),
        filesize: (w(11) << 16) | w(12),
        check: 0,
    })
}

fn decode_old_ascii(bytes: &[u8], offset: u64) -> Result<RawHeader> {
    let mut fields = [0u64; 10];
    let mut pos = super::OLD_ASCII_MAGIC.len();
    for (field, width) in fields.iter_mut().zip(OLD_ASCII_WIDTHS) {
        *field = parse_field(&bytes[pos..pos + width], 8, offset)?;
        pos += width;
    }
    let [dev, ino, mode, uid, gid, nlink, rdev, mtime, namesize, filesize] = fields;

    // Six octal digits fit in 18 bits, so the narrowing casts are lossless.
    Ok(RawHeader {
        format: Format::OldAscii,
        byte_order: ByteOrder::native(),
        dev: unpack_old_dev(dev),
        ino,
        mode: mode as u32,
        uid: uid as u32,
        gid: gid as u32,
        nlink: nlink as u32,
        rdev: unpack_old_dev(rdev),
        mtime,
        namesize,
        filesize,
        check: 0,
    })
}

fn decode_new_ascii(format: Format, bytes: &[u8], offset: u64) -> Result<RawHeader> {
    let mut fields = [0u32; NEW_ASCII_FIELDS];
    let mut pos = super::NEW_ASCII_MAGIC.len();
    for field in &mut fields {
        // Eight hex digits always fit in a u32.
        *field = parse_field(&bytes[pos..pos + NEW_ASCII_WIDTH], 16, offset)? as u32;
        pos += NEW_ASCII_WIDTH;
    }
    let [
        ino,
        mode,
        uid,
        gid,
        nlink,
        mtime,
        filesize,
        devmajor,
        devminor,
        rdevmajor,
        rdevminor,
        namesize,
        check,
    ] = fields;

    Ok(RawHeader {
        format,
        byte_order: ByteOrder::native(),
        dev: makedev(devmajor, devminor),
        ino: u64::from(ino),
        mode,
        uid,
        gid,
        nlink,
        rdev: makedev(rdevmajor, rdevminor),
        mtime: u64::from(mtime),
        filesize: u64::from(filesize),
        namesize: u64::from(namesize),
        check,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(format: Format, byte_order: ByteOrder) -> RawHeader {
        RawHeader {
            format,
            byte_order,
            dev: makedev(8, 1),
            ino: 1234,
            mode: 0o100644,
            uid: 1000,
            gid: 100,
            nlink: 1,
            rdev: 0,
            mtime: 1_700_000_000,
            filesize: 70_000,
            namesize: 6,
            check: if format.has_checksum() { 0xdead } else { 0 },
        }
    }

    #[test]
    fn test_encode_sizes() {
        for format in Format::ALL {
            let bytes = sample(format, ByteOrder::Little).encode("hello").unwrap();
            assert_eq!(bytes.len(), format.header_size(), "{format}");
        }
    }

    #[test]
    fn test_every_format_decodes_what_it_encodes() {
        for format in Format::ALL {
            for order in [ByteOrder::Little, ByteOrder::Big] {
                let mut header = sample(format, order);
                if format != Format::OldBinary {
                    header.byte_order = ByteOrder::native();
                }
                let bytes = header.encode("hello").unwrap();
                let decoded = RawHeader::decode(format, header.byte_order, &bytes, 0).unwrap();
                assert_eq!(decoded, header, "{format} {order:?}");
            }
        }
    }

    #[test]
    fn test_new_ascii_layout() {
        let header = RawHeader {
            format: Format::NewAscii,
            ino: 0x10,
            mode: 0o40755,
            nlink: 2,
            rdev: makedev(4, 64),
            namesize: 2,
            ..RawHeader::default()
        };
        let bytes = header.encode("d").unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert_eq!(&text[..6], "070701");
        assert_eq!(&text[6..14], "00000010");
        assert_eq!(&text[14..22], "000041ed");
        assert_eq!(&text[38..46], "00000002");
        assert_eq!(&text[78..86], "00000004");
        assert_eq!(&text[86..94], "00000040");
        assert_eq!(&text[94..102], "00000002");
    }

    #[test]
    fn test_old_ascii_layout() {
        let header = RawHeader {
            format: Format::OldAscii,
            mode: 0o100600,
            mtime: 0o12345670123,
            namesize: 3,
            filesize: 5,
            ..RawHeader::default()
        };
        let bytes = header.encode("ab").unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert_eq!(&text[..6], "070707");
        assert_eq!(&text[18..24], "100600");
        assert_eq!(&text[48..59], "12345670123");
        assert_eq!(&text[59..65], "000003");
        assert_eq!(&text[65..76], "00000000005");
    }

    #[test]
    fn test_old_binary_split_words() {
        let header = RawHeader {
            format: Format::OldBinary,
            byte_order: ByteOrder::Big,
            mtime: 0x1234_5678,
            filesize: 0x0001_0002,
            ..RawHeader::default()
        };
        let bytes = header.encode("x").unwrap();
        assert_eq!(&bytes[..2], &[0x71, 0xc7]);
        assert_eq!(&bytes[16..20], &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(&bytes[22..26], &[0x00, 0x01, 0x00, 0x02]);
    }

    #[test]
    fn test_field_overflow() {
        let mut header = sample(Format::NewAscii, ByteOrder::native());
        header.filesize = 1 << 32;
        let err = header.encode("big").unwrap_err();
        assert!(matches!(err, Error::FieldOverflow { field: "filesize", .. }));
        assert_eq!(err.entry_name(), Some("big"));

        let mut header = sample(Format::OldBinary, ByteOrder::Little);
        header.uid = 70_000;
        assert!(matches!(
            header.encode("u").unwrap_err(),
            Error::FieldOverflow { field: "uid", .. }
        ));
    }

    #[test]
    fn test_identity_fields_truncate() {
        let mut header = sample(Format::OldBinary, ByteOrder::Little);
        header.ino = 0x1_0005;
        let bytes = header.encode("i").unwrap();
        let decoded = RawHeader::decode(Format::OldBinary, ByteOrder::Little, &bytes, 0).unwrap();
        assert_eq!(decoded.ino, 5);
    }

    #[test]
    fn test_decode_errors() {
        let err = RawHeader::decode(Format::NewAscii, ByteOrder::native(), b"070701", 40).unwrap_err();
        assert!(matches!(err, Error::IncompleteHeader { offset: 40, expected: 110, found: 6 }));

        let mut bytes = sample(Format::NewAscii, ByteOrder::native()).encode("x").unwrap();
        bytes[10] = b'g';
        let err = RawHeader::decode(Format::NewAscii, ByteOrder::native(), &bytes, 8).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { offset: 8, .. }));

        let mut bytes = sample(Format::OldAscii, ByteOrder::native()).encode("x").unwrap();
        bytes[7] = b'9';
        assert!(RawHeader::decode(Format::OldAscii, ByteOrder::native(), &bytes, 0).is_err());
    }
}
