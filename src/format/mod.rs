//! cpio format constants, layouts, and low-level header coding.
//!
//! A cpio archive is a sequence of records. Each record is a fixed-size
//! header, a NUL-terminated pathname, and the member's data, with NUL padding
//! after the name and after the data whose width depends on the header
//! format. The archive ends with a record named [`TRAILER_NAME`].
//!
//! Four header formats exist:
//!
//! | Format | Magic | Header | Fields | Name/data alignment |
//! |--------|-------|--------|--------|---------------------|
//! | [`Format::OldBinary`] | `0o070707` as u16 | 26 bytes | raw u16 words | 2 |
//! | [`Format::OldAscii`] | `"070707"` | 76 bytes | octal text | none |
//! | [`Format::NewAscii`] | `"070701"` | 110 bytes | hex text | 4 |
//! | [`Format::NewCrc`] | `"070702"` | 110 bytes | hex text | 4 |

pub mod detect;
pub mod header;
pub mod mode;

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Magic value of the old binary format, stored as a u16 in either byte order.
pub const OLD_BINARY_MAGIC: u16 = 0o070707;

/// Magic text of the old portable ASCII ("odc") format.
pub const OLD_ASCII_MAGIC: &[u8; 6] = b"070707";

/// Magic text of the new ASCII ("newc") format.
pub const NEW_ASCII_MAGIC: &[u8; 6] = b"070701";

/// Magic text of the new CRC ("crc") format.
pub const NEW_CRC_MAGIC: &[u8; 6] = b"070702";

/// Number of leading bytes needed to recognise any of the four magics.
pub const MAGIC_PROBE_LEN: usize = 6;

/// Pathname of the record that terminates an archive.
pub const TRAILER_NAME: &str = "TRAILER!!!";

/// A cpio header format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Old binary format (`cpio -H bin`).
    OldBinary,
    /// Old portable ASCII format (`cpio -H odc`).
    OldAscii,
    /// New portable ASCII format (`cpio -H newc`), as used by initramfs.
    #[default]
    NewAscii,
    /// New ASCII format with a per-file checksum (`cpio -H crc`).
    NewCrc,
}

/// How the numeric fields of a header are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// Raw unsigned 16-bit words in the archive's byte order.
    Binary,
    /// Zero-padded octal text.
    Octal,
    /// Zero-padded lowercase hexadecimal text.
    Hex,
}

/// Layout constants fixed by a [`Format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Size of the fixed header in bytes, magic included.
    pub header_size: usize,
    /// Alignment of header plus name.
    pub header_modulus: u64,
    /// Alignment of the data region.
    pub data_modulus: u64,
    /// Field representation.
    pub encoding: FieldEncoding,
}

impl Format {
    /// All formats, in the order they appeared historically.
    pub const ALL: [Format; 4] = [
        Format::OldBinary,
        Format::OldAscii,
        Format::NewAscii,
        Format::NewCrc,
    ];

    /// Returns the layout constants for this format.
    pub const fn layout(self) -> Layout {
        match self {
            Format::OldBinary => Layout {
                header_size: 26,
                header_modulus: 2,
                data_modulus: 2,
                encoding: FieldEncoding::Binary,
            },
            Format::OldAscii => Layout {
                header_size: 76,
                header_modulus: 1,
                data_modulus: 1,
                encoding: FieldEncoding::Octal,
            },
            Format::NewAscii | Format::NewCrc => Layout {
                header_size: 110,
                header_modulus: 4,
                data_modulus: 4,
                encoding: FieldEncoding::Hex,
            },
        }
    }

    /// Size of the fixed header in bytes.
    pub const fn header_size(self) -> usize {
        self.layout().header_size
    }

    /// Returns the textual magic, or `None` for the binary format.
    pub const fn ascii_magic(self) -> Option<&'static [u8; 6]> {
        match self {
            Format::OldBinary => None,
            Format::OldAscii => Some(OLD_ASCII_MAGIC),
            Format::NewAscii => Some(NEW_ASCII_MAGIC),
            Format::NewCrc => Some(NEW_CRC_MAGIC),
        }
    }

    /// Returns true if records of this format carry a data checksum.
    pub const fn has_checksum(self) -> bool {
        matches!(self, Format::NewCrc)
    }

    /// Returns the conventional short name (`bin`, `odc`, `newc`, `crc`).
    pub const fn name(self) -> &'static str {
        match self {
            Format::OldBinary => "bin",
            Format::OldAscii => "odc",
            Format::NewAscii => "newc",
            Format::NewCrc => "crc",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bin" => Ok(Format::OldBinary),
            "odc" => Ok(Format::OldAscii),
            "newc" => Ok(Format::NewAscii),
            "crc" => Ok(Format::NewCrc),
            other => Err(Error::UnknownFormatName(other.to_string())),
        }
    }
}

/// Byte order of an old binary archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

impl ByteOrder {
    /// Returns the byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::native()
    }
}

/// Returns the number of NUL bytes needed to align `length` to `modulus`.
///
/// A modulus of 0 or 1 means "unaligned" and always yields 0.
pub const fn pad_len(length: u64, modulus: u64) -> u64 {
    if modulus <= 1 {
        return 0;
    }
    (modulus - length % modulus) % modulus
}

/// Composes a device identifier from major and minor numbers.
///
/// Uses the Linux/glibc bit layout so that the result matches what
/// `stat(2)` reports on Linux hosts.
pub const fn makedev(major: u32, minor: u32) -> u64 {
    let major = major as u64;
    let minor = minor as u64;
    ((major & 0xffff_f000) << 32)
        | ((major & 0x0000_0fff) << 8)
        | ((minor & 0xffff_ff00) << 12)
        | (minor & 0x0000_00ff)
}

/// Extracts the major number from a device identifier.
pub const fn major(dev: u64) -> u32 {
    (((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0x0000_0fff)) as u32
}

/// Extracts the minor number from a device identifier.
pub const fn minor(dev: u64) -> u32 {
    (((dev >> 12) & 0xffff_ff00) | (dev & 0x0000_00ff)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts() {
        assert_eq!(Format::OldBinary.header_size(), 26);
        assert_eq!(Format::OldAscii.header_size(), 76);
        assert_eq!(Format::NewAscii.header_size(), 110);
        assert_eq!(Format::NewCrc.header_size(), 110);

        assert_eq!(Format::OldBinary.layout().header_modulus, 2);
        assert_eq!(Format::OldAscii.layout().data_modulus, 1);
        assert_eq!(Format::NewCrc.layout().data_modulus, 4);
    }

    #[test]
    fn test_pad_len() {
        assert_eq!(pad_len(110 + 2, 4), 0);
        assert_eq!(pad_len(110 + 4, 4), 2);
        assert_eq!(pad_len(5, 4), 3);
        assert_eq!(pad_len(8, 4), 0);
        assert_eq!(pad_len(27, 2), 1);
        assert_eq!(pad_len(0, 4), 0);
        assert_eq!(pad_len(77, 1), 0);
        assert_eq!(pad_len(77, 0), 0);
    }

    #[test]
    fn test_magic_value() {
        assert_eq!(OLD_BINARY_MAGIC, 0x71c7);
        assert_eq!(Format::OldBinary.ascii_magic(), None);
        assert_eq!(Format::NewCrc.ascii_magic(), Some(b"070702"));
    }

    #[test]
    fn test_makedev_roundtrip() {
        for (maj, min) in [(0, 0), (8, 1), (259, 65536), (4095, 255), (0x12345, 0xabcdef)] {
            let dev = makedev(maj, min);
            assert_eq!(major(dev), maj);
            assert_eq!(minor(dev), min);
        }
        // Classic 8:1 (/dev/sda1) keeps the traditional 16-bit encoding.
        assert_eq!(makedev(8, 1), 0x0801);
    }

    #[test]
    fn test_format_names() {
        for format in Format::ALL {
            assert_eq!(format.name().parse::<Format>().unwrap(), format);
        }
        assert!("tar".parse::<Format>().is_err());
        assert_eq!(Format::default(), Format::NewAscii);
        assert_eq!(Format::NewAscii.to_string(), "newc");
    }
}
