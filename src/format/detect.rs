//! cpio magic detection.
//!
//! Every record starts with a magic that identifies its header format. The
//! three ASCII magics are matched as text; the old binary magic is a u16 whose
//! byte order is discovered by trying both interpretations.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use super::{
    ByteOrder, Format, MAGIC_PROBE_LEN, NEW_ASCII_MAGIC, NEW_CRC_MAGIC, OLD_ASCII_MAGIC,
    OLD_BINARY_MAGIC,
};
use crate::{Error, Result};

/// Identifies the header format of a record from its leading bytes.
///
/// `probe` must hold at least the first two bytes of a record; the ASCII
/// formats need all six. Returns `None` if no magic matches.
///
/// # Example
///
/// ```rust
/// use cpioarc::format::{ByteOrder, Format};
/// use cpioarc::format::detect::detect_magic;
///
/// assert_eq!(detect_magic(b"070701"), Some((Format::NewAscii, ByteOrder::native())));
/// assert_eq!(detect_magic(&[0xc7, 0x71]), Some((Format::OldBinary, ByteOrder::Little)));
/// assert_eq!(detect_magic(b"PK\x03\x04"), None);
/// ```
pub fn detect_magic(probe: &[u8]) -> Option<(Format, ByteOrder)> {
    if probe.len() >= MAGIC_PROBE_LEN {
        let magic = &probe[..MAGIC_PROBE_LEN];
        // The byte order is irrelevant for text headers.
        let order = ByteOrder::native();
        if magic == NEW_ASCII_MAGIC {
            return Some((Format::NewAscii, order));
        }
        if magic == NEW_CRC_MAGIC {
            return Some((Format::NewCrc, order));
        }
        if magic == OLD_ASCII_MAGIC {
            return Some((Format::OldAscii, order));
        }
    }

    if probe.len() >= 2 {
        if LittleEndian::read_u16(probe) == OLD_BINARY_MAGIC {
            return Some((Format::OldBinary, ByteOrder::Little));
        }
        if BigEndian::read_u16(probe) == OLD_BINARY_MAGIC {
            return Some((Format::OldBinary, ByteOrder::Big));
        }
    }

    None
}

/// Checks whether a stream starts with a cpio record.
///
/// The stream position is restored before returning.
pub fn is_cpio_archive<R: Read + Seek>(reader: &mut R) -> Result<bool> {
    let start_pos = reader.stream_position().map_err(Error::Io)?;

    let mut probe = [0u8; MAGIC_PROBE_LEN];
    let mut filled = 0;
    while filled < probe.len() {
        let n = reader.read(&mut probe[filled..]).map_err(Error::Io)?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    reader.seek(SeekFrom::Start(start_pos)).map_err(Error::Io)?;

    Ok(detect_magic(&probe[..filled]).is_some())
}

/// Checks whether the file at `path` starts with a cpio record.
///
/// A file that cannot be opened is reported as an error, not as `false`.
pub fn is_cpio_path(path: impl AsRef<Path>) -> Result<bool> {
    let mut file = File::open(path.as_ref()).map_err(Error::Io)?;
    is_cpio_archive(&mut file)
}
