//! Archive information types.

use crate::format::{ByteOrder, Format};

/// Information about an archive.
///
/// For an archive opened for reading this describes the scan. For an
/// archive being written it tracks the catalog and the last flush.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchiveInfo {
    /// Header format of the records.
    pub format: Format,
    /// Byte order of old binary headers.
    pub byte_order: ByteOrder,
    /// Number of members in the catalog.
    pub member_count: usize,
    /// Total size of the stored data, before hardlinks are resolved.
    pub total_size: u64,
    /// Bytes of the stream covered by the records, from the start offset up
    /// to the end of the last record read or written.
    pub archive_size: u64,
    /// Whether a `TRAILER!!!` record ended the scan, or was written.
    pub trailer_found: bool,
    /// Number of hardlink placeholders that were aliased to their data.
    pub hardlinks_resolved: usize,
}

impl ArchiveInfo {
    /// Returns true if the scan stopped before a trailer record.
    ///
    /// An empty stream, or zero padding where a record was expected, still
    /// opens; a stream that stops after a record fails with
    /// [`Error::MissingTrailer`](crate::Error::MissingTrailer) instead.
    pub fn is_unterminated(&self) -> bool {
        !self.trailer_found
    }
}

/// Result of extracting members from an archive.
#[must_use = "extraction results should be checked for skipped members"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractResult {
    /// Number of members extracted.
    pub entries_extracted: usize,
    /// Number of members skipped under [`OverwritePolicy::Skip`](crate::OverwritePolicy::Skip).
    pub entries_skipped: usize,
    /// Total bytes of regular file data written.
    pub bytes_extracted: u64,
}

impl ExtractResult {
    pub(crate) fn merge(&mut self, other: ExtractResult) {
        self.entries_extracted += other.entries_extracted;
        self.entries_skipped += other.entries_skipped;
        self.bytes_extracted += other.bytes_extracted;
    }
}
