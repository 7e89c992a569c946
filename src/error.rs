//! Error types for cpio archive operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when reading, writing or extracting cpio archives, along
//! with a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. Errors
//! fall into a small taxonomy exposed through predicates, so callers rarely
//! need to match individual variants:
//!
//! ```rust,no_run
//! use cpioarc::{Archive, Error};
//!
//! fn list(path: &str) -> cpioarc::Result<Vec<String>> {
//!     match Archive::open_path(path) {
//!         Ok(archive) => Ok(archive.names().into_iter().map(str::to_string).collect()),
//!
//!         // Data damage: bad magic, unparsable fields, checksum failures
//!         Err(e) if e.is_header_error() => {
//!             eprintln!("damaged archive at byte {:?}: {}", e.offset(), e);
//!             Err(e)
//!         }
//!
//!         // File system errors
//!         Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
//!             eprintln!("archive not found: {}", path);
//!             Err(Error::Io(e))
//!         }
//!
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::io;

use crate::format::Format;
use crate::options::AccessMode;

/// The main error type for cpio archive operations.
///
/// # Error Categories
///
/// | Category | Predicate | Variants |
/// |----------|-----------|----------|
/// | Format | [`is_format_error`][Self::is_format_error] | [`UnsupportedFormat`][Self::UnsupportedFormat], [`FormatMismatch`][Self::FormatMismatch] |
/// | Header | [`is_header_error`][Self::is_header_error] | format errors, [`IncompleteHeader`][Self::IncompleteHeader], [`CorruptHeader`][Self::CorruptHeader], [`TruncatedData`][Self::TruncatedData], [`MissingTrailer`][Self::MissingTrailer], [`ChecksumMismatch`][Self::ChecksumMismatch] |
/// | Checksum | [`is_checksum_error`][Self::is_checksum_error] | [`ChecksumMismatch`][Self::ChecksumMismatch] |
/// | Misuse | [`is_misuse`][Self::is_misuse] | [`Closed`][Self::Closed], [`WrongMode`][Self::WrongMode], [`InvalidMode`][Self::InvalidMode], [`UnknownFormatName`][Self::UnknownFormatName], [`EntryExists`][Self::EntryExists], [`FormatFrozen`][Self::FormatFrozen], [`InvalidName`][Self::InvalidName] |
/// | Security | [`is_security_error`][Self::is_security_error] | [`PathTraversal`][Self::PathTraversal], [`SymlinkRejected`][Self::SymlinkRejected], [`SymlinkTargetEscape`][Self::SymlinkTargetEscape] |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred on the archive stream or the file system.
    ///
    /// Short reads inside a record are reported as [`Error::IncompleteHeader`]
    /// or [`Error::TruncatedData`] instead, so an `Io` error normally means the
    /// underlying device failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record starts with a magic that matches none of the cpio formats.
    ///
    /// Returned when opening something that is not a cpio archive, or when
    /// the stream is damaged at a record boundary.
    #[error("Unsupported format at offset {offset:#x}: magic {magic:02x?}")]
    UnsupportedFormat {
        /// Byte offset of the record.
        offset: u64,
        /// The leading bytes that failed to match.
        magic: [u8; 6],
    },

    /// A record's format differs from the archive's format.
    ///
    /// All records of one archive share a format: the first record's, or the
    /// format hint passed in [`ReadOptions`](crate::ReadOptions).
    #[error("Format mismatch at offset {offset:#x}: expected {expected}, found {found}")]
    FormatMismatch {
        /// Byte offset of the record.
        offset: u64,
        /// The archive's format.
        expected: Format,
        /// The format of this record.
        found: Format,
    },

    /// The stream ended inside a record header.
    #[error("Incomplete header at offset {offset:#x}: expected {expected} bytes, found {found}")]
    IncompleteHeader {
        /// Byte offset of the record.
        offset: u64,
        /// Bytes needed.
        expected: usize,
        /// Bytes available.
        found: usize,
    },

    /// A header field could not be parsed.
    ///
    /// This indicates the archive was damaged during transfer or storage.
    /// The error includes the byte offset of the damaged record.
    #[error("Corrupt header at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// Byte offset of the record.
        offset: u64,
        /// A description of the corruption.
        reason: String,
    },

    /// A member's data (or name) extends past the end of the stream.
    #[error("Truncated data for member '{name}' at offset {offset:#x}")]
    TruncatedData {
        /// The member name, or an empty string if the name itself was cut off.
        name: String,
        /// Byte offset of the record.
        offset: u64,
    },

    /// The stream ended after a complete record where another record or the
    /// `TRAILER!!!` record was expected.
    #[error("Archive ends at offset {offset:#x} without a trailer record")]
    MissingTrailer {
        /// Stream position where the next record should have started.
        offset: u64,
    },

    /// The stored checksum of a `crc` member does not match its data.
    ///
    /// # Recovery
    ///
    /// Verification can be turned off with
    /// [`ReadOptions::verify_checksums`](crate::ReadOptions::verify_checksums)
    /// to salvage the remaining members.
    #[error("Checksum mismatch for member '{name}': expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// The member name.
        name: String,
        /// Byte offset of the record.
        offset: u64,
        /// Checksum stored in the header.
        expected: u32,
        /// Checksum of the data actually read.
        actual: u32,
    },

    /// A value does not fit the header field of the archive's format.
    ///
    /// For example, `newc` cannot store members of 4 GiB or more, and the old
    /// binary format limits uid and gid to 16 bits.
    #[error("Member '{name}': {field} value {value} does not fit the {format} header")]
    FieldOverflow {
        /// The member name.
        name: String,
        /// The header field.
        field: &'static str,
        /// The value that did not fit.
        value: u64,
        /// The archive format.
        format: Format,
    },

    /// A member name cannot be stored.
    #[error("Invalid member name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A member with this name is already in the archive.
    #[error("Member '{name}' already exists")]
    EntryExists {
        /// The duplicate name.
        name: String,
    },

    /// No member with this name exists.
    #[error("Member '{name}' not found")]
    EntryNotFound {
        /// The requested name.
        name: String,
    },

    /// The archive was already closed.
    #[error("Archive is closed")]
    Closed,

    /// The operation is not available in the archive's access mode.
    #[error("Cannot {operation} an archive opened for {mode}")]
    WrongMode {
        /// The attempted operation.
        operation: &'static str,
        /// The archive's access mode.
        mode: AccessMode,
    },

    /// A mode string did not name an access mode.
    #[error("Invalid access mode {0:?} (expected r, rb, w or wb)")]
    InvalidMode(String),

    /// A format name did not name a cpio format.
    #[error("Unknown format name {0:?} (expected bin, odc, newc or crc)")]
    UnknownFormatName(String),

    /// The format or byte order was changed after members were added.
    #[error("Format is frozen at {format} once members have been added")]
    FormatFrozen {
        /// The archive's format.
        format: Format,
    },

    /// Path traversal detected in a member name.
    ///
    /// This is a **security error** indicating the archive contains names
    /// designed to escape the extraction directory (e.g. `../../etc/passwd`).
    ///
    /// # Security
    ///
    /// This check is enabled by default with [`PathSafety::Strict`]. If you
    /// trust the archive source, you can relax it:
    ///
    /// ```rust
    /// use cpioarc::{ExtractOptions, PathSafety};
    ///
    /// let options = ExtractOptions::new().path_safety(PathSafety::Relaxed);
    /// ```
    ///
    /// [`PathSafety::Strict`]: crate::PathSafety::Strict
    #[error("Path traversal detected: {path}")]
    PathTraversal {
        /// The offending member name.
        path: String,
    },

    /// A symbolic link was rejected by [`LinkPolicy::Forbid`](crate::LinkPolicy::Forbid).
    #[error("Symbolic link rejected: {path}")]
    SymlinkRejected {
        /// The symlink member name.
        path: String,
    },

    /// A symbolic link target escapes the extraction directory.
    ///
    /// Returned under [`LinkPolicy::ValidateTargets`](crate::LinkPolicy::ValidateTargets)
    /// when the target is absolute or climbs above the destination root.
    #[error("Symbolic link target escapes extraction directory: {path} -> {target}")]
    SymlinkTargetEscape {
        /// The symlink member name.
        path: String,
        /// The link target.
        target: String,
    },

    /// An operation needs a capability the platform does not provide.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// The name of the unsupported feature.
        feature: &'static str,
    },
}

impl Error {
    /// Returns `true` if the stream is not a cpio archive of the expected format.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat { .. } | Error::FormatMismatch { .. }
        )
    }

    /// Returns `true` if a record of the archive could not be decoded.
    ///
    /// Includes every format error and checksum failure.
    pub fn is_header_error(&self) -> bool {
        self.is_format_error()
            || matches!(
                self,
                Error::IncompleteHeader { .. }
                    | Error::CorruptHeader { .. }
                    | Error::TruncatedData { .. }
                    | Error::MissingTrailer { .. }
                    | Error::ChecksumMismatch { .. }
            )
    }

    /// Returns `true` for a data checksum mismatch.
    pub fn is_checksum_error(&self) -> bool {
        matches!(self, Error::ChecksumMismatch { .. })
    }

    /// Returns `true` if the caller broke an API contract.
    ///
    /// These errors are never caused by archive content.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Error::Closed
                | Error::WrongMode { .. }
                | Error::InvalidMode(_)
                | Error::UnknownFormatName(_)
                | Error::EntryExists { .. }
                | Error::FormatFrozen { .. }
                | Error::InvalidName { .. }
        )
    }

    /// Returns `true` if this error indicates a security issue.
    ///
    /// Security errors should generally cause extraction to abort unless
    /// the archive source is fully trusted.
    pub fn is_security_error(&self) -> bool {
        matches!(
            self,
            Error::PathTraversal { .. }
                | Error::SymlinkRejected { .. }
                | Error::SymlinkTargetEscape { .. }
        )
    }

    /// Returns the member name associated with this error, if any.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cpioarc::Error;
    ///
    /// fn log_error(error: &Error) {
    ///     if let Some(name) = error.entry_name() {
    ///         eprintln!("Error for '{}': {}", name, error);
    ///     }
    /// }
    /// ```
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Error::TruncatedData { name, .. }
            | Error::ChecksumMismatch { name, .. }
            | Error::FieldOverflow { name, .. }
            | Error::InvalidName { name, .. }
            | Error::EntryExists { name }
            | Error::EntryNotFound { name } => Some(name.as_str()),
            Error::PathTraversal { path }
            | Error::SymlinkRejected { path }
            | Error::SymlinkTargetEscape { path, .. } => Some(path.as_str()),
            _ => None,
        }
    }

    /// Returns the byte offset of the offending record, if any.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Error::UnsupportedFormat { offset, .. }
            | Error::FormatMismatch { offset, .. }
            | Error::IncompleteHeader { offset, .. }
            | Error::CorruptHeader { offset, .. }
            | Error::TruncatedData { offset, .. }
            | Error::MissingTrailer { offset }
            | Error::ChecksumMismatch { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Creates a CorruptHeader error.
    ///
    /// This is a convenience constructor for creating corrupt header errors.
    pub fn corrupt_header(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptHeader {
            offset,
            reason: reason.into(),
        }
    }

    /// Creates a ChecksumMismatch error.
    pub fn checksum_mismatch(name: impl Into<String>, offset: u64, expected: u32, actual: u32) -> Self {
        Error::ChecksumMismatch {
            name: name.into(),
            offset,
            expected,
            actual,
        }
    }

    /// Creates an InvalidName error.
    pub fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        Error::InvalidName {
            name: name.into(),
            reason,
        }
    }
}

/// A specialized Result type for cpio operations.
///
/// This is defined as `std::result::Result<T, Error>` for convenience.
pub type Result<T> = std::result::Result<T, Error>;
