//! # cpioarc
//!
//! A pure-Rust library for reading, writing and extracting cpio archives.
//!
//! All four classic header formats are supported: old binary (`bin`, either
//! byte order), old portable ASCII (`odc`), new ASCII (`newc`) and new ASCII
//! with checksums (`crc`). The format is detected from the first record when
//! reading, and every record of an archive must share it.
//!
//! ## Quick Start
//!
//! ### Reading an Archive
//!
//! ```rust,no_run
//! use cpioarc::{Archive, ExtractOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let mut archive = Archive::open_path("initramfs.cpio")?;
//!
//!     for member in archive.iter() {
//!         println!("{:o} {:>8} {}", member.mode, member.size(), member.name());
//!     }
//!
//!     let init = archive.read_member("init")?;
//!     println!("init is {} bytes", init.len());
//!
//!     archive.extract_all("./rootfs", &ExtractOptions::default())?;
//!     Ok(())
//! }
//! ```
//!
//! ### Creating an Archive
//!
//! ```rust,no_run
//! use cpioarc::{Archive, Member, MemberAmend, WriteOptions, Result};
//! use cpioarc::format::Format;
//!
//! fn main() -> Result<()> {
//!     let options = WriteOptions::new().format(Format::NewCrc);
//!     let mut archive = Archive::create_path("out.cpio", options)?;
//!
//!     // Add a file from disk under another name, owned by root
//!     archive.insert_path_as("build/init", "init", &MemberAmend::new().uid(0).gid(0))?;
//!
//!     // Add members built in memory
//!     archive.append(Member::directory("etc")?)?;
//!     archive.append(Member::file("etc/hostname", b"box\n".to_vec())?)?;
//!     archive.append(Member::symlink("bin/sh", "busybox")?)?;
//!
//!     // Writes the catalog, sorted by name, and the trailer
//!     archive.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`], which is an alias for
//! `std::result::Result<T, Error>`. Errors fall into families that can be
//! told apart with predicates such as [`Error::is_header_error`] and
//! [`Error::is_misuse`]:
//!
//! ```rust,no_run
//! use cpioarc::{Archive, Error};
//!
//! fn open_archive(path: &str) -> cpioarc::Result<()> {
//!     match Archive::open_path(path) {
//!         Ok(archive) => {
//!             println!("Opened archive with {} members", archive.len());
//!             Ok(())
//!         }
//!         Err(e @ Error::UnsupportedFormat { .. }) => {
//!             eprintln!("Not a cpio archive: {e}");
//!             Err(e)
//!         }
//!         Err(e) if e.is_checksum_error() => {
//!             eprintln!("Damaged member {:?}", e.entry_name());
//!             Err(e)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! # fn main() {}
//! ```
//!
//! ## Safety
//!
//! Member names come from the archive and are untrusted:
//!
//! - **Path traversal protection**: [`PathSafety::Strict`] (the default)
//!   rejects absolute names and `..` components and checks that no existing
//!   symlink redirects a member outside the destination
//! - **Symlink policy**: [`LinkPolicy`] can validate or forbid links
//! - **Checksum verification**: `crc` members are verified while scanning
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade: one
//! `debug` line per scanned or written member, `warn` for metadata that could
//! not be restored. No logger is installed by the library.
//!
//! ## Platform Support
//!
//! Reading and writing work everywhere. Building members from paths and
//! extracting symlinks, devices and fifos require a Unix platform; elsewhere
//! those operations return [`Error::UnsupportedFeature`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

/// Default buffer size for read operations (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod archive;
pub mod checksum;
pub mod error;
pub mod format;
pub mod hardlink;
pub mod member;
pub mod options;
pub mod safety;

pub use archive::{Archive, ArchiveInfo, ExtractResult};
pub use error::{Error, Result};
pub use format::mode::FileType;
pub use format::{ByteOrder, Format};
pub use member::{Member, MemberReader};
pub use options::{
    AccessMode, DotEntryPolicy, ExtractOptions, LinkPolicy, MemberAmend, OldAsciiPadding,
    OverwritePolicy, PreserveMetadata, ReadOptions, WriteOptions,
};
pub use safety::{PathSafety, validate_extract_path};
