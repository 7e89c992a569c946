//! Hard link reconciliation for scanned archives.
//!
//! cpio writers store the data of a hardlinked file once. The other names of
//! the same inode are written as records with the same `(dev, ino)` pair, a
//! link count above one, and a size of zero. After a scan, those placeholders
//! are made to share the data region of their data-bearing twin so every name
//! reads back the full content.
//!
//! # Example
//!
//! ```rust
//! use cpioarc::Member;
//! use cpioarc::hardlink::resolve_hardlinks;
//!
//! let mut data = Member::file("a", b"shared".to_vec()).unwrap();
//! let mut link = Member::file("b", Vec::new()).unwrap();
//! for member in [&mut data, &mut link] {
//!     member.ino = 9;
//!     member.set_nlink(2);
//! }
//!
//! let mut members = vec![data, link];
//! assert_eq!(resolve_hardlinks(&mut members), 1);
//! assert_eq!(members[1].size(), 6);
//! assert_eq!(members[1].nlink(), 1);
//! ```

mod tracker;

pub use tracker::{FileId, HardLinkTracker};

use crate::Member;

/// Aliases zero-length hardlink placeholders to their data-bearing twin.
///
/// Only non-directory members with a link count above one take part. A
/// placeholder with no twin in the catalog is left empty. Returns the number
/// of placeholders that were aliased.
pub fn resolve_hardlinks(members: &mut [Member]) -> usize {
    let linked = |m: &Member| m.nlink() > 1 && !m.is_dir();

    let mut tracker = HardLinkTracker::new();
    for (index, member) in members.iter().enumerate() {
        if linked(member) && member.size() > 0 {
            tracker.register(FileId::of(member), index);
        }
    }
    if tracker.tracked_count() == 0 {
        return 0;
    }

    let mut aliased = 0;
    for index in 0..members.len() {
        let member = &members[index];
        if !linked(member) || member.size() > 0 {
            continue;
        }
        let Some(holder) = tracker.holder(FileId::of(member)) else {
            log::debug!("{}: hardlink placeholder without data", member.name());
            continue;
        };

        let twin = members[holder].clone();
        log::trace!("{}: sharing data of {}", members[index].name(), twin.name());
        members[index].alias_data(&twin);
        aliased += 1;
    }
    aliased
}
