//! Identity tracking for hardlinked members.

use std::collections::HashMap;

use crate::Member;

/// Platform-independent file identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    /// Device number.
    pub device: u64,
    /// Inode number.
    pub inode: u64,
}

impl FileId {
    /// Returns the identity of a member.
    pub fn of(member: &Member) -> Self {
        Self {
            device: member.dev,
            inode: member.ino,
        }
    }
}

/// Maps file identities to the catalog index of the member holding the data.
///
/// The first data-bearing member registered for an identity wins; later
/// registrations of the same identity are ignored.
#[derive(Debug, Default)]
pub struct HardLinkTracker {
    data_holders: HashMap<FileId, usize>,
}

impl HardLinkTracker {
    /// Creates a new hard link tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the member at `index` carries the data for `id`.
    pub fn register(&mut self, id: FileId, index: usize) {
        self.data_holders.entry(id).or_insert(index);
    }

    /// Returns the index of the data-bearing member for `id`, if one was seen.
    pub fn holder(&self, id: FileId) -> Option<usize> {
        self.data_holders.get(&id).copied()
    }

    /// Returns the number of tracked identities.
    pub fn tracked_count(&self) -> usize {
        self.data_holders.len()
    }
}
