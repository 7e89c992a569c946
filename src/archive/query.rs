//! Archive query methods.
//!
//! Queries only look at the in-memory catalog, so they never touch the
//! stream and keep working after the archive is closed.

use super::{Archive, ArchiveInfo};
use crate::Member;

impl<S> Archive<S> {
    /// Returns information about the archive.
    pub fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    /// Returns all members in catalog order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Iterates over the members in catalog order.
    pub fn iter(&self) -> std::slice::Iter<'_, Member> {
        self.members.iter()
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the archive has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Finds a member by name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name() == name)
    }

    /// Returns true if a member with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.member(name).is_some()
    }

    /// Returns the member names in catalog order.
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(Member::name).collect()
    }
}

impl<'a, S> IntoIterator for &'a Archive<S> {
    type Item = &'a Member;
    type IntoIter = std::slice::Iter<'a, Member>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
