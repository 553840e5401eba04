//! Sets shared by every member
//!
//! A partition is frozen into one set per non-singleton group; each member
//! stores only the handle of its group's set, so the set is never copied.

use crate::shared::models::ArenaIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Handle of one shared set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SetHandle(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSets<T: Ord> {
    sets: Vec<BTreeSet<T>>,
    owner: Vec<Option<SetHandle>>,
}

impl<T: ArenaIndex> Default for SharedSets<T> {
    fn default() -> Self {
        Self {
            sets: Vec::new(),
            owner: Vec::new(),
        }
    }
}

impl<T: ArenaIndex> SharedSets<T> {
    /// Freeze `groups` over a universe of `len` members; singleton groups get no set
    pub fn from_groups<I>(len: usize, groups: I) -> Self
    where
        I: IntoIterator<Item = Vec<T>>,
    {
        let mut sets = Vec::new();
        let mut owner = vec![None; len];
        for group in groups {
            if group.len() < 2 {
                continue;
            }
            let handle = SetHandle(sets.len() as u32);
            for member in &group {
                if let Some(slot) = owner.get_mut(member.index()) {
                    *slot = Some(handle);
                }
            }
            sets.push(group.into_iter().collect());
        }
        Self { sets, owner }
    }

    pub fn handle(&self, member: T) -> Option<SetHandle> {
        self.owner.get(member.index()).copied().flatten()
    }

    /// Shared set of `member`, `None` for singletons
    pub fn set_of(&self, member: T) -> Option<&BTreeSet<T>> {
        self.handle(member).map(|h| &self.sets[h.0 as usize])
    }

    /// Members of `member`'s group, itself included
    pub fn members(&self, member: T) -> Vec<T> {
        match self.set_of(member) {
            Some(set) => set.iter().copied().collect(),
            None => vec![member],
        }
    }

    pub fn same_set(&self, a: T, b: T) -> bool {
        a == b || matches!((self.handle(a), self.handle(b)), (Some(x), Some(y)) if x == y)
    }

    pub fn sets(&self) -> impl Iterator<Item = &BTreeSet<T>> {
        self.sets.iter()
    }

    /// Number of non-singleton sets
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::OstIdx;

    #[test]
    fn test_members_share_one_set() {
        let o = OstIdx;
        let sets = SharedSets::from_groups(5, vec![vec![o(0), o(3)], vec![o(1)], vec![o(2), o(4)]]);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets.handle(o(0)), sets.handle(o(3)));
        assert!(std::ptr::eq(sets.set_of(o(0)).unwrap(), sets.set_of(o(3)).unwrap()));
        assert!(sets.set_of(o(1)).is_none());
        assert_eq!(sets.members(o(1)), vec![o(1)]);
        assert!(sets.same_set(o(2), o(4)));
        assert!(!sets.same_set(o(0), o(4)));
        assert!(sets.same_set(o(1), o(1)));
    }
}
