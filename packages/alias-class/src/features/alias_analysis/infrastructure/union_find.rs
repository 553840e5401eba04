//! Union-Find (Disjoint Set Union) Data Structure
//!
//! - Path compression on `root`, read-only `find` for queries
//! - Union by rank with per-root set sizes
//! - Members of a set threaded on a circular list, so enumerating a set
//!   costs its size rather than the universe
//!
//! Used twice per function: over version indices (assign sets) and over
//! descriptor indices (alias sets).
//!
//! # References
//! - Tarjan, R. E. "Efficiency of a Good But Not Linear Set Union Algorithm" (1975)
//! - Steensgaard, B. "Points-to Analysis in Almost Linear Time" (POPL 1996)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnionFind {
    /// Parent pointers (self-loop = root)
    parent: Vec<u32>,

    /// Rank (tree height upper bound) for union by rank
    rank: Vec<u8>,

    /// Size of each set (only valid for roots)
    size: Vec<u32>,

    /// Circular member list; splicing two rings merges the sets
    next: Vec<u32>,

    /// Number of disjoint sets
    set_count: usize,
}

impl UnionFind {
    /// Create a Union-Find with n singleton elements (0..n-1)
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            rank: vec![0; n],
            size: vec![1; n],
            next: (0..n as u32).collect(),
            set_count: n,
        }
    }

    /// Create an empty Union-Find (for dynamic element addition)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register `x` (and any gap below it) as a singleton if absent
    pub fn new_member(&mut self, x: u32) {
        let idx = x as usize;
        let old_len = self.parent.len();
        if idx < old_len {
            return;
        }
        let new_len = idx + 1;
        self.parent.extend(old_len as u32..new_len as u32);
        self.next.extend(old_len as u32..new_len as u32);
        self.rank.resize(new_len, 0);
        self.size.resize(new_len, 1);
        self.set_count += new_len - old_len;
    }

    #[inline]
    fn check(&self, x: u32) {
        assert!(
            (x as usize) < self.parent.len(),
            "union-find member {} not registered (len {})",
            x,
            self.parent.len()
        );
    }

    /// Representative of `x`, compressing the path
    ///
    /// Complexity: O(α(n)) amortized
    pub fn root(&mut self, x: u32) -> u32 {
        self.check(x);
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut current = x;
        while self.parent[current as usize] != root {
            let up = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = up;
        }
        root
    }

    /// Representative of `x` without modifying the structure
    #[inline]
    pub fn find(&self, x: u32) -> u32 {
        self.check(x);
        let mut current = x;
        while self.parent[current as usize] != current {
            current = self.parent[current as usize];
        }
        current
    }

    /// Union two sets by rank; returns the new representative
    pub fn union(&mut self, x: u32, y: u32) -> u32 {
        let root_x = self.root(x);
        let root_y = self.root(y);

        if root_x == root_y {
            return root_x;
        }

        let rx = root_x as usize;
        let ry = root_y as usize;

        // attach smaller tree under larger
        let new_root = if self.rank[rx] < self.rank[ry] {
            self.parent[rx] = root_y;
            self.size[ry] += self.size[rx];
            root_y
        } else if self.rank[rx] > self.rank[ry] {
            self.parent[ry] = root_x;
            self.size[rx] += self.size[ry];
            root_x
        } else {
            self.parent[ry] = root_x;
            self.size[rx] += self.size[ry];
            self.rank[rx] += 1;
            root_x
        };

        self.next.swap(rx, ry);
        self.set_count -= 1;
        new_root
    }

    #[inline]
    pub fn connected(&self, x: u32, y: u32) -> bool {
        self.find(x) == self.find(y)
    }

    /// Size of the set containing x
    #[inline]
    pub fn set_size(&self, x: u32) -> u32 {
        self.size[self.find(x) as usize]
    }

    /// Number of disjoint sets
    #[inline]
    pub fn count(&self) -> usize {
        self.set_count
    }

    /// Total number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Members of x's set, ascending
    pub fn members(&self, x: u32) -> Vec<u32> {
        self.check(x);
        let mut out = vec![x];
        let mut current = self.next[x as usize];
        while current != x {
            out.push(current);
            current = self.next[current as usize];
        }
        out.sort_unstable();
        out
    }

    /// All roots (set representatives), ascending
    pub fn roots(&self) -> Vec<u32> {
        (0..self.parent.len())
            .filter(|&i| self.parent[i] == i as u32)
            .map(|i| i as u32)
            .collect()
    }

    /// Every set, as ascending member lists ordered by smallest member
    pub fn groups(&self) -> Vec<Vec<u32>> {
        let mut groups: Vec<Vec<u32>> = self.roots().into_iter().map(|r| self.members(r)).collect();
        groups.sort_unstable_by_key(|g| g[0]);
        groups
    }

    /// Split every set back into singletons, keeping the universe
    pub fn reinit(&mut self) {
        let n = self.parent.len();
        *self = Self::new(n);
    }
}
