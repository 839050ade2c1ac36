//! Disjoint-set forest over dense indices.

/// Union-find with path compression and union by rank.
///
/// Elements are `0..len`. Used to close accepted fuzzy pairs transitively:
/// if A~B and B~C were accepted, A, B and C end up in one set even when A~C
/// scored below the threshold.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    /// Creates `len` singleton sets.
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Returns true if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Returns the representative of `x`'s set, compressing the path.
    ///
    /// Returns `None` if `x` is out of range.
    pub fn find(&mut self, x: usize) -> Option<usize> {
        if x >= self.parent.len() {
            return None;
        }
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        Some(root)
    }

    /// Merges the sets of `a` and `b`.
    ///
    /// Returns true if two distinct sets were merged.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (Some(root_a), Some(root_b)) = (self.find(a), self.find(b)) else {
            return false;
        };
        if root_a == root_b {
            return false;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] = self.rank[root_a].saturating_add(1);
            }
        }
        true
    }

    /// Returns true if `a` and `b` are in the same set.
    pub fn connected(&mut self, a: usize, b: usize) -> bool {
        match (self.find(a), self.find(b)) {
            (Some(root_a), Some(root_b)) => root_a == root_b,
            _ => false,
        }
    }

    /// Returns every set with at least `min_size` members.
    ///
    /// Members are ascending within a set, and sets are ordered by their
    /// smallest member.
    pub fn groups(&mut self, min_size: usize) -> Vec<Vec<usize>> {
        let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); self.parent.len()];
        for x in 0..self.parent.len() {
            if let Some(root) = self.find(x) {
                by_root[root].push(x);
            }
        }
        let mut groups: Vec<Vec<usize>> = by_root
            .into_iter()
            .filter(|members| !members.is_empty() && members.len() >= min_size)
            .collect();
        groups.sort_by_key(|members| members.first().copied());
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons() {
        let mut set = DisjointSet::new(3);
        assert_eq!(set.len(), 3);
        assert!(!set.connected(0, 1));
        assert!(set.groups(2).is_empty());
        assert_eq!(set.groups(1).len(), 3);
    }

    #[test]
    fn test_union_is_transitive() {
        let mut set = DisjointSet::new(5);
        assert!(set.union(0, 1));
        assert!(set.union(1, 2));
        assert!(!set.union(0, 2));
        assert!(set.connected(0, 2));
        assert!(!set.connected(0, 3));
        assert_eq!(set.groups(2), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_groups_are_ordered_by_smallest_member() {
        let mut set = DisjointSet::new(6);
        set.union(5, 3);
        set.union(4, 1);
        set.union(1, 0);
        assert_eq!(set.groups(2), vec![vec![0, 1, 4], vec![3, 5]]);
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut set = DisjointSet::new(2);
        assert_eq!(set.find(7), None);
        assert!(!set.union(0, 7));
        assert!(!set.connected(0, 7));
    }

    #[test]
    fn test_long_chain_compresses() {
        let mut set = DisjointSet::new(10_000);
        for i in 1..10_000 {
            set.union(i - 1, i);
        }
        let root = set.find(9_999);
        assert_eq!(set.find(0), root);
        assert_eq!(set.groups(2).len(), 1);
    }
}
