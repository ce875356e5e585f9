use std::collections::BTreeMap;

// Disjoint sets over facelet positions. Negative entries are roots holding
// minus the set size.
pub struct UnionFind {
    root: Vec<i32>,
}

impl UnionFind {
    pub fn new(len: usize) -> UnionFind {
        UnionFind { root: vec![-1; len] }
    }

    pub fn root(&self, mut p: usize) -> usize {
        while self.root[p] >= 0 {
            p = self.root[p] as usize;
        }
        p
    }

    pub fn join(&mut self, p: usize, q: usize) -> bool {
        let p = self.root(p);
        let q = self.root(q);
        if p == q {
            return false;
        }
        // union by size
        if self.root[p] < self.root[q] {
            self.root[p] += self.root[q];
            self.root[q] = p as i32;
        } else {
            self.root[q] += self.root[p];
            self.root[p] = q as i32;
        }
        true
    }

    // Every set as an ascending list of members, ordered by smallest member.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for p in 0..self.root.len() {
            by_root.entry(self.root(p)).or_default().push(p);
        }
        let mut groups: Vec<Vec<usize>> = by_root.into_values().collect();
        groups.sort_by_key(|g| g[0]);
        groups
    }
}
