/// Union-find over `0..n` with path compression.
///
/// `union(a, b)` always attaches the root of `a` below the root of `b`,
/// so the representative of a merged class is decided by the call order.
#[derive(Clone, Debug)]
pub struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, x: usize) -> usize {
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
        root
    }

    /// Merge the classes of `a` and `b`. Returns false if they were already merged.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        self.parent[ra] = rb;
        true
    }

    /// Dense renumbering of the classes.
    /// Returns `(map, count)` where classes are numbered by ascending representative.
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::DisjointSet;
    /// let mut set = DisjointSet::new(5);
    /// set.union(0, 3);
    /// set.union(4, 1);
    /// let (map, count) = set.compact();
    /// assert_eq!(count, 3);
    /// assert_eq!(map, vec![2, 0, 1, 2, 0]);
    /// ```
    pub fn compact(&mut self) -> (Vec<usize>, usize) {
        let n = self.parent.len();
        let roots: Vec<usize> = (0..n).map(|i| self.find(i)).collect();
        let mut ids = vec![usize::MAX; n];
        let mut count = 0;
        for r in 0..n {
            if roots[r] == r {
                ids[r] = count;
                count += 1;
            }
        }
        (roots.into_iter().map(|r| ids[r]).collect(), count)
    }
}

#[cfg(test)]
mod tests {
    use super::DisjointSet;

    #[test]
    fn chained_unions_share_a_root() {
        let mut set = DisjointSet::new(6);
        assert!(set.union(0, 1));
        assert!(set.union(1, 2));
        assert!(!set.union(0, 2));
        assert_eq!(set.find(0), set.find(2));
        assert_ne!(set.find(0), set.find(3));
        let (map, count) = set.compact();
        assert_eq!(count, 4);
        assert_eq!(map[0], map[2]);
        assert_eq!(map[3], map[2] + 1);
    }
}
