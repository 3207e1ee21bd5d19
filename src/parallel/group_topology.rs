use std::collections::HashMap;

/// Groups of processor ranks that share dofs.
/// Group `0` is always the local rank alone, every other group lists its ranks sorted.
#[derive(Clone, Debug)]
pub struct GroupTopology {
    my_rank: usize,
    groups: Vec<Vec<usize>>,
    lookup: HashMap<Vec<usize>, usize>,
}

impl GroupTopology {
    pub fn new(my_rank: usize) -> Self {
        let local = vec![my_rank];
        Self {
            my_rank,
            groups: vec![local.clone()],
            lookup: HashMap::from([(local, 0)]),
        }
    }

    /// Id of the group formed by `ranks`, created on first use
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::GroupTopology;
    /// let mut topology = GroupTopology::new(1);
    /// assert_eq!(topology.insert(&[1]), 0);
    /// let shared = topology.insert(&[2, 1, 2]);
    /// assert_eq!(topology.insert(&[1, 2]), shared);
    /// assert_eq!(topology.group(shared), &[1, 2]);
    /// assert_eq!(topology.neighbors(), vec![2]);
    /// ```
    pub fn insert(&mut self, ranks: &[usize]) -> usize {
        let mut key = ranks.to_vec();
        key.sort_unstable();
        key.dedup();
        if let Some(id) = self.lookup.get(&key) {
            return *id;
        }
        let id = self.groups.len();
        self.groups.push(key.clone());
        self.lookup.insert(key, id);
        id
    }

    pub fn group(&self, id: usize) -> &[usize] {
        &self.groups[id]
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn my_rank(&self) -> usize {
        self.my_rank
    }

    /// Every other rank that shares a group with this one, sorted
    pub fn neighbors(&self) -> Vec<usize> {
        let mut ranks: Vec<usize> = self
            .groups
            .iter()
            .flatten()
            .copied()
            .filter(|r| *r != self.my_rank)
            .collect();
        ranks.sort_unstable();
        ranks.dedup();
        ranks
    }
}
