/// Start of the global numbering range owned by each topological entity.
///
/// Ranges are assigned vertices first, then edges, faces and patch interiors,
/// each range ending where the next one starts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityOffsets {
    pub vertex: Vec<usize>,
    pub edge: Vec<usize>,
    pub face: Vec<usize>,
    pub patch: Vec<usize>,
    /// One past the last assigned index
    pub total: usize,
}

impl EntityOffsets {
    /// The `[start, end)` ranges in assignment order
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::EntityOffsets;
    /// let offsets = EntityOffsets {
    ///     vertex: vec![0, 1],
    ///     edge: vec![2],
    ///     face: vec![],
    ///     patch: vec![4],
    ///     total: 7,
    /// };
    /// let ranges = offsets.ranges();
    /// assert_eq!(ranges, vec![(0, 1), (1, 2), (2, 4), (4, 7)]);
    /// ```
    pub fn ranges(&self) -> Vec<(usize, usize)> {
        let starts: Vec<usize> = self
            .vertex
            .iter()
            .chain(self.edge.iter())
            .chain(self.face.iter())
            .chain(self.patch.iter())
            .copied()
            .collect();
        starts
            .iter()
            .enumerate()
            .map(|(i, s)| (*s, starts.get(i + 1).copied().unwrap_or(self.total)))
            .collect()
    }
}
