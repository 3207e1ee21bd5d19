use itertools::Itertools;

use crate::{
    knot::KnotVector,
    misc::{FloatingPoint, Invertible},
};

use super::NurbsExtension;

/// Local edges that carry the parametric directions of a patch
pub(crate) fn direction_edges(dimension: usize) -> &'static [usize] {
    match dimension {
        1 => &[0],
        2 => &[0, 1],
        _ => &[0, 3, 8],
    }
}

fn sign(k: isize) -> isize {
    if k >= 0 {
        1
    } else {
        -1
    }
}

impl<T: FloatingPoint> NurbsExtension<T> {
    /// Index of the unique knot vector of edge `e`
    pub fn knot_ind(&self, e: usize) -> usize {
        let k = self.topology.edge_to_knot(e);
        if k >= 0 {
            k as usize
        } else {
            (-1 - k) as usize
        }
    }

    /// Unique knot vector of edge `e`
    pub fn knot_vec(&self, e: usize) -> &KnotVector<T> {
        &self.knot_vectors[self.knot_ind(e)]
    }

    /// Unique knot vector of edge `e` traversed with orientation `oedge`,
    /// with the sign telling whether the knot vector runs along the traversal
    pub fn knot_vec_oriented(&self, e: usize, oedge: isize) -> (&KnotVector<T>, isize) {
        let okv = oedge * sign(self.topology.edge_to_knot(e));
        (self.knot_vec(e), okv)
    }

    /// Every edge refers to an existing knot vector
    pub(crate) fn check_knot_references(&self) -> anyhow::Result<()> {
        let mut used = vec![false; self.knot_vectors.len()];
        for e in 0..self.topology.num_edges() {
            let k = self.knot_ind(e);
            anyhow::ensure!(
                k < self.knot_vectors.len(),
                "edge {} refers to knot vector {} of {}",
                e,
                k,
                self.knot_vectors.len()
            );
            used[k] = true;
        }
        if let Some(k) = used.iter().position(|u| !u) {
            log::warn!("knot vector {} is not used by any edge", k);
        }
        for (k, kv) in self.knot_vectors.iter().enumerate() {
            anyhow::ensure!(
                kv.order() >= 1 && kv.num_elements() >= 1,
                "knot vector {} needs order >= 1 and at least one element, got order {} with {} elements",
                k,
                kv.order(),
                kv.num_elements()
            );
        }
        Ok(())
    }

    /// Signed knot index of every local edge of patch `p`, negated when traversed backwards
    fn signed_patch_edges(&self, p: usize) -> Vec<isize> {
        self.topology
            .element_edges(p)
            .into_iter()
            .map(|(e, o)| {
                let k = self.topology.edge_to_knot(e);
                if o < 0 {
                    -1 - k
                } else {
                    k
                }
            })
            .collect()
    }

    /// Opposite edges of every patch must carry the same knot vector in the same direction
    pub fn check_patches(&self) -> anyhow::Result<()> {
        let dim = self.dimension();
        if dim == 1 {
            return Ok(());
        }
        for p in 0..self.num_patches() {
            let e = self.signed_patch_edges(p);
            let consistent = if dim == 2 {
                e[0] == -1 - e[2] && e[1] == -1 - e[3]
            } else {
                [2, 4, 6].iter().all(|i| e[*i] == e[0])
                    && [3, 5, 7].iter().all(|i| e[*i] == e[1])
                    && [9, 10, 11].iter().all(|i| e[*i] == e[8])
            };
            anyhow::ensure!(
                consistent,
                "patch {}: inconsistent edge to knot mapping {:?}",
                p,
                e
            );
        }
        Ok(())
    }

    /// The first edges of every boundary patch must run along their knot vectors
    pub fn check_bdr_patches(&self) -> anyhow::Result<()> {
        let dim = self.dimension();
        if dim == 1 {
            return Ok(());
        }
        for b in 0..self.num_bdr_patches() {
            let edges = self.topology.bdr_element_edges(b);
            let signed = edges
                .iter()
                .take(dim - 1)
                .map(|(e, o)| {
                    let k = self.topology.edge_to_knot(*e);
                    if *o < 0 {
                        -1 - k
                    } else {
                        k
                    }
                })
                .collect_vec();
            anyhow::ensure!(
                signed.iter().all(|k| *k >= 0),
                "boundary patch {}: bad orientation {:?}",
                b,
                signed
            );
        }
        Ok(())
    }

    /// Per direction of patch `p`, `1` when the unique knot vector runs along the patch
    /// parametrization and `-1` when it runs against it
    pub fn check_kv_direction(&self, p: usize) -> Vec<isize> {
        let edges = self.topology.element_edges(p);
        direction_edges(self.dimension())
            .iter()
            .map(|i| {
                let (e, o) = edges[*i];
                o * sign(self.topology.edge_to_knot(e))
            })
            .collect()
    }

    /// Copy the unique knot vectors into the per patch view
    pub fn create_comprehensive_kv(&mut self) -> anyhow::Result<()> {
        let dim = self.dimension();
        let mut compr = Vec::with_capacity(self.num_patches() * dim);
        for p in 0..self.num_patches() {
            let kvdir = self.check_kv_direction(p);
            let edges = self.topology.element_edges(p);
            for (d, i) in direction_edges(dim).iter().enumerate() {
                let kv = self.knot_vec(edges[*i].0);
                compr.push(if kvdir[d] < 0 { kv.inverse() } else { kv.clone() });
            }
        }
        self.knot_vectors_compr = compr;
        anyhow::ensure!(self.consistent_kv_sets()?, "mismatch in knot vectors");
        Ok(())
    }

    /// Propagate changes of the per patch knot vectors back to the unique ones
    pub fn update_unique_kv(&mut self) -> anyhow::Result<()> {
        let dim = self.dimension();
        for p in 0..self.num_patches() {
            let kvdir = self.check_kv_direction(p);
            let edges = self.topology.element_edges(p);
            for (d, i) in direction_edges(dim).iter().enumerate() {
                let iun = self.knot_ind(edges[*i].0);
                let compr = &self.knot_vectors_compr[dim * p + d];
                let oriented = if kvdir[d] < 0 {
                    compr.inverse()
                } else {
                    compr.clone()
                };
                let unique = &self.knot_vectors[iun];
                let stale = unique.order() != oriented.order()
                    || !unique.difference(&oriented)?.is_empty();
                if stale {
                    self.knot_vectors[iun] = oriented;
                }
            }
        }
        anyhow::ensure!(self.consistent_kv_sets()?, "mismatch in knot vectors");
        Ok(())
    }

    /// Whether the per patch knot vectors agree with the unique ones
    pub fn consistent_kv_sets(&self) -> anyhow::Result<bool> {
        let dim = self.dimension();
        for p in 0..self.num_patches() {
            let kvdir = self.check_kv_direction(p);
            let edges = self.topology.element_edges(p);
            for (d, i) in direction_edges(dim).iter().enumerate() {
                let e = edges[*i].0;
                let unique = self.knot_vec(e);
                let compr = &self.knot_vectors_compr[dim * p + d];
                if unique.order() != compr.order() {
                    log::debug!(
                        "order of knot vector {} of patch {} does not agree with knot vector {}",
                        d,
                        p,
                        self.knot_ind(e)
                    );
                    return Ok(false);
                }
                let oriented = if kvdir[d] < 0 {
                    compr.inverse()
                } else {
                    compr.clone()
                };
                if !unique.difference(&oriented)?.is_empty() {
                    log::debug!(
                        "knot vector {} of patch {} does not agree with knot vector {}",
                        d,
                        p,
                        self.knot_ind(e)
                    );
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Knot vectors of patch `p` along its parametric directions
    pub fn patch_knot_vectors(&self, p: usize) -> &[KnotVector<T>] {
        let dim = self.dimension();
        &self.knot_vectors_compr[dim * p..dim * (p + 1)]
    }

    pub(crate) fn patch_knot_vectors_mut(&mut self, p: usize) -> &mut [KnotVector<T>] {
        let dim = self.dimension();
        &mut self.knot_vectors_compr[dim * p..dim * (p + 1)]
    }

    /// Unique knot vectors of boundary patch `b` with their orientation, empty in 1D
    pub fn bdr_patch_knot_vectors(&self, b: usize) -> Vec<(&KnotVector<T>, isize)> {
        let dim = self.dimension();
        if dim == 1 {
            return vec![];
        }
        self.topology
            .bdr_element_edges(b)
            .into_iter()
            .take(dim - 1)
            .map(|(e, o)| self.knot_vec_oriented(e, o))
            .collect()
    }

    pub fn set_orders_from_knot_vectors(&mut self) {
        self.orders = self.knot_vectors.iter().map(|kv| kv.order()).collect();
    }

    /// Order of every unique knot vector
    pub fn orders(&self) -> &[usize] {
        &self.orders
    }

    /// The common order of all knot vectors, `None` when they differ
    pub fn order(&self) -> Option<usize> {
        let first = *self.orders.first()?;
        self.orders.iter().all(|o| *o == first).then_some(first)
    }
}
