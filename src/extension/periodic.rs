use itertools::Itertools;

use crate::misc::{DisjointSet, FloatingPoint, Table};

use super::{NurbsExtension, NurbsPatchMap};

impl<T: FloatingPoint> NurbsExtension<T> {
    /// Set the periodic boundary pairs and identify their dofs
    pub fn connect_boundaries_with(
        &mut self,
        masters: &[usize],
        slaves: &[usize],
    ) -> anyhow::Result<()> {
        self.master = masters.to_vec();
        self.slave = slaves.to_vec();
        self.connect_boundaries()
    }

    /// Last boundary patch carrying `attribute`
    fn find_bdr_patch(&self, attribute: usize) -> anyhow::Result<usize> {
        (0..self.num_bdr_patches())
            .rev()
            .find(|b| self.topology.bdr_attribute(*b) == attribute)
            .ok_or_else(|| anyhow::anyhow!("no boundary patch with attribute {}", attribute))
    }

    /// Identify the dofs of every master boundary with those of its slave.
    /// Rebuilds both dof tables, and carries the weights over when they cover the active dofs.
    pub fn connect_boundaries(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.master.len() == self.slave.len(),
            "{} master boundaries but {} slave boundaries",
            self.master.len(),
            self.slave.len()
        );
        if self.master.is_empty() {
            return Ok(());
        }

        let mut set = DisjointSet::new(self.dof_offsets.total);
        {
            let mut master_map = NurbsPatchMap::new(self);
            let mut slave_map = NurbsPatchMap::new(self);
            for (m, s) in self.master.iter().zip(self.slave.iter()) {
                let bm = self.find_bdr_patch(*m)?;
                let bs = self.find_bdr_patch(*s)?;
                if self.dimension() == 1 {
                    master_map.set_bdr_patch_dof_map(bm)?;
                    slave_map.set_bdr_patch_dof_map(bs)?;
                    set.union(master_map.get(&[]), slave_map.get(&[]));
                    continue;
                }

                let kvm = master_map.set_bdr_patch_dof_map(bm)?;
                let kvs = slave_map.set_bdr_patch_dof_map(bs)?;
                let n = kvm.len();
                for d in 0..n {
                    let (km, ks) = (kvm[d].0, kvs[d].0);
                    let matching = master_map.extent(d) == slave_map.extent(d)
                        && km.num_knot_spans() == ks.num_knot_spans()
                        && km.order() == ks.order()
                        && (0..km.num_knot_spans()).all(|i| km.is_element(i) == ks.is_element(i));
                    anyhow::ensure!(
                        matching,
                        "boundaries {} and {} do not match along direction {}",
                        m,
                        s,
                        d
                    );
                }

                let ranges = (0..n)
                    .map(|d| (0..=master_map.extent(d)).collect_vec())
                    .collect_vec();
                for pos in super::numbering::tensor_positions(&ranges) {
                    let pm = (0..n)
                        .map(|d| along(kvm[d].1, pos[d], master_map.extent(d)))
                        .collect_vec();
                    let ps = (0..n)
                        .map(|d| along(kvs[d].1, pos[d], slave_map.extent(d)))
                        .collect_vec();
                    set.union(master_map.get(&pm), slave_map.get(&ps));
                }
            }
        }

        let (alias, count) = set.compact();
        self.dof_alias = alias;
        self.num_dofs = count;
        log::debug!(
            "connected {} boundary pairs: {} of {} dofs remain",
            self.master.len(),
            count,
            self.dof_offsets.total
        );

        let carried = (!self.weights.is_empty() && self.weights.len() == self.num_active_dofs)
            .then(|| (self.el_dof.clone(), self.weights.clone()));

        self.generate_element_dof_table()?;
        self.generate_bdr_element_dof_table()?;

        if let Some((old_el_dof, old_weights)) = carried {
            self.weights = remap_weights(&old_el_dof, &self.el_dof, &old_weights, self.num_active_dofs);
        }
        Ok(())
    }
}

/// Position `i` counted along the boundary knot vector
fn along(okv: isize, i: usize, nx: usize) -> usize {
    if okv >= 0 {
        i
    } else {
        nx - i
    }
}

/// Carry per dof values from one element dof table to another over the same elements
fn remap_weights<T: FloatingPoint>(from: &Table, to: &Table, values: &[T], size: usize) -> Vec<T> {
    let mut out = vec![T::zero(); size];
    for (old, new) in from.rows().zip(to.rows()) {
        for (o, n) in old.iter().zip(new.iter()) {
            out[*n] = values[*o];
        }
    }
    out
}
