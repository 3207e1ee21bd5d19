use itertools::Itertools;

use crate::misc::{FloatingPoint, Table};

use super::{numbering::tensor_positions, NurbsExtension, NurbsPatchMap};

/// Element spans of a knot vector, skipping zero length knot spans
fn element_spans<T: FloatingPoint>(kv: &crate::knot::KnotVector<T>) -> Vec<usize> {
    (0..kv.num_knot_spans()).filter(|s| kv.is_element(*s)).collect()
}

/// Pad a tensor position to three entries
fn padded(ijk: &[isize]) -> [isize; 3] {
    let mut out = [0; 3];
    out[..ijk.len()].copy_from_slice(ijk);
    out
}

impl<T: FloatingPoint> NurbsExtension<T> {
    /// Reset the dof identification, every dof is its own
    pub fn init_dof_map(&mut self) {
        self.dof_alias.clear();
        self.num_dofs = self.dof_offsets.total;
    }

    /// The dof that `g` is identified with
    pub fn dof_map(&self, g: usize) -> usize {
        if self.dof_alias.is_empty() {
            g
        } else {
            self.dof_alias[g]
        }
    }

    pub(crate) fn active_dof(&self, d: usize) -> anyhow::Result<usize> {
        self.active_dofs
            .get(d)
            .copied()
            .flatten()
            .ok_or_else(|| anyhow::anyhow!("dof {} is not active", d))
    }

    /// Dofs of every element in global element order, inactive elements included
    pub(crate) fn element_dofs(&self) -> anyhow::Result<Vec<(usize, Vec<usize>, Vec<usize>)>> {
        let mut rows = Vec::with_capacity(self.num_elements);
        let mut map = NurbsPatchMap::new(self);
        for p in 0..self.num_patches() {
            let kv = map.set_patch_dof_map(p)?;
            let spans = kv.iter().map(element_spans).collect_vec();
            let stencil = tensor_positions(&kv.iter().map(|k| (0..=k.order()).collect_vec()).collect_vec());
            for ijk in tensor_positions(&spans) {
                let dofs = stencil
                    .iter()
                    .map(|l| {
                        let pos = ijk.iter().zip(l.iter()).map(|(s, l)| s + l).collect_vec();
                        self.dof_map(map.get(&pos))
                    })
                    .collect_vec();
                rows.push((p, ijk, dofs));
            }
        }
        Ok(rows)
    }

    /// Build the element to active dof table and the element to patch maps
    pub fn generate_element_dof_table(&mut self) -> anyhow::Result<()> {
        let rows = self.element_dofs()?;
        anyhow::ensure!(
            rows.len() == self.num_elements,
            "found {} elements, expected {}",
            rows.len(),
            self.num_elements
        );

        let mut active = vec![false; self.num_dofs];
        let mut el_dof = vec![];
        self.el_to_patch.clear();
        self.el_to_ijk.clear();
        self.patch_to_el = vec![vec![]; self.num_patches()];
        for (g, (p, ijk, dofs)) in rows.into_iter().enumerate() {
            if !self.active_elements[g] {
                continue;
            }
            for d in dofs.iter() {
                active[*d] = true;
            }
            self.patch_to_el[p].push(el_dof.len());
            self.el_to_patch.push(p);
            self.el_to_ijk
                .push(padded(&ijk.iter().map(|i| *i as isize).collect_vec()));
            el_dof.push(dofs);
        }

        let mut count = 0;
        self.active_dofs = active
            .into_iter()
            .map(|a| {
                a.then(|| {
                    count += 1;
                    count - 1
                })
            })
            .collect();
        self.num_active_dofs = count;

        for row in el_dof.iter_mut() {
            for d in row.iter_mut() {
                *d = self.active_dof(*d)?;
            }
        }
        self.el_dof = Table::from_rows(el_dof);
        log::trace!(
            "element dof table: {} elements over {} active dofs",
            self.el_dof.num_rows(),
            self.num_active_dofs
        );
        Ok(())
    }

    /// Element to dof table over every element, without active compaction
    pub fn global_element_dof_table(&self) -> anyhow::Result<Table> {
        let rows = self.element_dofs()?;
        Ok(Table::from_rows(
            rows.into_iter().map(|(_, _, dofs)| dofs).collect(),
        ))
    }

    /// Build the boundary element to active dof table.
    /// Positions along a boundary knot vector that runs against the boundary cell
    /// are counted from the far end, and their `ijk` entries are stored as `-1 - s`.
    pub fn generate_bdr_element_dof_table(&mut self) -> anyhow::Result<()> {
        let mut bel_dof = vec![];
        self.bel_to_patch.clear();
        self.bel_to_ijk.clear();
        self.patch_to_bel = vec![vec![]; self.num_bdr_patches()];

        {
            let mut map = NurbsPatchMap::new(self);
            let mut g = 0;
            let mut rows = vec![];
            for b in 0..self.num_bdr_patches() {
                if self.dimension() == 1 {
                    map.set_bdr_patch_dof_map(b)?;
                    if self.active_bdr_elements[g] {
                        rows.push((b, [0; 3], vec![self.dof_map(map.get(&[]))]));
                    }
                    g += 1;
                    continue;
                }
                let kv = map.set_bdr_patch_dof_map(b)?;
                let nx = (0..kv.len()).map(|d| map.extent(d)).collect_vec();
                let spans = kv.iter().map(|(k, _)| element_spans(k)).collect_vec();
                let stencil = tensor_positions(
                    &kv.iter()
                        .map(|(k, _)| (0..=k.order()).collect_vec())
                        .collect_vec(),
                );
                for s in tensor_positions(&spans) {
                    if self.active_bdr_elements[g] {
                        let dofs = stencil
                            .iter()
                            .map(|l| {
                                let pos = (0..kv.len())
                                    .map(|d| {
                                        if kv[d].1 >= 0 {
                                            s[d] + l[d]
                                        } else {
                                            nx[d] - s[d] - l[d]
                                        }
                                    })
                                    .collect_vec();
                                self.dof_map(map.get(&pos))
                            })
                            .collect_vec();
                        let ijk = (0..kv.len())
                            .map(|d| {
                                if kv[d].1 >= 0 {
                                    s[d] as isize
                                } else {
                                    -1 - s[d] as isize
                                }
                            })
                            .collect_vec();
                        rows.push((b, padded(&ijk), dofs));
                    }
                    g += 1;
                }
            }

            for (b, ijk, dofs) in rows {
                let dofs = dofs
                    .into_iter()
                    .map(|d| self.active_dof(d))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                self.patch_to_bel[b].push(bel_dof.len());
                self.bel_to_patch.push(b);
                self.bel_to_ijk.push(ijk);
                bel_dof.push(dofs);
            }
        }
        self.bel_dof = Table::from_rows(bel_dof);
        Ok(())
    }

    /// Identified dofs of the full control point grid of patch `p`, first direction fastest
    pub fn patch_dofs(&self, p: usize) -> anyhow::Result<Vec<usize>> {
        let mut map = NurbsPatchMap::new(self);
        let kv = map.set_patch_dof_map(p)?;
        let ranges = kv.iter().map(|k| (0..k.ncp()).collect_vec()).collect_vec();
        Ok(tensor_positions(&ranges)
            .iter()
            .map(|pos| self.dof_map(map.get(pos)))
            .collect())
    }

    /// Knot span position of active element `e` within its patch, padded with zeros
    pub fn element_ijk(&self, e: usize) -> [isize; 3] {
        self.el_to_ijk[e]
    }

    /// Knot span position of active boundary element `b`, negative entries run backwards
    pub fn bdr_element_ijk(&self, b: usize) -> [isize; 3] {
        self.bel_to_ijk[b]
    }

    /// Active dof of every control point of patch `p`
    pub(crate) fn patch_active_dofs(&self, p: usize) -> anyhow::Result<Vec<usize>> {
        self.patch_dofs(p)?
            .into_iter()
            .map(|d| self.active_dof(d))
            .collect()
    }
}
