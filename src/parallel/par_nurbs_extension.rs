use std::ops::{Deref, DerefMut};

use crate::{
    extension::NurbsExtension,
    misc::{FloatingPoint, Table},
};

use super::GroupTopology;

impl<T: FloatingPoint> NurbsExtension<T> {
    /// Keep the elements assigned to `my_rank`, and the boundary elements flagged in `active_bel`
    pub(crate) fn set_active(
        &mut self,
        my_rank: usize,
        partitioning: &[usize],
        active_bel: Option<&[bool]>,
    ) -> anyhow::Result<()> {
        anyhow::ensure!(
            partitioning.len() == self.num_elements,
            "partitioning covers {} elements, the mesh has {}",
            partitioning.len(),
            self.num_elements
        );
        self.active_elements = partitioning.iter().map(|r| *r == my_rank).collect();
        self.num_active_elements = self.active_elements.iter().filter(|a| **a).count();

        match active_bel {
            Some(active) => {
                anyhow::ensure!(
                    active.len() == self.num_bdr_elements,
                    "{} boundary element flags for {} boundary elements",
                    active.len(),
                    self.num_bdr_elements
                );
                self.active_bdr_elements = active.to_vec();
                self.num_active_bdr_elements = active.iter().filter(|a| **a).count();
            }
            None => self.generate_active_bdr_elems(),
        }
        Ok(())
    }
}

/// The part of a NURBS mesh owned by one processor rank.
///
/// Local dofs are the active dofs of the elements assigned to the rank,
/// each one tagged with the group of ranks whose elements touch it.
#[derive(Debug)]
pub struct ParNurbsExtension<T> {
    ext: NurbsExtension<T>,
    /// Rank of every element of the global mesh
    partitioning: Option<Vec<usize>>,
    group_topology: GroupTopology,
    ldof_group: Vec<usize>,
}

impl<T: FloatingPoint> Clone for ParNurbsExtension<T> {
    fn clone(&self) -> Self {
        Self {
            ext: self.ext.clone(),
            partitioning: self.partitioning.clone(),
            group_topology: self.group_topology.clone(),
            ldof_group: self.ldof_group.clone(),
        }
    }
}

impl<T> Deref for ParNurbsExtension<T> {
    type Target = NurbsExtension<T>;

    fn deref(&self) -> &Self::Target {
        &self.ext
    }
}

impl<T> DerefMut for ParNurbsExtension<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ext
    }
}

impl<T: FloatingPoint> ParNurbsExtension<T> {
    /// Restrict a serial extension to the elements of `my_rank`.
    /// The parent must have every element active and own its topology, which moves to the result.
    pub fn try_new(
        my_rank: usize,
        parent: &mut NurbsExtension<T>,
        partitioning: &[usize],
        active_bel: Option<&[bool]>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            parent.num_active_elements() == parent.num_elements(),
            "the parent extension must have every element active"
        );
        anyhow::ensure!(
            parent.owns_topology,
            "the parent extension does not own its patch topology"
        );

        let mut ext = NurbsExtension::empty(parent.topology.clone(), true);
        ext.knot_vectors = parent.knot_vectors.clone();
        ext.create_comprehensive_kv()?;
        ext.set_orders_from_knot_vectors();
        ext.generate_offsets()?;
        ext.count_elements();
        ext.count_bdr_elements();

        ext.set_active(my_rank, partitioning, active_bel)?;
        ext.generate_active_vertices()?;
        ext.init_dof_map();
        ext.master = parent.master.clone();
        ext.slave = parent.slave.clone();
        ext.generate_element_dof_table()?;
        ext.generate_bdr_element_dof_table()?;
        ext.connect_boundaries()?;

        let mut par = Self {
            ext,
            partitioning: Some(partitioning.to_vec()),
            group_topology: GroupTopology::new(my_rank),
            ldof_group: vec![],
        };
        par.build_groups(partitioning, &parent.el_dof)?;
        par.ext.weights = par.extract_weights(&parent.weights)?;
        parent.owns_topology = false;
        log::debug!(
            "rank {}: {} of {} elements, {} local dofs in {} groups",
            my_rank,
            par.num_active_elements(),
            par.num_elements(),
            par.num_active_dofs(),
            par.group_topology.num_groups()
        );
        Ok(par)
    }

    /// Distribute a refined or elevated copy of the mesh of `par_parent` the same way.
    /// `parent` is either already restricted to the local elements or covers the whole mesh,
    /// in which case every element must be active.
    pub fn try_from_refined(parent: NurbsExtension<T>, par_parent: &Self) -> anyhow::Result<Self> {
        let Some(partitioning) = par_parent.partitioning.clone() else {
            anyhow::bail!("the distributed parent has no partitioning");
        };
        let my_rank = par_parent.group_topology.my_rank();
        let mut ext = parent;
        if ext.num_active_elements != par_parent.num_active_elements {
            anyhow::ensure!(
                ext.num_active_elements == ext.num_elements,
                "the refined extension must have every element active"
            );
            let global_weights = std::mem::take(&mut ext.weights);
            ext.set_active(my_rank, &partitioning, Some(&par_parent.active_bdr_elements))?;
            ext.generate_active_vertices()?;
            ext.generate_element_dof_table()?;
            ext.generate_bdr_element_dof_table()?;

            let mut par = Self {
                ext,
                partitioning: Some(partitioning.clone()),
                group_topology: GroupTopology::new(my_rank),
                ldof_group: vec![],
            };
            par.ext.weights = par.extract_weights(&global_weights)?;
            let global = par.global_element_dof_table()?;
            par.build_groups(&partitioning, &global)?;
            return Ok(par);
        }

        let mut par = Self {
            ext,
            partitioning: Some(partitioning.clone()),
            group_topology: GroupTopology::new(my_rank),
            ldof_group: vec![],
        };
        let global = par.global_element_dof_table()?;
        par.build_groups(&partitioning, &global)?;
        Ok(par)
    }

    /// Weights of the local dofs picked from weights over every dof
    fn extract_weights(&self, global: &[T]) -> anyhow::Result<Vec<T>> {
        let mut weights = vec![T::zero(); self.num_active_dofs];
        for (d, l) in self.active_dofs.iter().enumerate() {
            if let Some(l) = l {
                weights[*l] = *global
                    .get(d)
                    .ok_or_else(|| anyhow::anyhow!("no global weight for dof {}", d))?;
            }
        }
        Ok(weights)
    }

    /// Tag every local dof with the group of ranks whose elements touch it.
    /// `global_el_dof` lists the dofs of every element of the global mesh.
    fn build_groups(&mut self, partitioning: &[usize], global_el_dof: &Table) -> anyhow::Result<()> {
        anyhow::ensure!(
            global_el_dof.num_rows() == partitioning.len(),
            "{} elements in the dof table, {} in the partitioning",
            global_el_dof.num_rows(),
            partitioning.len()
        );
        let dof_el = global_el_dof.transpose(self.num_dofs);
        let mut ldof_group = vec![0; self.num_active_dofs];
        for d in 0..self.num_dofs {
            if let Some(l) = self.active_dofs[d] {
                let ranks: Vec<usize> = dof_el.row(d).iter().map(|e| partitioning[*e]).collect();
                ldof_group[l] = self.group_topology.insert(&ranks);
            }
        }
        self.ldof_group = ldof_group;
        Ok(())
    }

    pub fn partitioning(&self) -> Option<&[usize]> {
        self.partitioning.as_deref()
    }

    pub fn group_topology(&self) -> &GroupTopology {
        &self.group_topology
    }

    /// Group of every local dof
    pub fn ldof_groups(&self) -> &[usize] {
        &self.ldof_group
    }

    pub fn group_of_ldof(&self, l: usize) -> usize {
        self.ldof_group[l]
    }

    pub fn into_inner(self) -> NurbsExtension<T> {
        self.ext
    }
}
