use std::rc::Rc;

use crate::{
    knot::KnotVector,
    misc::{FloatingPoint, Table},
    patch::NurbsPatch,
    topology::PatchTopology,
};

use super::EntityOffsets;

/// Multi-patch NURBS mesh with a globally consistent numbering of vertices and dofs.
///
/// The coarse `PatchTopology` describes how patches meet. Every topology edge refers to
/// one of the unique knot vectors, and every (patch, direction) pair has its own
/// comprehensive copy oriented along the patch parametrization.
/// Numbering ranges are assigned vertex first, then to edges, faces and patch interiors.
///
/// The topology is shared through an `Rc`, but exactly one extension owns it at a time.
/// Ownership moves with `try_transfer_topology_ownership`.
#[derive(Debug)]
pub struct NurbsExtension<T> {
    pub(crate) topology: Rc<PatchTopology>,
    pub(crate) owns_topology: bool,

    pub(crate) orders: Vec<usize>,
    /// One knot vector per distinct patch boundary curve
    pub(crate) knot_vectors: Vec<KnotVector<T>>,
    /// `dimension` knot vectors per patch, oriented along the patch directions
    pub(crate) knot_vectors_compr: Vec<KnotVector<T>>,

    pub(crate) mesh_offsets: EntityOffsets,
    pub(crate) dof_offsets: EntityOffsets,

    pub(crate) num_elements: usize,
    pub(crate) num_bdr_elements: usize,
    /// Number of dofs after periodic identification
    pub(crate) num_dofs: usize,

    pub(crate) active_elements: Vec<bool>,
    pub(crate) num_active_elements: usize,
    pub(crate) active_bdr_elements: Vec<bool>,
    pub(crate) num_active_bdr_elements: usize,
    pub(crate) active_vertices: Vec<Option<usize>>,
    pub(crate) num_active_vertices: usize,
    pub(crate) active_dofs: Vec<Option<usize>>,
    pub(crate) num_active_dofs: usize,

    /// Periodic alias of every dof, empty when no boundaries are connected
    pub(crate) dof_alias: Vec<usize>,
    pub(crate) master: Vec<usize>,
    pub(crate) slave: Vec<usize>,

    pub(crate) el_dof: Table,
    pub(crate) bel_dof: Table,
    pub(crate) el_to_patch: Vec<usize>,
    pub(crate) bel_to_patch: Vec<usize>,
    pub(crate) el_to_ijk: Vec<[isize; 3]>,
    pub(crate) bel_to_ijk: Vec<[isize; 3]>,
    pub(crate) patch_to_el: Vec<Vec<usize>>,
    pub(crate) patch_to_bel: Vec<Vec<usize>>,

    /// One weight per active dof
    pub(crate) weights: Vec<T>,
    pub(crate) patches: Vec<NurbsPatch<T>>,
}

impl<T: FloatingPoint> NurbsExtension<T> {
    /// An extension over `topology` with no knot vectors yet
    pub(crate) fn empty(topology: Rc<PatchTopology>, owns_topology: bool) -> Self {
        Self {
            topology,
            owns_topology,
            orders: vec![],
            knot_vectors: vec![],
            knot_vectors_compr: vec![],
            mesh_offsets: EntityOffsets::default(),
            dof_offsets: EntityOffsets::default(),
            num_elements: 0,
            num_bdr_elements: 0,
            num_dofs: 0,
            active_elements: vec![],
            num_active_elements: 0,
            active_bdr_elements: vec![],
            num_active_bdr_elements: 0,
            active_vertices: vec![],
            num_active_vertices: 0,
            active_dofs: vec![],
            num_active_dofs: 0,
            dof_alias: vec![],
            master: vec![],
            slave: vec![],
            el_dof: Table::default(),
            bel_dof: Table::default(),
            el_to_patch: vec![],
            bel_to_patch: vec![],
            el_to_ijk: vec![],
            bel_to_ijk: vec![],
            patch_to_el: vec![],
            patch_to_bel: vec![],
            weights: vec![],
            patches: vec![],
        }
    }

    /// Build an extension over an owned topology from its unique knot vectors.
    /// Every element is active and all weights are one.
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::*;
    /// let quad = Cell::try_new(1, Geometry::Square, vec![0, 1, 2, 3]).unwrap();
    /// let topology = PatchTopology::try_new(
    ///     2,
    ///     4,
    ///     vec![quad],
    ///     vec![],
    ///     &[(0, 0, 1), (1, 1, 2), (0, 3, 2), (1, 0, 3)],
    /// )
    /// .unwrap();
    /// let kv = KnotVector::<f64>::uniform(2, 3).unwrap();
    /// let ext = NurbsExtension::try_new(topology, vec![kv.clone(), kv]).unwrap();
    /// assert_eq!(ext.num_elements(), 9);
    /// assert_eq!(ext.num_active_dofs(), 25);
    /// ```
    pub fn try_new(topology: PatchTopology, knot_vectors: Vec<KnotVector<T>>) -> anyhow::Result<Self> {
        let mut ext = Self::empty(Rc::new(topology), true);
        ext.check_patches()?;
        ext.knot_vectors = knot_vectors;
        ext.check_knot_references()?;
        ext.build_all_active()?;
        ext.weights = vec![T::one(); ext.num_active_dofs];
        ext.connect_boundaries()?;
        Ok(ext)
    }

    /// Run the pipeline from the comprehensive knot vectors down to the boundary dof table,
    /// with every element active
    pub(crate) fn build_all_active(&mut self) -> anyhow::Result<()> {
        self.create_comprehensive_kv()?;
        self.set_orders_from_knot_vectors();
        self.generate_offsets()?;
        self.count_elements();
        self.count_bdr_elements();
        self.set_all_elements_active();
        self.generate_active_vertices()?;
        self.init_dof_map();
        self.generate_element_dof_table()?;
        self.generate_active_bdr_elems();
        self.generate_bdr_element_dof_table()?;
        Ok(())
    }

    pub(crate) fn set_all_elements_active(&mut self) {
        self.active_elements = vec![true; self.num_elements];
        self.num_active_elements = self.num_elements;
    }

    /// Extension of the same mesh with every knot vector elevated to at least `order`
    pub fn from_parent_with_order(parent: &Self, order: usize) -> anyhow::Result<Self> {
        let orders = vec![order; parent.num_knot_vectors()];
        Self::elevated(parent, &orders)
    }

    /// Extension of the same mesh with knot vector `i` elevated to `orders[i]`
    pub fn from_parent_with_orders(parent: &Self, orders: &[usize]) -> anyhow::Result<Self> {
        anyhow::ensure!(
            orders.len() == parent.num_knot_vectors(),
            "expected {} orders, got {}",
            parent.num_knot_vectors(),
            orders.len()
        );
        Self::elevated(parent, orders)
    }

    fn elevated(parent: &Self, orders: &[usize]) -> anyhow::Result<Self> {
        let mut ext = Self::empty(parent.topology.clone(), false);
        ext.knot_vectors = parent
            .knot_vectors
            .iter()
            .zip(orders.iter())
            .map(|(kv, order)| {
                if *order > kv.order() {
                    kv.degree_elevate(order - kv.order())
                } else {
                    Ok(kv.clone())
                }
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        ext.create_comprehensive_kv()?;
        ext.set_orders_from_knot_vectors();

        ext.num_elements = parent.num_elements;
        ext.num_bdr_elements = parent.num_bdr_elements;
        ext.generate_offsets()?;

        ext.active_vertices = parent.active_vertices.clone();
        ext.num_active_vertices = parent.num_active_vertices;
        ext.active_elements = parent.active_elements.clone();
        ext.num_active_elements = parent.num_active_elements;
        ext.active_bdr_elements = parent.active_bdr_elements.clone();
        ext.num_active_bdr_elements = parent.num_active_bdr_elements;

        ext.init_dof_map();
        ext.generate_element_dof_table()?;
        ext.generate_bdr_element_dof_table()?;
        ext.weights = vec![T::one(); ext.num_active_dofs];

        ext.master = parent.master.clone();
        ext.slave = parent.slave.clone();
        ext.connect_boundaries()?;
        log::debug!(
            "elevated extension: {} dofs, {} active",
            ext.num_dofs,
            ext.num_active_dofs
        );
        Ok(ext)
    }

    /// Reassemble a serial extension from the pieces of a partitioned run.
    /// The first piece must own the topology, ownership moves to the result.
    /// Weights are gathered through the pieces' local to global element maps.
    pub fn try_merge(pieces: &mut [&mut Self]) -> anyhow::Result<Self> {
        let Some(first) = pieces.first() else {
            anyhow::bail!("no pieces to merge");
        };
        anyhow::ensure!(
            first.owns_topology,
            "the first piece does not own the patch topology"
        );
        let mut ext = Self::empty(first.topology.clone(), true);
        ext.knot_vectors = first.knot_vectors.clone();
        ext.build_all_active()?;
        ext.master = first.master.clone();
        ext.slave = first.slave.clone();
        ext.connect_boundaries()?;

        let views: Vec<&Self> = pieces.iter().map(|p| &**p).collect();
        ext.weights = vec![T::zero(); ext.num_active_dofs];
        ext.merge_weights(&views)?;
        pieces[0].owns_topology = false;
        Ok(ext)
    }

    /// Move topology ownership from `from` to `self`, both must share the topology
    pub fn try_transfer_topology_ownership(&mut self, from: &mut Self) -> anyhow::Result<()> {
        anyhow::ensure!(
            from.owns_topology,
            "the source extension does not own the patch topology"
        );
        anyhow::ensure!(
            Rc::ptr_eq(&self.topology, &from.topology),
            "the extensions do not share a patch topology"
        );
        from.owns_topology = false;
        self.owns_topology = true;
        Ok(())
    }

    pub fn owns_topology(&self) -> bool {
        self.owns_topology
    }

    pub fn topology(&self) -> &PatchTopology {
        &self.topology
    }

    pub fn dimension(&self) -> usize {
        self.topology.dimension()
    }

    pub fn num_patches(&self) -> usize {
        self.topology.num_elements()
    }

    pub fn num_bdr_patches(&self) -> usize {
        self.topology.num_boundary()
    }

    pub fn num_knot_vectors(&self) -> usize {
        self.knot_vectors.len()
    }

    pub fn knot_vector(&self, i: usize) -> &KnotVector<T> {
        &self.knot_vectors[i]
    }

    pub fn knot_vectors(&self) -> &[KnotVector<T>] {
        &self.knot_vectors
    }

    /// Number of vertices of the refined mesh
    pub fn global_num_vertices(&self) -> usize {
        self.mesh_offsets.total
    }

    /// Number of elements of the refined mesh, active or not
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn num_bdr_elements(&self) -> usize {
        self.num_bdr_elements
    }

    /// Number of dofs after periodic identification, active or not
    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    pub fn num_active_vertices(&self) -> usize {
        self.num_active_vertices
    }

    pub fn num_active_elements(&self) -> usize {
        self.num_active_elements
    }

    pub fn num_active_bdr_elements(&self) -> usize {
        self.num_active_bdr_elements
    }

    pub fn num_active_dofs(&self) -> usize {
        self.num_active_dofs
    }

    pub fn mesh_offsets(&self) -> &EntityOffsets {
        &self.mesh_offsets
    }

    pub fn dof_offsets(&self) -> &EntityOffsets {
        &self.dof_offsets
    }

    pub fn active_elements(&self) -> &[bool] {
        &self.active_elements
    }

    pub fn active_bdr_elements(&self) -> &[bool] {
        &self.active_bdr_elements
    }

    /// Element to active dof table
    pub fn element_dof_table(&self) -> &Table {
        &self.el_dof
    }

    /// Boundary element to active dof table
    pub fn bdr_element_dof_table(&self) -> &Table {
        &self.bel_dof
    }

    pub fn element_patch(&self, e: usize) -> usize {
        self.el_to_patch[e]
    }

    pub fn bdr_element_patch(&self, b: usize) -> usize {
        self.bel_to_patch[b]
    }

    /// Active elements of a patch
    pub fn patch_elements(&self, p: usize) -> &[usize] {
        &self.patch_to_el[p]
    }

    /// Active boundary elements of a boundary patch
    pub fn patch_bdr_elements(&self, b: usize) -> &[usize] {
        &self.patch_to_bel[b]
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [T] {
        &mut self.weights
    }

    /// Boundary attributes identified with the `slaves`, pairwise
    pub fn masters(&self) -> &[usize] {
        &self.master
    }

    pub fn slaves(&self) -> &[usize] {
        &self.slave
    }

    pub fn have_patches(&self) -> bool {
        !self.patches.is_empty()
    }

    pub fn patches(&self) -> &[NurbsPatch<T>] {
        &self.patches
    }

    pub fn patches_mut(&mut self) -> &mut [NurbsPatch<T>] {
        &mut self.patches
    }
}

impl<T: FloatingPoint> Clone for NurbsExtension<T> {
    /// Deep copy that owns its own copy of the topology
    fn clone(&self) -> Self {
        Self {
            topology: Rc::new((*self.topology).clone()),
            owns_topology: true,
            orders: self.orders.clone(),
            knot_vectors: self.knot_vectors.clone(),
            knot_vectors_compr: self.knot_vectors_compr.clone(),
            mesh_offsets: self.mesh_offsets.clone(),
            dof_offsets: self.dof_offsets.clone(),
            num_elements: self.num_elements,
            num_bdr_elements: self.num_bdr_elements,
            num_dofs: self.num_dofs,
            active_elements: self.active_elements.clone(),
            num_active_elements: self.num_active_elements,
            active_bdr_elements: self.active_bdr_elements.clone(),
            num_active_bdr_elements: self.num_active_bdr_elements,
            active_vertices: self.active_vertices.clone(),
            num_active_vertices: self.num_active_vertices,
            active_dofs: self.active_dofs.clone(),
            num_active_dofs: self.num_active_dofs,
            dof_alias: self.dof_alias.clone(),
            master: self.master.clone(),
            slave: self.slave.clone(),
            el_dof: self.el_dof.clone(),
            bel_dof: self.bel_dof.clone(),
            el_to_patch: self.el_to_patch.clone(),
            bel_to_patch: self.bel_to_patch.clone(),
            el_to_ijk: self.el_to_ijk.clone(),
            bel_to_ijk: self.bel_to_ijk.clone(),
            patch_to_el: self.patch_to_el.clone(),
            patch_to_bel: self.patch_to_bel.clone(),
            weights: self.weights.clone(),
            patches: self.patches.clone(),
        }
    }
}
