use std::io::Write;

use itertools::Itertools;

use crate::{
    knot::KnotVector,
    misc::{FloatingPoint, Invertible, Tokenizer},
    patch::NurbsPatch,
};

use super::{knot_vectors::direction_edges, NurbsExtension};

impl<T: FloatingPoint> NurbsExtension<T> {
    /// Split the nodal coordinates into one homogeneous patch per topology element.
    /// `nodes` holds `vdim` values per active dof, grouped by dof.
    pub fn convert_to_patches(&mut self, nodes: &[T], vdim: usize) -> anyhow::Result<()> {
        anyhow::ensure!(
            nodes.len() == self.num_active_dofs * vdim,
            "expected {} nodal values, got {}",
            self.num_active_dofs * vdim,
            nodes.len()
        );
        anyhow::ensure!(
            self.weights.len() == self.num_active_dofs,
            "expected {} weights, got {}",
            self.num_active_dofs,
            self.weights.len()
        );
        let patches = (0..self.num_patches())
            .map(|p| {
                let dofs = self.patch_active_dofs(p)?;
                let data = dofs
                    .iter()
                    .flat_map(|l| {
                        let w = self.weights[*l];
                        nodes[l * vdim..(l + 1) * vdim]
                            .iter()
                            .map(move |x| *x * w)
                            .chain(std::iter::once(w))
                    })
                    .collect_vec();
                NurbsPatch::try_from_data(self.patch_knot_vectors(p).to_vec(), vdim + 1, data)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        self.patches = patches;
        Ok(())
    }

    /// Rebuild every numbering from the knot vectors of the patches
    pub fn set_knots_from_patches(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(self.have_patches(), "there are no patches to take knots from");
        anyhow::ensure!(
            self.patches.len() == self.num_patches(),
            "{} patches for {} topology elements",
            self.patches.len(),
            self.num_patches()
        );
        for p in 0..self.num_patches() {
            let kv = self.patches[p].knot_vectors().to_vec();
            anyhow::ensure!(
                kv.len() == self.dimension(),
                "patch {} has {} directions in a {}D mesh",
                p,
                kv.len(),
                self.dimension()
            );
            self.patch_knot_vectors_mut(p).clone_from_slice(&kv);
        }
        self.update_unique_kv()?;
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
        self.weights.clear();
        self.connect_boundaries()
    }

    /// Gather nodal coordinates and weights back from the patches, which are released.
    /// Returns `vdim` coordinates per active dof, grouped by dof.
    pub fn set_coords_from_patches(&mut self) -> anyhow::Result<Vec<T>> {
        anyhow::ensure!(self.have_patches(), "there are no patches to take coordinates from");
        let dim = self.patches[0].dim();
        let vdim = dim - 1;
        let mut nodes = vec![T::zero(); self.num_active_dofs * vdim];
        let mut weights = vec![T::zero(); self.num_active_dofs];
        for p in 0..self.num_patches() {
            let dofs = self.patch_active_dofs(p)?;
            let patch = &self.patches[p];
            anyhow::ensure!(
                patch.dim() == dim && patch.num_points() == dofs.len(),
                "patch {} does not fit the dof numbering",
                p
            );
            for (i, l) in dofs.iter().enumerate() {
                let cp = patch.control_point(i);
                let w = cp[vdim];
                weights[*l] = w;
                for (c, x) in cp[..vdim].iter().enumerate() {
                    nodes[l * vdim + c] = *x / w;
                }
            }
        }
        self.weights = weights;
        self.patches.clear();
        Ok(nodes)
    }

    fn require_patches(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.have_patches(),
            "refinement needs the geometry converted to patches"
        );
        Ok(())
    }

    /// Split every nonzero knot span of every patch
    pub fn uniform_refinement(&mut self) -> anyhow::Result<()> {
        self.require_patches()?;
        self.patches
            .iter_mut()
            .try_for_each(|patch| patch.uniform_refinement())
    }

    /// Raise every patch direction by `rel_degree`, capped at order `max_degree`
    pub fn degree_elevate(&mut self, rel_degree: usize, max_degree: usize) -> anyhow::Result<()> {
        self.require_patches()?;
        for patch in self.patches.iter_mut() {
            for d in 0..patch.num_directions() {
                let old = patch.knot_vector(d).order();
                let target = (old + rel_degree).min(max_degree);
                if target > old {
                    patch.degree_elevate(d, target - old)?;
                }
            }
        }
        Ok(())
    }

    /// Refine every patch to the given unique knot vectors
    pub fn knot_insert_kv(&mut self, kv: &[KnotVector<T>]) -> anyhow::Result<()> {
        self.require_patches()?;
        anyhow::ensure!(
            kv.len() == self.num_knot_vectors(),
            "expected {} knot vectors, got {}",
            self.num_knot_vectors(),
            kv.len()
        );
        let dim = self.dimension();
        for p in 0..self.num_patches() {
            let kvdir = self.check_kv_direction(p);
            let edges = self.topology.element_edges(p);
            let targets = direction_edges(dim)
                .iter()
                .enumerate()
                .map(|(d, i)| {
                    let target = &kv[self.knot_ind(edges[*i].0)];
                    if kvdir[d] < 0 {
                        target.inverse()
                    } else {
                        target.clone()
                    }
                })
                .collect_vec();
            self.patches[p].knot_insert_kv_all(&targets)?;
        }
        Ok(())
    }

    /// Insert `knots[k]` into every patch direction that runs along unique knot vector `k`
    pub fn knot_insert(&mut self, knots: &[Vec<T>]) -> anyhow::Result<()> {
        self.require_patches()?;
        anyhow::ensure!(
            knots.len() == self.num_knot_vectors(),
            "expected knots for {} knot vectors, got {}",
            self.num_knot_vectors(),
            knots.len()
        );
        let dim = self.dimension();
        for p in 0..self.num_patches() {
            let kvdir = self.check_kv_direction(p);
            let edges = self.topology.element_edges(p);
            let inserted = direction_edges(dim)
                .iter()
                .enumerate()
                .map(|(d, i)| {
                    let values = &knots[self.knot_ind(edges[*i].0)];
                    if kvdir[d] < 0 {
                        let kv = &self.patch_knot_vectors(p)[d];
                        let apb = kv.first() + kv.last();
                        values.iter().rev().map(|v| apb - *v).collect_vec()
                    } else {
                        values.clone()
                    }
                })
                .collect_vec();
            self.patches[p].knot_insert_all(&inserted)?;
        }
        Ok(())
    }

    /// Read a solution of `vdim` components written patch by patch over the full control point grids.
    /// Returns `vdim` values per active dof, grouped by dof.
    pub fn load_solution(&self, input: &str, vdim: usize) -> anyhow::Result<Vec<T>> {
        let mut tokens = Tokenizer::new(input);
        let mut solution = vec![T::zero(); self.num_active_dofs * vdim];
        for p in 0..self.num_patches() {
            for l in self.patch_active_dofs(p)? {
                for c in 0..vdim {
                    solution[l * vdim + c] = tokens.parse_real()?;
                }
            }
        }
        Ok(solution)
    }

    /// Write a solution of `vdim` components per active dof patch by patch
    pub fn write_solution<W: Write>(
        &self,
        w: &mut W,
        solution: &[T],
        vdim: usize,
    ) -> anyhow::Result<()> {
        anyhow::ensure!(
            solution.len() == self.num_active_dofs * vdim,
            "expected {} solution values, got {}",
            self.num_active_dofs * vdim,
            solution.len()
        );
        for p in 0..self.num_patches() {
            write!(w, "\n# patch {}\n\n", p)?;
            for l in self.patch_active_dofs(p)? {
                writeln!(w, "{}", solution[l * vdim..(l + 1) * vdim].iter().join(" "))?;
            }
        }
        Ok(())
    }

    /// Move values of the pieces' active dofs into this extension's numbering.
    /// Every element of `self` must be active.
    fn merge<F: FnMut(usize, usize)>(&self, piece: &Self, mut assign: F) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.num_active_elements == self.num_elements,
            "merging needs every element active"
        );
        for (el, g) in piece.element_local_to_global().into_iter().enumerate() {
            let local = piece.el_dof.row(el);
            let global = self.el_dof.row(g);
            anyhow::ensure!(
                local.len() == global.len(),
                "element {} has {} dofs in the piece and {} here",
                g,
                local.len(),
                global.len()
            );
            for (l, gl) in local.iter().zip(global.iter()) {
                assign(*gl, *l);
            }
        }
        Ok(())
    }

    /// Gather the weights of the pieces of a partitioned extension
    pub fn merge_weights(&mut self, pieces: &[&Self]) -> anyhow::Result<()> {
        let mut weights = vec![T::zero(); self.num_active_dofs];
        for piece in pieces {
            self.merge(piece, |g, l| weights[g] = piece.weights[l])?;
        }
        self.weights = weights;
        Ok(())
    }

    /// Gather grid functions of `vdim` components defined on the pieces of a partitioned extension
    pub fn merge_grid_functions(&self, pieces: &[(&Self, &[T])], vdim: usize) -> anyhow::Result<Vec<T>> {
        let mut merged = vec![T::zero(); self.num_active_dofs * vdim];
        for (piece, values) in pieces {
            anyhow::ensure!(
                values.len() == piece.num_active_dofs * vdim,
                "expected {} values for a piece, got {}",
                piece.num_active_dofs * vdim,
                values.len()
            );
            self.merge(piece, |g, l| {
                merged[g * vdim..(g + 1) * vdim].copy_from_slice(&values[l * vdim..(l + 1) * vdim])
            })?;
        }
        Ok(merged)
    }
}
