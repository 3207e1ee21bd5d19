use itertools::Itertools;

use crate::{
    misc::FloatingPoint,
    topology::{Cell, Geometry},
};

use super::{EntityOffsets, NurbsExtension, NurbsPatchMap};

/// Every tensor position of `ranges`, the first direction running fastest
pub(crate) fn tensor_positions(ranges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    if ranges.is_empty() {
        return vec![vec![]];
    }
    ranges
        .iter()
        .rev()
        .map(|r| r.iter().copied())
        .multi_cartesian_product()
        .map(|mut ijk| {
            ijk.reverse();
            ijk
        })
        .collect()
}

/// Corner positions of the element starting at `ijk`, in reference cell vertex order
fn element_corners(ijk: &[usize]) -> Vec<Vec<usize>> {
    let quad = [(0, 0), (1, 0), (1, 1), (0, 1)];
    match ijk.len() {
        0 => vec![vec![]],
        1 => vec![vec![ijk[0]], vec![ijk[0] + 1]],
        2 => quad
            .iter()
            .map(|(di, dj)| vec![ijk[0] + di, ijk[1] + dj])
            .collect(),
        _ => (0..2)
            .flat_map(|dk| {
                quad.iter()
                    .map(move |(di, dj)| vec![ijk[0] + di, ijk[1] + dj, ijk[2] + dk])
            })
            .collect(),
    }
}

impl<T: FloatingPoint> NurbsExtension<T> {
    /// Assign the vertex and dof ranges of every topological entity.
    /// In 1D the patch interiors are the edges, so only the patch range is assigned.
    pub fn generate_offsets(&mut self) -> anyhow::Result<()> {
        let topology = self.topology.clone();
        let dim = topology.dimension();
        let nv = topology.num_vertices();

        let mut mesh = EntityOffsets {
            vertex: (0..nv).collect(),
            ..Default::default()
        };
        let mut space = EntityOffsets {
            vertex: (0..nv).collect(),
            ..Default::default()
        };
        let mut mesh_counter = nv;
        let mut space_counter = nv;

        if dim > 1 {
            for e in 0..topology.num_edges() {
                mesh.edge.push(mesh_counter);
                space.edge.push(space_counter);
                let kv = self.knot_vec(e);
                mesh_counter += kv.num_elements().saturating_sub(1);
                space_counter += kv.ncp().saturating_sub(2);
            }
        }

        for f in 0..topology.num_faces() {
            mesh.face.push(mesh_counter);
            space.face.push(space_counter);
            let edges = topology.face_edges(f);
            let kv0 = self.knot_vec(edges[0].0);
            let kv1 = self.knot_vec(edges[1].0);
            mesh_counter += kv0.num_elements().saturating_sub(1) * kv1.num_elements().saturating_sub(1);
            space_counter += kv0.ncp().saturating_sub(2) * kv1.ncp().saturating_sub(2);
        }

        for p in 0..topology.num_elements() {
            mesh.patch.push(mesh_counter);
            space.patch.push(space_counter);
            let kv = self.patch_knot_vectors(p);
            mesh_counter += kv
                .iter()
                .map(|k| k.num_elements().saturating_sub(1))
                .product::<usize>();
            space_counter += kv.iter().map(|k| k.ncp().saturating_sub(2)).product::<usize>();
        }

        mesh.total = mesh_counter;
        space.total = space_counter;
        log::debug!(
            "offsets: {} vertices, {} dofs over {} patches",
            mesh.total,
            space.total,
            topology.num_elements()
        );
        self.mesh_offsets = mesh;
        self.dof_offsets = space;
        self.num_dofs = space_counter;
        Ok(())
    }

    pub fn count_elements(&mut self) {
        self.num_elements = (0..self.num_patches())
            .map(|p| {
                self.patch_knot_vectors(p)
                    .iter()
                    .map(|k| k.num_elements())
                    .product::<usize>()
            })
            .sum();
    }

    pub fn count_bdr_elements(&mut self) {
        self.num_bdr_elements = if self.dimension() == 1 {
            self.num_bdr_patches()
        } else {
            (0..self.num_bdr_patches())
                .map(|b| {
                    self.bdr_patch_knot_vectors(b)
                        .iter()
                        .map(|(k, _)| k.num_elements())
                        .product::<usize>()
                })
                .sum()
        };
    }

    /// Elements of patch `p` by their tensor position, in global element order
    pub(crate) fn patch_element_positions(&self, p: usize) -> Vec<Vec<usize>> {
        let ranges = self
            .patch_knot_vectors(p)
            .iter()
            .map(|k| (0..k.num_elements()).collect_vec())
            .collect_vec();
        tensor_positions(&ranges)
    }

    /// Number the vertices touched by active elements
    pub fn generate_active_vertices(&mut self) -> anyhow::Result<()> {
        let mut active = vec![false; self.global_num_vertices()];
        {
            let mut map = NurbsPatchMap::new(self);
            let mut g = 0;
            for p in 0..self.num_patches() {
                map.set_patch_vertex_map(p)?;
                for ijk in self.patch_element_positions(p) {
                    if self.active_elements[g] {
                        for corner in element_corners(&ijk) {
                            active[map.get(&corner)] = true;
                        }
                    }
                    g += 1;
                }
            }
        }

        let mut count = 0;
        self.active_vertices = active
            .into_iter()
            .map(|a| {
                a.then(|| {
                    count += 1;
                    count - 1
                })
            })
            .collect();
        self.num_active_vertices = count;
        Ok(())
    }

    /// All boundary elements are active when every element is, none otherwise
    pub fn generate_active_bdr_elems(&mut self) {
        if self.num_active_elements == self.num_elements {
            self.active_bdr_elements = vec![true; self.num_bdr_elements];
            self.num_active_bdr_elements = self.num_bdr_elements;
        } else {
            self.active_bdr_elements = vec![false; self.num_bdr_elements];
            self.num_active_bdr_elements = 0;
        }
    }

    fn active_vertex(&self, v: usize) -> anyhow::Result<usize> {
        self.active_vertices[v].ok_or_else(|| anyhow::anyhow!("vertex {} is not active", v))
    }

    /// Active elements of the refined mesh, connecting active vertices
    pub fn element_topology(&self) -> anyhow::Result<Vec<Cell>> {
        let geometry = Geometry::try_from_dimension(self.dimension())?;
        let mut elements = Vec::with_capacity(self.num_active_elements);
        let mut map = NurbsPatchMap::new(self);
        let mut g = 0;
        for p in 0..self.num_patches() {
            map.set_patch_vertex_map(p)?;
            let attribute = self.topology.attribute(p);
            for ijk in self.patch_element_positions(p) {
                if self.active_elements[g] {
                    let vertices = element_corners(&ijk)
                        .iter()
                        .map(|c| self.active_vertex(map.get(c)))
                        .collect::<anyhow::Result<Vec<_>>>()?;
                    elements.push(Cell::try_new(attribute, geometry, vertices)?);
                }
                g += 1;
            }
        }
        Ok(elements)
    }

    /// Active boundary elements of the refined mesh.
    /// Their parametrization follows the boundary cell, the knot vectors are read backwards
    /// where they run against it.
    pub fn bdr_element_topology(&self) -> anyhow::Result<Vec<Cell>> {
        let geometry = Geometry::try_from_dimension(self.dimension() - 1)?;
        let mut boundary = Vec::with_capacity(self.num_active_bdr_elements);
        let mut map = NurbsPatchMap::new(self);
        let mut g = 0;
        for b in 0..self.num_bdr_patches() {
            let kv = map.set_bdr_patch_vertex_map(b)?;
            let attribute = self.topology.bdr_attribute(b);
            let ranges = kv
                .iter()
                .map(|(k, _)| (0..k.num_elements()).collect_vec())
                .collect_vec();
            for ijk in tensor_positions(&ranges) {
                if self.active_bdr_elements[g] {
                    let start = ijk
                        .iter()
                        .zip(kv.iter())
                        .map(|(i, (k, okv))| {
                            if *okv >= 0 {
                                *i
                            } else {
                                k.num_elements() - 1 - i
                            }
                        })
                        .collect_vec();
                    let vertices = element_corners(&start)
                        .iter()
                        .map(|c| self.active_vertex(map.get(c)))
                        .collect::<anyhow::Result<Vec<_>>>()?;
                    boundary.push(Cell::try_new(attribute, geometry, vertices)?);
                }
                g += 1;
            }
        }
        Ok(boundary)
    }

    /// Global vertex of every active vertex
    pub fn vertex_local_to_global(&self) -> Vec<usize> {
        let mut map = vec![0; self.num_active_vertices];
        for (g, l) in self.active_vertices.iter().enumerate() {
            if let Some(l) = l {
                map[*l] = g;
            }
        }
        map
    }

    /// Global element of every active element
    pub fn element_local_to_global(&self) -> Vec<usize> {
        self.active_elements
            .iter()
            .enumerate()
            .filter_map(|(g, a)| a.then_some(g))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{element_corners, tensor_positions};

    #[test]
    fn first_direction_runs_fastest() {
        let positions = tensor_positions(&[vec![0, 1], vec![5, 6]]);
        assert_eq!(
            positions,
            vec![vec![0, 5], vec![1, 5], vec![0, 6], vec![1, 6]]
        );
        assert_eq!(tensor_positions(&[]), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn hex_corners_stack_two_quads() {
        let corners = element_corners(&[2, 3, 4]);
        assert_eq!(corners.len(), 8);
        assert_eq!(corners[2], vec![3, 4, 4]);
        assert_eq!(corners[7], vec![2, 4, 5]);
    }
}
