use crate::{knot::KnotVector, misc::FloatingPoint};

use super::{EntityOffsets, NurbsExtension};

/// Contribution of one tensor direction to a global index
#[derive(Clone, Copy, Debug)]
struct Term {
    axis: usize,
    reversed: bool,
    stride: usize,
}

/// Numbering of the positions that lie on one topological entity
#[derive(Clone, Debug, Default)]
struct Slot {
    base: usize,
    terms: Vec<Term>,
}

/// Position of a corner of the reference cell, `0` for the low and `1` for the high end
fn corner_index(bits: &[usize]) -> usize {
    let quad = |x: usize, y: usize| match (x, y) {
        (0, 0) => 0,
        (1, 0) => 1,
        (1, 1) => 2,
        _ => 3,
    };
    match bits.len() {
        0 => 0,
        1 => bits[0],
        2 => quad(bits[0], bits[1]),
        _ => quad(bits[0], bits[1]) + 4 * bits[2],
    }
}

/// Which entity of the cell the interior of all directions belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Interior {
    Patch(usize),
    /// A boundary cell, whose interior is an edge or a face of the topology
    Boundary,
}

/// Maps tensor positions of a patch or boundary patch to global vertex or dof indices.
///
/// A position `i` along a direction with extent `n` is a low corner when `i == 0`,
/// a high corner when `i == n + 1` and interior otherwise.
/// Interior positions are numbered inside the range of the edge, face or patch they lie on,
/// oriented by matching the cell corners against the vertices stored for that entity.
///
/// The map is re-initialized by one of the `set_*` calls before each query.
pub struct NurbsPatchMap<'a, T> {
    ext: &'a NurbsExtension<T>,
    extents: Vec<usize>,
    slots: Vec<Slot>,
}

impl<'a, T: FloatingPoint> NurbsPatchMap<'a, T> {
    pub fn new(ext: &'a NurbsExtension<T>) -> Self {
        Self {
            ext,
            extents: vec![],
            slots: vec![],
        }
    }

    /// Map the element vertices of patch `p`
    pub fn set_patch_vertex_map(&mut self, p: usize) -> anyhow::Result<&'a [KnotVector<T>]> {
        let ext = self.ext;
        let kv = ext.patch_knot_vectors(p);
        let extents = kv.iter().map(|k| k.num_elements().saturating_sub(1)).collect();
        self.build(
            ext.topology.element_vertices(p),
            extents,
            Interior::Patch(p),
            &ext.mesh_offsets,
        )?;
        Ok(kv)
    }

    /// Map the control points of patch `p`
    pub fn set_patch_dof_map(&mut self, p: usize) -> anyhow::Result<&'a [KnotVector<T>]> {
        let ext = self.ext;
        let kv = ext.patch_knot_vectors(p);
        let extents = kv.iter().map(|k| k.ncp().saturating_sub(2)).collect();
        self.build(
            ext.topology.element_vertices(p),
            extents,
            Interior::Patch(p),
            &ext.dof_offsets,
        )?;
        Ok(kv)
    }

    /// Map the element vertices of boundary patch `b`.
    /// Returns its knot vectors with their orientation relative to the boundary cell.
    pub fn set_bdr_patch_vertex_map(
        &mut self,
        b: usize,
    ) -> anyhow::Result<Vec<(&'a KnotVector<T>, isize)>> {
        let ext = self.ext;
        let kv = ext.bdr_patch_knot_vectors(b);
        let extents = kv.iter().map(|(k, _)| k.num_elements().saturating_sub(1)).collect();
        self.build(
            ext.topology.bdr_element_vertices(b),
            extents,
            Interior::Boundary,
            &ext.mesh_offsets,
        )?;
        Ok(kv)
    }

    /// Map the control points of boundary patch `b`.
    /// Returns its knot vectors with their orientation relative to the boundary cell.
    pub fn set_bdr_patch_dof_map(
        &mut self,
        b: usize,
    ) -> anyhow::Result<Vec<(&'a KnotVector<T>, isize)>> {
        let ext = self.ext;
        let kv = ext.bdr_patch_knot_vectors(b);
        let extents = kv.iter().map(|(k, _)| k.ncp().saturating_sub(2)).collect();
        self.build(
            ext.topology.bdr_element_vertices(b),
            extents,
            Interior::Boundary,
            &ext.dof_offsets,
        )?;
        Ok(kv)
    }

    fn build(
        &mut self,
        corners: &[usize],
        extents: Vec<usize>,
        interior: Interior,
        offsets: &EntityOffsets,
    ) -> anyhow::Result<()> {
        let n = extents.len();
        debug_assert_eq!(corners.len(), 1 << n);
        self.extents = extents;
        let num_slots = 3usize.pow(n as u32);
        self.slots = (0..num_slots)
            .map(|s| {
                let mut rest = s;
                let classes: Vec<usize> = (0..n)
                    .map(|_| {
                        let c = rest % 3;
                        rest /= 3;
                        c
                    })
                    .collect();
                self.slot(corners, &classes, interior, offsets)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(())
    }

    /// Numbering of the entity selected by `classes`, `0` low corner, `1` interior, `2` high corner
    fn slot(
        &self,
        corners: &[usize],
        classes: &[usize],
        interior: Interior,
        offsets: &EntityOffsets,
    ) -> anyhow::Result<Slot> {
        let topology = &self.ext.topology;
        let axes: Vec<usize> = (0..classes.len()).filter(|d| classes[*d] == 1).collect();
        let corner = |free: &[(usize, usize)]| {
            let mut bits: Vec<usize> = classes.iter().map(|c| c / 2).collect();
            for (axis, bit) in free {
                bits[*axis] = *bit;
            }
            corners[corner_index(&bits)]
        };

        match (axes.len(), interior) {
            (0, _) => Ok(Slot {
                base: offsets.vertex[corner(&[])],
                terms: vec![],
            }),
            (m, Interior::Patch(p)) if m == classes.len() => {
                let mut stride = 1;
                let terms = axes
                    .iter()
                    .map(|axis| {
                        let term = Term {
                            axis: *axis,
                            reversed: false,
                            stride,
                        };
                        stride *= self.extents[*axis];
                        term
                    })
                    .collect();
                Ok(Slot {
                    base: offsets.patch[p],
                    terms,
                })
            }
            (1, _) => {
                let axis = axes[0];
                let va = corner(&[(axis, 0)]);
                let vb = corner(&[(axis, 1)]);
                let e = topology
                    .find_edge(va, vb)
                    .ok_or_else(|| anyhow::anyhow!("({}, {}) is not an edge of the topology", va, vb))?;
                Ok(Slot {
                    base: offsets.edge[e],
                    terms: vec![Term {
                        axis,
                        reversed: va > vb,
                        stride: 1,
                    }],
                })
            }
            (2, _) => {
                let (a, b) = (axes[0], axes[1]);
                let quad = [
                    corner(&[(a, 0), (b, 0)]),
                    corner(&[(a, 1), (b, 0)]),
                    corner(&[(a, 1), (b, 1)]),
                    corner(&[(a, 0), (b, 1)]),
                ];
                let f = topology
                    .find_face(&quad)
                    .ok_or_else(|| anyhow::anyhow!("{:?} is not a face of the topology", quad))?;
                let stored = topology.face_vertices(f);
                let position = |v: usize| match quad.iter().position(|q| *q == v) {
                    Some(0) => Ok((0, 0)),
                    Some(1) => Ok((1, 0)),
                    Some(2) => Ok((1, 1)),
                    Some(_) => Ok((0, 1)),
                    None => Err(anyhow::anyhow!("vertex {} is not a corner of face {}", v, f)),
                };
                let p0 = position(stored[0])?;
                let p1 = position(stored[1])?;
                // the face numbering runs fastest from its first to its second vertex
                let terms = if p0.1 == p1.1 {
                    vec![
                        Term {
                            axis: a,
                            reversed: p0.0 == 1,
                            stride: 1,
                        },
                        Term {
                            axis: b,
                            reversed: p0.1 == 1,
                            stride: self.extents[a],
                        },
                    ]
                } else {
                    vec![
                        Term {
                            axis: b,
                            reversed: p0.1 == 1,
                            stride: 1,
                        },
                        Term {
                            axis: a,
                            reversed: p0.0 == 1,
                            stride: self.extents[b],
                        },
                    ]
                };
                Ok(Slot {
                    base: offsets.face[f],
                    terms,
                })
            }
            (m, _) => anyhow::bail!("no entity with {} interior directions", m),
        }
    }

    /// Number of parametric directions of the mapped cell
    pub fn n_dirs(&self) -> usize {
        self.extents.len()
    }

    /// Largest position along direction `d`
    pub fn extent(&self, d: usize) -> usize {
        self.extents[d] + 1
    }

    pub fn nx(&self) -> usize {
        self.extent(0)
    }

    pub fn ny(&self) -> usize {
        self.extent(1)
    }

    pub fn nz(&self) -> usize {
        self.extent(2)
    }

    /// Global index of the tensor position `ijk`, one entry per direction
    pub fn get(&self, ijk: &[usize]) -> usize {
        debug_assert_eq!(ijk.len(), self.extents.len());
        let s = ijk
            .iter()
            .zip(self.extents.iter())
            .rev()
            .fold(0, |acc, (i, n)| {
                let class = if *i == 0 {
                    0
                } else if *i > *n {
                    2
                } else {
                    1
                };
                acc * 3 + class
            });
        let slot = &self.slots[s];
        slot.terms.iter().fold(slot.base, |acc, term| {
            let l = ijk[term.axis] - 1;
            let n = self.extents[term.axis];
            acc + term.stride * if term.reversed { n - 1 - l } else { l }
        })
    }

    pub fn get1(&self, i: usize) -> usize {
        self.get(&[i])
    }

    pub fn get2(&self, i: usize, j: usize) -> usize {
        self.get(&[i, j])
    }

    pub fn get3(&self, i: usize, j: usize, k: usize) -> usize {
        self.get(&[i, j, k])
    }
}
