use std::{collections::HashMap, io::Write};

use crate::misc::Tokenizer;

use super::{Cell, Geometry};

/// Coarse mesh whose elements are NURBS patches.
///
/// Edges are stored as sorted vertex pairs and numbered in the order they are met
/// while walking the elements. Faces keep the vertex order of the element that
/// created them. In 1D every element is its own edge.
///
/// Each edge carries a signed index into the unique knot vectors:
/// `k` when the knot vector runs from the lower to the higher vertex, `-1 - k` otherwise.
#[derive(Clone, Debug)]
pub struct PatchTopology {
    dimension: usize,
    num_vertices: usize,
    elements: Vec<Cell>,
    boundary: Vec<Cell>,
    edges: Vec<[usize; 2]>,
    faces: Vec<[usize; 4]>,
    element_edges: Vec<Vec<usize>>,
    element_faces: Vec<Vec<usize>>,
    bdr_edges: Vec<Vec<usize>>,
    bdr_faces: Vec<Option<usize>>,
    edge_lookup: HashMap<[usize; 2], usize>,
    face_lookup: HashMap<[usize; 4], usize>,
    edge_to_knot: Vec<isize>,
}

fn sorted_pair(a: usize, b: usize) -> [usize; 2] {
    if a <= b {
        [a, b]
    } else {
        [b, a]
    }
}

fn face_key(vertices: &[usize]) -> [usize; 4] {
    let mut key = [vertices[0], vertices[1], vertices[2], vertices[3]];
    key.sort_unstable();
    key
}

fn orientation(a: usize, b: usize) -> isize {
    if a < b {
        1
    } else {
        -1
    }
}

impl PatchTopology {
    /// Build the topology from its cells.
    /// `edge_knots` lists `(knot, v0, v1)` for every edge, the knot vector running from `v0` to `v1`.
    /// In 1D the entries follow the element order.
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::*;
    /// let quad = Cell::try_new(1, Geometry::Square, vec![0, 1, 2, 3]).unwrap();
    /// let side = Cell::try_new(1, Geometry::Segment, vec![0, 1]).unwrap();
    /// let topology = PatchTopology::try_new(
    ///     2,
    ///     4,
    ///     vec![quad],
    ///     vec![side],
    ///     &[(0, 0, 1), (1, 1, 2), (0, 3, 2), (1, 0, 3)],
    /// )
    /// .unwrap();
    /// assert_eq!(topology.num_edges(), 4);
    /// assert_eq!(topology.element_edges(0)[3], (3, -1));
    /// assert_eq!(topology.edge_to_knot(2), -1);
    /// ```
    pub fn try_new(
        dimension: usize,
        num_vertices: usize,
        elements: Vec<Cell>,
        boundary: Vec<Cell>,
        edge_knots: &[(usize, usize, usize)],
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            (1..=3).contains(&dimension),
            "patch topology dimension must be 1, 2 or 3, got {}",
            dimension
        );
        for (i, cell) in elements.iter().enumerate() {
            anyhow::ensure!(
                cell.geometry().dimension() == dimension,
                "element {} is a {:?} in a {}D topology",
                i,
                cell.geometry(),
                dimension
            );
            anyhow::ensure!(
                cell.vertices().iter().all(|v| *v < num_vertices),
                "element {} references a vertex beyond {}",
                i,
                num_vertices
            );
        }
        for (i, cell) in boundary.iter().enumerate() {
            anyhow::ensure!(
                cell.geometry().dimension() + 1 == dimension,
                "boundary element {} is a {:?} in a {}D topology",
                i,
                cell.geometry(),
                dimension
            );
            anyhow::ensure!(
                cell.vertices().iter().all(|v| *v < num_vertices),
                "boundary element {} references a vertex beyond {}",
                i,
                num_vertices
            );
        }

        let mut topology = Self {
            dimension,
            num_vertices,
            elements,
            boundary,
            edges: vec![],
            faces: vec![],
            element_edges: vec![],
            element_faces: vec![],
            bdr_edges: vec![],
            bdr_faces: vec![],
            edge_lookup: HashMap::new(),
            face_lookup: HashMap::new(),
            edge_to_knot: vec![],
        };
        topology.build_edges();
        topology.build_faces();
        topology.build_boundary()?;
        topology.assign_edge_knots(edge_knots)?;
        Ok(topology)
    }

    fn build_edges(&mut self) {
        if self.dimension == 1 {
            self.edges = self
                .elements
                .iter()
                .map(|c| sorted_pair(c.vertices()[0], c.vertices()[1]))
                .collect();
            self.element_edges = (0..self.elements.len()).map(|e| vec![e]).collect();
            return;
        }

        for cell in self.elements.iter() {
            let v = cell.vertices();
            let mut edges = vec![];
            for [a, b] in cell.geometry().edges() {
                let key = sorted_pair(v[*a], v[*b]);
                let next = self.edges.len();
                let e = *self.edge_lookup.entry(key).or_insert(next);
                if e == next {
                    self.edges.push(key);
                }
                edges.push(e);
            }
            self.element_edges.push(edges);
        }
    }

    fn build_faces(&mut self) {
        if self.dimension != 3 {
            self.element_faces = vec![vec![]; self.elements.len()];
            return;
        }
        for cell in self.elements.iter() {
            let v = cell.vertices();
            let mut faces = vec![];
            for local in cell.geometry().faces() {
                let vertices = [v[local[0]], v[local[1]], v[local[2]], v[local[3]]];
                let next = self.faces.len();
                let f = *self.face_lookup.entry(face_key(&vertices)).or_insert(next);
                if f == next {
                    self.faces.push(vertices);
                }
                faces.push(f);
            }
            self.element_faces.push(faces);
        }
    }

    fn build_boundary(&mut self) -> anyhow::Result<()> {
        for (b, cell) in self.boundary.iter().enumerate() {
            let v = cell.vertices();
            let mut edges = vec![];
            if self.dimension > 1 {
                for [i, j] in cell.geometry().edges() {
                    let e = self.find_edge(v[*i], v[*j]).ok_or_else(|| {
                        anyhow::anyhow!(
                            "edge ({}, {}) of boundary element {} is not an edge of any patch",
                            v[*i],
                            v[*j],
                            b
                        )
                    })?;
                    edges.push(e);
                }
            }
            self.bdr_edges.push(edges);

            let face = if self.dimension == 3 {
                let f = self.find_face(v).ok_or_else(|| {
                    anyhow::anyhow!("boundary element {} is not a face of any patch", b)
                })?;
                Some(f)
            } else {
                None
            };
            self.bdr_faces.push(face);
        }
        Ok(())
    }

    fn assign_edge_knots(&mut self, edge_knots: &[(usize, usize, usize)]) -> anyhow::Result<()> {
        let mut knots: Vec<Option<isize>> = vec![None; self.edges.len()];
        for (i, &(knot, v0, v1)) in edge_knots.iter().enumerate() {
            let e = if self.dimension == 1 {
                anyhow::ensure!(
                    i < self.edges.len() && self.edges[i] == sorted_pair(v0, v1),
                    "edge entry {} ({} {}) does not match element {}",
                    i,
                    v0,
                    v1,
                    i
                );
                i
            } else {
                self.find_edge(v0, v1).ok_or_else(|| {
                    anyhow::anyhow!("({}, {}) is not an edge of the patch topology", v0, v1)
                })?
            };
            let knot = knot as isize;
            knots[e] = Some(if v0 <= v1 { knot } else { -1 - knot });
        }

        self.edge_to_knot = knots
            .into_iter()
            .enumerate()
            .map(|(e, k)| {
                k.ok_or_else(|| {
                    anyhow::anyhow!(
                        "edge {} ({} {}) has no knot vector",
                        e,
                        self.edges[e][0],
                        self.edges[e][1]
                    )
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(())
    }

    /// Read the topology section
    /// ```text
    /// [header line]
    /// dimension
    /// <d>
    /// elements
    /// <n>
    /// <attribute> <geometry> <vertices...>
    /// boundary
    /// <n>
    /// <attribute> <geometry> <vertices...>
    /// edges
    /// <n>
    /// <knot> <v0> <v1>
    /// vertices
    /// <n>
    /// ```
    pub fn try_parse(tokens: &mut Tokenizer) -> anyhow::Result<Self> {
        if tokens.peek() != Some("dimension") {
            tokens.skip_line();
        }
        tokens.expect("dimension")?;
        let dimension = tokens.parse_usize()?;

        tokens.expect("elements")?;
        let n = tokens.parse_usize()?;
        let elements = (0..n)
            .map(|_| Cell::try_parse(tokens))
            .collect::<anyhow::Result<Vec<_>>>()?;

        tokens.expect("boundary")?;
        let n = tokens.parse_usize()?;
        let boundary = (0..n)
            .map(|_| Cell::try_parse(tokens))
            .collect::<anyhow::Result<Vec<_>>>()?;

        tokens.expect("edges")?;
        let n = tokens.parse_usize()?;
        let edge_knots = (0..n)
            .map(|_| {
                Ok((
                    tokens.parse_usize()?,
                    tokens.parse_usize()?,
                    tokens.parse_usize()?,
                ))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        tokens.expect("vertices")?;
        let num_vertices = tokens.parse_usize()?;

        Self::try_new(dimension, num_vertices, elements, boundary, &edge_knots)
    }

    /// Write the topology section, each edge listed in the direction of its knot vector
    pub fn write<W: Write>(&self, w: &mut W) -> anyhow::Result<()> {
        writeln!(w, "NURBS mesh v1.0\n\ndimension\n{}\n", self.dimension)?;
        writeln!(w, "elements\n{}", self.elements.len())?;
        for cell in self.elements.iter() {
            cell.write(w)?;
        }
        writeln!(w, "\nboundary\n{}", self.boundary.len())?;
        for cell in self.boundary.iter() {
            cell.write(w)?;
        }
        writeln!(w, "\nedges\n{}", self.edges.len())?;
        for (e, [lo, hi]) in self.edges.iter().enumerate() {
            let k = self.edge_to_knot[e];
            if k >= 0 {
                writeln!(w, "{} {} {}", k, lo, hi)?;
            } else {
                writeln!(w, "{} {} {}", -1 - k, hi, lo)?;
            }
        }
        writeln!(w, "\nvertices\n{}", self.num_vertices)?;
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// Number of patches
    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Number of boundary patches
    pub fn num_boundary(&self) -> usize {
        self.boundary.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn element(&self, p: usize) -> &Cell {
        &self.elements[p]
    }

    pub fn bdr_element(&self, b: usize) -> &Cell {
        &self.boundary[b]
    }

    pub fn element_vertices(&self, p: usize) -> &[usize] {
        self.elements[p].vertices()
    }

    pub fn bdr_element_vertices(&self, b: usize) -> &[usize] {
        self.boundary[b].vertices()
    }

    pub fn attribute(&self, p: usize) -> usize {
        self.elements[p].attribute()
    }

    pub fn bdr_attribute(&self, b: usize) -> usize {
        self.boundary[b].attribute()
    }

    /// Edges of a patch in local order with their orientation,
    /// `1` when the local edge runs from the lower to the higher vertex id and `-1` otherwise
    pub fn element_edges(&self, p: usize) -> Vec<(usize, isize)> {
        let cell = &self.elements[p];
        let v = cell.vertices();
        cell.geometry()
            .edges()
            .iter()
            .zip(self.element_edges[p].iter())
            .map(|([a, b], e)| (*e, orientation(v[*a], v[*b])))
            .collect()
    }

    /// Edges of a boundary patch with their orientation, empty in 1D
    pub fn bdr_element_edges(&self, b: usize) -> Vec<(usize, isize)> {
        let cell = &self.boundary[b];
        let v = cell.vertices();
        cell.geometry()
            .edges()
            .iter()
            .zip(self.bdr_edges[b].iter())
            .map(|([i, j], e)| (*e, orientation(v[*i], v[*j])))
            .collect()
    }

    /// Faces of a patch in local order, empty below 3D
    pub fn element_faces(&self, p: usize) -> &[usize] {
        &self.element_faces[p]
    }

    /// The face covered by a boundary patch in 3D
    pub fn bdr_element_face(&self, b: usize) -> Option<usize> {
        self.bdr_faces[b]
    }

    /// Vertices of an edge, lower id first
    pub fn edge_vertices(&self, e: usize) -> [usize; 2] {
        self.edges[e]
    }

    pub fn face_vertices(&self, f: usize) -> [usize; 4] {
        self.faces[f]
    }

    /// The edges `(f0, f1)`, `(f1, f2)`, `(f2, f3)`, `(f3, f0)` of a face with their orientation
    pub fn face_edges(&self, f: usize) -> Vec<(usize, isize)> {
        let v = self.faces[f];
        Geometry::Square
            .edges()
            .iter()
            .map(|[a, b]| {
                let e = self.edge_lookup[&sorted_pair(v[*a], v[*b])];
                (e, orientation(v[*a], v[*b]))
            })
            .collect()
    }

    pub fn find_edge(&self, a: usize, b: usize) -> Option<usize> {
        if self.dimension == 1 {
            let key = sorted_pair(a, b);
            return self.edges.iter().position(|e| *e == key);
        }
        self.edge_lookup.get(&sorted_pair(a, b)).copied()
    }

    /// Face with the given four vertices in any order
    pub fn find_face(&self, vertices: &[usize]) -> Option<usize> {
        if vertices.len() != 4 {
            return None;
        }
        self.face_lookup.get(&face_key(vertices)).copied()
    }

    /// Signed knot vector index of an edge
    pub fn edge_to_knot(&self, e: usize) -> isize {
        self.edge_to_knot[e]
    }

    pub fn edge_to_knot_table(&self) -> &[isize] {
        &self.edge_to_knot
    }
}
