use std::io::Write;

use itertools::Itertools;

use crate::misc::Tokenizer;

use super::Geometry;

/// A cell of a coarse mesh: an attribute, a reference shape and its vertices
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    attribute: usize,
    geometry: Geometry,
    vertices: Vec<usize>,
}

impl Cell {
    pub fn try_new(attribute: usize, geometry: Geometry, vertices: Vec<usize>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            vertices.len() == geometry.num_vertices(),
            "{:?} needs {} vertices, got {}",
            geometry,
            geometry.num_vertices(),
            vertices.len()
        );
        Ok(Self {
            attribute,
            geometry,
            vertices,
        })
    }

    /// Read `attribute geometry v_0 ... v_n`
    pub fn try_parse(tokens: &mut Tokenizer) -> anyhow::Result<Self> {
        let attribute = tokens.parse_usize()?;
        let geometry = Geometry::try_from_code(tokens.parse_usize()?)?;
        let vertices = (0..geometry.num_vertices())
            .map(|_| tokens.parse_usize())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Self::try_new(attribute, geometry, vertices)
    }

    pub fn write<W: Write>(&self, w: &mut W) -> anyhow::Result<()> {
        writeln!(
            w,
            "{} {} {}",
            self.attribute,
            self.geometry.code(),
            self.vertices.iter().join(" ")
        )?;
        Ok(())
    }

    pub fn attribute(&self) -> usize {
        self.attribute
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn vertices(&self) -> &[usize] {
        &self.vertices
    }
}
