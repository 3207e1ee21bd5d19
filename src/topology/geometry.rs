/// Reference shape of a coarse topology cell.
/// The numeric codes are the ones used in the mesh text format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Geometry {
    Point,
    Segment,
    Square,
    Cube,
}

impl Geometry {
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::Geometry;
    /// assert_eq!(Geometry::try_from_code(3).unwrap(), Geometry::Square);
    /// assert!(Geometry::try_from_code(2).is_err());
    /// ```
    pub fn try_from_code(code: usize) -> anyhow::Result<Self> {
        match code {
            0 => Ok(Geometry::Point),
            1 => Ok(Geometry::Segment),
            3 => Ok(Geometry::Square),
            5 => Ok(Geometry::Cube),
            _ => anyhow::bail!("unsupported geometry code {}", code),
        }
    }

    pub fn code(&self) -> usize {
        match self {
            Geometry::Point => 0,
            Geometry::Segment => 1,
            Geometry::Square => 3,
            Geometry::Cube => 5,
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            Geometry::Point => 0,
            Geometry::Segment => 1,
            Geometry::Square => 2,
            Geometry::Cube => 3,
        }
    }

    pub fn num_vertices(&self) -> usize {
        1 << self.dimension()
    }

    /// Tensor-product cell of the given dimension
    pub fn try_from_dimension(dimension: usize) -> anyhow::Result<Self> {
        match dimension {
            0 => Ok(Geometry::Point),
            1 => Ok(Geometry::Segment),
            2 => Ok(Geometry::Square),
            3 => Ok(Geometry::Cube),
            _ => anyhow::bail!("no tensor-product cell of dimension {}", dimension),
        }
    }

    /// Local vertex pairs of the edges
    pub fn edges(&self) -> &'static [[usize; 2]] {
        match self {
            Geometry::Point => &[],
            Geometry::Segment => &[[0, 1]],
            Geometry::Square => &QUAD_EDGES,
            Geometry::Cube => &HEX_EDGES,
        }
    }

    /// Local vertices of the faces, only cubes have faces
    pub fn faces(&self) -> &'static [[usize; 4]] {
        match self {
            Geometry::Cube => &HEX_FACES,
            _ => &[],
        }
    }
}

const QUAD_EDGES: [[usize; 2]; 4] = [[0, 1], [1, 2], [2, 3], [3, 0]];

const HEX_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [3, 2],
    [0, 3],
    [4, 5],
    [5, 6],
    [7, 6],
    [4, 7],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

const HEX_FACES: [[usize; 4]; 6] = [
    [3, 2, 1, 0],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
    [4, 5, 6, 7],
];
