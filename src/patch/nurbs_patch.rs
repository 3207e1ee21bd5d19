use std::io::Write;

use itertools::Itertools;
use nalgebra::{DVector, Vector3};
use simba::scalar::SupersetOf;

use crate::{
    knot::KnotVector,
    misc::{FloatingPoint, Invertible, Tokenizer, Transformable},
};

use super::{
    bspline::{span_basis, try_elevate_rows, try_refine_rows},
    rotation_matrix_2d, rotation_matrix_3d, SliceView,
};

/// Tensor-product NURBS patch over 1 to 3 knot vectors.
/// Control points are stored in homogeneous coordinates,
/// the cartesian components multiplied by the weight followed by the weight itself.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NurbsPatch<T> {
    kv: Vec<KnotVector<T>>,
    /// number of homogeneous components per control point
    dim: usize,
    data: Vec<T>,
}

impl<T: FloatingPoint> NurbsPatch<T> {
    /// Create a patch with zeroed control points
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::*;
    /// let kv = KnotVector::<f64>::uniform(2, 2).unwrap();
    /// let patch = NurbsPatch::new(vec![kv.clone(), kv], 3).unwrap();
    /// assert_eq!(patch.num_points(), 16);
    /// assert_eq!(patch.data().len(), 16 * 3);
    /// ```
    pub fn new(kv: Vec<KnotVector<T>>, dim: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(
            (1..=3).contains(&kv.len()),
            "A patch needs 1 to 3 knot vectors, got {}",
            kv.len()
        );
        anyhow::ensure!(dim >= 2, "Homogeneous dimension must be at least 2, got {}", dim);
        let size = kv.iter().map(|k| k.ncp()).product::<usize>() * dim;
        Ok(Self {
            kv,
            dim,
            data: vec![T::zero(); size],
        })
    }

    /// Create a patch from homogeneous control point data
    pub fn try_from_data(kv: Vec<KnotVector<T>>, dim: usize, data: Vec<T>) -> anyhow::Result<Self> {
        let mut patch = Self::new(kv, dim)?;
        anyhow::ensure!(
            data.len() == patch.data.len(),
            "Control point buffer has {} values, expected {}",
            data.len(),
            patch.data.len()
        );
        patch.data = data;
        Ok(patch)
    }

    /// Read a patch block
    /// ```text
    /// knotvectors
    /// <n>
    /// <order> <ncp> <knots...>   (n times)
    /// dimension
    /// <d>
    /// controlpoints | controlpoints_homogeneous | controlpoints_cartesian
    /// <d + 1 values per control point>
    /// ```
    /// Cartesian control points are multiplied by their weight.
    pub fn try_parse(tokens: &mut Tokenizer) -> anyhow::Result<Self> {
        tokens.expect("knotvectors")?;
        let n = tokens.parse_usize()?;
        let kv = (0..n)
            .map(|_| KnotVector::try_parse(tokens))
            .collect::<anyhow::Result<Vec<_>>>()?;

        tokens.expect("dimension")?;
        let d = tokens.parse_usize()?;
        let mut patch = Self::new(kv, d + 1)?;

        let line = tokens.line();
        let ident = tokens.next_token()?;
        let data = tokens.parse_reals(patch.data.len())?;
        match ident {
            "controlpoints" | "controlpoints_homogeneous" => {
                patch.data = data;
            }
            "controlpoints_cartesian" => {
                patch.data = data;
                patch.data.chunks_mut(d + 1).for_each(|p| {
                    let w = p[d];
                    p[..d].iter_mut().for_each(|x| *x *= w);
                });
            }
            _ => anyhow::bail!("unknown control point section '{}' at line {}", ident, line),
        }
        Ok(patch)
    }

    /// Write the patch block in homogeneous form
    pub fn write<W: Write>(&self, w: &mut W) -> anyhow::Result<()> {
        writeln!(w, "knotvectors\n{}", self.kv.len())?;
        for kv in self.kv.iter() {
            writeln!(w, "{}", kv)?;
        }
        writeln!(w, "\ndimension\n{}\n\ncontrolpoints", self.dim - 1)?;
        for p in self.data.chunks(self.dim) {
            writeln!(w, "{}", p.iter().join(" "))?;
        }
        Ok(())
    }

    /// Number of homogeneous components per control point
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_directions(&self) -> usize {
        self.kv.len()
    }

    pub fn knot_vector(&self, dir: usize) -> &KnotVector<T> {
        &self.kv[dir]
    }

    pub fn knot_vectors(&self) -> &[KnotVector<T>] {
        &self.kv
    }

    /// Number of control points in each direction
    pub fn shape(&self) -> Vec<usize> {
        self.kv.iter().map(|k| k.ncp()).collect()
    }

    pub fn num_points(&self) -> usize {
        self.kv.iter().map(|k| k.ncp()).product()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Flat point index of the tensor position `ijk`
    pub fn point_index(&self, ijk: &[usize]) -> usize {
        debug_assert_eq!(ijk.len(), self.kv.len());
        ijk.iter()
            .zip(self.kv.iter())
            .rev()
            .fold(0, |acc, (i, kv)| acc * kv.ncp() + i)
    }

    /// Homogeneous components of the control point with flat index `index`
    pub fn control_point(&self, index: usize) -> &[T] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    pub fn control_point_mut(&mut self, index: usize) -> &mut [T] {
        &mut self.data[index * self.dim..(index + 1) * self.dim]
    }

    fn check_direction(&self, dir: usize) -> anyhow::Result<()> {
        anyhow::ensure!(
            dir < self.kv.len(),
            "Direction {} is out of range for a patch with {} directions",
            dir,
            self.kv.len()
        );
        Ok(())
    }

    /// View of the control points along `dir`
    pub fn slice_view(&self, dir: usize) -> anyhow::Result<SliceView> {
        self.check_direction(dir)?;
        Ok(SliceView::new(&self.shape(), dir))
    }

    /// Gather every slice orthogonal to `dir` into one row vector
    fn rows(&self, dir: usize) -> Vec<DVector<T>> {
        let view = SliceView::new(&self.shape(), dir);
        let dim = self.dim;
        (0..view.extent)
            .map(|k| {
                DVector::from_iterator(
                    view.len * dim,
                    (0..view.len).flat_map(|l| {
                        let p = view.index(k, l) * dim;
                        self.data[p..p + dim].iter().copied()
                    }),
                )
            })
            .collect()
    }

    /// Replace the knot vector and the control points along `dir` at once
    fn replace_direction(&mut self, dir: usize, kv: KnotVector<T>, rows: Vec<DVector<T>>) {
        debug_assert_eq!(kv.ncp(), rows.len());
        self.kv[dir] = kv;
        let view = SliceView::new(&self.shape(), dir);
        let dim = self.dim;
        let mut data = vec![T::zero(); view.extent * view.len * dim];
        for (k, row) in rows.iter().enumerate() {
            for l in 0..view.len {
                let p = view.index(k, l) * dim;
                data[p..p + dim].copy_from_slice(&row.as_slice()[l * dim..(l + 1) * dim]);
            }
        }
        self.data = data;
    }

    /// Insert knots in direction `dir` keeping the geometry
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::*;
    /// let kv = KnotVector::<f64>::uniform(1, 1).unwrap();
    /// let mut patch = NurbsPatch::new(vec![kv], 2).unwrap();
    /// patch.data_mut().copy_from_slice(&[0., 1., 2., 1.]);
    /// patch.knot_insert(0, &[0.5]).unwrap();
    /// assert_eq!(patch.data(), &[0., 1., 1., 1., 2., 1.]);
    /// ```
    pub fn knot_insert(&mut self, dir: usize, knots: &[T]) -> anyhow::Result<()> {
        if knots.is_empty() {
            return Ok(());
        }
        self.check_direction(dir)?;
        let sorted = knots
            .iter()
            .copied()
            .sorted_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .collect_vec();
        let (kv, rows) = try_refine_rows(&self.kv[dir], &self.rows(dir), &sorted)?;
        self.replace_direction(dir, kv, rows);
        Ok(())
    }

    /// Bring direction `dir` to the order and knots of `target`.
    /// The order is raised first, then the missing knots are inserted.
    pub fn knot_insert_kv(&mut self, dir: usize, target: &KnotVector<T>) -> anyhow::Result<()> {
        self.check_direction(dir)?;
        let order = self.kv[dir].order();
        anyhow::ensure!(
            target.order() >= order,
            "Can not insert a knot vector of order {} into direction {} of order {}",
            target.order(),
            dir,
            order
        );
        if target.order() > order {
            self.degree_elevate(dir, target.order() - order)?;
        }
        let diff = self.kv[dir].difference(target)?;
        self.knot_insert(dir, &diff)
    }

    /// `knot_insert` in every direction
    pub fn knot_insert_all(&mut self, knots: &[Vec<T>]) -> anyhow::Result<()> {
        anyhow::ensure!(
            knots.len() == self.kv.len(),
            "Expected knots for {} directions, got {}",
            self.kv.len(),
            knots.len()
        );
        knots
            .iter()
            .enumerate()
            .try_for_each(|(dir, k)| self.knot_insert(dir, k))
    }

    /// `knot_insert_kv` in every direction
    pub fn knot_insert_kv_all(&mut self, targets: &[KnotVector<T>]) -> anyhow::Result<()> {
        anyhow::ensure!(
            targets.len() == self.kv.len(),
            "Expected knot vectors for {} directions, got {}",
            self.kv.len(),
            targets.len()
        );
        targets
            .iter()
            .enumerate()
            .try_for_each(|(dir, kv)| self.knot_insert_kv(dir, kv))
    }

    /// Raise the order of direction `dir` by `t` keeping the geometry.
    /// Every interior knot gains multiplicity `t`, so the direction ends with
    /// `ncp + num_elements * t` control points, unlike `KnotVector::degree_elevate`.
    pub fn degree_elevate(&mut self, dir: usize, t: usize) -> anyhow::Result<()> {
        self.check_direction(dir)?;
        if t == 0 {
            return Ok(());
        }
        anyhow::ensure!(
            self.kv[dir].order() + t <= crate::knot::MAX_ORDER,
            "Elevated order {} exceeds the maximum order",
            self.kv[dir].order() + t
        );
        let (kv, rows) = try_elevate_rows(&self.kv[dir], &self.rows(dir), t)?;
        self.replace_direction(dir, kv, rows);
        Ok(())
    }

    /// `degree_elevate` in every direction
    pub fn degree_elevate_all(&mut self, t: usize) -> anyhow::Result<()> {
        (0..self.kv.len()).try_for_each(|dir| self.degree_elevate(dir, t))
    }

    /// Elevate every direction to `degree`, or to the highest order of the patch when `None`.
    /// Returns the resulting order.
    pub fn make_uniform_degree(&mut self, degree: Option<usize>) -> anyhow::Result<usize> {
        let max = degree.unwrap_or_else(|| self.kv.iter().map(|k| k.order()).max().unwrap_or(0));
        for dir in 0..self.kv.len() {
            let order = self.kv[dir].order();
            if max > order {
                self.degree_elevate(dir, max - order)?;
            }
        }
        Ok(max)
    }

    /// Split every nonzero knot span in every direction
    pub fn uniform_refinement(&mut self) -> anyhow::Result<()> {
        for dir in 0..self.kv.len() {
            let knots = self.kv[dir].uniform_refinement();
            self.knot_insert(dir, &knots)?;
        }
        Ok(())
    }

    /// Reverse the parametrization of direction `dir`
    pub fn flip_direction(&mut self, dir: usize) -> anyhow::Result<()> {
        let view = self.slice_view(dir)?;
        let dim = self.dim;
        for k in 0..view.extent / 2 {
            for l in 0..view.len {
                let a = view.index(k, l) * dim;
                let b = view.index(view.extent - 1 - k, l) * dim;
                for c in 0..dim {
                    self.data.swap(a + c, b + c);
                }
            }
        }
        self.kv[dir].invert();
        Ok(())
    }

    /// Exchange the parametric directions `d1` and `d2`
    pub fn swap_directions(&mut self, d1: usize, d2: usize) -> anyhow::Result<()> {
        self.check_direction(d1)?;
        self.check_direction(d2)?;
        if d1 == d2 {
            return Ok(());
        }

        let old_shape = self.shape();
        let mut kv = self.kv.clone();
        kv.swap(d1, d2);
        let mut swapped = Self::new(kv, self.dim)?;

        let dim = self.dim;
        let mut ijk = vec![0; old_shape.len()];
        for p in 0..self.num_points() {
            let mut rest = p;
            for (d, n) in old_shape.iter().enumerate() {
                ijk[d] = rest % n;
                rest /= n;
            }
            ijk.swap(d1, d2);
            let q = swapped.point_index(&ijk);
            swapped.data[q * dim..(q + 1) * dim].copy_from_slice(self.control_point(p));
        }

        *self = swapped;
        Ok(())
    }

    /// Rotate the patch about the origin.
    /// Planar patches rotate in their plane, spatial patches need an `axis`.
    pub fn rotate(&mut self, angle: T, axis: Option<&Vector3<T>>) -> anyhow::Result<()> {
        match (self.dim, axis) {
            (3, _) => {
                let m = rotation_matrix_2d(angle);
                self.transform(&m);
                Ok(())
            }
            (4, Some(axis)) => {
                let m = rotation_matrix_3d(axis, angle, T::one());
                self.transform(&m);
                Ok(())
            }
            (4, None) => anyhow::bail!("Specify an axis for a 3D rotation"),
            (dim, _) => anyhow::bail!(
                "Rotation is defined for 2D and 3D patches, got dimension {}",
                dim - 1
            ),
        }
    }

    /// Evaluate the cartesian point at the parameters `u` (one per direction)
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::*;
    /// let kv = KnotVector::<f64>::uniform(1, 1).unwrap();
    /// let patch = NurbsPatch::try_from_data(vec![kv.clone(), kv], 3, vec![
    ///     0., 0., 1., 2., 0., 1.,
    ///     0., 2., 1., 2., 2., 1.,
    /// ]).unwrap();
    /// let p = patch.point_at(&[0.25, 0.5]).unwrap();
    /// assert_eq!(p.as_slice(), &[0.5, 1.0]);
    /// ```
    pub fn point_at(&self, u: &[T]) -> anyhow::Result<DVector<T>> {
        let h = self.homogeneous_point_at(u)?;
        let w = h[self.dim - 1];
        anyhow::ensure!(w != T::zero(), "Zero weight at the evaluated point");
        Ok(DVector::from_iterator(
            self.dim - 1,
            h.iter().take(self.dim - 1).map(|x| *x / w),
        ))
    }

    /// Evaluate the homogeneous point at the parameters `u`
    pub fn homogeneous_point_at(&self, u: &[T]) -> anyhow::Result<DVector<T>> {
        anyhow::ensure!(
            u.len() == self.kv.len(),
            "Expected {} parameters, got {}",
            self.kv.len(),
            u.len()
        );
        let bases = self
            .kv
            .iter()
            .zip(u.iter())
            .map(|(kv, u)| span_basis(kv, *u))
            .collect_vec();

        let mut point = DVector::<T>::zeros(self.dim);
        let stencil = bases.iter().map(|(_, b)| 0..b.len()).multi_cartesian_product();
        for local in stencil {
            let mut s = T::one();
            let mut ijk = Vec::with_capacity(local.len());
            for (d, l) in local.iter().enumerate() {
                s *= bases[d].1[*l];
                ijk.push(bases[d].0 + l);
            }
            let p = self.point_index(&ijk);
            point += DVector::from_column_slice(self.control_point(p)) * s;
        }
        Ok(point)
    }

    /// Cast the patch to another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> NurbsPatch<F> {
        NurbsPatch {
            kv: self.kv.iter().map(|k| k.cast()).collect(),
            dim: self.dim,
            data: self.data.iter().map(|v| nalgebra::convert(*v)).collect(),
        }
    }
}
