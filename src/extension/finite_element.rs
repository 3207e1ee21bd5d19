use itertools::Itertools;
use nalgebra::DMatrix;

use crate::{knot::KnotVector, misc::FloatingPoint};

use super::{numbering::tensor_positions, NurbsExtension};

/// Element or patch of the mesh volume or of its boundary
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Loaded {
    Volume(usize),
    Boundary(usize),
}

/// A finite element that evaluates NURBS basis functions on one knot span of a patch
pub trait HasPatchIjk<T> {
    /// The element currently loaded, if any
    fn element(&self) -> Option<Loaded>;
    fn set_element(&mut self, element: Option<Loaded>);
    /// The patch whose knot vectors are loaded, if any
    fn patch(&self) -> Option<Loaded>;
    fn set_patch(&mut self, patch: Option<Loaded>);
    /// Knot span per direction, a negative entry `-1 - s` reads span `s` backwards
    fn set_ijk(&mut self, ijk: &[isize]);
    fn set_knot_vectors(&mut self, kv: Vec<KnotVector<T>>);
    fn weights_mut(&mut self) -> &mut Vec<T>;
}

/// Rational tensor-product basis on one knot span
#[derive(Clone, Debug, Default)]
pub struct NurbsElement<T> {
    element: Option<Loaded>,
    patch: Option<Loaded>,
    ijk: Vec<isize>,
    kv: Vec<KnotVector<T>>,
    weights: Vec<T>,
}

impl<T: FloatingPoint> NurbsElement<T> {
    pub fn new() -> Self {
        Self {
            element: None,
            patch: None,
            ijk: vec![],
            kv: vec![],
            weights: vec![],
        }
    }

    pub fn ijk(&self) -> &[isize] {
        &self.ijk
    }

    pub fn knot_vectors(&self) -> &[KnotVector<T>] {
        &self.kv
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    /// Number of basis functions
    pub fn num_dofs(&self) -> usize {
        self.kv.iter().map(|k| k.order() + 1).product()
    }

    /// Per direction values and derivatives of the univariate basis at `xi`
    fn univariate(&self, xi: &[T]) -> anyhow::Result<(Vec<Vec<T>>, Vec<Vec<T>>)> {
        anyhow::ensure!(
            xi.len() == self.kv.len() && self.ijk.len() == self.kv.len(),
            "element with {} directions evaluated at {} coordinates",
            self.kv.len(),
            xi.len()
        );
        anyhow::ensure!(
            self.weights.len() == self.num_dofs(),
            "element has {} weights for {} basis functions",
            self.weights.len(),
            self.num_dofs()
        );
        let shape = (0..self.kv.len())
            .map(|d| self.kv[d].calc_shape(self.ijk[d], xi[d]))
            .collect_vec();
        let dshape = (0..self.kv.len())
            .map(|d| self.kv[d].calc_dshape(self.ijk[d], xi[d]))
            .collect_vec();
        Ok((shape, dshape))
    }

    fn stencil(&self) -> Vec<Vec<usize>> {
        tensor_positions(&self.kv.iter().map(|k| (0..=k.order()).collect_vec()).collect_vec())
    }

    /// Rational basis functions at the local coordinates `xi`, first direction fastest
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::*;
    /// let mut fe = NurbsElement::<f64>::new();
    /// fe.set_knot_vectors(vec![KnotVector::uniform(2, 1).unwrap()]);
    /// fe.set_ijk(&[0]);
    /// *fe.weights_mut() = vec![1., 1., 1.];
    /// let shape = fe.calc_shape(&[0.5]).unwrap();
    /// assert_eq!(shape, vec![0.25, 0.5, 0.25]);
    /// ```
    pub fn calc_shape(&self, xi: &[T]) -> anyhow::Result<Vec<T>> {
        let (shape, _) = self.univariate(xi)?;
        let mut values = self
            .stencil()
            .iter()
            .zip(self.weights.iter())
            .map(|(l, w)| {
                l.iter()
                    .enumerate()
                    .fold(*w, |acc, (d, i)| acc * shape[d][*i])
            })
            .collect_vec();
        let sum = values.iter().fold(T::zero(), |acc, v| acc + *v);
        values.iter_mut().for_each(|v| *v /= sum);
        Ok(values)
    }

    /// Derivatives of the rational basis, one row per basis function and one column per direction
    pub fn calc_dshape(&self, xi: &[T]) -> anyhow::Result<DMatrix<T>> {
        let (shape, dshape) = self.univariate(xi)?;
        let dim = self.kv.len();
        let stencil = self.stencil();

        let mut b = vec![T::zero(); stencil.len()];
        let mut db = DMatrix::zeros(stencil.len(), dim);
        for (n, l) in stencil.iter().enumerate() {
            let w = self.weights[n];
            b[n] = l
                .iter()
                .enumerate()
                .fold(w, |acc, (d, i)| acc * shape[d][*i]);
            for k in 0..dim {
                db[(n, k)] = l.iter().enumerate().fold(w, |acc, (d, i)| {
                    acc * if d == k { dshape[d][*i] } else { shape[d][*i] }
                });
            }
        }

        let sum = b.iter().fold(T::zero(), |acc, v| acc + *v);
        let dsum = (0..dim)
            .map(|k| db.column(k).iter().fold(T::zero(), |acc, v| acc + *v))
            .collect_vec();
        let mut out = DMatrix::zeros(stencil.len(), dim);
        for n in 0..stencil.len() {
            for k in 0..dim {
                out[(n, k)] = (db[(n, k)] * sum - b[n] * dsum[k]) / (sum * sum);
            }
        }
        Ok(out)
    }
}

impl<T: FloatingPoint> HasPatchIjk<T> for NurbsElement<T> {
    fn element(&self) -> Option<Loaded> {
        self.element
    }

    fn set_element(&mut self, element: Option<Loaded>) {
        self.element = element;
    }

    fn patch(&self) -> Option<Loaded> {
        self.patch
    }

    fn set_patch(&mut self, patch: Option<Loaded>) {
        self.patch = patch;
    }

    fn set_ijk(&mut self, ijk: &[isize]) {
        self.ijk = ijk.to_vec();
    }

    fn set_knot_vectors(&mut self, kv: Vec<KnotVector<T>>) {
        self.kv = kv;
    }

    fn weights_mut(&mut self) -> &mut Vec<T> {
        &mut self.weights
    }
}

impl<T: FloatingPoint> NurbsExtension<T> {
    fn row_weights(&self, dofs: &[usize]) -> anyhow::Result<Vec<T>> {
        dofs.iter()
            .map(|d| {
                self.weights
                    .get(*d)
                    .copied()
                    .ok_or_else(|| anyhow::anyhow!("no weight for dof {}", d))
            })
            .collect()
    }

    /// Load active element `i` into `fe`, reloading the knot vectors only when the patch changes
    pub fn load_fe<F: HasPatchIjk<T>>(&self, i: usize, fe: &mut F) -> anyhow::Result<()> {
        if fe.element() == Some(Loaded::Volume(i)) {
            return Ok(());
        }
        let p = self.el_to_patch[i];
        if fe.patch() != Some(Loaded::Volume(p)) {
            fe.set_patch(Some(Loaded::Volume(p)));
            fe.set_knot_vectors(self.patch_knot_vectors(p).to_vec());
        }
        fe.set_ijk(&self.el_to_ijk[i][..self.dimension()]);
        *fe.weights_mut() = self.row_weights(self.el_dof.row(i))?;
        fe.set_element(Some(Loaded::Volume(i)));
        Ok(())
    }

    /// Load active boundary element `i` into `fe`, nothing to load in 1D
    pub fn load_be<F: HasPatchIjk<T>>(&self, i: usize, fe: &mut F) -> anyhow::Result<()> {
        if self.dimension() == 1 || fe.element() == Some(Loaded::Boundary(i)) {
            return Ok(());
        }
        let b = self.bel_to_patch[i];
        if fe.patch() != Some(Loaded::Boundary(b)) {
            fe.set_patch(Some(Loaded::Boundary(b)));
            fe.set_knot_vectors(
                self.bdr_patch_knot_vectors(b)
                    .into_iter()
                    .map(|(kv, _)| kv.clone())
                    .collect(),
            );
        }
        fe.set_ijk(&self.bel_to_ijk[i][..self.dimension() - 1]);
        *fe.weights_mut() = self.row_weights(self.bel_dof.row(i))?;
        fe.set_element(Some(Loaded::Boundary(i)));
        Ok(())
    }
}
