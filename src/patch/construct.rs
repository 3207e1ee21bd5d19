use nalgebra::Vector3;

use crate::{knot::KnotVector, misc::FloatingPoint};

use super::{rotation_matrix_3d, NurbsPatch};

impl<T: FloatingPoint> NurbsPatch<T> {
    /// Loft linearly between two patches of the same shape.
    /// The knot vectors are made compatible first, the result gains a last direction
    /// with the knot vector `[0, 0, 1, 1]` and `p1`, `p2` as its end slices.
    pub fn try_interpolate(p1: &Self, p2: &Self) -> anyhow::Result<Self> {
        anyhow::ensure!(
            p1.num_directions() == p2.num_directions(),
            "Can not interpolate patches with {} and {} directions",
            p1.num_directions(),
            p2.num_directions()
        );
        anyhow::ensure!(
            p1.dim() == p2.dim(),
            "Can not interpolate patches of dimension {} and {}",
            p1.dim() - 1,
            p2.dim() - 1
        );
        anyhow::ensure!(
            p1.num_directions() < 3,
            "Interpolation would create a patch with more than 3 directions"
        );

        let mut p1 = p1.clone();
        let mut p2 = p2.clone();
        for dir in 0..p1.num_directions() {
            if p1.knot_vector(dir).order() < p2.knot_vector(dir).order() {
                p1.knot_insert_kv(dir, &p2.knot_vector(dir).clone())?;
                p2.knot_insert_kv(dir, &p1.knot_vector(dir).clone())?;
            } else {
                p2.knot_insert_kv(dir, &p1.knot_vector(dir).clone())?;
                p1.knot_insert_kv(dir, &p2.knot_vector(dir).clone())?;
            }
        }
        debug_assert_eq!(p1.shape(), p2.shape());

        let mut kv = p1.knot_vectors().to_vec();
        kv.push(KnotVector::try_new(
            1,
            vec![T::zero(), T::zero(), T::one(), T::one()],
        )?);

        let mut data = p1.data().to_vec();
        data.extend_from_slice(p2.data());
        Self::try_from_data(kv, p1.dim(), data)
    }

    /// Revolve a 3D patch about `axis` through the origin by `angle`, `times` times.
    /// Each turn is one quadratic segment, the result gains a last direction
    /// with `2 * times + 1` control points.
    /// # Example
    /// ```
    /// use nalgebra::Vector3;
    /// use nurbs_mesh::prelude::*;
    /// let kv = KnotVector::<f64>::uniform(1, 1).unwrap();
    /// let line = NurbsPatch::try_from_data(vec![kv], 4, vec![1., 0., 0., 1., 2., 0., 0., 1.]).unwrap();
    /// let ring = NurbsPatch::try_revolve(&line, &Vector3::z(), std::f64::consts::FRAC_PI_2, 4).unwrap();
    /// assert_eq!(ring.shape(), vec![2, 9]);
    /// let p = ring.point_at(&[0., 0.5]).unwrap();
    /// assert!((p.norm() - 1.).abs() < 1e-12);
    /// ```
    pub fn try_revolve(patch: &Self, axis: &Vector3<T>, angle: T, times: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(
            patch.dim() == 4,
            "Revolution needs a patch in 3D, got dimension {}",
            patch.dim() - 1
        );
        anyhow::ensure!(times > 0, "Revolution needs at least one segment");
        anyhow::ensure!(
            patch.num_directions() < 3,
            "Revolution would create a patch with more than 3 directions"
        );

        let ns = 2 * times + 1;
        let mut knots = vec![T::zero(); ns + 3];
        for i in 1..times {
            let v = T::from_usize(i).unwrap();
            knots[2 * i + 1] = v;
            knots[2 * i + 2] = v;
        }
        let end = T::from_usize(times).unwrap();
        knots[ns..].iter_mut().for_each(|k| *k = end);

        let mut kv = patch.knot_vectors().to_vec();
        kv.push(KnotVector::try_new(2, knots)?);
        let mut revolved = Self::new(kv, 4)?;

        let two = T::from_usize(2).unwrap();
        let t = rotation_matrix_3d(axis, angle, T::one());
        let c = (angle / two).cos();
        let t2 = rotation_matrix_3d(axis, angle / two, T::one() / c) * c;

        let size = patch.num_points();
        let data = revolved.data_mut();
        for i in 0..size {
            let src = patch.control_point(i);
            data[4 * i..4 * i + 4].copy_from_slice(src);
            let mut u = Vector3::new(src[0], src[1], src[2]);
            let mut w = src[3];
            for j in 0..times {
                let mid = 4 * (i + (2 * j + 1) * size);
                let v = t2 * u;
                data[mid..mid + 3].copy_from_slice(v.as_slice());
                data[mid + 3] = c * w;

                let next = 4 * (i + (2 * j + 2) * size);
                let v = t * u;
                data[next..next + 3].copy_from_slice(v.as_slice());
                data[next + 3] = w;

                u = v;
                w = data[next + 3];
            }
        }

        Ok(revolved)
    }
}
