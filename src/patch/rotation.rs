use nalgebra::{Matrix2, Matrix3, Vector3};

use crate::misc::{FloatingPoint, Transformable};

use super::NurbsPatch;

/// Counter-clockwise rotation in the plane
pub fn rotation_matrix_2d<T: FloatingPoint>(angle: T) -> Matrix2<T> {
    let (s, c) = angle.sin_cos();
    Matrix2::new(c, -s, s, c)
}

/// Rotation by `angle` about `axis` (any length), with the sine and cosine scaled by `r`.
/// Quarter and half turns produce exact zeros.
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use nurbs_mesh::prelude::rotation_matrix_3d;
/// let m = rotation_matrix_3d(&Vector3::new(0., 0., 2.), std::f64::consts::FRAC_PI_2, 1.);
/// assert_eq!(m * Vector3::new(1., 0., 0.), Vector3::new(0., 1., 0.));
/// ```
pub fn rotation_matrix_3d<T: FloatingPoint>(axis: &Vector3<T>, angle: T, r: T) -> Matrix3<T> {
    let n = axis;
    let l2 = n.norm_squared();
    let l = l2.sqrt();

    let (s, c, c1) = if angle.abs() == T::frac_pi_2() {
        let sign = if angle > T::zero() { T::one() } else { -T::one() };
        (r * sign, T::zero(), -T::one())
    } else if angle.abs() == T::pi() {
        (T::zero(), -r, -r - T::one())
    } else {
        let (sin, cos) = angle.sin_cos();
        (r * sin, r * cos, r * cos - T::one())
    };

    Matrix3::new(
        (n[0] * n[0] + (n[1] * n[1] + n[2] * n[2]) * c) / l2,
        -(n[0] * n[1] * c1) / l2 - (n[2] * s) / l,
        -(n[0] * n[2] * c1) / l2 + (n[1] * s) / l,
        -(n[0] * n[1] * c1) / l2 + (n[2] * s) / l,
        (n[1] * n[1] + (n[0] * n[0] + n[2] * n[2]) * c) / l2,
        -(n[1] * n[2] * c1) / l2 - (n[0] * s) / l,
        -(n[0] * n[2] * c1) / l2 - (n[1] * s) / l,
        -(n[1] * n[2] * c1) / l2 + (n[0] * s) / l,
        (n[2] * n[2] + (n[0] * n[0] + n[1] * n[1]) * c) / l2,
    )
}

/// Transform the leading two homogeneous components of every control point
impl<'a, T: FloatingPoint> Transformable<&'a Matrix2<T>> for NurbsPatch<T> {
    fn transform(&mut self, transform: &'a Matrix2<T>) {
        let dim = self.dim();
        debug_assert!(dim > 2);
        self.data_mut().chunks_mut(dim).for_each(|p| {
            let x = transform * nalgebra::Vector2::new(p[0], p[1]);
            p[0] = x[0];
            p[1] = x[1];
        });
    }
}

/// Transform the leading three homogeneous components of every control point
impl<'a, T: FloatingPoint> Transformable<&'a Matrix3<T>> for NurbsPatch<T> {
    fn transform(&mut self, transform: &'a Matrix3<T>) {
        let dim = self.dim();
        debug_assert!(dim > 3);
        self.data_mut().chunks_mut(dim).for_each(|p| {
            let x = transform * Vector3::new(p[0], p[1], p[2]);
            p[..3].copy_from_slice(x.as_slice());
        });
    }
}
