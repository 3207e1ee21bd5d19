use std::{fmt, io::Write, ops::Index};

use itertools::Itertools;
use nalgebra::{convert, DMatrix, DVector};
use simba::scalar::SupersetOf;

use crate::misc::{FloatingPoint, Invertible, Tokenizer};

use super::{FindMaximaOptions, KnotMaxima, KnotMultiplicity};

/// Highest supported polynomial order, the basis kernels size their scratch tables by it
pub const MAX_ORDER: usize = 10;

/// Knot vector of a B-spline basis of a given order (polynomial degree).
/// The number of control points is `knots.len() - order - 1`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnotVector<T> {
    order: usize,
    knots: Vec<T>,
    num_elements: usize,
}

impl<T: FloatingPoint> KnotVector<T> {
    /// Create a knot vector from its order and knots
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::KnotVector;
    /// let kv = KnotVector::try_new(2, vec![0., 0., 0., 0.5, 1., 1., 1.]).unwrap();
    /// assert_eq!(kv.ncp(), 4);
    /// assert_eq!(kv.num_elements(), 2);
    /// assert!(KnotVector::try_new(2, vec![0., 1., 0.5, 1.]).is_err());
    /// ```
    pub fn try_new(order: usize, knots: Vec<T>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            order <= MAX_ORDER,
            "Order {} exceeds the maximum supported order {}",
            order,
            MAX_ORDER
        );
        anyhow::ensure!(
            knots.len() >= 2 * (order + 1),
            "Too few knots for order {}: got {}, expected at least {}",
            order,
            knots.len(),
            2 * (order + 1)
        );
        anyhow::ensure!(
            knots.iter().tuple_windows().all(|(a, b)| a <= b),
            "Knots must be non-decreasing"
        );
        let mut kv = Self {
            order,
            knots,
            num_elements: 0,
        };
        kv.count_elements();
        Ok(kv)
    }

    /// Create an open uniform knot vector on `[0, 1]` with `num_elements` spans
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::KnotVector;
    /// let kv: KnotVector<f64> = KnotVector::uniform(2, 2).unwrap();
    /// assert_eq!(kv.knots(), &[0., 0., 0., 0.5, 1., 1., 1.]);
    /// ```
    pub fn uniform(order: usize, num_elements: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(num_elements > 0, "A knot vector needs at least one element");
        let n = T::from_usize(num_elements).unwrap();
        let mut knots = vec![T::zero(); order + 1];
        knots.extend((1..num_elements).map(|i| T::from_usize(i).unwrap() / n));
        knots.extend(vec![T::one(); order + 1]);
        Self::try_new(order, knots)
    }

    /// Read `order ncp k_0 ... k_{ncp+order}`
    pub fn try_parse(tokens: &mut Tokenizer) -> anyhow::Result<Self> {
        let order = tokens.parse_usize()?;
        let ncp = tokens.parse_usize()?;
        let knots = tokens.parse_reals(ncp + order + 1)?;
        Self::try_new(order, knots)
    }

    fn count_elements(&mut self) {
        self.num_elements = (self.order..self.ncp())
            .filter(|&i| self.knots[i] != self.knots[i + 1])
            .count();
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of control points (basis functions)
    pub fn ncp(&self) -> usize {
        self.knots.len() - self.order - 1
    }

    /// Number of nonzero knot spans inside the domain
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Number of knot spans inside the domain, zero length spans included
    pub fn num_knot_spans(&self) -> usize {
        self.ncp() - self.order
    }

    /// Whether knot span `i` (counted from the start of the domain) has nonzero length
    pub fn is_element(&self, i: usize) -> bool {
        let k = self.order + i;
        k + 1 < self.knots.len() && self.knots[k] != self.knots[k + 1]
    }

    /// Maps the local coordinate `xi` in `[0, 1]` to the parameter inside `[knot[ni], knot[ni + 1]]`
    pub fn knot_location(&self, xi: T, ni: usize) -> T {
        (T::one() - xi) * self.knots[ni] + xi * self.knots[ni + 1]
    }

    pub fn knots(&self) -> &[T] {
        &self.knots
    }

    /// Same as `Invertible::invert`
    pub fn flip(&mut self) {
        self.invert();
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    pub fn first(&self) -> T {
        self.knots[0]
    }

    pub fn last(&self) -> T {
        self.knots[self.knots.len() - 1]
    }

    /// Parameter domain `[knot[order], knot[ncp]]`
    pub fn domain(&self) -> (T, T) {
        (self.knots[self.order], self.knots[self.ncp()])
    }

    /// Get the multiplicity of each knot
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::KnotVector;
    /// let knots = KnotVector::try_new(2, vec![0., 0., 0., 1., 2., 3., 3., 3.]).unwrap();
    /// let knot_multiplicity = knots.multiplicity();
    /// assert_eq!(knot_multiplicity[0].multiplicity(), 3);
    /// assert_eq!(knot_multiplicity[1].multiplicity(), 1);
    /// assert_eq!(knot_multiplicity[3].multiplicity(), 3);
    /// ```
    pub fn multiplicity(&self) -> Vec<KnotMultiplicity<T>> {
        let mut mult = vec![];

        let mut current = KnotMultiplicity::new(self.knots[0], 0);
        self.knots.iter().for_each(|knot| {
            if (*knot - *current.knot()).abs() > T::default_epsilon() {
                mult.push(current.clone());
                current = KnotMultiplicity::new(*knot, 0);
            }
            current.increment_multiplicity();
        });
        mult.push(current);

        mult
    }

    /// Check if the knot vector is clamped,
    /// i.e. the first and last knots are repeated `order + 1` times
    pub fn is_clamped(&self) -> bool {
        let multiplicity = self.multiplicity();
        match (multiplicity.first(), multiplicity.last()) {
            (Some(start), Some(end)) => {
                start.multiplicity() > self.order && end.multiplicity() > self.order
            }
            _ => false,
        }
    }

    /// Translate a possibly negative element index into the knot span index and parameter.
    /// A negative `i` reads element `-1 - i` from its far end.
    fn span_parameter(&self, i: isize, xi: T) -> (usize, T, T) {
        debug_assert!(self.order <= MAX_ORDER);
        if i >= 0 {
            let ip = i as usize + self.order;
            let h = self.knots[ip + 1] - self.knots[ip];
            (ip, self.knot_location(xi, ip), h)
        } else {
            let ip = (-1 - i) as usize + self.order;
            let h = self.knots[ip] - self.knots[ip + 1];
            (ip, self.knot_location(T::one() - xi, ip), h)
        }
    }

    /// Nonzero basis functions of element `i` at local coordinate `xi`
    ///
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::KnotVector;
    /// let kv: KnotVector<f64> = KnotVector::uniform(2, 1).unwrap();
    /// let shape = kv.calc_shape(0, 0.5);
    /// assert_eq!(shape, vec![0.25, 0.5, 0.25]);
    /// assert_eq!(kv.calc_shape(-1, 0.25), kv.calc_shape(0, 0.75));
    /// ```
    pub fn calc_shape(&self, i: isize, xi: T) -> Vec<T> {
        let (ip, u, _) = self.span_parameter(i, xi);
        let p = self.order;
        let mut shape = vec![T::zero(); p + 1];
        let mut left = [T::zero(); MAX_ORDER + 1];
        let mut right = [T::zero(); MAX_ORDER + 1];

        shape[0] = T::one();
        for j in 1..=p {
            left[j] = u - self.knots[ip + 1 - j];
            right[j] = self.knots[ip + j] - u;
            let mut saved = T::zero();
            for r in 0..j {
                let temp = shape[r] / (right[r + 1] + left[j - r]);
                shape[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            shape[j] = saved;
        }
        shape
    }

    /// The triangular table of basis functions and knot differences
    fn ndu(&self, ip: usize, u: T) -> [[T; MAX_ORDER + 1]; MAX_ORDER + 1] {
        let p = self.order;
        let mut ndu = [[T::zero(); MAX_ORDER + 1]; MAX_ORDER + 1];
        let mut left = [T::zero(); MAX_ORDER + 1];
        let mut right = [T::zero(); MAX_ORDER + 1];

        ndu[0][0] = T::one();
        for j in 1..=p {
            left[j] = u - self.knots[ip + 1 - j];
            right[j] = self.knots[ip + j] - u;
            let mut saved = T::zero();
            for r in 0..j {
                // lower triangle
                ndu[j][r] = right[r + 1] + left[j - r];
                let temp = ndu[r][j - 1] / ndu[j][r];
                // upper triangle
                ndu[r][j] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            ndu[j][j] = saved;
        }
        ndu
    }

    /// First derivatives of the nonzero basis functions with respect to `xi`
    pub fn calc_dshape(&self, i: isize, xi: T) -> Vec<T> {
        let (ip, u, h) = self.span_parameter(i, xi);
        let p = self.order;
        if p == 0 {
            return vec![T::zero()];
        }
        let ndu = self.ndu(ip, u);
        let scale = T::from_usize(p).unwrap() * h;
        (0..=p)
            .map(|r| {
                let mut d = T::zero();
                if r >= 1 {
                    d = ndu[r - 1][p - 1] / ndu[p][r - 1];
                }
                if r < p {
                    d -= ndu[r][p - 1] / ndu[p][r];
                }
                d * scale
            })
            .collect()
    }

    /// Second derivatives of the nonzero basis functions with respect to `xi`
    pub fn calc_d2shape(&self, i: isize, xi: T) -> Vec<T> {
        self.calc_dn_shape(2, i, xi)
    }

    /// `n`-th derivatives of the nonzero basis functions with respect to `xi`
    pub fn calc_dn_shape(&self, n: usize, i: isize, xi: T) -> Vec<T> {
        let p = self.order;
        if n == 0 {
            return self.calc_shape(i, xi);
        }
        if n > p {
            return vec![T::zero(); p + 1];
        }

        let (ip, u, h) = self.span_parameter(i, xi);
        let ndu = self.ndu(ip, u);
        let mut a = [[T::zero(); MAX_ORDER + 1]; 2];
        let mut ders = vec![T::zero(); p + 1];

        let idegree = p as isize;
        let n = n as isize;
        for r in 0..=idegree {
            // alternate rows in array a
            let mut s1 = 0;
            let mut s2 = 1;
            a[0][0] = T::one();
            let ur = r as usize;

            for k in 1..=n {
                let mut d = T::zero();
                let rk = r - k;
                let pk = idegree - k;
                let upk = pk as usize;

                if r >= k {
                    a[s2][0] = a[s1][0] / ndu[upk + 1][rk as usize];
                    d = a[s2][0] * ndu[rk as usize][upk];
                }

                let j1 = if rk >= -1 { 1 } else { -rk };
                let j2 = if r - 1 <= pk { k - 1 } else { idegree - r };

                for j in j1..=j2 {
                    let uj = j as usize;
                    let rkj = (rk + j) as usize;
                    a[s2][uj] = (a[s1][uj] - a[s1][uj - 1]) / ndu[upk + 1][rkj];
                    d += a[s2][uj] * ndu[rkj][upk];
                }

                let uk = k as usize;
                if r <= pk {
                    a[s2][uk] = -a[s1][uk - 1] / ndu[upk + 1][ur];
                    d += a[s2][uk] * ndu[ur][upk];
                }

                if k == n {
                    ders[ur] = d;
                }

                // switch rows
                std::mem::swap(&mut s1, &mut s2);
            }
        }

        // p! / (p - n)! and the chain rule factor of the span mapping
        let mut scale = T::one();
        for k in 0..(n as usize) {
            scale *= T::from_usize(p - k).unwrap() * h;
        }
        ders.iter_mut().for_each(|d| *d *= scale);
        ders
    }

    /// Knots to insert at the midpoint of every nonzero span
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::KnotVector;
    /// let kv = KnotVector::try_new(1, vec![0., 0., 0.5, 0.5, 1., 1.]).unwrap();
    /// assert_eq!(kv.uniform_refinement(), vec![0.25, 0.75]);
    /// ```
    pub fn uniform_refinement(&self) -> Vec<T> {
        let half = convert::<f64, T>(0.5);
        (self.order..self.ncp())
            .filter(|&i| self.knots[i] != self.knots[i + 1])
            .map(|i| half * (self.knots[i] + self.knots[i + 1]))
            .collect()
    }

    /// Raise the order by `t` at the knot vector level.
    ///
    /// The end knots are repeated `order + t + 1` times and the interior knots are kept,
    /// so the result has `ncp + t` control points whatever the number of elements.
    /// Interior continuity goes up with the order, the space is not the one of the elevated patch.
    /// `NurbsPatch::degree_elevate` is the geometry preserving counterpart, which repeats
    /// every interior knot and ends with `ncp + num_elements * t` control points.
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::KnotVector;
    /// let kv = KnotVector::try_new(1, vec![0., 0., 1., 1.]).unwrap();
    /// let elevated = kv.degree_elevate(1).unwrap();
    /// assert_eq!(elevated.order(), 2);
    /// assert_eq!(elevated.ncp(), 3);
    /// assert_eq!(elevated.knots(), &[0., 0., 0., 1., 1., 1.]);
    ///
    /// let three = KnotVector::<f64>::uniform(2, 3).unwrap();
    /// assert_eq!(three.degree_elevate(1).unwrap().ncp(), three.ncp() + 1);
    /// ```
    pub fn degree_elevate(&self, t: usize) -> anyhow::Result<Self> {
        let order = self.order + t;
        let ncp = self.ncp() + t;
        let mut knots = vec![self.first(); ncp + order + 1];
        for i in (order + 1)..ncp {
            knots[i] = self.knots[i - t];
        }
        for i in 0..=order {
            knots[ncp + i] = self.last();
        }
        Self::try_new(order, knots)
    }

    /// Knots of the finer of `self` and `other` that are missing from the coarser one
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::KnotVector;
    /// let coarse = KnotVector::try_new(1, vec![0., 0., 1., 1.]).unwrap();
    /// let fine = KnotVector::try_new(1, vec![0., 0., 0.25, 0.5, 1., 1.]).unwrap();
    /// assert_eq!(coarse.difference(&fine).unwrap(), vec![0.25, 0.5]);
    /// assert_eq!(fine.difference(&coarse).unwrap(), vec![0.25, 0.5]);
    /// ```
    pub fn difference(&self, other: &Self) -> anyhow::Result<Vec<T>> {
        anyhow::ensure!(
            self.order == other.order,
            "Can not compare knot vectors with different orders: {} and {}",
            self.order,
            other.order
        );
        if other.len() < self.len() {
            return other.difference(self);
        }

        let tolerance = T::default_epsilon() * T::from_usize(2).unwrap();
        let mut diff = vec![];
        let mut i = 0;
        for &k in other.knots.iter() {
            if i < self.len() && (self.knots[i] - k).abs() < tolerance {
                i += 1;
            } else {
                diff.push(k);
            }
        }
        Ok(diff)
    }

    /// Find the knot span index `s` with `knot[s] <= u < knot[s + 1]` by binary search.
    /// Parameters at or beyond the end of the domain map to the last span.
    ///
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::KnotVector;
    /// let knots = KnotVector::try_new(2, vec![0., 0., 0., 1., 2., 3., 3., 3.]).unwrap();
    /// assert_eq!(knots.find_knot_span(2.5), 4);
    /// assert_eq!(knots.find_knot_span(1.0), 3);
    /// assert_eq!(knots.find_knot_span(3.0), 4);
    /// ```
    pub fn find_knot_span(&self, u: T) -> usize {
        let n = self.ncp() - 1;
        if u >= self.knots[n + 1] {
            return n;
        }
        if u <= self.knots[self.order] {
            return self.order;
        }

        let mut low = self.order;
        let mut high = n + 1;
        let mut mid = (low + high) / 2;
        while u < self.knots[mid] || u >= self.knots[mid + 1] {
            if u < self.knots[mid] {
                high = mid;
            } else {
                low = mid;
            }
            mid = (low + high) / 2;
        }
        mid
    }

    /// Locate the maximum of every basis function by bisecting the elements it is supported on
    pub fn find_maxima(&self, options: &FindMaximaOptions<T>) -> KnotMaxima<T> {
        let ncp = self.ncp();
        let p = self.order;
        let mut maxima = vec![T::zero(); ncp];
        let mut spans = vec![0; ncp];
        let mut xi = vec![T::zero(); ncp];
        let mut u = vec![T::zero(); ncp];
        let half = convert::<f64, T>(0.5);

        for j in 0..ncp {
            for d in 0..=p {
                if d > j || j - d >= self.num_knot_spans() || !self.is_element(j - d) {
                    continue;
                }
                let i = j - d;
                let value = |x: T| self.calc_shape(i as isize, x)[d];

                let mut arg1 = T::default_epsilon();
                let mut arg2 = T::one() - T::default_epsilon();
                let mut max1 = value(arg1);
                let mut max2 = value(arg2);
                let mut arg = (arg1 + arg2) * half;
                let mut max = value(arg);

                let mut iterations = 0;
                while (max > max1 || max > max2) && arg2 - arg1 > options.tolerance {
                    if iterations == options.max_iterations {
                        log::warn!(
                            "bisection for basis function {} on element {} stopped after {} iterations",
                            j,
                            i,
                            iterations
                        );
                        break;
                    }
                    if max1 < max2 {
                        max1 = max;
                        arg1 = arg;
                    } else {
                        max2 = max;
                        arg2 = arg;
                    }
                    arg = (arg1 + arg2) * half;
                    max = value(arg);
                    iterations += 1;
                }

                if max > maxima[j] {
                    maxima[j] = max;
                    spans[j] = i;
                    xi[j] = arg;
                    u[j] = self.knot_location(arg, i + p);
                }
            }
        }

        KnotMaxima { spans, xi, u }
    }

    /// Replace each vector of samples at the basis maxima by its B-spline coefficients.
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::*;
    /// let kv: KnotVector<f64> = KnotVector::uniform(2, 2).unwrap();
    /// let maxima = kv.find_maxima(&FindMaximaOptions::default());
    /// // a linear function is reproduced by its greville-like coefficients
    /// let mut samples = vec![maxima.u.clone()];
    /// kv.try_interpolant(&mut samples, &FindMaximaOptions::default()).unwrap();
    /// let shape = kv.calc_shape(0, 0.5);
    /// let value: f64 = (0..3).map(|k| shape[k] * samples[0][k]).sum();
    /// assert!((value - 0.25).abs() < 1e-10);
    /// ```
    pub fn try_interpolant(
        &self,
        x: &mut [Vec<T>],
        options: &FindMaximaOptions<T>,
    ) -> anyhow::Result<()> {
        let ncp = self.ncp();
        let maxima = self.find_maxima(options);

        let mut collocation = DMatrix::<T>::zeros(ncp, ncp);
        for i in 0..ncp {
            let shape = self.calc_shape(maxima.spans[i] as isize, maxima.xi[i]);
            for (p, s) in shape.into_iter().enumerate() {
                collocation[(i, maxima.spans[i] + p)] = s;
            }
        }

        let inverse = collocation
            .try_inverse()
            .ok_or_else(|| anyhow::anyhow!("Collocation matrix is singular"))?;

        for values in x.iter_mut() {
            anyhow::ensure!(
                values.len() == ncp,
                "Expected {} samples, got {}",
                ncp,
                values.len()
            );
            let rhs = DVector::from_column_slice(values);
            let coefficients = &inverse * rhs;
            values.copy_from_slice(coefficients.as_slice());
        }
        Ok(())
    }

    /// Tabulate the basis functions and their first two derivatives over every element.
    /// Each row is `x N_0 .. N_p dN_0 .. dN_p d2N_0 .. d2N_p`, where `x` is the element number plus the local coordinate.
    pub fn print_functions<W: Write>(&self, w: &mut W, samples: usize) -> anyhow::Result<()> {
        anyhow::ensure!(samples >= 2, "At least two samples per element are needed");
        let dx = T::one() / T::from_usize(samples - 1).unwrap();
        let elements = (0..self.num_knot_spans()).filter(|&i| self.is_element(i));
        for (e, i) in elements.enumerate() {
            for j in 0..samples {
                let x = T::from_usize(j).unwrap() * dx;
                let mut row = vec![x + T::from_usize(e).unwrap()];
                row.extend(self.calc_shape(i as isize, x));
                row.extend(self.calc_dshape(i as isize, x));
                row.extend(self.calc_d2shape(i as isize, x));
                writeln!(w, "{}", row.iter().join("\t"))?;
            }
        }
        Ok(())
    }

    /// Cast the knot vector to another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> KnotVector<F> {
        KnotVector {
            order: self.order,
            knots: self.knots.iter().map(|v| convert(*v)).collect(),
            num_elements: self.num_elements,
        }
    }
}

impl<T> Index<usize> for KnotVector<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        &self.knots[index]
    }
}

impl<T: FloatingPoint> fmt::Display for KnotVector<T> {
    /// `order ncp k_0 ... k_{ncp+order}`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.order,
            self.ncp(),
            self.knots.iter().join(" ")
        )
    }
}

impl<T: FloatingPoint> Invertible for KnotVector<T> {
    /// Reverses the knot vector over the same domain
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::*;
    /// let mut knot = KnotVector::try_new(2, vec![0., 0., 0., 1., 2., 2.5, 3.5, 4.0, 4.0, 4.0]).unwrap();
    /// knot.invert();
    /// assert_eq!(knot.knots(), &[0., 0., 0., 0.5, 1.5, 2., 3., 4., 4., 4.]);
    /// ```
    fn invert(&mut self) {
        let apb = self.first() + self.last();
        self.knots = self.knots.iter().rev().map(|k| apb - *k).collect();
        self.count_elements();
    }
}
