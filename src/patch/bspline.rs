use nalgebra::DVector;

use crate::{
    knot::KnotVector,
    misc::{Binomial, FloatingPoint},
};

/// Insert `knots_to_insert` (sorted) into a clamped B-spline whose control "points" are whole rows
/// of the patch orthogonal to the refined direction.
pub(crate) fn try_refine_rows<T: FloatingPoint>(
    kv: &KnotVector<T>,
    rows: &[DVector<T>],
    knots_to_insert: &[T],
) -> anyhow::Result<(KnotVector<T>, Vec<DVector<T>>)> {
    anyhow::ensure!(kv.is_clamped(), "Knot vector must be clamped to refine knots");
    debug_assert_eq!(rows.len(), kv.ncp());

    if knots_to_insert.is_empty() {
        return Ok((kv.clone(), rows.to_vec()));
    }

    let (start, end) = kv.domain();
    anyhow::ensure!(
        knots_to_insert.iter().all(|k| *k >= start && *k <= end),
        "Knots to insert must lie inside the domain [{}, {}]",
        start,
        end
    );

    let degree = kv.order();
    let knots = kv.knots();
    let n = rows.len() - 1;
    let m = n + degree + 1;
    let r = knots_to_insert.len() - 1;
    let a = kv.find_knot_span(knots_to_insert[0]);
    let b = kv.find_knot_span(knots_to_insert[r]) + 1;

    let width = rows[0].len();
    let mut rows_post = vec![DVector::<T>::zeros(width); n + r + 2];
    let mut knots_post = vec![T::zero(); m + 1 + r + 1];

    rows_post[..((a - degree) + 1)].clone_from_slice(&rows[..((a - degree) + 1)]);
    for i in (b - 1)..=n {
        rows_post[i + r + 1] = rows[i].clone();
    }

    knots_post[..=a].copy_from_slice(&knots[..=a]);
    for i in (b + degree)..=m {
        knots_post[i + r + 1] = knots[i];
    }

    let mut i = b + degree - 1;
    let mut k = b + degree + r;

    for j in (0..=r).rev() {
        while knots_to_insert[j] <= knots[i] && i > a {
            rows_post[k - degree - 1] = rows[i - degree - 1].clone();
            knots_post[k] = knots[i];
            k -= 1;
            i -= 1;
        }
        rows_post[k - degree - 1] = rows_post[k - degree].clone();
        for l in 1..=degree {
            let ind = k - degree + l;
            let alpha = knots_post[k + l] - knots_to_insert[j];
            if alpha.abs() < T::default_epsilon() {
                rows_post[ind - 1] = rows_post[ind].clone();
            } else {
                let denom = knots_post[k + l] - knots[i - degree + l];
                let weight = if denom != T::zero() {
                    alpha / denom
                } else {
                    T::zero()
                };
                rows_post[ind - 1] = rows_post[ind - 1].lerp(&rows_post[ind], T::one() - weight);
            }
        }
        knots_post[k] = knots_to_insert[j];
        k -= 1;
    }

    let refined = KnotVector::try_new(degree, knots_post)?;
    debug_assert_eq!(refined.ncp(), rows_post.len());
    Ok((refined, rows_post))
}

/// Raise the degree of a clamped B-spline over rows by `degree_inc` with Bezier extraction.
/// The result has `ncp + num_elements * degree_inc` rows.
pub(crate) fn try_elevate_rows<T: FloatingPoint>(
    kv: &KnotVector<T>,
    rows: &[DVector<T>],
    degree_inc: usize,
) -> anyhow::Result<(KnotVector<T>, Vec<DVector<T>>)> {
    anyhow::ensure!(kv.is_clamped(), "Knot vector must be clamped to elevate the degree");
    debug_assert_eq!(rows.len(), kv.ncp());

    if degree_inc == 0 {
        return Ok((kv.clone(), rows.to_vec()));
    }

    let degree = kv.order();
    let knots = kv.knots();
    let width = rows[0].len();
    let n = rows.len() - 1;
    let m = n + degree + 1;
    let ph = degree + degree_inc;
    let ph2 = ph / 2;

    let zero = DVector::<T>::zeros(width);

    // coefficients for elevating a single Bezier segment
    let mut bezalfs = vec![vec![T::zero(); degree + 1]; ph + 1];
    let mut bpts = vec![zero.clone(); degree + 1];
    let mut e_bpts = vec![zero.clone(); ph + 1];
    let mut next_bpts = vec![zero.clone(); degree.max(1)];

    let capacity = rows.len() * (degree_inc + 1);
    let mut q_w = vec![zero.clone(); capacity];
    let mut u_h = vec![T::zero(); capacity + ph + 1];

    bezalfs[0][0] = T::one();
    bezalfs[ph][degree] = T::one();

    let mut binom = Binomial::new();

    for i in 1..=ph2 {
        let inv = T::one() / binom.get(ph, i);
        let mpi = degree.min(i);
        for j in i.saturating_sub(degree_inc)..=mpi {
            bezalfs[i][j] = inv * binom.get(degree, j) * binom.get(degree_inc, i - j);
        }
    }

    for i in (ph2 + 1)..ph {
        let mpi = degree.min(i);
        for j in i.saturating_sub(degree_inc)..=mpi {
            bezalfs[i][j] = bezalfs[ph - i][degree - j];
        }
    }

    let mut mh = ph;
    let mut kind = ph + 1;
    let mut r: isize = -1;
    let mut a = degree;
    let mut b = degree + 1;
    let mut cind = 1;
    let mut ua = knots[0];
    q_w[0] = rows[0].clone();
    for knot in u_h.iter_mut().take(ph + 1) {
        *knot = ua;
    }

    bpts.clone_from_slice(&rows[..(degree + 1)]);

    while b < m {
        let i = b;
        while b < m && knots[b] == knots[b + 1] {
            b += 1;
        }
        let mul = b - i + 1;
        mh += mul + degree_inc;
        let ub = knots[b];
        let oldr = r;
        r = degree as isize - mul as isize;

        let lbz = if oldr > 0 {
            ((oldr + 2) / 2) as usize
        } else {
            1
        };
        let rbz = if r > 0 {
            ph - ((r + 1) / 2) as usize
        } else {
            ph
        };

        // insert knot ub r times to extract the Bezier segment
        if r > 0 {
            let numer = ub - ua;
            let mut alfs = vec![T::zero(); degree];
            let mut k = degree;
            while k > mul {
                alfs[k - mul - 1] = numer / (knots[a + k] - ua);
                k -= 1;
            }
            for j in 1..=(r as usize) {
                let save = (r as usize) - j;
                let s = mul + j;
                let mut k = degree;
                while k >= s {
                    bpts[k] = bpts[k].lerp(&bpts[k - 1], T::one() - alfs[k - s]);
                    k -= 1;
                }
                next_bpts[save] = bpts[degree].clone();
            }
        }

        // degree elevate the Bezier segment
        for i in lbz..=ph {
            e_bpts[i] = zero.clone();
            let mpi = degree.min(i);
            for j in i.saturating_sub(degree_inc)..=mpi {
                e_bpts[i] += &bpts[j] * bezalfs[i][j];
            }
        }

        // remove the knot ua oldr times
        if oldr > 1 {
            let mut first = kind - 2;
            let mut last = kind;
            let den = ub - ua;
            let bet = (ub - u_h[kind - 1]) / den;
            for tr in 1..oldr {
                let mut i = first;
                let mut j = last;
                let mut kj = j - kind + 1;
                let utr = tr as usize;
                while (j as isize - i as isize) > tr {
                    if i < cind {
                        let alf = (ub - u_h[i]) / (ua - u_h[i]);
                        q_w[i] = q_w[i].lerp(&q_w[i - 1], T::one() - alf);
                    }
                    if j >= lbz {
                        if (j as isize) - tr <= (kind as isize - ph as isize + oldr) {
                            let gam = (ub - u_h[j - utr]) / den;
                            e_bpts[kj] = e_bpts[kj].lerp(&e_bpts[kj + 1], T::one() - gam);
                        } else {
                            e_bpts[kj] = e_bpts[kj].lerp(&e_bpts[kj + 1], T::one() - bet);
                        }
                    }
                    i += 1;
                    j -= 1;
                    kj -= 1;
                }
                first -= 1;
                last += 1;
            }
        }

        if a != degree {
            for _ in 0..(ph as isize - oldr) {
                u_h[kind] = ua;
                kind += 1;
            }
        }

        for j in lbz..=rbz {
            q_w[cind] = e_bpts[j].clone();
            cind += 1;
        }

        if b < m {
            let ur = r.max(0) as usize;
            bpts[..ur].clone_from_slice(&next_bpts[..ur]);
            for j in ur..=degree {
                bpts[j] = rows[b - degree + j].clone();
            }
            a = b;
            b += 1;
            ua = ub;
        } else {
            for i in 0..=ph {
                u_h[kind + i] = ub;
            }
        }
    }

    let ncp = mh - ph;
    q_w.truncate(ncp);
    u_h.truncate(ncp + ph + 1);

    let elevated = KnotVector::try_new(ph, u_h)?;
    debug_assert_eq!(elevated.ncp(), kv.ncp() + kv.num_elements() * degree_inc);
    Ok((elevated, q_w))
}

/// Index of the first nonzero basis function at `u` together with the `order + 1` basis values
pub(crate) fn span_basis<T: FloatingPoint>(kv: &KnotVector<T>, u: T) -> (usize, Vec<T>) {
    let span = kv.find_knot_span(u);
    let first = span - kv.order();
    let h = kv[span + 1] - kv[span];
    let xi = if h > T::zero() {
        (u - kv[span]) / h
    } else {
        T::zero()
    };
    (first, kv.calc_shape(first as isize, xi))
}

/// Evaluate a homogeneous B-spline point (without dividing by the weight)
/// given the control rows and the parameter.
#[cfg(test)]
pub(crate) fn evaluate_rows<T: FloatingPoint>(
    kv: &KnotVector<T>,
    rows: &[DVector<T>],
    u: T,
) -> DVector<T> {
    let (first, shape) = span_basis(kv, u);
    let mut point = DVector::<T>::zeros(rows[0].len());
    for (k, s) in shape.into_iter().enumerate() {
        point += &rows[first + k] * s;
    }
    point
}
