use approx::assert_relative_eq;

use crate::misc::{Invertible, Tokenizer};

use super::{FindMaximaOptions, KnotVector};

fn cubic() -> KnotVector<f64> {
    KnotVector::try_new(3, vec![0., 0., 0., 0., 0.25, 0.5, 0.5, 1., 1., 1., 1.]).unwrap()
}

#[test]
fn counts() {
    let kv = cubic();
    assert_eq!(kv.order(), 3);
    assert_eq!(kv.ncp(), 7);
    assert_eq!(kv.num_knot_spans(), 4);
    assert_eq!(kv.num_elements(), 3);
    assert!(kv.is_element(0));
    assert!(kv.is_element(1));
    assert!(!kv.is_element(2));
    assert!(kv.is_element(3));
    assert!(kv.is_clamped());
}

#[test]
fn rejects_invalid_input() {
    assert!(KnotVector::try_new(11, vec![0.; 24]).is_err());
    assert!(KnotVector::<f64>::try_new(2, vec![0., 0., 1., 1.]).is_err());
    assert!(KnotVector::try_new(1, vec![0., 0., 1., 0.5, 1., 1.]).is_err());
}

#[test]
fn partition_of_unity() {
    let kv = cubic();
    for i in [0, 1, 3] {
        for j in 0..=10 {
            let xi = j as f64 / 10.;
            let sum: f64 = kv.calc_shape(i, xi).iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
            let dsum: f64 = kv.calc_dshape(i, xi).iter().sum();
            assert_relative_eq!(dsum, 0.0, epsilon = 1e-10);
        }
    }
}

#[test]
fn dshape_matches_finite_difference() {
    let kv = cubic();
    let h = 1e-6;
    for i in [0isize, 1, 3, -1, -2] {
        let xi = 0.37;
        let plus = kv.calc_shape(i, xi + h);
        let minus = kv.calc_shape(i, xi - h);
        let dshape = kv.calc_dshape(i, xi);
        for k in 0..=kv.order() {
            let fd = (plus[k] - minus[k]) / (2. * h);
            assert_relative_eq!(dshape[k], fd, epsilon = 1e-5);
        }
    }
}

#[test]
fn dn_shape_agrees_with_lower_derivatives() {
    let kv = cubic();
    let xi = 0.61;
    for i in [0isize, 3, -4] {
        let d1 = kv.calc_dn_shape(1, i, xi);
        let dshape = kv.calc_dshape(i, xi);
        for k in 0..=kv.order() {
            assert_relative_eq!(d1[k], dshape[k], epsilon = 1e-10);
        }
        assert_eq!(kv.calc_dn_shape(0, i, xi), kv.calc_shape(i, xi));
    }
    assert_eq!(kv.calc_dn_shape(4, 0, xi), vec![0.; 4]);
}

#[test]
fn second_derivative_matches_finite_difference() {
    let kv = cubic();
    let h = 1e-5;
    let xi = 0.42;
    let plus = kv.calc_dshape(1, xi + h);
    let minus = kv.calc_dshape(1, xi - h);
    let d2 = kv.calc_d2shape(1, xi);
    for k in 0..=kv.order() {
        assert_relative_eq!(d2[k], (plus[k] - minus[k]) / (2. * h), epsilon = 1e-4);
    }
}

#[test]
fn reversed_element_reads_the_span_backwards() {
    let kv = cubic();
    let forward = kv.calc_shape(1, 0.2);
    let backward = kv.calc_shape(-2, 0.8);
    for k in 0..=kv.order() {
        assert_relative_eq!(forward[k], backward[k], epsilon = 1e-14);
    }
    let df = kv.calc_dshape(1, 0.2);
    let db = kv.calc_dshape(-2, 0.8);
    for k in 0..=kv.order() {
        assert_relative_eq!(df[k], -db[k], epsilon = 1e-10);
    }
}

#[test]
fn uniform_refinement_doubles_elements() {
    let kv = cubic();
    let knots = kv.uniform_refinement();
    assert_eq!(knots, vec![0.125, 0.375, 0.75]);
    let mut refined = kv.knots().to_vec();
    refined.extend(knots);
    refined.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let refined = KnotVector::try_new(3, refined).unwrap();
    assert_eq!(refined.num_elements(), 2 * kv.num_elements());
    assert_eq!(kv.difference(&refined).unwrap(), vec![0.125, 0.375, 0.75]);
}

#[test]
fn difference_requires_equal_orders() {
    let a = KnotVector::<f64>::uniform(1, 2).unwrap();
    let b = KnotVector::<f64>::uniform(2, 2).unwrap();
    assert!(a.difference(&b).is_err());
    assert!(a.difference(&a).unwrap().is_empty());
}

#[test]
fn degree_elevation_keeps_interior_knots() {
    let kv = KnotVector::try_new(1, vec![0., 0., 0.5, 1., 1.]).unwrap();
    let elevated = kv.degree_elevate(2).unwrap();
    assert_eq!(elevated.order(), 3);
    assert_eq!(elevated.ncp(), kv.ncp() + 2);
    assert_eq!(
        elevated.knots(),
        &[0., 0., 0., 0., 0.5, 1., 1., 1., 1.]
    );
}

#[test]
fn knot_span_lookup() {
    let kv = cubic();
    assert_eq!(kv.find_knot_span(0.), 3);
    assert_eq!(kv.find_knot_span(0.1), 3);
    assert_eq!(kv.find_knot_span(0.3), 4);
    assert_eq!(kv.find_knot_span(0.5), 6);
    assert_eq!(kv.find_knot_span(0.99), 6);
    assert_eq!(kv.find_knot_span(1.), 6);
}

#[test]
fn flip_mirrors_the_knots() {
    let mut kv = cubic();
    kv.invert();
    assert_eq!(
        kv.knots(),
        &[0., 0., 0., 0., 0.5, 0.5, 0.75, 1., 1., 1., 1.]
    );
    assert_eq!(kv.num_elements(), 3);
    kv.flip();
    assert_eq!(kv, cubic());
}

#[test]
fn maxima_lie_inside_the_support() {
    let kv = KnotVector::<f64>::uniform(2, 3).unwrap();
    let maxima = kv.find_maxima(&FindMaximaOptions::default());
    assert_eq!(maxima.u.len(), kv.ncp());
    assert_relative_eq!(maxima.u[0], 0., epsilon = 1e-8);
    assert_relative_eq!(maxima.u[kv.ncp() - 1], 1., epsilon = 1e-8);
    for w in maxima.u.windows(2) {
        assert!(w[0] < w[1]);
    }
}

#[test]
fn interpolant_reproduces_quadratics() {
    let kv = KnotVector::<f64>::uniform(2, 4).unwrap();
    let options = FindMaximaOptions::default();
    let maxima = kv.find_maxima(&options);
    let f = |u: f64| 1. + 2. * u - 3. * u * u;
    let mut samples = vec![maxima.u.iter().map(|&u| f(u)).collect::<Vec<_>>()];
    kv.try_interpolant(&mut samples, &options).unwrap();

    for i in 0..kv.num_knot_spans() {
        for xi in [0., 0.3, 0.8] {
            let shape = kv.calc_shape(i as isize, xi);
            let value: f64 = shape.iter().enumerate().map(|(k, s)| s * samples[0][i + k]).sum();
            let u = kv.knot_location(xi, i + kv.order());
            assert_relative_eq!(value, f(u), epsilon = 1e-9);
        }
    }

    let mut wrong = vec![vec![0.; 2]];
    assert!(kv.try_interpolant(&mut wrong, &options).is_err());
}

#[test]
fn text_round_trip() {
    let kv = cubic();
    let text = kv.to_string();
    assert!(text.starts_with("3 7 "));
    let mut tokens = Tokenizer::new(&text);
    let parsed = KnotVector::<f64>::try_parse(&mut tokens).unwrap();
    assert_eq!(parsed, kv);
}

#[test]
fn print_functions_writes_one_row_per_sample() {
    let kv = KnotVector::<f64>::uniform(1, 2).unwrap();
    let mut out = vec![];
    kv.print_functions(&mut out, 3).unwrap();
    let text = String::from_utf8(out).unwrap();
    let rows: Vec<_> = text.lines().collect();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0].split('\t').count(), 1 + 3 * 2);
}
