use approx::assert_relative_eq;
use nalgebra::Vector3;

use crate::{knot::KnotVector, misc::Tokenizer};

use super::{NurbsPatch, SliceView};

/// Quarter of the annulus 1 <= r <= 2 in the first quadrant
fn quarter_annulus() -> NurbsPatch<f64> {
    let w = std::f64::consts::FRAC_1_SQRT_2;
    let ku = KnotVector::try_new(2, vec![0., 0., 0., 1., 1., 1.]).unwrap();
    let kv = KnotVector::try_new(1, vec![0., 0., 1., 1.]).unwrap();
    let mut data = vec![];
    for r in [1., 2.] {
        for (x, y, weight) in [(r, 0., 1.), (r, r, w), (0., r, 1.)] {
            data.extend([x * weight, y * weight, weight]);
        }
    }
    NurbsPatch::try_from_data(vec![ku, kv], 3, data).unwrap()
}

fn samples() -> Vec<[f64; 2]> {
    let mut s = vec![];
    for i in 0..=6 {
        for j in 0..=4 {
            s.push([i as f64 / 6., j as f64 / 4.]);
        }
    }
    s
}

fn assert_same_geometry(a: &NurbsPatch<f64>, b: &NurbsPatch<f64>) {
    for u in samples() {
        let pa = a.point_at(&u).unwrap();
        let pb = b.point_at(&u).unwrap();
        for c in 0..pa.len() {
            assert_relative_eq!(pa[c], pb[c], epsilon = 1e-12);
        }
    }
}

#[test]
fn annulus_points_lie_on_circles() {
    let patch = quarter_annulus();
    for [u, v] in samples() {
        let p = patch.point_at(&[u, v]).unwrap();
        assert_relative_eq!(p.norm(), 1. + v, epsilon = 1e-12);
    }
}

#[test]
fn slice_view_matches_point_index() {
    let patch = quarter_annulus();
    let view = patch.slice_view(1).unwrap();
    assert_eq!(view, SliceView { stride: 3, extent: 2, len: 3 });
    for k in 0..view.extent {
        for l in 0..view.len {
            assert_eq!(view.index(k, l), patch.point_index(&[l, k]));
        }
    }
    assert!(patch.slice_view(2).is_err());
}

#[test]
fn empty_knot_insertion_is_a_no_op() {
    let mut patch = quarter_annulus();
    patch.knot_insert(0, &[]).unwrap();
    assert_eq!(patch, quarter_annulus());
}

#[test]
fn knot_insertion_preserves_geometry() {
    let mut patch = quarter_annulus();
    patch.knot_insert(0, &[0.7, 0.2, 0.2]).unwrap();
    patch.knot_insert(1, &[0.5]).unwrap();
    assert_eq!(patch.shape(), vec![6, 3]);
    assert_eq!(patch.data().len(), 6 * 3 * 3);
    assert_same_geometry(&patch, &quarter_annulus());
}

#[test]
fn uniform_refinement_preserves_geometry() {
    let mut patch = quarter_annulus();
    patch.uniform_refinement().unwrap();
    patch.uniform_refinement().unwrap();
    assert_eq!(patch.knot_vector(0).num_elements(), 4);
    assert_eq!(patch.knot_vector(1).num_elements(), 4);
    assert_same_geometry(&patch, &quarter_annulus());
}

#[test]
fn degree_elevation_preserves_geometry() {
    let mut patch = quarter_annulus();
    patch.knot_insert(0, &[0.4]).unwrap();
    patch.degree_elevate(0, 1).unwrap();
    patch.degree_elevate(1, 2).unwrap();
    assert_eq!(patch.knot_vector(0).order(), 3);
    assert_eq!(patch.knot_vector(1).order(), 3);
    // NCP + NE * t
    assert_eq!(patch.shape(), vec![4 + 2, 2 + 2]);
    assert_same_geometry(&patch, &quarter_annulus());
}

#[test]
fn geometric_elevation_adds_points_per_element() {
    let kv = KnotVector::<f64>::uniform(2, 3).unwrap();
    let mut patch = NurbsPatch::new(vec![kv.clone()], 2).unwrap();
    patch.degree_elevate(0, 1).unwrap();
    assert_eq!(patch.knot_vector(0).order(), 3);
    assert_eq!(patch.knot_vector(0).ncp(), kv.ncp() + 3);

    let spaces = kv.degree_elevate(1).unwrap();
    assert_eq!(spaces.order(), 3);
    assert_eq!(spaces.ncp(), kv.ncp() + 1);
    assert_eq!(spaces.num_elements(), patch.knot_vector(0).num_elements());
}

#[test]
fn make_uniform_degree_raises_to_the_highest_order() {
    let mut patch = quarter_annulus();
    assert_eq!(patch.make_uniform_degree(None).unwrap(), 2);
    assert_eq!(patch.knot_vector(1).order(), 2);
    assert_same_geometry(&patch, &quarter_annulus());

    assert_eq!(patch.make_uniform_degree(Some(3)).unwrap(), 3);
    assert_eq!(patch.knot_vector(0).order(), 3);
    assert_eq!(patch.knot_vector(1).order(), 3);
}

#[test]
fn knot_insert_kv_matches_the_target() {
    let mut patch = quarter_annulus();
    let target = KnotVector::try_new(2, vec![0., 0., 0., 0.25, 0.5, 1., 1., 1.]).unwrap();
    patch.knot_insert_kv(1, &target).unwrap();
    assert_eq!(patch.knot_vector(1), &target);
    assert_same_geometry(&patch, &quarter_annulus());

    let lower = KnotVector::try_new(1, vec![0., 0., 1., 1.]).unwrap();
    assert!(patch.knot_insert_kv(0, &lower).is_err());
}

#[test]
fn flip_reverses_the_parametrization() {
    let mut flipped = quarter_annulus();
    flipped.flip_direction(0).unwrap();
    let patch = quarter_annulus();
    for [u, v] in samples() {
        let a = patch.point_at(&[u, v]).unwrap();
        let b = flipped.point_at(&[1. - u, v]).unwrap();
        assert_relative_eq!(a[0], b[0], epsilon = 1e-12);
        assert_relative_eq!(a[1], b[1], epsilon = 1e-12);
    }
    flipped.flip_direction(0).unwrap();
    assert_eq!(flipped, patch);
}

#[test]
fn swap_exchanges_the_parameters() {
    let patch = quarter_annulus();
    let mut swapped = patch.clone();
    swapped.swap_directions(0, 1).unwrap();
    assert_eq!(swapped.shape(), vec![2, 3]);
    for [u, v] in samples() {
        let a = patch.point_at(&[u, v]).unwrap();
        let b = swapped.point_at(&[v, u]).unwrap();
        assert_relative_eq!(a[0], b[0], epsilon = 1e-12);
        assert_relative_eq!(a[1], b[1], epsilon = 1e-12);
    }
}

#[test]
fn swap_first_and_last_of_a_solid() {
    let solid = NurbsPatch::try_interpolate(&quarter_annulus(), &quarter_annulus()).unwrap();
    let mut swapped = solid.clone();
    swapped.swap_directions(0, 2).unwrap();
    assert_eq!(swapped.shape(), vec![2, 2, 3]);
    for [u, v] in samples() {
        let a = solid.point_at(&[u, v, 0.3]).unwrap();
        let b = swapped.point_at(&[0.3, v, u]).unwrap();
        assert_relative_eq!(a[0], b[0], epsilon = 1e-12);
        assert_relative_eq!(a[1], b[1], epsilon = 1e-12);
    }
}

#[test]
fn rotation_in_the_plane() {
    let mut patch = quarter_annulus();
    patch.rotate(std::f64::consts::FRAC_PI_2, None).unwrap();
    let p = patch.point_at(&[0., 0.]).unwrap();
    assert_relative_eq!(p[0], 0., epsilon = 1e-12);
    assert_relative_eq!(p[1], 1., epsilon = 1e-12);
}

#[test]
fn rotation_in_space_requires_an_axis() {
    let kv = KnotVector::<f64>::uniform(1, 1).unwrap();
    let mut line =
        NurbsPatch::try_from_data(vec![kv], 4, vec![1., 0., 0., 1., 1., 0., 1., 1.]).unwrap();
    assert!(line.rotate(0.3, None).is_err());
    line.rotate(std::f64::consts::PI, Some(&Vector3::z())).unwrap();
    let p = line.point_at(&[1.]).unwrap();
    assert_relative_eq!(p[0], -1., epsilon = 1e-12);
    assert_relative_eq!(p[1], 0., epsilon = 1e-12);
    assert_relative_eq!(p[2], 1., epsilon = 1e-12);
}

#[test]
fn text_round_trip() {
    let patch = quarter_annulus();
    let mut out = vec![];
    patch.write(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("knotvectors\n2\n"));
    let parsed = NurbsPatch::<f64>::try_parse(&mut Tokenizer::new(&text)).unwrap();
    assert_same_geometry(&parsed, &patch);
}

#[test]
fn cartesian_control_points_are_weighted() {
    let text = "knotvectors\n1\n1 2 0 0 1 1\ndimension\n1\ncontrolpoints_cartesian\n1 2\n3 4\n";
    let patch = NurbsPatch::<f64>::try_parse(&mut Tokenizer::new(text)).unwrap();
    assert_eq!(patch.data(), &[2., 2., 12., 4.]);

    let bad = "knotvectors\n1\n1 2 0 0 1 1\ndimension\n1\npoints\n1 2\n3 4\n";
    assert!(NurbsPatch::<f64>::try_parse(&mut Tokenizer::new(bad)).is_err());
}

#[test]
fn interpolation_lofts_between_the_ends() {
    let ku = KnotVector::<f64>::uniform(1, 1).unwrap();
    let bottom = NurbsPatch::try_from_data(vec![ku], 3, vec![0., 0., 1., 1., 0., 1.]).unwrap();
    let kq = KnotVector::<f64>::uniform(2, 2).unwrap();
    let top = NurbsPatch::try_from_data(
        vec![kq],
        3,
        vec![0., 1., 1., 0.25, 1.5, 1., 0.75, 1.5, 1., 1., 1., 1.],
    )
    .unwrap();

    let loft = NurbsPatch::try_interpolate(&bottom, &top).unwrap();
    assert_eq!(loft.num_directions(), 2);
    assert_eq!(loft.knot_vector(0).order(), 2);
    assert_eq!(loft.knot_vector(1).knots(), &[0., 0., 1., 1.]);
    for i in 0..=8 {
        let u = i as f64 / 8.;
        let b = bottom.point_at(&[u]).unwrap();
        let t = top.point_at(&[u]).unwrap();
        let l0 = loft.point_at(&[u, 0.]).unwrap();
        let l1 = loft.point_at(&[u, 1.]).unwrap();
        let lm = loft.point_at(&[u, 0.5]).unwrap();
        for c in 0..2 {
            assert_relative_eq!(l0[c], b[c], epsilon = 1e-12);
            assert_relative_eq!(l1[c], t[c], epsilon = 1e-12);
            assert_relative_eq!(lm[c], 0.5 * (b[c] + t[c]), epsilon = 1e-12);
        }
    }

    let planar = quarter_annulus();
    assert!(NurbsPatch::try_interpolate(&bottom, &planar).is_err());
}

#[test]
fn revolution_sweeps_circles() {
    let kv = KnotVector::<f64>::uniform(1, 1).unwrap();
    let line =
        NurbsPatch::try_from_data(vec![kv], 4, vec![1., 0., 0., 1., 1., 0., 2., 1.]).unwrap();
    let cylinder =
        NurbsPatch::try_revolve(&line, &Vector3::z(), std::f64::consts::FRAC_PI_2, 4).unwrap();
    assert_eq!(cylinder.shape(), vec![2, 9]);
    assert_eq!(cylinder.knot_vector(1).num_elements(), 4);
    for i in 0..=10 {
        let u = i as f64 / 10.;
        for j in 0..=16 {
            let v = j as f64 / 4.;
            let p = cylinder.point_at(&[u, v]).unwrap();
            assert_relative_eq!(p[0].hypot(p[1]), 1., epsilon = 1e-12);
            assert_relative_eq!(p[2], 2. * u, epsilon = 1e-12);
        }
    }

    let planar = quarter_annulus();
    assert!(NurbsPatch::try_revolve(&planar, &Vector3::z(), 1., 1).is_err());
    assert!(NurbsPatch::try_revolve(&line, &Vector3::z(), 1., 0).is_err());
}
