use approx::assert_relative_eq;
use itertools::Itertools;
use nurbs_mesh::prelude::*;

/// Quarter annulus of radii 1 and 2 as a single rational quadratic by linear patch
const QUARTER_ANNULUS: &str = "NURBS mesh v1.0

dimension
2

elements
1
1 3 0 1 2 3

boundary
4
1 1 0 1
2 1 1 2
3 1 3 2
4 1 0 3

edges
4
0 0 1
0 3 2
1 1 2
1 0 3

vertices
4

patches

# patch 0

knotvectors
2
2 3 0 0 0 1 1 1
1 2 0 0 1 1

dimension
2

controlpoints_cartesian
1 0 1
1 1 0.7071067811865476
0 1 1
2 0 1
2 2 0.7071067811865476
0 2 1
";

fn radius(x: &[f64]) -> f64 {
    (x[0] * x[0] + x[1] * x[1]).sqrt()
}

#[test]
fn patches_describe_the_geometry() {
    let mut ext = NurbsExtension::<f64>::try_from_str(QUARTER_ANNULUS).unwrap();
    assert!(ext.have_patches());
    assert_eq!(ext.num_knot_vectors(), 2);
    assert_eq!(ext.orders(), &[2, 1]);
    assert_eq!(ext.num_active_dofs(), 6);

    let nodes = ext.set_coords_from_patches().unwrap();
    assert_eq!(nodes.len(), 12);
    assert_relative_eq!(ext.weights()[0], 1.);
    for x in nodes.chunks(2) {
        let r = radius(x);
        assert!((r - 1.).abs() < 1e-12 || (r - 2.).abs() < 1e-12 || x[0] == x[1]);
    }
}

#[test]
fn refinement_keeps_the_circle() {
    let mut ext = NurbsExtension::<f64>::try_from_str(QUARTER_ANNULUS).unwrap();
    ext.uniform_refinement().unwrap();
    ext.degree_elevate(1, 3).unwrap();
    ext.set_knots_from_patches().unwrap();
    assert_eq!(ext.num_elements(), 4);
    assert_eq!(ext.orders(), &[3, 2]);

    let nodes = ext.set_coords_from_patches().unwrap();
    assert_eq!(nodes.len(), ext.num_active_dofs() * 2);

    ext.convert_to_patches(&nodes, 2).unwrap();
    let patch = &ext.patches()[0];
    for u in [0., 0.2, 0.5, 0.9, 1.] {
        let inner = patch.point_at(&[u, 0.]).unwrap();
        let outer = patch.point_at(&[u, 1.]).unwrap();
        assert_relative_eq!(radius(inner.as_slice()), 1., epsilon = 1e-10);
        assert_relative_eq!(radius(outer.as_slice()), 2., epsilon = 1e-10);
    }
}

#[test]
fn written_patches_read_back() {
    let ext = NurbsExtension::<f64>::try_from_str(QUARTER_ANNULUS).unwrap();
    let mut buffer = vec![];
    ext.write(&mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert!(text.contains("\npatches\n"));
    let read = NurbsExtension::<f64>::try_from_str(&text).unwrap();
    assert_eq!(read.patches(), ext.patches());
    assert_eq!(
        read.knot_vectors().iter().map(|k| k.to_string()).collect_vec(),
        ext.knot_vectors().iter().map(|k| k.to_string()).collect_vec()
    );
}

#[test]
fn knot_insertion_follows_the_unique_knot_vectors() {
    let mut ext = NurbsExtension::<f64>::try_from_str(QUARTER_ANNULUS).unwrap();
    ext.knot_insert(&[vec![0.25, 0.5], vec![0.5]]).unwrap();
    ext.set_knots_from_patches().unwrap();
    assert_eq!(ext.num_elements(), 6);

    let target = ext
        .knot_vectors()
        .iter()
        .map(|k| {
            let mut knots = k.uniform_refinement();
            knots.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let merged = k
                .knots()
                .iter()
                .copied()
                .chain(knots)
                .sorted_by(|a, b| a.partial_cmp(b).unwrap())
                .collect_vec();
            KnotVector::try_new(k.order(), merged).unwrap()
        })
        .collect_vec();
    let nodes = ext.set_coords_from_patches().unwrap();
    ext.convert_to_patches(&nodes, 2).unwrap();
    ext.knot_insert_kv(&target).unwrap();
    ext.set_knots_from_patches().unwrap();
    assert_eq!(ext.num_elements(), 24);
}
