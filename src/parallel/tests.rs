use itertools::Itertools;

use crate::{
    extension::NurbsExtension,
    knot::KnotVector,
    topology::{Cell, Geometry, PatchTopology},
};

use super::{GroupTopology, ParNurbsExtension};

fn square(order: usize, num_elements: usize) -> NurbsExtension<f64> {
    let quad = Cell::try_new(1, Geometry::Square, vec![0, 1, 2, 3]).unwrap();
    let boundary = vec![
        Cell::try_new(1, Geometry::Segment, vec![0, 1]).unwrap(),
        Cell::try_new(2, Geometry::Segment, vec![1, 2]).unwrap(),
    ];
    let topology = PatchTopology::try_new(
        2,
        4,
        vec![quad],
        boundary,
        &[(0, 0, 1), (1, 1, 2), (0, 3, 2), (1, 0, 3)],
    )
    .unwrap();
    let kv = KnotVector::uniform(order, num_elements).unwrap();
    NurbsExtension::try_new(topology, vec![kv.clone(), kv]).unwrap()
}

/// Elements of the first column on rank 0, of the second on rank 1
const COLUMNS: [usize; 4] = [0, 1, 0, 1];

#[test]
fn groups_start_with_the_local_rank() {
    let mut groups = GroupTopology::new(3);
    assert_eq!(groups.num_groups(), 1);
    assert_eq!(groups.group(0), &[3]);
    let a = groups.insert(&[5, 3]);
    let b = groups.insert(&[3, 1, 5]);
    assert_ne!(a, b);
    assert_eq!(groups.insert(&[3]), 0);
    assert_eq!(groups.num_groups(), 3);
    assert_eq!(groups.neighbors(), vec![1, 5]);
}

#[test]
fn ranks_keep_their_columns() {
    let mut serial = square(2, 2);
    for (d, w) in serial.weights_mut().iter_mut().enumerate() {
        *w = 1. + d as f64;
    }
    let par = ParNurbsExtension::try_new(0, &mut serial, &COLUMNS, None).unwrap();
    assert!(!serial.owns_topology());
    assert!(par.owns_topology());
    assert_eq!(par.partitioning(), Some(&COLUMNS[..]));

    assert_eq!(par.num_elements(), 4);
    assert_eq!(par.num_active_elements(), 2);
    assert_eq!(par.element_local_to_global(), vec![0, 2]);
    assert_eq!(par.num_active_dofs(), 12);
    assert_eq!(par.num_active_bdr_elements(), 0);

    let groups = par.ldof_groups();
    assert_eq!(groups.len(), 12);
    assert_eq!(groups.iter().filter(|g| **g == 0).count(), 4);
    assert_eq!(par.group_topology().num_groups(), 2);
    assert_eq!(par.group_topology().neighbors(), vec![1]);
    assert!((0..12).all(|l| par.group_of_ldof(l) == groups[l]));

    for (l, g) in par.element_local_to_global().into_iter().enumerate() {
        let local = par
            .element_dof_table()
            .row(l)
            .iter()
            .map(|d| par.weights()[*d])
            .collect_vec();
        let global = serial
            .element_dof_table()
            .row(g)
            .iter()
            .map(|d| serial.weights()[*d])
            .collect_vec();
        assert_eq!(local, global);
    }
}

#[test]
fn partial_parents_are_rejected() {
    let mut serial = square(1, 2);
    let mut first = ParNurbsExtension::try_new(1, &mut serial, &COLUMNS, None).unwrap();
    assert!(ParNurbsExtension::try_new(1, &mut serial, &COLUMNS, None).is_err());
    assert!(ParNurbsExtension::try_new(0, &mut first, &COLUMNS, None).is_err());
    assert!(ParNurbsExtension::try_new(0, &mut square(1, 2), &[0, 1], None).is_err());
}

#[test]
fn rejected_partitioning_keeps_the_topology_owner() {
    let mut serial = square(1, 2);
    assert!(ParNurbsExtension::try_new(0, &mut serial, &[0, 1], None).is_err());
    assert!(serial.owns_topology());

    let par = ParNurbsExtension::try_new(0, &mut serial, &COLUMNS, None).unwrap();
    assert!(par.owns_topology());
    assert!(!serial.owns_topology());
}

#[test]
fn elevated_mesh_follows_the_same_partitioning() {
    let mut serial = square(2, 2);
    let par = ParNurbsExtension::try_new(0, &mut serial, &COLUMNS, None).unwrap();
    let elevated = NurbsExtension::from_parent_with_order(&serial, 3).unwrap();
    assert_eq!(elevated.num_active_elements(), 4);

    let refined = ParNurbsExtension::try_from_refined(elevated, &par).unwrap();
    assert_eq!(refined.order(), Some(3));
    assert_eq!(refined.num_active_elements(), 2);
    assert_eq!(refined.num_active_dofs(), 20);
    assert_eq!(refined.weights().len(), 20);
    let shared = refined.ldof_groups().iter().filter(|g| **g != 0).count();
    assert_eq!(shared, 15);
    assert_eq!(refined.group_topology().group(1), &[0, 1]);
}
