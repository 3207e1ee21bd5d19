use crate::misc::Tokenizer;

use super::{Cell, Geometry, PatchTopology};

const TWO_QUADS: &str = "NURBS mesh v1.0

dimension
2

elements
2
1 3 0 1 4 3
2 3 1 2 5 4

boundary
6
1 1 0 1
1 1 1 2
2 1 2 5
3 1 5 4
3 1 4 3
4 1 3 0

edges
7
0 0 1
1 1 2
0 4 3
1 4 5
2 0 3
2 1 4
2 2 5

vertices
6
";

fn cube() -> PatchTopology {
    let cell = Cell::try_new(1, Geometry::Cube, (0..8).collect()).unwrap();
    let bottom = Cell::try_new(1, Geometry::Square, vec![0, 1, 2, 3]).unwrap();
    let edges = [
        (0, 0, 1),
        (0, 3, 2),
        (0, 4, 5),
        (0, 7, 6),
        (1, 1, 2),
        (1, 0, 3),
        (1, 5, 6),
        (1, 4, 7),
        (2, 0, 4),
        (2, 1, 5),
        (2, 2, 6),
        (2, 3, 7),
    ];
    PatchTopology::try_new(3, 8, vec![cell], vec![bottom], &edges).unwrap()
}

#[test]
fn shared_edges_are_numbered_once() {
    let topology = PatchTopology::try_parse(&mut Tokenizer::new(TWO_QUADS)).unwrap();
    assert_eq!(topology.dimension(), 2);
    assert_eq!(topology.num_elements(), 2);
    assert_eq!(topology.num_boundary(), 6);
    assert_eq!(topology.num_edges(), 7);
    assert_eq!(topology.attribute(1), 2);
    assert_eq!(topology.bdr_attribute(3), 3);

    assert_eq!(
        topology.element_edges(1),
        vec![(4, 1), (5, 1), (6, -1), (1, -1)]
    );
    assert_eq!(topology.edge_vertices(2), [3, 4]);
    assert_eq!(topology.find_edge(4, 1), Some(1));
    assert_eq!(topology.find_edge(0, 4), None);
    assert_eq!(topology.bdr_element_edges(3), vec![(6, -1)]);
    assert_eq!(topology.element_faces(0), &[] as &[usize]);
}

#[test]
fn edge_knots_carry_their_direction() {
    let topology = PatchTopology::try_parse(&mut Tokenizer::new(TWO_QUADS)).unwrap();
    // "0 4 3" runs from the higher to the lower vertex
    assert_eq!(topology.edge_to_knot(2), -1);
    assert_eq!(topology.edge_to_knot_table(), &[0, 2, -1, 2, 1, 2, 1]);
}

#[test]
fn text_round_trip() {
    let topology = PatchTopology::try_parse(&mut Tokenizer::new(TWO_QUADS)).unwrap();
    let mut out = vec![];
    topology.write(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("\n0 4 3\n"));

    let parsed = PatchTopology::try_parse(&mut Tokenizer::new(&text)).unwrap();
    assert_eq!(parsed.edge_to_knot_table(), topology.edge_to_knot_table());
    for p in 0..2 {
        assert_eq!(parsed.element(p), topology.element(p));
        assert_eq!(parsed.element_edges(p), topology.element_edges(p));
    }
    for b in 0..6 {
        assert_eq!(parsed.bdr_element(b), topology.bdr_element(b));
    }
}

#[test]
fn inconsistent_sections_are_rejected() {
    let stray = TWO_QUADS.replace("4 1 3 0", "4 1 0 4");
    assert!(PatchTopology::try_parse(&mut Tokenizer::new(&stray)).is_err());

    let missing = TWO_QUADS
        .replace("edges\n7", "edges\n6")
        .replace("2 2 5\n", "");
    assert!(PatchTopology::try_parse(&mut Tokenizer::new(&missing)).is_err());

    let segment = Cell::try_new(1, Geometry::Segment, vec![0, 1]).unwrap();
    assert!(PatchTopology::try_new(2, 2, vec![segment], vec![], &[(0, 0, 1)]).is_err());
    assert!(Cell::try_new(1, Geometry::Square, vec![0, 1, 2]).is_err());
}

#[test]
fn cube_faces_and_edges() {
    let topology = cube();
    assert_eq!(topology.num_edges(), 12);
    assert_eq!(topology.num_faces(), 6);
    assert_eq!(topology.face_vertices(0), [3, 2, 1, 0]);
    assert_eq!(topology.find_face(&[0, 1, 2, 3]), Some(0));
    assert_eq!(topology.find_face(&[4, 6, 5, 7]), Some(5));
    assert_eq!(
        topology.face_edges(0),
        vec![(2, -1), (1, -1), (0, -1), (3, 1)]
    );
    assert_eq!(topology.element_faces(0), &[0, 1, 2, 3, 4, 5]);

    assert_eq!(topology.bdr_element_face(0), Some(0));
    assert_eq!(
        topology.bdr_element_edges(0),
        vec![(0, 1), (1, 1), (2, 1), (3, -1)]
    );

    let edges = topology.element_edges(0);
    assert_eq!(edges[2], (2, -1));
    assert_eq!(edges[8], (8, 1));
    assert_eq!(topology.edge_to_knot(2), -1);
}

#[test]
fn segments_are_their_own_edges() {
    let text = "dimension\n1\nelements\n2\n1 1 0 1\n1 1 1 2\nboundary\n2\n1 0 0\n2 0 2\nedges\n2\n0 0 1\n0 2 1\nvertices\n3\n";
    let topology = PatchTopology::try_parse(&mut Tokenizer::new(text)).unwrap();
    assert_eq!(topology.num_edges(), 2);
    assert_eq!(topology.element_edges(1), vec![(1, 1)]);
    assert_eq!(topology.edge_to_knot(1), -1);
    assert_eq!(topology.find_edge(2, 1), Some(1));
    assert!(topology.bdr_element_edges(0).is_empty());

    let swapped = text.replace("0 0 1\n0 2 1", "0 2 1\n0 0 1");
    assert!(PatchTopology::try_parse(&mut Tokenizer::new(&swapped)).is_err());
}
