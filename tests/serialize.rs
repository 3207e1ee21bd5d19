#![cfg(feature = "serde")]

use nurbs_mesh::prelude::{KnotVector, NurbsPatch};

#[test]
fn test_serialization() {
    let kv = KnotVector::<f64>::uniform(2, 2).unwrap();
    let mut patch = NurbsPatch::new(vec![kv.clone(), kv], 3).unwrap();
    patch
        .data_mut()
        .iter_mut()
        .enumerate()
        .for_each(|(i, v)| *v = i as f64);
    let json = serde_json::to_string_pretty(&patch).unwrap();
    println!("{}", json);
    let restored: NurbsPatch<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, patch);
}
